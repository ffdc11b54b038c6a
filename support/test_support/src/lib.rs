use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    TranspileSuccess,
    FrontendError,
    CodegenError,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BenchConfig {
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    pub exit_code: i32,
    pub cpp_file: Option<String>,
    pub stdout_file: Option<String>,
    pub stderr_contains_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub class: CaseClass,
    #[serde(default)]
    pub parity: bool,
    #[serde(default)]
    pub bench: BenchConfig,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    /// Reads `<dir>/case.yaml`; `None` when the directory holds no case.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let case_path = dir.join("case.yaml");
        if !case_path.is_file() {
            return Ok(None);
        }
        let program_path = dir.join("program.py");
        ensure!(
            program_path.is_file(),
            "Case {} has a case.yaml but no program.py",
            dir.display()
        );

        let name = dir
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Case directory {} is not valid UTF-8", dir.display()))?;
        let raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        Ok(Some(Self {
            name,
            dir: dir.to_path_buf(),
            program_path,
            spec,
        }))
    }

    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }

    pub fn read_source(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading {}", self.program_path.display()))
    }
}

/// Every case under `programs_dir`, sorted by name.
pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let entries = fs::read_dir(programs_dir)
        .with_context(|| format!("Reading {}", programs_dir.display()))?;
    let mut cases = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir()
            && let Some(case) = Case::load(&path)?
        {
            cases.push(case);
        }
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

pub fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

/// Whether `<program> --version` runs and exits cleanly.
pub fn is_runnable(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

pub fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| value == "1")
}

/// Finds a C++ compiler: `$CXX` first, then the usual driver names.
pub fn detect_cxx_compiler() -> Option<String> {
    let from_env = std::env::var("CXX").ok().filter(|value| is_runnable(value));
    from_env.or_else(|| {
        ["c++", "g++", "clang++"]
            .into_iter()
            .find(|candidate| is_runnable(candidate))
            .map(str::to_string)
    })
}

pub fn detect_python_interpreter() -> Option<String> {
    let from_env = std::env::var("PYTHON").ok().filter(|value| is_runnable(value));
    from_env.or_else(|| {
        ["python3", "python"]
            .into_iter()
            .find(|candidate| is_runnable(candidate))
            .map(str::to_string)
    })
}

pub fn run_python_file(interpreter: &str, path: &Path) -> Result<String> {
    let output = Command::new(interpreter)
        .arg(path)
        .output()
        .with_context(|| format!("Running python file {}", path.display()))?;
    ensure!(
        output.status.success(),
        "python failed for {}: {}",
        path.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
