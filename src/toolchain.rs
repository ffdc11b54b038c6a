//! Compiling and running generated C++ with the system compiler.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};

pub const DEFAULT_COMPILER: &str = "c++";

/// `$CXX` when set, otherwise `c++`.
pub fn cxx_compiler() -> String {
    std::env::var("CXX")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COMPILER.to_string())
}

/// Picks a fresh binary path next to the other build products in the temp
/// directory.
fn temp_binary_path() -> Result<PathBuf> {
    let mut dir = std::env::temp_dir();
    dir.push("pytocpp");
    fs::create_dir_all(&dir).context("Creating temp directory")?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let suffix = if cfg!(windows) { ".exe" } else { "" };
    Ok(dir.join(format!("program_{}_{nanos}{suffix}", std::process::id())))
}

pub fn compile_source(compiler: &str, source_path: &Path) -> Result<PathBuf> {
    let binary_path = temp_binary_path()?;
    let compile = Command::new(compiler)
        .arg(source_path)
        .arg("-std=c++17")
        .arg("-O2")
        .arg("-o")
        .arg(&binary_path)
        .output()
        .with_context(|| format!("Running C++ compiler '{compiler}'"))?;
    if !compile.status.success() {
        let stderr = String::from_utf8_lossy(&compile.stderr);
        bail!("C++ compilation failed: {stderr}");
    }
    Ok(binary_path)
}

pub fn run_compiled_binary(binary_path: &Path) -> Result<String> {
    let output = Command::new(binary_path)
        .output()
        .context("Running compiled program")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Compiled program failed: {stderr}");
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Builds `source_path`, runs the binary once and removes it.
pub fn compile_and_run(compiler: &str, source_path: &Path) -> Result<String> {
    let binary_path = compile_source(compiler, source_path)?;
    let output = run_compiled_binary(&binary_path);
    let _ = fs::remove_file(&binary_path);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_compiler_is_reported() {
        let err = compile_source("pytocpp-no-such-compiler", Path::new("missing.cpp"))
            .expect_err("compiler should not exist");
        assert!(err.to_string().contains("pytocpp-no-such-compiler"));
    }
}
