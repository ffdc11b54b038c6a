#![allow(dead_code)]
use std::path::Path;

use pytocpp::ast::Program;
use pytocpp::{lexer, parser};
use test_support::load_cases;

/// `(case name, source)` for every fixture case tagged with `tag`.
pub fn workloads(tag: &str) -> Vec<(String, String)> {
    let cases = load_cases(Path::new("tests/programs")).expect("load fixture cases");
    cases
        .into_iter()
        .filter(|case| case.spec.bench.enabled && case.spec.bench.tags.iter().any(|t| t == tag))
        .map(|case| {
            let source = case.read_source().expect("read fixture source");
            (case.name, source)
        })
        .collect()
}

pub fn load_program(label: &str, source: &str) -> Program {
    let tokens = lexer::tokenize(source).unwrap_or_else(|err| panic!("tokenize {label}: {err}"));
    parser::parse_tokens(tokens).unwrap_or_else(|err| panic!("parse {label}: {err}"))
}
