//! Parameter and return types for script functions.
//!
//! A parameter becomes `vector<int>&` when the body treats it as a list
//! (indexes it, takes its `len()`, iterates it, stores through it) or hands
//! it to another function in a list-typed position. Any other parameter
//! takes the joined type of the arguments passed at its call sites, and is
//! an `int` when no call site says more.
//!
//! Argument types depend on the callers' locals, which depend on parameter
//! and return types, so the whole set is recomputed until it stops
//! changing.

use std::collections::HashMap;

use crate::ast::{Expression, Statement};
use crate::builtins::BuiltinFunction;

use super::scope::{CallSite, LocalScope};
use super::types::{CppType, numeric_result};
use super::walk::{Node, walk_block};

/// A top-level `def`, borrowed from the program.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef<'a> {
    pub name: &'a str,
    pub params: &'a [String],
    pub body: &'a [Statement],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub cpp_name: String,
    pub params: Vec<(String, CppType)>,
    pub return_type: CppType,
}

impl FunctionSignature {
    /// `int partition(vector<int>& arr, int low, int high)`
    pub fn declaration(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|(name, ty)| format!("{} {name}", ty.param_name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}({params})", self.return_type.name(), self.cpp_name)
    }
}

/// Script names that would collide with the C++ entry point.
pub fn cpp_function_name(name: &str) -> String {
    if name == "main" {
        "py_main".to_string()
    } else {
        name.to_string()
    }
}

type ParamTypes<'a> = HashMap<&'a str, Vec<CppType>>;

pub fn infer_signatures(
    functions: &[FunctionDef<'_>],
    main_body: &[&Statement],
) -> HashMap<String, FunctionSignature> {
    let list_params = list_param_flags(functions);
    let mut param_types = seed_param_types(functions, &list_params);
    let mut return_types: HashMap<String, CppType> = HashMap::new();

    // Each round only refines types, but conflicting call sites could trade
    // places forever; the bound stops that.
    for _ in 0..2 * functions.len() + 2 {
        let mut calls = Vec::new();
        let mut next_returns = HashMap::new();
        for function in functions {
            let params = typed_params(function, &param_types);
            let summary = LocalScope::new(&params, &return_types).scan(function.body);
            let returned = summary.first_return.unwrap_or(CppType::Void);
            next_returns.insert(function.name.to_string(), returned);
            calls.extend(summary.calls);
        }
        calls.extend(
            LocalScope::new(&[], &return_types)
                .scan(main_body.iter().copied())
                .calls,
        );

        let next_params = join_call_sites(seed_param_types(functions, &list_params), &calls);
        let stable = next_params == param_types && next_returns == return_types;
        param_types = next_params;
        return_types = next_returns;
        if stable {
            break;
        }
    }

    // Parameters nobody passes anything informative to end up `int`; the
    // returns are settled again against those final types.
    let param_types: ParamTypes<'_> = param_types
        .into_iter()
        .map(|(name, types)| (name, types.into_iter().map(concrete_param).collect()))
        .collect();
    for _ in 0..functions.len() + 1 {
        let next_returns = scan_returns(functions, &param_types, &return_types);
        if next_returns == return_types {
            break;
        }
        return_types = next_returns;
    }

    functions
        .iter()
        .map(|function| {
            let params = typed_params(function, &param_types);
            // A forward-declared function cannot return `auto`.
            let return_type = match return_types.get(function.name) {
                None | Some(CppType::Void) => CppType::Void,
                Some(CppType::Auto) => CppType::Int,
                Some(ty) => *ty,
            };
            let signature = FunctionSignature {
                cpp_name: cpp_function_name(function.name),
                params,
                return_type,
            };
            (function.name.to_string(), signature)
        })
        .collect()
}

fn scan_returns(
    functions: &[FunctionDef<'_>],
    param_types: &ParamTypes<'_>,
    return_types: &HashMap<String, CppType>,
) -> HashMap<String, CppType> {
    functions
        .iter()
        .map(|function| {
            let params = typed_params(function, param_types);
            let summary = LocalScope::new(&params, return_types).scan(function.body);
            let returned = summary.first_return.unwrap_or(CppType::Void);
            (function.name.to_string(), returned)
        })
        .collect()
}

fn seed_param_types<'a>(
    functions: &[FunctionDef<'a>],
    list_params: &HashMap<&'a str, Vec<bool>>,
) -> ParamTypes<'a> {
    functions
        .iter()
        .map(|function| {
            let flags = list_params.get(function.name);
            let types = (0..function.params.len())
                .map(|index| {
                    let is_list = flags
                        .and_then(|flags| flags.get(index))
                        .copied()
                        .unwrap_or(false);
                    if is_list {
                        CppType::IntVector
                    } else {
                        CppType::Auto
                    }
                })
                .collect();
            (function.name, types)
        })
        .collect()
}

fn typed_params(function: &FunctionDef<'_>, param_types: &ParamTypes<'_>) -> Vec<(String, CppType)> {
    let types = param_types.get(function.name);
    function
        .params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let ty = types
                .and_then(|types| types.get(index))
                .copied()
                .unwrap_or(CppType::Auto);
            (param.clone(), ty)
        })
        .collect()
}

fn join_call_sites<'a>(mut param_types: ParamTypes<'a>, calls: &[CallSite]) -> ParamTypes<'a> {
    for call in calls {
        let Some(slots) = param_types.get_mut(call.callee.as_str()) else {
            continue;
        };
        for (slot, found) in slots.iter_mut().zip(&call.arg_types) {
            *slot = join_types(*slot, *found);
        }
    }
    param_types
}

/// Numeric arguments widen; otherwise the first informative call site wins.
fn join_types(current: CppType, found: CppType) -> CppType {
    match (current, found) {
        (current, CppType::Auto | CppType::Void) => current,
        (CppType::Auto, found) => found,
        (current, found) if current == found => current,
        (current, found) => match numeric_result(current, found) {
            CppType::Auto => current,
            widened => widened,
        },
    }
}

fn concrete_param(ty: CppType) -> CppType {
    match ty {
        CppType::Auto | CppType::Void => CppType::Int,
        other => other,
    }
}

fn list_param_flags<'a>(functions: &[FunctionDef<'a>]) -> HashMap<&'a str, Vec<bool>> {
    let mut list_params: HashMap<&str, Vec<bool>> = functions
        .iter()
        .map(|function| {
            let flags = function
                .params
                .iter()
                .map(|param| uses_as_list(function.body, param))
                .collect();
            (function.name, flags)
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for function in functions {
            for (param_index, param) in function.params.iter().enumerate() {
                let already = list_params
                    .get(function.name)
                    .and_then(|flags| flags.get(param_index))
                    .copied()
                    .unwrap_or(false);
                if already || !forwards_as_list(function.body, param, &list_params) {
                    continue;
                }
                if let Some(flag) = list_params
                    .get_mut(function.name)
                    .and_then(|flags| flags.get_mut(param_index))
                {
                    *flag = true;
                    changed = true;
                }
            }
        }
    }
    list_params
}

fn is_variable(expr: &Expression, name: &str) -> bool {
    matches!(expr, Expression::Variable(var) if var == name)
}

fn uses_as_list(body: &[Statement], param: &str) -> bool {
    let mut found = false;
    walk_block(body, &mut |node| match node {
        Node::Statement(Statement::For { iterable, .. }) if is_variable(iterable, param) => {
            found = true;
        }
        Node::Statement(Statement::ListAssign { list, .. }) if is_variable(list, param) => {
            found = true;
        }
        Node::Expression(Expression::ListAccess { list, .. }) if is_variable(list, param) => {
            found = true;
        }
        Node::Expression(Expression::Call { name, args })
            if BuiltinFunction::from_name(name) == Some(BuiltinFunction::Len)
                && args.first().is_some_and(|arg| is_variable(arg, param)) =>
        {
            found = true;
        }
        _ => {}
    });
    found
}

fn forwards_as_list(body: &[Statement], param: &str, list_params: &HashMap<&str, Vec<bool>>) -> bool {
    let mut found = false;
    walk_block(body, &mut |node| {
        if let Node::Expression(Expression::Call { name, args }) = node {
            let Some(flags) = list_params.get(name.as_str()) else {
                return;
            };
            found |= args
                .iter()
                .zip(flags)
                .any(|(arg, is_list)| *is_list && is_variable(arg, param));
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn signatures_for(source: &str) -> HashMap<String, FunctionSignature> {
        let tokens = tokenize(source).expect("tokenize");
        let program = parse_tokens(tokens).expect("parse");
        let mut functions = Vec::new();
        let mut main_body = Vec::new();
        for statement in &program.statements {
            match statement {
                Statement::FunctionDef { name, params, body } => functions.push(FunctionDef {
                    name,
                    params,
                    body,
                }),
                other => main_body.push(other),
            }
        }
        infer_signatures(&functions, &main_body)
    }

    #[test]
    fn propagates_list_params_through_calls() {
        let signatures = signatures_for(indoc! {"
            def sort(items, low, high):
                if low < high:
                    p = split(items, low, high)
                    sort(items, low, p - 1)

            def split(arr, low, high):
                pivot = arr[high]
                return low
        "});

        let sort = &signatures["sort"];
        assert_eq!(
            sort.declaration(),
            "void sort(vector<int>& items, int low, int high)"
        );
        assert_eq!(
            signatures["split"].declaration(),
            "int split(vector<int>& arr, int low, int high)"
        );
    }

    #[test]
    fn infers_return_type_from_locals() {
        let signatures = signatures_for(indoc! {"
            def greet(n):
                message = \"hi \" + str(n)
                return message

            def half(n):
                return n / 2.0

            def fact(n):
                if n <= 1:
                    return 1
                return n * fact(n - 1)
        "});
        assert_eq!(signatures["greet"].return_type, CppType::Str);
        assert_eq!(signatures["half"].return_type, CppType::Double);
        assert_eq!(signatures["fact"].return_type, CppType::Int);
    }

    #[test]
    fn parameters_take_argument_types_from_call_sites() {
        let signatures = signatures_for(indoc! {"
            def half(x):
                return x / 2

            def greet(name):
                print(\"Hello \" + name)

            def scale(n, factor):
                return n * factor

            print(half(3.5))
            greet(\"X\")
            scale(2, 3)
            scale(2, 1.5)
            flag = scale(1, True) > 2
        "});
        assert_eq!(signatures["half"].declaration(), "double half(double x)");
        assert_eq!(signatures["greet"].declaration(), "void greet(string name)");
        assert_eq!(
            signatures["scale"].declaration(),
            "double scale(int n, double factor)"
        );
    }

    #[test]
    fn arguments_flow_through_intermediate_functions() {
        let signatures = signatures_for(indoc! {"
            def outer(label):
                return inner(label)

            def inner(text):
                return text + \"!\"

            print(outer(\"hi\"))
        "});
        assert_eq!(signatures["inner"].declaration(), "string inner(string text)");
        assert_eq!(signatures["outer"].declaration(), "string outer(string label)");
    }

    #[test]
    fn return_types_resolve_forward_calls() {
        let signatures = signatures_for(indoc! {"
            def outer(n):
                return inner(n)

            def inner(n):
                return \"v\" + str(n)
        "});
        assert_eq!(signatures["outer"].return_type, CppType::Str);
        assert_eq!(signatures["inner"].return_type, CppType::Str);
        assert_eq!(signatures["outer"].declaration(), "string outer(int n)");
    }

    #[test]
    fn renames_script_main() {
        let signatures = signatures_for("def main():\n    print(1)\n");
        assert_eq!(signatures["main"].declaration(), "void py_main()");
    }
}
