use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expression, ListAssignMode, Program, Statement, UnaryOperator};
use crate::builtins::BuiltinFunction;

mod error;
mod prelude;
mod scope;
mod signature;
mod types;
mod walk;

pub use error::{CodegenError, CodegenResult};
pub use signature::FunctionSignature;
pub use types::CppType;

use prelude::{CPP_HEADERS, CPP_PY_STR, escape_cpp_string};
use scope::{LocalScope, loop_element_type};
use signature::{FunctionDef, infer_signatures};
use types::{BindingTable, TypeContext, infer_type, is_text_operand};

const INDENT: &str = "    ";

/// Walks a [`Program`] and writes the equivalent C++ translation unit.
///
/// Function definitions are hoisted: forward declarations first, then
/// bodies, then a synthesized `int main()` holding every other top-level
/// statement in source order. A generator is consumed by [`generate`], so
/// every compilation starts from an empty binding table.
///
/// [`generate`]: CodeGenerator::generate
pub struct CodeGenerator {
    output: String,
    indent: usize,
    bindings: BindingTable,
    signatures: HashMap<String, FunctionSignature>,
    return_types: HashMap<String, CppType>,
    in_function: bool,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
            bindings: BindingTable::default(),
            signatures: HashMap::new(),
            return_types: HashMap::new(),
            in_function: false,
        }
    }

    pub fn generate(mut self, program: &Program) -> CodegenResult<String> {
        let (functions, main_statements) = split_program(program);
        self.signatures = infer_signatures(&functions, &main_statements);
        self.return_types = self
            .signatures
            .iter()
            .map(|(name, signature)| (name.clone(), signature.return_type))
            .collect();

        self.output.push_str(CPP_HEADERS);
        self.output.push_str(CPP_PY_STR);

        for function in &functions {
            let declaration = self.signature(function.name)?.declaration();
            self.push_line(&format!("{declaration};"));
        }
        if !functions.is_empty() {
            self.output.push('\n');
        }

        for function in &functions {
            self.emit_function(function)?;
        }

        self.bindings = BindingTable::default();
        self.in_function = false;
        self.push_line("int main() {");
        self.indent += 1;
        self.declare_hoisted(&[], main_statements.iter().copied())?;
        for statement in main_statements {
            self.emit_statement(statement)?;
        }
        self.push_line("return 0;");
        self.indent -= 1;
        self.push_line("}");

        Ok(self.output)
    }

    fn signature(&self, name: &str) -> CodegenResult<&FunctionSignature> {
        // Every hoisted function has a signature; a miss means the def was
        // not top-level.
        self.signatures
            .get(name)
            .ok_or_else(|| CodegenError::NestedFunction {
                name: name.to_string(),
            })
    }

    fn emit_function(&mut self, function: &FunctionDef<'_>) -> CodegenResult<()> {
        let signature = self.signature(function.name)?.clone();
        self.bindings = BindingTable::with_params(&signature.params);
        self.in_function = true;

        self.push_line(&format!("{} {{", signature.declaration()));
        self.indent += 1;
        self.declare_hoisted(&signature.params, function.body)?;
        for statement in function.body {
            self.emit_statement(statement)?;
        }
        self.indent -= 1;
        self.push_line("}");
        self.output.push('\n');

        self.in_function = false;
        Ok(())
    }

    /// Declares, at the top of the current body, every name whose first
    /// assignment sits inside a nested block, so later uses stay in scope.
    fn declare_hoisted<'s>(
        &mut self,
        params: &[(String, CppType)],
        body: impl IntoIterator<Item = &'s Statement>,
    ) -> CodegenResult<()> {
        let summary = LocalScope::new(params, &self.return_types).scan(body);
        for (name, ty) in summary.hoisted {
            if matches!(ty, CppType::Auto | CppType::Void) {
                return Err(CodegenError::UntypedHoistedVariable { name });
            }
            self.push_line(&format!("{} {name}{{}};", ty.name()));
            self.bindings.declare(&name, ty);
        }
        Ok(())
    }

    fn emit_block(&mut self, statements: &[Statement]) -> CodegenResult<()> {
        self.indent += 1;
        for statement in statements {
            self.emit_statement(statement)?;
        }
        self.indent -= 1;
        Ok(())
    }

    fn emit_statement(&mut self, statement: &Statement) -> CodegenResult<()> {
        match statement {
            Statement::Assign { name, value } => self.emit_assignment(name, value)?,
            Statement::ListAssign {
                list,
                index,
                value,
                mode,
            } => {
                let target = format!(
                    "{}[{}]",
                    self.emit_expression(list)?,
                    self.emit_bare(index)?
                );
                let value = self.emit_bare(value)?;
                match mode {
                    ListAssignMode::Store => self.push_line(&format!("{target} = {value};")),
                    ListAssignMode::Swap => self.push_line(&format!("swap({target}, {value});")),
                }
            }
            Statement::Print(args) => self.emit_print(args)?,
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.emit_bare(condition)?;
                self.push_line(&format!("if ({condition}) {{"));
                self.emit_block(then_body)?;
                self.push_line("}");
                if let Some(else_body) = else_body {
                    self.push_line("else {");
                    self.emit_block(else_body)?;
                    self.push_line("}");
                }
            }
            Statement::While { condition, body } => {
                let condition = self.emit_bare(condition)?;
                self.push_line(&format!("while ({condition}) {{"));
                self.emit_block(body)?;
                self.push_line("}");
            }
            Statement::For {
                var_name,
                iterable,
                body,
            } => self.emit_for(var_name, iterable, body)?,
            Statement::FunctionDef { name, .. } => {
                return Err(CodegenError::NestedFunction { name: name.clone() });
            }
            Statement::Return(value) => {
                if !self.in_function {
                    return Err(CodegenError::ReturnOutsideFunction);
                }
                match value {
                    Some(value) => {
                        let value = self.emit_bare(value)?;
                        self.push_line(&format!("return {value};"));
                    }
                    None => self.push_line("return;"),
                }
            }
            Statement::Pass => {}
            Statement::Expr(expr) => {
                let expr = self.emit_bare(expr)?;
                self.push_line(&format!("{expr};"));
            }
        }
        Ok(())
    }

    /// The first assignment to a name declares it with the inferred type;
    /// later ones are plain stores and must stay in the same type family.
    fn emit_assignment(&mut self, name: &str, value: &Expression) -> CodegenResult<()> {
        let inferred = infer_type(value, &*self);
        let rendered = self.emit_value(value)?;

        match self.bindings.lookup(name) {
            Some(declared) => {
                if declared.conflicts_with(inferred) {
                    return Err(CodegenError::TypeMismatch {
                        name: name.to_string(),
                        declared: declared.name(),
                        found: inferred.name(),
                    });
                }
                self.push_line(&format!("{name} = {rendered};"));
            }
            None => {
                self.push_line(&format!("{} {name} = {rendered};", inferred.name()));
                self.bindings.declare(name, inferred);
            }
        }
        Ok(())
    }

    fn emit_for(
        &mut self,
        var_name: &str,
        iterable: &Expression,
        body: &[Statement],
    ) -> CodegenResult<()> {
        let element_type = match iterable {
            Expression::Range { start, end, step } => {
                let (init, bound) = match end {
                    Some(end) => (self.emit_bare(start)?, self.emit_bare(end)?),
                    None => ("0".to_string(), self.emit_bare(start)?),
                };
                let comparison = if is_negative_literal(step.as_deref()) {
                    ">"
                } else {
                    "<"
                };
                let increment = match step {
                    Some(step) => format!("{var_name} += {}", self.emit_bare(step)?),
                    None => format!("{var_name}++"),
                };
                self.push_line(&format!(
                    "for (int {var_name} = {init}; {var_name} {comparison} {bound}; {increment}) {{"
                ));
                CppType::Int
            }
            other => {
                let element_type = loop_element_type(other, &*self);
                let iterable = self.emit_bare(other)?;
                self.push_line(&format!(
                    "for ({} {var_name} : {iterable}) {{",
                    element_type.name()
                ));
                element_type
            }
        };

        self.bindings.push_loop_var(var_name, element_type);
        let result = self.emit_block(body);
        self.bindings.pop_loop_var();
        result?;
        self.push_line("}");
        Ok(())
    }

    fn emit_print(&mut self, args: &[Expression]) -> CodegenResult<()> {
        let is_list: Vec<bool> = args
            .iter()
            .map(|arg| infer_type(arg, &*self) == CppType::IntVector)
            .collect();

        match args {
            [] => self.push_line("cout << endl;"),
            [arg] if is_list[0] => {
                self.push_line("cout << \"Array: \";");
                self.emit_element_loop(arg)?;
                self.push_line("cout << endl;");
            }
            _ if is_list.contains(&true) => {
                for (arg, is_list) in args.iter().zip(&is_list) {
                    if *is_list {
                        self.emit_element_loop(arg)?;
                    } else {
                        let arg = self.emit_expression(arg)?;
                        self.push_line(&format!("cout << {arg} << \" \";"));
                    }
                }
                self.push_line("cout << endl;");
            }
            _ => {
                let parts = args
                    .iter()
                    .map(|arg| self.emit_expression(arg))
                    .collect::<CodegenResult<Vec<_>>>()?;
                self.push_line(&format!("cout << {} << endl;", parts.join(" << \" \" << ")));
            }
        }
        Ok(())
    }

    fn emit_element_loop(&mut self, list: &Expression) -> CodegenResult<()> {
        let list = self.emit_bare(list)?;
        self.push_line(&format!("for (int element : {list}) {{"));
        self.indent += 1;
        self.push_line("cout << element << \" \";");
        self.indent -= 1;
        self.push_line("}");
        Ok(())
    }

    /// Right-hand side of an assignment: list literals use brace
    /// initialization directly.
    fn emit_value(&self, value: &Expression) -> CodegenResult<String> {
        match value {
            Expression::List(elements) => Ok(format!("{{{}}}", self.emit_list(elements)?)),
            other => self.emit_bare(other),
        }
    }

    /// Like [`Self::emit_expression`] but without the outer parentheses of a
    /// binary operation, for positions that already delimit the expression.
    fn emit_bare(&self, expr: &Expression) -> CodegenResult<String> {
        match expr {
            Expression::BinaryOp { left, op, right } => self.emit_binary(left, *op, right),
            other => self.emit_expression(other),
        }
    }

    fn emit_expression(&self, expr: &Expression) -> CodegenResult<String> {
        match expr {
            Expression::Number(value) => Ok(value.to_string()),
            Expression::Float(value) => Ok(format!("{value:?}")),
            Expression::String(value) => Ok(format!("\"{}\"", escape_cpp_string(value))),
            Expression::Boolean(value) => Ok(if *value { "true" } else { "false" }.to_string()),
            Expression::Variable(name) => Ok(name.clone()),
            Expression::List(elements) => Ok(format!("vector<int>{{{}}}", self.emit_list(elements)?)),
            Expression::ListAccess { list, index } => Ok(format!(
                "{}[{}]",
                self.emit_expression(list)?,
                self.emit_bare(index)?
            )),
            Expression::BinaryOp { left, op, right } => {
                Ok(format!("({})", self.emit_binary(left, *op, right)?))
            }
            Expression::UnaryOp { op, operand } => Ok(format!(
                "({}{})",
                op.cpp_symbol(),
                self.emit_expression(operand)?
            )),
            Expression::Call { name, args } => self.emit_call(name, args),
            Expression::Range { .. } => Err(CodegenError::UnsupportedExpression {
                construct: "range()",
                context: "outside a for loop header",
            }),
        }
    }

    fn emit_binary(
        &self,
        left: &Expression,
        op: BinaryOperator,
        right: &Expression,
    ) -> CodegenResult<String> {
        if op == BinaryOperator::Add && (is_text_operand(left) || is_text_operand(right)) {
            return Ok(format!(
                "string({}) + string({})",
                self.emit_bare(left)?,
                self.emit_bare(right)?
            ));
        }
        Ok(format!(
            "{} {} {}",
            self.emit_expression(left)?,
            op.cpp_symbol(),
            self.emit_expression(right)?
        ))
    }

    fn emit_call(&self, name: &str, args: &[Expression]) -> CodegenResult<String> {
        let Some(builtin) = BuiltinFunction::from_name(name) else {
            let callee = self
                .signatures
                .get(name)
                .map_or(name, |signature| signature.cpp_name.as_str());
            return Ok(format!("{callee}({})", self.emit_arguments(args)?));
        };

        let arity = builtin.arity();
        if !arity.contains(&args.len()) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else {
                format!("{} to {}", arity.start(), arity.end())
            };
            return Err(CodegenError::BuiltinArity {
                name: builtin.name(),
                expected,
                found: args.len(),
            });
        }

        match (builtin, args) {
            (BuiltinFunction::Len, [arg]) => Ok(format!("{}.size()", self.emit_expression(arg)?)),
            (BuiltinFunction::Str, [arg]) => Ok(format!("py_str({})", self.emit_bare(arg)?)),
            (BuiltinFunction::Int, [arg]) => {
                Ok(format!("static_cast<int>({})", self.emit_bare(arg)?))
            }
            (BuiltinFunction::Float, [arg]) => {
                Ok(format!("static_cast<double>({})", self.emit_bare(arg)?))
            }
            (BuiltinFunction::Abs | BuiltinFunction::Min | BuiltinFunction::Max, _) => {
                Ok(format!("{}({})", builtin.name(), self.emit_arguments(args)?))
            }
            _ => Err(CodegenError::UnsupportedExpression {
                construct: "range()",
                context: "outside a for loop header",
            }),
        }
    }

    fn emit_arguments(&self, args: &[Expression]) -> CodegenResult<String> {
        let rendered = args
            .iter()
            .map(|arg| self.emit_bare(arg))
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    fn emit_list(&self, elements: &[Expression]) -> CodegenResult<String> {
        self.emit_arguments(elements)
    }

    fn push_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext for CodeGenerator {
    fn variable_type(&self, name: &str) -> Option<CppType> {
        self.bindings.lookup(name)
    }

    fn return_type(&self, function: &str) -> Option<CppType> {
        self.return_types.get(function).copied()
    }
}

/// Separates hoisted `def`s from the statements that go into `main`. The
/// body of a top-level `if __name__ == "__main__":` guard is inlined.
fn split_program(program: &Program) -> (Vec<FunctionDef<'_>>, Vec<&Statement>) {
    let mut functions = Vec::new();
    let mut main_statements = Vec::new();
    for statement in &program.statements {
        match statement {
            Statement::FunctionDef { name, params, body } => functions.push(FunctionDef {
                name,
                params,
                body,
            }),
            Statement::If {
                condition,
                then_body,
                else_body: None,
            } if is_main_guard(condition) => main_statements.extend(then_body),
            _ => main_statements.push(statement),
        }
    }
    (functions, main_statements)
}

fn is_main_guard(condition: &Expression) -> bool {
    match condition {
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Equal,
            right,
        } => {
            matches!(left.as_ref(), Expression::Variable(name) if name == "__name__")
                && matches!(right.as_ref(), Expression::String(value) if value == "__main__")
        }
        _ => false,
    }
}

fn is_negative_literal(step: Option<&Expression>) -> bool {
    match step {
        Some(Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        }) => matches!(
            operand.as_ref(),
            Expression::Number(_) | Expression::Float(_)
        ),
        _ => false,
    }
}

/// Translates a parsed program with a fresh generator.
pub fn generate(program: &Program) -> CodegenResult<String> {
    CodeGenerator::new().generate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn translate(source: &str) -> CodegenResult<String> {
        let tokens = tokenize(source).expect("tokenize");
        let program = parse_tokens(tokens).expect("parse");
        generate(&program)
    }

    fn body_of_main(cpp: &str) -> &str {
        let start = cpp.find("int main() {").expect("main present");
        &cpp[start..]
    }

    #[test]
    fn translates_simple_assignment_and_print() {
        let cpp = translate("a = 5 + 3\nprint(a)\n").expect("codegen");
        assert!(cpp.starts_with("#include <algorithm>\n"));
        assert_eq!(
            body_of_main(&cpp),
            indoc! {"
                int main() {
                    int a = 5 + 3;
                    cout << a << endl;
                    return 0;
                }
            "}
        );
    }

    #[test]
    fn output_is_deterministic() {
        let source = indoc! {"
            def add(x, y):
                return x + y

            total = add(1, 2)
            print(total)
        "};
        let first = translate(source).expect("codegen");
        let second = translate(source).expect("codegen");
        assert_eq!(first, second);
    }

    #[test]
    fn declares_each_name_once() {
        let cpp = translate(indoc! {"
            x = 1
            x = 2
            x = x + 3
        "})
        .expect("codegen");
        assert_eq!(cpp.matches("int x = ").count(), 1);
        assert!(cpp.contains("    x = 2;\n"));
        assert!(cpp.contains("    x = x + 3;\n"));
    }

    #[test]
    fn hoists_names_first_assigned_in_branches() {
        let cpp = translate(indoc! {"
            x = 3
            if x > 0:
                sign = 1
            else:
                sign = -1
            print(sign)
        "})
        .expect("codegen");
        assert_eq!(
            body_of_main(&cpp),
            indoc! {"
                int main() {
                    int sign{};
                    int x = 3;
                    if (x > 0) {
                        sign = 1;
                    }
                    else {
                        sign = (-1);
                    }
                    cout << sign << endl;
                    return 0;
                }
            "}
        );
    }

    #[test]
    fn hoists_loop_assignments_in_functions() {
        let cpp = translate(indoc! {"
            def last_of(xs):
                for x in xs:
                    last = x
                return last
        "})
        .expect("codegen");
        assert!(cpp.contains(indoc! {"
            int last_of(vector<int>& xs) {
                int last{};
                for (int x : xs) {
                    last = x;
                }
                return last;
            }
        "}));
    }

    #[test]
    fn refuses_to_hoist_untyped_names() {
        let err = translate("if True:\n    y = mystery()\n").unwrap_err();
        assert_eq!(
            err,
            CodegenError::UntypedHoistedVariable {
                name: "y".to_string()
            }
        );
    }

    #[test]
    fn wide_integer_literals_declare_long_long() {
        let cpp = translate("big = 3000000000\nsmall = 7\n").expect("codegen");
        assert!(cpp.contains("    long long big = 3000000000;\n"));
        assert!(cpp.contains("    int small = 7;\n"));
    }

    #[test]
    fn rejects_conflicting_reassignment() {
        let err = translate("x = 1\nx = \"one\"\n").unwrap_err();
        assert_eq!(
            err,
            CodegenError::TypeMismatch {
                name: "x".to_string(),
                declared: "int",
                found: "string",
            }
        );
    }

    #[test]
    fn hoists_functions_and_emits_swap() {
        let cpp = translate(indoc! {"
            def partition(arr, low, high):
                pivot = arr[high]
                i = low - 1
                for j in range(low, high):
                    if arr[j] <= pivot:
                        i = i + 1
                        arr[i], arr[j] = arr[j], arr[i]
                arr[i + 1], arr[high] = arr[high], arr[i + 1]
                return i + 1
        "})
        .expect("codegen");

        assert!(cpp.contains("int partition(vector<int>& arr, int low, int high);\n"));
        assert!(cpp.contains(indoc! {"
            int partition(vector<int>& arr, int low, int high) {
                int pivot = arr[high];
                int i = low - 1;
                for (int j = low; j < high; j++) {
                    if (arr[j] <= pivot) {
                        i = i + 1;
                        swap(arr[i], arr[j]);
                    }
                }
                swap(arr[i + 1], arr[high]);
                return i + 1;
            }
        "}));
    }

    #[test]
    fn string_concatenation_uses_std_string() {
        let cpp = translate(indoc! {r#"
            name = "X"
            version = 3.14
            print("Hello, " + name + " " + str(version))
        "#})
        .expect("codegen");
        assert!(cpp.contains("    string name = \"X\";\n"));
        assert!(cpp.contains("    double version = 3.14;\n"));
        assert!(cpp.contains(
            "cout << (string(string(string(\"Hello, \") + string(name)) + string(\" \")) + string(py_str(version))) << endl;"
        ));
    }

    #[test]
    fn range_with_step_becomes_counted_loop() {
        let cpp = translate("for i in range(0, 10, 2):\n    print(i)\n").expect("codegen");
        assert!(cpp.contains(
            "    for (int i = 0; i < 10; i += 2) {\n        cout << i << endl;\n    }\n"
        ));

        let cpp = translate("for i in range(5, 0, -1):\n    print(i)\n").expect("codegen");
        assert!(cpp.contains("for (int i = 5; i > 0; i += (-1)) {"));

        let cpp = translate("for i in range(3):\n    pass\n").expect("codegen");
        assert!(cpp.contains("for (int i = 0; i < 3; i++) {"));
    }

    #[test]
    fn prints_lists_element_by_element() {
        let cpp = translate("data = [3, 1, 2]\nprint(data)\nprint(\"n\", data)\n").expect("codegen");
        assert!(cpp.contains("    vector<int> data = {3, 1, 2};\n"));
        let expected = [
            r#"    cout << "Array: ";"#,
            "    for (int element : data) {",
            r#"        cout << element << " ";"#,
            "    }",
            "    cout << endl;",
            r#"    cout << "n" << " ";"#,
            "    for (int element : data) {",
        ]
        .join("\n");
        assert!(cpp.contains(&expected));
    }

    #[test]
    fn main_guard_is_inlined_and_script_main_renamed() {
        let cpp = translate(indoc! {r#"
            def main():
                print("hi")

            if __name__ == "__main__":
                main()
        "#})
        .expect("codegen");
        assert!(cpp.contains("void py_main();\n"));
        assert!(cpp.contains("int main() {\n    py_main();\n    return 0;\n}\n"));
        assert!(!cpp.contains("__name__"));
    }

    #[test]
    fn builtins_map_to_cpp_forms() {
        let cpp = translate(indoc! {"
            items = [1, 2]
            n = len(items)
            m = max(n, abs(-4))
            r = float(n) / 2
        "})
        .expect("codegen");
        assert!(cpp.contains("int n = items.size();"));
        assert!(cpp.contains("int m = max(n, abs((-4)));"));
        assert!(cpp.contains("double r = static_cast<double>(n) / 2;"));
    }

    #[test]
    fn reports_codegen_errors() {
        assert_eq!(
            translate("return 1\n").unwrap_err(),
            CodegenError::ReturnOutsideFunction
        );
        assert_eq!(
            translate("def outer():\n    def inner():\n        pass\n").unwrap_err(),
            CodegenError::NestedFunction {
                name: "inner".to_string()
            }
        );
        assert_eq!(
            translate("n = len(1, 2)\n").unwrap_err(),
            CodegenError::BuiltinArity {
                name: "len",
                expected: "1".to_string(),
                found: 2,
            }
        );
        assert!(matches!(
            translate("xs = range(3)\n").unwrap_err(),
            CodegenError::UnsupportedExpression { .. }
        ));
    }
}
