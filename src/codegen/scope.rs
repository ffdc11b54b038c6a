//! Replays the declarations of one C++ function body without emitting
//! anything.
//!
//! The generator declares a name where it is first assigned. When that
//! happens inside an `if`, `while` or `for` body the C++ declaration would
//! end with the block, so such names are reported as hoisted and declared
//! up front instead. Signature inference reuses the same replay to see
//! local types at every call site and return.

use std::collections::HashMap;

use crate::ast::{Expression, Statement};

use super::types::{BindingTable, CppType, TypeContext, infer_type};
use super::walk::{Node, own_expressions, walk_expression};

/// A call seen during the replay, with the type of each argument at that
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub callee: String,
    pub arg_types: Vec<CppType>,
}

#[derive(Debug, Default)]
pub struct ScopeSummary {
    /// Names first assigned inside a nested block, in source order.
    pub hoisted: Vec<(String, CppType)>,
    /// Type of the first `return <expr>`, if any.
    pub first_return: Option<CppType>,
    pub calls: Vec<CallSite>,
}

pub struct LocalScope<'a> {
    locals: BindingTable,
    return_types: &'a HashMap<String, CppType>,
    summary: ScopeSummary,
}

impl<'a> LocalScope<'a> {
    pub fn new(params: &[(String, CppType)], return_types: &'a HashMap<String, CppType>) -> Self {
        Self {
            locals: BindingTable::with_params(params),
            return_types,
            summary: ScopeSummary::default(),
        }
    }

    pub fn scan<'s>(mut self, statements: impl IntoIterator<Item = &'s Statement>) -> ScopeSummary {
        for statement in statements {
            self.scan_statement(statement, 0);
        }
        self.summary
    }

    fn scan_block(&mut self, statements: &[Statement], depth: usize) {
        for statement in statements {
            self.scan_statement(statement, depth);
        }
    }

    fn scan_statement(&mut self, statement: &Statement, depth: usize) {
        self.record_calls(statement);
        match statement {
            Statement::Assign { name, value } => {
                if self.locals.lookup(name).is_none() {
                    let ty = infer_type(value, &*self);
                    self.locals.declare(name, ty);
                    if depth > 0 {
                        self.summary.hoisted.push((name.clone(), ty));
                    }
                }
            }
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                self.scan_block(then_body, depth + 1);
                if let Some(else_body) = else_body {
                    self.scan_block(else_body, depth + 1);
                }
            }
            Statement::While { body, .. } => self.scan_block(body, depth + 1),
            Statement::For {
                var_name,
                iterable,
                body,
            } => {
                let element_type = loop_element_type(iterable, &*self);
                self.locals.push_loop_var(var_name, element_type);
                self.scan_block(body, depth + 1);
                self.locals.pop_loop_var();
            }
            Statement::Return(Some(value)) => {
                if self.summary.first_return.is_none() {
                    self.summary.first_return = Some(infer_type(value, &*self));
                }
            }
            Statement::FunctionDef { .. }
            | Statement::ListAssign { .. }
            | Statement::Print(_)
            | Statement::Return(None)
            | Statement::Pass
            | Statement::Expr(_) => {}
        }
    }

    fn record_calls(&mut self, statement: &Statement) {
        let mut calls = Vec::new();
        for expr in own_expressions(statement) {
            walk_expression(expr, &mut |node| {
                if let Node::Expression(Expression::Call { name, args }) = node {
                    calls.push(CallSite {
                        callee: name.clone(),
                        arg_types: args.iter().map(|arg| infer_type(arg, &*self)).collect(),
                    });
                }
            });
        }
        self.summary.calls.extend(calls);
    }
}

impl TypeContext for LocalScope<'_> {
    fn variable_type(&self, name: &str) -> Option<CppType> {
        self.locals.lookup(name)
    }

    fn return_type(&self, function: &str) -> Option<CppType> {
        self.return_types.get(function).copied()
    }
}

/// Counters of `range` loops and elements of `vector<int>` are `int`;
/// anything else iterates as `auto`.
pub fn loop_element_type(iterable: &Expression, ctx: &impl TypeContext) -> CppType {
    match iterable {
        Expression::Range { .. } => CppType::Int,
        other if infer_type(other, ctx) == CppType::IntVector => CppType::Int,
        _ => CppType::Auto,
    }
}
