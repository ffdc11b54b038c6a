use crate::ast::{Expression, Statement};

#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    Expression(&'a Expression),
}

/// Pre-order walk over every statement and expression in a block.
pub fn walk_block<'a, F: FnMut(Node<'a>)>(statements: &'a [Statement], visit: &mut F) {
    for statement in statements {
        walk_statement(statement, visit);
    }
}

fn walk_statement<'a, F: FnMut(Node<'a>)>(statement: &'a Statement, visit: &mut F) {
    visit(Node::Statement(statement));
    for expr in own_expressions(statement) {
        walk_expression(expr, visit);
    }
    match statement {
        Statement::FunctionDef { body, .. }
        | Statement::While { body, .. }
        | Statement::For { body, .. } => walk_block(body, visit),
        Statement::If {
            then_body,
            else_body,
            ..
        } => {
            walk_block(then_body, visit);
            if let Some(else_body) = else_body {
                walk_block(else_body, visit);
            }
        }
        Statement::Assign { .. }
        | Statement::ListAssign { .. }
        | Statement::Print(_)
        | Statement::Return(_)
        | Statement::Pass
        | Statement::Expr(_) => {}
    }
}

/// Expressions a statement evaluates itself, not counting nested bodies.
pub fn own_expressions(statement: &Statement) -> Vec<&Expression> {
    match statement {
        Statement::Assign { value, .. } => vec![value],
        Statement::ListAssign {
            list, index, value, ..
        } => vec![list, index, value],
        Statement::Print(args) => args.iter().collect(),
        Statement::If { condition, .. } | Statement::While { condition, .. } => vec![condition],
        Statement::For { iterable, .. } => vec![iterable],
        Statement::Return(Some(value)) | Statement::Expr(value) => vec![value],
        Statement::FunctionDef { .. } | Statement::Return(None) | Statement::Pass => Vec::new(),
    }
}

pub fn walk_expression<'a, F: FnMut(Node<'a>)>(expr: &'a Expression, visit: &mut F) {
    visit(Node::Expression(expr));
    match expr {
        Expression::Number(_)
        | Expression::Float(_)
        | Expression::String(_)
        | Expression::Boolean(_)
        | Expression::Variable(_) => {}
        Expression::List(elements) | Expression::Call { args: elements, .. } => {
            for element in elements {
                walk_expression(element, visit);
            }
        }
        Expression::ListAccess { list, index } => {
            walk_expression(list, visit);
            walk_expression(index, visit);
        }
        Expression::BinaryOp { left, right, .. } => {
            walk_expression(left, visit);
            walk_expression(right, visit);
        }
        Expression::UnaryOp { operand, .. } => walk_expression(operand, visit),
        Expression::Range { start, end, step } => {
            walk_expression(start, visit);
            if let Some(end) = end {
                walk_expression(end, visit);
            }
            if let Some(step) = step {
                walk_expression(step, visit);
            }
        }
    }
}
