//! Static types for the generated C++ and the syntactic inference that picks
//! them.
//!
//! Inference never looks past the expression in front of it: literal shapes
//! decide directly, variables and calls defer to whatever has already been
//! bound, and everything else falls back to `auto`.

use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::builtins::BuiltinFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CppType {
    Int,
    /// Integer literals that do not fit in 32 bits.
    Long,
    Double,
    Bool,
    Str,
    IntVector,
    Auto,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFamily {
    Numeric,
    Text,
    List,
}

impl CppType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long long",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::IntVector => "vector<int>",
            Self::Auto => "auto",
            Self::Void => "void",
        }
    }

    /// Spelling for a function parameter; containers are passed by
    /// reference so in-place updates reach the caller.
    pub fn param_name(self) -> &'static str {
        match self {
            Self::IntVector => "vector<int>&",
            other => other.name(),
        }
    }

    fn family(self) -> Option<TypeFamily> {
        match self {
            Self::Int | Self::Long | Self::Double | Self::Bool => Some(TypeFamily::Numeric),
            Self::Str => Some(TypeFamily::Text),
            Self::IntVector => Some(TypeFamily::List),
            Self::Auto | Self::Void => None,
        }
    }

    /// Whether a value of `other` cannot be stored in a variable declared as
    /// `self`. `auto` is compatible with everything.
    pub fn conflicts_with(self, other: CppType) -> bool {
        match (self.family(), other.family()) {
            (Some(declared), Some(found)) => declared != found,
            _ => false,
        }
    }
}

/// What inference may ask about names it cannot classify on its own.
pub trait TypeContext {
    fn variable_type(&self, name: &str) -> Option<CppType>;
    fn return_type(&self, function: &str) -> Option<CppType>;
}

pub fn infer_type(expr: &Expression, ctx: &impl TypeContext) -> CppType {
    match expr {
        Expression::Number(value) => {
            if i32::try_from(*value).is_ok() {
                CppType::Int
            } else {
                CppType::Long
            }
        }
        Expression::Float(_) => CppType::Double,
        Expression::String(_) => CppType::Str,
        Expression::Boolean(_) => CppType::Bool,
        Expression::List(_) => CppType::IntVector,
        Expression::Variable(name) => ctx.variable_type(name).unwrap_or(CppType::Auto),
        Expression::ListAccess { .. } => CppType::Int,
        Expression::BinaryOp { left, op, right } => {
            if op.is_comparison() || op.is_logical() {
                return CppType::Bool;
            }
            let left_type = infer_type(left, ctx);
            let right_type = infer_type(right, ctx);
            if *op == BinaryOperator::Add
                && (is_text_operand(left)
                    || is_text_operand(right)
                    || left_type == CppType::Str
                    || right_type == CppType::Str)
            {
                return CppType::Str;
            }
            numeric_result(left_type, right_type)
        }
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => CppType::Bool,
        Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => infer_type(operand, ctx),
        Expression::Call { name, args } => match BuiltinFunction::from_name(name) {
            Some(BuiltinFunction::Len | BuiltinFunction::Int) => CppType::Int,
            Some(BuiltinFunction::Str) => CppType::Str,
            Some(BuiltinFunction::Float) => CppType::Double,
            Some(BuiltinFunction::Abs) => args
                .first()
                .map_or(CppType::Auto, |arg| infer_type(arg, ctx)),
            Some(BuiltinFunction::Min | BuiltinFunction::Max) => match args.as_slice() {
                [left, right] => numeric_result(infer_type(left, ctx), infer_type(right, ctx)),
                _ => CppType::Auto,
            },
            Some(BuiltinFunction::Range) => CppType::Auto,
            None => ctx.return_type(name).unwrap_or(CppType::Auto),
        },
        Expression::Range { .. } => CppType::Auto,
    }
}

/// Usual arithmetic conversions: `double` beats `long long` beats `int`.
pub fn numeric_result(left: CppType, right: CppType) -> CppType {
    fn rank(ty: CppType) -> Option<u8> {
        match ty {
            CppType::Bool | CppType::Int => Some(0),
            CppType::Long => Some(1),
            CppType::Double => Some(2),
            _ => None,
        }
    }
    match (rank(left), rank(right)) {
        (Some(left), Some(right)) => match left.max(right) {
            0 => CppType::Int,
            1 => CppType::Long,
            _ => CppType::Double,
        },
        _ => CppType::Auto,
    }
}

/// Operands that force `+` to mean text concatenation: string literals,
/// `str()` calls, and concatenations built from them.
pub fn is_text_operand(expr: &Expression) -> bool {
    match expr {
        Expression::String(_) => true,
        Expression::Call { name, .. } => {
            BuiltinFunction::from_name(name) == Some(BuiltinFunction::Str)
        }
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Add,
            right,
        } => is_text_operand(left) || is_text_operand(right),
        _ => false,
    }
}

/// Names declared so far in one C++ function body.
///
/// A name enters on its first assignment and stays for the rest of the
/// body. Loop counters are scoped to their loop the same way C++ scopes
/// them.
#[derive(Debug, Default)]
pub struct BindingTable {
    declared: HashMap<String, CppType>,
    loop_vars: Vec<(String, CppType)>,
}

impl BindingTable {
    pub fn with_params(params: &[(String, CppType)]) -> Self {
        Self {
            declared: params.iter().cloned().collect(),
            loop_vars: Vec::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<CppType> {
        self.loop_vars
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, ty)| *ty)
            .or_else(|| self.declared.get(name).copied())
    }

    pub fn declare(&mut self, name: &str, ty: CppType) {
        self.declared.insert(name.to_string(), ty);
    }

    pub fn push_loop_var(&mut self, name: &str, ty: CppType) {
        self.loop_vars.push((name.to_string(), ty));
    }

    pub fn pop_loop_var(&mut self) {
        self.loop_vars.pop();
    }
}
