//! Syntax tree shared by the parser and the C++ generator.
//!
//! The parser builds these nodes once; the generator only walks them. Every
//! parent owns its children, so a tree has no sharing and no cycles.

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Variable(String),
    List(Vec<Expression>),
    ListAccess {
        list: Box<Expression>,
        index: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
    /// `range(start)`, `range(start, end)` or `range(start, end, step)`.
    /// With a single argument `start` holds the exclusive upper bound and
    /// counting begins at zero.
    Range {
        start: Box<Expression>,
        end: Option<Box<Expression>>,
        step: Option<Box<Expression>>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    /// C++ spelling. Keyword operators (`and`, `or`) become their symbolic
    /// forms; C++ integer `/` already floors for non-negative operands.
    pub fn cpp_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div | Self::FloorDiv => "/",
            Self::Mod => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::Greater
                | Self::LessEqual
                | Self::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl UnaryOperator {
    pub fn cpp_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

/// Distinguishes `a[i] = v` from the tuple form `a[i], a[j] = a[j], a[i]`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ListAssignMode {
    Store,
    /// The value is a `ListAccess` naming the other slot of an in-place
    /// exchange.
    Swap,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },
    Assign {
        name: String,
        value: Expression,
    },
    ListAssign {
        list: Expression,
        index: Expression,
        value: Expression,
        mode: ListAssignMode,
    },
    Print(Vec<Expression>),
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        var_name: String,
        iterable: Expression,
        body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Pass,
    Expr(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
