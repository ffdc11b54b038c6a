use std::ops::RangeInclusive;

/// Calls the translator lowers specially instead of emitting a plain call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Len,
    Str,
    Int,
    Float,
    Abs,
    Min,
    Max,
    Range,
}

impl BuiltinFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Self::Len),
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "abs" => Some(Self::Abs),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "range" => Some(Self::Range),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Range => "range",
        }
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Self::Len | Self::Str | Self::Int | Self::Float | Self::Abs => 1..=1,
            Self::Min | Self::Max => 2..=2,
            Self::Range => 1..=3,
        }
    }
}
