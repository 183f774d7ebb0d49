use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("input is empty")]
    Empty,
    #[error("unsupported character '{character}' at {position}")]
    UnsupportedCharacter { character: char, position: usize },
    #[error("'^' followed by a sign at {position}, parenthesize the exponent")]
    AmbiguousExponentSign { position: usize },
    #[error("input ends with '{0}'")]
    DanglingOperator(char),
    #[error("parentheses are not balanced")]
    UnbalancedParentheses,
    #[error("nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("cannot make sense of '{0}'")]
    Malformed(String),
}
