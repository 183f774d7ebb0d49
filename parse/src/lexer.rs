use std::{collections::BTreeSet, ops::Range};

use logos::Logos;

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    #[regex("[0-9]")]
    Digit,
    #[token(".")]
    #[token(",")]
    DecimalSeparator,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex("[a-zA-Z]")]
    Letter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl Operator {
    fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'+' => Operator::Plus,
            b'-' => Operator::Minus,
            b'*' => Operator::Times,
            b'/' => Operator::Divide,
            b'^' => Operator::Power,
            _ => return None,
        })
    }

    pub fn is_additive(self) -> bool {
        matches!(self, Operator::Plus | Operator::Minus)
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(self, Operator::Times | Operator::Divide)
    }
}

/// Deepest accepted nesting of parentheses, and of recursive parse levels.
pub const MAX_DEPTH: usize = 128;

/// Removes spaces and tabs.
pub fn prepare_input(input: &str) -> String {
    input.chars().filter(|c| !matches!(c, ' ' | '\t')).collect()
}

/// Cheap checks run on every (sub)string before it is parsed.
///
/// `letters` are the letters of the registered function names; `x` and `X`
/// are always accepted.
pub fn validate(input: &str, letters: &BTreeSet<char>) -> Result<(), ParseError> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut lexer = Symbol::lexer(input);
    let mut symbols = vec![];
    while let Some(symbol) = lexer.next() {
        let position = lexer.span().start;
        let character = input[position..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        match symbol {
            Ok(Symbol::Letter) if !matches!(character, 'x' | 'X') && !letters.contains(&character) => {
                return Err(ParseError::UnsupportedCharacter {
                    character,
                    position,
                });
            }
            Ok(symbol) => symbols.push((symbol, position)),
            Err(()) => {
                return Err(ParseError::UnsupportedCharacter {
                    character,
                    position,
                });
            }
        }
    }

    for pair in symbols.windows(2) {
        if let [(Symbol::Caret, position), (Symbol::Plus | Symbol::Minus, _)] = pair {
            return Err(ParseError::AmbiguousExponentSign {
                position: *position,
            });
        }
    }

    if let Some(&(last, position)) = symbols.last()
        && matches!(
            last,
            Symbol::Plus | Symbol::Minus | Symbol::Asterisk | Symbol::Caret | Symbol::LParen
        )
    {
        return Err(ParseError::DanglingOperator(char::from(
            input.as_bytes()[position],
        )));
    }

    let mut depth = 0usize;
    for &(symbol, _) in &symbols {
        match symbol {
            Symbol::LParen => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(ParseError::TooDeep(MAX_DEPTH));
                }
            }
            Symbol::RParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ParseError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParentheses);
    }

    Ok(())
}

/// Index of the parenthesis matching the one at `position`, searching forward
/// from `(` and backward from `)`.
pub fn find_matching_brace(input: &str, position: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let (open, close, forward) = match bytes.get(position)? {
        b'(' => (b'(', b')', true),
        b')' => (b')', b'(', false),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut check = |index: usize| {
        let byte = bytes[index];
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth -= 1;
        }
        depth == 0
    };

    if forward {
        (position..bytes.len()).find(|&index| check(index))
    } else {
        (0..=position).rev().find(|&index| check(index))
    }
}

/// Top-level operands of an expression, as byte ranges into the input, and
/// the operators between them. `spans.len() == operators.len() + 1`.
#[derive(Debug, PartialEq)]
pub struct Tokens {
    pub spans: Vec<Range<usize>>,
    pub operators: Vec<Operator>,
}

/// Splits `input` at every operator outside parentheses.
///
/// A parenthesized group is taken whole. An operator with nothing before it
/// in the current token (a leading sign) stays part of that token.
pub fn tokenize(input: &str) -> Result<Tokens, ParseError> {
    let bytes = input.as_bytes();
    let mut spans = vec![];
    let mut operators = vec![];
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'(' {
            index = find_matching_brace(input, index).ok_or(ParseError::UnbalancedParentheses)? + 1;
            continue;
        }

        if let Some(operator) = Operator::from_byte(bytes[index])
            && index > start
        {
            spans.push(start..index);
            operators.push(operator);
            start = index + 1;
        }

        index += 1;
    }

    if start < bytes.len() {
        spans.push(start..bytes.len());
    }

    if spans.len() != operators.len() + 1 {
        return Err(ParseError::Malformed(input.into()));
    }

    Ok(Tokens { spans, operators })
}
