use std::{collections::BTreeSet, iter::zip};

use log::{debug, trace};

use crate::{
    ast::{Expression, Factor, Summand},
    error::ParseError,
    functions::{FUNCTIONS, FunctionRegistry},
    lexer::{MAX_DEPTH, Operator, Tokens, find_matching_brace, prepare_input, tokenize, validate},
};

/// Recursive-descent parser for formulas in `x`.
///
/// Each level splits the input at its loosest top-level operator and parses
/// the pieces again: sums, then products, then powers, then function calls.
pub struct Parser<'a> {
    functions: &'a FunctionRegistry,
    letters: BTreeSet<char>,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Parser::new(&FUNCTIONS)
    }
}

/// `optional sign, digits, optional '.' or ',', optional digits`
fn is_numeric_constant(input: &str) -> bool {
    let unsigned = input.strip_prefix(['+', '-']).unwrap_or(input);
    let integer_digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if integer_digits == 0 {
        return false;
    }
    let rest = &unsigned[integer_digits..];
    let rest = rest.strip_prefix(['.', ',']).unwrap_or(rest);
    rest.bytes().all(|b| b.is_ascii_digit())
}

fn parse_constant(input: &str) -> Result<Expression, ParseError> {
    match input.replace(',', ".").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Expression::Constant(value)),
        _ => Err(ParseError::InvalidNumber(input.into())),
    }
}

impl<'a> Parser<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self {
            functions,
            letters: functions.letters(),
        }
    }

    pub fn parse(&self, input: &str) -> Option<Expression> {
        match self.try_parse(input) {
            Ok(expression) => Some(expression),
            Err(error) => {
                debug!("rejected {input:?}: {error}");
                None
            }
        }
    }

    pub fn is_parseable(&self, input: &str) -> bool {
        self.parse(input).is_some()
    }

    pub fn try_parse(&self, input: &str) -> Result<Expression, ParseError> {
        trace!("parsing {input:?}");
        self.parse_prepared(&prepare_input(input), 0)
    }

    /// `depth` counts the enclosing levels, at most [`MAX_DEPTH`].
    fn parse_prepared(&self, input: &str, depth: usize) -> Result<Expression, ParseError> {
        if depth > MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        validate(input, &self.letters)?;
        let depth = depth + 1;

        if input.starts_with('(') && find_matching_brace(input, 0) == Some(input.len() - 1) {
            return self.parse_prepared(&input[1..input.len() - 1], depth);
        }

        if input.eq_ignore_ascii_case("x") {
            return Ok(Expression::Variable);
        }

        if is_numeric_constant(input) {
            return parse_constant(input);
        }

        let tokens = tokenize(input)?;

        if tokens.spans.len() == 1
            && let Some(sign @ ('+' | '-')) = input.chars().next()
        {
            let operand = self.parse_prepared(&input[1..], depth)?;
            return Ok(if sign == '-' {
                Expression::Sum(vec![Summand::minus(operand)])
            } else {
                operand
            });
        }

        let operators = &tokens.operators;
        if operators.iter().any(|o| o.is_additive()) {
            self.parse_sum(input, &tokens, depth)
        } else if operators.iter().any(|o| o.is_multiplicative()) {
            self.parse_product(input, &tokens, depth)
        } else if !operators.is_empty() {
            self.parse_power(input, &tokens, depth)
        } else {
            self.parse_call(input, depth)
        }
    }

    /// Splits at the operators `belongs` accepts, gluing everything else back
    /// onto the current operand. Each operand comes with the operator before it.
    fn parse_operands(
        &self,
        input: &str,
        tokens: &Tokens,
        belongs: fn(Operator) -> bool,
        depth: usize,
    ) -> Result<Vec<(Option<Operator>, Expression)>, ParseError> {
        let mut operands = vec![];
        let mut preceding = None;
        let mut current = tokens.spans[0].clone();

        for (&operator, span) in zip(&tokens.operators, &tokens.spans[1..]) {
            if belongs(operator) {
                operands.push((preceding, self.parse_prepared(&input[current], depth)?));
                preceding = Some(operator);
                current = span.clone();
            } else {
                current.end = span.end;
            }
        }

        operands.push((preceding, self.parse_prepared(&input[current], depth)?));
        Ok(operands)
    }

    fn parse_sum(&self, input: &str, tokens: &Tokens, depth: usize) -> Result<Expression, ParseError> {
        let summands = self
            .parse_operands(input, tokens, Operator::is_additive, depth)?
            .into_iter()
            .map(|(operator, expression)| match operator {
                Some(Operator::Minus) => Summand::minus(expression),
                _ => Summand::plus(expression),
            })
            .collect();
        Ok(Expression::Sum(summands))
    }

    fn parse_product(&self, input: &str, tokens: &Tokens, depth: usize) -> Result<Expression, ParseError> {
        let factors = self
            .parse_operands(input, tokens, Operator::is_multiplicative, depth)?
            .into_iter()
            .map(|(operator, expression)| match operator {
                Some(Operator::Divide) => Factor::divide(expression),
                _ => Factor::times(expression),
            })
            .collect();
        Ok(Expression::Product(factors))
    }

    /// `a^b^c` is `a^(b^c)`: the exponent is everything after the first `^`.
    fn parse_power(&self, input: &str, tokens: &Tokens, depth: usize) -> Result<Expression, ParseError> {
        if tokens.operators.iter().any(|&o| o != Operator::Power) {
            return Err(ParseError::Malformed(input.into()));
        }

        let base = &input[tokens.spans[0].clone()];
        let exponent_start = tokens.spans[1].start;
        let exponent = &input[exponent_start..];

        Ok(Expression::power(
            self.parse_prepared(base, depth)?,
            self.parse_prepared(exponent, depth)?,
        ))
    }

    /// `name(argument)` with `name` registered.
    fn parse_call(&self, input: &str, depth: usize) -> Result<Expression, ParseError> {
        let Some(open) = input.find('(') else {
            return Err(ParseError::Malformed(input.into()));
        };
        let name = &input[..open];
        if name.is_empty() || find_matching_brace(input, open) != Some(input.len() - 1) {
            return Err(ParseError::Malformed(input.into()));
        }

        let constructor = self
            .functions
            .get(name)
            .ok_or_else(|| ParseError::UnknownFunction(name.into()))?;
        let argument = self.parse_prepared(&input[open + 1..input.len() - 1], depth)?;
        Ok(constructor(argument))
    }
}

/// Parses with the built-in functions.
pub fn parse(input: &str) -> Option<Expression> {
    Parser::default().parse(input)
}

pub fn is_parseable(input: &str) -> bool {
    Parser::default().is_parseable(input)
}
