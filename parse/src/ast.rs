use crate::functions::FunctionKind;

/// Divisors closer to zero than this make a product undefined.
pub const DIVISION_EPSILON: f64 = 1e-9;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Exponent {
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct Summand {
    pub sign: Sign,
    pub expression: Expression,
}

#[derive(Debug, Clone)]
pub struct Factor {
    pub exponent: Exponent,
    pub expression: Expression,
}

/// An immutable expression tree in the single free variable `x`.
///
/// Equality is structural: children of one `Sum` or `Product` are compared as
/// a multiset, everything else positionally. `(a+b)+c` and `a+(b+c)` are
/// therefore different expressions even though they evaluate identically.
#[derive(Debug, Clone)]
pub enum Expression {
    Variable,
    Constant(f64),
    Sum(Vec<Summand>),
    Product(Vec<Factor>),
    Power {
        base: Box<Expression>,
        exponent: Box<Expression>,
    },
    Function {
        kind: FunctionKind,
        argument: Box<Expression>,
    },
}

impl Summand {
    pub fn new(sign: Sign, expression: Expression) -> Self {
        Self { sign, expression }
    }

    pub fn plus(expression: Expression) -> Self {
        Self::new(Sign::Plus, expression)
    }

    pub fn minus(expression: Expression) -> Self {
        Self::new(Sign::Minus, expression)
    }
}

impl Factor {
    pub fn new(exponent: Exponent, expression: Expression) -> Self {
        Self {
            exponent,
            expression,
        }
    }

    pub fn times(expression: Expression) -> Self {
        Self::new(Exponent::Positive, expression)
    }

    pub fn divide(expression: Expression) -> Self {
        Self::new(Exponent::Negative, expression)
    }
}

impl PartialEq for Summand {
    fn eq(&self, other: &Self) -> bool {
        self.sign == other.sign && self.expression == other.expression
    }
}

impl PartialEq for Factor {
    fn eq(&self, other: &Self) -> bool {
        self.exponent == other.exponent && self.expression == other.expression
    }
}

/// Every element of `left` is matched with a distinct equal element of `right`.
fn same_multiset<T: PartialEq>(left: &[T], right: &[T]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut unmatched: Vec<&T> = right.iter().collect();
    for item in left {
        match unmatched.iter().position(|candidate| *candidate == item) {
            Some(index) => {
                unmatched.swap_remove(index);
            }
            None => return false,
        }
    }
    unmatched.is_empty()
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        use Expression::*;
        match (self, other) {
            (Variable, Variable) => true,
            (Constant(l), Constant(r)) => l == r,
            (Sum(l), Sum(r)) => same_multiset(l, r),
            (Product(l), Product(r)) => same_multiset(l, r),
            (
                Power {
                    base: lb,
                    exponent: le,
                },
                Power {
                    base: rb,
                    exponent: re,
                },
            ) => lb == rb && le == re,
            (
                Function {
                    kind: lk,
                    argument: la,
                },
                Function {
                    kind: rk,
                    argument: ra,
                },
            ) => lk == rk && la == ra,
            _ => false,
        }
    }
}

fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl Expression {
    pub fn constant(value: f64) -> Self {
        Expression::Constant(value)
    }

    pub fn power(base: Expression, exponent: Expression) -> Self {
        Expression::Power {
            base: Box::new(base),
            exponent: Box::new(exponent),
        }
    }

    pub fn function(kind: FunctionKind, argument: Expression) -> Self {
        Expression::Function {
            kind,
            argument: Box::new(argument),
        }
    }

    /// Only used to decide where printing needs parentheses.
    pub fn level(&self) -> u8 {
        match self {
            Expression::Variable | Expression::Constant(_) => 0,
            Expression::Sum(_) => 1,
            Expression::Product(_) => 2,
            Expression::Power { .. } | Expression::Function { .. } => 3,
        }
    }

    /// Whether the printed form is a single atom that never needs parentheses.
    pub fn is_monadic(&self) -> bool {
        matches!(
            self,
            Expression::Variable | Expression::Constant(_) | Expression::Function { .. }
        )
    }

    /// Evaluates the expression at `x`, or `None` where it is undefined.
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        match self {
            Expression::Variable => Some(x),
            Expression::Constant(value) => Some(*value),
            Expression::Sum(summands) => {
                let mut result = 0.0;
                for Summand { sign, expression } in summands {
                    let value = expression.evaluate(x)?;
                    match sign {
                        Sign::Plus => result += value,
                        Sign::Minus => result -= value,
                    }
                }
                defined(result)
            }
            Expression::Product(factors) => {
                let mut result = 1.0;
                for Factor {
                    exponent,
                    expression,
                } in factors
                {
                    let value = expression.evaluate(x)?;
                    match exponent {
                        Exponent::Positive => result *= value,
                        Exponent::Negative => {
                            if value.abs() < DIVISION_EPSILON {
                                return None;
                            }
                            result /= value;
                        }
                    }
                    if !result.is_finite() {
                        return None;
                    }
                }
                Some(result)
            }
            Expression::Power { base, exponent } => {
                let base = base.evaluate(x)?;
                let exponent = exponent.evaluate(x)?;
                defined(base.powf(exponent))
            }
            Expression::Function { kind, argument } => {
                let argument = argument.evaluate(x)?;
                defined(kind.apply(argument))
            }
        }
    }

    /// Renders the expression in the syntax accepted by the parser.
    ///
    /// Constants use six fixed decimals, so `4.8` prints as `4.800000`.
    pub fn print(&self) -> Option<String> {
        match self {
            Expression::Variable => Some("x".into()),
            Expression::Constant(value) => Some(format!("{value:.6}")),
            Expression::Sum(summands) => {
                let mut printed = String::new();
                for Summand { sign, expression } in summands {
                    let term = expression.print()?;
                    match sign {
                        Sign::Plus if !printed.is_empty() => printed.push('+'),
                        Sign::Plus => {}
                        Sign::Minus => printed.push('-'),
                    }
                    printed += &term;
                }
                Some(printed)
            }
            Expression::Product(factors) => {
                let mut printed = String::new();
                for Factor {
                    exponent,
                    expression,
                } in factors
                {
                    let mut factor = expression.print()?;
                    // only a directly nested sum gets parentheses here
                    if expression.level() + 1 == self.level() {
                        factor = format!("({factor})");
                    }
                    match exponent {
                        Exponent::Positive if !printed.is_empty() => printed.push('*'),
                        Exponent::Positive => {}
                        Exponent::Negative => {
                            if printed.is_empty() {
                                printed += "1.0";
                            }
                            printed.push('/');
                        }
                    }
                    printed += &factor;
                }
                Some(printed)
            }
            Expression::Power { base, exponent } => Some(format!(
                "{}^{}",
                base.print_as_operand()?,
                exponent.print_as_operand()?
            )),
            Expression::Function { kind, argument } => {
                Some(format!("{}({})", kind.name(), argument.print()?))
            }
        }
    }

    /// Operand of `^`. A negative constant carries a sign, and `^-` is rejected
    /// by the parser, so it is wrapped like any non-monadic operand.
    fn print_as_operand(&self) -> Option<String> {
        let printed = self.print()?;
        let signed = matches!(self, Expression::Constant(value) if value.is_sign_negative());
        if self.is_monadic() && !signed {
            Some(printed)
        } else {
            Some(format!("({printed})"))
        }
    }
}
