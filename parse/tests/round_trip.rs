use parse::{
    Expression::{self, Constant as Num, Variable as X},
    Factor, FunctionKind, Summand,
    ast_parser::parse,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn sum(summands: impl Into<Vec<Summand>>) -> Expression {
    Expression::Sum(summands.into())
}

fn product(factors: impl Into<Vec<Factor>>) -> Expression {
    Expression::Product(factors.into())
}

fn x_plus_one() -> Expression {
    sum([Summand::plus(X), Summand::plus(Num(1.0))])
}

fn x_plus(a: f64, b: f64, c: f64) -> Expression {
    sum([
        Summand::plus(X),
        Summand::plus(Num(a)),
        Summand::minus(Num(b)),
        Summand::plus(Num(c)),
    ])
}

fn double_x() -> Expression {
    product([Factor::times(Num(2.0)), Factor::times(X)])
}

fn quotient() -> Expression {
    product([
        Factor::times(Num(2.0)),
        Factor::times(Expression::power(X, Num(3.0))),
        Factor::divide(sum([
            Summand::plus(X),
            Summand::minus(Expression::power(Num(2.0), X)),
        ])),
    ])
}

fn doubled_sum() -> Expression {
    product([Factor::times(Num(2.0)), Factor::times(x_plus_one())])
}

fn squared_sum() -> Expression {
    Expression::power(x_plus_one(), Num(2.0))
}

fn sum_to_fraction() -> Expression {
    Expression::power(
        x_plus_one(),
        product([Factor::times(X), Factor::divide(Num(3.0))]),
    )
}

fn alternating() -> Expression {
    sum([
        Summand::plus(X),
        Summand::minus(Num(1.0)),
        Summand::plus(Num(2.0)),
        Summand::minus(Num(3.0)),
    ])
}

#[rstest]
#[case(double_x(), "2.000000*x", 0.2)]
#[case(quotient(), "2.000000*x^3.000000/(x-2.000000^x)", -0.00205809)]
#[case(doubled_sum(), "2.000000*(x+1.000000)", 2.2)]
#[case(squared_sum(), "(x+1.000000)^2.000000", 1.21)]
#[case(sum_to_fraction(), "(x+1.000000)^(x/3.000000)", 1.003182058)]
#[case(alternating(), "x-1.000000+2.000000-3.000000", -1.9)]
#[case(x_plus(1.0, 2.0, 3.0), "x+1.000000-2.000000+3.000000", 2.1)]
#[case(x_plus(1.0, 4.0, 7.0), "x+1.000000-4.000000+7.000000", 4.1)]
fn print_evaluate_and_parse_back(
    #[case] expression: Expression,
    #[case] printed: &str,
    #[case] at_one_tenth: f64,
) {
    assert_eq!(expression.print().as_deref(), Some(printed));

    let value = expression.evaluate(0.1).unwrap();
    assert!((value - at_one_tenth).abs() < 1e-7, "{value} != {at_one_tenth}");

    assert_eq!(parse(printed), Some(expression));
}

#[test]
fn similar_sums_differ() {
    assert_ne!(x_plus(1.0, 2.0, 3.0), x_plus(1.0, 4.0, 7.0));
    assert_ne!(x_plus(1.0, 2.0, 3.0), alternating());
}

#[test]
fn reordered_operands_are_equal() {
    assert_eq!(
        parse("1+x-2+3").unwrap(),
        parse("x+3-2+1").unwrap(),
    );
    assert_eq!(parse("2*x/3").unwrap(), parse("x/3*2").unwrap());
    assert_ne!(parse("2*x/3").unwrap(), parse("3*x/2").unwrap());
    assert_ne!(parse("2^x").unwrap(), parse("x^2").unwrap());
}

#[rstest]
#[case("sin(x)")]
#[case("-x+abs(x)")]
#[case("x^(-2)")]
#[case("(x+3.1)*-2.1+1.1")]
#[case("ln(x)/exp(x)")]
#[case("cos(2*x)^2-tan(x/2)")]
#[case("3^x^2")]
fn printed_formulas_parse_back(#[case] input: &str) {
    let expression = parse(input).unwrap();
    let printed = expression.print().unwrap();
    assert_eq!(parse(&printed), Some(expression), "printed: {printed}");
}

/// A sum subtracted from a sum, or a product divided by a product, prints
/// without the parentheses that kept it together.
#[rstest]
#[case("x-(x+1)", "x-x+1.000000", -1.0, 1.0)]
#[case("2/(x*x)", "2.000000/x*x", 0.5, 2.0)]
fn nested_same_level_operands_lose_their_parentheses(
    #[case] input: &str,
    #[case] printed: &str,
    #[case] value_at_two: f64,
    #[case] reparsed_value_at_two: f64,
) {
    let expression = parse(input).unwrap();
    assert_eq!(expression.print().as_deref(), Some(printed));
    assert_eq!(expression.evaluate(2.0), Some(value_at_two));

    let reparsed = parse(printed).unwrap();
    assert_ne!(reparsed, expression);
    assert_eq!(reparsed.evaluate(2.0), Some(reparsed_value_at_two));
}

#[test]
fn function_names_print_lowercase() {
    for kind in [
        FunctionKind::Abs,
        FunctionKind::Sin,
        FunctionKind::Cos,
        FunctionKind::Tan,
        FunctionKind::Exp,
        FunctionKind::Ln,
    ] {
        let printed = Expression::function(kind, X).print().unwrap();
        assert_eq!(printed, format!("{}(x)", kind.name()));
        assert_eq!(parse(&printed), Some(Expression::function(kind, X)));
    }
}
