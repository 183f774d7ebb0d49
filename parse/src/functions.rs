use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::ast::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    Abs,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
}

impl FunctionKind {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Raw result; callers treat non-finite values as undefined.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            FunctionKind::Abs => x.abs(),
            FunctionKind::Sin => x.sin(),
            FunctionKind::Cos => x.cos(),
            FunctionKind::Tan => x.tan(),
            FunctionKind::Exp => x.exp(),
            FunctionKind::Ln => x.ln(),
        }
    }

    fn construct(self, argument: Expression) -> Expression {
        Expression::function(self, argument)
    }
}

pub type Constructor = Box<dyn Fn(Expression) -> Expression + Send + Sync>;

/// Maps function names to constructors of the node wrapping their argument.
#[derive(Default)]
pub struct FunctionRegistry {
    constructors: BTreeMap<String, Constructor>,
}

/// Read-only registry holding the built-in functions, shared by every default
/// [`Parser`](crate::ast_parser::Parser).
pub static FUNCTIONS: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::builtin);

impl FunctionRegistry {
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for kind in FunctionKind::iter() {
            registry.register(kind.name(), move |argument| kind.construct(argument));
        }
        registry
    }

    /// Returns `false` and keeps the existing entry if `name` is already taken.
    pub fn register(
        &mut self,
        name: &str,
        constructor: impl Fn(Expression) -> Expression + Send + Sync + 'static,
    ) -> bool {
        if name.is_empty()
            || !name.chars().all(|c| c.is_ascii_alphabetic())
            || self.constructors.contains_key(name)
        {
            return false;
        }
        self.constructors.insert(name.into(), Box::new(constructor));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Constructor> {
        self.constructors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Every letter that occurs in some registered name.
    pub fn letters(&self) -> BTreeSet<char> {
        self.names().flat_map(str::chars).collect()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_names() {
        assert_eq!(
            FUNCTIONS.names().collect::<Vec<_>>(),
            ["abs", "cos", "exp", "ln", "sin", "tan"]
        );
        assert_eq!(
            FUNCTIONS.letters().into_iter().collect::<String>(),
            "abceilnopstx"
        );
    }

    #[test]
    fn second_registration_is_ignored() {
        let mut registry = FunctionRegistry::builtin();
        assert!(!registry.register("sin", |argument| argument));
        let sin = registry.get("sin").unwrap();
        assert_eq!(
            sin(Expression::Variable),
            Expression::function(FunctionKind::Sin, Expression::Variable)
        );

        assert!(registry.register("sq", |argument| {
            Expression::power(argument, Expression::Constant(2.0))
        }));
        assert!(!registry.register("sq", |argument| argument));
        assert!(registry.contains("sq"));
        assert!(registry.letters().contains(&'q'));
    }

    #[test]
    fn names_must_be_letters() {
        let mut registry = FunctionRegistry::default();
        assert!(!registry.register("", |argument| argument));
        assert!(!registry.register("log2", |argument| argument));
        assert!(!registry.register("a b", |argument| argument));
        assert_eq!(registry.names().count(), 0);
    }
}
