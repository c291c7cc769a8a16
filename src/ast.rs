//! The name-resolved surface tree consumed by the checker and the reducer.
//!
//! Parsing, operator shuffling and name qualification happen upstream; by the
//! time a tree reaches this crate every [`Expr::Name`] refers to a local, a
//! global, or a pattern capture, and every pattern has been shuffled (see
//! [`PatternMatch::resolve_unshuffled`]).

use std::sync::Arc;

use crate::{
    span::{SpanBox, SpanSeq, Spanned},
    symbol::{StringInterner, Symbol},
    ty::Ty,
    unique::Uid,
};

pub mod pattern;

pub use pattern::{
    BindScope, EqualTo, FieldPattern, PatternCase, PatternMatch, PatternMatcher,
};

/// An item annotated with its checked type.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed<T> {
    pub item: T,
    pub ty: Arc<Ty>,
}

impl<T> std::ops::Deref for Typed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(Symbol),
}

impl Literal {
    /// The name of the nominal type of `self`.
    pub const fn ty_name(&self) -> &'static str {
        match self {
            Literal::Unit => "Unit",
            Literal::Bool(_) => "Bool",
            Literal::Int(_) => "Int",
            Literal::Float(_) => "Float",
            Literal::Char(_) => "Char",
            Literal::String(_) => "String",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Name(Symbol),
    Call {
        callee: SpanBox<Self>,
        args: SpanSeq<Self>,
    },
    If {
        condition: SpanBox<Self>,
        consequence: SpanBox<Self>,
        alternative: SpanBox<Self>,
    },
    Let {
        name: Spanned<Symbol>,
        value: SpanBox<Self>,
        body: SpanBox<Self>,
    },
    Access {
        value: SpanBox<Self>,
        field: Spanned<Symbol>,
    },
    /// An inline matcher applied to `scrutinees`, e.g.
    /// `match xs, ys with [] _ -> ..; _ [] -> ..`.
    Match {
        scrutinees: SpanSeq<Self>,
        matcher: Box<PatternMatcher>,
    },
}

impl Expr {
    /// Calls `f` on every matcher directly nested in `self`, without
    /// descending into the cases of those matchers.
    pub fn visit_matchers<'a>(&'a self, f: &mut impl FnMut(&'a PatternMatcher)) {
        match self {
            Expr::Literal(_) | Expr::Name(_) => {}
            Expr::Call { callee, args } => {
                callee.visit_matchers(f);
                args.iter().for_each(|arg| arg.visit_matchers(f));
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                condition.visit_matchers(f);
                consequence.visit_matchers(f);
                alternative.visit_matchers(f);
            }
            Expr::Let { value, body, .. } => {
                value.visit_matchers(f);
                body.visit_matchers(f);
            }
            Expr::Access { value, .. } => value.visit_matchers(f),
            Expr::Match {
                scrutinees,
                matcher,
            } => {
                scrutinees.iter().for_each(|s| s.visit_matchers(f));
                f(matcher);
            }
        }
    }

    /// Binds the patterns of every matcher nested in `self`.
    pub fn bind_matchers(self, scope: &mut BindScope<'_>) -> Self {
        fn bind(expr: SpanBox<Expr>, scope: &mut BindScope<'_>) -> SpanBox<Expr> {
            Box::new((*expr).map(|expr| expr.bind_matchers(scope)))
        }

        match self {
            Expr::Literal(_) | Expr::Name(_) => self,
            Expr::Call { callee, args } => {
                let callee = bind(callee, scope);
                let args = args
                    .into_iter()
                    .map(|arg| arg.map(|arg| arg.bind_matchers(scope)))
                    .collect();

                Expr::Call { callee, args }
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => Expr::If {
                condition: bind(condition, scope),
                consequence: bind(consequence, scope),
                alternative: bind(alternative, scope),
            },
            Expr::Let { name, value, body } => Expr::Let {
                name,
                value: bind(value, scope),
                body: bind(body, scope),
            },
            Expr::Access { value, field } => Expr::Access {
                value: bind(value, scope),
                field,
            },
            Expr::Match {
                scrutinees,
                matcher,
            } => Expr::Match {
                scrutinees: scrutinees
                    .into_iter()
                    .map(|s| s.map(|s| s.bind_matchers(scope)))
                    .collect(),
                matcher: Box::new(matcher.bind(scope)),
            },
        }
    }
}

/// A placeholder for one positional argument of a matcher.
///
/// Placeholder names are derived from a fresh [`Uid`] and cannot be written
/// in source code, so they never collide with each other or with captures.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub id: Uid,
    pub name: Symbol,
    pub ty: Arc<Ty>,
}

impl Argument {
    pub fn fresh(interner: &mut StringInterner, ty: Arc<Ty>) -> Self {
        let id = Uid::fresh();
        let name = interner.intern(&format!("%arg{id}"));
        Self { id, name, ty }
    }
}

/// The runtime value a pattern is matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    /// The constructor the value has been tested against, if any.
    pub tag: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Argument(Argument),
    Access { value: Box<Value>, field: Symbol },
}

impl Value {
    pub fn argument(argument: &Argument) -> Self {
        Self {
            kind: ValueKind::Argument(argument.clone()),
            tag: None,
        }
    }

    /// Returns the value of `field` in `self`.
    pub fn access(&self, field: Symbol) -> Self {
        Self {
            kind: ValueKind::Access {
                value: Box::new(self.clone()),
                field,
            },
            tag: None,
        }
    }

    pub fn tagged(self, tag: Symbol) -> Self {
        Self {
            tag: Some(tag),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_names_are_unique() {
        let mut interner = StringInterner::new();
        let mut subst = crate::ty::Substitution::new();

        let (t0, t1) = (subst.fresh(&mut interner), subst.fresh(&mut interner));
        let a = Argument::fresh(&mut interner, t0);
        let b = Argument::fresh(&mut interner, t1);
        assert_ne!(a.name, b.name);
        assert!(interner.display(a.name).starts_with("%arg"));
    }

    #[test]
    fn access_keeps_the_parent_tag() {
        let mut interner = StringInterner::new();
        let mut subst = crate::ty::Substitution::new();
        let pair = interner.intern("Pair");
        let first = interner.intern("first");

        let ty = subst.fresh(&mut interner);
        let arg = Argument::fresh(&mut interner, ty);
        let value = Value::argument(&arg).tagged(pair);
        let field = value.access(first);

        assert_eq!(field.tag, None);
        match field.kind {
            ValueKind::Access { value, field } => {
                assert_eq!(value.tag, Some(pair));
                assert_eq!(field, first);
            }
            ValueKind::Argument(_) => panic!("expected an access"),
        }
    }
}
