//! Canonical representations of types.
//!
//! A [`Ty`] is one of three things: a unification variable, a nominal type
//! constructor applied to zero or more arguments, or a (curried) function.
//! Recursive variants are stored with [`Arc`] so cloning is cheap during
//! unification, and types are never mutated after construction: all the
//! mutable state of inference lives in a [`Substitution`].
//!
//! Naming is enforced at construction: constructor names are uppercase,
//! variable names are lowercase.

use std::{collections::HashSet, sync::Arc};

use pretty::RcDoc;
use thiserror::Error;

use crate::{
    ast::Typed,
    doc::ToDoc,
    symbol::{StringInterner, Symbol},
};

pub mod subst;
pub mod unify;

pub use subst::Substitution;
pub use unify::{UnifyError, UnifyResult, unify};

/// The index of a unification variable in a [`Substitution`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TyVar(u32);

/// A unification variable together with its source name.
///
/// Identity is the [`TyVar`] alone; the name is only carried along for
/// rendering.
#[derive(Debug, Clone, Copy)]
pub struct Var {
    pub key: TyVar,
    pub name: Symbol,
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Var {}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// A unification variable.
    Var(Var),
    /// A nominal type constructor with 0 or more arguments.
    Named { name: Symbol, args: Box<[Arc<Self>]> },
    /// A function from `domain` to `codomain`.
    Fn {
        domain: Arc<Self>,
        codomain: Arc<Self>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TyNameError {
    #[error("type names cannot be empty")]
    Empty,
    #[error("type constructor names must be uppercase, found `{0}`")]
    LowercaseConstructor(Box<str>),
    #[error("type variable names must start with a lowercase letter, found `{0}`")]
    NonLowercaseVariable(Box<str>),
}

/// Checks that `name` can name a type constructor. For qualified names
/// like `Prelude.Option` only the final segment is checked.
pub fn validate_constructor_name(name: &str) -> Result<(), TyNameError> {
    let last = name.rsplit('.').next().unwrap_or(name);

    match last.chars().next() {
        None => Err(TyNameError::Empty),
        Some(c) if c.is_uppercase() => Ok(()),
        Some(_) => Err(TyNameError::LowercaseConstructor(name.into())),
    }
}

/// Checks that `name` can name a type variable.
pub fn validate_variable_name(name: &str) -> Result<(), TyNameError> {
    match name.chars().next() {
        None => Err(TyNameError::Empty),
        Some(c) if c.is_lowercase() => Ok(()),
        Some(_) => Err(TyNameError::NonLowercaseVariable(name.into())),
    }
}

impl Ty {
    /// Annotates an item with `self`.
    pub fn with<T>(self: &Arc<Self>, item: T) -> Typed<T> {
        Typed {
            item,
            ty: self.clone(),
        }
    }

    /// Builds the nominal type `name args..`, validating `name`.
    pub fn named(
        interner: &mut StringInterner,
        name: &str,
        args: impl IntoIterator<Item = Arc<Ty>>,
    ) -> Result<Arc<Self>, TyNameError> {
        validate_constructor_name(name)?;
        let name = interner.intern(name);
        Ok(Self::nominal(name, args))
    }

    /// Builds a nominal type from a name that is already known to be a
    /// valid constructor name.
    pub(crate) fn nominal(
        name: Symbol,
        args: impl IntoIterator<Item = Arc<Ty>>,
    ) -> Arc<Self> {
        Arc::new(Ty::Named {
            name,
            args: args.into_iter().collect(),
        })
    }

    pub fn func(domain: Arc<Ty>, codomain: Arc<Ty>) -> Arc<Self> {
        Arc::new(Ty::Fn { domain, codomain })
    }

    /// Builds the curried function type `p1 -> p2 -> .. -> ret`.
    pub fn curried<I>(params: I, ret: Arc<Ty>) -> Arc<Self>
    where
        I: IntoIterator<Item = Arc<Ty>>,
        I::IntoIter: DoubleEndedIterator,
    {
        params
            .into_iter()
            .rev()
            .fold(ret, |codomain, domain| Self::func(domain, codomain))
    }

    pub fn as_var(&self) -> Option<Var> {
        match self {
            Ty::Var(var) => Some(*var),
            _ => None,
        }
    }

    /// Returns `true` if and only if `self` contains no type variables.
    pub fn is_concrete(&self) -> bool {
        match self {
            Ty::Var(_) => false,
            Ty::Named { args, .. } => args.iter().all(|arg| arg.is_concrete()),
            Ty::Fn { domain, codomain } => {
                domain.is_concrete() && codomain.is_concrete()
            }
        }
    }

    /// Returns the variables occurring in `self`, in order of first
    /// occurrence. This is a purely syntactic traversal; callers that care
    /// about bindings should resolve `self` first.
    pub fn vars(&self) -> Vec<Var> {
        fn rec(ty: &Ty, seen: &mut HashSet<TyVar>, vars: &mut Vec<Var>) {
            match ty {
                Ty::Var(var) => {
                    if seen.insert(var.key) {
                        vars.push(*var);
                    }
                }
                Ty::Named { args, .. } => {
                    args.iter().for_each(|arg| rec(arg, seen, vars))
                }
                Ty::Fn { domain, codomain } => {
                    rec(domain, seen, vars);
                    rec(codomain, seen, vars);
                }
            }
        }

        let mut vars = Vec::new();
        rec(self, &mut HashSet::new(), &mut vars);
        vars
    }

    /// Returns `true` if the rendered form of `self` needs parentheses when
    /// it appears as a constructor argument.
    fn is_compound(&self) -> bool {
        match self {
            Ty::Var(_) => false,
            Ty::Named { args, .. } => !args.is_empty(),
            Ty::Fn { .. } => true,
        }
    }
}

fn parenthesize(doc: RcDoc<'static, ()>) -> RcDoc<'static, ()> {
    RcDoc::text("(").append(doc).append(RcDoc::text(")"))
}

impl ToDoc for Ty {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        match self {
            Ty::Var(var) => var.name.to_doc(interner),
            Ty::Named { name, args } => {
                let args = args.iter().map(|arg| {
                    let doc = arg.to_doc(interner);
                    match arg.is_compound() {
                        true => parenthesize(doc),
                        false => doc,
                    }
                });

                RcDoc::intersperse(
                    std::iter::once(name.to_doc(interner)).chain(args),
                    RcDoc::space(),
                )
            }
            Ty::Fn { domain, codomain } => {
                let domain_doc = domain.to_doc(interner);
                let domain_doc = match domain.as_ref() {
                    Ty::Fn { .. } => parenthesize(domain_doc),
                    _ => domain_doc,
                };

                domain_doc
                    .append(RcDoc::text(" ->"))
                    .append(RcDoc::line())
                    .append(codomain.to_doc(interner))
                    .group()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::render;

    #[test]
    fn constructor_names_must_be_uppercase() {
        let mut interner = StringInterner::new();
        assert!(Ty::named(&mut interner, "Int", []).is_ok());
        assert!(Ty::named(&mut interner, "Prelude.Option", []).is_ok());
        assert_eq!(
            Ty::named(&mut interner, "int", []),
            Err(TyNameError::LowercaseConstructor("int".into()))
        );
        assert_eq!(Ty::named(&mut interner, "", []), Err(TyNameError::Empty));
    }

    #[test]
    fn variable_names_must_be_lowercase() {
        assert!(validate_variable_name("a").is_ok());
        assert_eq!(
            validate_variable_name("A"),
            Err(TyNameError::NonLowercaseVariable("A".into()))
        );
    }

    #[test]
    fn curried_nests_to_the_right() {
        let mut interner = StringInterner::new();
        let int = Ty::named(&mut interner, "Int", []).unwrap();
        let bool = Ty::named(&mut interner, "Bool", []).unwrap();

        let ty = Ty::curried([int.clone(), bool.clone()], int.clone());
        let expected = Ty::func(int.clone(), Ty::func(bool, int));
        assert_eq!(ty, expected);
        assert!(ty.is_concrete());
    }

    #[test]
    fn rendering_parenthesizes_where_needed() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();
        let a = subst.var(&mut interner, "a").unwrap();
        let int = Ty::named(&mut interner, "Int", []).unwrap();
        let list = Ty::named(&mut interner, "List", [a.clone()]).unwrap();
        let nested = Ty::named(&mut interner, "List", [list.clone()]).unwrap();

        let ty = Ty::func(Ty::func(a.clone(), int.clone()), nested);
        assert_eq!(render(&ty, &interner), "(a -> Int) -> List (List a)");
        assert_eq!(ty.vars().len(), 1);
    }
}
