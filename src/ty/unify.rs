//! Structural unification with occurs check.
//!
//! Unification never fails loudly: a mismatch or an infinite type is an
//! ordinary [`UnifyResult`] and the caller decides how to report it. Any
//! bindings made before a failure are kept.

use std::sync::Arc;

use thiserror::Error;

use super::{Substitution, Ty, Var};

#[derive(Debug, Clone, PartialEq)]
pub enum UnifyResult {
    Unified(Arc<Ty>),
    Mismatch { expected: Arc<Ty>, actual: Arc<Ty> },
    Circular { ty: Arc<Ty>, var: Var },
}

/// The failing cases of a [`UnifyResult`], for use with `?`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnifyError {
    #[error("type mismatch")]
    Mismatch { expected: Arc<Ty>, actual: Arc<Ty> },
    #[error("circular type")]
    Circular { ty: Arc<Ty>, var: Var },
}

impl UnifyResult {
    /// Continues with `f` if `self` is [`UnifyResult::Unified`], otherwise
    /// short-circuits with the failure.
    pub fn and_then(self, f: impl FnOnce(Arc<Ty>) -> UnifyResult) -> Self {
        match self {
            UnifyResult::Unified(ty) => f(ty),
            failure => failure,
        }
    }

    pub fn map(self, f: impl FnOnce(Arc<Ty>) -> Arc<Ty>) -> Self {
        self.and_then(|ty| UnifyResult::Unified(f(ty)))
    }

    pub fn is_unified(&self) -> bool {
        matches!(self, UnifyResult::Unified(_))
    }

    pub fn into_result(self) -> Result<Arc<Ty>, UnifyError> {
        match self {
            UnifyResult::Unified(ty) => Ok(ty),
            UnifyResult::Mismatch { expected, actual } => {
                Err(UnifyError::Mismatch { expected, actual })
            }
            UnifyResult::Circular { ty, var } => {
                Err(UnifyError::Circular { ty, var })
            }
        }
    }
}

/// Unifies `lhs` with `rhs`; see [`Ty::unify`].
pub fn unify(
    lhs: &Arc<Ty>,
    rhs: &Arc<Ty>,
    subst: &mut Substitution,
) -> UnifyResult {
    lhs.unify(rhs, subst)
}

impl Ty {
    /// Unifies `self` with `other`, recording new bindings in `subst`.
    ///
    /// Mismatches are reported as `expected: other, actual: self`. Function
    /// domains are unified the other way round (`other`'s domain against
    /// `self`'s), so the roles flip for argument positions.
    ///
    /// Two constructors unify if and only if their names are equal; their
    /// arguments are not compared.
    pub fn unify(
        self: &Arc<Self>,
        other: &Arc<Self>,
        subst: &mut Substitution,
    ) -> UnifyResult {
        log::trace!("unify {self:?} ~ {other:?}");

        match (self.as_ref(), other.as_ref()) {
            (Ty::Var(lhs), Ty::Var(rhs)) => {
                if let Some(bound) = subst.lookup(lhs.key) {
                    return bound.unify(other, subst);
                }

                if let Some(bound) = subst.lookup(rhs.key) {
                    return self.unify(&bound, subst);
                }

                if subst.same_class(lhs.key, rhs.key) {
                    return UnifyResult::Unified(self.clone());
                }

                subst.link(lhs.key, rhs.key);
                UnifyResult::Unified(other.clone())
            }

            // variable-value & value-variable
            (Ty::Var(var), _) => match subst.lookup(var.key) {
                Some(bound) => bound.unify(other, subst),
                None => bind_var(*var, other, subst),
            },
            (_, Ty::Var(var)) => match subst.lookup(var.key) {
                Some(bound) => self.unify(&bound, subst),
                None => bind_var(*var, self, subst),
            },

            (Ty::Named { name: lhs, .. }, Ty::Named { name: rhs, .. }) => {
                match lhs == rhs {
                    true => UnifyResult::Unified(self.clone()),
                    false => UnifyResult::Mismatch {
                        expected: other.clone(),
                        actual: self.clone(),
                    },
                }
            }

            (
                Ty::Fn {
                    domain: d1,
                    codomain: c1,
                },
                Ty::Fn {
                    domain: d2,
                    codomain: c2,
                },
            ) => d2.unify(d1, subst).and_then(|domain| {
                c1.unify(c2, subst)
                    .map(|codomain| Ty::func(domain, codomain))
            }),

            (Ty::Named { .. }, Ty::Fn { .. })
            | (Ty::Fn { .. }, Ty::Named { .. }) => UnifyResult::Mismatch {
                expected: other.clone(),
                actual: self.clone(),
            },
        }
    }
}

/// Binds the unbound `var` to the non-variable `value` unless `var` occurs
/// in it.
fn bind_var(var: Var, value: &Arc<Ty>, subst: &mut Substitution) -> UnifyResult {
    if subst.occurs(var.key, value) {
        log::trace!("occurs check failed for {var:?} in {value:?}");
        return UnifyResult::Circular {
            ty: value.clone(),
            var,
        };
    }

    subst.bind(var.key, value.clone());
    UnifyResult::Unified(value.clone())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::symbol::StringInterner;

    struct Fixture {
        interner: StringInterner,
        subst: Substitution,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();

            Self {
                interner: StringInterner::new(),
                subst: Substitution::new(),
            }
        }

        fn named(&mut self, name: &str, args: Vec<Arc<Ty>>) -> Arc<Ty> {
            Ty::named(&mut self.interner, name, args).unwrap()
        }

        fn var(&mut self, name: &str) -> Arc<Ty> {
            self.subst.var(&mut self.interner, name).unwrap()
        }

        fn unify(&mut self, lhs: &Arc<Ty>, rhs: &Arc<Ty>) -> UnifyResult {
            unify(lhs, rhs, &mut self.subst)
        }
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut fx = Fixture::new();
        let x = fx.var("x");
        let int = fx.named("Int", vec![]);
        let x_to_int = Ty::func(x.clone(), int);

        let result = fx.unify(&x, &x_to_int);
        assert_eq!(
            result,
            UnifyResult::Circular {
                ty: x_to_int,
                var: x.as_var().unwrap(),
            }
        );
    }

    #[test]
    fn distinct_constructors_mismatch() {
        let mut fx = Fixture::new();
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        assert_eq!(
            fx.unify(&int, &bool),
            UnifyResult::Mismatch {
                expected: bool,
                actual: int,
            }
        );
    }

    #[test]
    fn bindings_persist_across_calls() {
        let mut fx = Fixture::new();
        let a = fx.var("a");
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        assert_eq!(fx.unify(&a, &int), UnifyResult::Unified(int.clone()));
        assert_eq!(
            fx.unify(&a, &bool),
            UnifyResult::Mismatch {
                expected: bool,
                actual: int,
            }
        );
    }

    #[test]
    fn variable_chains_are_chased() {
        let mut fx = Fixture::new();
        let a = fx.var("a");
        let b = fx.var("b");
        let c = fx.var("c");
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        assert_eq!(fx.unify(&a, &b), UnifyResult::Unified(b.clone()));
        assert!(fx.unify(&b, &c).is_unified());
        assert!(fx.unify(&c, &int).is_unified());

        assert_eq!(fx.subst.resolve(&a), int);
        assert!(!fx.unify(&bool, &a).is_unified());
    }

    #[test]
    fn unifying_a_variable_with_itself_binds_nothing() {
        let mut fx = Fixture::new();
        let a = fx.var("a");

        assert_eq!(fx.unify(&a, &a), UnifyResult::Unified(a.clone()));
        assert_eq!(fx.subst.lookup(a.as_var().unwrap().key), None);
    }

    #[test]
    fn functions_unify_componentwise() {
        let mut fx = Fixture::new();
        let a = fx.var("a");
        let b = fx.var("b");
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        let lhs = Ty::func(a.clone(), bool.clone());
        let rhs = Ty::func(int.clone(), b.clone());

        let result = fx.unify(&lhs, &rhs);
        assert_eq!(result, UnifyResult::Unified(Ty::func(int.clone(), bool.clone())));
        assert_eq!(fx.subst.resolve(&a), int);
        assert_eq!(fx.subst.resolve(&b), bool);
    }

    #[test]
    fn function_domains_report_contravariantly() {
        let mut fx = Fixture::new();
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        let lhs = Ty::func(int.clone(), int.clone());
        let rhs = Ty::func(bool.clone(), int.clone());

        // `rhs`'s domain is unified against `lhs`'s, so `lhs`'s is expected
        assert_eq!(
            fx.unify(&lhs, &rhs),
            UnifyResult::Mismatch {
                expected: int,
                actual: bool,
            }
        );
    }

    #[test]
    fn constructor_arguments_are_not_compared() {
        let mut fx = Fixture::new();
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);
        let list_int = fx.named("List", vec![int]);
        let list_bool = fx.named("List", vec![bool]);

        assert_eq!(
            fx.unify(&list_int, &list_bool),
            UnifyResult::Unified(list_int.clone())
        );
    }

    #[test]
    fn constructors_never_unify_with_functions() {
        let mut fx = Fixture::new();
        let int = fx.named("Int", vec![]);
        let int_to_int = Ty::func(int.clone(), int.clone());

        assert!(!fx.unify(&int, &int_to_int).is_unified());
        assert!(!fx.unify(&int_to_int, &int).is_unified());
    }

    #[test]
    fn failure_keeps_earlier_bindings() {
        let mut fx = Fixture::new();
        let a = fx.var("a");
        let int = fx.named("Int", vec![]);
        let bool = fx.named("Bool", vec![]);

        // the domains unify (binding `a`) before the codomains mismatch
        let lhs = Ty::func(a.clone(), int.clone());
        let rhs = Ty::func(bool.clone(), bool.clone());
        assert!(!fx.unify(&lhs, &rhs).is_unified());
        assert_eq!(fx.subst.resolve(&a), bool);
    }

    #[test]
    fn into_result_supports_question_mark() {
        fn go(fx: &mut Fixture) -> Result<Arc<Ty>, UnifyError> {
            let int = fx.named("Int", vec![]);
            let a = fx.var("a");
            fx.unify(&a, &int).into_result()?;
            fx.unify(&int, &a).into_result()
        }

        let mut fx = Fixture::new();
        assert!(go(&mut fx).is_ok());
    }

    /// A concrete type over a small alphabet of constructor names.
    fn concrete_ty() -> impl Strategy<Value = ConcreteTy> {
        let leaf = prop_oneof![Just("Int"), Just("Bool"), Just("Unit")]
            .prop_map(|name| ConcreteTy::Named(name, vec![]));

        leaf.prop_recursive(4, 24, 3, |inner| {
            prop_oneof![
                (
                    prop_oneof![Just("List"), Just("Pair")],
                    prop::collection::vec(inner.clone(), 0..3)
                )
                    .prop_map(|(name, args)| ConcreteTy::Named(name, args)),
                (inner.clone(), inner).prop_map(|(domain, codomain)| {
                    ConcreteTy::Fn(Box::new(domain), Box::new(codomain))
                }),
            ]
        })
    }

    #[derive(Debug, Clone)]
    enum ConcreteTy {
        Named(&'static str, Vec<ConcreteTy>),
        Fn(Box<ConcreteTy>, Box<ConcreteTy>),
    }

    impl ConcreteTy {
        fn build(&self, interner: &mut StringInterner) -> Arc<Ty> {
            match self {
                ConcreteTy::Named(name, args) => {
                    let args: Vec<_> =
                        args.iter().map(|arg| arg.build(interner)).collect();
                    Ty::named(interner, name, args).unwrap()
                }
                ConcreteTy::Fn(domain, codomain) => Ty::func(
                    domain.build(interner),
                    codomain.build(interner),
                ),
            }
        }
    }

    proptest! {
        #[test]
        fn unification_is_idempotent(ty in concrete_ty()) {
            let mut interner = StringInterner::new();
            let mut subst = Substitution::new();
            let ty = ty.build(&mut interner);

            prop_assert_eq!(
                unify(&ty, &ty, &mut subst),
                UnifyResult::Unified(ty.clone())
            );
            prop_assert!(subst.is_empty());
        }

        #[test]
        fn success_is_symmetric(lhs in concrete_ty(), rhs in concrete_ty()) {
            let mut interner = StringInterner::new();
            let lhs = lhs.build(&mut interner);
            let rhs = rhs.build(&mut interner);

            let forward = unify(&lhs, &rhs, &mut Substitution::new());
            let backward = unify(&rhs, &lhs, &mut Substitution::new());
            prop_assert_eq!(forward.is_unified(), backward.is_unified());
        }
    }
}
