//! Type checking of bound matchers and their clause bodies.
//!
//! The [`Checker`] owns no state of its own beyond a stack of lexical scopes:
//! the [`Substitution`], the global [`Env`] and the error list are all
//! borrowed from the caller, so several matchers can be checked against the
//! same substitution one after another. Type errors never abort checking;
//! they are pushed onto the error list and the offending node keeps the type
//! it was expected to have.

use std::{collections::HashMap, sync::Arc};

use crate::{
    ast::{Expr, Literal, PatternMatcher, Value, ValueKind},
    config::Config,
    diagnostic::Diagnostic,
    span::{Span, Spanned},
    symbol::{StringInterner, Symbol},
    ty::{Substitution, Ty, UnifyResult},
};

pub mod pattern;

/// A declared data constructor and the types of its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrDecl {
    pub name: Symbol,
    pub fields: Box<[(Symbol, Arc<Ty>)]>,
}

impl ConstrDecl {
    pub fn field(&self, name: Symbol) -> Option<&Arc<Ty>> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, ty)| ty)
    }
}

/// Global signatures and constructor declarations.
///
/// Both are implicitly quantified over their free type variables, and are
/// instantiated with fresh variables at every use.
#[derive(Debug, Clone, Default)]
pub struct Env {
    globals: HashMap<Symbol, Arc<Ty>>,
    constrs: HashMap<Symbol, ConstrDecl>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the global `name` with the type `ty`, returning the previous
    /// type if there was one.
    pub fn declare_global(&mut self, name: Symbol, ty: Arc<Ty>) -> Option<Arc<Ty>> {
        self.globals.insert(name, ty)
    }

    pub fn global(&self, name: Symbol) -> Option<&Arc<Ty>> {
        self.globals.get(&name)
    }

    /// Declares a constructor with named fields.
    pub fn declare_constr(
        &mut self,
        name: Symbol,
        fields: impl IntoIterator<Item = (Symbol, Arc<Ty>)>,
    ) {
        let fields = fields.into_iter().collect();
        self.constrs.insert(name, ConstrDecl { name, fields });
    }

    /// Declares a constructor with positional fields, named by
    /// [`Config::positional_field`].
    pub fn declare_tuple_constr(
        &mut self,
        interner: &mut StringInterner,
        config: &Config,
        name: Symbol,
        fields: impl IntoIterator<Item = Arc<Ty>>,
    ) {
        let fields: Vec<_> = fields
            .into_iter()
            .enumerate()
            .map(|(index, ty)| (config.positional_field(interner, index), ty))
            .collect();

        self.declare_constr(name, fields);
    }

    pub fn constr(&self, name: Symbol) -> Option<&ConstrDecl> {
        self.constrs.get(&name)
    }
}

pub struct Checker<'a> {
    pub interner: &'a mut StringInterner,
    pub subst: &'a mut Substitution,
    pub env: &'a Env,
    pub config: &'a Config,
    /// Accumulated errors.
    errors: &'a mut Vec<Diagnostic>,
    /// Local bindings, innermost scope last.
    scopes: Vec<HashMap<Symbol, Arc<Ty>>>,
}

impl<'a> Checker<'a> {
    pub fn new(
        interner: &'a mut StringInterner,
        subst: &'a mut Substitution,
        env: &'a Env,
        config: &'a Config,
        errors: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            interner,
            subst,
            env,
            config,
            errors,
            scopes: Vec::new(),
        }
    }

    pub fn report(&mut self, error: Diagnostic) {
        log::debug!("reporting {error:?}");
        self.errors.push(error);
    }

    pub fn fresh(&mut self) -> Arc<Ty> {
        self.subst.fresh(self.interner)
    }

    /// Runs `f` in a new lexical scope.
    pub fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Binds `name` to `ty` in the innermost scope.
    ///
    /// # Panics
    /// Panics if there is no open scope.
    pub fn bind_local(&mut self, name: Symbol, ty: Arc<Ty>) {
        self.scopes
            .last_mut()
            .expect("tried to bind a local outside of any scope")
            .insert(name, ty);
    }

    /// Returns the type of `name`: locals shadow globals, and globals are
    /// instantiated afresh.
    pub fn lookup(&mut self, name: Symbol) -> Option<Arc<Ty>> {
        let local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name))
            .cloned();

        match local {
            Some(ty) => Some(ty),
            None => {
                let global = self.env.global(name)?.clone();
                Some(self.subst.instantiate(self.interner, &global))
            }
        }
    }

    /// Returns the nominal type called `name`.
    pub fn nominal(&mut self, name: &'static str) -> Arc<Ty> {
        Ty::nominal(self.interner.intern_static(name), [])
    }

    /// Unifies `actual` with `expected`, reporting a failure at `span`.
    ///
    /// Returns the unified type, or `expected` if unification failed.
    pub fn unify_at(
        &mut self,
        expected: &Arc<Ty>,
        actual: &Arc<Ty>,
        span: Span,
    ) -> Arc<Ty> {
        match actual.unify(expected, self.subst) {
            UnifyResult::Unified(ty) => ty,
            UnifyResult::Mismatch { expected: e, actual: a } => {
                let expected_ty = self.subst.resolve(&e);
                let actual_ty = self.subst.resolve(&a);
                self.report(Diagnostic::TypeMismatch {
                    expected: expected_ty,
                    actual: actual_ty,
                    span,
                });
                expected.clone()
            }
            UnifyResult::Circular { ty, var } => {
                let ty = self.subst.resolve(&ty);
                self.report(Diagnostic::CircularType { ty, var, span });
                expected.clone()
            }
        }
    }

    pub fn literal_ty(&mut self, literal: &Literal) -> Arc<Ty> {
        self.nominal(literal.ty_name())
    }

    /// Returns the type of a bound value.
    ///
    /// Arguments carry their own type. A field access is given the declared
    /// type of the field if its parent is tagged with a declared constructor
    /// that has the field; otherwise it gets a fresh variable.
    pub fn type_of_value(&mut self, value: &Value) -> Arc<Ty> {
        match &value.kind {
            ValueKind::Argument(argument) => argument.ty.clone(),
            ValueKind::Access { value: parent, field } => {
                let declared = parent
                    .tag
                    .and_then(|tag| self.env.constr(tag))
                    .and_then(|constr| constr.field(*field))
                    .cloned();

                match declared {
                    Some(ty) => self.subst.instantiate(self.interner, &ty),
                    None => {
                        log::trace!(
                            "no declared type for field `{}`",
                            self.interner.display(*field)
                        );
                        self.fresh()
                    }
                }
            }
        }
    }

    /// Infers the type of `expr`.
    pub fn infer(&mut self, expr: &Spanned<Expr>) -> Arc<Ty> {
        let span = expr.span;

        match expr.item() {
            Expr::Literal(literal) => self.literal_ty(literal),
            Expr::Name(name) => match self.lookup(*name) {
                Some(ty) => ty,
                None => {
                    self.report(Diagnostic::SymbolNotFound {
                        symbol: *name,
                        span,
                    });
                    self.fresh()
                }
            },
            Expr::Call { callee, args } => {
                let mut callee_ty = self.infer(callee);

                for arg in args.iter() {
                    let arg_ty = self.infer(arg);
                    let result_ty = self.fresh();
                    let expected = Ty::func(arg_ty, result_ty.clone());
                    self.unify_at(&expected, &callee_ty, arg.span);
                    callee_ty = result_ty;
                }

                callee_ty
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                let bool = self.nominal("Bool");
                let condition_ty = self.infer(condition);
                self.unify_at(&bool, &condition_ty, condition.span);

                let consequence_ty = self.infer(consequence);
                let alternative_ty = self.infer(alternative);
                self.unify_at(&consequence_ty, &alternative_ty, alternative.span)
            }
            Expr::Let { name, value, body } => {
                let value_ty = self.infer(value);

                self.with_scope(|checker| {
                    checker.bind_local(name.item, value_ty);
                    checker.infer(body)
                })
            }
            Expr::Access { value, field } => {
                let value_ty = self.infer(value);
                let value_ty = self.subst.chase(&value_ty);

                // a value of nominal type `T` may be projected through the
                // declaration of a constructor also called `T`
                let declared = match value_ty.as_ref() {
                    Ty::Named { name, .. } => self
                        .env
                        .constr(*name)
                        .and_then(|constr| constr.field(field.item))
                        .cloned(),
                    _ => None,
                };

                match declared {
                    Some(ty) => self.subst.instantiate(self.interner, &ty),
                    None => self.fresh(),
                }
            }
            Expr::Match {
                scrutinees,
                matcher,
            } => self.check_inline_matcher(scrutinees, matcher, span),
        }
    }

    fn check_inline_matcher(
        &mut self,
        scrutinees: &[Spanned<Expr>],
        matcher: &PatternMatcher,
        span: Span,
    ) -> Arc<Ty> {
        let declared = matcher.arity();
        let found = scrutinees.len();

        if declared != found {
            self.report(Diagnostic::ArityMismatch {
                declared,
                found,
                span,
            });
        }

        for (scrutinee, argument) in scrutinees.iter().zip(matcher.arguments.iter()) {
            let scrutinee_ty = self.infer(scrutinee);
            self.unify_at(&argument.ty, &scrutinee_ty, scrutinee.span);
        }

        // surplus scrutinees are still checked
        for scrutinee in scrutinees.iter().skip(declared) {
            self.infer(scrutinee);
        }

        self.check_cases(matcher);
        matcher.return_ty.clone()
    }
}
