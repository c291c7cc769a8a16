//! The mutable binding environment used during unification.
//!
//! Variables live in an [`ena`] unification table: each [`TyVar`] is an
//! index into an arena, variable-variable bindings are union-find links, and
//! each equivalence class carries at most one concrete [`Ty`]. Lookups chase
//! through the links to the class representative, so a variable bound to a
//! variable bound to `Int` resolves to `Int`.
//!
//! The table is append-only: there is no rollback, and a substitution must
//! not be shared between unrelated checking attempts that need to
//! backtrack.

use std::{collections::HashMap, sync::Arc};

use ena::unify::{InPlace, NoError, UnificationTable, UnifyKey, UnifyValue};

use crate::symbol::{StringInterner, Symbol};

use super::{Ty, TyNameError, TyVar, Var, validate_variable_name};

/// The prefix of the names given to fresh variables. Source variable names
/// must start with a lowercase letter, so they can never collide with it.
const FRESH_PREFIX: &str = "?t";

impl UnifyKey for TyVar {
    type Value = Binding;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Self(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

/// The concrete type an equivalence class of variables is bound to, if any.
#[derive(Debug, Clone, Default)]
pub struct Binding(Option<Arc<Ty>>);

impl UnifyValue for Binding {
    type Error = NoError;

    // classes are only ever merged while at most one side is bound, so
    // picking the bound side never loses information
    fn unify_values(lhs: &Self, rhs: &Self) -> Result<Self, Self::Error> {
        Ok(match lhs.0 {
            Some(_) => lhs.clone(),
            None => rhs.clone(),
        })
    }
}

#[derive(Debug)]
pub struct Substitution {
    /// Equivalence classes of [`TyVar`] and their bindings.
    table: UnificationTable<InPlace<TyVar>>,
    /// The name of each variable, indexed by [`TyVar`].
    names: Vec<Symbol>,
    /// Variables created from source names.
    by_name: HashMap<Symbol, TyVar>,
    /// The number of fresh variables created so far.
    fresh_count: usize,
}

impl Substitution {
    pub fn new() -> Self {
        Self {
            table: Default::default(),
            names: Default::default(),
            by_name: Default::default(),
            fresh_count: 0,
        }
    }

    /// Returns the number of variables, bound or not.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the variable called `name`, creating it on first use. The
    /// same name always denotes the same variable in one substitution.
    pub fn var(
        &mut self,
        interner: &mut StringInterner,
        name: &str,
    ) -> Result<Arc<Ty>, TyNameError> {
        validate_variable_name(name)?;
        let name = interner.intern(name);

        let key = match self.by_name.get(&name) {
            Some(&key) => key,
            None => {
                let key = self.new_key(name);
                self.by_name.insert(name, key);
                key
            }
        };

        Ok(Arc::new(Ty::Var(Var { key, name })))
    }

    /// Returns a new anonymous variable.
    pub fn fresh(&mut self, interner: &mut StringInterner) -> Arc<Ty> {
        let name = interner.intern_indexed(FRESH_PREFIX, self.fresh_count);
        self.fresh_count += 1;

        let key = self.new_key(name);
        Arc::new(Ty::Var(Var { key, name }))
    }

    fn new_key(&mut self, name: Symbol) -> TyVar {
        let key = self.table.new_key(Binding(None));
        debug_assert_eq!(key.0 as usize, self.names.len());
        self.names.push(name);
        key
    }

    pub fn name_of(&self, var: TyVar) -> Symbol {
        self.names[var.0 as usize]
    }

    /// Returns the representative of the class containing `var`.
    pub fn root(&mut self, var: TyVar) -> Var {
        let key = self.table.find(var);
        let name = self.name_of(key);
        Var { key, name }
    }

    /// Returns the type the class of `var` is bound to, if any.
    pub fn lookup(&mut self, var: TyVar) -> Option<Arc<Ty>> {
        self.table.probe_value(var).0
    }

    pub fn same_class(&mut self, lhs: TyVar, rhs: TyVar) -> bool {
        self.table.unioned(lhs, rhs)
    }

    /// Chases `ty` to its representative: a type that is either not a
    /// variable, or an unbound class representative.
    pub fn chase(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        match ty.as_ref() {
            Ty::Var(var) => match self.lookup(var.key) {
                Some(bound) => self.chase(&bound),
                None => {
                    let root = self.root(var.key);
                    match root.key == var.key {
                        true => ty.clone(),
                        false => Arc::new(Ty::Var(root)),
                    }
                }
            },
            _ => ty.clone(),
        }
    }

    /// Binds the (unbound) class of `var` to the non-variable `ty`.
    ///
    /// # Panics
    /// Panics if the class is already bound; the unifier always chases a
    /// variable before binding it.
    pub(crate) fn bind(&mut self, var: TyVar, ty: Arc<Ty>) {
        assert!(
            self.lookup(var).is_none(),
            "tried to rebind a bound type variable"
        );
        debug_assert!(ty.as_var().is_none());

        self.table.union_value(var, Binding(Some(ty)));
    }

    /// Merges the (unbound) classes of `var` and `target`.
    pub(crate) fn link(&mut self, var: TyVar, target: TyVar) {
        self.table.union(var, target);
    }

    /// Returns `true` if and only if `var` occurs in `ty`, looking through
    /// bound variables.
    pub fn occurs(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(other) => match self.lookup(other.key) {
                Some(bound) => self.occurs(var, &bound),
                None => self.same_class(var, other.key),
            },
            Ty::Named { args, .. } => {
                args.iter().any(|arg| self.occurs(var, arg))
            }
            Ty::Fn { domain, codomain } => {
                self.occurs(var, domain) || self.occurs(var, codomain)
            }
        }
    }

    /// Applies the substitution to every variable in `ty`.
    pub fn resolve(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        match self.chase(ty).as_ref() {
            Ty::Var(root) => Arc::new(Ty::Var(*root)),
            Ty::Named { name, args } => Ty::nominal(
                *name,
                args.iter().map(|arg| self.resolve(arg)).collect::<Vec<_>>(),
            ),
            Ty::Fn { domain, codomain } => {
                Ty::func(self.resolve(domain), self.resolve(codomain))
            }
        }
    }

    /// Replaces every unbound variable in `ty` with a fresh one. Used for
    /// global signatures and declared field types, which are implicitly
    /// quantified over their free variables.
    pub fn instantiate(
        &mut self,
        interner: &mut StringInterner,
        ty: &Arc<Ty>,
    ) -> Arc<Ty> {
        let ty = self.resolve(ty);
        let vars = ty.vars();

        if vars.is_empty() {
            return ty;
        }

        let mut fresh = HashMap::with_capacity(vars.len());
        for var in vars {
            fresh.insert(var.key, self.fresh(interner));
        }

        replace_vars(&ty, &fresh)
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_vars(ty: &Arc<Ty>, fresh: &HashMap<TyVar, Arc<Ty>>) -> Arc<Ty> {
    match ty.as_ref() {
        Ty::Var(var) => fresh.get(&var.key).cloned().unwrap_or(ty.clone()),
        Ty::Named { name, args } => Ty::nominal(
            *name,
            args.iter()
                .map(|arg| replace_vars(arg, fresh))
                .collect::<Vec<_>>(),
        ),
        Ty::Fn { domain, codomain } => Ty::func(
            replace_vars(domain, fresh),
            replace_vars(codomain, fresh),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(interner: &mut StringInterner) -> Arc<Ty> {
        Ty::named(interner, "Int", []).unwrap()
    }

    #[test]
    fn names_denote_the_same_variable() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();

        let a1 = subst.var(&mut interner, "a").unwrap();
        let a2 = subst.var(&mut interner, "a").unwrap();
        let b = subst.var(&mut interner, "b").unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(subst.len(), 2);
    }

    #[test]
    fn fresh_variables_are_distinct() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();

        let t0 = subst.fresh(&mut interner);
        let t1 = subst.fresh(&mut interner);
        assert_ne!(t0, t1);
        assert_eq!(interner.resolve(t1.as_var().unwrap().name), Some("?t1"));
    }

    #[test]
    fn fresh_names_cannot_be_written_in_source() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();

        let fresh = subst.fresh(&mut interner);
        let named = subst.var(&mut interner, "t0").unwrap();
        assert_ne!(fresh, named);
        assert_ne!(fresh.as_var().unwrap().name, named.as_var().unwrap().name);

        assert_eq!(
            subst.var(&mut interner, "?t0"),
            Err(TyNameError::NonLowercaseVariable("?t0".into()))
        );
    }

    #[test]
    fn chase_follows_links_and_bindings() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();
        let int = int(&mut interner);

        let a = subst.var(&mut interner, "a").unwrap();
        let b = subst.var(&mut interner, "b").unwrap();
        let c = subst.var(&mut interner, "c").unwrap();
        let key = |ty: &Arc<Ty>| ty.as_var().unwrap().key;

        subst.link(key(&a), key(&b));
        subst.link(key(&b), key(&c));
        assert!(subst.chase(&a).as_var().is_some());

        subst.bind(key(&c), int.clone());
        assert_eq!(subst.chase(&a), int);
        assert_eq!(subst.chase(&b), int);
    }

    #[test]
    fn occurs_looks_through_bindings() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();
        let int = int(&mut interner);

        let a = subst.var(&mut interner, "a").unwrap();
        let b = subst.var(&mut interner, "b").unwrap();
        let list_a = Ty::named(&mut interner, "List", [a.clone()]).unwrap();
        let a_key = a.as_var().unwrap().key;
        let b_key = b.as_var().unwrap().key;

        // b := List a, so `a` occurs in `b -> Int`
        subst.bind(b_key, list_a);
        assert!(subst.occurs(a_key, &Ty::func(b.clone(), int.clone())));
        assert!(!subst.occurs(a_key, &int));
    }

    #[test]
    fn instantiate_renames_free_variables_consistently() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();

        let a = subst.var(&mut interner, "a").unwrap();
        let id = Ty::func(a.clone(), a.clone());
        let inst = subst.instantiate(&mut interner, &id);

        match inst.as_ref() {
            Ty::Fn { domain, codomain } => {
                assert_eq!(domain, codomain);
                assert_ne!(domain, &a);
            }
            _ => panic!("expected a function type"),
        }
    }

    #[test]
    fn resolve_is_deep() {
        let mut interner = StringInterner::new();
        let mut subst = Substitution::new();
        let int = int(&mut interner);

        let a = subst.var(&mut interner, "a").unwrap();
        let list_a = Ty::named(&mut interner, "List", [a.clone()]).unwrap();
        subst.bind(a.as_var().unwrap().key, int.clone());

        let expected = Ty::named(&mut interner, "List", [int]).unwrap();
        assert_eq!(subst.resolve(&list_a), expected);
    }
}
