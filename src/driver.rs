//! Central plumbing between callers and the individual passes.
//!
//! A [`Session`] is one compilation unit: it owns the interner, the
//! substitution shared by every matcher in the unit, the global environment
//! and the diagnostics. Each matcher handed to [`Session::compile`] goes
//! through arity checking, binding, type checking and reduction in turn, and
//! its inferred signature becomes visible to the matchers compiled after it.

use std::{path::Path, sync::Arc};

use thiserror::Error;

use crate::{
    ast::{BindScope, PatternMatcher, Typed},
    check::{Checker, Env},
    config::{Config, ConfigError},
    diagnostic::Diagnostic,
    doc::{ToDoc, render},
    lower::{Lowered, Reducer},
    symbol::{StringInterner, Symbol},
    ty::{Substitution, Ty},
};

/// The public result type of the [`driver`] module.
///
/// [`driver`]: self
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Default)]
pub struct Session {
    pub interner: StringInterner,
    pub subst: Substitution,
    pub env: Env,
    pub config: Config,
    diagnostics: Vec<Diagnostic>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Creates a session configured from the `.toml` file at `path`.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::load(path)?;
        Ok(Self::new(config))
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// Declares a constructor with named fields.
    pub fn declare_constr(
        &mut self,
        name: Symbol,
        fields: impl IntoIterator<Item = (Symbol, Arc<Ty>)>,
    ) {
        self.env.declare_constr(name, fields);
    }

    /// Declares a constructor with positional fields.
    pub fn declare_tuple_constr(
        &mut self,
        name: Symbol,
        fields: impl IntoIterator<Item = Arc<Ty>>,
    ) {
        self.env
            .declare_tuple_constr(&mut self.interner, &self.config, name, fields);
    }

    pub fn declare_global(&mut self, name: Symbol, ty: Arc<Ty>) {
        self.env.declare_global(name, ty);
    }

    /// Compiles a single matcher, which must be free of unshuffled patterns.
    ///
    /// Problems are recorded as diagnostics rather than returned, and a
    /// lowered matcher is produced regardless.
    pub fn compile(&mut self, matcher: PatternMatcher) -> Lowered {
        let name = matcher.name.item;
        log::debug!("compiling `{}`", self.interner.display(name));

        matcher.check_arity(&mut self.diagnostics);

        let matcher = matcher.bind(&mut BindScope {
            interner: &mut self.interner,
            config: &self.config,
        });

        let mut checker = Checker::new(
            &mut self.interner,
            &mut self.subst,
            &self.env,
            &self.config,
            &mut self.diagnostics,
        );
        let Typed { item: matcher, ty } = matcher.check_types(&mut checker);

        if self.env.global(name).is_none() {
            self.env.declare_global(name, ty.clone());
        }

        let body = Reducer::new().reduce(&matcher);
        if body.fault_count() > 0 {
            log::debug!(
                "`{}` may fail with a non-exhaustive match",
                self.interner.display(name)
            );
        }

        Lowered {
            name,
            params: matcher.arguments.iter().map(|arg| arg.name).collect(),
            ty,
            body,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Renders `item` against the interner of `self`.
    pub fn render<T: ToDoc + ?Sized>(&self, item: &T) -> String {
        render(item, &self.interner)
    }
}
