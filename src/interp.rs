//! A reference evaluator for lowered trees.
//!
//! This is not a backend: it exists so that the observable behaviour of a
//! reduced matcher (which clause fires, what each capture is bound to, and
//! when the match faults) can be checked without emitting code.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    ast::Literal,
    config::Config,
    lower::{
        Lowered,
        ir::{Builtin, Expr, Fault},
    },
    symbol::{StringInterner, Symbol},
};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum RtValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(Box<str>),
    /// A value built with the constructor `tag`.
    Data {
        tag: Symbol,
        fields: Box<[(Symbol, RtValue)]>,
    },
}

impl RtValue {
    pub fn data(
        tag: Symbol,
        fields: impl IntoIterator<Item = (Symbol, RtValue)>,
    ) -> Self {
        Self::Data {
            tag,
            fields: fields.into_iter().collect(),
        }
    }

    /// Builds a value with positional fields, named as patterns project
    /// them.
    pub fn tuple(
        interner: &mut StringInterner,
        config: &Config,
        tag: Symbol,
        fields: impl IntoIterator<Item = RtValue>,
    ) -> Self {
        let fields: Vec<_> = fields
            .into_iter()
            .enumerate()
            .map(|(index, value)| (config.positional_field(interner, index), value))
            .collect();

        Self::data(tag, fields)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("no case of {matcher:?} matched")]
    NonExhaustiveMatch { matcher: Symbol },
    #[error("unbound symbol {0:?}")]
    UnboundSymbol(Symbol),
    #[error("{value:?} has no field {field:?}")]
    NoSuchField { value: RtValue, field: Symbol },
    #[error("expected a value tagged {expected:?}, found {found:?}")]
    TagMismatch { expected: Symbol, found: Symbol },
    #[error("expected constructed data, found {0:?}")]
    NotData(RtValue),
    #[error("expected a boolean, found {0:?}")]
    NotBool(RtValue),
    #[error("local {0:?} cannot be called")]
    NotCallable(Symbol),
    #[error("{0:?} cannot be called")]
    NotAFunction(RtValue),
    #[error("builtin `{}` must be applied", .0.identifier())]
    UnappliedBuiltin(Builtin),
    #[error("{name:?} takes {expected} arguments but was given {found}")]
    WrongArgumentCount {
        name: Symbol,
        expected: usize,
        found: usize,
    },
}

type EvalResult<T = RtValue> = Result<T, EvalError>;

pub struct Interpreter<'a> {
    interner: &'a StringInterner,
    definitions: HashMap<Symbol, Lowered>,
    /// Local bindings, innermost last.
    locals: Vec<(Symbol, RtValue)>,
}

impl<'a> Interpreter<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        Self {
            interner,
            definitions: HashMap::new(),
            locals: Vec::new(),
        }
    }

    pub fn define(&mut self, lowered: Lowered) {
        self.definitions.insert(lowered.name, lowered);
    }

    /// Applies the definition `name` to `args`.
    pub fn apply(&mut self, name: Symbol, args: Vec<RtValue>) -> EvalResult {
        let (params, body) = match self.definitions.get(&name) {
            Some(lowered) => (lowered.params.clone(), lowered.body.clone()),
            None => return Err(EvalError::UnboundSymbol(name)),
        };

        if params.len() != args.len() {
            return Err(EvalError::WrongArgumentCount {
                name,
                expected: params.len(),
                found: args.len(),
            });
        }

        // definitions only see their own parameters
        let saved = std::mem::take(&mut self.locals);
        self.locals.extend(params.iter().copied().zip(args));
        let result = self.eval(&body);
        self.locals = saved;

        result
    }

    fn lookup(&self, name: Symbol) -> Option<&RtValue> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| *local == name)
            .map(|(_, value)| value)
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(self.literal(literal)),
            Expr::Symbol(name) => match self.lookup(*name) {
                Some(value) => Ok(value.clone()),
                None => self.apply(*name, vec![]),
            },
            Expr::Builtin(builtin) => Err(EvalError::UnappliedBuiltin(*builtin)),
            Expr::Call { callee, args } => match callee.as_ref() {
                Expr::Builtin(Builtin::And) => {
                    for arg in args.iter() {
                        if !self.eval_bool(arg)? {
                            return Ok(RtValue::Bool(false));
                        }
                    }

                    Ok(RtValue::Bool(true))
                }
                Expr::Builtin(Builtin::Eq) => {
                    let values = args
                        .iter()
                        .map(|arg| self.eval(arg))
                        .collect::<EvalResult<Vec<_>>>()?;

                    Ok(RtValue::Bool(values.windows(2).all(|w| w[0] == w[1])))
                }
                Expr::Symbol(name) if self.lookup(*name).is_none() => {
                    let args = args
                        .iter()
                        .map(|arg| self.eval(arg))
                        .collect::<EvalResult<Vec<_>>>()?;

                    self.apply(*name, args)
                }
                // only named definitions are callable
                Expr::Symbol(name) => Err(EvalError::NotCallable(*name)),
                other => Err(EvalError::NotAFunction(self.eval(other)?)),
            },
            Expr::If {
                condition,
                consequence,
                alternative,
            } => match self.eval_bool(condition)? {
                true => self.eval(consequence),
                false => self.eval(alternative),
            },
            Expr::Let { name, value, body } => {
                let value = self.eval(value)?;
                self.locals.push((*name, value));
                let result = self.eval(body);
                self.locals.pop();
                result
            }
            Expr::Access { value, field, tag } => {
                let value = self.eval(value)?;
                let (found, fields) = match &value {
                    RtValue::Data { tag, fields } => (tag, fields),
                    _ => return Err(EvalError::NotData(value.clone())),
                };

                match tag {
                    Some(expected) if expected != found => {
                        return Err(EvalError::TagMismatch {
                            expected: *expected,
                            found: *found,
                        });
                    }
                    _ => {}
                }

                match fields.iter().find(|(name, _)| name == field) {
                    Some((_, field_value)) => Ok(field_value.clone()),
                    None => Err(EvalError::NoSuchField {
                        value: value.clone(),
                        field: *field,
                    }),
                }
            }
            Expr::IsTag { value, tag } => match self.eval(value)? {
                RtValue::Data { tag: found, .. } => Ok(RtValue::Bool(found == *tag)),
                other => Err(EvalError::NotData(other)),
            },
            Expr::Fault(Fault::NonExhaustiveMatch { matcher }) => {
                Err(EvalError::NonExhaustiveMatch { matcher: *matcher })
            }
        }
    }

    fn eval_bool(&mut self, expr: &Expr) -> EvalResult<bool> {
        match self.eval(expr)? {
            RtValue::Bool(value) => Ok(value),
            other => Err(EvalError::NotBool(other)),
        }
    }

    fn literal(&self, literal: &Literal) -> RtValue {
        match literal {
            Literal::Unit => RtValue::Unit,
            Literal::Bool(value) => RtValue::Bool(*value),
            Literal::Int(value) => RtValue::Int(*value),
            Literal::Float(value) => RtValue::Float(*value),
            Literal::Char(value) => RtValue::Char(*value),
            Literal::String(content) => {
                RtValue::String(self.interner.display(*content).into())
            }
        }
    }
}
