//! Session settings, optionally parsed from a `.toml` table.
//!
//! Every field has a default, so an empty document (or no document at all)
//! yields [`Config::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbol::{StringInterner, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix of the synthesized nominal tuple type of a destructuring
    /// pattern; a pattern with `n` fields gets the type `{prefix}{n}`.
    pub tuple_type_prefix: Box<str>,
    /// Prefix of the field names used to project positional fields.
    pub tuple_field_prefix: Box<str>,
    /// Ordinal of the first positional field.
    pub tuple_field_base: usize,
    /// Whether destructuring a constructor that has no declaration is
    /// reported as an unresolved symbol.
    pub report_undeclared_constructors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tuple_type_prefix: "Tuple".into(),
            tuple_field_prefix: "_".into(),
            tuple_field_base: 0,
            report_undeclared_constructors: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("`tuple_type_prefix` must start with an uppercase letter, found {0:?}")]
    LowercaseTuplePrefix(Box<str>),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_contents = std::fs::read_to_string(&path)?;
        Self::from_toml(&file_contents)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the field name that projects the `index`-th positional field
    /// of a tuple-like constructor, e.g. `_0`.
    pub fn positional_field(&self, interner: &mut StringInterner, index: usize) -> Symbol {
        interner.intern_indexed(&self.tuple_field_prefix, self.tuple_field_base + index)
    }

    /// The synthesized tuple type names are constructor names, so they are
    /// subject to the same capitalisation rule.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.tuple_type_prefix.chars().next() {
            Some(c) if c.is_uppercase() => Ok(()),
            _ => Err(ConfigError::LowercaseTuplePrefix(
                self.tuple_type_prefix.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use crate::symbol::StringInterner;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = Config::from_toml(
            "tuple_field_prefix = \"#\"\ntuple_field_base = 1\n",
        )
        .unwrap();

        assert_eq!(&*config.tuple_field_prefix, "#");
        assert_eq!(config.tuple_field_base, 1);
        assert_eq!(&*config.tuple_type_prefix, "Tuple");
        assert!(config.report_undeclared_constructors);
    }

    #[test]
    fn lowercase_tuple_prefix_is_rejected() {
        let result = Config::from_toml("tuple_type_prefix = \"tup\"");
        assert!(matches!(result, Err(ConfigError::LowercaseTuplePrefix(_))));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let result = Config::from_toml("tuple_field_base = \"one\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn positional_fields_follow_prefix_and_base() {
        let mut interner = StringInterner::new();
        let config = Config::from_toml("tuple_field_prefix = \"#\"\ntuple_field_base = 1\n")
            .unwrap();

        let second = config.positional_field(&mut interner, 1);
        assert_eq!(interner.resolve(second), Some("#2"));
        let default = Config::default().positional_field(&mut interner, 1);
        assert_eq!(interner.resolve(default), Some("_1"));
    }
}
