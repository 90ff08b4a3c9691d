use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::resolution::SingleRowCapPolicy;

lazy_static! {
    static ref ALIAS_PREFIX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref PARAMETER_PREFIX: Regex = Regex::new(r"^[@:$][A-Za-z_]*$").unwrap();
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Table alias prefix `{0}` and sub-statement alias prefix `{1}` must not be prefixes of each other")]
    AliasPrefixClash(String, String),
}

/// Translator configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Cap every single-value sub-statement used as a table to one row. When
    /// false, only a sentinel limit (> 1) is lowered, keeping other limits as emitted.
    pub uniform_single_row_cap: bool,

    /// Prefix of parameter placeholders (`@` gives `@1`, `@2`, ...)
    #[validate(custom(function = "validate_parameter_prefix"))]
    pub parameter_prefix: String,

    /// Prefix of physical table aliases (`t` gives `t0`, `t1`, ...)
    #[validate(custom(function = "validate_alias_prefix"))]
    pub table_alias_prefix: String,

    /// Prefix of sub-statement table aliases (`q` gives `q0`, `q1`, ...)
    #[validate(custom(function = "validate_alias_prefix"))]
    pub sub_statement_alias_prefix: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            uniform_single_row_cap: true,
            parameter_prefix: "@".to_string(),
            table_alias_prefix: "t".to_string(),
            sub_statement_alias_prefix: "q".to_string(),
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            uniform_single_row_cap: parse_env_var("RELQ_UNIFORM_SINGLE_ROW_CAP", "true")?,
            parameter_prefix: env::var("RELQ_PARAMETER_PREFIX").unwrap_or_else(|_| "@".to_string()),
            table_alias_prefix: env::var("RELQ_TABLE_ALIAS_PREFIX")
                .unwrap_or_else(|_| "t".to_string()),
            sub_statement_alias_prefix: env::var("RELQ_SUB_STATEMENT_ALIAS_PREFIX")
                .unwrap_or_else(|_| "q".to_string()),
        };

        config.validate_all()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            uniform_single_row_cap: !cli.preserve_sentinel_limit,
            parameter_prefix: cli.parameter_prefix,
            table_alias_prefix: cli.table_alias_prefix,
            sub_statement_alias_prefix: cli.sub_statement_alias_prefix,
        };

        config.validate_all()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate_all()?;
        Ok(config)
    }

    /// Field validation plus the cross-field alias prefix check
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;
        // Both prefixes share one counter, so `t` and `t1` would both yield `t10`.
        let (table, sub) = (&self.table_alias_prefix, &self.sub_statement_alias_prefix);
        if table.starts_with(sub.as_str()) || sub.starts_with(table.as_str()) {
            return Err(ConfigError::AliasPrefixClash(table.clone(), sub.clone()));
        }
        Ok(())
    }

    pub fn single_row_cap_policy(&self) -> SingleRowCapPolicy {
        if self.uniform_single_row_cap {
            SingleRowCapPolicy::Uniform
        } else {
            SingleRowCapPolicy::PreserveSentinel
        }
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub preserve_sentinel_limit: bool,
    pub parameter_prefix: String,
    pub table_alias_prefix: String,
    pub sub_statement_alias_prefix: String,
}

fn validate_alias_prefix(value: &str) -> Result<(), ValidationError> {
    if ALIAS_PREFIX.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("alias_prefix"))
    }
}

fn validate_parameter_prefix(value: &str) -> Result<(), ValidationError> {
    if PARAMETER_PREFIX.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("parameter_prefix"))
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
