//! Resolver configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock behavior:
//!
//! ```toml
//! max_hierarchy_depth = 64
//! numeric_tower = ["Byte", "Short", "Int", "Long", "BigInteger", "Float", "Double", "BigDecimal"]
//!
//! [costs]
//! identity = 0
//! numeric_step = 1
//! subtype_step = 1
//! coercion = 3
//! dynamic = 1
//! vararg_spread = 1
//!
//! [fallbacks]
//! array = "Array"
//! closure = "Closure"
//! record = "Map"
//! root = "Object"
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Conversion costs. Lower is better; costs add up across slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    pub identity: u32,
    /// Per step up the numeric tower.
    pub numeric_step: u32,
    /// Per supertype edge crossed.
    pub subtype_step: u32,
    /// Any converter-driven coercion (closure to interface, record to class).
    pub coercion: u32,
    /// An `Unknown` or `Error` operand.
    pub dynamic: u32,
    /// Added once when a vararg parameter is applied in spread form.
    pub vararg_spread: u32,
}

impl Default for CostTable {
    fn default() -> Self {
        CostTable {
            identity: 0,
            numeric_step: 1,
            subtype_step: 1,
            coercion: 3,
            dynamic: 1,
            vararg_spread: 1,
        }
    }
}

/// Declarations that stand in for receivers without a nominal head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fallbacks {
    /// `T[]` is looked up as `Array<T>`.
    pub array: String,
    /// `(A) -> R` is looked up as `Closure<R>`.
    pub closure: String,
    /// A record literal is looked up as `Map<String, V>`.
    pub record: String,
    /// Undeclared nominal types and dynamic receivers.
    pub root: String,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Fallbacks {
            array: "Array".to_string(),
            closure: "Closure".to_string(),
            record: "Map".to_string(),
            root: "Object".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub costs: CostTable,
    /// Widening order, narrowest first.
    pub numeric_tower: Vec<String>,
    pub fallbacks: Fallbacks,
    /// Supertype edges followed before the hierarchy walk gives up.
    pub max_hierarchy_depth: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            costs: CostTable::default(),
            numeric_tower: ["Byte", "Short", "Int", "Long", "BigInteger", "Float", "Double", "BigDecimal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallbacks: Fallbacks::default(),
            max_hierarchy_depth: 64,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    /// The numeric tower lists a name twice.
    DuplicateNumeric(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "failed to read {}: {}", path, source),
            ConfigError::Parse(e) => write!(f, "failed to parse resolver config: {}", e),
            ConfigError::DuplicateNumeric(name) => {
                write!(f, "numeric tower lists `{}` more than once", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::DuplicateNumeric(_) => None,
        }
    }
}

impl ResolveConfig {
    pub fn from_file(path: &Path) -> Result<ResolveConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<ResolveConfig, ConfigError> {
        let config: ResolveConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, name) in self.numeric_tower.iter().enumerate() {
            if self.numeric_tower[..i].contains(name) {
                return Err(ConfigError::DuplicateNumeric(name.clone()));
            }
        }
        Ok(())
    }

    /// Position of `name` on the numeric tower.
    pub fn numeric_rank(&self, name: &str) -> Option<usize> {
        self.numeric_tower.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(ResolveConfig::from_str("").unwrap(), ResolveConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = ResolveConfig::from_str(
            r#"
max_hierarchy_depth = 8

[costs]
vararg_spread = 5

[fallbacks]
record = "Dict"
"#,
        )
        .unwrap();
        assert_eq!(config.max_hierarchy_depth, 8);
        assert_eq!(config.costs.vararg_spread, 5);
        assert_eq!(config.costs.coercion, 3);
        assert_eq!(config.fallbacks.record, "Dict");
        assert_eq!(config.fallbacks.array, "Array");
        assert_eq!(config.numeric_rank("Long"), Some(3));
    }

    #[test]
    fn rejects_duplicate_numeric_names() {
        let err = ResolveConfig::from_str(r#"numeric_tower = ["Int", "Long", "Int"]"#).unwrap_err();
        assert_eq!(err.to_string(), "numeric tower lists `Int` more than once");
    }

    #[test]
    fn reports_parse_errors() {
        let err = ResolveConfig::from_str("max_hierarchy_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
