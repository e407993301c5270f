//! # Configuration
//!
//! Engine configuration is managed by [`confique`], which handles layered loading
//! from a TOML file and environment variables.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `ATTRFORGE_DATETIME_FORMAT`, `ATTRFORGE_STRICT_DEFINITIONS`, etc.
//! 2. **Config file**: any TOML file passed to [`EngineConfig::load`].
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `datetime_format` | `%Y-%m-%dT%H:%M:%S%:z` | Format for `datetime` attributes without a `transform.format` |
//! | `date_format` | `%Y-%m-%d` | Format for `date` attributes without a `transform.format` |
//! | `skip_non_attributes` | `true` | Pass keys that are not declared attributes through untouched |
//! | `strict_definitions` | `true` | Reject definition keys no property type claims |
//! | `extract_nulls` | `true` | Emit null-valued attributes when extracting |
//! | `skip_object_smashing` | `false` | Extract nested objects as stored instead of through their own data type |

use crate::error::Result;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Configuration for the attribute engine.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Format used by `datetime` attributes that do not declare one.
    #[config(default = "%Y-%m-%dT%H:%M:%S%:z", env = "ATTRFORGE_DATETIME_FORMAT")]
    pub datetime_format: String,

    /// Format used by `date` attributes that do not declare one.
    #[config(default = "%Y-%m-%d", env = "ATTRFORGE_DATE_FORMAT")]
    pub date_format: String,

    /// When true, keys that are not declared attributes survive hydration and
    /// extraction untouched. When false they are dropped.
    #[config(default = true, env = "ATTRFORGE_SKIP_NON_ATTRIBUTES")]
    pub skip_non_attributes: bool,

    /// When true, a definition key that no property type claims is a
    /// configuration error.
    #[config(default = true, env = "ATTRFORGE_STRICT_DEFINITIONS")]
    pub strict_definitions: bool,

    /// When false, attributes holding null are left out of extracted data.
    #[config(default = true, env = "ATTRFORGE_EXTRACT_NULLS")]
    pub extract_nulls: bool,

    /// When true, nested objects are extracted as their stored values
    /// without running the nested data type's extraction.
    #[config(default = false, env = "ATTRFORGE_SKIP_OBJECT_SMASHING")]
    pub skip_object_smashing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            skip_non_attributes: true,
            strict_definitions: true,
            extract_nulls: true,
            skip_object_smashing: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment and, when given, a TOML file.
    ///
    /// Environment variables take precedence over the file.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = file {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }
}
