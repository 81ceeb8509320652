//! Parser settings, loadable from a TOML file:
//!
//! ```toml
//! debug_level = 1
//! recover = true
//! max_errors = 10
//! ds9_string_limits = true
//! overflow = "error"
//! ```

use crate::error::{Error, Result};
use crate::lexer::DEFAULT_MAX_STRING_LEN;
use crate::style::StringLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens when a shape lists more radii or angles than the scratch
/// lists hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the first entries and drop the rest.
    #[default]
    Drop,
    /// Reject the statement with an error.
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    pub debug_level: u8,
    /// Skip to the next statement after a syntax error instead of stopping.
    pub recover: bool,
    pub max_errors: usize,
    pub max_string_len: usize,
    /// Truncate color, font, text and comment strings the way DS9 does.
    pub ds9_string_limits: bool,
    pub overflow: OverflowPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            debug_level: 0,
            recover: true,
            max_errors: 100,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            ds9_string_limits: false,
            overflow: OverflowPolicy::Drop,
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn string_limits(&self) -> StringLimits {
        if self.ds9_string_limits {
            StringLimits::DS9
        } else {
            StringLimits::UNBOUNDED
        }
    }
}
