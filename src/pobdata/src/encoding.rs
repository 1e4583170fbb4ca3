//! Repair of defective accented characters in exported names
//!
//! Some exports carry `ö` either transliterated to ASCII (`Mjolner`) or as
//! its UTF-8 bytes read back as Latin-1 (`MjÃ¶lner`). Both item titles and
//! base item identifiers are affected.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::config::ConfigError;
use crate::reference::ENCODING_FIXES;

/// A single `defective -> correct` replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingFix {
    pub from: String,
    pub to: String,
}

impl EncodingFix {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        EncodingFix {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Ordered replacement table.
///
/// A table is only accepted when applying it is idempotent at the table
/// level: no replacement text contains any pattern of the table.
#[derive(Debug, Clone)]
pub struct EncodingFixer {
    fixes: Vec<EncodingFix>,
}

impl EncodingFixer {
    pub fn new(fixes: Vec<EncodingFix>) -> Result<Self, ConfigError> {
        for fix in &fixes {
            if fix.from.is_empty() {
                return Err(ConfigError::EmptyFixPattern);
            }
        }
        for fix in &fixes {
            if let Some(other) = fixes.iter().find(|other| fix.to.contains(&other.from)) {
                return Err(ConfigError::NonIdempotentFix {
                    from: fix.from.clone(),
                    to: fix.to.clone(),
                    pattern: other.from.clone(),
                });
            }
        }
        Ok(EncodingFixer { fixes })
    }

    pub fn fixes(&self) -> &[EncodingFix] {
        &self.fixes
    }

    /// Rewrite every defective rendering in `text`, borrowing when clean
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for fix in &self.fixes {
            if out.contains(fix.from.as_str()) {
                out = Cow::Owned(out.replace(fix.from.as_str(), &fix.to));
            }
        }
        out
    }
}

impl Default for EncodingFixer {
    fn default() -> Self {
        EncodingFixer {
            fixes: default_fixes(),
        }
    }
}

/// The built-in fix table as owned entries
pub fn default_fixes() -> Vec<EncodingFix> {
    ENCODING_FIXES
        .iter()
        .map(|(from, to)| EncodingFix::new(*from, *to))
        .collect()
}
