//! Pipeline configuration
//!
//! Everything a run needs besides its input data: artifact locations, the
//! item-type whitelist, the unique variant overrides and the encoding fix
//! table. Missing fields fall back to the built-in reference tables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

use crate::encoding::{default_fixes, EncodingFix, EncodingFixer};
use crate::reference::{ITEM_TYPES, VARIANT_OVERRIDES};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Encoding fix with an empty pattern")]
    EmptyFixPattern,

    #[error("Encoding fix {from:?} -> {to:?} reintroduces pattern {pattern:?}")]
    NonIdempotentFix {
        from: String,
        to: String,
        pattern: String,
    },

    #[error("Variant override for {0:?} must be at least 1")]
    ZeroVariantOverride(String),

    #[error("Item type whitelist is empty")]
    EmptyWhitelist,
}

/// Input and output location of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Item categories kept by the normalizer
    pub item_types: BTreeSet<String>,
    pub items: ArtifactPaths,
    pub uniques: ArtifactPaths,
    /// Unique title -> forced `Max Variants`
    pub variant_overrides: BTreeMap<String, u32>,
    pub encoding_fixes: Vec<EncodingFix>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            item_types: ITEM_TYPES.iter().map(|t| t.to_string()).collect(),
            items: ArtifactPaths {
                input: PathBuf::from("data/bases.json"),
                output: PathBuf::from("out/items.json"),
            },
            uniques: ArtifactPaths {
                input: PathBuf::from("data/uniques"),
                output: PathBuf::from("out/uniques.json"),
            },
            variant_overrides: VARIANT_OVERRIDES
                .iter()
                .map(|(title, count)| (title.to_string(), *count))
                .collect(),
            encoding_fixes: default_fixes(),
        }
    }
}

impl PipelineConfig {
    /// Check the tables before a run touches any data
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_types.is_empty() {
            return Err(ConfigError::EmptyWhitelist);
        }
        if let Some((title, _)) = self.variant_overrides.iter().find(|(_, n)| **n == 0) {
            return Err(ConfigError::ZeroVariantOverride(title.clone()));
        }
        self.encoding_fixer().map(|_| ())
    }

    pub fn encoding_fixer(&self) -> Result<EncodingFixer, ConfigError> {
        EncodingFixer::new(self.encoding_fixes.clone())
    }

    pub fn is_known_item_type(&self, item_type: &str) -> bool {
        self.item_types.contains(item_type)
    }

    pub fn variant_override(&self, title: &str) -> Option<u32> {
        self.variant_overrides.get(title).copied()
    }
}
