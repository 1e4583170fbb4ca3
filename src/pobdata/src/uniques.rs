//! Unique item reconciliation
//!
//! Unique items arrive as text blocks grouped by family (one family per
//! equipment slot or category). Each block becomes one record; records that
//! describe variants of the same unique get a `Max Variants` count, with a
//! small override table for uniques whose exports are known to miscount.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::item_text::{ItemTextParser, ParseError, ParsedItem};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Malformed block {index} in family {family:?}: {reason}")]
    MalformedBlock {
        family: String,
        index: usize,
        #[source]
        reason: ParseError,
    },

    #[error("Reconciled {actual} records from {expected} blocks")]
    CountMismatch { expected: usize, actual: usize },
}

/// A unique item as written to the canonical artifact. Rarity is dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueItemRecord {
    pub title: String,
    #[serde(rename = "baseType", skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    pub req: IndexMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicits: Option<u32>,
    pub mods: Vec<String>,
    #[serde(rename = "Max Variants", skip_serializing_if = "Option::is_none")]
    pub max_variants: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(rename = "selectedVariant", skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "limitedTo", skip_serializing_if = "Option::is_none")]
    pub limited_to: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<String>,
}

impl From<ParsedItem> for UniqueItemRecord {
    fn from(item: ParsedItem) -> Self {
        UniqueItemRecord {
            title: item.title,
            base_type: item.base_type,
            req: item.requirements,
            implicit: item.implicit,
            implicits: item.implicit_count,
            mods: item.mods,
            max_variants: None,
            variants: item.variants,
            selected_variant: item.selected_variant,
            quality: item.quality,
            sockets: item.sockets,
            league: item.league,
            source: item.source,
            limited_to: item.limited_to,
            radius: item.radius,
        }
    }
}

/// Reconciled records per family, families sorted by name
#[derive(Debug, Clone, Default)]
pub struct ReconciledUniques {
    pub families: BTreeMap<String, Vec<UniqueItemRecord>>,
    pub block_count: usize,
}

impl ReconciledUniques {
    pub fn record_count(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }
}

pub struct UniqueVariantReconciler<'a> {
    config: &'a PipelineConfig,
    parser: ItemTextParser,
}

impl<'a> UniqueVariantReconciler<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self, ConfigError> {
        Ok(UniqueVariantReconciler {
            config,
            parser: ItemTextParser::new(config.encoding_fixer()?),
        })
    }

    /// Parse and reconcile every family.
    ///
    /// Families run in parallel; on failure the error of the first failing
    /// family in input order is returned.
    pub fn reconcile(
        &self,
        families: IndexMap<String, Vec<String>>,
    ) -> Result<ReconciledUniques, ReconcileError> {
        let block_count = families.values().map(Vec::len).sum();
        let families: Vec<(String, Vec<String>)> = families.into_iter().collect();

        let results: Vec<_> = families
            .par_iter()
            .map(|(family, blocks)| self.reconcile_family(family, blocks))
            .collect();

        let mut out = ReconciledUniques {
            families: BTreeMap::new(),
            block_count,
        };
        for ((family, _), records) in families.into_iter().zip(results) {
            let records = records?;
            tracing::debug!(family = %family, records = records.len(), "Reconciled family");
            out.families.entry(family).or_default().extend(records);
        }

        let actual = out.record_count();
        if actual != block_count {
            return Err(ReconcileError::CountMismatch {
                expected: block_count,
                actual,
            });
        }

        tracing::info!(
            families = out.families.len(),
            records = actual,
            "Reconciled unique items"
        );
        Ok(out)
    }

    /// Parse one family's blocks in order and assign variant counts
    pub fn reconcile_family(
        &self,
        family: &str,
        blocks: &[String],
    ) -> Result<Vec<UniqueItemRecord>, ReconcileError> {
        let mut records = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                self.parser
                    .parse(block)
                    .map(UniqueItemRecord::from)
                    .map_err(|reason| ReconcileError::MalformedBlock {
                        family: family.to_string(),
                        index,
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut title_counts: HashMap<String, u32> = HashMap::new();
        for record in &records {
            *title_counts.entry(record.title.clone()).or_default() += 1;
        }

        for record in &mut records {
            let shared = title_counts.get(&record.title).copied().unwrap_or(1);
            let declared = u32::try_from(record.variants.len()).unwrap_or(u32::MAX);
            let derived = shared.max(declared);

            record.max_variants = match self.config.variant_override(&record.title) {
                Some(forced) => {
                    if forced != derived {
                        tracing::debug!(
                            title = %record.title,
                            derived,
                            forced,
                            "Overriding variant count"
                        );
                    }
                    Some(forced)
                }
                None if derived > 1 => Some(derived),
                None => None,
            };
        }

        Ok(records)
    }
}
