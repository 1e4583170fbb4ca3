//! # pobdata
//!
//! Game data normalization library - turns raw item exports into the
//! canonical tables used by a build planner.
//!
//! This library provides functionality to:
//! - Derive initial socket colors from attribute requirements
//! - Resolve stat identifiers to rendered translation text
//! - Parse quasi-structured item description text
//! - Normalize item-base tables and reconcile unique item variants
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = pobdata::PipelineConfig::default();
//! config.items.input = "exports/bases.json".into();
//! config.items.output = "data/items.json".into();
//!
//! let summary = pobdata::run_items(&config)?;
//! println!("{} items, sha256 {}", summary.items, summary.artifact.sha256);
//! for excluded in &summary.excluded {
//!     println!("skipped {} ({})", excluded.id, excluded.item_type);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encoding;
pub mod item_text;
pub mod items;
pub mod pipeline;
pub mod reference;
pub mod sockets;
pub mod stats;
pub mod uniques;

// Re-export commonly used items
#[doc(inline)]
pub use config::{ArtifactPaths, ConfigError, PipelineConfig};
#[doc(inline)]
pub use encoding::{EncodingFix, EncodingFixer};
#[doc(inline)]
pub use item_text::{ItemTextParser, ParseError, ParseState, ParsedItem, Rarity};
#[doc(inline)]
pub use items::{
    CanonicalItemRecord, ExcludedItem, IdCollision, ItemError, ItemNormalizer, NormalizedItems,
    RawItemRecord, RecordOutcome,
};
#[doc(inline)]
pub use pipeline::{
    load_stat_index, resolve_stat, run_items, run_uniques, ArtifactInfo, ItemsSummary, PipelineError,
    UniquesSummary,
};
#[doc(inline)]
pub use sockets::{derive_socket_layout, SocketColor, SocketError, SocketLayout, Sockets};
#[doc(inline)]
pub use stats::{ResolveError, StatIndex};
#[doc(inline)]
pub use uniques::{ReconcileError, ReconciledUniques, UniqueItemRecord, UniqueVariantReconciler};
