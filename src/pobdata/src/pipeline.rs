//! Artifact pipelines
//!
//! One entry point per artifact type. A run reads its whole input, builds
//! the canonical data in memory and only then writes the artifact, through a
//! sibling temp file and a rename. A failed run leaves any previous artifact
//! untouched.

use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{ConfigError, PipelineConfig};
use crate::items::{ExcludedItem, IdCollision, ItemError, ItemNormalizer, RawItemRecord};
use crate::stats::{ResolveError, StatIndex};
use crate::uniques::{ReconcileError, UniqueVariantReconciler};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    fn io(path: &Path, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        PipelineError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A written artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ItemsSummary {
    pub artifact: ArtifactInfo,
    pub items: usize,
    pub excluded: Vec<ExcludedItem>,
    pub collisions: Vec<IdCollision>,
}

#[derive(Debug, Clone)]
pub struct UniquesSummary {
    pub artifact: ArtifactInfo,
    pub families: usize,
    pub records: usize,
}

// ============================================================================
// Inputs
// ============================================================================

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let data = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| PipelineError::json(path, e))
}

/// Read the raw item-base table, keeping file order
pub fn read_item_table(path: &Path) -> Result<IndexMap<String, RawItemRecord>, PipelineError> {
    read_json(path)
}

/// Read unique blocks grouped by family.
///
/// `path` is either a JSON object of family name to block list, or a
/// directory of `<family>.txt` files with blocks separated by blank lines.
/// Directory families are ordered by file name.
pub fn read_unique_blocks(path: &Path) -> Result<IndexMap<String, Vec<String>>, PipelineError> {
    if !path.is_dir() {
        return read_json(path);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(path).to_path_buf();
            PipelineError::io(&at, io::Error::from(e))
        })?;
        let file = entry.path();
        if entry.file_type().is_file() && file.extension().is_some_and(|ext| ext == "txt") {
            files.push(file.to_path_buf());
        }
    }

    let mut families = IndexMap::new();
    for file in files {
        let Some(family) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let text = fs::read_to_string(&file).map_err(|e| PipelineError::io(&file, e))?;
        let blocks = split_blocks(&text);
        tracing::debug!(family = %family, blocks = blocks.len(), "Read unique family");
        families
            .entry(family)
            .or_insert_with(Vec::new)
            .extend(blocks);
    }
    Ok(families)
}

/// Split text into blocks at blank lines
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

/// Load a stat translation table
pub fn load_stat_index(path: &Path) -> Result<StatIndex, PipelineError> {
    let data = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    let index = StatIndex::from_json(&data).map_err(|e| PipelineError::json(path, e))?;
    tracing::info!(path = %path.display(), ids = index.len(), "Loaded stat translations");
    Ok(index)
}

/// Load a translation table and render one stat
pub fn resolve_stat(table: &Path, id: &str, args: &[i64]) -> Result<String, PipelineError> {
    let index = load_stat_index(table)?;
    Ok(index.resolve(id, args)?)
}

// ============================================================================
// Outputs
// ============================================================================

/// Compute SHA-256 of a byte buffer as lowercase hex
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serialize `value` as pretty JSON and replace `path` in one step
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<ArtifactInfo, PipelineError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| PipelineError::json(path, e))?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    let written = fs::write(&tmp, &json)
        .map_err(|e| PipelineError::io(&tmp, e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e)));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(ArtifactInfo {
        path: path.to_path_buf(),
        bytes: json.len(),
        sha256: hash_bytes(json.as_bytes()),
    })
}

// ============================================================================
// Runs
// ============================================================================

/// Normalize the item-base table into the canonical item artifact
pub fn run_items(config: &PipelineConfig) -> Result<ItemsSummary, PipelineError> {
    config.validate()?;
    let normalizer = ItemNormalizer::new(config)?;

    let raw = read_item_table(&config.items.input)?;
    tracing::info!(path = %config.items.input.display(), records = raw.len(), "Read item table");

    let normalized = normalizer.normalize(raw)?;
    let artifact = write_artifact(&config.items.output, &normalized.items)?;
    tracing::info!(path = %artifact.path.display(), sha256 = %artifact.sha256, "Wrote item artifact");

    Ok(ItemsSummary {
        artifact,
        items: normalized.items.len(),
        excluded: normalized.excluded,
        collisions: normalized.collisions,
    })
}

/// Reconcile unique item text into the canonical unique artifact
pub fn run_uniques(config: &PipelineConfig) -> Result<UniquesSummary, PipelineError> {
    config.validate()?;
    let reconciler = UniqueVariantReconciler::new(config)?;

    let families = read_unique_blocks(&config.uniques.input)?;
    tracing::info!(
        path = %config.uniques.input.display(),
        families = families.len(),
        "Read unique blocks"
    );

    let reconciled = reconciler.reconcile(families)?;
    let artifact = write_artifact(&config.uniques.output, &reconciled.families)?;
    tracing::info!(path = %artifact.path.display(), sha256 = %artifact.sha256, "Wrote unique artifact");

    Ok(UniquesSummary {
        artifact,
        families: reconciled.families.len(),
        records: reconciled.record_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASES: &str = r##"{
        "Metadata/Items/Rings/Ring1": {"type": "Ring", "tags": {"default": true, "ring": true}, "req": {"level": 1}},
        "Metadata/Items/Gems/Fireball": {"type": "Active Skill Gem", "tags": [], "req": {}},
        "Metadata/Items/Armours/Tabula": {"type": "Body Armour", "req": {}, "implicit": "Has 6 Sockets"}
    }"##;

    fn config_in(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.items.input = dir.join("bases.json");
        config.items.output = dir.join("out/items.json");
        config.uniques.input = dir.join("uniques");
        config.uniques.output = dir.join("out/uniques.json");
        config
    }

    fn write_uniques(dir: &Path, files: &[(&str, &str)]) {
        let uniques = dir.join("uniques");
        fs::create_dir_all(&uniques).unwrap();
        for (name, text) in files {
            fs::write(uniques.join(name), text).unwrap();
        }
    }

    #[test]
    fn test_split_blocks() {
        let blocks = split_blocks("Rarity: UNIQUE\nA\nB\n\n\n  \nRarity: UNIQUE\nC\nD\n");
        assert_eq!(blocks, vec!["Rarity: UNIQUE\nA\nB", "Rarity: UNIQUE\nC\nD"]);
        assert!(split_blocks("\n\n").is_empty());
    }

    #[test]
    fn test_hash_bytes() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_run_items() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(dir.path());
        fs::write(&config.items.input, BASES)?;

        let summary = run_items(&config)?;
        assert_eq!(summary.items, 2);
        assert_eq!(summary.excluded.len(), 1);
        assert_eq!(summary.excluded[0].item_type, "Active Skill Gem");

        let written = fs::read(&config.items.output)?;
        assert_eq!(summary.artifact.sha256, hash_bytes(&written));
        assert_eq!(summary.artifact.bytes, written.len());

        let json: serde_json::Value = serde_json::from_slice(&written)?;
        assert_eq!(json["Metadata/Items/Armours/Tabula"]["initial_sockets"], "W-W-W-W-W-W");
        assert_eq!(json["Metadata/Items/Rings/Ring1"]["tags"], serde_json::json!(["ring"]));
        assert!(!config.items.output.with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_run_items_missing_input() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let err = run_items(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(!config.items.output.exists());
    }

    #[test]
    fn test_run_items_bad_json() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        fs::write(&config.items.input, "{ not json").unwrap();
        assert!(matches!(run_items(&config), Err(PipelineError::Json { .. })));
    }

    #[test]
    fn test_run_uniques_from_directory() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(dir.path());
        write_uniques(
            dir.path(),
            &[
                (
                    "ring.txt",
                    "Rarity: UNIQUE\nPrecursor's Emblem\nTopaz Ring\n+1 to Maximum Power Charges\n\n\
                     Rarity: UNIQUE\nPrecursor's Emblem\nSapphire Ring\n+1 to Maximum Frenzy Charges\n",
                ),
                ("amulet.txt", "Rarity: UNIQUE\nAstramentis\nOnyx Amulet\n+(80-100) to all Attributes\n"),
                ("notes.md", "not a family"),
            ],
        );

        let summary = run_uniques(&config)?;
        assert_eq!(summary.families, 2);
        assert_eq!(summary.records, 3);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config.uniques.output)?)?;
        assert_eq!(json["ring"][0]["Max Variants"], 7);
        assert_eq!(json["ring"][1]["baseType"], "Sapphire Ring");
        assert_eq!(json["amulet"][0]["title"], "Astramentis");
        assert!(json.get("notes").is_none());
        Ok(())
    }

    #[test]
    fn test_run_uniques_from_json() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mut config = config_in(dir.path());
        config.uniques.input = dir.path().join("uniques.json");
        fs::write(
            &config.uniques.input,
            r##"{"belt": ["Rarity: UNIQUE\nHeadhunter\nLeather Belt\n+(40-55) to Strength"]}"##,
        )?;

        let summary = run_uniques(&config)?;
        assert_eq!(summary.records, 1);
        Ok(())
    }

    #[test]
    fn test_failed_run_keeps_previous_artifact() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let config = config_in(dir.path());
        write_uniques(dir.path(), &[("ring.txt", "Rarity: UNIQUE\nKaom's Sign\nCoral Ring\n")]);
        let first = run_uniques(&config)?;

        write_uniques(
            dir.path(),
            &[("ring.txt", "Rarity: UNIQUE\nKaom's Sign\nCoral Ring\n\nKaom's Sign\nCoral Ring\n")],
        );
        let err = run_uniques(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Reconcile(ReconcileError::MalformedBlock { index: 1, .. })
        ));

        let written = fs::read(&config.uniques.output)?;
        assert_eq!(hash_bytes(&written), first.artifact.sha256);
        Ok(())
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("items.json");
        fs::create_dir_all(output.join("occupied")).unwrap();

        let err = write_artifact(&output, &serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(!output.with_extension("json.tmp").exists());
        assert!(output.join("occupied").is_dir());
    }

    #[test]
    fn test_oversized_sockets_abort_items_run() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        fs::write(
            &config.items.input,
            r#"{"Armours/Huge": {"type": "Body Armour", "req": {}, "implicit": "Has 4000000000 Sockets"}}"#,
        )
        .unwrap();

        let err = run_items(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Item(ref e) if e.id == "Armours/Huge"));
        assert!(!config.items.output.exists());
    }

    #[test]
    fn test_invalid_config_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        fs::write(&config.items.input, BASES).unwrap();
        config.item_types.clear();
        assert!(matches!(
            run_items(&config),
            Err(PipelineError::Config(ConfigError::EmptyWhitelist))
        ));
        assert!(!config.items.output.exists());
    }

    #[test]
    fn test_load_stat_index() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("stat_translations.json");
        fs::write(
            &path,
            r##"[{"ids": ["base_maximum_life"], "English": [
                {"string": "{0:+d} to maximum Life", "format": ["+#"], "condition": [{}], "index_handlers": [[]]}
            ]}]"##,
        )?;
        let index = load_stat_index(&path)?;
        assert_eq!(index.resolve("base_maximum_life", &[40])?, "+40 to maximum Life");
        assert_eq!(resolve_stat(&path, "base_maximum_life", &[-5])?, "-5 to maximum Life");
        assert!(matches!(
            resolve_stat(&path, "base_maximum_mana", &[1]),
            Err(PipelineError::Resolve(ResolveError::NotFound(_)))
        ));
        Ok(())
    }
}
