//! Item base table normalization
//!
//! Turns the raw item-base export into the canonical item table: unknown
//! categories are filtered out, requirement keys title-cased, the `default`
//! tag dropped, socket layouts derived and identifiers repaired.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::encoding::EncodingFixer;
use crate::reference::attribute_by_key;
use crate::sockets::{derive_socket_layout, SocketError, Sockets};

/// Tag placed on every base by the exporter; carries no information
pub const DEFAULT_TAG: &str = "default";

/// Item tags as exported: either a map of tag name to metadata or a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    Map(IndexMap<String, Value>),
    List(Vec<String>),
}

impl RawTags {
    pub fn names(&self) -> Vec<&str> {
        match self {
            RawTags::Map(map) => map.keys().map(String::as_str).collect(),
            RawTags::List(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

/// One entry of the raw item-base table; the identifier is the table key
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawItemRecord {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub tags: Option<RawTags>,
    #[serde(default)]
    pub req: Option<IndexMap<String, i64>>,
    #[serde(default)]
    pub implicit: Option<String>,
    #[serde(default, rename = "socketLimit")]
    pub socket_limit: Option<u32>,
    /// Fields the normalizer does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the canonical item table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalItemRecord {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub req: IndexMap<String, i64>,
    pub max_num_sockets: u32,
    pub initial_sockets: Sockets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record dropped because its category is not whitelisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedItem {
    pub id: String,
    pub item_type: String,
}

/// A record whose data cannot be normalized
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Item {id}: {source}")]
pub struct ItemError {
    pub id: String,
    #[source]
    pub source: SocketError,
}

/// Per-record normalization result
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Kept {
        raw_id: String,
        id: String,
        record: CanonicalItemRecord,
    },
    Excluded(ExcludedItem),
}

/// Two raw identifiers that became the same key after the encoding fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdCollision {
    pub id: String,
    pub kept: String,
    pub dropped: String,
}

/// Result of one normalization pass
#[derive(Debug, Clone, Default)]
pub struct NormalizedItems {
    pub items: BTreeMap<String, CanonicalItemRecord>,
    pub excluded: Vec<ExcludedItem>,
    pub collisions: Vec<IdCollision>,
}

/// Title-case a requirement key: `str` -> `Str`, `LEVEL` -> `Level`
pub fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Title-case every key, keeping the first value when two keys fold together
pub fn title_case_keys(req: &IndexMap<String, i64>) -> IndexMap<String, i64> {
    let mut out = IndexMap::with_capacity(req.len());
    for (key, value) in req {
        out.entry(title_case(key)).or_insert(*value);
    }
    out
}

pub struct ItemNormalizer<'a> {
    config: &'a PipelineConfig,
    fixer: EncodingFixer,
}

impl<'a> ItemNormalizer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self, ConfigError> {
        Ok(ItemNormalizer {
            config,
            fixer: config.encoding_fixer()?,
        })
    }

    /// Normalize a whole table. Records are processed in parallel and merged
    /// back in input order, so the first of two colliding ids wins and the
    /// first failing record in input order is the one reported.
    pub fn normalize(
        &self,
        raw: IndexMap<String, RawItemRecord>,
    ) -> Result<NormalizedItems, ItemError> {
        let entries: Vec<(String, RawItemRecord)> = raw.into_iter().collect();
        let results: Vec<_> = entries
            .into_par_iter()
            .map(|(id, record)| self.normalize_record(id, record))
            .collect();

        let mut out = NormalizedItems::default();
        let mut raw_ids: HashMap<String, String> = HashMap::new();
        for result in results {
            match result? {
                RecordOutcome::Kept { raw_id, id, record } => {
                    if let Some(kept) = raw_ids.get(&id) {
                        tracing::warn!(id = %id, kept = %kept, dropped = %raw_id, "Item id collision after encoding fix");
                        out.collisions.push(IdCollision {
                            id,
                            kept: kept.clone(),
                            dropped: raw_id,
                        });
                        continue;
                    }
                    raw_ids.insert(id.clone(), raw_id);
                    out.items.insert(id, record);
                }
                RecordOutcome::Excluded(excluded) => {
                    tracing::warn!(
                        id = %excluded.id,
                        item_type = %excluded.item_type,
                        "Excluding item with unknown type"
                    );
                    out.excluded.push(excluded);
                }
            }
        }

        tracing::info!(
            kept = out.items.len(),
            excluded = out.excluded.len(),
            collisions = out.collisions.len(),
            "Normalized item table"
        );
        Ok(out)
    }

    /// Normalize one record; unknown categories are excluded, not failed
    pub fn normalize_record(
        &self,
        raw_id: String,
        raw: RawItemRecord,
    ) -> Result<RecordOutcome, ItemError> {
        if !self.config.is_known_item_type(&raw.item_type) {
            return Ok(RecordOutcome::Excluded(ExcludedItem {
                id: raw_id,
                item_type: raw.item_type,
            }));
        }

        let req = raw.req.as_ref().map(title_case_keys).unwrap_or_default();

        let tags = raw
            .tags
            .as_ref()
            .map(|tags| {
                tags.names()
                    .into_iter()
                    .filter(|name| *name != DEFAULT_TAG)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let socket_req: IndexMap<String, i64> = req
            .iter()
            .filter(|(key, _)| attribute_by_key(key).is_some())
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        let layout = derive_socket_layout(
            &socket_req,
            raw.socket_limit.unwrap_or(0),
            raw.implicit.as_deref(),
        )
        .map_err(|source| ItemError {
            id: raw_id.clone(),
            source,
        })?;

        let mut extra = raw.extra;
        extra.remove("max_num_sockets");
        extra.remove("initial_sockets");

        let id = self.fixer.apply(&raw_id).into_owned();
        Ok(RecordOutcome::Kept {
            raw_id,
            id,
            record: CanonicalItemRecord {
                item_type: raw.item_type,
                tags,
                req,
                max_num_sockets: layout.max_num_sockets,
                initial_sockets: layout.initial_sockets,
                implicit: raw.implicit,
                extra,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str) -> IndexMap<String, RawItemRecord> {
        serde_json::from_str(json).unwrap()
    }

    fn try_normalize(json: &str) -> Result<NormalizedItems, ItemError> {
        let config = PipelineConfig::default();
        ItemNormalizer::new(&config).unwrap().normalize(table(json))
    }

    fn normalize(json: &str) -> NormalizedItems {
        try_normalize(json).unwrap()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("str"), "Str");
        assert_eq!(title_case("LEVEL"), "Level");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_title_case_keys_idempotent() {
        let req: IndexMap<String, i64> =
            [("level".to_string(), 10), ("dex".to_string(), 5), ("INT".to_string(), 3)]
                .into_iter()
                .collect();
        let once = title_case_keys(&req);
        let twice = title_case_keys(&once);
        assert_eq!(once, twice);
        let keys: Vec<&str> = once.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Level", "Dex", "Int"]);
    }

    #[test]
    fn test_normalize_record() {
        let out = normalize(
            r#"{
                "Metadata/Items/Armours/BodyArmours/BodyStr1": {
                    "type": "Body Armour",
                    "tags": {"default": true, "armour": true, "str_armour": true},
                    "req": {"level": 1, "str": 10, "dex": 5},
                    "socketLimit": 3,
                    "name": "Plate Vest"
                }
            }"#,
        );
        let record = &out.items["Metadata/Items/Armours/BodyArmours/BodyStr1"];
        assert_eq!(record.tags, vec!["armour", "str_armour"]);
        assert_eq!(record.req.get("Str"), Some(&10));
        assert_eq!(record.max_num_sockets, 3);
        assert_eq!(record.initial_sockets.to_string(), "R-G-R");
        assert_eq!(record.extra.get("name"), Some(&Value::from("Plate Vest")));

        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("socketLimit").is_none());
        assert!(json.get("implicit").is_none());
        assert_eq!(json["initial_sockets"], "R-G-R");
        assert_eq!(json["type"], "Body Armour");
    }

    #[test]
    fn test_unknown_type_excluded() {
        let out = normalize(
            r#"{
                "Gems/Fireball": {"type": "Active Skill Gem", "tags": [], "req": {}},
                "Rings/Ring1": {"type": "Ring", "tags": ["default"], "req": {"level": 8}}
            }"#,
        );
        assert_eq!(out.items.len(), 1);
        assert_eq!(
            out.excluded,
            vec![ExcludedItem {
                id: "Gems/Fireball".to_string(),
                item_type: "Active Skill Gem".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_tags_omitted_and_missing_req_is_map() {
        let out = normalize(r#"{"Rings/Ring1": {"type": "Ring", "tags": ["default"], "req": null}}"#);
        let json = serde_json::to_value(&out.items["Rings/Ring1"]).unwrap();
        assert!(json.get("tags").is_none());
        assert_eq!(json["req"], serde_json::json!({}));
        assert_eq!(json["max_num_sockets"], 0);
        assert_eq!(json["initial_sockets"], "");
    }

    #[test]
    fn test_implicit_sockets() {
        let out = normalize(
            r#"{"Two/Tabula": {"type": "Body Armour", "req": {}, "implicit": "Has 6 Sockets"}}"#,
        );
        let record = &out.items["Two/Tabula"];
        assert_eq!(record.max_num_sockets, 6);
        assert_eq!(record.initial_sockets.to_string(), "W-W-W-W-W-W");
        assert_eq!(record.implicit.as_deref(), Some("Has 6 Sockets"));
    }

    #[test]
    fn test_long_attribute_keys_color_sockets() {
        let out = normalize(
            r#"{
                "Staves/S1": {"type": "Staff", "req": {"strength": 20, "int": 20}, "socketLimit": 3},
                "Staves/S2": {"type": "Staff", "req": {"strength": 20}, "socketLimit": 2}
            }"#,
        );
        assert_eq!(out.items["Staves/S1"].initial_sockets.to_string(), "R-B-R");
        assert_eq!(out.items["Staves/S2"].initial_sockets.to_string(), "R-R");
        assert_eq!(out.items["Staves/S2"].req.get("Strength"), Some(&20));
    }

    #[test]
    fn test_oversized_sockets_fail_the_record() {
        let err = try_normalize(
            r#"{
                "Rings/Ring1": {"type": "Ring", "req": {}},
                "Armours/Huge": {"type": "Body Armour", "req": {}, "implicit": "Has 99999999999 Sockets"}
            }"#,
        )
        .unwrap_err();
        assert_eq!(err.id, "Armours/Huge");
        assert!(matches!(err.source, SocketError::TooManySockets { .. }));

        let err = try_normalize(
            r#"{"Rings/Ring1": {"type": "Ring", "req": {"str": 1}, "socketLimit": 4000000000}}"#,
        )
        .unwrap_err();
        assert_eq!(err.id, "Rings/Ring1");
    }

    #[test]
    fn test_identifier_encoding_fixed() {
        let out = normalize(r#"{"Uniques/Mjolner": {"type": "One Handed Mace", "req": {}}}"#);
        assert!(out.items.contains_key("Uniques/Mjölner"));
    }

    #[test]
    fn test_identifier_collision_keeps_first() {
        let out = normalize(
            r#"{
                "Uniques/Mjolner": {"type": "One Handed Mace", "req": {"level": 1}},
                "Uniques/MjÃ¶lner": {"type": "One Handed Mace", "req": {"level": 2}}
            }"#,
        );
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items["Uniques/Mjölner"].req.get("Level"), Some(&1));
        assert_eq!(out.collisions.len(), 1);
        assert_eq!(out.collisions[0].kept, "Uniques/Mjolner");
        assert_eq!(out.collisions[0].dropped, "Uniques/MjÃ¶lner");
    }

    #[test]
    fn test_output_keys_sorted() {
        let out = normalize(
            r#"{
                "b": {"type": "Ring", "req": {}},
                "a": {"type": "Ring", "req": {}}
            }"#,
        );
        let keys: Vec<&str> = out.items.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
