//! Stat translation lookup and rendering
//!
//! The translation table maps numeric stat identifiers to one or more
//! phrasing templates. Which template applies depends on the argument values
//! (e.g. "increased" vs "reduced"), and each argument can be rescaled by
//! index handlers before substitution.
//!
//! ```
//! use pobdata::StatIndex;
//!
//! let table = r##"[{
//!     "ids": ["attack_speed_+%"],
//!     "English": [
//!         {"string": "{0}% increased Attack Speed", "format": ["#"],
//!          "condition": [{"min": 1}], "index_handlers": [[]]},
//!         {"string": "{0}% reduced Attack Speed", "format": ["#"],
//!          "condition": [{"max": -1}], "index_handlers": [["negate"]]}
//!     ]
//! }]"##;
//!
//! let index = StatIndex::from_json(table).unwrap();
//! assert_eq!(index.resolve("attack_speed_+%", &[-8]).unwrap(), "8% reduced Attack Speed");
//! ```

mod handlers;

pub use handlers::{handler_by_name, IndexHandler, Scaled, Transform, HANDLERS};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Template placeholder: `{0}`, `{1:+d}` or a bare `{}`
/// Highest argument count a translation may address
pub const MAX_STAT_ARGS: usize = 32;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d*)(?::([^}]*))?\}").unwrap());

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Unknown stat id: {0}")]
    NotFound(String),

    #[error("No translation of {id} accepts arguments {args:?}")]
    NoMatchingVariant { id: String, args: Vec<i64> },

    #[error("Translation of {id} needs unsupported index handler {handler}")]
    UnsupportedHandler { id: String, handler: String },

    #[error("Translation of {id} references missing argument {index}")]
    MissingArgument { id: String, index: usize },
}

/// How one argument is written into the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ArgFormat {
    /// `#`
    Plain,
    /// `+#`: always carries a sign
    Signed,
    /// `ignore`: not displayed
    Ignore,
}

impl TryFrom<String> for ArgFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "#" => Ok(ArgFormat::Plain),
            "+#" => Ok(ArgFormat::Signed),
            "ignore" => Ok(ArgFormat::Ignore),
            other => Err(format!("unknown argument format: {}", other)),
        }
    }
}

/// Accepted range for one argument; an empty condition accepts everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub negated: bool,
}

impl Condition {
    pub fn accepts(&self, value: i64) -> bool {
        let in_range =
            self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max);
        in_range != self.negated
    }
}

/// One phrasing of a stat
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatVariant {
    #[serde(rename = "string")]
    pub template: String,
    #[serde(default)]
    pub format: Vec<ArgFormat>,
    #[serde(default)]
    pub condition: Vec<Condition>,
    /// Handler chain per argument position
    #[serde(default, deserialize_with = "deserialize_handlers")]
    pub index_handlers: Vec<Vec<IndexHandler>>,
}

impl FormatVariant {
    /// Check every argument against its condition slot; missing slots accept
    pub fn accepts(&self, args: &[i64]) -> bool {
        args.iter()
            .zip(&self.condition)
            .all(|(value, condition)| condition.accepts(*value))
    }

    /// Apply index handlers and substitute arguments into the template
    pub fn render(&self, id: &str, args: &[i64]) -> Result<String, ResolveError> {
        let mut values = Vec::with_capacity(args.len());
        for (position, &arg) in args.iter().enumerate() {
            let mut value = Scaled::raw(arg);
            for handler in self.index_handlers.get(position).into_iter().flatten() {
                let transform =
                    handler
                        .transform()
                        .ok_or_else(|| ResolveError::UnsupportedHandler {
                            id: id.to_string(),
                            handler: handler.name().to_string(),
                        })?;
                value = value.apply(transform);
            }
            values.push(value);
        }

        let mut missing = None;
        let mut next_positional = 0;
        let text = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| {
            let index = match caps[1].parse::<usize>() {
                Ok(index) => index,
                Err(_) => {
                    next_positional += 1;
                    next_positional - 1
                }
            };
            let Some(value) = values.get(index) else {
                missing.get_or_insert(index);
                return String::new();
            };
            let format = self.format.get(index).copied().unwrap_or(ArgFormat::Plain);
            let signed = caps.get(2).map_or(false, |spec| spec.as_str().starts_with('+'));
            match format {
                ArgFormat::Ignore => String::new(),
                ArgFormat::Signed => value.render(true),
                ArgFormat::Plain => value.render(signed),
            }
        });

        if let Some(index) = missing {
            return Err(ResolveError::MissingArgument {
                id: id.to_string(),
                index,
            });
        }
        Ok(text.into_owned())
    }
}

/// `index_handlers` appears either as a list per argument or as an object
/// keyed by argument index.
fn deserialize_handlers<'de, D>(deserializer: D) -> Result<Vec<Vec<IndexHandler>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HandlerTable {
        Positional(Vec<Vec<IndexHandler>>),
        Keyed(BTreeMap<String, Vec<IndexHandler>>),
    }

    Ok(match HandlerTable::deserialize(deserializer)? {
        HandlerTable::Positional(handlers) => handlers,
        HandlerTable::Keyed(keyed) => {
            let mut positioned = BTreeMap::new();
            for (key, chain) in keyed {
                let index = key
                    .parse::<usize>()
                    .ok()
                    .filter(|index| *index < MAX_STAT_ARGS)
                    .ok_or_else(|| {
                        <D::Error as serde::de::Error>::custom(format!(
                            "invalid index handler position: {}",
                            key
                        ))
                    })?;
                positioned.insert(index, chain);
            }
            let len = positioned.keys().next_back().map_or(0, |last| last + 1);
            let mut handlers = vec![Vec::new(); len];
            for (index, chain) in positioned {
                handlers[index] = chain;
            }
            handlers
        }
    })
}

/// A row of the translation table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranslationEntry {
    pub ids: Vec<String>,
    #[serde(rename = "English")]
    pub english: Vec<FormatVariant>,
}

/// Stat id -> phrasing variants.
///
/// Ids declared together in one table entry each own a separate copy of the
/// variant list, so customizing one id never changes another.
#[derive(Debug, Clone, Default)]
pub struct StatIndex {
    variants: HashMap<String, Vec<FormatVariant>>,
}

impl StatIndex {
    /// Build the index; an id repeated in a later entry keeps its first definition
    pub fn build(entries: &[TranslationEntry]) -> Self {
        let mut variants: HashMap<String, Vec<FormatVariant>> = HashMap::new();
        for entry in entries {
            for id in &entry.ids {
                if variants.contains_key(id) {
                    tracing::warn!(stat = %id, "duplicate stat translation, keeping first");
                    continue;
                }
                variants.insert(id.clone(), entry.english.clone());
            }
        }
        tracing::debug!(stats = variants.len(), entries = entries.len(), "built stat index");
        StatIndex { variants }
    }

    /// Parse a translation table document and build the index
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<TranslationEntry> = serde_json::from_str(json)?;
        Ok(Self::build(&entries))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.variants.contains_key(id)
    }

    pub fn variants(&self, id: &str) -> Option<&[FormatVariant]> {
        self.variants.get(id).map(Vec::as_slice)
    }

    /// Mutable access to one id's own variant list
    pub fn variants_mut(&mut self, id: &str) -> Option<&mut Vec<FormatVariant>> {
        self.variants.get_mut(id)
    }

    /// Render a stat: the first variant whose condition accepts `args` wins
    pub fn resolve(&self, id: &str, args: &[i64]) -> Result<String, ResolveError> {
        let variants = self
            .variants
            .get(id)
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))?;

        let variant = variants
            .iter()
            .find(|variant| variant.accepts(args))
            .ok_or_else(|| ResolveError::NoMatchingVariant {
                id: id.to_string(),
                args: args.to_vec(),
            })?;

        variant.render(id, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r##"[
        {
            "ids": ["attack_speed_+%", "local_attack_speed_+%"],
            "English": [
                {
                    "string": "{0}% increased Attack Speed",
                    "format": ["#"],
                    "condition": [{"min": 1, "max": null}],
                    "index_handlers": [[]]
                },
                {
                    "string": "{0}% reduced Attack Speed",
                    "format": ["#"],
                    "condition": [{"max": -1}],
                    "index_handlers": [["negate"]]
                }
            ]
        },
        {
            "ids": ["base_maximum_life"],
            "English": [
                {"string": "{0} to maximum Life", "format": ["+#"], "condition": [{}], "index_handlers": []}
            ]
        },
        {
            "ids": ["attack_minimum_added_fire_damage", "attack_maximum_added_fire_damage"],
            "English": [
                {
                    "string": "Adds {0} to {1} Fire Damage to Attacks",
                    "format": ["#", "#"],
                    "condition": [{}, {}],
                    "index_handlers": [[], []]
                }
            ]
        },
        {
            "ids": ["base_skill_effect_duration"],
            "English": [
                {
                    "string": "Base duration is {0} seconds",
                    "format": ["#"],
                    "condition": [{}],
                    "index_handlers": {"0": ["milliseconds_to_seconds_2dp_if_required"]}
                }
            ]
        },
        {
            "ids": ["local_unique_jewel_passive"],
            "English": [
                {
                    "string": "Allocates {0}",
                    "format": ["#"],
                    "condition": [{}],
                    "index_handlers": [["passive_hash"]]
                }
            ]
        },
        {
            "ids": ["chance_to_not_consume_flask_charges"],
            "English": [
                {
                    "string": "{0}% chance for Flasks you use to not consume Charges",
                    "format": ["#"],
                    "condition": [{"min": 1, "max": 99}],
                    "index_handlers": [[]]
                },
                {
                    "string": "Flasks you use do not consume Charges",
                    "format": ["ignore"],
                    "condition": [{"min": 100}],
                    "index_handlers": [[]]
                }
            ]
        },
        {
            "ids": ["fire_resistance_+"],
            "English": [
                {"string": "{0:+d}% to Fire Resistance", "format": ["#"], "condition": [{}], "index_handlers": [[]]}
            ]
        },
        {
            "ids": ["broken_template"],
            "English": [
                {"string": "{0} and {1}", "format": ["#", "#"], "condition": [{}], "index_handlers": [[]]}
            ]
        }
    ]"##;

    fn index() -> StatIndex {
        StatIndex::from_json(TABLE).unwrap()
    }

    #[test]
    fn test_build_indexes_every_id() {
        let index = index();
        assert_eq!(index.len(), 10);
        assert!(index.contains("attack_speed_+%"));
        assert!(index.contains("local_attack_speed_+%"));
        assert!(index.contains("attack_maximum_added_fire_damage"));
    }

    #[test]
    fn test_condition_selects_variant() {
        let index = index();
        assert_eq!(
            index.resolve("attack_speed_+%", &[12]).unwrap(),
            "12% increased Attack Speed"
        );
        assert_eq!(
            index.resolve("attack_speed_+%", &[-8]).unwrap(),
            "8% reduced Attack Speed"
        );
    }

    #[test]
    fn test_no_matching_variant() {
        let err = index().resolve("attack_speed_+%", &[0]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoMatchingVariant {
                id: "attack_speed_+%".to_string(),
                args: vec![0],
            }
        );
    }

    #[test]
    fn test_not_found() {
        let err = index().resolve("no_such_stat", &[1]).unwrap_err();
        assert_eq!(err, ResolveError::NotFound("no_such_stat".to_string()));
    }

    #[test]
    fn test_shared_entry_renders_identically() {
        let index = index();
        for value in [-20, 5, 37] {
            assert_eq!(
                index.resolve("attack_speed_+%", &[value]),
                index.resolve("local_attack_speed_+%", &[value])
            );
        }
    }

    #[test]
    fn test_shared_entry_copies_are_independent() {
        let mut index = index();
        index.variants_mut("local_attack_speed_+%").unwrap()[0].template =
            "{0}% increased Attack Speed (local)".to_string();

        assert_eq!(
            index.resolve("local_attack_speed_+%", &[5]).unwrap(),
            "5% increased Attack Speed (local)"
        );
        assert_eq!(
            index.resolve("attack_speed_+%", &[5]).unwrap(),
            "5% increased Attack Speed"
        );
    }

    #[test]
    fn test_signed_format() {
        let index = index();
        assert_eq!(index.resolve("base_maximum_life", &[70]).unwrap(), "+70 to maximum Life");
        assert_eq!(index.resolve("base_maximum_life", &[-5]).unwrap(), "-5 to maximum Life");
    }

    #[test]
    fn test_inline_sign_placeholder() {
        assert_eq!(
            index().resolve("fire_resistance_+", &[30]).unwrap(),
            "+30% to Fire Resistance"
        );
    }

    #[test]
    fn test_two_arguments() {
        assert_eq!(
            index()
                .resolve("attack_minimum_added_fire_damage", &[4, 9])
                .unwrap(),
            "Adds 4 to 9 Fire Damage to Attacks"
        );
    }

    #[test]
    fn test_keyed_index_handlers() {
        let index = index();
        assert_eq!(
            index.resolve("base_skill_effect_duration", &[2500]).unwrap(),
            "Base duration is 2.5 seconds"
        );
        assert_eq!(
            index.resolve("base_skill_effect_duration", &[4000]).unwrap(),
            "Base duration is 4 seconds"
        );
    }

    #[test]
    fn test_keyed_handler_position_out_of_range() {
        let result: Result<Vec<TranslationEntry>, _> = serde_json::from_str(
            r##"[{"ids": ["a"], "English": [
                {"string": "{0}", "format": ["#"], "index_handlers": {"999999999": ["negate"]}}
            ]}]"##,
        );
        assert!(result.is_err());

        let result: Result<Vec<TranslationEntry>, _> = serde_json::from_str(
            r##"[{"ids": ["a"], "English": [
                {"string": "{0}", "format": ["#"], "index_handlers": {"first": ["negate"]}}
            ]}]"##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ignored_argument() {
        assert_eq!(
            index()
                .resolve("chance_to_not_consume_flask_charges", &[100])
                .unwrap(),
            "Flasks you use do not consume Charges"
        );
    }

    #[test]
    fn test_unsupported_handler_fails_on_use() {
        let err = index().resolve("local_unique_jewel_passive", &[1234]).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedHandler { handler, .. } if handler == "passive_hash"));
    }

    #[test]
    fn test_missing_argument() {
        let err = index().resolve("broken_template", &[1]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingArgument {
                id: "broken_template".to_string(),
                index: 1,
            }
        );
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let entries: Vec<TranslationEntry> = serde_json::from_str(
            r##"[
                {"ids": ["a"], "English": [{"string": "first {0}"}]},
                {"ids": ["a"], "English": [{"string": "second {0}"}]}
            ]"##,
        )
        .unwrap();
        let index = StatIndex::build(&entries);
        assert_eq!(index.resolve("a", &[1]).unwrap(), "first 1");
    }

    #[test]
    fn test_negated_condition() {
        let condition = Condition {
            min: Some(0),
            max: Some(0),
            negated: true,
        };
        assert!(condition.accepts(3));
        assert!(!condition.accepts(0));
        assert!(Condition::default().accepts(i64::MIN));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<Vec<TranslationEntry>, _> =
            serde_json::from_str(r##"[{"ids": ["a"], "English": [{"string": "{0}", "format": ["?"]}]}]"##);
        assert!(result.is_err());
    }
}
