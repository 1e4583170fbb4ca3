//! Item description text parsing
//!
//! Item text is a line-oriented block with a handful of fixed fields and
//! free-form modifier lines:
//!
//! ```text
//! Rarity: UNIQUE
//! Precursor's Emblem
//! Topaz Ring
//! Variant: Topaz Ring
//! Requires Level 49
//! Implicit: +(20-30)% to Lightning Resistance
//! +1 to Maximum Power Charges
//! ```
//!
//! Parsing is a single pass over the lines driven by [`ParseState`]. Only a
//! missing `Rarity:` header (or a block that ends before its title) is an
//! error; every line that is not a recognized field becomes a mod line, in
//! the order read.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

use crate::encoding::EncodingFixer;
use crate::reference::attribute_by_key;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed item block: {0}")]
    MalformedBlock(String),
}

/// Item rarity from the `Rarity:` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rarity {
    Normal,
    Magic,
    Rare,
    Unique,
    Relic,
}

impl FromStr for Rarity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Rarity::Normal),
            "MAGIC" => Ok(Rarity::Magic),
            "RARE" => Ok(Rarity::Rare),
            "UNIQUE" => Ok(Rarity::Unique),
            "RELIC" => Ok(Rarity::Relic),
            other => Err(ParseError::MalformedBlock(format!("unknown rarity {:?}", other))),
        }
    }
}

/// Parser position within a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// First line must be the `Rarity:` header
    ExpectRarity,
    /// Next line is the item title
    ExpectTitle,
    /// Next line is the base type, unless it is already a known field
    ExpectType,
    /// Fields and mod lines until the end of the block
    CollectMods,
    /// End of input reached
    Done,
}

/// Structured form of one item text block
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub rarity: Rarity,
    pub title: String,
    pub base_type: Option<String>,
    /// `Level`, `Str`, `Dex`, `Int` in the order written
    pub requirements: IndexMap<String, i64>,
    pub quality: Option<u32>,
    pub sockets: Option<String>,
    pub implicit: Option<String>,
    pub implicit_count: Option<u32>,
    pub variants: Vec<String>,
    pub selected_variant: Option<u32>,
    pub league: Option<String>,
    pub source: Option<String>,
    pub limited_to: Option<u32>,
    pub radius: Option<String>,
    /// Modifier lines, display order
    pub mods: Vec<String>,
}

impl ParsedItem {
    fn new(rarity: Rarity, title: String) -> Self {
        ParsedItem {
            rarity,
            title,
            base_type: None,
            requirements: IndexMap::new(),
            quality: None,
            sockets: None,
            implicit: None,
            implicit_count: None,
            variants: Vec::new(),
            selected_variant: None,
            league: None,
            source: None,
            limited_to: None,
            radius: None,
            mods: Vec::new(),
        }
    }
}

// ============================================================================
// Known Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Variant,
    SelectedVariant,
    League,
    Source,
    Quality,
    Requires,
    LevelReq,
    Sockets,
    Implicits,
    Implicit,
    LimitedTo,
    Radius,
}

struct FieldPattern {
    prefix: &'static str,
    field: Field,
    pattern: Regex,
}

/// Known field prefixes, checked in order. `Implicits:` precedes `Implicit:`.
static FIELDS: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    [
        ("Variant:", Field::Variant, r"^Variant:\s*(.+)$"),
        ("Selected Variant:", Field::SelectedVariant, r"^Selected Variant:\s*(\d+)$"),
        ("League:", Field::League, r"^League:\s*(.+)$"),
        ("Source:", Field::Source, r"^Source:\s*(.+)$"),
        ("Quality:", Field::Quality, r"^Quality:\s*\+?(\d+)%?"),
        ("Requires ", Field::Requires, r"^Requires\s+(.+)$"),
        ("LevelReq:", Field::LevelReq, r"^LevelReq:\s*(\d+)$"),
        ("Sockets:", Field::Sockets, r"^Sockets:\s*([RGBWAD](?:[- ][RGBWAD])*)\s*$"),
        ("Implicits:", Field::Implicits, r"^Implicits:\s*(\d+)$"),
        ("Implicit:", Field::Implicit, r"^Implicit:\s*(.+)$"),
        ("Limited to:", Field::LimitedTo, r"^Limited to:\s*(\d+)"),
        ("Radius:", Field::Radius, r"^Radius:\s*(.+)$"),
    ]
    .into_iter()
    .map(|(prefix, field, pattern)| FieldPattern {
        prefix,
        field,
        pattern: Regex::new(pattern).unwrap(),
    })
    .collect()
});

static RARITY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Rarity:\s*([A-Za-z]+)$").unwrap());

static LEVEL_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Level\s+(\d+)(?:\s*\(.*\))?$").unwrap());

static ATTRIBUTE_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+([A-Za-z]+)(?:\s*\(.*\))?$").unwrap());

fn known_field(line: &str) -> Option<&'static FieldPattern> {
    FIELDS.iter().find(|f| line.starts_with(f.prefix))
}

/// Parse "Level 49, 100 Str, 50 Int" into ordered requirement pairs
fn parse_requirements(text: &str) -> Option<Vec<(String, i64)>> {
    text.split(',')
        .map(str::trim)
        .map(|piece| {
            if let Some(caps) = LEVEL_REQUIREMENT.captures(piece) {
                return Some(("Level".to_string(), caps[1].parse().ok()?));
            }
            let caps = ATTRIBUTE_REQUIREMENT.captures(piece)?;
            let attr = attribute_by_key(&caps[2])?;
            Some((attr.short.to_string(), caps[1].parse().ok()?))
        })
        .collect()
}

// ============================================================================
// Parser
// ============================================================================

/// Line-state-machine parser for item text blocks
#[derive(Debug, Clone, Default)]
pub struct ItemTextParser {
    fixer: EncodingFixer,
}

impl ItemTextParser {
    pub fn new(fixer: EncodingFixer) -> Self {
        ItemTextParser { fixer }
    }

    /// Parse one block
    pub fn parse(&self, block: &str) -> Result<ParsedItem, ParseError> {
        let mut reader = BlockReader::default();
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            reader.step(line)?;
        }
        reader.end_of_input()?;
        let mut item = reader.finish()?;

        item.title = self.fixer.apply(&item.title).into_owned();
        if let Some(base_type) = item.base_type.take() {
            item.base_type = Some(self.fixer.apply(&base_type).into_owned());
        }
        Ok(item)
    }
}

#[derive(Debug)]
struct BlockReader {
    state: ParseState,
    rarity: Option<Rarity>,
    item: Option<ParsedItem>,
}

impl Default for BlockReader {
    fn default() -> Self {
        BlockReader {
            state: ParseState::ExpectRarity,
            rarity: None,
            item: None,
        }
    }
}

impl BlockReader {
    fn step(&mut self, line: &str) -> Result<(), ParseError> {
        match self.state {
            ParseState::ExpectRarity => {
                let caps = RARITY_HEADER.captures(line).ok_or_else(|| {
                    ParseError::MalformedBlock(format!("expected Rarity header, got {:?}", line))
                })?;
                self.rarity = Some(caps[1].parse()?);
                self.state = ParseState::ExpectTitle;
            }
            ParseState::ExpectTitle => {
                let rarity = self.rarity.ok_or_else(|| {
                    ParseError::MalformedBlock("title before Rarity header".to_string())
                })?;
                self.item = Some(ParsedItem::new(rarity, line.to_string()));
                self.state = ParseState::ExpectType;
            }
            ParseState::ExpectType => {
                self.state = ParseState::CollectMods;
                if known_field(line).is_some() {
                    self.collect(line);
                } else if let Some(item) = self.item.as_mut() {
                    item.base_type = Some(line.to_string());
                }
            }
            ParseState::CollectMods => self.collect(line),
            ParseState::Done => {
                return Err(ParseError::MalformedBlock(
                    "line after end of block".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn collect(&mut self, line: &str) {
        let Some(item) = self.item.as_mut() else {
            return;
        };
        let extracted = known_field(line)
            .and_then(|f| f.pattern.captures(line).map(|caps| (f.field, caps)))
            .map_or(false, |(field, caps)| apply_field(item, field, &caps[1]));
        if !extracted {
            item.mods.push(line.to_string());
        }
    }

    /// Enter `Done`; a block that stops before its title is malformed
    fn end_of_input(&mut self) -> Result<(), ParseError> {
        match self.state {
            ParseState::ExpectRarity => Err(ParseError::MalformedBlock(
                "missing Rarity header".to_string(),
            )),
            ParseState::ExpectTitle => Err(ParseError::MalformedBlock(
                "block ends before title".to_string(),
            )),
            _ => {
                self.state = ParseState::Done;
                Ok(())
            }
        }
    }

    fn finish(self) -> Result<ParsedItem, ParseError> {
        if self.state != ParseState::Done {
            return Err(ParseError::MalformedBlock(
                "block not terminated".to_string(),
            ));
        }
        self.item
            .ok_or_else(|| ParseError::MalformedBlock("no item read".to_string()))
    }
}

/// Store a captured field value; false when the value does not parse and
/// the line should be kept as a mod instead.
fn apply_field(item: &mut ParsedItem, field: Field, value: &str) -> bool {
    let value = value.trim();
    match field {
        Field::Variant => item.variants.push(value.to_string()),
        Field::SelectedVariant => match value.parse() {
            Ok(n) => item.selected_variant = Some(n),
            Err(_) => return false,
        },
        Field::League => item.league = Some(value.to_string()),
        Field::Source => item.source = Some(value.to_string()),
        Field::Quality => match value.parse() {
            Ok(q) => item.quality = Some(q),
            Err(_) => return false,
        },
        Field::Requires => match parse_requirements(value) {
            Some(pairs) => item.requirements.extend(pairs),
            None => return false,
        },
        Field::LevelReq => match value.parse() {
            Ok(level) => {
                item.requirements.insert("Level".to_string(), level);
            }
            Err(_) => return false,
        },
        Field::Sockets => item.sockets = Some(value.to_string()),
        Field::Implicits => match value.parse() {
            Ok(n) => item.implicit_count = Some(n),
            Err(_) => return false,
        },
        Field::Implicit => {
            item.implicit = Some(match item.implicit.take() {
                Some(existing) => format!("{}\n{}", existing, value),
                None => value.to_string(),
            });
        }
        Field::LimitedTo => match value.parse() {
            Ok(n) => item.limited_to = Some(n),
            Err(_) => return false,
        },
        Field::Radius => item.radius = Some(value.to_string()),
    }
    true
}
