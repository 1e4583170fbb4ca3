//! Reference data for game data normalization
//!
//! Hardcoded tables for attributes, socket colors, the equipment categories
//! accepted into the canonical item table, and known data-quality fixes in
//! the source exports. These are the defaults behind [`crate::PipelineConfig`].

// ============================================================================
// Attributes
// ============================================================================

/// Core attribute information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub short: &'static str,
    pub name: &'static str,
    pub socket_color: char,
}

/// Attributes that drive socket coloring, in canonical order
pub const ATTRIBUTES: &[AttributeInfo] = &[
    AttributeInfo {
        short: "Str",
        name: "Strength",
        socket_color: 'R',
    },
    AttributeInfo {
        short: "Dex",
        name: "Dexterity",
        socket_color: 'G',
    },
    AttributeInfo {
        short: "Int",
        name: "Intelligence",
        socket_color: 'B',
    },
];

/// Get attribute by key, accepting `str`, `Str`, `strength`, etc.
pub fn attribute_by_key(key: &str) -> Option<&'static AttributeInfo> {
    ATTRIBUTES
        .iter()
        .find(|a| a.short.eq_ignore_ascii_case(key) || a.name.eq_ignore_ascii_case(key))
}

/// Fallback palette for items with sockets but no attribute requirement
pub const DEFAULT_SOCKET_PALETTE: &str = "RGBRGB";

/// Upper bound on a socket count from `socketLimit` or an implicit
pub const MAX_SOCKETS: u32 = 64;

// ============================================================================
// Item Types
// ============================================================================

/// Equipment, flask and jewel categories kept in the canonical item table
pub const ITEM_TYPES: &[&str] = &[
    "Amulet",
    "Belt",
    "Body Armour",
    "Boots",
    "Bow",
    "Claw",
    "Dagger",
    "Flask",
    "Gloves",
    "Helmet",
    "Jewel",
    "One Handed Axe",
    "One Handed Mace",
    "One Handed Sword",
    "Quiver",
    "Ring",
    "Sceptre",
    "Shield",
    "Staff",
    "Two Handed Axe",
    "Two Handed Mace",
    "Two Handed Sword",
    "Wand",
];

// ============================================================================
// Unique Variants
// ============================================================================

/// Uniques whose exports miscount variants, with the correct count
pub const VARIANT_OVERRIDES: &[(&str, u32)] = &[
    ("Precursor's Emblem", 7),
    ("Impresence", 5),
    ("Doryani's Invitation", 4),
];

// ============================================================================
// Encoding Fixes
// ============================================================================

/// Defective renderings of `ö` seen in exported names, with the correct text.
///
/// Order matters: the two-byte mis-encoding is repaired before the ASCII
/// transliterations are matched.
pub const ENCODING_FIXES: &[(&str, &str)] = &[
    ("\u{00c3}\u{00b6}", "\u{00f6}"),
    ("Mjolner", "Mj\u{00f6}lner"),
    ("Maelstrom", "Maelstr\u{00f6}m"),
];
