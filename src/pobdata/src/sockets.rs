//! Initial socket layout derivation
//!
//! Sockets take the color of the item's attribute requirements in
//! round-robin order. Items without a socket limit can still grant sockets
//! unconditionally through an implicit ("Has 6 Sockets"); those are white
//! and accept any gem.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::reference::{attribute_by_key, DEFAULT_SOCKET_PALETTE, MAX_SOCKETS};

static IMPLICIT_SOCKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Has (\d+) Sockets?").unwrap());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SocketError {
    #[error("Socket count {count} exceeds the maximum of {max}")]
    TooManySockets { count: u64, max: u32 },

    #[error("Unreadable socket count in {0:?}")]
    InvalidCount(String),
}

/// Socket color token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketColor {
    Red,
    Green,
    Blue,
    White,
}

impl SocketColor {
    /// Convert a palette character to a color
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(SocketColor::Red),
            'G' => Some(SocketColor::Green),
            'B' => Some(SocketColor::Blue),
            'W' => Some(SocketColor::White),
            _ => None,
        }
    }

    /// Single-character token used in canonical data
    pub fn as_char(self) -> char {
        match self {
            SocketColor::Red => 'R',
            SocketColor::Green => 'G',
            SocketColor::Blue => 'B',
            SocketColor::White => 'W',
        }
    }
}

/// Ordered socket colors, rendered as `R-G-B`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sockets(pub Vec<SocketColor>);

impl Sockets {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[SocketColor] {
        &self.0
    }
}

impl fmt::Display for Sockets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, color) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", color.as_char())?;
        }
        Ok(())
    }
}

impl Serialize for Sockets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of socket derivation for one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketLayout {
    pub max_num_sockets: u32,
    pub initial_sockets: Sockets,
}

/// Derive an item's socket count and initial colors.
///
/// With `socket_count == 0` the implicit text decides: `Has <N> Socket(s)`
/// grants N white sockets, anything else means no sockets at all.
///
/// With sockets, the attributes in `requirements` with a positive value are
/// taken in map order and cycled over the sockets. Items without any such
/// requirement use the `RGBRGB` palette, truncated to its own length when
/// the socket count is larger.
///
/// Counts above [`MAX_SOCKETS`], from either source, are rejected.
pub fn derive_socket_layout(
    requirements: &IndexMap<String, i64>,
    socket_count: u32,
    implicit: Option<&str>,
) -> Result<SocketLayout, SocketError> {
    if socket_count == 0 {
        let Some(count) = implicit.map(implicit_socket_count).transpose()?.flatten() else {
            return Ok(SocketLayout::default());
        };
        return Ok(SocketLayout {
            max_num_sockets: count,
            initial_sockets: Sockets(vec![SocketColor::White; count as usize]),
        });
    }
    check_count(u64::from(socket_count))?;

    let attribute_colors: Vec<SocketColor> = requirements
        .iter()
        .filter(|(_, value)| **value > 0)
        .filter_map(|(key, _)| attribute_by_key(key))
        .filter_map(|attr| SocketColor::from_char(attr.socket_color))
        .collect();

    let colors = if attribute_colors.is_empty() {
        DEFAULT_SOCKET_PALETTE
            .chars()
            .take(socket_count as usize)
            .filter_map(SocketColor::from_char)
            .collect()
    } else {
        (0..socket_count as usize)
            .map(|i| attribute_colors[i % attribute_colors.len()])
            .collect()
    };

    Ok(SocketLayout {
        max_num_sockets: socket_count,
        initial_sockets: Sockets(colors),
    })
}

fn check_count(count: u64) -> Result<u32, SocketError> {
    u32::try_from(count)
        .ok()
        .filter(|n| *n <= MAX_SOCKETS)
        .ok_or(SocketError::TooManySockets {
            count,
            max: MAX_SOCKETS,
        })
}

/// Parse the socket count out of an implicit like "Has 6 Sockets".
///
/// `Ok(None)` when the implicit grants no sockets.
pub fn implicit_socket_count(implicit: &str) -> Result<Option<u32>, SocketError> {
    let Some(caps) = IMPLICIT_SOCKETS.captures(implicit) else {
        return Ok(None);
    };
    let count: u64 = caps[1]
        .parse()
        .map_err(|_| SocketError::InvalidCount(implicit.to_string()))?;
    check_count(count).map(Some)
}
