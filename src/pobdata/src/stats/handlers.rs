//! Index handler definitions
//!
//! An index handler rescales one argument before it is substituted into a
//! translation template. Each handler is a linear transform plus an optional
//! display precision; handlers chain left to right, and the last declared
//! precision wins.

use serde::Deserialize;

/// Linear transform applied to an argument: `value * factor + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub factor: f64,
    pub offset: f64,
    /// Fixed number of decimals to render, if the handler declares one
    pub decimals: Option<u8>,
    /// Drop trailing zeros after rounding (`_if_required` handlers)
    pub trim: bool,
}

impl Transform {
    const fn scale(factor: f64) -> Self {
        Transform {
            factor,
            offset: 0.0,
            decimals: None,
            trim: false,
        }
    }

    const fn fixed(factor: f64, decimals: u8) -> Self {
        Transform {
            factor,
            offset: 0.0,
            decimals: Some(decimals),
            trim: false,
        }
    }

    const fn if_required(factor: f64, decimals: u8) -> Self {
        Transform {
            factor,
            offset: 0.0,
            decimals: Some(decimals),
            trim: true,
        }
    }

    const fn shift(offset: f64) -> Self {
        Transform {
            factor: 1.0,
            offset,
            decimals: None,
            trim: false,
        }
    }
}

/// Numeric handlers understood by the resolver
pub const HANDLERS: &[(&str, Transform)] = &[
    ("canonical_stat", Transform::scale(1.0)),
    ("negate", Transform::scale(-1.0)),
    ("negate_and_double", Transform::scale(-2.0)),
    ("double", Transform::scale(2.0)),
    ("times_twenty", Transform::scale(20.0)),
    ("times_one_point_five", Transform::scale(1.5)),
    ("30%_of_value", Transform::scale(0.3)),
    ("60%_of_value", Transform::scale(0.6)),
    ("divide_by_two_0dp", Transform::fixed(0.5, 0)),
    ("divide_by_three", Transform::scale(1.0 / 3.0)),
    ("divide_by_four", Transform::scale(0.25)),
    ("divide_by_five", Transform::scale(0.2)),
    ("divide_by_six", Transform::scale(1.0 / 6.0)),
    ("divide_by_ten_0dp", Transform::fixed(0.1, 0)),
    ("divide_by_ten_1dp", Transform::fixed(0.1, 1)),
    ("divide_by_ten_1dp_if_required", Transform::if_required(0.1, 1)),
    ("divide_by_twelve", Transform::scale(1.0 / 12.0)),
    ("divide_by_fifteen_0dp", Transform::fixed(1.0 / 15.0, 0)),
    ("divide_by_fifty", Transform::scale(0.02)),
    ("divide_by_one_hundred", Transform::scale(0.01)),
    ("divide_by_one_hundred_2dp", Transform::fixed(0.01, 2)),
    ("divide_by_one_hundred_2dp_if_required", Transform::if_required(0.01, 2)),
    ("divide_by_one_thousand", Transform::scale(0.001)),
    ("per_minute_to_per_second", Transform::if_required(1.0 / 60.0, 1)),
    ("per_minute_to_per_second_0dp", Transform::fixed(1.0 / 60.0, 0)),
    ("per_minute_to_per_second_1dp", Transform::fixed(1.0 / 60.0, 1)),
    ("per_minute_to_per_second_2dp", Transform::fixed(1.0 / 60.0, 2)),
    ("per_minute_to_per_second_2dp_if_required", Transform::if_required(1.0 / 60.0, 2)),
    ("milliseconds_to_seconds", Transform::scale(0.001)),
    ("milliseconds_to_seconds_0dp", Transform::fixed(0.001, 0)),
    ("milliseconds_to_seconds_1dp", Transform::fixed(0.001, 1)),
    ("milliseconds_to_seconds_2dp", Transform::fixed(0.001, 2)),
    ("milliseconds_to_seconds_2dp_if_required", Transform::if_required(0.001, 2)),
    ("deciseconds_to_seconds", Transform::scale(0.1)),
    ("old_leech_percent", Transform::scale(0.2)),
    ("old_leech_permyriad", Transform::scale(0.02)),
    ("multiplicative_damage_modifier", Transform::shift(100.0)),
    ("locations_to_metres", Transform::scale(0.1)),
];

/// Look up a handler transform by name
pub fn handler_by_name(name: &str) -> Option<Transform> {
    HANDLERS
        .iter()
        .find(|(handler, _)| *handler == name)
        .map(|(_, transform)| *transform)
}

/// A named index handler as declared in the translation table.
///
/// Names outside [`HANDLERS`] (item class lookups, passive hashes, ...) still
/// load; they only fail when a selected template actually needs them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "String")]
pub struct IndexHandler {
    name: String,
    transform: Option<Transform>,
}

impl IndexHandler {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> Option<Transform> {
        self.transform
    }
}

impl From<String> for IndexHandler {
    fn from(name: String) -> Self {
        let transform = handler_by_name(&name);
        IndexHandler { name, transform }
    }
}

impl From<&str> for IndexHandler {
    fn from(name: &str) -> Self {
        IndexHandler::from(name.to_string())
    }
}

/// An argument value after handlers ran, with its display precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled {
    pub value: f64,
    pub decimals: Option<u8>,
    pub trim: bool,
}

impl Scaled {
    pub fn raw(value: i64) -> Self {
        Scaled {
            value: value as f64,
            decimals: None,
            trim: false,
        }
    }

    pub fn apply(self, transform: Transform) -> Self {
        Scaled {
            value: self.value * transform.factor + transform.offset,
            decimals: transform.decimals.or(self.decimals),
            trim: if transform.decimals.is_some() {
                transform.trim
            } else {
                self.trim
            },
        }
    }

    /// Render the number; integers print bare, other values with at most
    /// two decimals unless a handler fixed the precision.
    pub fn render(&self, signed: bool) -> String {
        let decimals = match self.decimals {
            Some(d) => d,
            None if self.value.fract() == 0.0 => 0,
            None => 2,
        };
        let trim = self.decimals.is_none() || self.trim;

        let scale = 10f64.powi(i32::from(decimals));
        let mut rounded = (self.value * scale).round() / scale;
        if rounded == 0.0 {
            // normalizes -0.0
            rounded = 0.0;
        }

        let mut text = format!("{:.*}", usize::from(decimals), rounded);
        if trim && text.contains('.') {
            text = text.trim_end_matches('0').trim_end_matches('.').to_string();
        }
        if signed && rounded >= 0.0 {
            text.insert(0, '+');
        }
        text
    }
}
