//! Coerced values.
//!
//! A [`Value`] is what a command action receives once the registry has
//! converted its raw text tokens. The `Display` form of every variant is the
//! natural text rendering used by [`TypeRegistry::render`](super::TypeRegistry::render)
//! when a coder has no custom encoder.

use std::fmt;

use serde::Serialize;

/// Unit attached to a [`Value::Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimensionUnit {
    /// Fraction of the enclosing frame; written without a suffix.
    Frame,
    Point,
    BigPoint,
    Millimeter,
    Centimeter,
    Inch,
    /// Multiple of the current text height.
    TextHeight,
}

impl DimensionUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            DimensionUnit::Frame => "",
            DimensionUnit::Point => "pt",
            DimensionUnit::BigPoint => "bp",
            DimensionUnit::Millimeter => "mm",
            DimensionUnit::Centimeter => "cm",
            DimensionUnit::Inch => "in",
            DimensionUnit::TextHeight => "dy",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(DimensionUnit::Frame),
            "pt" => Some(DimensionUnit::Point),
            "bp" => Some(DimensionUnit::BigPoint),
            "mm" => Some(DimensionUnit::Millimeter),
            "cm" => Some(DimensionUnit::Centimeter),
            "in" => Some(DimensionUnit::Inch),
            "dy" => Some(DimensionUnit::TextHeight),
            _ => None,
        }
    }
}

/// The tagged union of everything a type coder can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Both bounds are present for full ranges; partial ranges use `None`.
    Range {
        low: Option<f64>,
        high: Option<f64>,
    },
    /// A member of an enumerated type, stored in its canonical spelling.
    Symbol(String),
    /// RGB components in `0.0..=1.0`.
    Color {
        r: f64,
        g: f64,
        b: f64,
    },
    Dimension {
        value: f64,
        unit: DimensionUnit,
    },
    Point {
        x: f64,
        y: f64,
    },
    AlignedPoint {
        x: f64,
        y: f64,
        halign: String,
        valign: String,
    },
    Box {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Margins {
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    },
    Bijection {
        forward: String,
        backward: Option<String>,
    },
}

impl Value {
    /// Short name of the variant, used in type mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Range { .. } => "range",
            Value::Symbol(_) => "symbol",
            Value::Color { .. } => "color",
            Value::Dimension { .. } => "dimension",
            Value::Point { .. } => "point",
            Value::AlignedPoint { .. } => "aligned-point",
            Value::Box { .. } => "box",
            Value::Margins { .. } => "margins",
            Value::Bijection { .. } => "bijection",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrowed text for `Text` and `Symbol` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: Option<f64>) -> fmt::Result {
    match bound {
        Some(v) => write!(f, "{v}"),
        None => Ok(()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) | Value::Symbol(s) => write!(f, "{s}"),
            Value::Range { low, high } => {
                write_bound(f, *low)?;
                write!(f, ":")?;
                write_bound(f, *high)
            }
            Value::Color { r, g, b } => write!(f, "{r},{g},{b}"),
            Value::Dimension { value, unit } => write!(f, "{value}{}", unit.suffix()),
            Value::Point { x, y } => write!(f, "{x},{y}"),
            Value::AlignedPoint {
                x,
                y,
                halign,
                valign,
            } => {
                let v = valign.chars().next().unwrap_or('c');
                let h = halign.chars().next().unwrap_or('c');
                write!(f, "{v}{h}:{x},{y}")
            }
            Value::Box { x1, y1, x2, y2 } => write!(f, "{x1},{y1},{x2},{y2}"),
            Value::Margins {
                left,
                right,
                top,
                bottom,
            } => write!(f, "{left},{right},{top},{bottom}"),
            Value::Bijection { forward, backward } => match backward {
                Some(back) => write!(f, "{forward}::{back}"),
                None => write!(f, "{forward}"),
            },
        }
    }
}
