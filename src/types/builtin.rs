//! Built-in type families.
//!
//! The scalar families (boolean, numbers, text, ranges, enumerations) are what
//! the parsers themselves depend on; the geometry families (color, dimension,
//! point, aligned point, box, margins, bijection) are small mini-grammars the
//! plotting commands use. Each is an independent [`TypeCoder`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DecodeResult, DimensionUnit, TypeCoder, TypeRegistry, TypeSpec, Value};
use crate::PlotlineError;

pub const BOOLEAN: &str = "boolean";
pub const INTEGER: &str = "integer";
pub const FLOAT: &str = "float";
pub const TEXT: &str = "text";
pub const RANGE: &str = "range";
pub const PARTIAL_RANGE: &str = "partial-range";
pub const ALIGNMENT: &str = "alignment";
pub const VALIGNMENT: &str = "valignment";
pub const LINE_STYLE: &str = "line-style";
pub const MARKER: &str = "marker";
pub const COLOR: &str = "color";
pub const DIMENSION: &str = "dimension";
pub const POINT: &str = "point";
pub const ALIGNED_POINT: &str = "aligned-point";
pub const BOX: &str = "box";
pub const MARGINS: &str = "margins";
pub const BIJECTION: &str = "bijection";

static TRUTHY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(true|yes|on)$").expect("valid regex literal"));

static DIMENSION_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*([a-z]*)\s*$")
        .expect("valid regex literal")
});

static ALIGNED_POINT_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:([tcb])([lcr])\s*:)?\s*(.+)$").expect("valid regex literal")
});

// ============================================================================
// SHARED PARSING HELPERS
// ============================================================================

fn parse_number(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("'{trimmed}' is not a number")),
    }
}

/// Parses exactly `count` comma-separated numbers.
fn parse_numbers(text: &str, count: usize) -> Result<Vec<f64>, String> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != count {
        return Err(format!(
            "expected {count} comma-separated numbers, found {}",
            parts.len()
        ));
    }
    parts.into_iter().map(parse_number).collect()
}

/// Splits on the first colon that is not preceded by a backslash, unescaping
/// `\:` on both sides.
pub fn split_unescaped_colon(text: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (pos, ch) in text.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ':' if !escaped => {
                let unescape = |s: &str| s.replace("\\:", ":");
                return Some((unescape(&text[..pos]), unescape(&text[pos + 1..])));
            }
            _ => escaped = false,
        }
    }
    None
}

// ============================================================================
// SCALAR CODERS
// ============================================================================

/// `true|yes|on` (any case) is true, everything else is false.
pub struct BoolCoder;

impl TypeCoder for BoolCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        Ok(Value::Bool(TRUTHY.is_match(text.trim())))
    }

    fn encode(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => "true".to_string(),
            _ => "false".to_string(),
        }
    }
}

pub struct IntegerCoder;

impl TypeCoder for IntegerCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        text.trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| "not an integer".to_string())
    }
}

pub struct FloatCoder;

impl TypeCoder for FloatCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        parse_number(text).map(Value::Float)
    }
}

pub struct TextCoder;

impl TypeCoder for TextCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        Ok(Value::Text(text.to_string()))
    }
}

/// `low:high`. With `partial` set, either side may be empty and is stored as
/// an absent bound.
pub struct RangeCoder {
    pub partial: bool,
}

impl RangeCoder {
    fn bound(&self, side: &str) -> Result<Option<f64>, String> {
        if side.trim().is_empty() {
            if self.partial {
                return Ok(None);
            }
            return Err("both bounds are required".to_string());
        }
        parse_number(side).map(Some)
    }
}

impl TypeCoder for RangeCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let (low, high) =
            split_unescaped_colon(text).ok_or_else(|| "expected 'low:high'".to_string())?;
        Ok(Value::Range {
            low: self.bound(&low)?,
            high: self.bound(&high)?,
        })
    }
}

/// One of a fixed set of symbols.
pub struct EnumCoder {
    choices: Vec<String>,
    case_sensitive: bool,
}

impl EnumCoder {
    pub fn new<I, S>(choices: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            case_sensitive,
        }
    }
}

impl TypeCoder for EnumCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let text = text.trim();
        self.choices
            .iter()
            .find(|choice| {
                if self.case_sensitive {
                    choice.as_str() == text
                } else {
                    choice.eq_ignore_ascii_case(text)
                }
            })
            .map(|choice| Value::Symbol(choice.clone()))
            .ok_or_else(|| format!("expected one of: {}", self.choices.join(", ")))
    }
}

// ============================================================================
// GEOMETRY CODERS
// ============================================================================

/// `#RRGGBB`, `#RGB` or `r,g,b` with components in `0..=1`. Named colors are
/// handled by the type's namespace table before this coder runs.
pub struct ColorCoder;

impl ColorCoder {
    fn hex(digits: &str) -> Result<Value, String> {
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("'{digits}' is not hexadecimal"));
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err("hex colors need 3 or 6 digits".to_string()),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map(|c| f64::from(c) / 255.0)
                .map_err(|_| format!("'{digits}' is not hexadecimal"))
        };
        Ok(Value::Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl TypeCoder for ColorCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let text = text.trim();
        if let Some(digits) = text.strip_prefix('#') {
            return Self::hex(digits);
        }
        let rgb = parse_numbers(text, 3)?;
        if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err("color components must lie between 0 and 1".to_string());
        }
        Ok(Value::Color {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        })
    }
}

/// A number with an optional unit suffix (`pt`, `bp`, `mm`, `cm`, `in`, `dy`).
pub struct DimensionCoder;

impl TypeCoder for DimensionCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let caps = DIMENSION_TEXT
            .captures(text)
            .ok_or_else(|| "expected a number with an optional unit".to_string())?;
        let value = parse_number(&caps[1])?;
        let unit = DimensionUnit::from_suffix(&caps[2])
            .ok_or_else(|| format!("unknown unit '{}'", &caps[2]))?;
        Ok(Value::Dimension { value, unit })
    }
}

/// `x,y`.
pub struct PointCoder;

impl TypeCoder for PointCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let xy = parse_numbers(text, 2)?;
        Ok(Value::Point { x: xy[0], y: xy[1] })
    }
}

/// A point with an optional `VH:` alignment prefix, e.g. `tl:0.1,0.9`.
/// Without a prefix the point is centered both ways.
pub struct AlignedPointCoder;

impl AlignedPointCoder {
    fn valign(letter: &str) -> &'static str {
        match letter {
            "t" => "top",
            "b" => "bottom",
            _ => "center",
        }
    }

    fn halign(letter: &str) -> &'static str {
        match letter {
            "l" => "left",
            "r" => "right",
            _ => "center",
        }
    }
}

impl TypeCoder for AlignedPointCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let caps = ALIGNED_POINT_TEXT
            .captures(text)
            .ok_or_else(|| "expected '[VH:]x,y'".to_string())?;
        let v = caps.get(1).map_or("c", |m| m.as_str());
        let h = caps.get(2).map_or("c", |m| m.as_str());
        let xy = parse_numbers(&caps[3], 2)?;
        Ok(Value::AlignedPoint {
            x: xy[0],
            y: xy[1],
            halign: Self::halign(h).to_string(),
            valign: Self::valign(v).to_string(),
        })
    }
}

/// `x1,y1,x2,y2` or `x1,y1:x2,y2`.
pub struct BoxCoder;

impl TypeCoder for BoxCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let c = parse_numbers(&text.replacen(':', ",", 1), 4)?;
        Ok(Value::Box {
            x1: c[0],
            y1: c[1],
            x2: c[2],
            y2: c[3],
        })
    }
}

/// One value (all sides), two (horizontal, vertical) or four
/// (left, right, top, bottom).
pub struct MarginsCoder;

impl TypeCoder for MarginsCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let values: Vec<f64> = text
            .split(',')
            .map(parse_number)
            .collect::<Result<_, _>>()?;
        let (left, right, top, bottom) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [h, v] => (*h, *h, *v, *v),
            [l, r, t, b] => (*l, *r, *t, *b),
            _ => return Err("expected 1, 2 or 4 comma-separated numbers".to_string()),
        };
        Ok(Value::Margins {
            left,
            right,
            top,
            bottom,
        })
    }
}

/// `forward` or `forward::backward` expression texts.
pub struct BijectionCoder;

impl TypeCoder for BijectionCoder {
    fn decode(&self, text: &str) -> DecodeResult {
        let (forward, backward) = match text.split_once("::") {
            Some((f, b)) => (f.trim(), Some(b.trim())),
            None => (text.trim(), None),
        };
        if forward.is_empty() || backward.is_some_and(str::is_empty) {
            return Err("empty expression".to_string());
        }
        Ok(Value::Bijection {
            forward: forward.to_string(),
            backward: backward.map(str::to_string),
        })
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

fn symbol(name: &str) -> Value {
    Value::Symbol(name.to_string())
}

fn rgb(r: u8, g: u8, b: u8) -> Value {
    Value::Color {
        r: f64::from(r) / 255.0,
        g: f64::from(g) / 255.0,
        b: f64::from(b) / 255.0,
    }
}

fn named_colors() -> Vec<(&'static str, Value)> {
    vec![
        ("black", rgb(0, 0, 0)),
        ("white", rgb(255, 255, 255)),
        ("red", rgb(255, 0, 0)),
        ("green", rgb(0, 128, 0)),
        ("blue", rgb(0, 0, 255)),
        ("yellow", rgb(255, 255, 0)),
        ("cyan", rgb(0, 255, 255)),
        ("magenta", rgb(255, 0, 255)),
        ("orange", rgb(255, 165, 0)),
        ("purple", rgb(128, 0, 128)),
        ("brown", rgb(165, 42, 42)),
        ("pink", rgb(255, 192, 203)),
        ("gray", rgb(128, 128, 128)),
        ("grey", rgb(128, 128, 128)),
        ("navy", rgb(0, 0, 128)),
        ("darkgreen", rgb(0, 100, 0)),
    ]
}

/// Registers every built-in type family into `registry`.
///
/// # Errors
/// Fails if any tag is already present in `registry`.
pub fn register_builtin_types(registry: &mut TypeRegistry) -> Result<(), PlotlineError> {
    registry.register(
        TypeSpec::new(BOOLEAN, BoolCoder)
            .display_name("Boolean")
            .description("true, yes or on (any case); anything else is false")
            .default_value(Value::Bool(false)),
    )?;
    registry.register(
        TypeSpec::new(INTEGER, IntegerCoder)
            .display_name("Integer")
            .description("a whole number"),
    )?;
    registry.register(
        TypeSpec::new(FLOAT, FloatCoder)
            .display_name("Number")
            .description("a floating-point number"),
    )?;
    registry.register(
        TypeSpec::new(TEXT, TextCoder)
            .display_name("Text")
            .description("arbitrary text, taken as-is")
            .passthrough(|_| true),
    )?;
    registry.register(
        TypeSpec::new(RANGE, RangeCoder { partial: false })
            .display_name("Range")
            .description("low:high"),
    )?;
    registry.register(
        TypeSpec::new(PARTIAL_RANGE, RangeCoder { partial: true })
            .display_name("Partial range")
            .description("low:high where either side may be left empty; 'auto' leaves both open")
            .pattern(
                r"^(?i)\s*(auto)?\s*$",
                Value::Range {
                    low: None,
                    high: None,
                },
            )?,
    )?;
    registry.register(
        TypeSpec::new(ALIGNMENT, EnumCoder::new(["left", "center", "right"], false))
            .display_name("Horizontal alignment")
            .description("left, center or right (l, c, r)")
            .shortcut("l", symbol("left"))
            .shortcut("c", symbol("center"))
            .shortcut("r", symbol("right")),
    )?;
    registry.register(
        TypeSpec::new(VALIGNMENT, EnumCoder::new(["top", "center", "bottom"], false))
            .display_name("Vertical alignment")
            .description("top, center or bottom (t, c, b)")
            .shortcut("t", symbol("top"))
            .shortcut("c", symbol("center"))
            .shortcut("b", symbol("bottom")),
    )?;
    registry.register(
        TypeSpec::new(
            LINE_STYLE,
            EnumCoder::new(["solid", "dashes", "dots", "dash-dot", "none"], false),
        )
        .display_name("Line style")
        .description("solid, dashes, dots, dash-dot or none; also -, --, : and -.")
        .shortcut("-", symbol("solid"))
        .shortcut("--", symbol("dashes"))
        .shortcut(":", symbol("dots"))
        .shortcut("-.", symbol("dash-dot")),
    )?;
    registry.register(
        TypeSpec::new(
            MARKER,
            EnumCoder::new(["circle", "square", "triangle", "cross", "plus", "none"], false),
        )
        .display_name("Marker")
        .description("circle, square, triangle, cross, plus or none")
        .pattern(r"^(?i)(no|off)$", symbol("none"))?,
    )?;
    registry.register(
        TypeSpec::new(COLOR, ColorCoder)
            .display_name("Color")
            .description("a color name, #RRGGBB, or r,g,b with components between 0 and 1")
            .namespace(named_colors()),
    )?;
    registry.register(
        TypeSpec::new(DIMENSION, DimensionCoder)
            .display_name("Dimension")
            .description("a number with an optional unit: pt, bp, mm, cm, in or dy"),
    )?;
    registry.register(
        TypeSpec::new(POINT, PointCoder)
            .display_name("Point")
            .description("x,y"),
    )?;
    registry.register(
        TypeSpec::new(ALIGNED_POINT, AlignedPointCoder)
            .display_name("Aligned point")
            .description("[VH:]x,y where V is t, c or b and H is l, c or r"),
    )?;
    registry.register(
        TypeSpec::new(BOX, BoxCoder)
            .display_name("Box")
            .description("x1,y1,x2,y2 or x1,y1:x2,y2"),
    )?;
    registry.register(
        TypeSpec::new(MARGINS, MarginsCoder)
            .display_name("Margins")
            .description("all, or horizontal,vertical, or left,right,top,bottom"),
    )?;
    registry.register(
        TypeSpec::new(BIJECTION, BijectionCoder)
            .display_name("Bijection")
            .description("forward or forward::backward expressions of x")
            .shortcut(
                "identity",
                Value::Bijection {
                    forward: "x".to_string(),
                    backward: Some("x".to_string()),
                },
            ),
    )?;
    Ok(())
}
