use crate::error::{Result, invalid};
use crate::types::{Color, Length};
use std::str::FromStr;

/// Working unit of a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Pt,
    Px,
    Mm,
    Cm,
    In,
}

impl Unit {
    /// Points per unit (the surface scale factor).
    pub fn points_per_unit(self) -> f32 {
        match self {
            Unit::Pt | Unit::Px => 1.0,
            Unit::Mm => 72.0 / 25.4,
            Unit::Cm => 72.0 / 2.54,
            Unit::In => 72.0,
        }
    }

    /// Converts a length in this unit to pixels at `dpi`. Points and pixels
    /// are passed through unchanged.
    pub fn to_pixels(self, value: f32, dpi: f32) -> f32 {
        let inches = match self {
            Unit::Pt | Unit::Px => return value,
            Unit::Mm => value / 25.4,
            Unit::Cm => value / 2.54,
            Unit::In => value,
        };
        inches * dpi
    }
}

impl FromStr for Unit {
    type Err = crate::error::TableError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pt" => Ok(Unit::Pt),
            "px" => Ok(Unit::Px),
            "mm" => Ok(Unit::Mm),
            "cm" => Ok(Unit::Cm),
            "in" => Ok(Unit::In),
            other => Err(invalid(format!("invalid unit \"{other}\""))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl FromStr for TextAlign {
    type Err = crate::error::TableError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(TextAlign::Left),
            "c" | "center" => Ok(TextAlign::Center),
            "r" | "right" => Ok(TextAlign::Right),
            "j" | "justify" => Ok(TextAlign::Justify),
            _ => Err(invalid(format!("the alignment \"{raw}\" is not supported"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl FromStr for VerticalAlign {
    type Err = crate::error::TableError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "t" | "top" => Ok(VerticalAlign::Top),
            "m" | "middle" => Ok(VerticalAlign::Middle),
            "b" | "bottom" => Ok(VerticalAlign::Bottom),
            _ => Err(invalid(format!(
                "the vertical alignment \"{raw}\" is not supported"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FromStr for FontWeight {
    type Err = crate::error::TableError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "normal" => Ok(FontWeight::Normal),
            "bold" => Ok(FontWeight::Bold),
            _ => Err(invalid(format!("the font weight \"{raw}\" is not supported"))),
        }
    }
}

/// Font selection as seen by the drawing surface. Sizes are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_pt: f32,
    pub weight: FontWeight,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_pt: f32, weight: FontWeight) -> Self {
        Self {
            family: family.into(),
            size_pt,
            weight,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("helvetica", 10.0, FontWeight::Normal)
    }
}

/// Which sides of a cell get a border stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Border(u8);

impl Border {
    pub const NONE: Border = Border(0);
    pub const TOP: Border = Border(0b0001);
    pub const RIGHT: Border = Border(0b0010);
    pub const BOTTOM: Border = Border(0b0100);
    pub const LEFT: Border = Border(0b1000);
    pub const FRAME: Border = Border(0b1111);

    pub fn contains(self, side: Border) -> bool {
        side.0 != 0 && self.0 & side.0 == side.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Border {
    type Output = Border;
    fn bitor(self, rhs: Border) -> Border {
        Border(self.0 | rhs.0)
    }
}

impl FromStr for Border {
    type Err = crate::error::TableError;

    /// Accepts `0` (none), `1` (frame), or any combination of `L`, `T`,
    /// `R`, `B` in any order.
    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw {
            "" | "0" => return Ok(Border::NONE),
            "1" => return Ok(Border::FRAME),
            _ => {}
        }
        let mut border = Border::NONE;
        for ch in raw.chars() {
            border = border
                | match ch.to_ascii_uppercase() {
                    'T' => Border::TOP,
                    'R' => Border::RIGHT,
                    'B' => Border::BOTTOM,
                    'L' => Border::LEFT,
                    _ => return Err(invalid(format!("the border \"{raw}\" is not supported"))),
                };
        }
        Ok(border)
    }
}

/// Per-side cell padding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Padding {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn all(value: Length) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// CSS shorthand expansion: one value for all sides, two for
    /// vertical/horizontal, three for top/horizontal/bottom, four clockwise
    /// from the top.
    pub fn from_shorthand(values: &[f32]) -> Result<Self> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(invalid(format!("padding must be a non-negative number (got {bad})")));
        }
        let v: Vec<Length> = values.iter().map(|v| Length::from_f32(*v)).collect();
        let (top, right, bottom, left) = match v.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => {
                return Err(invalid(format!(
                    "padding takes one to four values (got {})",
                    values.len()
                )));
            }
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }

    pub fn horizontal(&self) -> Length {
        self.left + self.right
    }

    pub fn vertical(&self) -> Length {
        self.top + self.bottom
    }
}

/// Normalizes a color given as CSS hex text. Empty input and `transparent`
/// mean no color; `#abc` expands to `#aabbcc`.
pub fn parse_color(raw: &str) -> Result<Option<Color>> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("transparent") {
        return Ok(None);
    }
    let hex = s.strip_prefix('#').unwrap_or(s);
    let hex = match hex.len() {
        3 => {
            let mut out = String::with_capacity(6);
            for ch in hex.chars() {
                out.push(ch);
                out.push(ch);
            }
            out
        }
        6 => hex.to_string(),
        _ => return Err(invalid(format!("invalid color \"{raw}\""))),
    };
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|part| u8::from_str_radix(part, 16).ok())
            .ok_or_else(|| invalid(format!("invalid color \"{raw}\"")))
    };
    Ok(Some(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)))
}
