//! # Marker Style
//!
//! The graphical attributes a region statement carries: color, dash pattern,
//! font, property flags, point/line/ruler/compass settings. One [`Style`]
//! lives in the global scope, one in the local (per-shape) scope; a parsed
//! [`StyleProperty`] is applied to one or both.

use crate::coords::{CoordSystem, SkyFormat, SkyFrame};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::ops::BitOr;

// --- Property Flags ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Properties(u16);

const PROPERTY_NAMES: [(Properties, &str); 10] = [
    (Properties::SELECT, "select"),
    (Properties::HIGHLITE, "highlite"),
    (Properties::DASH, "dash"),
    (Properties::FIXED, "fixed"),
    (Properties::EDIT, "edit"),
    (Properties::MOVE, "move"),
    (Properties::ROTATE, "rotate"),
    (Properties::DELETE, "delete"),
    (Properties::INCLUDE, "include"),
    (Properties::SOURCE, "source"),
];

impl Properties {
    pub const SELECT: Properties = Properties(1 << 0);
    pub const HIGHLITE: Properties = Properties(1 << 1);
    pub const DASH: Properties = Properties(1 << 2);
    pub const FIXED: Properties = Properties(1 << 3);
    pub const EDIT: Properties = Properties(1 << 4);
    pub const MOVE: Properties = Properties(1 << 5);
    pub const ROTATE: Properties = Properties(1 << 6);
    pub const DELETE: Properties = Properties(1 << 7);
    pub const INCLUDE: Properties = Properties(1 << 8);
    pub const SOURCE: Properties = Properties(1 << 9);

    /// Everything but DASH and FIXED.
    pub const DEFAULT: Properties = Properties(
        Self::SELECT.0 | Self::EDIT.0 | Self::MOVE.0 | Self::ROTATE.0 | Self::DELETE.0
            | Self::HIGHLITE.0 | Self::INCLUDE.0 | Self::SOURCE.0,
    );

    pub const fn empty() -> Self {
        Properties(0)
    }

    pub fn contains(self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, flags: Properties, on: bool) {
        if on {
            self.0 |= flags.0;
        } else {
            self.0 &= !flags.0;
        }
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        PROPERTY_NAMES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }
}

impl BitOr for Properties {
    type Output = Properties;

    fn bitor(self, rhs: Properties) -> Properties {
        Properties(self.0 | rhs.0)
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self.names().collect();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

// --- Point, Ruler and Compass Settings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointShape {
    Circle,
    Box,
    Diamond,
    Cross,
    X,
    Arrow,
    BoxCircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RulerStyle {
    pub system: CoordSystem,
    pub sky: SkyFrame,
    pub dist_system: CoordSystem,
    pub dist_format: SkyFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CompassStyle {
    pub system: CoordSystem,
    pub sky: SkyFrame,
    pub north: String,
    pub east: String,
    pub north_arrow: bool,
    pub east_arrow: bool,
}

// --- String Limits ---

/// Longest accepted color, font, text and comment strings, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLimits {
    pub color: usize,
    pub font: usize,
    pub text: usize,
    pub comment: usize,
}

impl StringLimits {
    pub const UNBOUNDED: StringLimits =
        StringLimits { color: usize::MAX, font: usize::MAX, text: usize::MAX, comment: usize::MAX };

    /// The fixed buffers of the DS9 marker records (16/32/80/80 including the terminator).
    pub const DS9: StringLimits = StringLimits { color: 15, font: 31, text: 79, comment: 79 };
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary.
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// --- Style State ---

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: String,
    pub dash: [i32; 2],
    pub width: i32,
    pub font: String,
    pub text: String,
    pub comment: String,
    pub props: Properties,
    pub point: PointShape,
    pub point_size: i32,
    pub line_arrows: [bool; 2],
    pub vector_arrow: bool,
    pub composite_global: bool,
    pub ruler: RulerStyle,
    pub compass: CompassStyle,
    pub text_angle: f64,
    pub text_rotate: bool,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            color: "green".to_string(),
            dash: [8, 3],
            width: 1,
            font: "helvetica 10 normal roman".to_string(),
            text: String::new(),
            comment: String::new(),
            props: Properties::DEFAULT,
            point: PointShape::BoxCircle,
            point_size: 11,
            line_arrows: [false, false],
            vector_arrow: true,
            composite_global: true,
            ruler: RulerStyle {
                system: CoordSystem::Physical,
                sky: SkyFrame::Fk5,
                dist_system: CoordSystem::Physical,
                dist_format: SkyFormat::Degrees,
            },
            compass: CompassStyle {
                system: CoordSystem::Physical,
                sky: SkyFrame::Fk5,
                north: "N".to_string(),
                east: "E".to_string(),
                north_arrow: true,
                east_arrow: true,
            },
            text_angle: 0.0,
            text_rotate: true,
        }
    }
}

/// One `key=value` clause of a `global` line or a shape comment.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleProperty {
    Flag(Properties, bool),
    Color(String),
    DashList(i32, i32),
    Width(i32),
    Font(String),
    Text(String),
    Point(PointShape, Option<i32>),
    Line(bool, bool),
    Vector(bool),
    Composite(bool),
    Ruler(RulerStyle),
    Compass(CompassStyle),
    TextAngle(f64),
    TextRotate(bool),
}

impl Style {
    pub fn apply(&mut self, prop: &StyleProperty, limits: StringLimits) {
        match prop {
            StyleProperty::Flag(flags, on) => self.props.set(*flags, *on),
            StyleProperty::Color(c) => self.color = truncate(c, limits.color).to_string(),
            StyleProperty::DashList(a, b) => self.dash = [*a, *b],
            StyleProperty::Width(w) => self.width = *w,
            StyleProperty::Font(f) => self.font = truncate(f, limits.font).to_string(),
            StyleProperty::Text(t) => self.text = truncate(t, limits.text).to_string(),
            StyleProperty::Point(shape, size) => {
                self.point = *shape;
                if let Some(size) = size {
                    self.point_size = *size;
                }
            }
            StyleProperty::Line(start, end) => self.line_arrows = [*start, *end],
            StyleProperty::Vector(arrow) => self.vector_arrow = *arrow,
            StyleProperty::Composite(global) => self.composite_global = *global,
            StyleProperty::Ruler(ruler) => self.ruler = *ruler,
            StyleProperty::Compass(compass) => self.compass = compass.clone(),
            StyleProperty::TextAngle(a) => self.text_angle = *a,
            StyleProperty::TextRotate(r) => self.text_rotate = *r,
        }
    }

    pub fn set_comment(&mut self, comment: &str, limits: StringLimits) {
        self.comment = truncate(comment, limits.comment).to_string();
    }
}
