//! # Region Lexer
//!
//! Splits DS9 region text into tokens. Keywords are case-insensitive, numbers
//! carry their unit suffix in the token kind, and sexagesimal spellings keep
//! their source text for the parser to evaluate.

use crate::semantic_parsers::{literal, Literal, NumericUnit};
use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::char as nom_char,
    error::VerboseError,
    sequence::delimited,
    IResult,
};
use std::fmt;

/// Strings longer than this are rejected unless configured otherwise.
pub const DEFAULT_MAX_STRING_LEN: usize = 2047;

// --- Locations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Default for Location {
    fn default() -> Self {
        Location { line: 1, column: 1, offset: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub begin: Location,
    pub end: Location,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.begin.line, self.begin.column)?;
        if self.end.line != self.begin.line {
            write!(f, "-{}.{}", self.end.line, self.end.column)
        } else if self.end.column > self.begin.column + 1 {
            write!(f, "-{}", self.end.column - 1)
        } else {
            Ok(())
        }
    }
}

// --- Token Kinds ---

macro_rules! token_kinds {
    ($($variant:ident => $name:expr),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenKind {
            $($variant),*
        }

        impl TokenKind {
            /// Name used in diagnostics and the debug trace.
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name),*
                }
            }
        }
    };
}

token_kinds! {
    Int => "INT", Real => "REAL", Str => "STRING",
    AngDegree => "ANGDEGREE", AngRadian => "ANGRADIAN",
    ArcMinute => "ARCMINUTE", ArcSecond => "ARCSECOND",
    PhyCoord => "PHYCOORD", ImgCoord => "IMGCOORD",
    SexStr => "SEXSTR", HmsStr => "HMSSTR", DmsStr => "DMSSTR",
    Eof => "EOF_", Eol => "EOL_", Error => "$undefined",

    Amplifier => "AMPLIFIER_", Annulus => "ANNULUS_", Arcmin => "ARCMIN_", Arcsec => "ARCSEC_",
    Arrow => "ARROW_", B1950 => "B1950_", Background => "BACKGROUND_", Begin => "BEGIN_",
    Box => "BOX_", BoxCircle => "BOXCIRCLE_", Bpanda => "BPANDA_", Callback => "CALLBACK_",
    Circle => "CIRCLE_", Circle3d => "CIRCLE3D_", Color => "COLOR_", Compass => "COMPASS_",
    Composite => "COMPOSITE_", Cpanda => "CPANDA_", Cross => "CROSS_", Dash => "DASH_",
    DashList => "DASHLIST_", Debug => "DEBUG_", Degrees => "DEGREES_", Delete => "DELETE_",
    Detector => "DETECTOR_", Diamond => "DIAMOND_", Ecliptic => "ECLIPTIC_", Edit => "EDIT_",
    Ellipse => "ELLIPSE_", End => "END_", Epanda => "EPANDA_", False => "FALSE_",
    Field => "FIELD_", Fixed => "FIXED_", Fk4 => "FK4_", Fk5 => "FK5_", Font => "FONT_",
    Galactic => "GALACTIC_", Global => "GLOBAL_", Highlite => "HIGHLITE_", Icrs => "ICRS_",
    Ignore => "IGNORE_", Image => "IMAGE_", Include => "INCLUDE_", J2000 => "J2000_",
    Key => "KEY_", Line => "LINE_", Linear => "LINEAR_", Move => "MOVE_", N => "N_",
    No => "NO_", Off => "OFF_", On => "ON_", Physical => "PHYSICAL_", Pie => "PIE_",
    Pixels => "PIXELS_", Point => "POINT_", Polygon => "POLYGON_", Projection => "PROJECTION_",
    Projection3d => "PROJECTION3D_", Property => "PROPERTY_", Rotate => "ROTATE_",
    Rotbox => "ROTBOX_", Ruler => "RULER_", Select => "SELECT_", Source => "SOURCE_",
    Tag => "TAG_", Text => "TEXT_", TextAngle => "TEXTANGLE_", TextRotate => "TEXTROTATE_",
    Tile => "TILE_", True => "TRUE_", Vector => "VECTOR_", Version => "VERSION_",
    Unhighlite => "UNHIGHLITE_", Unselect => "UNSELECT_", Update => "UPDATE_",
    Wcs => "WCS_", WcsSlot => "WCSx_", Wcs0 => "WCS0_", Width => "WIDTH_", X => "X_",
    Y => "Y_", Yes => "YES_",

    Hash => "'#'", Comma => "','", LParen => "'('", RParen => "')'", Pipe => "'|'",
    Equals => "'='", Plus => "'+'", Minus => "'-'", Ampersand => "'&'", AndAnd => "'&&'",
    Bang => "'!'",
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("amplifier", TokenKind::Amplifier), ("annulus", TokenKind::Annulus),
    ("arcmin", TokenKind::Arcmin), ("arcsec", TokenKind::Arcsec), ("arrow", TokenKind::Arrow),
    ("b1950", TokenKind::B1950), ("background", TokenKind::Background), ("begin", TokenKind::Begin),
    ("box", TokenKind::Box), ("boxcircle", TokenKind::BoxCircle), ("bpanda", TokenKind::Bpanda),
    ("callback", TokenKind::Callback), ("circle", TokenKind::Circle),
    ("circle3d", TokenKind::Circle3d), ("color", TokenKind::Color),
    ("compass", TokenKind::Compass), ("composite", TokenKind::Composite),
    ("cpanda", TokenKind::Cpanda), ("panda", TokenKind::Cpanda), ("cross", TokenKind::Cross),
    ("dash", TokenKind::Dash), ("dashlist", TokenKind::DashList), ("debug", TokenKind::Debug),
    ("degrees", TokenKind::Degrees), ("delete", TokenKind::Delete),
    ("detector", TokenKind::Detector), ("diamond", TokenKind::Diamond),
    ("ecliptic", TokenKind::Ecliptic), ("edit", TokenKind::Edit), ("ellipse", TokenKind::Ellipse),
    ("end", TokenKind::End), ("epanda", TokenKind::Epanda), ("false", TokenKind::False),
    ("field", TokenKind::Field), ("fixed", TokenKind::Fixed), ("fk4", TokenKind::Fk4),
    ("fk5", TokenKind::Fk5), ("font", TokenKind::Font), ("galactic", TokenKind::Galactic),
    ("global", TokenKind::Global), ("highlite", TokenKind::Highlite), ("icrs", TokenKind::Icrs),
    ("ignore", TokenKind::Ignore), ("image", TokenKind::Image), ("include", TokenKind::Include),
    ("j2000", TokenKind::J2000), ("key", TokenKind::Key), ("line", TokenKind::Line),
    ("linear", TokenKind::Linear), ("move", TokenKind::Move), ("n", TokenKind::N),
    ("no", TokenKind::No), ("off", TokenKind::Off), ("on", TokenKind::On),
    ("physical", TokenKind::Physical), ("pie", TokenKind::Pie), ("pixels", TokenKind::Pixels),
    ("point", TokenKind::Point), ("polygon", TokenKind::Polygon),
    ("projection", TokenKind::Projection), ("projection3d", TokenKind::Projection3d),
    ("property", TokenKind::Property), ("rotate", TokenKind::Rotate),
    ("rotbox", TokenKind::Rotbox), ("ruler", TokenKind::Ruler), ("select", TokenKind::Select),
    ("source", TokenKind::Source), ("tag", TokenKind::Tag), ("text", TokenKind::Text),
    ("textangle", TokenKind::TextAngle), ("textrotate", TokenKind::TextRotate),
    ("tile", TokenKind::Tile), ("true", TokenKind::True), ("vector", TokenKind::Vector),
    ("version", TokenKind::Version), ("unhighlite", TokenKind::Unhighlite),
    ("unselect", TokenKind::Unselect), ("update", TokenKind::Update), ("wcs", TokenKind::Wcs),
    ("wcs0", TokenKind::Wcs0), ("width", TokenKind::Width), ("x", TokenKind::X),
    ("y", TokenKind::Y), ("yes", TokenKind::Yes),
];

/// Keyword for a bare word, if it is one. `wcsa`..`wcsz` all map to
/// [`TokenKind::WcsSlot`]; the letter is read back from the lexeme.
pub fn keyword(word: &str) -> Option<TokenKind> {
    let lower = word.to_ascii_lowercase();
    if lower.len() == 4 && lower.starts_with("wcs") && lower.as_bytes()[3].is_ascii_lowercase() {
        return Some(TokenKind::WcsSlot);
    }
    KEYWORDS.iter().find(|(kw, _)| *kw == lower).map(|(_, kind)| *kind)
}

// --- Tokens ---

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Real(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub span: Span,
    pub lexeme: &'a str,
}

impl Token<'_> {
    /// Numeric payload for INT, REAL and the unit-suffixed kinds.
    pub fn number(&self) -> Option<f64> {
        match self.value {
            TokenValue::Int(v) => Some(v as f64),
            TokenValue::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn int(&self) -> Option<i64> {
        match self.value {
            TokenValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Str(s) => s,
            _ => self.lexeme,
        }
    }
}

// --- Lexer ---

type LexResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

fn quoted<'a>(open: char, close: char) -> impl FnMut(&'a str) -> LexResult<'a, &'a str> {
    move |i| delimited(nom_char(open), take_till(move |c| c == close || c == '\n'), nom_char(close))(i)
}

fn bare_word<'a>(input: &'a str) -> LexResult<'a, &'a str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

fn is_number_start(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some('+') | Some('-') => match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        },
        _ => false,
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: Location,
    max_string_len: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_max_string_len(src, DEFAULT_MAX_STRING_LEN)
    }

    pub fn with_max_string_len(src: &'a str, max_string_len: usize) -> Self {
        Lexer { src, pos: Location::default(), max_string_len }
    }

    pub fn location(&self) -> Location {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos.offset..]
    }

    /// Moves forward over `len` bytes, keeping line and column current.
    fn advance(&mut self, len: usize) {
        let end = (self.pos.offset + len).min(self.src.len());
        for c in self.src[self.pos.offset..end].chars() {
            if c == '\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
        }
        self.pos.offset = end;
    }

    /// Rewinds to a location previously handed out by this lexer.
    fn reset_to(&mut self, loc: Location) {
        self.pos = loc;
    }

    fn skip_blanks(&mut self) {
        let n = self
            .rest()
            .find(|c: char| !matches!(c, ' ' | '\t' | '\r'))
            .unwrap_or(self.rest().len());
        self.advance(n);
    }

    fn make(&mut self, kind: TokenKind, value: TokenValue, len: usize) -> Token<'a> {
        let begin = self.pos;
        let lexeme = &self.src[begin.offset..begin.offset + len];
        self.advance(len);
        Token { kind, value, span: Span { begin, end: self.pos }, lexeme }
    }

    fn error(&mut self, message: String, len: usize) -> Token<'a> {
        self.make(TokenKind::Error, TokenValue::Str(message), len)
    }

    fn string(&mut self, body: &str, len: usize) -> Token<'a> {
        if body.len() > self.max_string_len {
            return self.error(format!("string exceeds {} bytes", self.max_string_len), len);
        }
        self.make(TokenKind::Str, TokenValue::Str(body.to_string()), len)
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_blanks();
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return self.make(TokenKind::Eof, TokenValue::None, 0);
        };

        match c {
            '\n' | ';' => return self.make(TokenKind::Eol, TokenValue::None, 1),
            '#' => return self.make(TokenKind::Hash, TokenValue::None, 1),
            ',' => return self.make(TokenKind::Comma, TokenValue::None, 1),
            '(' => return self.make(TokenKind::LParen, TokenValue::None, 1),
            ')' => return self.make(TokenKind::RParen, TokenValue::None, 1),
            '|' => return self.make(TokenKind::Pipe, TokenValue::None, 1),
            '=' => return self.make(TokenKind::Equals, TokenValue::None, 1),
            '!' => return self.make(TokenKind::Bang, TokenValue::None, 1),
            '&' if rest.starts_with("&&") => return self.make(TokenKind::AndAnd, TokenValue::None, 2),
            '&' => return self.make(TokenKind::Ampersand, TokenValue::None, 1),
            '"' | '\'' | '{' => {
                let close = if c == '{' { '}' } else { c };
                return match quoted(c, close)(rest) {
                    Ok((remaining, body)) => self.string(body, rest.len() - remaining.len()),
                    Err(_) => {
                        let len = rest.find('\n').unwrap_or(rest.len());
                        self.error("unterminated string".to_string(), len)
                    }
                };
            }
            _ => {}
        }

        if is_number_start(rest) {
            if let Ok((remaining, lit)) = literal(rest) {
                let num_len = rest.len() - remaining.len();
                // longest match wins; on a tie the number does
                let word_len = bare_word(rest).map(|(r, _)| rest.len() - r.len()).unwrap_or(0);
                if word_len <= num_len {
                    return self.number(lit, num_len);
                }
            }
        } else if c == '+' {
            return self.make(TokenKind::Plus, TokenValue::None, 1);
        } else if c == '-' {
            return self.make(TokenKind::Minus, TokenValue::None, 1);
        }

        if let Ok((remaining, word)) = bare_word(rest) {
            let len = rest.len() - remaining.len();
            return match keyword(word) {
                Some(kind) => self.make(kind, TokenValue::None, len),
                None => self.string(word, len),
            };
        }

        self.error(format!("invalid character '{}'", c), c.len_utf8())
    }

    fn number(&mut self, lit: Literal, len: usize) -> Token<'a> {
        let text = &self.rest()[..len];
        let (kind, value) = match lit {
            Literal::Int(v) => (TokenKind::Int, TokenValue::Int(v)),
            Literal::Real(v) => (TokenKind::Real, TokenValue::Real(v)),
            Literal::Unit(v, unit) => {
                let kind = match unit {
                    NumericUnit::Degree => TokenKind::AngDegree,
                    NumericUnit::Radian => TokenKind::AngRadian,
                    NumericUnit::ArcMinute => TokenKind::ArcMinute,
                    NumericUnit::ArcSecond => TokenKind::ArcSecond,
                    NumericUnit::Physical => TokenKind::PhyCoord,
                    NumericUnit::Image => TokenKind::ImgCoord,
                };
                (kind, TokenValue::Real(v))
            }
            Literal::Sexagesimal => (TokenKind::SexStr, TokenValue::Str(text.to_string())),
            Literal::Hms => (TokenKind::HmsStr, TokenValue::Str(text.to_string())),
            Literal::Dms => (TokenKind::DmsStr, TokenValue::Str(text.to_string())),
        };
        self.make(kind, value, len)
    }

    /// Everything from `from` up to (not including) the end of the line, as
    /// one trimmed STRING token. Used for free comment text.
    pub fn rest_of_line(&mut self, from: Location) -> Token<'a> {
        self.reset_to(from);
        let rest = self.rest();
        let len = rest.find('\n').unwrap_or(rest.len());
        let body = rest[..len].trim();
        if body.len() > self.max_string_len {
            return self.error(format!("string exceeds {} bytes", self.max_string_len), len);
        }
        self.make(TokenKind::Str, TokenValue::Str(body.to_string()), len)
    }
}
