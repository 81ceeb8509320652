//! Numbers, angles, lengths and coordinates, resolved through the frame's
//! mapper in the local coordinate system.

use super::{PResult, Parser};
use crate::coords::{check_wcs_sky, check_wcs_system, CoordSystem, SkyFormat, SkyFrame, Vector};
use crate::lexer::{Token, TokenKind};
use crate::marker::Frame;
use crate::semantic_parsers::{parse_dms_str, parse_hms_str, parse_sex_str};

/// Tokens that may start a length.
pub(super) const VALUE_START: &[TokenKind] = &[
    TokenKind::Int,
    TokenKind::Real,
    TokenKind::PhyCoord,
    TokenKind::ImgCoord,
    TokenKind::AngDegree,
    TokenKind::ArcMinute,
    TokenKind::ArcSecond,
];

pub(super) const ANGLE_START: &[TokenKind] =
    &[TokenKind::Int, TokenKind::Real, TokenKind::AngDegree, TokenKind::AngRadian];

pub(super) const COORD_START: &[TokenKind] = &[
    TokenKind::SexStr,
    TokenKind::HmsStr,
    TokenKind::DmsStr,
    TokenKind::Int,
    TokenKind::Real,
    TokenKind::AngDegree,
    TokenKind::ImgCoord,
    TokenKind::PhyCoord,
];

pub(super) const COORD_SYSTEMS: &[TokenKind] = &[
    TokenKind::Image,
    TokenKind::Physical,
    TokenKind::Detector,
    TokenKind::Amplifier,
    TokenKind::Wcs,
    TokenKind::WcsSlot,
    TokenKind::Wcs0,
];

pub(super) const SKY_FRAMES: &[TokenKind] = &[
    TokenKind::Fk4,
    TokenKind::B1950,
    TokenKind::Fk5,
    TokenKind::J2000,
    TokenKind::Icrs,
    TokenKind::Galactic,
    TokenKind::Ecliptic,
];

const SKY_FORMATS: &[TokenKind] = &[TokenKind::Degrees, TokenKind::Arcmin, TokenKind::Arcsec];

const NUMERIC: &[TokenKind] = &[TokenKind::Int, TokenKind::Real];

impl<'src, 'f, F: Frame + ?Sized> Parser<'src, 'f, F> {
    // --- Punctuation ---

    /// Optional separator between arguments.
    pub(super) fn sp(&mut self) {
        self.eat(TokenKind::Comma);
    }

    /// Optional opening parenthesis.
    pub(super) fn bp(&mut self) {
        self.eat(TokenKind::LParen);
    }

    pub(super) fn ep(&mut self) {
        self.eat(TokenKind::RParen);
    }

    // --- Scalars ---

    pub(super) fn integer(&mut self) -> PResult<i64> {
        let tok = self.expect(TokenKind::Int)?;
        Ok(tok.int().unwrap_or_default())
    }

    pub(super) fn string(&mut self) -> PResult<String> {
        let tok = self.expect(TokenKind::Str)?;
        Ok(tok.text().to_string())
    }

    pub(super) fn yesno(&mut self) -> PResult<bool> {
        let tok = self.expect_one_of(&[
            TokenKind::Int,
            TokenKind::Yes,
            TokenKind::Y,
            TokenKind::On,
            TokenKind::True,
            TokenKind::No,
            TokenKind::N,
            TokenKind::Off,
            TokenKind::False,
        ])?;
        Ok(match tok.kind {
            TokenKind::Int => tok.int() != Some(0),
            TokenKind::Yes | TokenKind::Y | TokenKind::On | TokenKind::True => true,
            _ => false,
        })
    }

    // --- Systems ---

    /// A coordinate system keyword. Naming a WCS also makes it the one
    /// later sky-frame statements refer to.
    pub(super) fn coord_system(&mut self) -> PResult<CoordSystem> {
        let tok = self.expect_one_of(COORD_SYSTEMS)?;
        let system = match tok.kind {
            TokenKind::Image => CoordSystem::Image,
            TokenKind::Physical => CoordSystem::Physical,
            TokenKind::Detector => CoordSystem::Detector,
            TokenKind::Amplifier => CoordSystem::Amplifier,
            _ => wcs_system(&tok),
        };
        if system.is_wcs() {
            self.ctx.global.wcs = system;
        }
        Ok(system)
    }

    pub(super) fn wcs_system(&mut self) -> PResult<CoordSystem> {
        let tok = self.expect_one_of(&[TokenKind::Wcs, TokenKind::WcsSlot, TokenKind::Wcs0])?;
        Ok(wcs_system(&tok))
    }

    pub(super) fn sky_frame(&mut self) -> PResult<SkyFrame> {
        let tok = self.expect_one_of(SKY_FRAMES)?;
        Ok(match tok.kind {
            TokenKind::Fk4 | TokenKind::B1950 => SkyFrame::Fk4,
            TokenKind::Fk5 | TokenKind::J2000 => SkyFrame::Fk5,
            TokenKind::Icrs => SkyFrame::Icrs,
            TokenKind::Galactic => SkyFrame::Galactic,
            _ => SkyFrame::Ecliptic,
        })
    }

    pub(super) fn sky_format(&mut self) -> PResult<SkyFormat> {
        let tok = self.expect_one_of(SKY_FORMATS)?;
        Ok(match tok.kind {
            TokenKind::Degrees => SkyFormat::Degrees,
            TokenKind::Arcmin => SkyFormat::Arcmin,
            _ => SkyFormat::Arcsec,
        })
    }

    pub(super) fn at_sky_format(&mut self) -> bool {
        SKY_FORMATS.contains(&self.peek_kind())
    }

    // --- Angles ---

    /// An angle in reference radians. Bare numbers are degrees.
    pub(super) fn angle(&mut self) -> PResult<f64> {
        let tok = self.expect_one_of(ANGLE_START)?;
        Ok(self.resolve_angle(&tok))
    }

    pub(super) fn resolve_angle(&self, tok: &Token<'_>) -> f64 {
        let (system, sky) = (self.ctx.local.system, self.ctx.local.sky);
        let value = tok.number().unwrap_or_default();
        let radians = match tok.kind {
            TokenKind::AngRadian => value,
            _ => value.to_radians(),
        };
        self.frame.map_angle_to_ref(radians, system, sky)
    }

    /// An angle that may be left out, defaulting to zero.
    pub(super) fn optangle(&mut self) -> PResult<f64> {
        if ANGLE_START.contains(&self.peek_kind()) {
            return self.angle();
        }
        let (system, sky) = (self.ctx.local.system, self.ctx.local.sky);
        Ok(self.frame.map_angle_to_ref(0.0, system, sky))
    }

    // --- Lengths ---

    fn length_system(&self, kind: TokenKind) -> (CoordSystem, SkyFormat) {
        let local = self.ctx.local.system;
        match kind {
            TokenKind::PhyCoord => (CoordSystem::Physical, SkyFormat::Degrees),
            TokenKind::ImgCoord => (CoordSystem::Image, SkyFormat::Degrees),
            TokenKind::AngDegree => (check_wcs_system(local), SkyFormat::Degrees),
            TokenKind::ArcMinute => (check_wcs_system(local), SkyFormat::Arcmin),
            TokenKind::ArcSecond => (check_wcs_system(local), SkyFormat::Arcsec),
            _ => (local, SkyFormat::Degrees),
        }
    }

    /// A distance in reference units.
    pub(super) fn value(&mut self) -> PResult<f64> {
        let tok = self.expect_one_of(VALUE_START)?;
        Ok(self.resolve_value(&tok))
    }

    pub(super) fn resolve_value(&self, tok: &Token<'_>) -> f64 {
        let (system, format) = self.length_system(tok.kind);
        self.frame.map_len_to_ref(tok.number().unwrap_or_default(), system, format)
    }

    /// A pair of distances sharing one unit, e.g. the radii of an ellipse.
    pub(super) fn vvalue(&mut self) -> PResult<Vector> {
        let first = self.expect_one_of(VALUE_START)?;
        self.sp();
        let second = if NUMERIC.contains(&first.kind) {
            self.expect_one_of(NUMERIC)?
        } else {
            self.expect(first.kind)?
        };
        Ok(self.resolve_vvalue(&first, &second))
    }

    pub(super) fn resolve_vvalue(&self, first: &Token<'_>, second: &Token<'_>) -> Vector {
        let (system, format) = self.length_system(first.kind);
        self.frame.map_len_vec_to_ref(pair(first, second), system, format)
    }

    // --- Coordinates ---

    /// A position in reference coordinates. Both halves must be spelled
    /// the same way, except that an `h m s` longitude pairs with a
    /// `d m s` latitude.
    pub(super) fn coord(&mut self) -> PResult<Vector> {
        let first = self.expect_one_of(COORD_START)?;
        self.sp();
        let second = match first.kind {
            TokenKind::Int | TokenKind::Real => self.expect_one_of(NUMERIC)?,
            TokenKind::HmsStr => self.expect(TokenKind::DmsStr)?,
            kind => self.expect(kind)?,
        };

        let local = self.ctx.local.system;
        let (wcs, wcs_sky) = (check_wcs_system(local), check_wcs_sky(local, self.ctx.local.sky));
        let (v, system, sky) = match first.kind {
            TokenKind::SexStr => {
                let x = self.sexagesimal(&first, parse_sex_str)?;
                let y = self.sexagesimal(&second, parse_sex_str)?;
                // a colon-separated longitude is in hours on equatorial frames
                let x = if wcs_sky.uses_hours() { x * 360.0 / 24.0 } else { x };
                (Vector::new(x, y), wcs, wcs_sky)
            }
            TokenKind::HmsStr => {
                let x = self.sexagesimal(&first, parse_hms_str)?;
                let y = self.sexagesimal(&second, parse_dms_str)?;
                (Vector::new(x, y), wcs, wcs_sky)
            }
            TokenKind::DmsStr => {
                let x = self.sexagesimal(&first, parse_dms_str)?;
                let y = self.sexagesimal(&second, parse_dms_str)?;
                (Vector::new(x, y), wcs, wcs_sky)
            }
            TokenKind::AngDegree => (pair(&first, &second), wcs, wcs_sky),
            TokenKind::ImgCoord => (pair(&first, &second), CoordSystem::Image, SkyFrame::Fk5),
            TokenKind::PhyCoord => (pair(&first, &second), CoordSystem::Physical, SkyFrame::Fk5),
            _ => (pair(&first, &second), local, self.ctx.local.sky),
        };
        Ok(self.frame.map_to_ref(v, system, sky))
    }

    fn sexagesimal(&self, tok: &Token<'src>, eval: fn(&str) -> Option<f64>) -> PResult<f64> {
        eval(tok.text()).ok_or_else(|| self.invalid(tok.span, format!("invalid sexagesimal value '{}'", tok.text())))
    }
}

fn wcs_system(tok: &Token<'_>) -> CoordSystem {
    match tok.kind {
        TokenKind::WcsSlot => tok
            .lexeme
            .chars()
            .nth(3)
            .and_then(CoordSystem::wcs_slot)
            .unwrap_or(CoordSystem::Wcs),
        TokenKind::Wcs0 => CoordSystem::Wcs0,
        _ => CoordSystem::Wcs,
    }
}

fn pair(first: &Token<'_>, second: &Token<'_>) -> Vector {
    Vector::new(first.number().unwrap_or_default(), second.number().unwrap_or_default())
}
