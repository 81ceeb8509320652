//! `key=value` properties of `global` lines and shape comments.

use super::context::PandaMode;
use super::values::{ANGLE_START, COORD_SYSTEMS, SKY_FRAMES, VALUE_START};
use super::{PResult, Parser};
use crate::coords::{CoordSystem, SkyFormat, SkyFrame, Vector};
use crate::legacy::{MAX_ANGLES, MAX_ANNULI};
use crate::lexer::TokenKind;
use crate::marker::Frame;
use crate::style::{CompassStyle, PointShape, Properties, RulerStyle, StyleProperty};
use tracing::debug;

/// Flags settable with `name=yesno`.
fn property_flag(kind: TokenKind) -> Option<Properties> {
    Some(match kind {
        TokenKind::Select => Properties::SELECT,
        TokenKind::Highlite => Properties::HIGHLITE,
        TokenKind::Dash => Properties::DASH,
        TokenKind::Fixed => Properties::FIXED,
        TokenKind::Edit => Properties::EDIT,
        TokenKind::Move => Properties::MOVE,
        TokenKind::Rotate => Properties::ROTATE,
        TokenKind::Delete => Properties::DELETE,
        TokenKind::Include => Properties::INCLUDE,
        TokenKind::Source => Properties::SOURCE,
        _ => return None,
    })
}

fn is_common_property_start(kind: TokenKind) -> bool {
    property_flag(kind).is_some()
        || matches!(
            kind,
            TokenKind::Background
                | TokenKind::Color
                | TokenKind::DashList
                | TokenKind::Width
                | TokenKind::Font
                | TokenKind::Text
                | TokenKind::Point
                | TokenKind::Line
                | TokenKind::Vector
                | TokenKind::Composite
                | TokenKind::Ruler
                | TokenKind::Compass
                | TokenKind::TextAngle
                | TokenKind::TextRotate
        )
}

pub(super) fn is_global_property_start(kind: TokenKind) -> bool {
    kind == TokenKind::Wcs || is_common_property_start(kind)
}

pub(super) fn is_local_property_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Tag | TokenKind::Callback | TokenKind::Cpanda | TokenKind::Epanda | TokenKind::Bpanda
    ) || is_common_property_start(kind)
}

impl<'src, 'f, F: Frame + ?Sized> Parser<'src, 'f, F> {
    // --- Property Lists ---

    /// Properties of a `global` line; each one also updates the local scope.
    pub(super) fn global_properties(&mut self) -> PResult<()> {
        loop {
            self.global_property()?;
            if self.eat(TokenKind::Comma).is_some() || is_global_property_start(self.peek_kind()) {
                continue;
            }
            return Ok(());
        }
    }

    fn global_property(&mut self) -> PResult<()> {
        if self.eat(TokenKind::Wcs).is_some() {
            self.expect(TokenKind::Equals)?;
            self.ctx.global.wcs = self.wcs_system()?;
            return Ok(());
        }
        let prop = self.common_property()?;
        let limits = self.limits();
        self.ctx.global.style.apply(&prop, limits);
        self.ctx.local.style.apply(&prop, limits);
        Ok(())
    }

    /// Properties in a shape comment; they affect only the current shape.
    pub(super) fn local_properties(&mut self) -> PResult<()> {
        loop {
            self.local_property()?;
            if self.eat(TokenKind::Comma).is_some() || is_local_property_start(self.peek_kind()) {
                continue;
            }
            return Ok(());
        }
    }

    fn local_property(&mut self) -> PResult<()> {
        match self.peek_kind() {
            TokenKind::Tag => {
                self.bump();
                self.expect(TokenKind::Equals)?;
                let tag = self.string()?;
                self.ctx.local.tags.push(tag);
            }
            TokenKind::Callback => {
                self.bump();
                self.expect(TokenKind::Equals)?;
                let event = self.callback_event()?;
                let proc = self.string()?;
                let arg = self.string()?;
                debug!(event, proc = %proc, arg = %arg, "marker callback ignored");
            }
            TokenKind::Cpanda => {
                self.bump();
                self.expect(TokenKind::Equals)?;
                self.ctx.local.cpanda = self.cpanda_property()?;
            }
            TokenKind::Epanda => {
                self.bump();
                self.expect(TokenKind::Equals)?;
                self.ctx.local.epanda = self.epanda_property()?;
            }
            TokenKind::Bpanda => {
                self.bump();
                self.expect(TokenKind::Equals)?;
                self.ctx.local.bpanda = self.epanda_property()?;
            }
            _ => {
                let prop = self.common_property()?;
                let limits = self.limits();
                self.ctx.local.style.apply(&prop, limits);
            }
        }
        Ok(())
    }

    // --- Shared Properties ---

    fn common_property(&mut self) -> PResult<StyleProperty> {
        let kind = self.peek_kind();
        if let Some(flag) = property_flag(kind) {
            self.bump();
            // a bare `dash` or `source` switches the flag on
            let bare_ok = flag == Properties::DASH || flag == Properties::SOURCE;
            if bare_ok && !self.at(TokenKind::Equals) {
                return Ok(StyleProperty::Flag(flag, true));
            }
            self.expect(TokenKind::Equals)?;
            return Ok(StyleProperty::Flag(flag, self.yesno()?));
        }
        if kind == TokenKind::Background {
            self.bump();
            return Ok(StyleProperty::Flag(Properties::SOURCE, false));
        }
        if !is_common_property_start(kind) {
            return Err(self.unexpected());
        }

        self.bump();
        self.expect(TokenKind::Equals)?;
        let prop = match kind {
            TokenKind::Color => {
                if self.eat(TokenKind::Hash).is_some() {
                    let tok = self.expect_one_of(&[TokenKind::Str, TokenKind::Int, TokenKind::Real])?;
                    StyleProperty::Color(format!("#{}", tok.lexeme))
                } else {
                    StyleProperty::Color(self.string()?)
                }
            }
            TokenKind::DashList => {
                let on = self.integer()?;
                let off = self.integer()?;
                StyleProperty::DashList(on as i32, off as i32)
            }
            TokenKind::Width => StyleProperty::Width(self.integer()? as i32),
            TokenKind::Font => StyleProperty::Font(self.string()?),
            TokenKind::Text => StyleProperty::Text(self.string()?),
            TokenKind::Point => {
                let shape = self.point_shape()?;
                let size = if self.at(TokenKind::Int) { Some(self.integer()? as i32) } else { None };
                StyleProperty::Point(shape, size)
            }
            TokenKind::Line => {
                let start = self.integer()?;
                let end = self.integer()?;
                StyleProperty::Line(start != 0, end != 0)
            }
            TokenKind::Vector => StyleProperty::Vector(self.integer()? != 0),
            TokenKind::Composite => StyleProperty::Composite(self.integer()? != 0),
            TokenKind::Ruler => StyleProperty::Ruler(self.ruler_spec()?),
            TokenKind::Compass => {
                let (system, sky) = self.compass_spec()?;
                let north = self.string()?;
                let east = self.string()?;
                let north_arrow = self.integer()? != 0;
                let east_arrow = self.integer()? != 0;
                StyleProperty::Compass(CompassStyle { system, sky, north, east, north_arrow, east_arrow })
            }
            TokenKind::TextAngle => StyleProperty::TextAngle(self.angle()?),
            _ => StyleProperty::TextRotate(self.integer()? != 0),
        };
        Ok(prop)
    }

    pub(super) fn point_shape(&mut self) -> PResult<PointShape> {
        let tok = self.expect_one_of(&[
            TokenKind::Circle,
            TokenKind::Box,
            TokenKind::Diamond,
            TokenKind::Cross,
            TokenKind::X,
            TokenKind::Arrow,
            TokenKind::BoxCircle,
        ])?;
        Ok(match tok.kind {
            TokenKind::Circle => PointShape::Circle,
            TokenKind::Box => PointShape::Box,
            TokenKind::Diamond => PointShape::Diamond,
            TokenKind::Cross => PointShape::Cross,
            TokenKind::X => PointShape::X,
            TokenKind::Arrow => PointShape::Arrow,
            _ => PointShape::BoxCircle,
        })
    }

    /// Where a ruler is measured and how its length is shown.
    fn ruler_spec(&mut self) -> PResult<RulerStyle> {
        let kind = self.peek_kind();
        let (system, sky, dist_system, dist_format) = if COORD_SYSTEMS.contains(&kind) {
            let system = self.coord_system()?;
            if SKY_FRAMES.contains(&self.peek_kind()) {
                let sky = self.sky_frame()?;
                let dist_system = self.coord_system()?;
                let dist_format = self.sky_format()?;
                (system, sky, dist_system, dist_format)
            } else {
                let (dist_system, dist_format) = self.ruler_distance()?;
                (system, SkyFrame::Fk5, dist_system, dist_format)
            }
        } else if SKY_FRAMES.contains(&kind) {
            let sky = self.sky_frame()?;
            let (dist_system, dist_format) = self.ruler_distance()?;
            (CoordSystem::Wcs, sky, dist_system, dist_format)
        } else if self.eat(TokenKind::Linear).is_some() {
            let (dist_system, dist_format) = self.ruler_distance()?;
            (CoordSystem::Wcs, SkyFrame::Fk5, dist_system, dist_format)
        } else if self.eat(TokenKind::Pixels).is_some() {
            (CoordSystem::Image, SkyFrame::Fk5, CoordSystem::Image, SkyFormat::Degrees)
        } else {
            let dist_format = self.sky_format()?;
            (CoordSystem::Image, SkyFrame::Fk5, CoordSystem::Wcs, dist_format)
        };
        Ok(RulerStyle { system, sky, dist_system, dist_format })
    }

    /// A distance system reads in degrees; a bare format implies WCS.
    fn ruler_distance(&mut self) -> PResult<(CoordSystem, SkyFormat)> {
        if COORD_SYSTEMS.contains(&self.peek_kind()) {
            Ok((self.coord_system()?, SkyFormat::Degrees))
        } else if self.at_sky_format() {
            Ok((CoordSystem::Wcs, self.sky_format()?))
        } else {
            Err(self.unexpected())
        }
    }

    fn compass_spec(&mut self) -> PResult<(CoordSystem, SkyFrame)> {
        let kind = self.peek_kind();
        if COORD_SYSTEMS.contains(&kind) {
            let system = self.coord_system()?;
            let sky = if SKY_FRAMES.contains(&self.peek_kind()) { self.sky_frame()? } else { SkyFrame::Fk5 };
            Ok((system, sky))
        } else if SKY_FRAMES.contains(&kind) {
            Ok((CoordSystem::Wcs, self.sky_frame()?))
        } else {
            self.expect(TokenKind::Linear)?;
            Ok((CoordSystem::Wcs, SkyFrame::Fk5))
        }
    }

    fn callback_event(&mut self) -> PResult<&'static str> {
        let phase = self.eat(TokenKind::Begin).or_else(|| self.eat(TokenKind::End)).map(|t| t.kind);
        let tok = self.expect_one_of(&[
            TokenKind::Select,
            TokenKind::Unselect,
            TokenKind::Highlite,
            TokenKind::Unhighlite,
            TokenKind::Move,
            TokenKind::Edit,
            TokenKind::Rotate,
            TokenKind::Delete,
            TokenKind::Text,
            TokenKind::Color,
            TokenKind::Width,
            TokenKind::Property,
            TokenKind::Font,
            TokenKind::Key,
            TokenKind::Update,
        ])?;
        let phased = matches!(tok.kind, TokenKind::Move | TokenKind::Edit | TokenKind::Rotate);
        let phase = match phase {
            Some(kind) => Some(kind),
            None if phased => self.eat(TokenKind::Begin).or_else(|| self.eat(TokenKind::End)).map(|t| t.kind),
            None => None,
        };
        Ok(match (tok.kind, phase) {
            (TokenKind::Move, Some(TokenKind::Begin)) => "movebegin",
            (TokenKind::Move, Some(_)) => "moveend",
            (TokenKind::Edit, Some(TokenKind::Begin)) => "editbegin",
            (TokenKind::Edit, Some(_)) => "editend",
            (TokenKind::Rotate, Some(TokenKind::Begin)) => "rotatebegin",
            (TokenKind::Rotate, Some(_)) => "rotateend",
            (TokenKind::Select, _) => "select",
            (TokenKind::Unselect, _) => "unselect",
            (TokenKind::Highlite, _) => "highlite",
            (TokenKind::Unhighlite, _) => "unhighlite",
            (TokenKind::Move, None) => "move",
            (TokenKind::Edit, None) => "edit",
            (TokenKind::Rotate, None) => "rotate",
            (TokenKind::Delete, _) => "delete",
            (TokenKind::Text, _) => "text",
            (TokenKind::Color, _) => "color",
            (TokenKind::Width, _) => "width",
            (TokenKind::Property, _) => "property",
            (TokenKind::Font, _) => "font",
            (TokenKind::Key, _) => "key",
            _ => "update",
        })
    }

    // --- Panda Lists ---

    /// `(angles)(radii)` or `ignore`.
    fn cpanda_property(&mut self) -> PResult<PandaMode> {
        if self.eat(TokenKind::Ignore).is_some() {
            return Ok(PandaMode::Ignore);
        }
        self.ctx.angles.clear();
        self.ctx.annuli.clear();
        self.expect(TokenKind::LParen)?;
        self.angle_list()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LParen)?;
        self.radius_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(PandaMode::Explicit)
    }

    /// `(angles)(radius pairs)(angle)` or `ignore`; shared by epanda and bpanda.
    fn epanda_property(&mut self) -> PResult<PandaMode> {
        if self.eat(TokenKind::Ignore).is_some() {
            return Ok(PandaMode::Ignore);
        }
        self.ctx.angles.clear();
        self.ctx.radii.clear();
        self.ctx.panda_angle = 0.0;
        self.expect(TokenKind::LParen)?;
        self.angle_list()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LParen)?;
        self.vradius_list()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LParen)?;
        self.ctx.panda_angle = self.angle()?;
        self.expect(TokenKind::RParen)?;
        Ok(PandaMode::Explicit)
    }

    fn angle_list(&mut self) -> PResult<()> {
        loop {
            let span = self.peek_span();
            let angle = self.angle()?;
            if !self.ctx.angles.push(angle) {
                self.overflow(span, "angles", MAX_ANGLES)?;
            }
            self.sp();
            if !ANGLE_START.contains(&self.peek_kind()) {
                return Ok(());
            }
        }
    }

    fn radius_list(&mut self) -> PResult<()> {
        loop {
            let span = self.peek_span();
            let radius = self.value()?;
            if !self.ctx.annuli.push(radius) {
                self.overflow(span, "annuli", MAX_ANNULI)?;
            }
            self.sp();
            if !VALUE_START.contains(&self.peek_kind()) {
                return Ok(());
            }
        }
    }

    fn vradius_list(&mut self) -> PResult<()> {
        loop {
            let span = self.peek_span();
            let x = self.value()?;
            self.sp();
            let y = self.value()?;
            if !self.ctx.radii.push(Vector::new(x, y)) {
                self.overflow(span, "annuli", MAX_ANNULI)?;
            }
            self.sp();
            if !VALUE_START.contains(&self.peek_kind()) {
                return Ok(());
            }
        }
    }
}
