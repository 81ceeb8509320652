//! Shape statements. Every shape parses its geometry, an optional
//! conjunction and its comment, then creates its marker from the local
//! style as the comment left it.

use super::context::PandaMode;
use super::values::{ANGLE_START, COORD_START, VALUE_START};
use super::{PResult, Parser};
use crate::coords::Vector;
use crate::legacy::{LegacyShape, MAX_ANGLES, MAX_ANNULI};
use crate::lexer::{Span, Token, TokenKind};
use crate::marker::{Frame, Marker, MarkerStyle, Spread};
use crate::style::{PointShape, StyleProperty};
use tracing::debug;

/// Shapes that DS9 also draws when they are commented out with `#`.
pub(super) fn is_nonshape_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Text
            | TokenKind::Composite
            | TokenKind::Vector
            | TokenKind::Projection
            | TokenKind::Ruler
            | TokenKind::Compass
            | TokenKind::Circle3d
    )
}

pub(super) fn is_shape_start(kind: TokenKind) -> bool {
    is_nonshape_start(kind)
        || matches!(
            kind,
            TokenKind::Circle
                | TokenKind::Annulus
                | TokenKind::Cpanda
                | TokenKind::Ellipse
                | TokenKind::Epanda
                | TokenKind::Box
                | TokenKind::Rotbox
                | TokenKind::Bpanda
                | TokenKind::Line
                | TokenKind::Point
                | TokenKind::Diamond
                | TokenKind::Cross
                | TokenKind::X
                | TokenKind::Arrow
                | TokenKind::BoxCircle
                | TokenKind::Polygon
                | TokenKind::Pie
                | TokenKind::Field
        )
}

/// How the radii after an ellipse or box center are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// One radius pair.
    Single,
    /// Inner and outer pair.
    Annulus,
    /// Inner and outer pair split into `n` rings.
    Rings(i32),
    /// Every ring spelled out.
    List,
}

/// The values following an ellipse or box center, classified once the
/// whole list has been read.
struct RadiusItems<'src> {
    values: Vec<Token<'src>>,
    angle: Option<Token<'src>>,
    layout: Layout,
}

impl<'src, 'f, F: Frame + ?Sized> Parser<'src, 'f, F> {
    // --- Dispatch ---

    pub(super) fn shape(&mut self) -> PResult<()> {
        if !is_shape_start(self.peek_kind()) {
            return Err(self.unexpected());
        }
        let keyword = self.bump();
        match keyword.kind {
            TokenKind::Circle if self.peek_kind() == TokenKind::Point => self.typed_point(PointShape::Circle),
            TokenKind::Circle => self.circle(),
            TokenKind::Box if self.peek_kind() == TokenKind::Point => self.typed_point(PointShape::Box),
            TokenKind::Box => self.ellipse_or_box(LegacyShape::Box),
            TokenKind::Ellipse => self.ellipse_or_box(LegacyShape::Ellipse),
            TokenKind::Rotbox => self.rotbox(),
            TokenKind::Annulus => self.annulus(),
            TokenKind::Cpanda => self.cpanda(),
            TokenKind::Epanda => self.epanda(LegacyShape::Ellipse),
            TokenKind::Bpanda => self.epanda(LegacyShape::Box),
            TokenKind::Line => self.line(),
            TokenKind::Point => self.point(),
            TokenKind::Diamond => self.typed_point(PointShape::Diamond),
            TokenKind::Cross => self.typed_point(PointShape::Cross),
            TokenKind::X => self.typed_point(PointShape::X),
            TokenKind::Arrow => self.typed_point(PointShape::Arrow),
            TokenKind::BoxCircle => self.typed_point(PointShape::BoxCircle),
            TokenKind::Polygon => self.polygon(),
            TokenKind::Pie => self.pie(),
            TokenKind::Field => self.field(),
            kind => self.nonshape_body(kind, false),
        }
    }

    /// A shape written after `#`. Its properties follow without another `#`.
    pub(super) fn nonshape(&mut self) -> PResult<()> {
        if !is_nonshape_start(self.peek_kind()) {
            return Err(self.unexpected());
        }
        let keyword = self.bump();
        self.nonshape_body(keyword.kind, true)
    }

    // --- Emission ---

    fn conjunction(&mut self) {
        let joined = if self.eat(TokenKind::Pipe).is_some() {
            self.eat(TokenKind::Pipe);
            true
        } else {
            self.eat(TokenKind::AndAnd).is_some()
        };
        self.ctx.composite_continues = joined;
    }

    fn finish(&mut self, commented: bool) -> PResult<()> {
        self.conjunction();
        if commented {
            self.nonshape_comment()
        } else {
            self.shape_comment()
        }
    }

    fn snapshot(&self) -> MarkerStyle {
        MarkerStyle::snapshot(&self.ctx.local.style, &self.ctx.local.tags)
    }

    fn emit(&mut self, marker: Marker) -> PResult<()> {
        let style = self.snapshot();
        self.emit_with(marker, style)
    }

    fn emit_with(&mut self, marker: Marker, style: MarkerStyle) -> PResult<()> {
        debug!(shape = marker.shape_name(), "creating marker");
        self.frame.create(marker, style)?;
        Ok(())
    }

    /// Caps a scratch list, applying the overflow policy once.
    fn bounded<T>(&self, mut items: Vec<T>, span: Span, what: &str, limit: usize) -> PResult<Vec<T>> {
        if items.len() > limit {
            self.overflow(span, what, limit)?;
            items.truncate(limit);
        }
        Ok(items)
    }

    // --- Shapes Drawn Even When Commented ---

    fn nonshape_body(&mut self, kind: TokenKind, commented: bool) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        match kind {
            TokenKind::Text => {
                if !commented {
                    self.sp();
                    if self.at(TokenKind::Str) {
                        let text = self.string()?;
                        let limits = self.limits();
                        self.ctx.local.style.apply(&StyleProperty::Text(text), limits);
                    }
                }
                self.ep();
                self.finish(commented)?;
                let style = &self.ctx.local.style;
                let marker = Marker::Text { center, angle: style.text_angle, rotate: style.text_rotate };
                self.emit(marker)?;
                self.reduce("shape -> TEXT_ bp coord sp STRING ep conjuction shapeComment");
            }
            TokenKind::Composite => {
                self.sp();
                let angle = self.optangle()?;
                self.ep();
                self.finish(commented)?;
                let global = self.ctx.local.style.composite_global;
                self.emit(Marker::Composite { center, angle, global })?;
                self.reduce("shape -> COMPOSITE_ bp coord sp optangle ep conjuction shapeComment");
            }
            TokenKind::Vector => {
                self.sp();
                let length = self.value()?;
                self.sp();
                let angle = self.angle()?;
                self.ep();
                self.finish(commented)?;
                let arrow = self.ctx.local.style.vector_arrow;
                self.emit(Marker::Vector { start: center, length, angle, arrow })?;
                self.reduce("shape -> VECTOR_ bp coord sp value sp angle ep conjuction shapeComment");
            }
            TokenKind::Projection => {
                self.sp();
                let end = self.coord()?;
                self.sp();
                let width = self.value()?;
                self.ep();
                self.finish(commented)?;
                self.emit(Marker::Projection { start: center, end, width })?;
            }
            TokenKind::Ruler => {
                self.sp();
                let end = self.coord()?;
                self.ep();
                self.finish(commented)?;
                let ruler = self.ctx.local.style.ruler;
                self.emit(Marker::Ruler { start: center, end, ruler })?;
            }
            TokenKind::Compass => {
                self.sp();
                let radius = self.value()?;
                self.ep();
                self.finish(commented)?;
                let compass = self.ctx.local.style.compass.clone();
                self.emit(Marker::Compass { center, radius, compass })?;
            }
            _ => {
                self.sp();
                let radius = self.value()?;
                self.ep();
                self.finish(commented)?;
                self.emit(Marker::Circle3d { center, radius })?;
            }
        }
        Ok(())
    }

    // --- Circles and Annuli ---

    fn circle(&mut self) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.sp();
        let radius = self.value()?;
        self.ep();
        self.finish(false)?;
        self.emit(Marker::Circle { center, radius })?;
        self.reduce("shape -> CIRCLE_ bp coord sp value ep conjuction shapeComment");
        Ok(())
    }

    fn annulus(&mut self) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.sp();
        let inner = self.value()?;
        self.sp();
        let outer = self.value()?;
        self.sp();
        let radii = if self.eat(TokenKind::N).is_some() {
            self.expect(TokenKind::Equals)?;
            let count = self.integer()? as i32;
            Spread::Range { start: inner, stop: outer, count }
        } else if VALUE_START.contains(&self.peek_kind()) {
            let span = self.peek_span();
            let mut radii = vec![inner, outer];
            loop {
                radii.push(self.value()?);
                self.sp();
                if !VALUE_START.contains(&self.peek_kind()) {
                    break;
                }
            }
            Spread::List(self.bounded(radii, span, "annuli", MAX_ANNULI)?)
        } else {
            Spread::Range { start: inner, stop: outer, count: 1 }
        };
        self.ep();
        self.finish(false)?;
        self.emit(Marker::Annulus { center, radii })
    }

    fn cpanda(&mut self) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.sp();
        let start_angle = self.angle()?;
        self.sp();
        let stop_angle = self.angle()?;
        self.sp();
        let angle_count = self.integer()? as i32;
        self.sp();
        let inner = self.value()?;
        self.sp();
        let outer = self.value()?;
        self.sp();
        let radius_count = self.integer()? as i32;
        self.ep();
        self.finish(false)?;

        let (angles, radii) = match self.ctx.local.cpanda {
            PandaMode::Ignore => {
                debug!("cpanda marked ignore, not drawn");
                return Ok(());
            }
            PandaMode::Normal => (
                Spread::Range { start: start_angle, stop: stop_angle, count: angle_count },
                Spread::Range { start: inner, stop: outer, count: radius_count },
            ),
            PandaMode::Explicit => (Spread::List(self.ctx.angles.to_vec()), Spread::List(self.ctx.annuli.to_vec())),
        };
        self.emit(Marker::Cpanda { center, angles, radii })
    }

    // --- Ellipses and Boxes ---

    /// Reads the values after an ellipse or box center, up to the first
    /// token that cannot continue the list.
    fn radius_items(&mut self) -> PResult<RadiusItems<'src>> {
        let mut tokens: Vec<Token<'src>> = Vec::new();
        let mut rings: Option<(usize, i32, Span)> = None;
        loop {
            self.sp();
            let kind = self.peek_kind();
            if VALUE_START.contains(&kind) || kind == TokenKind::AngRadian {
                tokens.push(self.bump());
            } else if kind == TokenKind::N && rings.is_none() {
                let n = self.bump();
                self.expect(TokenKind::Equals)?;
                let count = self.integer()? as i32;
                rings = Some((tokens.len(), count, n.span));
            } else {
                break;
            }
        }

        let layout = match rings {
            Some((4, count, _)) if tokens.len() <= 5 => Layout::Rings(count),
            Some((_, _, span)) => {
                return Err(self.invalid(span, format!("syntax error, unexpected {}", TokenKind::N)));
            }
            None => match tokens.len() {
                0 | 1 => {
                    self.expected.extend_from_slice(VALUE_START);
                    return Err(self.unexpected());
                }
                2 | 3 => Layout::Single,
                4 | 5 => Layout::Annulus,
                _ => Layout::List,
            },
        };

        // an odd count leaves a trailing angle; ring counts take an optional one
        let has_angle = match layout {
            Layout::Rings(_) => tokens.len() == 5,
            _ => tokens.len() % 2 == 1,
        };
        let angle = if has_angle { tokens.pop() } else { None };
        if let Some(tok) = &angle {
            if !ANGLE_START.contains(&tok.kind) {
                return Err(self.invalid(tok.span, format!("syntax error, unexpected {}", tok.kind)));
            }
        }
        if let Some(tok) = tokens.iter().find(|t| t.kind == TokenKind::AngRadian) {
            return Err(self.invalid(tok.span, format!("syntax error, unexpected {}", tok.kind)));
        }

        // the leading pairs share one unit each; the rest of a list may mix
        let paired = if layout == Layout::Single { 1 } else { 2 };
        for pair in tokens.chunks(2).take(paired) {
            let (first, second) = (&pair[0], &pair[1]);
            let numeric = |k: TokenKind| matches!(k, TokenKind::Int | TokenKind::Real);
            if first.kind != second.kind && !(numeric(first.kind) && numeric(second.kind)) {
                return Err(self.invalid(
                    second.span,
                    format!("syntax error, unexpected {}, expecting {}", second.kind, first.kind),
                ));
            }
        }

        Ok(RadiusItems { values: tokens, angle, layout })
    }

    fn item_angle(&self, angle: Option<&Token<'_>>) -> f64 {
        match angle {
            Some(tok) => self.resolve_angle(tok),
            None => {
                let (system, sky) = (self.ctx.local.system, self.ctx.local.sky);
                self.frame.map_angle_to_ref(0.0, system, sky)
            }
        }
    }

    fn ellipse_or_box(&mut self, shape: LegacyShape) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        let items = self.radius_items()?;
        let values = &items.values;
        let first = self.resolve_vvalue(&values[0], &values[1]);

        if items.layout == Layout::Single {
            let angle = self.item_angle(items.angle.as_ref());
            self.ep();
            if self.peek_kind() == TokenKind::Ampersand {
                return self.saoimage_annulus(shape, first);
            }
            self.finish(false)?;
            let style = self.snapshot();
            self.ctx.legacy.on_shape_complete(shape, center, first, angle, style.clone());
            let marker = match shape {
                LegacyShape::Ellipse => Marker::Ellipse { center, radius: first, angle },
                LegacyShape::Box => Marker::Box { center, size: first, angle },
            };
            self.emit_with(marker, style)?;
            self.reduce("shape -> ELLIPSE_ bp coord sp vvalue sp optangle ep conjuction shapeComment");
            return Ok(());
        }

        let second = self.resolve_vvalue(&values[2], &values[3]);
        let radii = match items.layout {
            Layout::Rings(count) => Spread::Range { start: first, stop: second, count },
            Layout::List => {
                let mut radii = vec![first, second];
                for pair in values[4..].chunks(2) {
                    radii.push(Vector::new(self.resolve_value(&pair[0]), self.resolve_value(&pair[1])));
                }
                Spread::List(self.bounded(radii, values[4].span, "annuli", MAX_ANNULI)?)
            }
            _ => Spread::Range { start: first, stop: second, count: 1 },
        };
        let angle = self.item_angle(items.angle.as_ref());
        self.ep();
        self.finish(false)?;
        let marker = match shape {
            LegacyShape::Ellipse => Marker::EllipseAnnulus { center, radii, angle },
            LegacyShape::Box => Marker::BoxAnnulus { center, sizes: radii, angle },
        };
        self.emit(marker)
    }

    /// `ellipse(...) & !ellipse(...)`: the outer shape minus the inner one,
    /// kept for old SAOimage files. It has no conjunction or comment.
    fn saoimage_annulus(&mut self, shape: LegacyShape, outer: Vector) -> PResult<()> {
        let keyword = match shape {
            LegacyShape::Ellipse => TokenKind::Ellipse,
            LegacyShape::Box => TokenKind::Box,
        };
        let span = self.peek_span();
        self.expect(TokenKind::Ampersand)?;
        self.expect(TokenKind::Bang)?;
        self.expect(keyword)?;
        self.bp();
        let center = self.coord()?;
        self.sp();
        let inner = self.vvalue()?;
        self.sp();
        let angle = self.optangle()?;
        self.ep();

        if !self.ctx.legacy.on_shape_start() {
            let style = self.snapshot();
            self.ctx.legacy.begin_without_marker(shape, center, inner, angle, style);
        }
        if !self.ctx.legacy.on_continuation(outer) {
            self.overflow(span, "annuli", MAX_ANNULI)?;
        }
        self.reduce("shape -> ELLIPSE_ bp coord sp vvalue sp optangle ep '&' '!' ELLIPSE_ bp coord sp vvalue sp optangle ep");
        Ok(())
    }

    fn rotbox(&mut self) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.sp();
        let size = self.vvalue()?;
        self.sp();
        let angle = self.optangle()?;
        self.ep();
        self.finish(false)?;
        self.emit(Marker::Box { center, size, angle })
    }

    /// Elliptical (`LegacyShape::Ellipse`) or box panda.
    fn epanda(&mut self, shape: LegacyShape) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.sp();
        let start_angle = self.angle()?;
        self.sp();
        let stop_angle = self.angle()?;
        self.sp();
        let angle_count = self.integer()? as i32;
        self.sp();
        let inner = self.vvalue()?;
        self.sp();
        let outer = self.vvalue()?;
        self.sp();
        let radius_count = self.integer()? as i32;
        self.sp();
        let angle = self.optangle()?;
        self.ep();
        self.finish(false)?;

        let mode = match shape {
            LegacyShape::Ellipse => self.ctx.local.epanda,
            LegacyShape::Box => self.ctx.local.bpanda,
        };
        let (angles, radii, angle) = match mode {
            PandaMode::Ignore => {
                debug!(?shape, "panda marked ignore, not drawn");
                return Ok(());
            }
            PandaMode::Normal => (
                Spread::Range { start: start_angle, stop: stop_angle, count: angle_count },
                Spread::Range { start: inner, stop: outer, count: radius_count },
                angle,
            ),
            PandaMode::Explicit => (
                Spread::List(self.ctx.angles.to_vec()),
                Spread::List(self.ctx.radii.to_vec()),
                self.ctx.panda_angle,
            ),
        };
        let marker = match shape {
            LegacyShape::Ellipse => Marker::Epanda { center, angles, radii, angle },
            LegacyShape::Box => Marker::Bpanda { center, angles, sizes: radii, angle },
        };
        self.emit(marker)
    }

    // --- Lines, Points and Polygons ---

    fn line(&mut self) -> PResult<()> {
        self.bp();
        let start = self.coord()?;
        self.sp();
        let end = self.coord()?;
        self.ep();
        self.finish(false)?;
        let arrows = self.ctx.local.style.line_arrows;
        self.emit(Marker::Line { start, end, arrows })
    }

    /// `point(x,y)`, drawn with the point shape in effect.
    fn point(&mut self) -> PResult<()> {
        self.bp();
        let center = self.coord()?;
        self.ep();
        self.finish(false)?;
        let style = &self.ctx.local.style;
        let marker = Marker::Point { center, point: style.point, size: style.point_size };
        self.emit(marker)?;
        self.reduce("shape -> POINT_ bp coord ep conjuction shapeComment");
        Ok(())
    }

    /// `circle point(x,y)` and friends.
    fn typed_point(&mut self, point: PointShape) -> PResult<()> {
        self.expect(TokenKind::Point)?;
        self.bp();
        let center = self.coord()?;
        self.ep();
        self.finish(false)?;
        let size = self.ctx.local.style.point_size;
        self.emit(Marker::Point { center, point, size })
    }

    fn polygon(&mut self) -> PResult<()> {
        self.bp();
        let mut vertices = vec![self.coord()?];
        loop {
            if self.eat(TokenKind::Comma).is_some() || COORD_START.contains(&self.peek_kind()) {
                vertices.push(self.coord()?);
            } else {
                break;
            }
        }
        self.ep();
        self.finish(false)?;
        self.emit(Marker::Polygon { vertices })
    }

    // --- Recognized but Not Drawn ---

    fn pie(&mut self) -> PResult<()> {
        self.bp();
        self.coord()?;
        self.sp();
        self.angle()?;
        self.sp();
        self.angle()?;
        self.sp();
        if self.eat(TokenKind::N).is_some() {
            self.expect(TokenKind::Equals)?;
            self.integer()?;
        } else {
            let mut count = 0;
            while ANGLE_START.contains(&self.peek_kind()) {
                self.angle()?;
                self.sp();
                count += 1;
            }
            if count > MAX_ANGLES {
                debug!(count, "pie lists more angles than DS9 keeps");
            }
        }
        self.ep();
        self.finish(false)?;
        debug!("pie is not supported, ignored");
        Ok(())
    }

    fn field(&mut self) -> PResult<()> {
        self.bp();
        self.ep();
        self.finish(false)?;
        debug!("field is not supported, ignored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::marker::{MemoryFrame, SinkEvent};
    use crate::parser::parse_regions_with;
    use crate::style::Properties;

    fn parse(src: &str) -> (MemoryFrame, Vec<String>) {
        let mut frame = MemoryFrame::new();
        let mut errors = Vec::new();
        parse_regions_with(src, &mut frame, &ParserConfig::default(), |e| errors.push(e.message.clone())).unwrap();
        (frame, errors)
    }

    fn live(src: &str) -> Vec<Marker> {
        let (frame, errors) = parse(src);
        assert!(errors.is_empty(), "unexpected errors for {:?}: {:?}", src, errors);
        frame.markers().into_iter().map(|(m, _)| m.clone()).collect()
    }

    macro_rules! assert_shape {
        ($src:expr, $pattern:pat $(if $guard:expr)?) => {
            let markers = live($src);
            assert_eq!(markers.len(), 1, "expected one marker for {:?}, got {:?}", $src, markers);
            assert!(matches!(markers[0], $pattern $(if $guard)?), "unexpected marker for {:?}: {:?}", $src, markers[0]);
        };
    }

    fn v(x: f64, y: f64) -> Vector {
        Vector::new(x, y)
    }

    #[test]
    fn test_ellipse_forms() {
        assert_shape!("ellipse(1,1,2,3)", Marker::Ellipse { angle, .. } if angle == 0.0);
        assert_shape!("ellipse 1 1 2 3 0", Marker::Ellipse { radius, .. } if radius == v(2.0, 3.0));
        assert_shape!(
            "ellipse(1,1,2,3,4,6)",
            Marker::EllipseAnnulus { radii: Spread::Range { count: 1, .. }, .. }
        );
        assert_shape!(
            "ellipse(1,1,2,3,4,6,n=3,0)",
            Marker::EllipseAnnulus { radii: Spread::Range { count: 3, .. }, .. }
        );
        let markers = live("ellipse(1,1,2,3,4,6,8,9,0)");
        match &markers[0] {
            Marker::EllipseAnnulus { radii: Spread::List(radii), .. } => {
                assert_eq!(radii, &vec![v(2.0, 3.0), v(4.0, 6.0), v(8.0, 9.0)]);
            }
            other => panic!("expected explicit ellipse annulus, got {:?}", other),
        }
    }

    #[test]
    fn test_box_forms() {
        assert_shape!("box(1,1,2,3,45)", Marker::Box { size, .. } if size == v(2.0, 3.0));
        assert_shape!("rotbox(1,1,2,3,45)", Marker::Box { .. });
        assert_shape!("box(1,1,2,3,4,6,30)", Marker::BoxAnnulus { sizes: Spread::Range { count: 1, .. }, .. });
        assert_shape!("box(1,1,2,3,4,6,8,9)", Marker::BoxAnnulus { sizes: Spread::List(_), .. });
        assert_shape!("box point 1 1", Marker::Point { point: PointShape::Box, .. });
    }

    #[test]
    fn test_bad_radius_lists() {
        let (_, errors) = parse("ellipse(1,1,2)\nellipse(1,1,2,3,4,n=2)\nellipse(1,1,2p,3i)\nellipse(1,1,2r,3)\n");
        assert_eq!(errors, vec![
            "syntax error, unexpected ')'".to_string(),
            "syntax error, unexpected N_".to_string(),
            "syntax error, unexpected IMGCOORD, expecting PHYCOORD".to_string(),
            "syntax error, unexpected ANGRADIAN".to_string(),
        ]);
    }

    #[test]
    fn test_annulus_forms() {
        assert_shape!("annulus(1,1,2,4)", Marker::Annulus { radii: Spread::Range { count: 1, .. }, .. });
        assert_shape!("annulus(1,1,2,4,n=4)", Marker::Annulus { radii: Spread::Range { count: 4, .. }, .. });
        let markers = live("annulus(1,1,2,4,6,8)");
        assert!(matches!(&markers[0], Marker::Annulus { radii: Spread::List(r), .. } if r == &vec![2.0, 4.0, 6.0, 8.0]));
    }

    #[test]
    fn test_pandas() {
        assert_shape!(
            "cpanda(1,1,0,360,4,2,6,2)",
            Marker::Cpanda { angles: Spread::Range { count: 4, .. }, radii: Spread::Range { count: 2, .. }, .. }
        );
        assert!(live("cpanda(1,1,0,360,4,2,6,2) # panda=ignore").is_empty());
        assert_shape!(
            "epanda(1,1,0,360,4,2,3,4,6,2,30)",
            Marker::Epanda { radii: Spread::Range { start, .. }, .. } if start == v(2.0, 3.0)
        );
        let markers = live("bpanda(1,1,0,360,4,2,3,4,6,2) # bpanda=(0 90 180)(2 3 4 6)(45)");
        match &markers[0] {
            Marker::Bpanda { angles: Spread::List(angles), sizes: Spread::List(sizes), angle, .. } => {
                assert_eq!(angles.len(), 3);
                assert_eq!(sizes, &vec![v(2.0, 3.0), v(4.0, 6.0)]);
                assert!((angle - 45f64.to_radians()).abs() < 1e-12);
            }
            other => panic!("expected explicit bpanda, got {:?}", other),
        }
    }

    #[test]
    fn test_points_lines_polygons() {
        assert_shape!("x point(1,2)", Marker::Point { point: PointShape::X, size: 11, .. });
        assert_shape!("circle point 1 2", Marker::Point { point: PointShape::Circle, .. });
        assert_shape!("point(1,2) # point=arrow 5", Marker::Point { point: PointShape::Arrow, size: 5, .. });
        assert_shape!("line(1,2,3,4)", Marker::Line { arrows: [false, false], .. });
        let markers = live("polygon(1,1,2,1 2,2,1,2)");
        assert!(matches!(&markers[0], Marker::Polygon { vertices } if vertices.len() == 4 && vertices[2] == v(2.0, 2.0)));
    }

    #[test]
    fn test_text_and_nonshapes() {
        let (frame, errors) = parse("text(1,2,{Hello}) # text={Override}\ntext 1 2 {Plain}\n# text(3,4) textangle=30\n");
        assert!(errors.is_empty(), "{:?}", errors);
        let live = frame.markers();
        assert_eq!(live.len(), 3);
        assert_eq!(live[0].1.text, "Override");
        assert_eq!(live[1].1.text, "Plain");
        assert!(matches!(live[2].0, Marker::Text { angle, .. } if (angle - 30f64.to_radians()).abs() < 1e-12));

        assert_shape!("# composite(1,1,0) composite=0", Marker::Composite { global: false, .. });
        assert_shape!("projection(1,1,5,5,2)", Marker::Projection { width, .. } if width == 2.0);
        assert_shape!("circle3d(1,1,5)", Marker::Circle3d { .. });
        assert_shape!("# vector(1,1,5,0)", Marker::Vector { arrow: true, .. });
    }

    #[test]
    fn test_pie_and_field_are_ignored() {
        assert!(live("pie(1,1,0,90)\npie(1,1,0,90,180,270)\npie(1,1,0,90,n=4)\nfield()\n").is_empty());
    }

    #[test]
    fn test_include_and_exclude() {
        let (frame, _) = parse("-circle(1,1,1)\n+circle(1,1,1)\n");
        let live = frame.markers();
        assert!(!live[0].1.props.contains(Properties::INCLUDE));
        assert!(live[1].1.props.contains(Properties::INCLUDE));
    }

    #[test]
    fn test_conjunction_keeps_composite_open() {
        let (frame, _) = parse("circle(1,1,1) ||\ncircle(2,2,2) &&\ncircle(3,3,3)\ncircle(4,4,4)\n");
        let resets = frame.events.iter().filter(|e| matches!(e, SinkEvent::ResetComposite)).count();
        assert_eq!(resets, 2);
        assert!(matches!(frame.events[0], SinkEvent::ResetComposite));
    }
}
