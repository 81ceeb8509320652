//! # Marker Commands
//!
//! What the parser asks its frame to create. Each completed shape statement
//! becomes one [`Marker`] plus a [`MarkerStyle`] snapshot handed to a
//! [`RegionSink`].

use crate::coords::{CoordMapper, CoordSystem, IdentityMapper, SkyFormat, SkyFrame, Vector};
use crate::style::{CompassStyle, PointShape, Properties, RulerStyle, Style};
use serde::Serialize;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Radii or angles of a multi-ring shape: either `count` even steps between
/// two bounds, or an explicit list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread<T> {
    Range { start: T, stop: T, count: i32 },
    List(Vec<T>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Marker {
    Text { center: Vector, angle: f64, rotate: bool },
    Composite { center: Vector, angle: f64, global: bool },
    Vector { start: Vector, length: f64, angle: f64, arrow: bool },
    Projection { start: Vector, end: Vector, width: f64 },
    Ruler { start: Vector, end: Vector, ruler: RulerStyle },
    Compass { center: Vector, radius: f64, compass: CompassStyle },
    Circle3d { center: Vector, radius: f64 },
    Circle { center: Vector, radius: f64 },
    Annulus { center: Vector, radii: Spread<f64> },
    Cpanda { center: Vector, angles: Spread<f64>, radii: Spread<f64> },
    Ellipse { center: Vector, radius: Vector, angle: f64 },
    EllipseAnnulus { center: Vector, radii: Spread<Vector>, angle: f64 },
    Epanda { center: Vector, angles: Spread<f64>, radii: Spread<Vector>, angle: f64 },
    Box { center: Vector, size: Vector, angle: f64 },
    BoxAnnulus { center: Vector, sizes: Spread<Vector>, angle: f64 },
    Bpanda { center: Vector, angles: Spread<f64>, sizes: Spread<Vector>, angle: f64 },
    Line { start: Vector, end: Vector, arrows: [bool; 2] },
    Point { center: Vector, point: PointShape, size: i32 },
    Polygon { vertices: Vec<Vector> },
}

impl Marker {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Marker::Text { .. } => "text",
            Marker::Composite { .. } => "composite",
            Marker::Vector { .. } => "vector",
            Marker::Projection { .. } => "projection",
            Marker::Ruler { .. } => "ruler",
            Marker::Compass { .. } => "compass",
            Marker::Circle3d { .. } => "circle3d",
            Marker::Circle { .. } => "circle",
            Marker::Annulus { .. } => "annulus",
            Marker::Cpanda { .. } => "cpanda",
            Marker::Ellipse { .. } => "ellipse",
            Marker::EllipseAnnulus { .. } => "ellipse_annulus",
            Marker::Epanda { .. } => "epanda",
            Marker::Box { .. } => "box",
            Marker::BoxAnnulus { .. } => "box_annulus",
            Marker::Bpanda { .. } => "bpanda",
            Marker::Line { .. } => "line",
            Marker::Point { .. } => "point",
            Marker::Polygon { .. } => "polygon",
        }
    }
}

/// Style attributes copied out of the local scope when a marker is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: String,
    pub dash: [i32; 2],
    pub width: i32,
    pub font: String,
    pub text: String,
    pub props: Properties,
    pub comment: String,
    pub tags: Vec<String>,
}

impl MarkerStyle {
    pub fn snapshot(style: &Style, tags: &[String]) -> Self {
        MarkerStyle {
            color: style.color.clone(),
            dash: style.dash,
            width: style.width,
            font: style.font.clone(),
            text: style.text.clone(),
            props: style.props,
            comment: style.comment.clone(),
            tags: tags.to_vec(),
        }
    }
}

// --- Sink Contract ---

/// Receives marker commands in statement order.
pub trait RegionSink {
    fn create(&mut self, marker: Marker, style: MarkerStyle) -> Result<(), SinkError>;

    /// Removes the most recently created marker.
    fn delete_last(&mut self) -> Result<(), SinkError>;

    /// Ends the current composite group.
    fn reset_composite(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Everything the parser needs from the image it is drawing on.
pub trait Frame: CoordMapper + RegionSink {}

impl<T: CoordMapper + RegionSink + ?Sized> Frame for T {}

// --- In-Memory Frame ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Create { marker: Marker, style: MarkerStyle },
    DeleteLast,
    ResetComposite,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MarkerRecord<'a> {
    #[serde(flatten)]
    pub marker: &'a Marker,
    pub style: &'a MarkerStyle,
}

/// Records every sink call; coordinates pass through the wrapped mapper.
#[derive(Debug, Default)]
pub struct MemoryFrame<M = IdentityMapper> {
    pub mapper: M,
    pub events: Vec<SinkEvent>,
}

impl MemoryFrame {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> MemoryFrame<M> {
    pub fn with_mapper(mapper: M) -> Self {
        MemoryFrame { mapper, events: Vec::new() }
    }

    /// Live markers paired with their style, in a shape that serializes
    /// to one flat object per marker.
    pub fn records(&self) -> Vec<MarkerRecord<'_>> {
        self.markers().into_iter().map(|(marker, style)| MarkerRecord { marker, style }).collect()
    }

    /// Markers still alive after replaying creates and deletes.
    pub fn markers(&self) -> Vec<(&Marker, &MarkerStyle)> {
        let mut live = Vec::new();
        for event in &self.events {
            match event {
                SinkEvent::Create { marker, style } => live.push((marker, style)),
                SinkEvent::DeleteLast => {
                    live.pop();
                }
                SinkEvent::ResetComposite => {}
            }
        }
        live
    }
}

impl<M: CoordMapper> CoordMapper for MemoryFrame<M> {
    fn map_to_ref(&self, v: Vector, system: CoordSystem, sky: SkyFrame) -> Vector {
        self.mapper.map_to_ref(v, system, sky)
    }

    fn map_len_to_ref(&self, d: f64, system: CoordSystem, format: SkyFormat) -> f64 {
        self.mapper.map_len_to_ref(d, system, format)
    }

    fn map_len_vec_to_ref(&self, v: Vector, system: CoordSystem, format: SkyFormat) -> Vector {
        self.mapper.map_len_vec_to_ref(v, system, format)
    }

    fn map_angle_to_ref(&self, angle: f64, system: CoordSystem, sky: SkyFrame) -> f64 {
        self.mapper.map_angle_to_ref(angle, system, sky)
    }
}

impl<M> RegionSink for MemoryFrame<M> {
    fn create(&mut self, marker: Marker, style: MarkerStyle) -> Result<(), SinkError> {
        self.events.push(SinkEvent::Create { marker, style });
        Ok(())
    }

    fn delete_last(&mut self) -> Result<(), SinkError> {
        self.events.push(SinkEvent::DeleteLast);
        Ok(())
    }

    fn reset_composite(&mut self) -> Result<(), SinkError> {
        self.events.push(SinkEvent::ResetComposite);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(r: f64) -> Marker {
        Marker::Circle { center: Vector::new(1.0, 1.0), radius: r }
    }

    #[test]
    fn test_memory_frame_replays_deletes() {
        let mut frame = MemoryFrame::new();
        let style = MarkerStyle::snapshot(&Style::default(), &["a".to_string()]);
        frame.create(circle(1.0), style.clone()).unwrap();
        frame.create(circle(2.0), style.clone()).unwrap();
        frame.delete_last().unwrap();
        frame.reset_composite().unwrap();
        let live = frame.markers();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, &circle(1.0));
        assert_eq!(live[0].1.tags, vec!["a".to_string()]);
        assert_eq!(frame.events.len(), 4);
    }

    #[test]
    fn test_marker_json_shape_tag() {
        let json = serde_json::to_value(circle(3.0)).unwrap();
        assert_eq!(json["shape"], "circle");
        assert_eq!(json["radius"], 3.0);
    }

    #[test]
    fn test_records_flatten_marker_and_style() {
        let mut frame = MemoryFrame::new();
        frame.create(circle(2.0), MarkerStyle::snapshot(&Style::default(), &[])).unwrap();
        let json = serde_json::to_value(frame.records()).unwrap();
        assert_eq!(json[0]["shape"], "circle");
        assert_eq!(json[0]["radius"], 2.0);
        assert_eq!(json[0]["style"]["color"], "green");
    }
}
