//! # Legacy Annulus Accumulation
//!
//! Old SAOimage files spell an elliptical (or box) annulus as an ellipse
//! followed by more radii, either as `& !ellipse(...)` or as bare radius
//! pairs on the following lines:
//!
//! ```text
//! ellipse(100,100,20,10,0)
//! 30,15
//! 40,20
//! ```
//!
//! The first ellipse is drawn immediately. Once a continuation shows up it
//! becomes provisional: at the end of the next conjunction it is deleted and
//! replaced by a single annulus built from every accumulated radius.

use crate::coords::Vector;
use crate::marker::{Marker, MarkerStyle, Spread};
use tracing::debug;

pub const MAX_ANNULI: usize = 512;
pub const MAX_ANGLES: usize = 720;

// --- Bounded Lists ---

/// A list that silently refuses entries beyond its capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedList<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedList<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedList { items: Vec::new(), capacity }
    }

    /// Appends `item`; returns false when the list is already full.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.len() >= self.capacity {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> BoundedList<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

// --- State Machine ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyShape {
    Ellipse,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyStatus {
    Inactive,
    /// A lone shape was drawn and may still be continued.
    Seen(LegacyShape),
    /// Continuations have been collected and await commit.
    Accumulating(LegacyShape),
}

/// Marker to emit when an accumulation ends.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyCommit {
    /// Whether the provisional single shape must be deleted first.
    pub delete_provisional: bool,
    pub marker: Marker,
    pub style: MarkerStyle,
}

#[derive(Debug, Clone)]
pub struct LegacyAnnulus {
    status: LegacyStatus,
    center: Vector,
    radii: BoundedList<Vector>,
    angle: f64,
    style: Option<MarkerStyle>,
    provisional: bool,
}

impl Default for LegacyAnnulus {
    fn default() -> Self {
        Self::new(MAX_ANNULI)
    }
}

impl LegacyAnnulus {
    pub fn new(capacity: usize) -> Self {
        LegacyAnnulus {
            status: LegacyStatus::Inactive,
            center: Vector::default(),
            radii: BoundedList::new(capacity),
            angle: 0.0,
            style: None,
            provisional: false,
        }
    }

    pub fn status(&self) -> LegacyStatus {
        self.status
    }

    /// Whether a bare radius pair may start the next statement.
    pub fn on_shape_start(&self) -> bool {
        self.status != LegacyStatus::Inactive
    }

    /// A lone ellipse or box was parsed and is about to be drawn.
    pub fn on_shape_complete(
        &mut self,
        shape: LegacyShape,
        center: Vector,
        radius: Vector,
        angle: f64,
        style: MarkerStyle,
    ) {
        self.status = LegacyStatus::Seen(shape);
        self.center = center;
        self.angle = angle;
        self.radii.clear();
        self.radii.push(radius);
        self.style = Some(style);
        self.provisional = true;
    }

    /// `& !ellipse(...)` on a line with no preceding ellipse: the outer
    /// shape opens a new accumulation without a provisional marker.
    pub fn begin_without_marker(
        &mut self,
        shape: LegacyShape,
        center: Vector,
        radius: Vector,
        angle: f64,
        style: MarkerStyle,
    ) {
        self.on_shape_complete(shape, center, radius, angle, style);
        self.provisional = false;
    }

    /// One more radius. Returns false if it was dropped for lack of room.
    pub fn on_continuation(&mut self, radius: Vector) -> bool {
        let shape = match self.status {
            LegacyStatus::Seen(shape) | LegacyStatus::Accumulating(shape) => shape,
            LegacyStatus::Inactive => return false,
        };
        self.status = LegacyStatus::Accumulating(shape);
        let stored = self.radii.push(radius);
        if !stored {
            debug!(capacity = self.radii.capacity(), "legacy annulus radius dropped");
        }
        stored
    }

    /// End of a conjunction. Yields the annulus to draw if continuations
    /// were collected; the machine is idle afterwards either way.
    pub fn on_conjunction_end(&mut self) -> Option<LegacyCommit> {
        let status = std::mem::replace(&mut self.status, LegacyStatus::Inactive);
        let LegacyStatus::Accumulating(shape) = status else {
            return None;
        };
        let style = self.style.take()?;
        let radii = Spread::List(self.radii.to_vec());
        let marker = match shape {
            LegacyShape::Ellipse => Marker::EllipseAnnulus { center: self.center, radii, angle: self.angle },
            LegacyShape::Box => Marker::BoxAnnulus { center: self.center, sizes: radii, angle: self.angle },
        };
        debug!(shape = marker.shape_name(), rings = self.radii.len(), "committing legacy annulus");
        Some(LegacyCommit { delete_provisional: std::mem::take(&mut self.provisional), marker, style })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;

    fn style() -> MarkerStyle {
        MarkerStyle::snapshot(&Style::default(), &["t".to_string()])
    }

    #[test]
    fn test_lone_shape_never_commits() {
        let mut legacy = LegacyAnnulus::default();
        legacy.on_shape_complete(LegacyShape::Ellipse, Vector::new(1.0, 1.0), Vector::new(2.0, 3.0), 0.0, style());
        assert!(legacy.on_shape_start());
        assert_eq!(legacy.on_conjunction_end(), None);
        assert_eq!(legacy.status(), LegacyStatus::Inactive);
        assert!(!legacy.on_continuation(Vector::new(4.0, 5.0)));
    }

    #[test]
    fn test_continuations_commit_in_order() {
        let mut legacy = LegacyAnnulus::default();
        legacy.on_shape_complete(LegacyShape::Box, Vector::new(1.0, 1.0), Vector::new(2.0, 3.0), 0.5, style());
        assert!(legacy.on_continuation(Vector::new(4.0, 6.0)));
        assert!(legacy.on_continuation(Vector::new(8.0, 12.0)));
        let commit = legacy.on_conjunction_end().unwrap();
        assert!(commit.delete_provisional);
        assert_eq!(commit.style.tags, vec!["t".to_string()]);
        match commit.marker {
            Marker::BoxAnnulus { sizes: Spread::List(sizes), angle, .. } => {
                assert_eq!(sizes, vec![Vector::new(2.0, 3.0), Vector::new(4.0, 6.0), Vector::new(8.0, 12.0)]);
                assert_eq!(angle, 0.5);
            }
            other => panic!("expected box annulus, got {:?}", other),
        }
        assert_eq!(legacy.on_conjunction_end(), None);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut legacy = LegacyAnnulus::new(3);
        legacy.on_shape_complete(LegacyShape::Ellipse, Vector::default(), Vector::new(1.0, 1.0), 0.0, style());
        assert!(legacy.on_continuation(Vector::new(2.0, 2.0)));
        assert!(legacy.on_continuation(Vector::new(3.0, 3.0)));
        assert!(!legacy.on_continuation(Vector::new(4.0, 4.0)));
        let commit = legacy.on_conjunction_end().unwrap();
        assert!(matches!(commit.marker, Marker::EllipseAnnulus { radii: Spread::List(ref r), .. } if r.len() == 3));
    }

    #[test]
    fn test_bounded_list() {
        let mut list = BoundedList::new(2);
        assert!(list.push(1));
        assert!(list.push(2));
        assert!(!list.push(3));
        assert_eq!(list.as_slice(), &[1, 2]);
        list.clear();
        assert!(list.is_empty());
    }
}
