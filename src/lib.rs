//! # DS9 Regions
//!
//! A parser for SAOImage DS9 region files, written in Rust.
//! Region text is read statement by statement; every shape is resolved
//! through a [`CoordMapper`] and handed to a [`RegionSink`] as a
//! [`Marker`] with a [`MarkerStyle`] snapshot.
//!
//! ```
//! use ds9_regions::{parse_regions, Marker, MemoryFrame};
//!
//! let mut frame = MemoryFrame::new();
//! let report = parse_regions("image; circle(100,100,20) # color=red\n", &mut frame).unwrap();
//! assert_eq!(report.errors, 0);
//! let markers = frame.markers();
//! assert!(matches!(markers[0].0, Marker::Circle { radius, .. } if radius == 20.0));
//! assert_eq!(markers[0].1.color, "red");
//! ```
//!
//! Python bindings are available behind the `python` feature.

// --- Module Declaration ---
pub mod config;
pub mod coords;
pub mod error;
pub mod legacy;
pub mod lexer;
pub mod marker;
pub mod parser;
mod semantic_parsers;
pub mod style;

#[cfg(feature = "python")]
mod python;

pub use config::{OverflowPolicy, ParserConfig};
pub use coords::{CoordMapper, CoordSystem, IdentityMapper, SkyFormat, SkyFrame, Vector};
pub use error::{Error, Result, SyntaxError};
pub use marker::{Frame, Marker, MarkerStyle, MemoryFrame, RegionSink, SinkError, SinkEvent, Spread};
pub use parser::{parse_regions, parse_regions_with, ParseReport, Parser};
pub use style::{CompassStyle, PointShape, Properties, RulerStyle};
