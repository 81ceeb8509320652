//! Mutable state threaded through one parse.

use crate::coords::{CoordSystem, SkyFrame, Vector};
use crate::legacy::{BoundedList, LegacyAnnulus, MAX_ANGLES, MAX_ANNULI};
use crate::style::Style;

/// How a panda shape is drawn, as set by its `panda=`/`epanda=`/`bpanda=` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PandaMode {
    /// `=ignore`: the shape is parsed but not drawn.
    Ignore,
    /// Even steps from the shape's own arguments.
    Normal,
    /// Angles and radii come from the property's explicit lists.
    Explicit,
}

/// Settings that persist across statements until changed.
#[derive(Debug, Clone)]
pub struct GlobalState {
    pub system: CoordSystem,
    /// WCS that sky-frame statements switch to.
    pub wcs: CoordSystem,
    pub sky: SkyFrame,
    pub tile: i64,
    pub style: Style,
}

impl Default for GlobalState {
    fn default() -> Self {
        GlobalState {
            system: CoordSystem::Physical,
            wcs: CoordSystem::Wcs,
            sky: SkyFrame::NativeWcs,
            tile: 1,
            style: Style::default(),
        }
    }
}

/// Settings of the shape statement being parsed.
#[derive(Debug, Clone)]
pub struct LocalState {
    pub system: CoordSystem,
    pub sky: SkyFrame,
    pub style: Style,
    pub tags: Vec<String>,
    pub cpanda: PandaMode,
    pub epanda: PandaMode,
    pub bpanda: PandaMode,
}

impl LocalState {
    fn from_global(global: &GlobalState) -> Self {
        let mut style = global.style.clone();
        style.comment.clear();
        LocalState {
            system: global.system,
            sky: global.sky,
            style,
            tags: Vec::new(),
            cpanda: PandaMode::Normal,
            epanda: PandaMode::Normal,
            bpanda: PandaMode::Normal,
        }
    }
}

pub struct ParseContext {
    pub global: GlobalState,
    pub local: LocalState,
    pub legacy: LegacyAnnulus,
    /// Set by a trailing `|`: the next shape joins the current composite.
    pub composite_continues: bool,
    pub annuli: BoundedList<f64>,
    pub angles: BoundedList<f64>,
    pub radii: BoundedList<Vector>,
    pub panda_angle: f64,
}

impl Default for ParseContext {
    fn default() -> Self {
        let global = GlobalState::default();
        let local = LocalState::from_global(&global);
        ParseContext {
            global,
            local,
            legacy: LegacyAnnulus::new(MAX_ANNULI),
            composite_continues: false,
            annuli: BoundedList::new(MAX_ANNULI),
            angles: BoundedList::new(MAX_ANGLES),
            radii: BoundedList::new(MAX_ANNULI),
            panda_angle: 0.0,
        }
    }
}

impl ParseContext {
    pub fn init_global(&mut self) {
        *self = ParseContext::default();
    }

    /// Fresh local scope for the next shape statement.
    pub fn init_local(&mut self) {
        self.local = LocalState::from_global(&self.global);
    }
}
