//! # Coordinate Model
//!
//! Coordinate systems, sky frames and distance formats understood by DS9
//! region files, plus the [`CoordMapper`] contract the parser uses to turn
//! every literal into reference (image) coordinates.

use serde::Serialize;
use std::fmt;

// --- Coordinate Systems ---

/// A DS9 coordinate system. `Wcs` and the lettered slots are WCS systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSystem {
    Image,
    Physical,
    Detector,
    Amplifier,
    Wcs,
    WcsA, WcsB, WcsC, WcsD, WcsE, WcsF, WcsG, WcsH, WcsI, WcsJ, WcsK, WcsL, WcsM,
    WcsN, WcsO, WcsP, WcsQ, WcsR, WcsS, WcsT, WcsU, WcsV, WcsW, WcsX, WcsY, WcsZ,
    Wcs0,
}

const WCS_SLOTS: [CoordSystem; 26] = [
    CoordSystem::WcsA, CoordSystem::WcsB, CoordSystem::WcsC, CoordSystem::WcsD,
    CoordSystem::WcsE, CoordSystem::WcsF, CoordSystem::WcsG, CoordSystem::WcsH,
    CoordSystem::WcsI, CoordSystem::WcsJ, CoordSystem::WcsK, CoordSystem::WcsL,
    CoordSystem::WcsM, CoordSystem::WcsN, CoordSystem::WcsO, CoordSystem::WcsP,
    CoordSystem::WcsQ, CoordSystem::WcsR, CoordSystem::WcsS, CoordSystem::WcsT,
    CoordSystem::WcsU, CoordSystem::WcsV, CoordSystem::WcsW, CoordSystem::WcsX,
    CoordSystem::WcsY, CoordSystem::WcsZ,
];

impl CoordSystem {
    /// The alternate WCS slot named by `letter` (`a`..`z`, case-insensitive).
    pub fn wcs_slot(letter: char) -> Option<Self> {
        let letter = letter.to_ascii_lowercase();
        if letter.is_ascii_lowercase() {
            Some(WCS_SLOTS[(letter as u8 - b'a') as usize])
        } else {
            None
        }
    }

    pub fn is_wcs(&self) -> bool {
        !matches!(
            self,
            CoordSystem::Image | CoordSystem::Physical | CoordSystem::Detector | CoordSystem::Amplifier
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoordSystem::Image => "image",
            CoordSystem::Physical => "physical",
            CoordSystem::Detector => "detector",
            CoordSystem::Amplifier => "amplifier",
            CoordSystem::Wcs => "wcs",
            CoordSystem::Wcs0 => "wcs0",
            slot => {
                const NAMES: [&str; 26] = [
                    "wcsa", "wcsb", "wcsc", "wcsd", "wcse", "wcsf", "wcsg", "wcsh", "wcsi",
                    "wcsj", "wcsk", "wcsl", "wcsm", "wcsn", "wcso", "wcsp", "wcsq", "wcsr",
                    "wcss", "wcst", "wcsu", "wcsv", "wcsw", "wcsx", "wcsy", "wcsz",
                ];
                WCS_SLOTS
                    .iter()
                    .position(|s| s == slot)
                    .map(|i| NAMES[i])
                    .unwrap_or("wcs")
            }
        }
    }
}

impl fmt::Display for CoordSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Celestial reference frame. `NativeWcs` means "whatever the WCS says".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkyFrame {
    Fk4,
    Fk5,
    Icrs,
    Galactic,
    Ecliptic,
    NativeWcs,
}

impl SkyFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkyFrame::Fk4 => "fk4",
            SkyFrame::Fk5 => "fk5",
            SkyFrame::Icrs => "icrs",
            SkyFrame::Galactic => "galactic",
            SkyFrame::Ecliptic => "ecliptic",
            SkyFrame::NativeWcs => "nativewcs",
        }
    }

    /// Longitude-like first components are given in hours for equatorial
    /// frames only.
    pub fn uses_hours(&self) -> bool {
        !matches!(self, SkyFrame::Galactic | SkyFrame::Ecliptic)
    }
}

impl fmt::Display for SkyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit a WCS distance is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkyFormat {
    Degrees,
    Arcmin,
    Arcsec,
}

// --- Vectors ---

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64) -> Self {
        Vector { x, y }
    }
}

impl From<(f64, f64)> for Vector {
    fn from((x, y): (f64, f64)) -> Self {
        Vector { x, y }
    }
}

// --- Resolution Contract ---

/// Resolves literals written in some coordinate system into the frame's
/// reference coordinates. Angles are in radians on both sides.
pub trait CoordMapper {
    fn map_to_ref(&self, v: Vector, system: CoordSystem, sky: SkyFrame) -> Vector;

    fn map_len_to_ref(&self, d: f64, system: CoordSystem, format: SkyFormat) -> f64;

    fn map_len_vec_to_ref(&self, v: Vector, system: CoordSystem, format: SkyFormat) -> Vector {
        Vector::new(
            self.map_len_to_ref(v.x, system, format),
            self.map_len_to_ref(v.y, system, format),
        )
    }

    fn map_angle_to_ref(&self, angle: f64, system: CoordSystem, sky: SkyFrame) -> f64;
}

/// A mapper that returns every value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl CoordMapper for IdentityMapper {
    fn map_to_ref(&self, v: Vector, _system: CoordSystem, _sky: SkyFrame) -> Vector {
        v
    }

    fn map_len_to_ref(&self, d: f64, _system: CoordSystem, _format: SkyFormat) -> f64 {
        d
    }

    fn map_angle_to_ref(&self, angle: f64, _system: CoordSystem, _sky: SkyFrame) -> f64 {
        angle
    }
}

/// Literals that only make sense in a sky system (sexagesimal, `d` suffix)
/// force a pixel-like local system over to the default WCS.
pub fn check_wcs_system(local: CoordSystem) -> CoordSystem {
    if local.is_wcs() {
        local
    } else {
        CoordSystem::Wcs
    }
}

/// Companion of [`check_wcs_system`]: a pixel-like local system has no sky
/// frame, so the WCS's native frame is used.
pub fn check_wcs_sky(local: CoordSystem, sky: SkyFrame) -> SkyFrame {
    if local.is_wcs() {
        sky
    } else {
        SkyFrame::NativeWcs
    }
}
