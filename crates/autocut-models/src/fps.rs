//! The supported frame-rate grid for EDL export.
//!
//! Exporters need exact rational frame durations, so the accepted rates are
//! a closed enum rather than a free-form float. NTSC members carry their
//! 1001-denominator rationals.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A frame rate from the supported export grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, JsonSchema)]
pub enum FrameRate {
    /// 24000/1001 (23.976)
    Film23_976,
    /// 24
    Film24,
    /// 25
    Pal25,
    /// 30000/1001 (29.97)
    Ntsc29_97,
    /// 30
    #[default]
    Std30,
    /// 50
    Pal50,
    /// 60000/1001 (59.94)
    Ntsc59_94,
    /// 60
    Std60,
}

impl FrameRate {
    /// All supported rates, for error messages.
    pub const ALL: [FrameRate; 8] = [
        FrameRate::Film23_976,
        FrameRate::Film24,
        FrameRate::Pal25,
        FrameRate::Ntsc29_97,
        FrameRate::Std30,
        FrameRate::Pal50,
        FrameRate::Ntsc59_94,
        FrameRate::Std60,
    ];

    /// Exact frames-per-second as (numerator, denominator).
    pub fn as_rational(&self) -> (u32, u32) {
        match self {
            FrameRate::Film23_976 => (24000, 1001),
            FrameRate::Film24 => (24, 1),
            FrameRate::Pal25 => (25, 1),
            FrameRate::Ntsc29_97 => (30000, 1001),
            FrameRate::Std30 => (30, 1),
            FrameRate::Pal50 => (50, 1),
            FrameRate::Ntsc59_94 => (60000, 1001),
            FrameRate::Std60 => (60, 1),
        }
    }

    /// Frames per second as a float, for frame rounding.
    pub fn as_f64(&self) -> f64 {
        let (num, den) = self.as_rational();
        num as f64 / den as f64
    }

    /// Integer timebase for the legacy editor XML (`round(fps)`).
    pub fn timebase(&self) -> u32 {
        self.as_f64().round() as u32
    }

    /// Whether this rate belongs to the NTSC family (1001-denominator).
    pub fn is_ntsc(&self) -> bool {
        self.as_rational().1 == 1001
    }

    /// Frame duration in seconds as (numerator, denominator).
    ///
    /// NTSC rates produce the `1001/N` form required by the structural XML.
    pub fn frame_duration(&self) -> (u32, u32) {
        let (num, den) = self.as_rational();
        (den, num)
    }

    /// Parse from the numeric value accepted in upload options.
    pub fn from_value(value: f64) -> Option<Self> {
        FrameRate::ALL
            .into_iter()
            .find(|rate| (rate.as_f64() - value).abs() < 0.001)
    }

    /// Canonical display value (e.g. "29.97", "30").
    pub fn display_value(&self) -> &'static str {
        match self {
            FrameRate::Film23_976 => "23.976",
            FrameRate::Film24 => "24",
            FrameRate::Pal25 => "25",
            FrameRate::Ntsc29_97 => "29.97",
            FrameRate::Std30 => "30",
            FrameRate::Pal50 => "50",
            FrameRate::Ntsc59_94 => "59.94",
            FrameRate::Std60 => "60",
        }
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_value())
    }
}

// Upload options carry fps as a bare number ("fps": 29.97); serialize the
// same way so settings round-trip through job records.
impl Serialize for FrameRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for FrameRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        FrameRate::from_value(value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unsupported fps {}; supported: 23.976, 24, 25, 29.97, 30, 50, 59.94, 60",
                value
            ))
        })
    }
}
