//! Recorder-relative coordinates to target-screen pixels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ScreenSize {
    type Err = String;

    /// `1920x1080` (also accepts `X` or `*` as separator)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X', '*'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width: u32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
        if width == 0 || height == 0 {
            return Err(format!("screen size must be non-zero, got '{}'", s));
        }
        Ok(Self { width, height })
    }
}

/// How the recorder expressed positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateSpace {
    /// Both axes are fractions of the short side. In landscape the first
    /// component runs along the vertical pixel axis.
    #[default]
    ShortSide,
    /// Each axis is a fraction of its own dimension.
    PerAxis,
}

impl FromStr for CoordinateSpace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short-side" | "shortside" | "short" => Ok(Self::ShortSide),
            "per-axis" | "peraxis" | "axis" => Ok(Self::PerAxis),
            other => Err(format!("unknown coordinate space '{}' (short-side|per-axis)", other)),
        }
    }
}

/// Map a relative position onto `screen`, clamping each axis to the screen.
pub fn to_pixels(rel_x: f64, rel_y: f64, screen: ScreenSize, space: CoordinateSpace) -> (i32, i32) {
    let w = f64::from(screen.width);
    let h = f64::from(screen.height);
    let (px, py) = match space {
        CoordinateSpace::ShortSide if screen.is_landscape() => (rel_y * h, rel_x * h),
        CoordinateSpace::ShortSide => (rel_x * w, rel_y * w),
        CoordinateSpace::PerAxis => (rel_x * w, rel_y * h),
    };
    (clamp(px, screen.width), clamp(py, screen.height))
}

fn clamp(pixel: f64, dim: u32) -> i32 {
    let max = dim.saturating_sub(1).min(i32::MAX as u32) as i32;
    // `as` truncates toward zero and saturates NaN to 0
    (pixel as i64).clamp(0, i64::from(max)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDSCAPE: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn short_side_landscape_swaps_axes() {
        assert_eq!(to_pixels(0.25, 1.5, LANDSCAPE, CoordinateSpace::ShortSide), (1620, 270));
    }

    #[test]
    fn short_side_portrait_scales_by_width() {
        let portrait = ScreenSize::new(1080, 1920);
        assert_eq!(to_pixels(0.5, 1.0, portrait, CoordinateSpace::ShortSide), (540, 1080));
    }

    #[test]
    fn per_axis() {
        assert_eq!(to_pixels(0.5, 0.5, LANDSCAPE, CoordinateSpace::PerAxis), (960, 540));
    }

    #[test]
    fn clamps_each_axis() {
        assert_eq!(to_pixels(2.0, 3.0, LANDSCAPE, CoordinateSpace::ShortSide), (1919, 1079));
        assert_eq!(to_pixels(-1.0, -0.1, LANDSCAPE, CoordinateSpace::PerAxis), (0, 0));
    }

    #[test]
    fn parse_screen_size() {
        assert_eq!("1280x720".parse::<ScreenSize>(), Ok(ScreenSize::new(1280, 720)));
        assert_eq!(" 720 X 1280 ".parse::<ScreenSize>(), Ok(ScreenSize::new(720, 1280)));
        assert!("0x10".parse::<ScreenSize>().is_err());
        assert!("wide".parse::<ScreenSize>().is_err());
    }

    #[test]
    fn parse_space() {
        assert_eq!("per-axis".parse::<CoordinateSpace>(), Ok(CoordinateSpace::PerAxis));
        assert_eq!("Short-Side".parse::<CoordinateSpace>(), Ok(CoordinateSpace::ShortSide));
        assert!("diagonal".parse::<CoordinateSpace>().is_err());
    }
}
