//! Colorspace metadata carried by frames and negotiated with the display.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Csp {
    #[default]
    Auto,
    Bt601,
    Bt709,
    Smpte240m,
    Rgb,
}

impl Csp {
    /// Luma weights (Kr, Kb) for YUV <-> RGB conversion.
    pub fn coefficients(&self) -> (f32, f32) {
        match self {
            Csp::Bt709 | Csp::Rgb => (0.2126, 0.0722),
            Csp::Smpte240m => (0.2122, 0.0865),
            Csp::Auto | Csp::Bt601 => (0.299, 0.114),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CspLevels {
    #[default]
    Auto,
    /// Limited range, 16-235 luma
    Tv,
    /// Full range
    Pc,
}

/// Colorspace settings of the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CspDetails {
    pub format: Csp,
    pub levels_in: CspLevels,
    pub levels_out: CspLevels,
}

impl Default for CspDetails {
    fn default() -> Self {
        Self {
            format: Csp::Bt601,
            levels_in: CspLevels::Tv,
            levels_out: CspLevels::Pc,
        }
    }
}

/// Convert an 8-bit RGB color to limited-range YUV in the given colorspace.
pub fn rgb_to_yuv(rgb: [u8; 3], csp: Csp) -> [u8; 3] {
    let (kr, kb) = csp.coefficients();
    let kg = 1.0 - kr - kb;
    let [r, g, b] = rgb.map(|v| v as f32 / 255.0);
    let y = kr * r + kg * g + kb * b;
    let u = (b - y) / (2.0 * (1.0 - kb));
    let v = (r - y) / (2.0 * (1.0 - kr));
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(16.0 + 219.0 * y),
        clamp(128.0 + 224.0 * u),
        clamp(128.0 + 224.0 * v),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white_map_to_limited_range() {
        assert_eq!(rgb_to_yuv([0, 0, 0], Csp::Bt601), [16, 128, 128]);
        assert_eq!(rgb_to_yuv([255, 255, 255], Csp::Bt709), [235, 128, 128]);
    }

    #[test]
    fn test_red_has_high_v() {
        let [_, u, v] = rgb_to_yuv([255, 0, 0], Csp::Bt601);
        assert!(v > 200);
        assert!(u < 128);
    }
}
