//! Curated palettes for hierarchical microbiome charts.
//!
//! Palettes are fixed domain data: six standard palettes and six
//! color-vision-deficiency friendly counterparts, each ordered from the
//! lightest to the darkest shade.

pub mod color;
mod registry;

pub use registry::{
    base_palettes, gray_palette, palette, palette_names, palettes, MAX_SELECTED_GROUPS,
};

use rgb::RGB8;
use serde::{Deserialize, Serialize};

/// Which set of palettes to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteFamily {
    /// The original microshades palettes.
    Standard,
    /// Palettes distinguishable under common color vision deficiencies.
    Cvd,
}

impl PaletteFamily {
    /// Family selected by a CVD flag.
    pub fn from_cvd(cvd: bool) -> Self {
        if cvd {
            PaletteFamily::Cvd
        } else {
            PaletteFamily::Standard
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteFamily::Standard => "standard",
            PaletteFamily::Cvd => "cvd",
        }
    }
}

/// A named sequence of shades ordered lightest to darkest.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: &'static str,
    family: PaletteFamily,
    shades: Vec<RGB8>, // Invariant: non-empty
}

impl Palette {
    fn from_static(name: &'static str, family: PaletteFamily, shades: &[u32]) -> Self {
        Self {
            name,
            family,
            shades: shades.iter().map(|&c| color::from_u32(c)).collect(),
        }
    }

    /// Palette name, e.g. `micro_cvd_blue`.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn family(&self) -> PaletteFamily {
        self.family
    }

    /// Number of shades.
    #[inline]
    pub fn len(&self) -> usize {
        self.shades.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shades.is_empty()
    }

    /// Shades from lightest to darkest.
    #[inline]
    pub fn shades(&self) -> &[RGB8] {
        &self.shades
    }

    /// Shade at `index` (0 = lightest).
    pub fn shade(&self, index: usize) -> Option<RGB8> {
        self.shades.get(index).copied()
    }

    /// Shade at `index` as a `#RRGGBB` string.
    pub fn hex(&self, index: usize) -> Option<String> {
        self.shade(index).map(color::to_hex)
    }

    /// All shades as `#RRGGBB` strings, lightest first.
    pub fn hexes(&self) -> Vec<String> {
        self.shades.iter().map(|&c| color::to_hex(c)).collect()
    }

    pub fn darkest_hex(&self) -> String {
        color::to_hex(self.shades[self.shades.len() - 1])
    }

    /// Resample the palette to `n` shades, lightest to darkest.
    ///
    /// With `n` equal to the palette length the shades are returned as
    /// they are. Otherwise `n` evenly spaced points are taken along the
    /// piecewise L*C*h gradient through the palette's shades; points that
    /// land on an original shade reproduce it exactly.
    pub fn ramp(&self, n: usize) -> Vec<RGB8> {
        let len = self.shades.len();
        match n {
            0 => vec![],
            1 => vec![self.shades[len - 1]],
            _ if n == len => self.shades.clone(),
            _ => (0..n)
                .map(|k| {
                    let num = k * (len - 1);
                    let i = num / (n - 1);
                    if i >= len - 1 {
                        return self.shades[len - 1];
                    }
                    let t = (num % (n - 1)) as f64 / (n - 1) as f64;
                    color::interpolate(self.shades[i], self.shades[i + 1], t)
                })
                .collect(),
        }
    }

    /// [`Palette::ramp`] as `#RRGGBB` strings.
    pub fn ramp_hex(&self, n: usize) -> Vec<String> {
        self.ramp(n).into_iter().map(color::to_hex).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::color::relative_luminance;

    #[test]
    fn test_hexes() {
        let p = palette("micro_green").unwrap();
        assert_eq!(
            p.hexes(),
            vec!["#C7E9C0", "#A1D99B", "#74C476", "#41AB5D", "#238B45"]
        );
        assert_eq!(p.hex(4).as_deref(), Some("#238B45"));
        assert_eq!(p.hex(5), None);
    }

    #[test]
    fn test_ramp_same_length_is_identity() {
        let p = palette("micro_cvd_purple").unwrap();
        assert_eq!(p.ramp(5), p.shades().to_vec());
    }

    #[test]
    fn test_ramp_keeps_anchor_points() {
        let p = palette("micro_blue").unwrap();
        let ramp = p.ramp(9);
        assert_eq!(ramp.len(), 9);
        // Every second point of a 9-point ramp lands on a palette shade.
        for (k, shade) in p.shades().iter().enumerate() {
            assert_eq!(ramp[2 * k], *shade);
        }
    }

    #[test]
    fn test_ramp_monotone_darkening() {
        let p = palette("micro_cvd_orange").unwrap();
        let lum: Vec<f64> = p.ramp(10).iter().map(|&c| relative_luminance(c)).collect();
        for w in lum.windows(2) {
            assert!(w[0] > w[1]);
        }
    }

    #[test]
    fn test_ramp_shrink() {
        let p = palette("micro_purple").unwrap();
        let ramp = p.ramp(3);
        assert_eq!(ramp, vec![p.shades()[0], p.shades()[2], p.shades()[4]]);
        assert_eq!(p.ramp(1), vec![p.shades()[4]]);
        assert!(p.ramp(0).is_empty());
    }

    #[test]
    fn test_family_from_cvd() {
        assert_eq!(PaletteFamily::from_cvd(true), PaletteFamily::Cvd);
        assert_eq!(PaletteFamily::from_cvd(false).as_str(), "standard");
    }
}
