//! Hex color parsing and CIE L*C*h interpolation.

use crate::error::{MicroshadesError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rgb::RGB8;
use std::f64::consts::PI;

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#?([0-9A-Fa-f]{6})$").unwrap();
}

const EPS0: f64 = 6. / 29.;
const EPS: f64 = EPS0 * EPS0 * EPS0;
const TWO_PI: f64 = 2. * PI;

/// Build a color from a `0xRRGGBB` literal.
#[inline]
pub const fn from_u32(rgb: u32) -> RGB8 {
    RGB8 {
        r: ((rgb >> 16) & 0xff) as u8,
        g: ((rgb >> 8) & 0xff) as u8,
        b: (rgb & 0xff) as u8,
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) string.
pub fn parse_hex(s: &str) -> Result<RGB8> {
    let caps = HEX_COLOR
        .captures(s.trim())
        .ok_or_else(|| MicroshadesError::InvalidInput(format!("'{}' is not a hex color", s)))?;
    let value = u32::from_str_radix(&caps[1], 16)
        .map_err(|_| MicroshadesError::InvalidInput(format!("'{}' is not a hex color", s)))?;
    Ok(from_u32(value))
}

/// Format a color as an uppercase `#RRGGBB` string.
pub fn to_hex(c: RGB8) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}

/// WCAG relative luminance in [0, 1]; lower is darker.
pub fn relative_luminance(c: RGB8) -> f64 {
    let r = srgb_to_linear(c.r);
    let g = srgb_to_linear(c.g);
    let b = srgb_to_linear(c.b);
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

fn srgb_to_linear(v: u8) -> f64 {
    let v = v as f64 / 255.;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f64) -> u8 {
    let v = v.clamp(0., 1.);
    let s = if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1. / 2.4) - 0.055
    };
    (s * 255.).round().clamp(0., 255.) as u8
}

/// A color in CIE L*C*h*_ab (D50 white).
#[derive(Clone, Copy, Debug)]
struct Lch {
    l: f64,
    c: f64,
    /// Hue in radians, in [0, 2π).
    h: f64,
}

impl Lch {
    fn from_rgb(c: RGB8) -> Lch {
        const C0: f64 = 1. / 3.;
        const C1: f64 = 841. / 108.;
        const C2: f64 = 4. / 29.;
        let (r, g, b) = (srgb_to_linear(c.r), srgb_to_linear(c.g), srgb_to_linear(c.b));
        let xr = 0.4522795 * r + 0.3993744 * g + 0.1483460 * b;
        let yr = 0.2225105 * r + 0.7168863 * g + 0.0606032 * b;
        let zr = 0.0168820 * r + 0.1176865 * g + 0.8654315 * b;
        let fx = if xr > EPS { xr.powf(C0) } else { C1 * xr + C2 };
        let fy = if yr > EPS { yr.powf(C0) } else { C1 * yr + C2 };
        let fz = if zr > EPS { zr.powf(C0) } else { C1 * zr + C2 };
        let l = 116. * fy - 16.;
        let a = 500. * (fx - fy);
        let b = 200. * (fy - fz);
        let h = {
            let h = b.atan2(a);
            if h < 0. { h + TWO_PI } else { h }
        };
        Lch { l, c: a.hypot(b), h }
    }

    fn to_rgb(self) -> RGB8 {
        const C0: f64 = 108. / 841.;
        const C1: f64 = 4. / 29.;
        let a = self.c * self.h.cos();
        let b = self.c * self.h.sin();
        let fy = (self.l + 16.) / 116.;
        let fx = a / 500. + fy;
        let fz = fy - b / 200.;
        let fx1 = if fx > EPS0 { fx * fx * fx } else { C0 * (fx - C1) };
        let fy1 = if fy > EPS0 { fy * fy * fy } else { C0 * (fy - C1) };
        let fz1 = if fz > EPS0 { fz * fz * fz } else { C0 * (fz - C1) };
        let r = 3.0215932 * fx1 - 1.6168777 * fy1 - 0.4047152 * fz1;
        let g = -0.9437222 * fx1 + 1.9161365 * fy1 + 0.0275856 * fz1;
        let b = 0.0693906 * fx1 - 0.2290271 * fy1 + 1.1596365 * fz1;
        RGB8 {
            r: linear_to_srgb(r),
            g: linear_to_srgb(g),
            b: linear_to_srgb(b),
        }
    }
}

/// Color at `t` ∈ [0, 1] on the L*C*h gradient from `c0` to `c1`,
/// travelling the short way around the hue circle. The end points are
/// returned unchanged.
pub fn interpolate(c0: RGB8, c1: RGB8, t: f64) -> RGB8 {
    if t <= 0. {
        return c0;
    }
    if t >= 1. {
        return c1;
    }
    let lch0 = Lch::from_rgb(c0);
    let lch1 = Lch::from_rgb(c1);
    let (h0, h1) = (lch0.h, lch1.h);
    let dh = if h1 > h0 && h1 - h0 > PI {
        h1 - (h0 + TWO_PI)
    } else if h1 < h0 && h0 - h1 > PI {
        h1 + TWO_PI - h0
    } else {
        h1 - h0
    };
    Lch {
        l: lch0.l + t * (lch1.l - lch0.l),
        c: lch0.c + t * (lch1.c - lch0.c),
        h: lch0.h + t * dh,
    }
    .to_rgb()
}
