//! The curated microshades palettes.
//!
//! Every palette holds five shades ordered from lightest to darkest. The
//! gray palette of each family is reserved for the "Other" bucket; the
//! remaining five are handed out to selected groups in a fixed order.

use super::{Palette, PaletteFamily};
use crate::error::{MicroshadesError, Result};
use lazy_static::lazy_static;

/// Maximum number of groups that can be selected for individual palettes.
pub const MAX_SELECTED_GROUPS: usize = 5;

const MICRO_GRAY: [u32; 5] = [0xD9D9D9, 0xBDBDBD, 0x969696, 0x737373, 0x525252];
const MICRO_BROWN: [u32; 5] = [0xD8C7BE, 0xCAA995, 0xB78560, 0x9E5C00, 0x7D3200];
const MICRO_GREEN: [u32; 5] = [0xC7E9C0, 0xA1D99B, 0x74C476, 0x41AB5D, 0x238B45];
const MICRO_ORANGE: [u32; 5] = [0xFEEDA0, 0xFEC44F, 0xFDAE6B, 0xFE9929, 0xFF7F00];
const MICRO_BLUE: [u32; 5] = [0xEFF3FF, 0xC6DBEF, 0x9ECAE1, 0x6BAED6, 0x4292C6];
const MICRO_PURPLE: [u32; 5] = [0xDADAEB, 0xBCBDDC, 0x9E9AC8, 0x807DBA, 0x6A51A3];

const MICRO_CVD_GRAY: [u32; 5] = [0xF5F5F5, 0xD6D6D6, 0xB7B7B7, 0x8B8B8B, 0x616161];
const MICRO_CVD_GREEN: [u32; 5] = [0xDDFFA0, 0xBDEC6F, 0x97CE2F, 0x6D9F06, 0x4E7705];
const MICRO_CVD_ORANGE: [u32; 5] = [0xFFD5AF, 0xFCB076, 0xF09163, 0xC17754, 0x9D654C];
const MICRO_CVD_BLUE: [u32; 5] = [0xE7F4FF, 0xBCE1FF, 0x7DCCFF, 0x56B4E9, 0x098BD9];
const MICRO_CVD_TURQUOISE: [u32; 5] = [0xA3E4D7, 0x48C9B0, 0x43BA8F, 0x009E73, 0x148F77];
const MICRO_CVD_PURPLE: [u32; 5] = [0xEFB6D6, 0xE794C1, 0xCC79A7, 0xB15E8C, 0x7D3560];

/// Order in which base palettes are assigned to selected groups.
const STANDARD_ORDER: [&str; MAX_SELECTED_GROUPS] =
    ["micro_green", "micro_orange", "micro_blue", "micro_purple", "micro_brown"];
const CVD_ORDER: [&str; MAX_SELECTED_GROUPS] = [
    "micro_cvd_green",
    "micro_cvd_orange",
    "micro_cvd_blue",
    "micro_cvd_turquoise",
    "micro_cvd_purple",
];

lazy_static! {
    static ref PALETTES: Vec<Palette> = {
        use PaletteFamily::{Cvd, Standard};
        vec![
            Palette::from_static("micro_gray", Standard, &MICRO_GRAY),
            Palette::from_static("micro_brown", Standard, &MICRO_BROWN),
            Palette::from_static("micro_green", Standard, &MICRO_GREEN),
            Palette::from_static("micro_orange", Standard, &MICRO_ORANGE),
            Palette::from_static("micro_blue", Standard, &MICRO_BLUE),
            Palette::from_static("micro_purple", Standard, &MICRO_PURPLE),
            Palette::from_static("micro_cvd_gray", Cvd, &MICRO_CVD_GRAY),
            Palette::from_static("micro_cvd_green", Cvd, &MICRO_CVD_GREEN),
            Palette::from_static("micro_cvd_orange", Cvd, &MICRO_CVD_ORANGE),
            Palette::from_static("micro_cvd_blue", Cvd, &MICRO_CVD_BLUE),
            Palette::from_static("micro_cvd_turquoise", Cvd, &MICRO_CVD_TURQUOISE),
            Palette::from_static("micro_cvd_purple", Cvd, &MICRO_CVD_PURPLE),
        ]
    };
}

/// All registered palettes, standard family first.
pub fn palettes() -> &'static [Palette] {
    &PALETTES
}

/// Look up a palette by name.
pub fn palette(name: &str) -> Result<&'static Palette> {
    PALETTES
        .iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| MicroshadesError::UnknownPalette(name.to_string()))
}

/// Names of the palettes in one family, in registry order.
pub fn palette_names(family: PaletteFamily) -> Vec<&'static str> {
    PALETTES
        .iter()
        .filter(|p| p.family() == family)
        .map(|p| p.name())
        .collect()
}

/// Palettes handed to selected groups, in assignment order.
pub fn base_palettes(family: PaletteFamily) -> Vec<&'static Palette> {
    let order = match family {
        PaletteFamily::Standard => &STANDARD_ORDER,
        PaletteFamily::Cvd => &CVD_ORDER,
    };
    order
        .iter()
        .filter_map(|name| PALETTES.iter().find(|p| p.name() == *name))
        .collect()
}

/// The gray palette reserved for the "Other" bucket.
pub fn gray_palette(family: PaletteFamily) -> &'static Palette {
    // Gray palettes open each family block of `PALETTES`.
    match family {
        PaletteFamily::Standard => &PALETTES[0],
        PaletteFamily::Cvd => &PALETTES[6],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::color::relative_luminance;

    #[test]
    fn test_registry_contents() {
        assert_eq!(palettes().len(), 12);
        assert_eq!(
            palette_names(PaletteFamily::Standard),
            vec![
                "micro_gray",
                "micro_brown",
                "micro_green",
                "micro_orange",
                "micro_blue",
                "micro_purple"
            ]
        );
        assert_eq!(
            palette_names(PaletteFamily::Cvd),
            vec![
                "micro_cvd_gray",
                "micro_cvd_green",
                "micro_cvd_orange",
                "micro_cvd_blue",
                "micro_cvd_turquoise",
                "micro_cvd_purple"
            ]
        );
    }

    #[test]
    fn test_standard_palette_values() {
        let expected: [(&str, [&str; 5]); 6] = [
            ("micro_gray", ["#D9D9D9", "#BDBDBD", "#969696", "#737373", "#525252"]),
            ("micro_brown", ["#D8C7BE", "#CAA995", "#B78560", "#9E5C00", "#7D3200"]),
            ("micro_green", ["#C7E9C0", "#A1D99B", "#74C476", "#41AB5D", "#238B45"]),
            ("micro_orange", ["#FEEDA0", "#FEC44F", "#FDAE6B", "#FE9929", "#FF7F00"]),
            ("micro_blue", ["#EFF3FF", "#C6DBEF", "#9ECAE1", "#6BAED6", "#4292C6"]),
            ("micro_purple", ["#DADAEB", "#BCBDDC", "#9E9AC8", "#807DBA", "#6A51A3"]),
        ];
        for (name, hexes) in expected {
            assert_eq!(palette(name).unwrap().hexes(), hexes.to_vec(), "{}", name);
        }
    }

    #[test]
    fn test_every_palette_has_five_shades() {
        for p in palettes() {
            assert_eq!(p.len(), 5, "{}", p.name());
        }
    }

    #[test]
    fn test_shades_get_darker() {
        for p in palettes() {
            let lum: Vec<f64> = p.shades().iter().map(|&c| relative_luminance(c)).collect();
            for w in lum.windows(2) {
                assert!(w[0] > w[1], "{} is not ordered light to dark", p.name());
            }
        }
    }

    #[test]
    fn test_lookup() {
        let blue = palette("micro_cvd_blue").unwrap();
        assert_eq!(blue.family(), PaletteFamily::Cvd);
        assert_eq!(blue.darkest_hex(), "#098BD9");
        assert!(matches!(
            palette("micro_red"),
            Err(MicroshadesError::UnknownPalette(_))
        ));
    }

    #[test]
    fn test_base_palettes_exclude_gray() {
        for family in [PaletteFamily::Standard, PaletteFamily::Cvd] {
            let base = base_palettes(family);
            assert_eq!(base.len(), MAX_SELECTED_GROUPS);
            assert!(base.iter().all(|p| p.family() == family));
            assert!(base.iter().all(|p| !p.name().contains("gray")));
        }
        assert_eq!(base_palettes(PaletteFamily::Cvd)[0].name(), "micro_cvd_green");
        assert_eq!(gray_palette(PaletteFamily::Cvd).name(), "micro_cvd_gray");
        assert_eq!(gray_palette(PaletteFamily::Standard).name(), "micro_gray");
    }
}
