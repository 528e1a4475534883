//! Linear RGB colors stored as `DVec3` (r, g, b in x, y, z).

use crate::DVec3;

pub type Color = DVec3;

/// Linear color from a `0xRRGGBB` sRGB-ish hex value (gamma 2.2).
pub fn hex_color(x: u32) -> Color {
    let r = ((x >> 16) & 0xff) as f64 / 255.0;
    let g = ((x >> 8) & 0xff) as f64 / 255.0;
    let b = (x & 0xff) as f64 / 255.0;
    Color::new(r, g, b).powf(2.2)
}

/// Approximate color of a black body at `kelvin` degrees.
pub fn kelvin(kelvin: f64) -> Color {
    let red = if kelvin >= 6600.0 {
        let x = kelvin / 100.0 - 55.0;
        351.976_905_668_056_93 + 0.114_206_453_784_165 * x - 40.253_663_091_321_27 * x.ln()
    } else {
        255.0
    };
    let green = if kelvin >= 6600.0 {
        let x = kelvin / 100.0 - 50.0;
        325.449_412_571_197_4 + 0.079_434_565_366_623_42 * x - 28.085_296_350_795_7 * x.ln()
    } else if kelvin >= 1000.0 {
        let x = kelvin / 100.0 - 2.0;
        -155.254_855_627_091_79 - 0.445_969_504_695_791_33 * x + 104.492_161_993_938_88 * x.ln()
    } else {
        0.0
    };
    let blue = if kelvin >= 6600.0 {
        255.0
    } else if kelvin >= 2000.0 {
        let x = kelvin / 100.0 - 10.0;
        -254.769_351_841_209_02 + 0.827_409_606_400_739_5 * x + 115.679_944_010_661_47 * x.ln()
    } else {
        0.0
    };
    (Color::new(red, green, blue) / 255.0).clamp(Color::ZERO, Color::ONE)
}

/// Linear blend: `pct = 0` gives `a`, `pct = 1` gives `b`.
pub fn mix(a: Color, b: Color, pct: f64) -> Color {
    a * (1.0 - pct) + b * pct
}
