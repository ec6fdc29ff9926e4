pub mod composer;
pub mod lighting;
pub mod style;

pub use composer::{
    BuildingTag, CampusScene, Footprint, Highlight, Hovered, Interactable, Label, PropKind, SceneProp,
    Transform3D,
};
pub use lighting::{lighting_preset, LightingPreset, LightingUniform, TimeOfDay};
pub use style::{style_geometry, StyleGeometry};

use glam::Vec3;

/// Parses `#rgb` or `#rrggbb` into linear-agnostic 0..1 components.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    let r = ((value >> 16) & 0xff) as f32 / 255.0;
    let g = ((value >> 8) & 0xff) as f32 / 255.0;
    let b = (value & 0xff) as f32 / 255.0;
    Some(Vec3::new(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_short_and_long_forms() {
        assert_eq!(parse_hex_color("#fff"), Some(Vec3::ONE));
        assert_eq!(parse_hex_color("#000000"), Some(Vec3::ZERO));
        let orange = parse_hex_color("#ff6600").unwrap();
        assert!((orange.y - 0.4).abs() < 1e-6);
        assert!(parse_hex_color("ff6600").is_none());
        assert!(parse_hex_color("#ggg").is_none());
    }
}
