//! Tile pyramid enumeration.
//!
//! Zoom level `z` is a `2^z x 2^z` grid; a pyramid with `max_zoom` levels
//! covers `z` in `0..max_zoom`. Depths beyond [`MAX_ZOOM`] are clamped.

use mapmirror_core::config::{MAX_ZOOM, expand};

/// Every `(z, x, y)` coordinate of a pyramid with `max_zoom` levels.
pub fn tile_coordinates(max_zoom: u8) -> impl Iterator<Item = (u8, u32, u32)> {
    (0..max_zoom.min(MAX_ZOOM)).flat_map(|z| {
        let n = 1u32.checked_shl(u32::from(z)).unwrap_or(0);
        (0..n).flat_map(move |x| (0..n).map(move |y| (z, x, y)))
    })
}

/// Number of tiles in a pyramid with `max_zoom` levels.
pub fn tile_count(max_zoom: u8) -> u64 {
    (0..max_zoom.min(MAX_ZOOM))
        .map(|z| 1u64.checked_shl(2 * u32::from(z)).unwrap_or(0))
        .sum()
}

/// Relative paths of every tile, expanded from `template`.
///
/// `zone` fills the `{zone}` placeholder for zone pyramids.
pub fn tile_paths<'a>(template: &'a str, zone: Option<&'a str>, max_zoom: u8) -> impl Iterator<Item = String> + 'a {
    tile_coordinates(max_zoom).map(move |(z, x, y)| {
        let (z, x, y) = (z.to_string(), x.to_string(), y.to_string());
        let mut vars = vec![("z", z.as_str()), ("x", x.as_str()), ("y", y.as_str())];
        if let Some(zone) = zone {
            vars.push(("zone", zone));
        }
        expand(template, &vars)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_levels_yield_five_tiles() {
        let coords: Vec<_> = tile_coordinates(2).collect();
        assert_eq!(coords.len(), 5);
        assert_eq!(coords[0], (0, 0, 0));
        assert!(coords.contains(&(1, 1, 1)));
        assert!(!coords.iter().any(|(z, _, _)| *z >= 2));
    }

    #[test]
    fn test_depth_is_clamped() {
        assert_eq!(tile_count(40), tile_count(MAX_ZOOM));
        assert_eq!(tile_count(255), tile_count(MAX_ZOOM));
    }

    #[test]
    fn test_zero_levels_yield_nothing() {
        assert_eq!(tile_coordinates(0).count(), 0);
        assert_eq!(tile_count(0), 0);
    }

    #[test]
    fn test_tile_count_matches_enumeration() {
        for max_zoom in 0..6 {
            assert_eq!(tile_coordinates(max_zoom).count() as u64, tile_count(max_zoom));
        }
        assert_eq!(tile_count(3), 1 + 4 + 16);
    }

    #[test]
    fn test_tile_paths_expand_template() {
        let paths: Vec<_> = tile_paths("tiles/zones/{zone}/{z}/{x}/{y}.png", Some("vern"), 2).collect();
        assert_eq!(paths.len(), 5);
        assert_eq!(paths[0], "tiles/zones/vern/0/0/0.png");
        assert!(paths.contains(&"tiles/zones/vern/1/0/1.png".to_string()));
    }
}
