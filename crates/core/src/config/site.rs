//! Layout of the mirrored site: entry document, dataset locations and the
//! URL templates used to enumerate auxiliary resources.
//!
//! Templates are origin-relative paths with `{zone}`, `{name}`, `{z}`, `{x}`
//! and `{y}` placeholders.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteLayout {
    /// Path of the top-level HTML document on the origin.
    #[serde(default = "default_entry_path")]
    pub entry_path: String,

    /// World/overview JSON document listing the zones.
    #[serde(default = "default_world_path")]
    pub world_path: String,

    #[serde(default = "default_zone_data")]
    pub zone_data: String,

    #[serde(default = "default_zone_icon")]
    pub zone_icon: String,

    #[serde(default = "default_island_image")]
    pub island_image: String,

    #[serde(default = "default_rapport_icon")]
    pub rapport_icon: String,

    #[serde(default = "default_world_tiles")]
    pub world_tiles: String,

    #[serde(default = "default_zone_tiles")]
    pub zone_tiles: String,

    /// Zoom levels of the overworld pyramid; zoom runs `0..world_max_zoom`.
    #[serde(default = "default_world_max_zoom")]
    pub world_max_zoom: u8,

    /// Zoom levels of a zone pyramid when the zone document does not say.
    #[serde(default = "default_zone_max_zoom")]
    pub zone_max_zoom: u8,

    /// Top-level asset images mirrored at their original path.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Stylesheets hosted here are left untouched.
    #[serde(default = "default_font_hosts")]
    pub font_hosts: Vec<String>,

    /// Script sources starting with one of these are removed from the document.
    #[serde(default = "default_blocked_script_prefixes")]
    pub blocked_script_prefixes: Vec<String>,

    /// Logical names of scripts that receive the origin rewrite.
    #[serde(default = "default_interactive_scripts")]
    pub interactive_scripts: Vec<String>,

    /// Runtime variable holding the base path the mirror is served under.
    #[serde(default = "default_base_path_variable")]
    pub base_path_variable: String,
}

fn default_entry_path() -> String {
    "/".into()
}

fn default_world_path() -> String {
    "data/world.json".into()
}

fn default_zone_data() -> String {
    "data/zones/{zone}.json".into()
}

fn default_zone_icon() -> String {
    "images/zones/{zone}.png".into()
}

fn default_island_image() -> String {
    "images/islands/{zone}.png".into()
}

fn default_rapport_icon() -> String {
    "images/rapport/{name}.png".into()
}

fn default_world_tiles() -> String {
    "tiles/world/{z}/{x}/{y}.png".into()
}

fn default_zone_tiles() -> String {
    "tiles/zones/{zone}/{z}/{x}/{y}.png".into()
}

fn default_world_max_zoom() -> u8 {
    6
}

fn default_zone_max_zoom() -> u8 {
    4
}

fn default_assets() -> Vec<String> {
    ["favicon.ico", "images/logo.png", "images/marker-shadow.png", "images/compass.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_font_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()]
}

fn default_blocked_script_prefixes() -> Vec<String> {
    vec!["/cdn-cgi/".into()]
}

fn default_interactive_scripts() -> Vec<String> {
    vec!["map".into()]
}

fn default_base_path_variable() -> String {
    "window.BASE_PATH".into()
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            entry_path: default_entry_path(),
            world_path: default_world_path(),
            zone_data: default_zone_data(),
            zone_icon: default_zone_icon(),
            island_image: default_island_image(),
            rapport_icon: default_rapport_icon(),
            world_tiles: default_world_tiles(),
            zone_tiles: default_zone_tiles(),
            world_max_zoom: default_world_max_zoom(),
            zone_max_zoom: default_zone_max_zoom(),
            assets: default_assets(),
            font_hosts: default_font_hosts(),
            blocked_script_prefixes: default_blocked_script_prefixes(),
            interactive_scripts: default_interactive_scripts(),
            base_path_variable: default_base_path_variable(),
        }
    }
}

/// Substitute `{key}` placeholders in a path template.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter()
        .fold(template.to_string(), |acc, (key, value)| acc.replace(&format!("{{{key}}}"), value))
}
