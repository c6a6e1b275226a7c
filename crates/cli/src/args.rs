//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;
use mapmirror_core::config::{FeatureOverrides, Overrides};

/// Mirror an interactive map site into a static, content-addressed snapshot
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output directory (default: dist)
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub outdir: Option<PathBuf>,

    /// Site origin, e.g. https://map.example.com
    #[arg(long)]
    pub origin: Option<String>,

    /// TOML config file (default: $MAPMIRROR_CONFIG_FILE)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Skip the tile pyramids
    #[arg(long)]
    pub no_tiles: bool,

    /// Skip the top-level asset images
    #[arg(long)]
    pub no_assets: bool,

    /// Skip zone documents and marker media
    #[arg(long)]
    pub no_zones: bool,

    /// Skip zone icons and island images
    #[arg(long)]
    pub no_zone_icons: bool,

    /// Re-fetch everything, keeping previous artifacts on failure
    #[arg(long)]
    pub refresh: bool,

    /// Never reuse files already present in the output directory
    #[arg(long)]
    pub no_cache_reuse: bool,

    /// Maximum in-flight requests per phase
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Command-line layer of the configuration.
    ///
    /// Flags that were not given stay unset so the config file and
    /// environment still apply.
    pub fn overrides(&self, origin: Option<String>) -> Overrides {
        Overrides {
            origin,
            outdir: self.outdir.clone(),
            concurrency: self.concurrency,
            refresh: self.refresh.then_some(true),
            reuse_cache: self.no_cache_reuse.then_some(false),
            features: FeatureOverrides {
                tiles: self.no_tiles.then_some(false),
                assets: self.no_assets.then_some(false),
                zones: self.no_zones.then_some(false),
                zone_icons: self.no_zone_icons.then_some(false),
            },
        }
    }
}
