//! Bulk resource enumeration.
//!
//! Everything beyond the entry document is known upfront from the site
//! layout and the datasets the map publishes: fixed asset images, the world
//! document, one document per zone, marker media, zone icons and the tile
//! pyramids. Each phase mirrors its paths through
//! [`ResourceCache::mirror_path`] with a bounded number of in-flight
//! requests and completes when every path has been written, reused or
//! skipped as missing upstream.

pub mod dataset;
pub mod tiles;

pub use dataset::{Marker, WorldDataset, ZoneDataset, is_path_segment};
pub use tiles::{tile_coordinates, tile_count, tile_paths};

use std::collections::HashSet;
use std::sync::Arc;

use mapmirror_core::Error;
use mapmirror_core::config::{MAX_ZOOM, expand};

use crate::fetch::origin_path;
use crate::pool::run_bounded;
use crate::report::PhaseReport;
use crate::resource::ResourceCache;

/// A zone listed in the world document, with its dataset when one could be
/// mirrored.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub island: bool,
    pub dataset: Option<ZoneDataset>,
}

impl Zone {
    /// Depth of the zone's tile pyramid.
    ///
    /// A `maxZoom` above [`MAX_ZOOM`] is ignored in favour of `default`.
    pub fn max_zoom(&self, default: u8) -> u8 {
        match self.dataset.as_ref().and_then(|d| d.max_zoom) {
            Some(depth) if depth <= MAX_ZOOM => depth,
            Some(depth) => {
                tracing::warn!(zone = %self.id, max_zoom = depth, "zone maxZoom out of range, using default");
                default
            }
            None => default,
        }
    }
}

pub struct Enumerator {
    cache: Arc<ResourceCache>,
}

impl Enumerator {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self { cache }
    }

    /// Mirror the fixed list of top-level asset images.
    pub async fn assets(&self) -> Result<PhaseReport, Error> {
        let site = &self.cache.config().site;
        self.mirror_all("assets", site.assets.iter().cloned()).await
    }

    /// Mirror the world document and parse it.
    ///
    /// Returns `None` for the dataset when the document is missing upstream
    /// and was never mirrored.
    pub async fn world(&self) -> Result<(PhaseReport, Option<WorldDataset>), Error> {
        let path = self.cache.config().site.world_path.clone();
        let report = self.mirror_all("world", [path.clone()]).await?;

        let world = match self.read_local(&path).await? {
            Some(bytes) => Some(WorldDataset::parse(&path, &bytes)?),
            None => {
                tracing::warn!(path = %path, "world document unavailable, no zones to enumerate");
                None
            }
        };
        Ok((report, world))
    }

    /// Mirror every zone document listed in `world` and parse them.
    pub async fn zones(&self, world: &WorldDataset) -> Result<(PhaseReport, Vec<Zone>), Error> {
        let site = &self.cache.config().site;
        let markers = world.zone_markers();
        let paths: Vec<(String, String, bool)> = markers
            .iter()
            .filter_map(|m| {
                let id = m.zone.clone()?;
                Some((expand(&site.zone_data, &[("zone", id.as_str())]), id, m.is_island()))
            })
            .collect();

        let report = self
            .mirror_all("zones", paths.iter().map(|(path, _, _)| path.clone()))
            .await?;

        let mut zones = Vec::with_capacity(paths.len());
        for (path, id, island) in paths {
            let dataset = match self.read_local(&path).await? {
                Some(bytes) => Some(ZoneDataset::parse(&path, &bytes)?),
                None => None,
            };
            zones.push(Zone { id, island, dataset });
        }
        Ok((report, zones))
    }

    /// Mirror popup media and rapport icons referenced by any marker.
    pub async fn media(&self, world: &WorldDataset, zones: &[Zone]) -> Result<PhaseReport, Error> {
        let site = &self.cache.config().site;
        let origin = self.cache.origin();

        let markers = world
            .markers
            .iter()
            .chain(zones.iter().filter_map(|z| z.dataset.as_ref()).flat_map(|d| d.markers.iter()));

        let mut paths = Vec::new();
        for marker in markers {
            if let Some(media) = marker.media.as_deref() {
                match origin_path(origin, media) {
                    Some(path) => paths.push(path),
                    None => tracing::debug!(media, "media outside the origin, not mirrored"),
                }
            }
            match marker.rapport.as_deref() {
                Some(name) if is_path_segment(name) => paths.push(expand(&site.rapport_icon, &[("name", name)])),
                Some("") | None => {}
                Some(name) => tracing::warn!(rapport = name, "ignoring rapport icon with unusable name"),
            }
        }

        self.mirror_all("media", paths).await
    }

    /// Mirror each zone's icon, or its island image for island markers.
    pub async fn zone_icons(&self, world: &WorldDataset) -> Result<PhaseReport, Error> {
        let site = &self.cache.config().site;
        let paths: Vec<String> = world
            .zone_markers()
            .into_iter()
            .filter_map(|m| {
                let id = m.zone.as_deref()?;
                let template = if m.is_island() { &site.island_image } else { &site.zone_icon };
                Some(expand(template, &[("zone", id)]))
            })
            .collect();

        self.mirror_all("zone-icons", paths).await
    }

    /// Mirror the world tile pyramid and one pyramid per zone.
    ///
    /// A zone's depth comes from its dataset's `maxZoom`, falling back to
    /// the configured default.
    pub async fn tiles(&self, zones: &[Zone]) -> Result<PhaseReport, Error> {
        let site = &self.cache.config().site;
        let depths: Vec<(&str, u8)> = zones
            .iter()
            .map(|zone| (zone.id.as_str(), zone.max_zoom(site.zone_max_zoom)))
            .collect();

        let expected =
            tile_count(site.world_max_zoom) + depths.iter().map(|(_, depth)| tile_count(*depth)).sum::<u64>();
        tracing::info!(tiles = expected, zones = zones.len(), "enumerating tiles");

        let world_tiles = tile_paths(&site.world_tiles, None, site.world_max_zoom);
        let zone_tiles = depths
            .iter()
            .flat_map(|(id, depth)| tile_paths(&site.zone_tiles, Some(*id), *depth));

        self.mirror_all("tiles", world_tiles.chain(zone_tiles)).await
    }

    /// Mirror every distinct path through the bounded pool.
    async fn mirror_all<I>(&self, name: &str, paths: I) -> Result<PhaseReport, Error>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let unique = paths.into_iter().filter(move |p| seen.insert(p.clone()));

        let concurrency = self.cache.config().concurrency;
        let outcomes = run_bounded(concurrency, unique, |path| {
            let cache = self.cache.clone();
            async move { cache.mirror_path(&path).await }
        })
        .await?;

        Ok(PhaseReport::from_outcomes(name, outcomes))
    }

    /// Read a mirrored file, `None` if it does not exist.
    async fn read_local(&self, relative: &str) -> Result<Option<Vec<u8>>, Error> {
        let path = self.cache.local_path(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{RetryPolicy, RetryingFetcher};
    use crate::testing::StubFetcher;
    use mapmirror_core::{AppConfig, SiteLayout};
    use std::path::Path;

    const ORIGIN: &str = "https://map.example.com";

    const WORLD: &str = r#"{"markers": [
        {"zone": "vern", "type": "zone", "media": "/media/vern.jpg", "rapport": "beatrice"},
        {"zone": "tortoyk", "type": "island", "media": "https://cdn.other.net/clip.mp4"}
    ]}"#;

    fn layout() -> SiteLayout {
        SiteLayout {
            world_max_zoom: 2,
            zone_max_zoom: 1,
            assets: vec!["favicon.ico".into(), "images/logo.png".into(), "favicon.ico".into()],
            ..Default::default()
        }
    }

    fn enumerator(outdir: &Path, stub: Arc<StubFetcher>) -> Enumerator {
        let config = AppConfig {
            origin: Some(ORIGIN.into()),
            outdir: outdir.to_path_buf(),
            concurrency: 4,
            site: layout(),
            ..Default::default()
        };
        let fetcher = Arc::new(RetryingFetcher::new(stub, RetryPolicy::default()));
        Enumerator::new(Arc::new(ResourceCache::new(Arc::new(config), fetcher).unwrap()))
    }

    fn url(path: &str) -> String {
        format!("{ORIGIN}/{path}")
    }

    fn zone(id: &str, max_zoom: Option<u8>) -> Zone {
        Zone { id: id.into(), island: false, dataset: Some(ZoneDataset { markers: vec![], max_zoom }) }
    }

    #[tokio::test]
    async fn test_assets_deduplicated_and_missing_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.respond(&url("favicon.ico"), "image/x-icon", "ico");

        let report = enumerator(dir.path(), stub.clone()).assets().await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(stub.hits(&url("favicon.ico")), 1);
        assert!(dir.path().join("favicon.ico").exists());
    }

    #[tokio::test]
    async fn test_world_zones_media_icons() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.respond(&url("data/world.json"), "application/json", WORLD);
        stub.respond(
            &url("data/zones/vern.json"),
            "application/json",
            r#"{"maxZoom": 2, "markers": [{"media": "media/boss.png"}]}"#,
        );
        stub.respond(&url("media/vern.jpg"), "image/jpeg", "jpg");
        stub.respond(&url("media/boss.png"), "image/png", "png");
        stub.respond(&url("images/rapport/beatrice.png"), "image/png", "png");
        stub.respond(&url("images/zones/vern.png"), "image/png", "png");
        stub.respond(&url("images/islands/tortoyk.png"), "image/png", "png");

        let enumerator = enumerator(dir.path(), stub.clone());

        let (_, world) = enumerator.world().await.unwrap();
        let world = world.unwrap();

        let (report, zones) = enumerator.zones(&world).await.unwrap();
        assert_eq!((report.fetched, report.skipped), (1, 1));
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].dataset.as_ref().and_then(|d| d.max_zoom), Some(2));
        assert!(zones[1].dataset.is_none());
        assert!(zones[1].island);

        let media = enumerator.media(&world, &zones).await.unwrap();
        assert_eq!(media.fetched, 3);
        assert_eq!(stub.hits("https://cdn.other.net/clip.mp4"), 0);

        let icons = enumerator.zone_icons(&world).await.unwrap();
        assert_eq!(icons.fetched, 2);
        assert!(dir.path().join("images/islands/tortoyk.png").exists());
        assert!(!dir.path().join("images/zones/tortoyk.png").exists());
    }

    #[tokio::test]
    async fn test_tiles_follow_zone_depth() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let zones = vec![zone("vern", Some(2)), Zone { id: "tortoyk".into(), island: true, dataset: None }];

        let report = enumerator(dir.path(), stub.clone()).tiles(&zones).await.unwrap();

        // world: 1 + 4, vern: 1 + 4, tortoyk: 1
        assert_eq!(report.total(), 11);
        assert_eq!(stub.requests(), 11);
        assert_eq!(stub.hits(&url("tiles/zones/vern/1/1/1.png")), 1);
        assert_eq!(stub.hits(&url("tiles/zones/tortoyk/1/0/0.png")), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_zone_depth_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let zones = vec![zone("abyss", Some(40)), zone("deep", Some(MAX_ZOOM + 1))];

        assert_eq!(zones[0].max_zoom(1), 1);
        assert_eq!(zone("edge", Some(MAX_ZOOM)).max_zoom(1), MAX_ZOOM);

        let report = enumerator(dir.path(), stub.clone()).tiles(&zones).await.unwrap();

        // world: 1 + 4, each zone falls back to one level
        assert_eq!(report.total(), 7);
        assert_eq!(stub.hits(&url("tiles/zones/abyss/0/0/0.png")), 1);
        assert_eq!(stub.hits(&url("tiles/zones/abyss/1/0/0.png")), 0);
    }

    #[tokio::test]
    async fn test_unusable_rapport_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.respond(&url("images/rapport/ok.png"), "image/png", "png");
        let world =
            WorldDataset::parse("data/world.json", br#"{"markers": [{"rapport": "../../evil"}, {"rapport": "ok"}]}"#)
                .unwrap();

        let report = enumerator(dir.path(), stub.clone()).media(&world, &[]).await.unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.total(), 1);
        assert!(dir.path().join("images/rapport/ok.png").exists());
        assert_eq!(stub.requests(), 1);
    }

    #[tokio::test]
    async fn test_missing_world_yields_no_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let (report, world) = enumerator(dir.path(), stub).world().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert!(world.is_none());
    }

    #[tokio::test]
    async fn test_invalid_world_fails() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.respond(&url("data/world.json"), "application/json", "{oops");
        let err = enumerator(dir.path(), stub).world().await.unwrap_err();
        assert!(matches!(err, Error::Dataset { .. }));
    }

    #[tokio::test]
    async fn test_phase_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.fail_next(&url("favicon.ico"), 500, usize::MAX);

        let config = AppConfig {
            origin: Some(ORIGIN.into()),
            outdir: dir.path().to_path_buf(),
            max_attempts: Some(1),
            site: layout(),
            ..Default::default()
        };
        let fetcher = Arc::new(RetryingFetcher::new(stub, RetryPolicy::from(&config)));
        let enumerator = Enumerator::new(Arc::new(ResourceCache::new(Arc::new(config), fetcher).unwrap()));

        let err = enumerator.assets().await.unwrap_err();
        assert!(matches!(err, Error::FetchFailure { .. }));
    }
}
