//! A complete mirror run.

use std::sync::Arc;

use mapmirror_core::{AppConfig, Error};

use crate::document::mirror_entry;
use crate::enumerate::{Enumerator, Zone};
use crate::fetch::{Fetcher, RetryPolicy, RetryingFetcher};
use crate::report::{PhaseReport, RunReport};
use crate::resource::ResourceCache;

/// Drives every phase of a run against one output directory.
pub struct Mirror {
    config: Arc<AppConfig>,
    fetcher: Arc<RetryingFetcher>,
    cache: Arc<ResourceCache>,
}

impl Mirror {
    pub fn new(config: Arc<AppConfig>, transport: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let fetcher = Arc::new(RetryingFetcher::new(transport, RetryPolicy::from(config.as_ref())));
        let cache = Arc::new(ResourceCache::new(config.clone(), fetcher.clone())?);
        Ok(Self { config, fetcher, cache })
    }

    /// Run every enabled phase in order.
    ///
    /// Phases run one after another: entry document, assets, world document,
    /// zone documents, marker media, zone icons, tiles. The first failing
    /// phase aborts the run.
    pub async fn run(&self) -> Result<RunReport, Error> {
        let features = self.config.features;
        let mut report = RunReport::default();

        tracing::info!(
            origin = self.cache.origin().as_str(),
            outdir = %self.config.outdir.display(),
            refresh = self.config.refresh,
            reuse_cache = self.config.reuse_cache,
            "starting mirror run"
        );

        record(&mut report, mirror_entry(self.cache.clone()).await?);

        let enumerator = Enumerator::new(self.cache.clone());

        if features.assets {
            record(&mut report, enumerator.assets().await?);
        }

        if features.zones || features.zone_icons || features.tiles {
            let (phase, world) = enumerator.world().await?;
            record(&mut report, phase);

            if let Some(world) = world {
                let zones = if features.zones {
                    let (phase, zones) = enumerator.zones(&world).await?;
                    record(&mut report, phase);
                    record(&mut report, enumerator.media(&world, &zones).await?);
                    zones
                } else {
                    world
                        .zone_markers()
                        .into_iter()
                        .filter_map(|m| {
                            Some(Zone { id: m.zone.clone()?, island: m.is_island(), dataset: None })
                        })
                        .collect()
                };

                if features.zone_icons {
                    record(&mut report, enumerator.zone_icons(&world).await?);
                }

                if features.tiles {
                    record(&mut report, enumerator.tiles(&zones).await?);
                }
            }
        }

        report.requests = self.fetcher.requests();
        tracing::info!(requests = report.requests, "{}", report.total());
        Ok(report)
    }
}

fn record(report: &mut RunReport, phase: PhaseReport) {
    tracing::info!("{phase}");
    report.phases.push(phase);
}
