//! Per-boundary mosaic pipeline.
//!
//! Each boundary moves through
//!
//! ```text
//! ComputeRange -> CheckCache -> UseCached
//!                            -> FetchMissing -> Assemble -> Done
//! ```
//!
//! Missing tiles of one boundary are fetched concurrently, bounded by a
//! semaphore. Every fetch task must finish before assembly starts, and
//! assembly places tiles by index, so completion order never affects the
//! output. Boundaries are processed one after another.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::MosaicError;
use super::session::SessionState;
use super::types::{
    BoundaryOutcome, BoundaryReport, BoundaryStatus, FailurePolicy, MosaicRequest,
    PipelineConfig, RunReport, ATTRIBUTION,
};
use crate::cache::{write_atomic, CacheError, TileCache};
use crate::coord::{
    mosaic_frame, tile_range_for, Boundary, TileIndex, TileRange, TileRangeFingerprint,
};
use crate::mosaic::{encode_jpeg_with_comment, tile_decodes, MosaicAssembler, PLACEHOLDER};
use crate::provider::{AsyncHttpClient, ProviderError, ServiceConfig, TileFetcher};

/// Outcome of fetching the missing tiles of one boundary.
#[derive(Debug, Default)]
struct FetchSummary {
    fetched: usize,
    failed: Vec<(TileIndex, ProviderError)>,
}

enum TileTaskError {
    Fetch(ProviderError),
    Cache(CacheError),
}

/// Drives boundaries through range computation, cache validation, tile
/// fetching and mosaic assembly.
pub struct MosaicOrchestrator<C> {
    fetcher: TileFetcher<C>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl<C> MosaicOrchestrator<C>
where
    C: AsyncHttpClient + 'static,
{
    pub fn new(client: C, config: PipelineConfig) -> Self {
        let fetcher = TileFetcher::new(client, config.fetch.clone());
        Self {
            fetcher,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel runs from outside.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every boundary of `request`.
    ///
    /// Per-boundary failures are reported in the returned [`RunReport`].
    /// On a real run the fingerprints in `session` are replaced with the
    /// fingerprints of boundaries that now have a complete mosaic; a dry run
    /// leaves `session` untouched.
    ///
    /// # Errors
    ///
    /// Returns early with [`MosaicError::CacheIo`] when the output directory
    /// cannot be written, and with [`MosaicError::Cancelled`] when the
    /// cancellation token fires. `session` is not modified in either case.
    pub async fn run(
        &self,
        request: &MosaicRequest,
        session: &mut SessionState,
    ) -> Result<RunReport, MosaicError> {
        if self.cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }

        let cache = TileCache::new(&request.output_dir, self.config.layout);
        let same_service = session.service_name == request.service.name
            && session.url_template == request.service.url_template;

        info!(
            boundaries = request.boundaries.len(),
            zoom = request.zoom,
            service = %request.service.name,
            run = request.run,
            output = %request.output_dir.display(),
            "Starting mosaic run"
        );

        if request.run {
            let cache = cache.clone();
            blocking(move || Ok(cache.ensure_cache_dir()?)).await?;
        }

        let mut reports = Vec::with_capacity(request.boundaries.len());
        let mut fingerprints = Vec::with_capacity(request.boundaries.len());

        for (index, boundary) in request.boundaries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(MosaicError::Cancelled);
            }
            let stored = if same_service {
                session.fingerprint_for(index).map(str::to_string)
            } else {
                None
            };

            match self
                .process_boundary(index, boundary, request, &cache, stored)
                .await
            {
                Ok((outcome, fingerprint)) => {
                    fingerprints.push(fingerprint);
                    reports.push(BoundaryReport {
                        index,
                        result: Ok(outcome),
                    });
                }
                Err(e) if e.is_fatal() => {
                    warn!(boundary = index, error = %e, "Run aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(boundary = index, error = %e, "Boundary failed");
                    fingerprints.push(None);
                    reports.push(BoundaryReport {
                        index,
                        result: Err(e),
                    });
                }
            }
        }

        if request.run {
            session.record_service(&request.service);
            session.set_fingerprints(&fingerprints);
        }

        Ok(RunReport {
            boundaries: reports,
            attribution: ATTRIBUTION,
        })
    }

    /// Runs one boundary through the state machine.
    ///
    /// Returns the outcome and, when a complete mosaic now exists, the
    /// fingerprint to remember for it.
    async fn process_boundary(
        &self,
        index: usize,
        boundary: &Boundary,
        request: &MosaicRequest,
        cache: &TileCache,
        stored: Option<String>,
    ) -> Result<(BoundaryOutcome, Option<TileRangeFingerprint>), MosaicError> {
        // ComputeRange
        let bbox = boundary.bounding_box()?;
        let range = tile_range_for(&bbox, request.zoom)?;
        let tile_count = range.tile_count();
        if tile_count > self.config.max_tiles {
            return Err(MosaicError::TooManyTiles {
                range,
                count: tile_count,
                limit: self.config.max_tiles,
            });
        }

        let layout = cache.layout();
        let service = &request.service;
        let fingerprint = layout.fingerprint(&range);
        let comment = layout.mosaic_comment(&service.name, &fingerprint);
        let mosaic_path = cache.mosaic_path(&request.prefix, index);

        debug!(boundary = index, range = %range, fingerprint = %fingerprint, "Tile range computed");

        // CheckCache
        let (valid, missing) = {
            let cache = cache.clone();
            let service_name = service.name.clone();
            let fingerprint = fingerprint.clone();
            let comment = comment.clone();
            let mosaic_path = mosaic_path.clone();
            blocking(move || {
                let tile_paths = cache.tile_paths(&service_name, &range);
                if TileCache::is_mosaic_valid(
                    stored.as_deref(),
                    &fingerprint,
                    &tile_paths,
                    &mosaic_path,
                    &comment,
                ) {
                    return Ok((true, Vec::new()));
                }
                Ok((false, unusable_tiles(&cache, &service_name, &range)?))
            })
            .await?
        };

        let mut outcome = BoundaryOutcome {
            mosaic_path: mosaic_path.clone(),
            frame: mosaic_frame(&range),
            range,
            tile_count,
            missing: missing.len(),
            fetched: 0,
            status: BoundaryStatus::Cached,
        };

        if valid {
            info!(boundary = index, path = %mosaic_path.display(), "Using existing image");
            return Ok((outcome, Some(fingerprint)));
        }

        if !request.run {
            debug!(boundary = index, missing = missing.len(), "Dry run, skipping fetch");
            outcome.status = BoundaryStatus::DryRun;
            return Ok((outcome, None));
        }

        // FetchMissing
        let total_missing = missing.len();
        let summary = self.fetch_missing(missing, service, cache).await?;
        outcome.fetched = summary.fetched;

        if self.config.failure_policy == FailurePolicy::Abort {
            let failed = summary.failed.len();
            if let Some((_, first)) = summary.failed.into_iter().next() {
                return Err(MosaicError::Network {
                    failed,
                    total: total_missing,
                    first,
                });
            }
        }

        // Assemble
        let mut assembler = MosaicAssembler::new();
        if self.config.failure_policy == FailurePolicy::Placeholder {
            assembler = assembler.with_placeholder(PLACEHOLDER);
        }
        let quality = self.config.jpeg_quality;
        let cache_for_task = cache.clone();
        let service_name = service.name.clone();
        let path = mosaic_path.clone();
        let placeholders = blocking(move || {
            let mut read_error = None;
            let assembled = assembler.assemble(&range, |tile| {
                match cache_for_task.read_tile(&service_name, tile) {
                    Ok(data) => data,
                    Err(e) => {
                        read_error.get_or_insert(e);
                        None
                    }
                }
            });
            if let Some(e) = read_error {
                return Err(MosaicError::from(e));
            }
            let assembled = assembled?;
            let data = encode_jpeg_with_comment(&assembled.image, quality, &comment)?;
            write_atomic(&path, &data)?;
            Ok(assembled.placeholders)
        })
        .await?;

        // Covers failed fetches as well as cached tiles that did not decode
        let failed = placeholders.len();
        if failed > 0 {
            warn!(
                boundary = index,
                failed = failed,
                path = %mosaic_path.display(),
                "Partial mosaic written"
            );
            outcome.status = BoundaryStatus::Partial { failed };
            Ok((outcome, None))
        } else {
            info!(
                boundary = index,
                fetched = outcome.fetched,
                path = %mosaic_path.display(),
                "Mosaic written"
            );
            outcome.status = BoundaryStatus::Built;
            Ok((outcome, Some(fingerprint)))
        }
    }

    /// Fetches `missing` tiles concurrently and writes each into the cache
    /// as soon as it arrives.
    ///
    /// Waits for every task before returning.
    async fn fetch_missing(
        &self,
        missing: Vec<TileIndex>,
        service: &ServiceConfig,
        cache: &TileCache,
    ) -> Result<FetchSummary, MosaicError> {
        if self.cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }
        let mut summary = FetchSummary::default();
        if missing.is_empty() {
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.parallel));
        let mut tasks = JoinSet::new();

        for tile in missing {
            let fetcher = self.fetcher.clone();
            let cache = cache.clone();
            let service = service.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();

            tasks.spawn(async move {
                let result = fetch_and_store(fetcher, cache, service, tile, semaphore, cancel).await;
                (tile, result)
            });
        }

        let mut cache_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => summary.fetched += 1,
                Ok((_, Err(TileTaskError::Fetch(ProviderError::Cancelled)))) => {}
                Ok((tile, Err(TileTaskError::Fetch(e)))) => summary.failed.push((tile, e)),
                Ok((_, Err(TileTaskError::Cache(e)))) => {
                    if cache_error.is_none() {
                        tasks.abort_all();
                        cache_error = Some(e);
                    }
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    if cache_error.is_none() {
                        tasks.abort_all();
                        cache_error = Some(CacheError::Task(e.to_string()));
                    }
                }
            }
        }

        if let Some(e) = cache_error {
            return Err(e.into());
        }
        if self.cancel.is_cancelled() {
            return Err(MosaicError::Cancelled);
        }

        // Failures are reported in tile order regardless of completion order
        summary.failed.sort_by_key(|(tile, _)| *tile);
        debug!(
            fetched = summary.fetched,
            failed = summary.failed.len(),
            "Tile fetch complete"
        );
        Ok(summary)
    }
}

/// Fetches one tile under a semaphore permit and stores it.
async fn fetch_and_store<C: AsyncHttpClient>(
    fetcher: TileFetcher<C>,
    cache: TileCache,
    service: ServiceConfig,
    tile: TileIndex,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> Result<(), TileTaskError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(TileTaskError::Fetch(ProviderError::Cancelled)),
        permit = semaphore.acquire_owned() => {
            permit.map_err(|_| TileTaskError::Fetch(ProviderError::Cancelled))?
        }
    };

    let data = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(TileTaskError::Fetch(ProviderError::Cancelled)),
        result = fetcher.fetch(&service.url_template, tile, service.access_header.as_deref()) => {
            result.map_err(TileTaskError::Fetch)?
        }
    };

    // Once bytes have arrived the write completes even if cancelled
    tokio::task::spawn_blocking(move || cache.write_tile(&service.name, tile, &data))
        .await
        .map_err(|e| TileTaskError::Cache(CacheError::Task(e.to_string())))?
        .map_err(TileTaskError::Cache)?;

    Ok(())
}

/// Lists the tiles of `range` that must be fetched: those not cached and
/// those whose cached file does not decode.
///
/// Undecodable files are left in place; the fresh download replaces them.
fn unusable_tiles(
    cache: &TileCache,
    service: &str,
    range: &TileRange,
) -> Result<Vec<TileIndex>, CacheError> {
    let mut tiles = Vec::new();
    for tile in range.tiles() {
        match cache.read_tile(service, tile)? {
            Some(data) if tile_decodes(&data) => {}
            Some(_) => {
                warn!(tile = %tile, "Cached tile does not decode, fetching again");
                tiles.push(tile);
            }
            None => tiles.push(tile),
        }
    }
    Ok(tiles)
}

/// Runs disk- or CPU-bound work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, MosaicError>
where
    F: FnOnce() -> Result<T, MosaicError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(CacheError::Task(e.to_string()).into()),
    }
}
