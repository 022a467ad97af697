//! Fetch command - build mosaics for one or more bounding boxes.

use std::path::PathBuf;

use tilemosaic::cache::CacheLayout;
use tilemosaic::coord::{Boundary, GeoBoundingBox};
use tilemosaic::orchestrator::{
    BoundaryOutcome, MosaicOrchestrator, MosaicRequest, RunReport, SessionState,
    SESSION_FILE_NAME,
};
use tilemosaic::provider::AsyncReqwestClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub bboxes: Vec<String>,
    pub zoom: u8,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub user_agent: Option<String>,
    pub run: bool,
    pub service: Option<String>,
    pub layout: Option<CacheLayout>,
    pub debug: bool,
}

/// Parses `west,south,east,north` in decimal degrees.
pub fn parse_bbox(value: &str) -> Result<Boundary, CliError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(CliError::InvalidBbox(format!(
            "'{}' must have four comma-separated values: west,south,east,north",
            value
        )));
    }

    let mut coords = [0.0f64; 4];
    for (slot, part) in coords.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| CliError::InvalidBbox(format!("'{}' is not a number", part)))?;
    }

    let [west, south, east, north] = coords;
    Ok(GeoBoundingBox::new(west, south, east, north).into())
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("fetch");
    let config = runner.config();

    let boundaries = args
        .bboxes
        .iter()
        .map(|b| parse_bbox(b))
        .collect::<Result<Vec<_>, _>>()?;

    let catalog = config.load_catalog()?;
    let session_path = args.output_dir.join(SESSION_FILE_NAME);
    let mut session = SessionState::load(&session_path)?;

    let service_name = args.service.as_deref().unwrap_or(&config.service.name);
    let mut service = session.select_service(&catalog, service_name)?;
    if let Some(ua) = args.user_agent {
        service = service.with_access_header(ua);
    }

    let mut pipeline = config.pipeline_config();
    if let Some(layout) = args.layout {
        pipeline = pipeline.with_layout(layout);
    }

    println!("Service: {} ({})", service.name, service.url_template);
    println!("Zoom:    {}", args.zoom);
    println!("Output:  {}", args.output_dir.display());
    if !args.run {
        println!("Dry run: nothing will be downloaded or written (use --run)");
    }
    println!();

    let request = MosaicRequest::new(boundaries, args.zoom, &args.output_dir, service)
        .with_prefix(args.prefix)
        .with_run(args.run);

    let client = AsyncReqwestClient::with_timeout(config.download.timeout).map_err(CliError::Http)?;
    let cancel = CancellationToken::new();
    let orchestrator = MosaicOrchestrator::new(client, pipeline).with_cancellation(cancel.clone());

    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling run");
        cancel.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let report = runtime.block_on(orchestrator.run(&request, &mut session))?;

    if request.run {
        session.save(&session_path)?;
        info!(path = %session_path.display(), "Session saved");
    }

    print_report(&report);

    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            total: report.boundaries.len(),
        });
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for entry in &report.boundaries {
        match &entry.result {
            Ok(outcome) => print_outcome(entry.index, outcome),
            Err(e) => println!("[{}] FAILED: {}", entry.index, e),
        }
        println!();
    }

    println!(
        "{} boundaries, {} tiles fetched",
        report.boundaries.len(),
        report.total_fetched()
    );
    println!("{}", report.attribution);
}

fn print_outcome(index: usize, outcome: &BoundaryOutcome) {
    println!("[{}] {}", index, outcome.status);
    println!("  Mosaic: {}", outcome.mosaic_path.display());
    println!("  Range:  {}", outcome.range);
    println!(
        "  Tiles:  {} total, {} missing, {} fetched",
        outcome.tile_count, outcome.missing, outcome.fetched
    );
    let frame = outcome
        .frame
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("  Frame:  {}", frame);
}
