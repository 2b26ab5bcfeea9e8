//! Slide Viewer - scripted viewing session over a procedural slide.
//!
//! This binary builds a synthetic pyramid, wires a viewer session and drives
//! it through zoom and pan steps the way an interactive surface would:
//! every content update triggers a fresh request for the visible pixels.

use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slide_viewer_core::{
    cache::CacheStats,
    config::Config,
    geometry::{Point, Size},
    render::{encode_jpeg, FrameBuffer},
    session::{ViewerSession, ViewerSettings},
    slide::{SyntheticSlide, VirtualSlide},
    view::PresentationEvent,
};

/// How long to wait for a content update before re-checking pending fetches.
const UPDATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on the time spent waiting for one frame to complete.
const FRAME_DEADLINE: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    log_configuration(&config);

    match run(&config) {
        Ok(report) => {
            log_summary(&report);
            if config.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize report: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Viewing session failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "slide_viewer_core=debug,slide_viewer=debug"
    } else {
        "slide_viewer_core=info,slide_viewer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_configuration(config: &Config) {
    info!("Configuration:");
    info!(
        "  Slide: {}x{}, {} level(s), {}px tiles, {}",
        config.width,
        config.height,
        config.levels,
        config.tile_size,
        if config.rgb { "RGB" } else { "gray" }
    );
    info!("  Viewport: {}", config.viewport_size());
    info!(
        "  Cache: {}MB, {} tiles max",
        config.cache_capacity / (1024 * 1024),
        config.cache_entries
    );
    if config.worker_threads == 0 {
        info!("  Workers: one per CPU core");
    } else {
        info!("  Workers: {}", config.worker_threads);
    }
    info!(
        "  Prefetch radius: {}px, prioritizer: {:?}",
        config.prefetch_radius, config.prioritizer
    );
    if config.read_delay_ms > 0 {
        info!("  Simulated decode latency: {}ms per tile", config.read_delay_ms);
    }
}

// =============================================================================
// Report
// =============================================================================

#[derive(Debug, Serialize)]
struct SlideReport {
    width: u32,
    height: u32,
    levels: u32,
    tile_size: u32,
    rgb: bool,
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    action: String,
    zoom: f64,
    frame_width: u32,
    frame_height: u32,
    content_updates: usize,
    elapsed_ms: u128,
    complete: bool,
}

#[derive(Debug, Serialize)]
struct SessionReport {
    slide: SlideReport,
    settings: ViewerSettings,
    steps: Vec<StepReport>,
    cache: CacheStats,
    tile_reads: usize,
    elapsed_ms: u128,
    snapshot: Option<String>,
}

// =============================================================================
// Script
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Action {
    ZoomIn(Point),
    ZoomOut(Point),
    Pan(i32, i32),
}

impl Action {
    /// Zoom into the centre a few times, look around, then back off.
    fn scripted(step: usize, viewport: Size) -> Self {
        let centre = Point::new(viewport.width as i32 / 2, viewport.height as i32 / 2);
        let third_x = viewport.width as i32 / 3;
        let third_y = viewport.height as i32 / 3;

        match step % 6 {
            0..=2 => Action::ZoomIn(centre),
            3 => Action::Pan(third_x, 0),
            4 => Action::Pan(0, third_y),
            _ => Action::ZoomOut(Point::new(third_x, third_y)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Action::ZoomIn(p) => format!("zoom in at ({}, {})", p.x, p.y),
            Action::ZoomOut(p) => format!("zoom out at ({}, {})", p.x, p.y),
            Action::Pan(dx, dy) => format!("pan by ({}, {})", dx, dy),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

fn build_slide(config: &Config) -> Arc<SyntheticSlide> {
    let tile_size = Size::new(config.tile_size, config.tile_size);
    let mut builder = SyntheticSlide::builder("synthetic-0")
        .name("Synthetic demo slide")
        .rgb(config.rgb)
        .read_delay(Duration::from_millis(config.read_delay_ms));

    for size in config.level_sizes() {
        builder = builder.level(size, tile_size);
    }

    Arc::new(builder.build())
}

fn run(config: &Config) -> Result<SessionReport, String> {
    let started = Instant::now();
    let settings = config.settings();

    let image = build_slide(config);
    let mut slide = VirtualSlide::new("synthetic");
    slide.push_image(image.clone());

    let mut session = ViewerSession::new(&settings).map_err(|e| e.to_string())?;
    session.open_slide(slide);
    session.show_image(0).map_err(|e| e.to_string())?;

    let (tx, rx) = mpsc::channel();
    session.presentation().subscribe(move |event| {
        if *event == PresentationEvent::VisibleContentUpdated {
            let _ = tx.send(());
        }
    });

    session.presentation_mut().set_viewport_size(config.viewport_size());

    let mut frame = FrameBuffer::capture(session.presentation()).map_err(|e| e.to_string())?;
    let (updates, complete) = settle(&session, &mut frame, &rx)?;
    if !complete {
        warn!("Initial frame did not complete before the deadline");
    }
    info!(
        "Initial frame {} at zoom {:.4} ({} update(s))",
        frame.size(),
        session.presentation().zoom(),
        updates
    );

    let mut steps = Vec::with_capacity(config.steps);
    for step in 0..config.steps {
        let action = Action::scripted(step, config.viewport_size());
        let step_started = Instant::now();

        let model = session.presentation_mut();
        let moved = match action {
            Action::ZoomIn(point) => model.zoom_at(1, point),
            Action::ZoomOut(point) => model.zoom_at(-1, point),
            Action::Pan(dx, dy) => {
                model.pan(dx, dy);
                Ok(())
            }
        };
        moved.map_err(|e| e.to_string())?;

        frame.refresh(session.presentation()).map_err(|e| e.to_string())?;
        let (content_updates, complete) = settle(&session, &mut frame, &rx)?;

        let report = StepReport {
            step,
            action: action.describe(),
            zoom: session.presentation().zoom(),
            frame_width: frame.size().width,
            frame_height: frame.size().height,
            content_updates,
            elapsed_ms: step_started.elapsed().as_millis(),
            complete,
        };
        debug!(
            step,
            action = %report.action,
            zoom = report.zoom,
            updates = content_updates,
            "Step finished"
        );
        steps.push(report);
    }

    let snapshot = match &config.snapshot {
        Some(path) => {
            let jpeg = encode_jpeg(&frame, config.jpeg_quality).map_err(|e| e.to_string())?;
            std::fs::write(path, &jpeg)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            info!("Wrote {} byte snapshot to {}", jpeg.len(), path.display());
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(SessionReport {
        slide: SlideReport {
            width: config.width,
            height: config.height,
            levels: config.levels,
            tile_size: config.tile_size,
            rgb: config.rgb,
        },
        settings,
        steps,
        cache: session.cache_stats(),
        tile_reads: image.read_count(),
        elapsed_ms: started.elapsed().as_millis(),
        snapshot,
    })
}

/// Re-request the visible pixels on every content update until no fetch of
/// the latest load is outstanding.
///
/// Returns the number of refreshes and whether the frame completed before
/// [`FRAME_DEADLINE`].
fn settle(
    session: &ViewerSession,
    frame: &mut FrameBuffer,
    updates: &mpsc::Receiver<()>,
) -> Result<(usize, bool), String> {
    let deadline = Instant::now() + FRAME_DEADLINE;
    let mut refreshes = 0;

    loop {
        if session.pending_fetches() == 0 {
            while updates.try_recv().is_ok() {}
            frame.refresh(session.presentation()).map_err(|e| e.to_string())?;
            refreshes += 1;

            if session.pending_fetches() == 0 {
                return Ok((refreshes, true));
            }
        }

        if Instant::now() >= deadline {
            return Ok((refreshes, false));
        }

        match updates.recv_timeout(UPDATE_POLL_INTERVAL) {
            Ok(()) => {
                while updates.try_recv().is_ok() {}
                frame.refresh(session.presentation()).map_err(|e| e.to_string())?;
                refreshes += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Ok((refreshes, session.pending_fetches() == 0));
            }
        }
    }
}

fn log_summary(report: &SessionReport) {
    let incomplete = report.steps.iter().filter(|s| !s.complete).count();

    info!("");
    info!("Session summary:");
    info!("  Steps: {} ({} incomplete)", report.steps.len(), incomplete);
    info!("  Tile reads: {}", report.tile_reads);
    info!(
        "  Cache: {} tile(s), {:.1}MB of {:.1}MB",
        report.cache.entries,
        report.cache.size_bytes as f64 / (1024.0 * 1024.0),
        report.cache.capacity_bytes as f64 / (1024.0 * 1024.0)
    );
    info!(
        "  Cache hits: {}, misses: {}",
        report.cache.hits, report.cache.misses
    );
    info!("  Elapsed: {}ms", report.elapsed_ms);
}
