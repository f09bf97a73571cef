//! WSI Downsampler - Batch conversion of Whole Slide Images.
//!
//! This binary parses the command line, builds the configuration and runs
//! one command.

use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_downsampler::{
    config::{Cli, Command, ConvertArgs, InfoArgs, LocateArgs, StatsArgs},
    decode, map_small_to_large,
    stats::{collect_dimensions, collect_info, write_report},
    BatchReport, Config, Dispatcher, Downsampler, MagnificationGroups, SlideLayout, SlideStats,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.into_command() {
        Command::Convert(args) => run_convert(args).await,
        Command::Stats(args) => run_stats(args).await,
        Command::Info(args) => run_info(args).await,
        Command::Locate(args) => run_locate(args),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_downsampler=debug"
    } else {
        "wsi_downsampler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build and validate the configuration, logging any problem.
fn load_config(paths: &wsi_downsampler::config::PathArgs) -> Option<Config> {
    let config = paths.to_config();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return None;
    }
    Some(config)
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(args: ConvertArgs) -> ExitCode {
    let Some(config) = load_config(&args.paths) else {
        return ExitCode::FAILURE;
    };

    info!("Configuration:");
    info!("  Slides: {}", config.slide_dir.display());
    info!("  Images: {}", config.image_dir.display());
    info!("  Thumbnails: {}", config.thumbnail_dir.display());
    info!(
        "  Scale factor: {}, thumbnail size: {}",
        config.scale_factor, config.thumbnail_size
    );

    if let Some(id) = args.slide {
        let started = Instant::now();
        let result = Downsampler::new(config).convert(id).await;
        info!("Time elapsed: {:?}", started.elapsed());

        return match result {
            Ok(slide) => {
                println!("{}", slide.image_path.display());
                println!("{}", slide.thumbnail_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let total = match SlideLayout::new(&config).count_slides().await {
        Ok(total) => total,
        Err(e) => {
            error!("Cannot list slides in {}: {}", config.slide_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let workers = if args.single { 1 } else { config.workers };
    info!("  Slides found: {}", total);
    info!("  Workers: {}", workers.min(total as usize).max(1));

    let dispatcher = Dispatcher::new(Downsampler::new(config));
    let report = match dispatcher.run(total, workers).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Cannot serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&report);
    }

    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &BatchReport) {
    println!();
    println!("Converted {} of {} slides", report.converted, report.requested);

    if !report.failures.is_empty() {
        println!();
        println!("Failed slides:");
        for failure in &report.failures {
            println!("  #{} [{}] {}", failure.id, failure.error.kind(), failure.error);
        }
        println!();
        println!("Incomplete ranges:");
        for range in &report.incomplete_ranges {
            println!("  {} to {}", range.start, range.end);
        }
    }

    println!();
    println!("Time elapsed: {:?}", report.elapsed);
}

// =============================================================================
// Stats Command
// =============================================================================

async fn run_stats(args: StatsArgs) -> ExitCode {
    let Some(config) = load_config(&args.paths) else {
        return ExitCode::FAILURE;
    };
    let started = Instant::now();

    let (dimensions, failures) = match collect_dimensions(&config).await {
        Ok(collected) => collected,
        Err(e) => {
            error!("Cannot list slides in {}: {}", config.slide_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let Some(stats) = SlideStats::from_dimensions(dimensions) else {
        error!("No readable slides in {}", config.slide_dir.display());
        return ExitCode::FAILURE;
    };

    println!("{}", stats.report());

    match write_report(&config, &stats).await {
        Ok(path) => info!("Wrote {}", path.display()),
        Err(e) => {
            error!("Cannot write stats report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!("Time elapsed: {:?}", started.elapsed());

    if failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(args: InfoArgs) -> ExitCode {
    let Some(config) = load_config(&args.paths) else {
        return ExitCode::FAILURE;
    };
    let started = Instant::now();

    let (infos, failures) = match collect_info(&config).await {
        Ok(collected) => collected,
        Err(e) => {
            error!("Cannot list slides in {}: {}", config.slide_dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    for slide in &infos {
        println!();
        println!("Slide #{}: {}", slide.id, slide.path.display());
        println!("  Format: {}", slide.format.name());
        println!("  Level count: {}", slide.level_count);
        println!("  Level dimensions: {:?}", slide.level_dimensions);
        println!("  Level downsamples: {:?}", slide.level_downsamples);
        println!("  Dimensions: {:?}", slide.dimensions);
        match slide.objective_power {
            Some(power) => println!("  Objective power: {}", power),
            None => println!("  Objective power: unknown"),
        }
        println!("  Associated images: {}", slide.associated_images);

        if args.properties {
            println!("  Properties:");
            for (key, value) in &slide.properties {
                println!("    {} = {}", key, value);
            }
        }
    }

    let groups = MagnificationGroups::from_infos(&infos);
    println!();
    println!("Slide magnifications:");
    println!("  20x slides: {:?}", groups.x20);
    println!("  40x slides: {:?}", groups.x40);
    println!("  ??x slides: {:?}", groups.other);
    println!();
    println!("Time elapsed: {:?}", started.elapsed());

    if failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Locate Command
// =============================================================================

fn run_locate(args: LocateArgs) -> ExitCode {
    let suffix = match decode(&args.name) {
        Ok(suffix) => suffix,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some((x, y)) = map_small_to_large((args.x, args.y), suffix.large, suffix.scale) else {
        error!(
            "Scale factor {} leaves no pixels in a {}x{} slide",
            suffix.scale, suffix.large.0, suffix.large.1
        );
        return ExitCode::FAILURE;
    };

    println!("Scale factor: {}", suffix.scale);
    println!("Large: {}x{}", suffix.large.0, suffix.large.1);
    println!("Small: {}x{}", suffix.small.0, suffix.small.1);
    println!("({}, {}) -> ({}, {})", args.x, args.y, x, y);

    ExitCode::SUCCESS
}
