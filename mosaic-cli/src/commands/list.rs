use anyhow::Result;
use mosaic::mosaic::{MosaicDatabase, SourceCoverage};

use super::{open_catalog, Settings};

pub fn run(settings: Settings) -> Result<()> {
    let config = settings.config()?;
    let catalog = open_catalog(&config)?;

    let sources = catalog.sources()?;
    if sources.is_empty() {
        println!("No frames in: {}", config.index_path().display());
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>16} {:>36}",
        "SOURCE", "FRAMES", "RESOLUTION", "COVERAGE"
    );
    println!("{}", "-".repeat(75));

    for source in &sources {
        if let Some(coverage) = catalog.coverage_for(source)? {
            println!(
                "{:<12} {:>8} {:>16} {:>36}",
                source,
                coverage.frame_count,
                format_resolution(&coverage),
                format_bounds(&coverage)
            );
        }
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Sources: {}", sources.len());
    if let Some(total) = catalog.coverage()? {
        println!("  Frames: {}", total.frame_count);
        println!("  Coverage: {}", format_bounds(&total));
    }
    println!("  Catalog: {}", config.index_path().display());

    Ok(())
}

fn format_resolution(coverage: &SourceCoverage) -> String {
    if coverage.min_resolution == coverage.max_resolution {
        format!("{}m", coverage.min_resolution)
    } else {
        format!("{}-{}m", coverage.min_resolution, coverage.max_resolution)
    }
}

fn format_bounds(coverage: &SourceCoverage) -> String {
    let b = &coverage.bounds;
    format!(
        "{:.2},{:.2} to {:.2},{:.2}",
        b.min_lat, b.min_lon, b.max_lat, b.max_lon
    )
}
