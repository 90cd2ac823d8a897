use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mosaic::mosaic::{index_directory_with, IndexOptions};
use mosaic::{MosaicError, RequestCallback, TileReaderRegistry};

use super::Settings;

/// Drives a progress bar from the indexer's callbacks.
struct ProgressCallback {
    pb: ProgressBar,
    verbose: bool,
    skipped: usize,
}

impl RequestCallback for ProgressCallback {
    fn on_request_progress(
        &mut self,
        _task_index: usize,
        _task_count: usize,
        _task_progress: u64,
        _task_max: u64,
        total_progress: u64,
        total_max: u64,
    ) {
        self.pb.set_length(total_max);
        self.pb.set_position(total_progress);
    }

    fn on_request_complete(&mut self) {
        self.pb.finish_with_message("done");
    }

    fn on_request_error(&mut self, cause: &MosaicError, message: &str, _fatal: bool) -> bool {
        self.skipped += 1;
        if self.verbose {
            self.pb.println(format!("{}: {}", message, cause));
        }
        true
    }

    fn on_request_canceled(&mut self) {
        self.pb.abandon_with_message("canceled");
    }
}

pub fn run(settings: Settings, relative_paths: bool, verbose: bool) -> Result<()> {
    let config = settings.config()?;
    let registry = TileReaderRegistry::with_defaults();
    let options = IndexOptions {
        relative_paths,
        ..config.index_options()
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    let mut callback = ProgressCallback {
        pb,
        verbose,
        skipped: 0,
    };

    let builder = index_directory_with(config.data_dir(), &registry, &options, &mut callback)
        .with_context(|| format!("Failed to scan {}", config.data_dir().display()))?;
    builder
        .save(config.index_path())
        .with_context(|| format!("Failed to write {}", config.index_path().display()))?;

    println!();
    println!("Summary:");
    println!("  Frames: {}", builder.len());
    if callback.skipped > 0 {
        println!("  Skipped: {}", callback.skipped);
    }
    println!("  Catalog: {}", config.index_path().display());

    Ok(())
}
