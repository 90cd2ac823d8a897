use anyhow::{Context, Result};
use mosaic::elevation::{ChunkRef, ElevationManager, ElevationSource, HgtTileLoader};
use mosaic::GeoPoint;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::Settings;

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    interpolated: bool,
}

pub fn run(settings: Settings, lat: f64, lon: f64, interpolate: bool, json: bool) -> Result<()> {
    let config = settings.config()?;
    let loader = Arc::new(HgtTileLoader::new(config.data_dir(), config.cache_size()));

    let chunks: Vec<ChunkRef> = loader
        .lazy_chunks()
        .into_iter()
        .map(|chunk| Arc::new(chunk.interpolated(interpolate)) as ChunkRef)
        .collect();
    debug!(chunks = chunks.len(), "Scanned elevation tiles");

    let source = ElevationSource::builder()
        .name("srtm")
        .chunks(chunks)
        .build()
        .context("Failed to create elevation source")?;

    let manager = ElevationManager::new();
    manager.register(Arc::new(source), 0);

    let point = GeoPoint::new(lat, lon);
    let elevation = manager.create(&point);
    let source = manager.supporting(&point).into_iter().next();

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            elevation,
            source,
            interpolated: interpolate,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            Some(elev) if interpolate => println!("{:.2}", elev),
            Some(elev) => println!("{}", elev),
            None => println!("void"),
        }
    }

    Ok(())
}
