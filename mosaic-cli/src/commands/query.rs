use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use mosaic::mosaic::{
    Frame, MosaicDatabase, PathResolvingDatabase, QueryOrder, QueryParameters,
};
use mosaic::BoundingBox;

use super::{open_catalog, Settings};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Order {
    /// Catalog order
    Natural,
    /// Finest resolution first
    Finest,
    /// Coarsest resolution first
    Coarsest,
}

impl From<Order> for QueryOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Natural => QueryOrder::Natural,
            Order::Finest => QueryOrder::ResolutionAsc,
            Order::Coarsest => QueryOrder::ResolutionDesc,
        }
    }
}

pub struct Filters {
    pub bbox: Option<Vec<f64>>,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
    pub sources: Vec<String>,
    pub order: Order,
}

impl Filters {
    fn parameters(self) -> Result<QueryParameters> {
        let mut builder = QueryParameters::builder().order(self.order.into());

        if let Some(bbox) = self.bbox {
            let region = match bbox.as_slice() {
                &[min_lat, min_lon, max_lat, max_lon] => {
                    BoundingBox::new(min_lat, min_lon, max_lat, max_lon)
                }
                _ => bail!("--bbox takes exactly four values"),
            };
            if !region.is_valid() {
                bail!("Invalid bounding box: {:?}", bbox);
            }
            builder = builder.region(region);
        }
        if let Some(min) = self.min_resolution {
            builder = builder.min_resolution(min);
        }
        if let Some(max) = self.max_resolution {
            builder = builder.max_resolution(max);
        }
        for source in self.sources {
            builder = builder.source(source);
        }
        Ok(builder.build())
    }
}

pub fn run(settings: Settings, filters: Filters, resolve: bool, json: bool) -> Result<()> {
    let config = settings.config()?;
    let params = filters.parameters()?;
    let catalog = open_catalog(&config)?;

    let db: Box<dyn MosaicDatabase> = if resolve {
        Box::new(PathResolvingDatabase::new(
            Box::new(catalog),
            &config.data_dir().to_string_lossy(),
        ))
    } else {
        Box::new(catalog)
    };

    let mut cursor = db.query(&params).context("Query failed")?;
    let mut frames: Vec<Frame> = Vec::new();
    while cursor.advance()? {
        if let Some(frame) = cursor.frame() {
            if json {
                frames.push(frame.clone());
            } else {
                println!(
                    "{:<40} {:>8} {:>8.1}m  {:.4},{:.4} to {:.4},{:.4}",
                    frame.path,
                    frame.source,
                    frame.resolution,
                    frame.bounds.min_lat,
                    frame.bounds.min_lon,
                    frame.bounds.max_lat,
                    frame.bounds.max_lon,
                );
            }
        }
    }
    cursor.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&frames)?);
    }

    Ok(())
}
