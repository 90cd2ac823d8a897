pub mod elevation;
pub mod frame_id;
pub mod index;
pub mod list;
pub mod query;

use anyhow::{Context, Result};
use mosaic::mosaic::MemoryMosaicDatabase;
use mosaic::{MosaicConfig, MosaicConfigBuilder};
use std::path::PathBuf;

/// Options shared by every subcommand.
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub cache_size: u64,
    pub index: Option<PathBuf>,
}

impl Settings {
    pub fn config(self) -> Result<MosaicConfig> {
        let data_dir = self.data_dir.context(
            "MOSAIC_DATA_DIR environment variable not set. Use --data-dir or set MOSAIC_DATA_DIR",
        )?;

        if !data_dir.exists() {
            anyhow::bail!("Data directory does not exist: {}", data_dir.display());
        }

        let mut builder = MosaicConfigBuilder::new(data_dir).cache_size(self.cache_size);
        if let Some(index) = self.index {
            builder = builder.index_path(index);
        }
        Ok(builder.build())
    }
}

/// Open the catalog named by `config`.
pub fn open_catalog(config: &MosaicConfig) -> Result<MemoryMosaicDatabase> {
    MemoryMosaicDatabase::load(config.index_path()).with_context(|| {
        format!(
            "Failed to open catalog {}. Run `mosaic index` first",
            config.index_path().display()
        )
    })
}
