//! Analysis session
//!
//! One session owns the loaded workbook, the cleaned and joined analytical
//! frame, and the model registry. It replaces implicit memoized globals with
//! an explicit context: `reload` is the one invalidation point, and it also
//! clears the registry since trained models are only valid against the frame
//! they were trained on.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::info;

use crate::data::{build_analytical_frame, RawTables, Workbook};
use crate::error::Result;
use crate::registry::{ModelRegistry, TrainingSummary};
use crate::training::TrainingConfig;

#[derive(Debug)]
pub struct AnalysisSession {
    source: PathBuf,
    tables: RawTables,
    frame: DataFrame,
    registry: ModelRegistry,
}

impl AnalysisSession {
    /// Load the workbook, clean city names, and build the analytical frame.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(dir, TrainingConfig::default())
    }

    pub fn open_with_config(dir: impl AsRef<Path>, config: TrainingConfig) -> Result<Self> {
        let source = dir.as_ref().to_path_buf();
        let tables = Workbook::new(&source).load()?.clean_cities()?;
        let frame = build_analytical_frame(&tables)?;

        info!(source = %source.display(), rows = frame.height(), "session opened");

        Ok(Self {
            source,
            tables,
            frame,
            registry: ModelRegistry::with_config(config),
        })
    }

    /// Re-read the workbook and rebuild the frame. Trained models are
    /// invalidated along with the data they were trained on.
    pub fn reload(&mut self) -> Result<()> {
        let tables = Workbook::new(&self.source).load()?.clean_cities()?;
        self.frame = build_analytical_frame(&tables)?;
        self.tables = tables;
        self.registry.clear();

        info!(source = %self.source.display(), "session reloaded");
        Ok(())
    }

    /// Train all four variants against the current frame.
    pub fn train_all(&mut self) -> TrainingSummary {
        self.registry.train_all(&self.frame)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn tables(&self) -> &RawTables {
        &self.tables
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }
}
