//! Workbook loading
//!
//! The source data is a multi-table workbook: one tabular sheet per entity.
//! On disk each sheet is a CSV file named after the sheet (`Deals.csv`,
//! `Customers.csv`, ...) inside a single workbook directory. `Deals` is
//! required; the other sheets are optional and simply absent from
//! [`RawTables`] when the file is missing.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{RealtyError, Result};

/// Sheet names expected in the workbook.
pub const SHEET_DEALS: &str = "Deals";
pub const SHEET_CUSTOMERS: &str = "Customers";
pub const SHEET_BROKERS: &str = "Brokers";
pub const SHEET_PROPERTIES: &str = "Properties";
pub const SHEET_PROPERTY_DETAILS: &str = "PropertyDetails";

/// The five source tables, loaded once per session.
#[derive(Debug, Clone)]
pub struct RawTables {
    pub deals: DataFrame,
    pub customers: Option<DataFrame>,
    pub brokers: Option<DataFrame>,
    pub properties: Option<DataFrame>,
    pub property_details: Option<DataFrame>,
}

impl RawTables {
    /// Apply city-name cleaning to exactly the Customers, Brokers and
    /// Properties tables. Other tables are untouched.
    pub fn clean_cities(mut self) -> Result<Self> {
        if let Some(df) = self.customers.take() {
            self.customers = Some(super::cleaning::clean_city_names(&df)?);
        }
        if let Some(df) = self.brokers.take() {
            self.brokers = Some(super::cleaning::clean_city_names(&df)?);
        }
        if let Some(df) = self.properties.take() {
            self.properties = Some(super::cleaning::clean_city_names(&df)?);
        }
        Ok(self)
    }
}

/// Loader for a workbook directory.
pub struct Workbook {
    dir: PathBuf,
}

impl Workbook {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load all sheets. Missing `Deals` (or a missing workbook directory)
    /// is fatal; missing optional sheets are not.
    pub fn load(&self) -> Result<RawTables> {
        if !self.dir.is_dir() {
            return Err(RealtyError::DataError(format!(
                "workbook directory not found: {}",
                self.dir.display()
            )));
        }

        let deals = self
            .load_sheet(SHEET_DEALS)?
            .ok_or_else(|| RealtyError::TableNotFound(SHEET_DEALS.to_string()))?;

        let tables = RawTables {
            deals,
            customers: self.load_sheet(SHEET_CUSTOMERS)?,
            brokers: self.load_sheet(SHEET_BROKERS)?,
            properties: self.load_sheet(SHEET_PROPERTIES)?,
            property_details: self.load_sheet(SHEET_PROPERTY_DETAILS)?,
        };

        info!(
            deals = tables.deals.height(),
            customers = tables.customers.as_ref().map(|d| d.height()),
            brokers = tables.brokers.as_ref().map(|d| d.height()),
            properties = tables.properties.as_ref().map(|d| d.height()),
            property_details = tables.property_details.as_ref().map(|d| d.height()),
            "workbook loaded"
        );

        Ok(tables)
    }

    /// Load one sheet, or `None` if its file does not exist.
    fn load_sheet(&self, sheet: &str) -> Result<Option<DataFrame>> {
        let path = self.dir.join(format!("{sheet}.csv"));
        if !path.is_file() {
            debug!(sheet, "sheet file absent");
            return Ok(None);
        }

        let file = File::open(&path)?;

        let reader = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .into_reader_with_file_handle(file);

        let df = reader
            .finish()
            .map_err(|e| RealtyError::DataError(format!("failed to read {sheet}: {e}")))?;

        debug!(sheet, rows = df.height(), cols = df.width(), "sheet loaded");
        Ok(Some(df))
    }
}
