//! Data layer: workbook loading, city cleaning, and table joining.

pub mod cleaning;
pub mod join;
pub mod loader;

pub use cleaning::{clean_city_names, normalize_city, CITY_CORRECTIONS};
pub use join::{build_analytical_frame, PROPERTY_AGE_COLUMN};
pub use loader::{RawTables, Workbook};
