//! Dataset joining
//!
//! Builds the analytical frame: Deals left-joined with the other tables in a
//! fixed order, one row per deal. Column-name collisions are resolved by
//! suffixing the later table's columns. Right tables are deduplicated on the
//! join key first so the left join can never expand the deal rows.

use polars::prelude::*;
use tracing::info;

use super::loader::RawTables;
use crate::error::Result;

/// Name of the derived property-age column.
pub const PROPERTY_AGE_COLUMN: &str = "property_age_at_deal";

/// Left-join `right` onto `lf`, suffixing colliding columns from `right`.
fn left_join(lf: LazyFrame, right: &DataFrame, key: &str, suffix: &str) -> Result<LazyFrame> {
    let right_unique = right.unique_stable(
        Some(&[key.to_string()]),
        UniqueKeepStrategy::First,
        None,
    )?;

    Ok(lf.join(
        right_unique.lazy(),
        [col(key)],
        [col(key)],
        JoinArgs::new(JoinType::Left).with_suffix(Some(suffix.into())),
    ))
}

/// Build the denormalized analytical frame from the raw tables.
///
/// Join order is fixed: Customers, Brokers, Properties, PropertyDetails.
/// Absent optional tables contribute no columns. If both `deal_date` and
/// `year_built` survive the joins, `property_age_at_deal` is derived as
/// deal year minus built year. Inconsistent source data can make the age
/// negative; that value is passed through unvalidated.
pub fn build_analytical_frame(tables: &RawTables) -> Result<DataFrame> {
    let mut lf = tables.deals.clone().lazy();

    if let Some(customers) = &tables.customers {
        lf = left_join(lf, customers, "customer_id", "_cust")?;
    }
    if let Some(brokers) = &tables.brokers {
        lf = left_join(lf, brokers, "broker_id", "_broker")?;
    }
    if let Some(properties) = &tables.properties {
        lf = left_join(lf, properties, "property_id", "_prop")?;
    }
    if let Some(details) = &tables.property_details {
        lf = left_join(lf, details, "property_id", "_detail")?;
    }

    let mut frame = lf.collect()?;
    frame = derive_property_age(frame)?;

    info!(
        rows = frame.height(),
        cols = frame.width(),
        "analytical frame built"
    );

    debug_assert_eq!(frame.height(), tables.deals.height());
    Ok(frame)
}

/// Add `property_age_at_deal` when both inputs are present.
fn derive_property_age(frame: DataFrame) -> Result<DataFrame> {
    let date_dtype = match frame.column("deal_date") {
        Ok(col) => col.dtype().clone(),
        Err(_) => return Ok(frame),
    };
    if frame.column("year_built").is_err() {
        return Ok(frame);
    }

    let year_expr = match date_dtype {
        DataType::Date | DataType::Datetime(_, _) => col("deal_date").dt().year(),
        // Unparseable strings become null, which null-filtering excludes later
        DataType::String => col("deal_date")
            .str()
            .to_date(StrptimeOptions {
                strict: false,
                ..Default::default()
            })
            .dt()
            .year(),
        _ => return Ok(frame),
    };

    let frame = frame
        .lazy()
        .with_column(
            (year_expr.cast(DataType::Int64) - col("year_built").cast(DataType::Int64))
                .alias(PROPERTY_AGE_COLUMN),
        )
        .collect()?;

    Ok(frame)
}
