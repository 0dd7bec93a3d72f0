//! Integration test: session lifecycle against a workbook directory on disk

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use realty_analytics::error::RealtyError;
use realty_analytics::session::AnalysisSession;
use realty_analytics::training::ModelVariant;

const N_DEALS: usize = 60;
const N_PROPERTIES: usize = 20;
const N_CUSTOMERS: usize = 15;
const N_BROKERS: usize = 5;

fn write_workbook(dir: &Path, n_deals: usize) {
    let mut deals = String::from(
        "deal_id,customer_id,broker_id,property_id,deal_date,offer_price,final_price,loan_rate,status\n",
    );
    for i in 0..n_deals {
        let prop = i % N_PROPERTIES;
        let area = 900.0 + (prop % 10) as f64 * 120.0;
        let rate = 7.0 + (i % 30) as f64 / 5.0;
        let price = 2_500.0 * area + 60_000.0 * (i % 7) as f64 - 20_000.0 * rate;
        let status = if rate < 9.0 {
            "Closed"
        } else if rate < 11.0 {
            "Pending"
        } else {
            "Cancelled"
        };
        writeln!(
            deals,
            "{},{},{},{},202{}-0{}-10,{:.2},{:.2},{:.2},{}",
            i + 1,
            i % N_CUSTOMERS,
            i % N_BROKERS,
            prop,
            i % 3,
            1 + i % 9,
            price * 0.95,
            price,
            rate,
            status
        )
        .unwrap();
    }
    fs::write(dir.join("Deals.csv"), deals).unwrap();

    let mut customers = String::from("customer_id,city\n");
    for i in 0..N_CUSTOMERS {
        let city = ["mumbay", "dehli", "Pune"][i % 3];
        writeln!(customers, "{},{}", i, city).unwrap();
    }
    fs::write(dir.join("Customers.csv"), customers).unwrap();

    let mut brokers = String::from("broker_id,city,experience_years,rating\n");
    for i in 0..N_BROKERS {
        writeln!(brokers, "{},Kolkata,{},{:.1}", i, 2 + i * 3, 3.0 + i as f64 * 0.4).unwrap();
    }
    fs::write(dir.join("Brokers.csv"), brokers).unwrap();

    let mut properties = String::from("property_id,city,area_sqft,bedrooms,bathrooms,year_built\n");
    for i in 0..N_PROPERTIES {
        writeln!(
            properties,
            "{},bengluru,{:.1},{},{},{}",
            i,
            900.0 + (i % 10) as f64 * 120.0,
            1 + i % 4,
            1 + i % 3,
            1995 + i
        )
        .unwrap();
    }
    fs::write(dir.join("Properties.csv"), properties).unwrap();

    let mut details = String::from("property_id,hoa_fee,school_score,walk_score\n");
    for i in 0..N_PROPERTIES {
        writeln!(
            details,
            "{},{:.1},{:.1},{:.1}",
            i,
            1_500.0 + 300.0 * (i % 8) as f64,
            55.0 + (i % 40) as f64,
            45.0 + (i % 50) as f64
        )
        .unwrap();
    }
    fs::write(dir.join("PropertyDetails.csv"), details).unwrap();
}

#[test]
fn test_open_cleans_cities_and_joins() {
    let tmp = tempfile::tempdir().unwrap();
    write_workbook(tmp.path(), N_DEALS);

    let session = AnalysisSession::open(tmp.path()).unwrap();
    assert_eq!(session.frame().height(), N_DEALS);

    // misspellings in the source tables come out corrected
    let customers = session.tables().customers.as_ref().unwrap();
    let cities: Vec<&str> = customers
        .column("city")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!(cities.contains(&"Mumbai"));
    assert!(cities.contains(&"Delhi"));
    assert!(!cities.contains(&"mumbay"));

    let properties = session.tables().properties.as_ref().unwrap();
    let prop_cities: Vec<&str> = properties
        .column("city")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!(prop_cities.iter().all(|c| *c == "Bengaluru"));

    // derived age column lands in the frame
    assert!(session.frame().column("property_age_at_deal").is_ok());
}

#[test]
fn test_train_and_predict_through_session() {
    let tmp = tempfile::tempdir().unwrap();
    write_workbook(tmp.path(), N_DEALS);

    let mut session = AnalysisSession::open(tmp.path()).unwrap();
    let summary = session.train_all();
    assert!(summary.failures.is_empty(), "{:?}", summary.failures);

    let features: std::collections::HashMap<String, f64> = [
        ("area_sqft", 1200.0),
        ("bedrooms", 2.0),
        ("bathrooms", 1.0),
        ("property_age_at_deal", 12.0),
        ("experience_years", 8.0),
        ("rating", 3.8),
        ("hoa_fee", 2_100.0),
        ("school_score", 68.0),
        ("walk_score", 52.0),
        ("offer_price", 2_900_000.0),
        ("loan_rate", 8.4),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let price = session
        .registry()
        .predict_price(ModelVariant::MultipleRegression, &features)
        .unwrap();
    assert!(price.is_finite());

    let status = session.registry().predict_status(&features).unwrap();
    assert!(!status.predicted_status.is_empty());
}

#[test]
fn test_reload_rebuilds_frame_and_invalidates_models() {
    let tmp = tempfile::tempdir().unwrap();
    write_workbook(tmp.path(), N_DEALS);

    let mut session = AnalysisSession::open(tmp.path()).unwrap();
    session.train_all();
    assert!(session.registry().is_trained(ModelVariant::SimpleRegression));

    // shrink the workbook on disk, then reload
    write_workbook(tmp.path(), 30);
    session.reload().unwrap();

    assert_eq!(session.frame().height(), 30);
    assert!(session.registry().trained_variants().is_empty());
    let err = session
        .registry()
        .predict_price(ModelVariant::SimpleRegression, &Default::default())
        .unwrap_err();
    assert!(matches!(err, RealtyError::ModelNotFound(_)));
}

#[test]
fn test_open_missing_directory_fails() {
    let err = AnalysisSession::open("/nonexistent/workbook").unwrap_err();
    assert!(matches!(err, RealtyError::DataError(_)));
}
