//! Series the host serves when no fixture file is configured.

use anyhow::Context;
use folio_core::config::Settings;
use folio_core::domain::series::{SeriesStore, TimePoint};

const MONTHS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];

const DEMO: [(&str, [f64; 6]); 5] = [
    ("DELL", [80.0, 70.0, 75.0, 80.0, 75.0, 70.0]),
    ("AAPL", [140.0, 75.0, 30.0, 20.0, 15.0, 10.0]),
    ("TSLA", [20.0, 40.0, 60.0, 90.0, 110.0, 180.0]),
    ("GOOGL", [90.0, 95.0, 100.0, 110.0, 130.0, 140.0]),
    ("META", [110.0, 90.0, 70.0, 60.0, 80.0, 70.0]),
];

pub fn demo_series() -> SeriesStore {
    DEMO.iter().fold(SeriesStore::new(), |store, (symbol, values)| {
        let points = MONTHS
            .iter()
            .zip(values)
            .map(|(month, value)| TimePoint::new(*month, *value))
            .collect();
        store.with_series(symbol, points)
    })
}

pub fn load_series(settings: &Settings) -> anyhow::Result<SeriesStore> {
    let Some(path) = settings.series_fixture_path.as_deref() else {
        return Ok(demo_series());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read series fixture at {path}"))?;
    SeriesStore::from_json_str(&raw).with_context(|| format!("invalid series fixture at {path}"))
}
