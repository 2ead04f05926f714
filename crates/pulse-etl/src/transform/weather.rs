//! Weather source definition

use serde_json::{json, Value};

use crate::transform::batch::Source;
use crate::transform::loader::{SourceTables, WEATHER_TABLES};
use crate::transform::validate::{Rule, Schema};

const METRICS: &[&str] = &[
    "tavg", "tmin", "tmax", "prcp", "snow", "wdir", "wspd", "wpgt", "pres", "tsun",
];

pub struct WeatherSource {
    schema: Schema,
}

impl WeatherSource {
    pub fn new() -> Self {
        Self {
            schema: weather_schema(),
        }
    }
}

impl Default for WeatherSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for WeatherSource {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn tables(&self) -> &'static SourceTables {
        &WEATHER_TABLES
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clean_record(&self, raw: &Value, country: &str, date: &str) -> Value {
        let mut record = json!({
            "country_id": country,
            "date": date,
        });
        for metric in METRICS {
            record[*metric] = raw.get(*metric).cloned().unwrap_or(Value::Null);
        }
        record
    }

    fn complete_file_records(&self, payload: &Value) -> Vec<Value> {
        payload
            .get("data")
            .or(Some(payload))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

fn weather_schema() -> Schema {
    let temp = || Rule::NumericRange {
        min: Some(-100.0),
        max: Some(100.0),
    };
    let non_negative = || Rule::NumericRange {
        min: Some(0.0),
        max: None,
    };

    Schema::new(vec![
        ("country_id", vec![Rule::Required]),
        ("date", vec![Rule::Required, Rule::DateFormat { format: "%Y-%m-%d" }]),
        ("tavg", vec![temp()]),
        ("tmin", vec![temp()]),
        ("tmax", vec![temp()]),
        ("prcp", vec![non_negative()]),
        ("snow", vec![non_negative()]),
        (
            "wdir",
            vec![Rule::NumericRange {
                min: Some(0.0),
                max: Some(360.0),
            }],
        ),
        ("wspd", vec![non_negative()]),
        ("wpgt", vec![non_negative()]),
        ("pres", vec![non_negative()]),
        ("tsun", vec![non_negative()]),
    ])
}
