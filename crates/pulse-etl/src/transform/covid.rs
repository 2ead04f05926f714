//! Covid source definition

use serde_json::{json, Value};

use crate::transform::batch::Source;
use crate::transform::loader::{SourceTables, COVID_TABLES};
use crate::transform::validate::{Rule, Schema};

pub struct CovidSource {
    schema: Schema,
}

impl CovidSource {
    pub fn new() -> Self {
        Self {
            schema: covid_schema(),
        }
    }
}

impl Default for CovidSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for CovidSource {
    fn name(&self) -> &'static str {
        "covid"
    }

    fn tables(&self) -> &'static SourceTables {
        &COVID_TABLES
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn clean_record(&self, raw: &Value, country: &str, date: &str) -> Value {
        json!({
            "country_id": country,
            "date": date,
            "cases": raw.get("cases").cloned().unwrap_or(Value::Null),
            "deaths": raw.get("deaths").cloned().unwrap_or(Value::Null),
            "recovered": raw.get("recovered").cloned().unwrap_or(Value::Null),
        })
    }

    fn complete_file_records(&self, payload: &Value) -> Vec<Value> {
        payload.as_array().cloned().unwrap_or_default()
    }
}

fn covid_schema() -> Schema {
    let non_negative = || Rule::NumericRange {
        min: Some(0.0),
        max: None,
    };

    Schema::new(vec![
        ("country_id", vec![Rule::Required]),
        ("date", vec![Rule::Required, Rule::DateFormat { format: "%Y-%m-%d" }]),
        ("cases", vec![non_negative()]),
        ("deaths", vec![non_negative()]),
        ("recovered", vec![non_negative()]),
    ])
}
