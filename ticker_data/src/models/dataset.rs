//! Wire shape of the per-symbol dataset endpoint.
//!
//! ```json
//! { "dataset": { "name": "Apple Inc. (AAPL) Prices", "data": [["2018-03-27", 173.68, 175.15, 166.92, 168.34, 38962839.0], ...] } }
//! ```
//!
//! Rows stay as raw JSON values; deciding what is malformed is the
//! processor's job, not the deserializer's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDataset {
    pub dataset: DatasetBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetBody {
    pub name: String,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl RawDataset {
    pub fn new(name: impl Into<String>, data: Vec<Vec<Value>>) -> Self {
        Self {
            dataset: DatasetBody {
                name: name.into(),
                data,
            },
        }
    }
}
