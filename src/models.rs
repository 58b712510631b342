use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResultRow {
    #[serde(alias = "user_input")]
    pub query: String,
    pub response: String,
    pub reference: String,
}

impl ResultRow {
    pub fn new(query: impl Into<String>, response: impl Into<String>, reference: impl Into<String>) -> Self {
        Self { query: query.into(), response: response.into(), reference: reference.into() }
    }
}

/// Ordered metric name -> value mapping. Order is column order in the report,
/// so it (de)serializes as a JSON object without going through a hash map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSet(Vec<(String, Option<f64>)>);

impl MetricsSet {
    pub fn new() -> Self { Self::default() }

    /// Inserts or replaces a metric; a replaced metric keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MetricsSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut set = MetricsSet::new();
        for (name, value) in iter {
            set.insert(name, Some(value));
        }
        set
    }
}

impl Serialize for MetricsSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricsSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricsVisitor;

        impl<'de> Visitor<'de> for MetricsVisitor {
            type Value = MetricsSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping metric names to numbers or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MetricsSet, A::Error> {
                let mut set = MetricsSet::new();
                while let Some((name, value)) = access.next_entry::<String, Option<f64>>()? {
                    set.insert(name, value);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(MetricsVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvaluationRun {
    pub id: Uuid,
    pub endpoint: String,
    pub results: Vec<ResultRow>,
    pub metrics: MetricsSet,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub endpoint: Option<String>, // falls back to the configured endpoint
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ExportRequest {
    #[serde(default)]
    pub table_snapshot: Option<String>, // base64 PNG/JPEG of the on-screen table
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportRequest {
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub metrics: Option<MetricsSet>,
    #[serde(default)]
    pub table_snapshot: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportStatus {
    pub busy: bool,
    pub message: Option<String>,
}
