use chrono::{DateTime, Utc};

use crate::models::{MetricsSet, ResultRow};

/// Content of one export, fixed before layout starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    title: String,
    generated_at: DateTime<Utc>,
    metrics: Option<MetricsSet>,
    rows: Vec<ResultRow>,
}

impl ReportDocument {
    pub fn new(
        title: impl Into<String>,
        generated_at: DateTime<Utc>,
        metrics: Option<MetricsSet>,
        rows: Vec<ResultRow>,
    ) -> Self {
        Self { title: title.into(), generated_at, metrics, rows }
    }

    pub fn title(&self) -> &str { &self.title }

    pub fn generated_at(&self) -> DateTime<Utc> { self.generated_at }

    /// Metrics to show in the metrics band; an empty set counts as absent.
    pub fn metrics(&self) -> Option<&MetricsSet> {
        self.metrics.as_ref().filter(|m| !m.is_empty())
    }

    pub fn rows(&self) -> &[ResultRow] { &self.rows }

    /// Every string that ends up inside the results table.
    pub fn table_text(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .flat_map(|r| [r.query.as_str(), r.response.as_str(), r.reference.as_str()])
    }
}
