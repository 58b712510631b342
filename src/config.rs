use std::str::FromStr;

use tracing::warn;

pub const DEMO_ENDPOINT: &str = "DEMO";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub rag_endpoint: String,
    pub group_id: u32,
    pub session_id: u32,
    pub max_retries: u32,
    pub force_raster_table: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            rag_endpoint: DEMO_ENDPOINT.to_string(),
            group_id: 12,
            session_id: 111,
            max_retries: 3,
            force_raster_table: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            rag_endpoint: lookup("ARGUS_RAG_ENDPOINT")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.rag_endpoint),
            group_id: parse_or(&lookup, "ARGUS_GROUP_ID", defaults.group_id),
            session_id: parse_or(&lookup, "ARGUS_SESSION_ID", defaults.session_id),
            max_retries: parse_or(&lookup, "ARGUS_MAX_RETRIES", defaults.max_retries),
            force_raster_table: lookup("ARGUS_FORCE_RASTER_TABLE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.force_raster_table),
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable config value, using default");
            default
        }),
        None => default,
    }
}
