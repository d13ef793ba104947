use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.sumologic.com/api/v1/search/jobs";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Remote search job API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    /// Search scope placed before the field projection, `*` for everything.
    pub scope: String,
    pub fields: Vec<String>,
    pub time_zone: String,
    pub page_size: u64,
    #[serde(with = "duration_format")]
    pub timeout: Duration,
    #[serde(with = "duration_format")]
    pub retry_interval: Duration,
}

impl ApiConfig {
    /// The one query shape sent for every window.
    pub fn query(&self) -> String {
        if self.fields.is_empty() {
            self.scope.clone()
        } else {
            format!("{} | fields {}", self.scope, self.fields.join(", "))
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scope: "*".to_string(),
            fields: [
                "_messagetime",
                "_sourcecategory",
                "_sourcehost",
                "_sourcename",
                "_collector",
                "_raw",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            time_zone: "UTC".to_string(),
            page_size: 10_000,
            timeout: Duration::from_secs(60),
            retry_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    #[serde(with = "duration_format")]
    pub increment: Duration,
    /// How far back an export reaches when no start is given.
    #[serde(with = "duration_format")]
    pub lookback: Duration,
    pub download_workers: usize,
    pub save_workers: usize,
    /// Root directory for the file sink; artifact keys are joined onto it.
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            increment: Duration::from_secs(5 * 60),
            lookback: Duration::from_secs(24 * 3600),
            download_workers: 10,
            save_workers: 5,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Destination selection. A bucket switches the export to the object store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub bucket: Option<String>,
    pub profile: Option<String>,
    pub region: Option<String>,
}

// Custom serde module for duration parsing
pub(crate) mod duration_format {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        let (value_str, unit) = if let Some(v) = s.strip_suffix("ms") {
            (v, "ms")
        } else if let Some(v) = s.strip_suffix('s') {
            (v, "s")
        } else if let Some(v) = s.strip_suffix('m') {
            (v, "m")
        } else if let Some(v) = s.strip_suffix('h') {
            (v, "h")
        } else if let Some(v) = s.strip_suffix('d') {
            (v, "d")
        } else {
            return Err(format!("invalid duration format: {}", s));
        };

        let value: u64 = value_str
            .parse()
            .map_err(|_| format!("invalid numeric value: {}", value_str))?;

        let seconds_per_unit: u64 = match unit {
            "ms" => return Ok(Duration::from_millis(value)),
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            "d" => 86400,
            _ => return Err(format!("unknown unit: {}", unit)),
        };

        value
            .checked_mul(seconds_per_unit)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration too large: {}", s))
    }

    pub fn format_duration(d: Duration) -> String {
        let secs = d.as_secs();
        if d.subsec_millis() != 0 || secs == 0 {
            format!("{}ms", d.as_millis())
        } else if secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

}
