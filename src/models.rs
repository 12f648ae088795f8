//! Data models for shard reports.
//!
//! `ShardResult` is what each shard writes, `MergedResult` is the single
//! report produced from all of them. Suite and error records are kept as
//! opaque JSON values and passed through untouched.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// Counters and duration reported by one shard.
///
/// Absent and falsy fields (`null`, `false`, `""`, `0`) all count as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShardStats {
    #[serde(default, deserialize_with = "deserialize_count")]
    pub expected: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub skipped: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub unexpected: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub flaky: Option<u64>,
    /// Milliseconds spent by this shard.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: Option<f64>,
}

/// Reads a stats field, mapping falsy JSON values to `None`.
fn falsy_or_number<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n)),
        Some(other) => Err(D::Error::custom(format!(
            "expected a number in stats, found {}",
            other
        ))),
    }
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match falsy_or_number(deserializer)? {
        None => Ok(None),
        Some(n) => n.as_u64().map(Some).ok_or_else(|| {
            D::Error::custom(format!("expected a non-negative integer count, found {}", n))
        }),
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match falsy_or_number(deserializer)? {
        None => Ok(None),
        Some(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a duration, found {}", n))),
    }
}

/// One shard's report file.
///
/// Top-level keys other than `suites`, `errors` and `stats` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShardResult {
    #[serde(default)]
    pub suites: Option<Vec<Value>>,
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
    #[serde(default)]
    pub stats: Option<ShardStats>,
}

impl ShardResult {
    /// Parse a shard report from JSON text.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// Aggregated counters for the merged report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedStats {
    pub expected: u64,
    pub skipped: u64,
    pub unexpected: u64,
    pub flaky: u64,
    /// Longest shard duration in milliseconds.
    #[serde(serialize_with = "serialize_duration")]
    pub duration: f64,
}

impl MergedStats {
    /// Total number of tests across all shards.
    pub fn total(&self) -> u64 {
        self.expected
            .saturating_add(self.skipped)
            .saturating_add(self.unexpected)
            .saturating_add(self.flaky)
    }
}

/// The merged report written to the output file.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedResult {
    pub suites: Vec<Value>,
    pub errors: Vec<Value>,
    pub stats: MergedStats,
}

/// Integral durations are written as JSON integers (`7000`, not `7000.0`).
fn serialize_duration<S>(duration: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

    if duration.fract() == 0.0 && duration.abs() <= MAX_EXACT {
        serializer.serialize_i64(*duration as i64)
    } else {
        serializer.serialize_f64(*duration)
    }
}
