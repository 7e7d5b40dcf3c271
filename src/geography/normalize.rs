//! Region payload normalization
//!
//! Upstream services and the database describe region statistics in a few
//! different shapes. Everything is funnelled into [`RegionStat`] here: codes
//! are zero-padded to two characters, counts become positive integers, and
//! entries without a known label are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::regions::label_for;
use super::store::RegionCount;

/// Most entries returned from any source
pub const MAX_REGIONS: usize = 200;

/// Users per region, as served to the map widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStat {
    pub region_code: String,
    pub label: String,
    pub count: u64,
}

impl RegionStat {
    /// Build a stat for a padded code; `None` if the code has no label
    pub fn new(region_code: String, count: u64) -> Option<Self> {
        let label = label_for(&region_code)?;
        Some(Self {
            region_code,
            label: label.to_string(),
            count,
        })
    }
}

/// Coerce a string or number into a two-character code
pub fn to_region_code(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_to_string(n),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Some(pad_code(&raw))
}

/// Left-pad with zeros to two characters; longer codes are left alone
pub fn pad_code(raw: &str) -> String {
    format!("{raw:0>2}")
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_string(n: &serde_json::Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    match n.as_f64() {
        // 5.0 is written "5"
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Coerce a number or numeric string into a positive integer (floored)
pub fn to_positive_int(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    positive_floor(parsed)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_floor(value: f64) -> Option<u64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let floored = value.floor();
    // 0.5 floors to 0, which is not a usable count
    (floored >= 1.0).then(|| floored as u64)
}

fn field<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    record.get(name).filter(|v| !v.is_null())
}

/// `[{regionCode|code, count|users}]`; missing or unusable counts become 1
pub fn parse_region_array(input: &Value) -> Vec<RegionStat> {
    let Value::Array(items) = input else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let record = item.as_object()?;
            let code = field(record, "regionCode").or_else(|| field(record, "code"))?;
            let code = to_region_code(code)?;
            let count = field(record, "count")
                .and_then(to_positive_int)
                .or_else(|| field(record, "users").and_then(to_positive_int))
                .unwrap_or(1);
            RegionStat::new(code, count)
        })
        .take(MAX_REGIONS)
        .collect()
}

/// `[{regionCode, ...}]` user records, counted per code in first-seen order
pub fn aggregate_users(input: &Value) -> Vec<RegionStat> {
    let Value::Array(users) = input else {
        return Vec::new();
    };

    let mut order: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for code in users
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|record| field(record, "regionCode").and_then(to_region_code))
    {
        match index.get(&code) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(code.clone(), order.len());
                order.push((code, 1));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|(code, count)| RegionStat::new(code, count))
        .take(MAX_REGIONS)
        .collect()
}

/// Upstream body: `{regions}` first, then `{users}`, then a bare array
pub fn parse_upstream_payload(payload: &Value) -> Vec<RegionStat> {
    match payload {
        Value::Object(record) => {
            let from_regions = record
                .get("regions")
                .map(parse_region_array)
                .unwrap_or_default();
            if !from_regions.is_empty() {
                return from_regions;
            }
            record
                .get("users")
                .map(aggregate_users)
                .unwrap_or_default()
        }
        Value::Array(_) => parse_region_array(payload),
        _ => Vec::new(),
    }
}

/// Database rows, under the same rules as `regions` items
pub fn normalize_counts(rows: &[RegionCount]) -> Vec<RegionStat> {
    rows.iter()
        .filter_map(|row| {
            let code = row.region_code.trim();
            if code.is_empty() {
                return None;
            }
            let count = u64::try_from(row.count).ok().filter(|c| *c > 0).unwrap_or(1);
            RegionStat::new(pad_code(code), count)
        })
        .take(MAX_REGIONS)
        .collect()
}
