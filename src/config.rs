//! Reference documents that steer a run: business-type mapping, annual
//! premium plans and problem-detection thresholds.
//!
//! Each document is optional. A missing path or file yields the built-in
//! default; a file that exists but does not parse is an error.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_COST_THRESHOLD: f64 = 93.0;
pub const DEFAULT_PLAN_THRESHOLD: f64 = 95.0;
pub const DEFAULT_EXPENSE_THRESHOLD: f64 = 18.0;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub csv_raw_value: String,
    pub ui_full_name: String,
    pub ui_short_label: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompatibilityEntry {
    pub csv_raw_value: String,
    pub maps_to: String,
}

/// Older mapping files store aliases as an object instead of a list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompatibilityTable {
    List(Vec<CompatibilityEntry>),
    Map(HashMap<String, String>),
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        CompatibilityTable::List(Vec::new())
    }
}

impl CompatibilityTable {
    pub fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            CompatibilityTable::List(v) => v.into_iter().map(|e| (e.csv_raw_value, e.maps_to)).collect(),
            CompatibilityTable::Map(m) => m.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MappingDocument {
    #[serde(default)]
    pub business_types: Vec<MappingEntry>,
    #[serde(default)]
    pub compatibility_mappings: CompatibilityTable,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct YearPlanDocument {
    #[serde(rename = "年度保费计划", default)]
    pub plans: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ThresholdDocument {
    #[serde(rename = "问题机构识别阈值", default)]
    pub problem_thresholds: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "四象限基准线", default)]
    pub quadrant_baselines: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cost_rate: f64,
    pub plan_achievement: f64,
    pub expense_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            cost_rate: DEFAULT_COST_THRESHOLD,
            plan_achievement: DEFAULT_PLAN_THRESHOLD,
            expense_rate: DEFAULT_EXPENSE_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Each threshold is overridden independently; anything non-numeric is ignored.
    pub fn from_document(doc: &ThresholdDocument) -> Self {
        let get = |key: &str, default: f64| {
            doc.problem_thresholds.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
        };
        Thresholds {
            cost_rate: get("变动成本率超标", DEFAULT_COST_THRESHOLD),
            plan_achievement: get("年保费未达标", DEFAULT_PLAN_THRESHOLD),
            expense_rate: get("费用率超标", DEFAULT_EXPENSE_THRESHOLD),
        }
    }
}

/// Load a JSON document, falling back to `T::default()` when it is absent.
pub fn load_document<T>(path: Option<&Path>, what: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No {} document given, using defaults", what);
        return Ok(T::default());
    };
    if !path.exists() {
        warn!("{} document {:?} not found, using defaults", what, path);
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path)?;
    let doc = serde_json::from_str(&text)?;
    info!("Loaded {} document from {:?}", what, path);
    Ok(doc)
}
