use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tabled::Tabled;

/// One CSV row exactly as it appears in the file. Every cell is kept as text
/// so that a malformed number degrades to zero instead of failing the row.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub second_level_organization: Option<String>,
    pub third_level_organization: Option<String>,
    pub business_type_category: Option<String>,
    pub customer_category_3: Option<String>,
    pub signed_premium_yuan: Option<String>,
    pub matured_premium_yuan: Option<String>,
    pub policy_count: Option<String>,
    pub claim_case_count: Option<String>,
    pub reported_claim_payment_yuan: Option<String>,
    pub expense_amount_yuan: Option<String>,
    pub premium_plan_yuan: Option<String>,
    pub week_number: Option<String>,
    #[serde(default)]
    pub policy_start_year: Option<String>,
}

/// A typed policy-segment record. All numeric fields are finite and >= 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub second_level_org: String,
    pub third_level_org: String,
    pub business_type: String,
    pub customer_category: String,
    pub signed_premium: f64,
    pub matured_premium: f64,
    pub policy_count: f64,
    pub claim_count: f64,
    pub reported_claim: f64,
    pub expense: f64,
    pub premium_plan: f64,
    pub week: i32,
}

/// Ratios and totals for one record subset. Rates are percentages and
/// amounts stay in yuan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KpiResult {
    pub signed_premium: f64,
    pub matured_premium: f64,
    pub reported_claim: f64,
    pub expense: f64,
    pub policy_count: f64,
    pub claim_count: f64,
    pub annual_plan: f64,
    pub claim_rate: f64,
    pub expense_rate: f64,
    pub cost_rate: f64,
    pub margin_rate: f64,
    pub margin_amount: f64,
    pub claim_frequency: f64,
    pub avg_claim_payment: f64,
    /// `None` when pacing is disabled or there is no plan to measure against.
    pub plan_achievement: Option<f64>,
}

/// Attribute a breakdown table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Organization,
    CustomerCategory,
    BusinessType,
}

impl Dimension {
    /// Key under which the group name is written in the report rows.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Organization => "机构",
            Dimension::CustomerCategory => "客户类别",
            Dimension::BusinessType => "业务类型简称",
        }
    }
}

/// One group of a breakdown table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub dimension: Dimension,
    pub key: String,
    pub kpis: KpiResult,
    pub premium_share: f64,
    pub claim_share: f64,
}

// The group name key depends on the dimension, so the field list is written by hand.
impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let k = &self.kpis;
        let mut map = serializer.serialize_map(Some(15))?;
        map.serialize_entry(self.dimension.label(), &self.key)?;
        map.serialize_entry("签单保费", &k.signed_premium)?;
        map.serialize_entry("满期保费", &k.matured_premium)?;
        map.serialize_entry("已报告赔款", &k.reported_claim)?;
        map.serialize_entry("费用额", &k.expense)?;
        map.serialize_entry("保单件数", &k.policy_count)?;
        map.serialize_entry("赔案件数", &k.claim_count)?;
        map.serialize_entry("满期赔付率", &k.claim_rate)?;
        map.serialize_entry("费用率", &k.expense_rate)?;
        map.serialize_entry("变动成本率", &k.cost_rate)?;
        map.serialize_entry("出险率", &k.claim_frequency)?;
        map.serialize_entry("案均赔款", &k.avg_claim_payment)?;
        map.serialize_entry("保费占比", &self.premium_share)?;
        map.serialize_entry("已报告赔款占比", &self.claim_share)?;
        map.serialize_entry("年计划达成率", &k.plan_achievement)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    #[serde(rename = "签单保费")]
    pub signed_premium: f64,
    #[serde(rename = "满期赔付率")]
    pub claim_rate: f64,
    #[serde(rename = "费用率")]
    pub expense_rate: f64,
    #[serde(rename = "变动成本率")]
    pub cost_rate: f64,
    #[serde(rename = "已报告赔款")]
    pub reported_claim: f64,
}

impl From<&KpiResult> for Summary {
    fn from(k: &KpiResult) -> Self {
        Summary {
            signed_premium: k.signed_premium,
            claim_rate: k.claim_rate,
            expense_rate: k.expense_rate,
            cost_rate: k.cost_rate,
            reported_claim: k.reported_claim,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdEcho {
    #[serde(rename = "四象限基准线")]
    pub quadrant_baselines: serde_json::Value,
    #[serde(rename = "问题机构识别阈值")]
    pub problem_thresholds: serde_json::Value,
}

/// Everything the HTML template needs, under the key names it reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub summary: Summary,
    pub problems: Vec<String>,
    pub data_by_org: Vec<AggregatedRow>,
    pub data_by_category: Vec<AggregatedRow>,
    pub data_by_business_type: Vec<AggregatedRow>,
    pub thresholds: ThresholdEcho,
    pub week: i32,
    pub organization: String,
    pub is_single_org_mode: bool,
}

#[derive(Debug, Tabled, Clone)]
pub struct OrgPreviewRow {
    #[tabled(rename = "机构")]
    pub organization: String,
    #[tabled(rename = "签单保费")]
    pub signed_premium: String,
    #[tabled(rename = "满期赔付率")]
    pub claim_rate: String,
    #[tabled(rename = "费用率")]
    pub expense_rate: String,
    #[tabled(rename = "变动成本率")]
    pub cost_rate: String,
    #[tabled(rename = "保费占比")]
    pub premium_share: String,
    #[tabled(rename = "年计划达成率")]
    pub plan_achievement: String,
}
