use crate::aggregate::DimensionAggregator;
use crate::config::{
    load_document, MappingDocument, ThresholdDocument, Thresholds, YearPlanDocument,
};
use crate::error::Result;
use crate::kpi::{KpiCalculator, PacingConfig};
use crate::loader::LoadReport;
use crate::mapper::{BusinessTypeMapper, UNKNOWN_CATEGORY};
use crate::mode::{resolve_week, resolve_year, OrgMode};
use crate::problems;
use crate::types::{Dimension, KpiResult, Record, ReportPayload, Summary, ThresholdEcho};
use crate::util::report_date;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Reference documents for one run.
#[derive(Debug, Default)]
pub struct ReferenceData {
    pub mapper: BusinessTypeMapper,
    pub plans: HashMap<String, f64>,
    pub thresholds: ThresholdDocument,
}

impl ReferenceData {
    pub fn load(mapping: Option<&Path>, year_plans: Option<&Path>, thresholds: Option<&Path>) -> Result<Self> {
        let mapping: MappingDocument = load_document(mapping, "business type mapping")?;
        let plans: YearPlanDocument = load_document(year_plans, "year plan")?;
        let thresholds: ThresholdDocument = load_document(thresholds, "threshold")?;
        Ok(ReferenceData {
            mapper: BusinessTypeMapper::new(mapping),
            plans: plans.plans,
            thresholds,
        })
    }
}

/// Caller overrides; every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub week: Option<i32>,
    pub organization: Option<String>,
    pub year: Option<i32>,
}

/// Everything resolved about a run besides the payload itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub mode: OrgMode,
    pub year: i32,
    pub week: i32,
    pub pacing: PacingConfig,
    pub title: String,
    pub report_date: Option<String>,
    pub totals: KpiResult,
}

pub fn build_report(
    records: &[Record],
    load_report: &LoadReport,
    csv_path: &Path,
    refs: &ReferenceData,
    options: &ReportOptions,
) -> (ReportPayload, ReportContext) {
    let week = resolve_week(options.week, load_report.max_week);
    let mode = OrgMode::detect(records, options.organization.as_deref());
    let year = resolve_year(load_report.policy_start_year, options.year, csv_path);
    let pacing = PacingConfig::for_year(year, week);
    info!(
        "Mode {:?}, year {}, week {}, pacing {}",
        mode,
        year,
        week,
        if pacing.enabled { "on" } else { "off" }
    );

    let calculator = KpiCalculator::new(pacing);
    let no_plans = HashMap::new();
    let plans = if pacing.enabled { &refs.plans } else { &no_plans };

    let totals = calculator.calculate(records, mode.total_plan(plans));
    info!(
        "Totals: premium {:.2}, cost rate {:.2}%, margin {:.2} ({:.2}%)",
        totals.signed_premium, totals.cost_rate, totals.margin_amount, totals.margin_rate
    );

    let aggregator = DimensionAggregator::new(&calculator, &totals);
    let data_by_org = aggregator.aggregate(
        records,
        Dimension::Organization,
        |r| group_name(&r.third_level_org),
        Some(plans),
    );
    let data_by_category = aggregator.aggregate(
        records,
        Dimension::CustomerCategory,
        |r| group_name(&r.customer_category),
        None,
    );
    let data_by_business_type = aggregator.aggregate(
        records,
        Dimension::BusinessType,
        |r| refs.mapper.short_label(&r.business_type),
        None,
    );

    let thresholds = Thresholds::from_document(&refs.thresholds);
    let problems = problems::detect(&data_by_org, &thresholds);
    if !problems.is_empty() {
        info!("Flagged: {}", problems.join(", "));
    }

    let payload = ReportPayload {
        summary: Summary::from(&totals),
        problems,
        data_by_org,
        data_by_category,
        data_by_business_type,
        thresholds: ThresholdEcho {
            quadrant_baselines: serde_json::Value::Object(refs.thresholds.quadrant_baselines.clone()),
            problem_thresholds: serde_json::Value::Object(refs.thresholds.problem_thresholds.clone()),
        },
        week,
        organization: mode.name().to_string(),
        is_single_org_mode: mode.is_single_org(),
    };
    let context = ReportContext {
        title: mode.title(year, week),
        report_date: report_date(year, week),
        mode,
        year,
        week,
        pacing,
        totals,
    };
    (payload, context)
}

/// Blank cells are grouped under the unknown label rather than as a nameless group.
fn group_name(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompatibilityTable, MappingEntry};
    use crate::loader::{load_records, read_records};
    use crate::output::render_template;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "second_level_organization,third_level_organization,business_type_category,customer_category_3,signed_premium_yuan,matured_premium_yuan,policy_count,claim_case_count,reported_claim_payment_yuan,expense_amount_yuan,premium_plan_yuan,week_number,policy_start_year";

    fn dataset(orgs: usize, year: i32, plan: f64) -> String {
        let mut csv = format!("{HEADER}\n");
        for i in 0..orgs {
            csv.push_str(&format!("四川,Org_{i},TypeA,CatA,1000,500,10,1,200,100,{plan},49,{year}\n"));
        }
        csv
    }

    fn run(csv: &str, refs: &ReferenceData) -> (ReportPayload, ReportContext) {
        let (records, load) = read_records(csv.as_bytes()).unwrap();
        build_report(&records, &load, Path::new("upload.csv"), refs, &ReportOptions::default())
    }

    #[test]
    fn single_org_end_to_end() {
        let (payload, ctx) = run(&dataset(1, 2025, 2000.0), &ReferenceData::default());

        assert!(payload.is_single_org_mode);
        assert_eq!(payload.organization, "Org_0");
        assert_eq!(payload.week, 49);
        assert_eq!(payload.summary.claim_rate, 40.0);
        assert_eq!(payload.summary.expense_rate, 10.0);
        assert_eq!(payload.summary.cost_rate, 50.0);
        assert_eq!(ctx.totals.margin_rate, 50.0);

        let org = &payload.data_by_org[0];
        assert_eq!(org.kpis.claim_frequency, 10.0);
        assert_eq!(org.kpis.avg_claim_payment, 200.0);
        assert_eq!(org.premium_share, 100.0);
        // 1000 of 2000 is well behind a week-49 pace.
        assert!(org.kpis.plan_achievement.unwrap() < 95.0);
        assert_eq!(payload.problems, vec!["Org_0(保费未达标)".to_string()]);
        assert_eq!(ctx.title, "Org_0车险2025保单第49周经营分析");
        assert_eq!(ctx.report_date.as_deref(), Some("2025年12月06日"));
    }

    #[test]
    fn other_years_disable_pacing_everywhere() {
        let (payload, ctx) = run(&dataset(3, 2024, 5000.0), &ReferenceData::default());
        assert_eq!(ctx.year, 2024);
        assert!(!ctx.pacing.enabled);
        let all_rows = payload
            .data_by_org
            .iter()
            .chain(&payload.data_by_category)
            .chain(&payload.data_by_business_type);
        for row in all_rows {
            assert_eq!(row.kpis.plan_achievement, None);
        }
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["dataByOrg"][0]["年计划达成率"].is_null());
    }

    #[test]
    fn branch_mode_uses_branch_plan_and_roster() {
        let refs = ReferenceData {
            plans: HashMap::from([
                ("四川分公司".to_string(), 24_000.0),
                ("Org_0".to_string(), 500.0),
            ]),
            ..ReferenceData::default()
        };
        let (payload, ctx) = run(&dataset(12, 2025, 2000.0), &refs);
        assert_eq!(ctx.mode, OrgMode::Branch { name: "四川".into() });
        assert_eq!(ctx.totals.annual_plan, 24_000.0);
        assert!(!payload.is_single_org_mode);
        assert_eq!(payload.data_by_org.len(), 12);

        // Org_0 is far ahead of its own small plan; the others use the summed per-record plan.
        let org0 = payload.data_by_org.iter().find(|r| r.key == "Org_0").unwrap();
        let org1 = payload.data_by_org.iter().find(|r| r.key == "Org_1").unwrap();
        assert_eq!(org0.kpis.annual_plan, 500.0);
        assert_eq!(org1.kpis.annual_plan, 2000.0);

        let share: f64 = payload.data_by_org.iter().map(|r| r.premium_share).sum();
        assert!((share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn small_roster_is_branch_fallback() {
        let (payload, ctx) = run(&dataset(5, 2025, 2000.0), &ReferenceData::default());
        assert_eq!(ctx.mode, OrgMode::BranchFallback { name: "四川".into() });
        assert!(!payload.is_single_org_mode);
        assert_eq!(ctx.title, "四川分公司车险2025保单第49周经营分析");
    }

    #[test]
    fn business_types_group_by_mapped_short_label() {
        let refs = ReferenceData {
            mapper: BusinessTypeMapper::new(MappingDocument {
                business_types: vec![MappingEntry {
                    csv_raw_value: "TypeA".into(),
                    ui_full_name: "类型A".into(),
                    ui_short_label: "A类".into(),
                    category: "客车".into(),
                }],
                compatibility_mappings: CompatibilityTable::default(),
            }),
            ..ReferenceData::default()
        };
        let mut csv = dataset(2, 2025, 0.0);
        csv.push_str("四川,Org_0,,CatA,10,5,1,0,0,0,0,49,2025\n");
        csv.push_str("四川,Org_0,TypeZ,CatA,10,5,1,0,0,0,0,49,2025\n");
        let (payload, _) = run(&csv, &refs);
        let labels: Vec<&str> = payload.data_by_business_type.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(labels, vec!["A类", "TypeZ", "未知"]);
    }

    #[test]
    fn payload_serializes_with_template_keys() {
        let refs = ReferenceData {
            thresholds: serde_json::from_str(r#"{"问题机构识别阈值": {"费用率超标": 5}, "四象限基准线": {"赔付率": 70}}"#)
                .unwrap(),
            ..ReferenceData::default()
        };
        let (payload, _) = run(&dataset(1, 2025, 2000.0), &refs);
        assert_eq!(payload.problems, vec!["Org_0(保费未达标)", "Org_0(费用率高)"]);

        let json = serde_json::to_value(&payload).unwrap();
        for key in [
            "summary",
            "problems",
            "dataByOrg",
            "dataByCategory",
            "dataByBusinessType",
            "thresholds",
            "week",
            "organization",
            "isSingleOrgMode",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["thresholds"]["四象限基准线"]["赔付率"], 70);
        assert_eq!(json["dataByOrg"][0]["机构"], "Org_0");
        assert_eq!(json["dataByBusinessType"][0]["业务类型简称"], "TypeA");
        assert_eq!(json["summary"]["变动成本率"], 50.0);
    }

    #[test]
    fn blank_org_and_category_group_as_unknown() {
        let mut csv = dataset(2, 2025, 0.0);
        csv.push_str("四川,,TypeA,,100,50,1,1,100,5,0,49,2025\n");
        let refs = ReferenceData {
            thresholds: serde_json::from_str(r#"{"问题机构识别阈值": {"变动成本率超标": 150}}"#).unwrap(),
            ..ReferenceData::default()
        };
        let (payload, ctx) = run(&csv, &refs);

        assert_eq!(ctx.mode, OrgMode::BranchFallback { name: "四川".into() });
        let orgs: Vec<&str> = payload.data_by_org.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(orgs, vec!["Org_0", "Org_1", "未知"]);
        let categories: Vec<&str> = payload.data_by_category.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(categories, vec!["CatA", "未知"]);

        // Blank org has claim rate 200%, so it is flagged under a real name.
        assert_eq!(payload.problems, vec!["未知(成本超标)"]);
        assert!(payload.problems.iter().all(|p| !p.starts_with('(')));
    }

    #[test]
    fn pipeline_from_files_on_disk() {
        let dir = std::env::temp_dir().join("motor_weekly_report_pipeline");
        std::fs::create_dir_all(&dir).unwrap();

        let csv_path = dir.join("2025保单第49周变动成本率明细表.csv");
        let header = HEADER.trim_end_matches(",policy_start_year");
        std::fs::write(
            &csv_path,
            format!(
                "{header}\n四川,乐山,TypeA,CatA,1000,500,10,1,200,100,2000,49\n四川,天府,TypeA,CatB,1000,500,10,1,200,100,2000,49\n"
            ),
        )
        .unwrap();

        let mapping_path = dir.join("business_type_mapping.json");
        std::fs::write(
            &mapping_path,
            r#"{"business_types": [{"csv_raw_value": "TypeA", "ui_full_name": "类型A", "ui_short_label": "A类", "category": "客车"}],
                "compatibility_mappings": []}"#,
        )
        .unwrap();
        let plans_path = dir.join("year-plans.json");
        std::fs::write(&plans_path, r#"{"年度保费计划": {"四川分公司": 5000, "乐山": 3000}}"#).unwrap();
        let thresholds_path = dir.join("thresholds.json");
        std::fs::write(
            &thresholds_path,
            r#"{"问题机构识别阈值": {"变动成本率超标": 40}, "四象限基准线": {"赔付率": 70}}"#,
        )
        .unwrap();

        let (records, load) = load_records(&csv_path).unwrap();
        let refs = ReferenceData::load(Some(&mapping_path), Some(&plans_path), Some(&thresholds_path)).unwrap();
        let (payload, ctx) = build_report(&records, &load, &csv_path, &refs, &ReportOptions::default());

        // Year comes from the file name, so pacing and the plan table apply.
        assert_eq!(ctx.year, 2025);
        assert!(ctx.pacing.enabled);
        assert_eq!(ctx.totals.annual_plan, 5000.0);
        let leshan = payload.data_by_org.iter().find(|r| r.key == "乐山").unwrap();
        let tianfu = payload.data_by_org.iter().find(|r| r.key == "天府").unwrap();
        assert_eq!(leshan.kpis.annual_plan, 3000.0);
        assert_eq!(tianfu.kpis.annual_plan, 2000.0);
        assert_eq!(payload.data_by_business_type[0].key, "A类");
        assert_eq!(payload.problems, vec!["乐山(成本超标)", "天府(成本超标)"]);

        let template = "<title>x</title><h1>x</h1><script>const DATA = {};</script>";
        let html = render_template(template, &payload, &ctx).unwrap();
        assert!(html.contains("<h1>四川分公司车险2025保单第49周经营分析</h1>"));
        let start = html.find("const DATA = ").unwrap() + "const DATA = ".len();
        let end = html.rfind(";</script>").unwrap();
        let data: serde_json::Value = serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(data["thresholds"]["四象限基准线"]["赔付率"], 70);
        assert_eq!(data["dataByOrg"].as_array().unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
