//! Decides whether a dataset covers one organization or a whole branch, and
//! which year and plan the report is measured against.

use crate::kpi::REFERENCE_YEAR;
use crate::types::Record;
use crate::util::infer_year_from_path;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Exactly this many third-level organizations means a single-org report.
pub const SINGLE_ORG_COUNT: usize = 1;
/// At least this many third-level organizations is the full branch roster.
pub const BRANCH_ROSTER_MIN: usize = 12;
/// Plan-table key holding the branch-wide annual plan.
pub const BRANCH_PLAN_KEY: &str = "四川分公司";
pub const DEFAULT_ORG_NAME: &str = "四川";
pub const FALLBACK_YEAR: i32 = REFERENCE_YEAR;
pub const DEFAULT_WEEK: i32 = 49;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgMode {
    SingleOrg { name: String },
    Branch { name: String },
    /// Several organizations but fewer than a full roster; displayed like a branch.
    BranchFallback { name: String },
}

impl OrgMode {
    pub fn detect(records: &[Record], requested_name: Option<&str>) -> Self {
        let third: BTreeSet<&str> = records
            .iter()
            .map(|r| r.third_level_org.as_str())
            .filter(|s| !s.is_empty())
            .collect();

        if third.len() == SINGLE_ORG_COUNT {
            if let Some(name) = third.iter().next() {
                return OrgMode::SingleOrg { name: name.to_string() };
            }
        }

        let name = requested_name
            .map(str::to_string)
            .or_else(|| {
                records
                    .iter()
                    .map(|r| r.second_level_org.as_str())
                    .find(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_ORG_NAME.to_string());

        if third.len() >= BRANCH_ROSTER_MIN {
            OrgMode::Branch { name }
        } else {
            OrgMode::BranchFallback { name }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OrgMode::SingleOrg { name } | OrgMode::Branch { name } | OrgMode::BranchFallback { name } => name,
        }
    }

    pub fn is_single_org(&self) -> bool {
        matches!(self, OrgMode::SingleOrg { .. })
    }

    /// Annual plan for the whole dataset. A single organization uses its own
    /// entry and falls back to the branch-wide one.
    pub fn total_plan(&self, plans: &HashMap<String, f64>) -> Option<f64> {
        match self {
            OrgMode::SingleOrg { name } => plans.get(name).or_else(|| plans.get(BRANCH_PLAN_KEY)).copied(),
            OrgMode::Branch { .. } | OrgMode::BranchFallback { .. } => plans.get(BRANCH_PLAN_KEY).copied(),
        }
    }

    pub fn title(&self, year: i32, week: i32) -> String {
        if self.is_single_org() {
            format!("{}车险{}保单第{}周经营分析", self.name(), year, week)
        } else {
            format!("{}分公司车险{}保单第{}周经营分析", self.name(), year, week)
        }
    }
}

/// Report year: data's policy start year, then the caller's, then the file
/// name, then the fallback.
pub fn resolve_year(policy_start_year: Option<i32>, requested: Option<i32>, csv_path: &Path) -> i32 {
    policy_start_year
        .or(requested)
        .or_else(|| infer_year_from_path(csv_path))
        .unwrap_or(FALLBACK_YEAR)
}

/// Reporting week: the caller's, then the latest week in the data.
pub fn resolve_week(requested: Option<i32>, data_max_week: Option<i32>) -> i32 {
    requested.or(data_max_week).unwrap_or(DEFAULT_WEEK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orgs(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                second_level_org: "四川".into(),
                third_level_org: format!("Org_{i}"),
                ..Record::default()
            })
            .collect()
    }

    #[test]
    fn one_org_is_single_org_mode() {
        let mode = OrgMode::detect(&orgs(1), None);
        assert_eq!(mode, OrgMode::SingleOrg { name: "Org_0".into() });
        assert!(mode.is_single_org());
    }

    #[test]
    fn twelve_orgs_is_branch_mode() {
        assert_eq!(OrgMode::detect(&orgs(12), None), OrgMode::Branch { name: "四川".into() });
        assert_eq!(OrgMode::detect(&orgs(20), Some("成都")), OrgMode::Branch { name: "成都".into() });
    }

    #[test]
    fn partial_roster_falls_back_to_branch_display() {
        let mode = OrgMode::detect(&orgs(5), None);
        assert_eq!(mode, OrgMode::BranchFallback { name: "四川".into() });
        assert!(!mode.is_single_org());
        assert_eq!(OrgMode::detect(&[], None).name(), DEFAULT_ORG_NAME);
    }

    #[test]
    fn total_plan_lookup_follows_mode() {
        let plans = HashMap::from([("Org_0".to_string(), 100.0), (BRANCH_PLAN_KEY.to_string(), 900.0)]);
        let single = OrgMode::SingleOrg { name: "Org_0".into() };
        let other = OrgMode::SingleOrg { name: "Org_9".into() };
        let branch = OrgMode::Branch { name: "四川".into() };
        assert_eq!(single.total_plan(&plans), Some(100.0));
        assert_eq!(other.total_plan(&plans), Some(900.0));
        assert_eq!(branch.total_plan(&plans), Some(900.0));
        assert_eq!(branch.total_plan(&HashMap::new()), None);
    }

    #[test]
    fn year_resolution_order() {
        let named = Path::new("data/2024保单第50周.csv");
        let plain = Path::new("data/upload.csv");
        assert_eq!(resolve_year(Some(2023), Some(2022), named), 2023);
        assert_eq!(resolve_year(None, Some(2022), named), 2022);
        assert_eq!(resolve_year(None, None, named), 2024);
        assert_eq!(resolve_year(None, None, plain), FALLBACK_YEAR);
    }

    #[test]
    fn week_resolution_order() {
        assert_eq!(resolve_week(Some(48), Some(50)), 48);
        assert_eq!(resolve_week(None, Some(50)), 50);
        assert_eq!(resolve_week(None, None), DEFAULT_WEEK);
    }

    #[test]
    fn titles() {
        let single = OrgMode::SingleOrg { name: "Org_0".into() };
        assert_eq!(single.title(2024, 49), "Org_0车险2024保单第49周经营分析");
        let branch = OrgMode::Branch { name: "四川".into() };
        assert_eq!(branch.title(2025, 50), "四川分公司车险2025保单第50周经营分析");
    }
}
