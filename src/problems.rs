use crate::config::Thresholds;
use crate::types::AggregatedRow;

pub const MAX_PROBLEMS: usize = 5;

/// Flag organizations that breach a threshold, in table order, at most
/// [`MAX_PROBLEMS`] entries. One organization can be flagged twice.
pub fn detect(org_rows: &[AggregatedRow], thresholds: &Thresholds) -> Vec<String> {
    let mut problems = Vec::new();
    for row in org_rows {
        let k = &row.kpis;
        if k.cost_rate > thresholds.cost_rate {
            problems.push(format!("{}(成本超标)", row.key));
        } else if k
            .plan_achievement
            .is_some_and(|p| p > 0.0 && p < thresholds.plan_achievement)
        {
            problems.push(format!("{}(保费未达标)", row.key));
        }
        if k.expense_rate > thresholds.expense_rate {
            problems.push(format!("{}(费用率高)", row.key));
        }
    }
    problems.truncate(MAX_PROBLEMS);
    problems
}
