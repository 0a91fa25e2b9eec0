//! KPI formulas for motor insurance operations.
//!
//! All rates are percentages. Every division goes through
//! [`safe_divide`], so a zero denominator yields `0.0` rather than NaN.

use crate::types::{KpiResult, Record};
use crate::util::safe_divide;

/// The year the day-of-year model below is calibrated for.
pub const REFERENCE_YEAR: i32 = 2025;
/// Week 49 of 2025 closes on 6 December, day 340 of the year.
pub const REFERENCE_WEEK: i32 = 49;
pub const REFERENCE_BASE_DAY: i32 = 340;
pub const DAYS_IN_YEAR: i32 = 365;

/// Time-pacing settings for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub enabled: bool,
    pub week: i32,
    pub reference_week: i32,
    pub reference_base_day: i32,
    pub days_in_year: i32,
}

impl PacingConfig {
    pub fn new(week: i32, enabled: bool) -> Self {
        PacingConfig {
            enabled,
            week,
            reference_week: REFERENCE_WEEK,
            reference_base_day: REFERENCE_BASE_DAY,
            days_in_year: DAYS_IN_YEAR,
        }
    }

    /// Pacing is only meaningful for the year the calendar model describes.
    pub fn for_year(year: i32, week: i32) -> Self {
        PacingConfig::new(week, year == REFERENCE_YEAR)
    }

    pub fn days_elapsed(&self) -> i32 {
        // Weeks come straight from the CSV, so widen before scaling.
        let raw = i64::from(self.reference_base_day)
            + (i64::from(self.week) - i64::from(self.reference_week)) * 7;
        raw.clamp(1, i64::from(self.days_in_year)) as i32
    }

    pub fn time_progress(&self) -> f64 {
        self.days_elapsed() as f64 / self.days_in_year as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KpiCalculator {
    pacing: PacingConfig,
}

impl KpiCalculator {
    pub fn new(pacing: PacingConfig) -> Self {
        KpiCalculator { pacing }
    }

    /// Compute the KPI set for `records`. `manual_plan` replaces the summed
    /// per-record plan when given.
    pub fn calculate<'a, I>(&self, records: I, manual_plan: Option<f64>) -> KpiResult
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut sum = Record::default();
        for r in records {
            sum.signed_premium += r.signed_premium;
            sum.matured_premium += r.matured_premium;
            sum.policy_count += r.policy_count;
            sum.claim_count += r.claim_count;
            sum.reported_claim += r.reported_claim;
            sum.expense += r.expense;
            sum.premium_plan += r.premium_plan;
        }

        let claim_rate = safe_divide(sum.reported_claim, sum.matured_premium) * 100.0;
        let expense_rate = safe_divide(sum.expense, sum.signed_premium) * 100.0;
        let cost_rate = claim_rate + expense_rate;
        let margin_rate = 100.0 - cost_rate;
        let margin_amount = sum.matured_premium * margin_rate / 100.0;

        let annual_plan = manual_plan.unwrap_or(sum.premium_plan);
        let plan_achievement = (self.pacing.enabled && annual_plan > 0.0).then(|| {
            let premium_vs_plan = safe_divide(sum.signed_premium, annual_plan);
            safe_divide(premium_vs_plan, self.pacing.time_progress()) * 100.0
        });

        KpiResult {
            signed_premium: sum.signed_premium,
            matured_premium: sum.matured_premium,
            reported_claim: sum.reported_claim,
            expense: sum.expense,
            policy_count: sum.policy_count,
            claim_count: sum.claim_count,
            annual_plan,
            claim_rate,
            expense_rate,
            cost_rate,
            margin_rate,
            margin_amount,
            // Policy-count based. The exposure-weighted variant gives
            // different figures and is not what the report shows.
            claim_frequency: safe_divide(sum.claim_count, sum.policy_count) * 100.0,
            avg_claim_payment: safe_divide(sum.reported_claim, sum.claim_count),
            plan_achievement,
        }
    }
}
