use crate::kpi::KpiCalculator;
use crate::types::{AggregatedRow, Dimension, KpiResult, Record};
use crate::util::safe_divide;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Builds the per-dimension breakdown tables against one set of global totals.
pub struct DimensionAggregator<'a> {
    calculator: &'a KpiCalculator,
    total_premium: f64,
    total_claim: f64,
}

impl<'a> DimensionAggregator<'a> {
    pub fn new(calculator: &'a KpiCalculator, totals: &KpiResult) -> Self {
        DimensionAggregator {
            calculator,
            total_premium: totals.signed_premium,
            total_claim: totals.reported_claim,
        }
    }

    /// Group `records` by `group_key`, compute KPIs and shares per group and
    /// sort by signed premium, largest first. Ties keep key order.
    ///
    /// `plans` is consulted by exact group name; a miss leaves the calculator
    /// to sum the per-record plan values.
    pub fn aggregate<F>(
        &self,
        records: &[Record],
        dimension: Dimension,
        group_key: F,
        plans: Option<&HashMap<String, f64>>,
    ) -> Vec<AggregatedRow>
    where
        F: Fn(&Record) -> String,
    {
        let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
        for r in records {
            groups.entry(group_key(r)).or_default().push(r);
        }

        let mut rows: Vec<AggregatedRow> = groups
            .into_iter()
            .map(|(key, members)| {
                let plan = plans.and_then(|p| p.get(&key)).copied();
                let kpis = self.calculator.calculate(members.iter().copied(), plan);
                AggregatedRow {
                    dimension,
                    premium_share: safe_divide(kpis.signed_premium, self.total_premium) * 100.0,
                    claim_share: safe_divide(kpis.reported_claim, self.total_claim) * 100.0,
                    key,
                    kpis,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.kpis
                .signed_premium
                .partial_cmp(&a.kpis.signed_premium)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }
}
