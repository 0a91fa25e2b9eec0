use crate::error::{ReportError, Result};
use crate::types::{RawRow, Record};
use crate::util::{parse_f64_safe, parse_i32_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const REQUIRED_COLUMNS: [&str; 12] = [
    "second_level_organization",
    "third_level_organization",
    "business_type_category",
    "customer_category_3",
    "signed_premium_yuan",
    "matured_premium_yuan",
    "policy_count",
    "claim_case_count",
    "reported_claim_payment_yuan",
    "expense_amount_yuan",
    "premium_plan_yuan",
    "week_number",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Numeric cells that were blank, unparseable or negative and became 0.
    pub coerced_values: usize,
    pub max_week: Option<i32>,
    pub policy_start_year: Option<i32>,
}

pub fn load_records(path: &Path) -> Result<(Vec<Record>, LoadReport)> {
    info!("Reading CSV from {:?}", path);
    let file = std::fs::File::open(path)?;
    let (records, report) = read_records(file)?;
    info!(
        "Parsed {} records ({} numeric values coerced to 0)",
        report.total_rows, report.coerced_values
    );
    Ok((records, report))
}

/// Read from any source. The header row is validated before a single
/// record is decoded.
pub fn read_records<R: Read>(source: R) -> Result<(Vec<Record>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(source);

    let headers = rdr.headers()?.clone();
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ReportError::MissingColumns(missing));
    }

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.deserialize::<RawRow>() {
        let row = result?;
        report.total_rows += 1;

        if report.policy_start_year.is_none() {
            report.policy_start_year = parse_i32_safe(row.policy_start_year.as_deref());
        }

        let record = clean_row(row, &mut report.coerced_values);
        report.max_week = Some(report.max_week.map_or(record.week, |w| w.max(record.week)));
        records.push(record);
    }
    debug!("Load report: {:?}", report);
    Ok((records, report))
}

fn clean_row(row: RawRow, coerced: &mut usize) -> Record {
    let mut amount = |cell: Option<String>| -> f64 {
        match parse_f64_safe(cell.as_deref()) {
            Some(v) if v >= 0.0 => v,
            _ => {
                *coerced += 1;
                0.0
            }
        }
    };

    let signed_premium = amount(row.signed_premium_yuan);
    let matured_premium = amount(row.matured_premium_yuan);
    let policy_count = amount(row.policy_count);
    let claim_count = amount(row.claim_case_count);
    let reported_claim = amount(row.reported_claim_payment_yuan);
    let expense = amount(row.expense_amount_yuan);
    let premium_plan = amount(row.premium_plan_yuan);

    let week = match parse_i32_safe(row.week_number.as_deref()) {
        Some(w) if w >= 0 => w,
        _ => {
            *coerced += 1;
            0
        }
    };

    let text = |cell: Option<String>| cell.map(|s| s.trim().to_string()).unwrap_or_default();

    Record {
        second_level_org: text(row.second_level_organization),
        third_level_org: text(row.third_level_organization),
        business_type: text(row.business_type_category),
        customer_category: text(row.customer_category_3),
        signed_premium,
        matured_premium,
        policy_count,
        claim_count,
        reported_claim,
        expense,
        premium_plan,
        week,
    }
}
