use crate::error::{ReportError, Result};
use crate::report::ReportContext;
use crate::types::{AggregatedRow, OrgPreviewRow, ReportPayload};
use crate::util::format_number;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table};

const DATA_MARKER: &str = "const DATA = {";
const DATE_MARKER: &str = "数据截止日期：";

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    write_report(path, &s)
}

/// Write the artifact in one go, creating the parent directory first.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Splice the payload into the report template and stamp title and date.
pub fn render_template(template: &str, payload: &ReportPayload, ctx: &ReportContext) -> Result<String> {
    let start = template
        .find(DATA_MARKER)
        .ok_or_else(|| ReportError::Template("no `const DATA = {...};` block".into()))?;
    let end = template[start..]
        .find("};")
        .map(|i| start + i + 2)
        .ok_or_else(|| ReportError::Template("unterminated `const DATA` block".into()))?;

    let json = serde_json::to_string_pretty(payload)?;
    let mut out = String::with_capacity(template.len() + json.len());
    out.push_str(&template[..start]);
    out.push_str("const DATA = ");
    out.push_str(&json);
    out.push(';');
    out.push_str(&template[end..]);

    let out = replace_inner(&out, "<title>", "</title>", &ctx.title);
    let out = replace_inner(&out, "<h1>", "</h1>", &ctx.title);
    Ok(match &ctx.report_date {
        Some(date) => replace_date(&out, date),
        None => out,
    })
}

/// Replace the text between every `open`/`close` pair that sits on one line.
/// A pair split across lines is left alone: the template's title markup is
/// single-line, and matching across lines could swallow unrelated markup.
fn replace_inner(s: &str, open: &str, close: &str, value: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find(open) {
        let after = &rest[i + open.len()..];
        match after.find(close) {
            Some(j) if !after[..j].contains('\n') => {
                out.push_str(&rest[..i + open.len()]);
                out.push_str(value);
                rest = &after[j..];
            }
            _ => {
                out.push_str(&rest[..i + open.len()]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn replace_date(s: &str, date: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find(DATE_MARKER) {
        out.push_str(&rest[..i + DATE_MARKER.len()]);
        out.push_str(date);
        let after = &rest[i + DATE_MARKER.len()..];
        let stop = after.find(['<', '\n']).unwrap_or(after.len());
        rest = &after[stop..];
    }
    out.push_str(rest);
    out
}

pub fn preview_rows(rows: &[AggregatedRow], max_rows: usize) -> Vec<OrgPreviewRow> {
    rows.iter()
        .take(max_rows)
        .map(|r| OrgPreviewRow {
            organization: r.key.clone(),
            signed_premium: format_number(r.kpis.signed_premium, 2),
            claim_rate: format_number(r.kpis.claim_rate, 2),
            expense_rate: format_number(r.kpis.expense_rate, 2),
            cost_rate: format_number(r.kpis.cost_rate, 2),
            premium_share: format_number(r.premium_share, 2),
            plan_achievement: r
                .kpis
                .plan_achievement
                .map(|v| format_number(v, 2))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn preview_table_rows(rows: &[AggregatedRow], max_rows: usize) {
    let slice = preview_rows(rows, max_rows);
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
