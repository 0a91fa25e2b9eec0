// Parsing, arithmetic and formatting helpers.
//
// The CSV exports this tool reads are hand-edited spreadsheets, so all the
// "dirty" cell handling lives here and the rest of the code can assume
// clean, typed values.
use chrono::{NaiveDate, Weekday};
use num_format::{Locale, ToFormattedString};
use std::path::Path;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for blanks, text and non-finite values.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer cells are sometimes exported as `49.0`, so go through `f64`.
pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let v = parse_f64_safe(s)?;
    if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        return None;
    }
    Some(v as i32)
}

/// Divide, returning exactly `0.0` when the denominator is zero or not a
/// number. Keeps NaN and infinity out of every report figure.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let v = numerator / denominator;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// First `20xx` year embedded in the file name, e.g.
/// `2024保单第50周变动成本率明细表.csv` -> 2024.
pub fn infer_year_from_path(path: &Path) -> Option<i32> {
    let name = path.file_name()?.to_str()?;
    let bytes = name.as_bytes();
    bytes.windows(4).find_map(|w| {
        if w[0] == b'2' && w[1] == b'0' && w[2].is_ascii_digit() && w[3].is_ascii_digit() {
            std::str::from_utf8(w).ok()?.parse().ok()
        } else {
            None
        }
    })
}

/// Saturday of the given ISO week, rendered the way the report header shows it.
pub fn report_date(year: i32, week: i32) -> Option<String> {
    let week = u32::try_from(week).ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Sat).map(|d| d.format("%Y年%m月%d日").to_string())
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
