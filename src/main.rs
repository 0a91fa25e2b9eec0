// Entry point and high-level CLI flow.
//
// One run reads the weekly policy-segment CSV, computes the KPI tables and
// writes a single artifact: the HTML template with the data spliced in, or
// the bare JSON payload when no template is given.
mod aggregate;
mod config;
mod error;
mod kpi;
mod loader;
mod mapper;
mod mode;
mod output;
mod problems;
mod report;
mod types;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use report::{build_report, ReferenceData, ReportOptions};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motor-weekly-report", about = "Generate the weekly motor insurance operations report")]
struct Cli {
    /// Policy-segment CSV export
    #[arg(long)]
    csv: PathBuf,

    /// HTML template containing a `const DATA = {...};` block
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output path; defaults to output/经营分析周报.html (or .json without a template)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Business type mapping document
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Annual premium plan document
    #[arg(long = "year-plans")]
    year_plans: Option<PathBuf>,

    /// Problem threshold document
    #[arg(long)]
    thresholds: Option<PathBuf>,

    /// Reporting week; defaults to the latest week_number in the data
    #[arg(long)]
    week: Option<i32>,

    /// Organization name shown in branch reports
    #[arg(long)]
    org: Option<String>,

    /// Report year; defaults to policy_start_year, then the file name, then 2025
    #[arg(long)]
    year: Option<i32>,

    /// Organization rows to print after generation
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    println!("开始生成经营分析报告...");
    println!("数据源: {}", cli.csv.display());

    let (records, load_report) = loader::load_records(&cli.csv)
        .with_context(|| format!("failed to load {}", cli.csv.display()))?;
    println!(
        "Processing dataset... ({} rows loaded, {} numeric values coerced to 0)",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.coerced_values)
    );

    let refs = ReferenceData::load(
        cli.mapping.as_deref(),
        cli.year_plans.as_deref(),
        cli.thresholds.as_deref(),
    )
    .context("failed to load reference documents")?;

    let options = ReportOptions {
        week: cli.week,
        organization: cli.org.clone(),
        year: cli.year,
    };
    let (payload, ctx) = build_report(&records, &load_report, &cli.csv, &refs, &options);

    let output_path = match (&cli.output, &cli.template) {
        (Some(p), _) => p.clone(),
        (None, Some(_)) => PathBuf::from("output").join("经营分析周报.html"),
        (None, None) => PathBuf::from("output").join("经营分析周报.json"),
    };
    match &cli.template {
        Some(template_path) => {
            let template = std::fs::read_to_string(template_path)
                .with_context(|| format!("failed to read template {}", template_path.display()))?;
            let html = output::render_template(&template, &payload, &ctx)?;
            output::write_report(&output_path, &html)?;
        }
        None => output::write_json(&output_path, &payload)?,
    }
    info!("Report written to {:?}", output_path);

    println!("\n{}", ctx.title);
    if let Some(date) = &ctx.report_date {
        println!("数据截止日期：{}", date);
    }
    println!(
        "签单保费 {} 元, 变动成本率 {}%\n",
        util::format_number(payload.summary.signed_premium, 2),
        util::format_number(payload.summary.cost_rate, 2)
    );
    output::preview_table_rows(&payload.data_by_org, cli.preview_rows);
    if !payload.problems.is_empty() {
        println!("问题机构: {}\n", payload.problems.join("、"));
    }
    println!("报告已生成: {}", output_path.display());
    Ok(())
}
