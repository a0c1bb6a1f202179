// Analysis report
//
// Console analysis, the fixed-layout summary file and the chart images of
// an `mdrm analyze` run. Formatting is kept apart from I/O so the text can
// be checked without touching the filesystem.

use crate::aggregate::{
    distribution_stats, percentage, ActiveSummary, Aggregator, CrossMnemonicItem, DateRange,
    ValueCount,
};
use crate::catalog::{Catalog, Column};
use crate::charts::{self, render_chart};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARY_FILE: &str = "mdrm_summary_report.txt";
pub const MNEMONIC_CHART_FILE: &str = "mnemonic_distribution.svg";
pub const ITEM_TYPE_CHART_FILE: &str = "item_type_distribution.svg";
pub const CONFIDENTIALITY_CHART_FILE: &str = "confidentiality_distribution.svg";

const SUMMARY_TOP: usize = 10;
const CONSOLE_TOP: usize = 20;
const CROSS_MNEMONIC_DETAILS: usize = 5;

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Non-null values with their counts
fn present(counts: &[ValueCount]) -> impl Iterator<Item = (&str, usize)> {
    counts
        .iter()
        .filter_map(|c| c.value.as_deref().map(|v| (v, c.count)))
}

// ============================================================================
// SUMMARY REPORT
// ============================================================================

/// Everything the summary file shows, computed once from the aggregator.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub total_rows: usize,
    pub unique_mnemonics: usize,
    pub unique_item_codes: usize,
    pub unique_reporting_forms: usize,
    pub date_range: DateRange,
    pub active: ActiveSummary,
    pub mnemonics: Vec<ValueCount>,
    pub item_types: Vec<ValueCount>,
    pub confidentiality: Vec<ValueCount>,
    pub cross_mnemonic: Vec<CrossMnemonicItem>,
    pub reporting_forms: Vec<ValueCount>,
}

impl SummaryReport {
    pub fn build(agg: &Aggregator<'_>) -> Self {
        Self {
            total_rows: agg.total_rows(),
            unique_mnemonics: agg.count_distinct(Column::Mnemonic),
            unique_item_codes: agg.count_distinct(Column::ItemCode),
            unique_reporting_forms: agg.count_distinct(Column::ReportingForm),
            date_range: agg.date_range(),
            active: agg.active_count(),
            mnemonics: agg.value_counts(Column::Mnemonic),
            item_types: agg.value_counts(Column::ItemType),
            confidentiality: agg.value_counts(Column::Confidentiality),
            cross_mnemonic: agg.cross_mnemonic_items(SUMMARY_TOP),
            reporting_forms: agg.value_counts(Column::ReportingForm),
        }
    }

    /// Render the report text. `generated_at` is the only non-derived input.
    pub fn render(&self, generated_at: NaiveDateTime) -> String {
        let mut out = String::new();
        let total = self.total_rows;

        // Writing into a String cannot fail
        let _ = writeln!(out, "MDRM DATA SUMMARY REPORT");
        let _ = writeln!(out, "=======================\n");
        let _ = writeln!(
            out,
            "Report generated on: {}\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        );

        let _ = writeln!(out, "DATASET OVERVIEW");
        let _ = writeln!(out, "-----------------");
        let _ = writeln!(out, "Total number of records: {}", total);
        let _ = writeln!(out, "Number of unique Mnemonics: {}", self.unique_mnemonics);
        let _ = writeln!(out, "Number of unique Item Codes: {}", self.unique_item_codes);
        let _ = writeln!(
            out,
            "Number of unique Reporting Forms: {}\n",
            self.unique_reporting_forms
        );
        let _ = writeln!(
            out,
            "Date range: {} to {}\n",
            fmt_date(self.date_range.earliest),
            fmt_date(self.date_range.latest)
        );
        let _ = writeln!(
            out,
            "Number of currently active items: {} ({:.2}%)\n",
            self.active.count, self.active.percentage
        );

        let _ = writeln!(out, "MNEMONIC DISTRIBUTION");
        let _ = writeln!(out, "---------------------");
        let _ = writeln!(out, "Top {} most common Mnemonics:", SUMMARY_TOP);
        for (mnemonic, count) in present(&self.mnemonics).take(SUMMARY_TOP) {
            let _ = writeln!(out, "{}: {} items", mnemonic, count);
        }
        out.push('\n');

        let _ = writeln!(out, "ITEM TYPE DISTRIBUTION");
        let _ = writeln!(out, "---------------------");
        for (item_type, count) in present(&self.item_types) {
            let _ = writeln!(
                out,
                "{}: {} items ({:.2}%)",
                item_type,
                count,
                percentage(count, total)
            );
        }
        out.push('\n');

        let _ = writeln!(out, "CONFIDENTIALITY DISTRIBUTION");
        let _ = writeln!(out, "---------------------------");
        for (conf, count) in present(&self.confidentiality) {
            let _ = writeln!(
                out,
                "{}: {} items ({:.2}%)",
                conf,
                count,
                percentage(count, total)
            );
        }
        out.push('\n');

        let _ = writeln!(out, "CROSS-MNEMONIC ITEMS");
        let _ = writeln!(out, "-------------------");
        let _ = writeln!(
            out,
            "Top {} Item Codes that appear across the most Mnemonics:",
            SUMMARY_TOP
        );
        for item in &self.cross_mnemonic {
            let _ = writeln!(
                out,
                "{} ({}): appears in {} mnemonics",
                item.item_code,
                item.item_names.first().map(String::as_str).unwrap_or(""),
                item.mnemonics
            );
        }
        out.push('\n');

        let _ = writeln!(out, "REPORTING FORM DISTRIBUTION");
        let _ = writeln!(out, "--------------------------");
        let _ = writeln!(out, "Top {} most common Reporting Forms:", SUMMARY_TOP);
        for (form, count) in present(&self.reporting_forms).take(SUMMARY_TOP) {
            let _ = writeln!(out, "{}: {} items", form, count);
        }
        out.push('\n');

        out
    }

    pub fn write(&self, path: &Path, generated_at: NaiveDateTime) -> Result<()> {
        std::fs::write(path, self.render(generated_at))
            .with_context(|| format!("Failed to write summary report {}", path.display()))
    }
}

// ============================================================================
// CONSOLE ANALYSIS
// ============================================================================

fn write_counts<W: Write>(out: &mut W, counts: &[ValueCount], limit: usize) -> io::Result<()> {
    for (value, count) in present(counts).take(limit) {
        writeln!(out, "{:<20} {}", value, count)?;
    }
    Ok(())
}

fn write_stats<W: Write>(out: &mut W, counts: &[ValueCount], noun: &str) -> io::Result<()> {
    writeln!(out, "\n{} distribution statistics:", noun)?;
    match distribution_stats(counts) {
        Some(stats) => {
            writeln!(out, "Mean items per {}: {:.2}", noun, stats.mean)?;
            writeln!(out, "Median items per {}: {:.2}", noun, stats.median)?;
            writeln!(out, "Min items per {}: {}", noun, stats.min)?;
            writeln!(out, "Max items per {}: {}", noun, stats.max)?;
        }
        None => writeln!(out, "No {} values present", noun)?,
    }
    Ok(())
}

fn write_percentages<W: Write>(out: &mut W, counts: &[ValueCount], total: usize) -> io::Result<()> {
    for (value, count) in present(counts) {
        writeln!(out, "{}: {:.2}%", value, percentage(count, total))?;
    }
    Ok(())
}

/// Write the sectioned console analysis to `out`.
pub fn write_analysis<W: Write>(agg: &Aggregator<'_>, out: &mut W) -> io::Result<()> {
    let total = agg.total_rows();

    writeln!(out, "\n=== BASIC STATISTICS ===")?;
    writeln!(out, "Total number of records: {}", total)?;
    writeln!(out, "Number of unique Mnemonics: {}", agg.count_distinct(Column::Mnemonic))?;
    writeln!(out, "Number of unique Item Codes: {}", agg.count_distinct(Column::ItemCode))?;
    writeln!(
        out,
        "Number of unique Reporting Forms: {}",
        agg.count_distinct(Column::ReportingForm)
    )?;
    let range = agg.date_range();
    writeln!(
        out,
        "Date range: {} to {}",
        fmt_date(range.earliest),
        fmt_date(range.latest)
    )?;
    let active = agg.active_count();
    writeln!(
        out,
        "Number of currently active items: {} ({:.2}%)",
        active.count, active.percentage
    )?;

    writeln!(out, "\n=== MNEMONIC ANALYSIS ===")?;
    let mnemonics = agg.value_counts(Column::Mnemonic);
    writeln!(out, "Top {} most common Mnemonics:", CONSOLE_TOP)?;
    write_counts(out, &mnemonics, CONSOLE_TOP)?;
    write_stats(out, &mnemonics, "Mnemonic")?;

    writeln!(out, "\n=== ITEM TYPE ANALYSIS ===")?;
    let item_types = agg.value_counts(Column::ItemType);
    writeln!(out, "Item Type distribution:")?;
    write_counts(out, &item_types, usize::MAX)?;
    writeln!(out, "\nItem Type percentages:")?;
    write_percentages(out, &item_types, total)?;

    writeln!(out, "\n=== CONFIDENTIALITY ANALYSIS ===")?;
    let confidentiality = agg.value_counts(Column::Confidentiality);
    writeln!(out, "Confidentiality distribution:")?;
    write_counts(out, &confidentiality, usize::MAX)?;
    writeln!(out, "\nConfidentiality percentages:")?;
    write_percentages(out, &confidentiality, total)?;

    writeln!(out, "\n=== ITEM CODE ANALYSIS ===")?;
    writeln!(out, "Top {} most common Item Codes:", CONSOLE_TOP)?;
    write_counts(out, &agg.value_counts(Column::ItemCode), CONSOLE_TOP)?;
    writeln!(out, "\nItem Codes that appear across the most Mnemonics:")?;
    let cross = agg.cross_mnemonic_items(SUMMARY_TOP);
    for item in &cross {
        writeln!(out, "{:<20} {}", item.item_code, item.mnemonics)?;
    }
    writeln!(out, "\nDetails of top {} cross-mnemonic items:", CROSS_MNEMONIC_DETAILS)?;
    for item in cross.iter().take(CROSS_MNEMONIC_DETAILS) {
        writeln!(
            out,
            "Item Code {} appears in {} mnemonics",
            item.item_code, item.mnemonics
        )?;
        writeln!(out, "Item Name(s): {}\n", item.item_names.join(", "))?;
    }

    writeln!(out, "\n=== REPORTING FORM ANALYSIS ===")?;
    let forms = agg.value_counts(Column::ReportingForm);
    writeln!(out, "Top {} most common Reporting Forms:", CONSOLE_TOP)?;
    write_counts(out, &forms, CONSOLE_TOP)?;
    write_stats(out, &forms, "Reporting Form")?;

    Ok(())
}

// ============================================================================
// FULL RUN
// ============================================================================

/// Files produced by `run_analysis`
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub summary: PathBuf,
    pub charts: Vec<PathBuf>,
}

/// Print the console analysis, render the three charts and write the
/// summary file into `output_dir`.
pub fn run_analysis(catalog: &Catalog, output_dir: &Path) -> Result<AnalysisOutputs> {
    let agg = Aggregator::new(catalog);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_analysis(&agg, &mut out).context("Failed to print analysis")?;
    }

    let chart_specs = [
        (charts::mnemonic_chart(&agg), MNEMONIC_CHART_FILE, "mnemonic distribution"),
        (charts::item_type_chart(&agg), ITEM_TYPE_CHART_FILE, "item type distribution"),
        (
            charts::confidentiality_chart(&agg),
            CONFIDENTIALITY_CHART_FILE,
            "confidentiality distribution",
        ),
    ];

    let mut chart_paths = Vec::with_capacity(chart_specs.len());
    for (series, file, name) in chart_specs.iter() {
        let path = output_dir.join(file);
        render_chart(series, &path)?;
        println!("Saved {} chart to '{}'", name, path.display());
        chart_paths.push(path);
    }

    println!("\n=== GENERATING SUMMARY REPORT ===");
    let summary_path = output_dir.join(SUMMARY_FILE);
    SummaryReport::build(&agg).write(&summary_path, Local::now().naive_local())?;
    println!("Summary report saved to '{}'", summary_path.display());

    info!(
        output_dir = %output_dir.display(),
        charts = chart_paths.len(),
        "Analysis complete"
    );

    Ok(AnalysisOutputs {
        summary: summary_path,
        charts: chart_paths,
    })
}
