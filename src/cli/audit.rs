use std::process;

use clap::Parser;
use community_audit::{
    audit::{build_incomplete_report_with_progress, AuditReport},
    Config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::instrument;

use super::{
    open_store,
    terminal::{check_mark, is_narrower_than, Colorize},
};

/// Terminals narrower than this get the table without the URL column.
const URL_COLUMN_MIN_WIDTH: u16 = 100;

#[derive(Debug, Parser, Default)]
#[command(about = "Report official communities that fail a completeness check")]
pub struct Audit {
    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Do not show progress while evaluating
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

impl Audit {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut store = open_store(config)?;

        let progress = if self.quiet {
            ProgressBar::hidden()
        } else {
            progress_bar()
        };
        let report = build_incomplete_report_with_progress(&mut store, config, &progress)?;

        match self.output {
            OutputFormat::Table => Self::output_table(&report),
            OutputFormat::Json => Self::output_json(&report)?,
            OutputFormat::Summary => Self::output_summary(&report),
        }

        // Exit with a non-zero code when any community needs attention.
        if !report.is_empty() {
            process::exit(2);
        }

        Ok(())
    }

    fn output_table(report: &AuditReport) {
        if report.is_empty() {
            println!(
                "{}",
                format!(
                    "✅ All {} official communities are complete.",
                    report.audited()
                )
                .success()
            );
            return;
        }

        let show_url = !is_narrower_than(URL_COLUMN_MIN_WIDTH);
        let name_width = report
            .incomplete()
            .iter()
            .map(|record| record.name.chars().count())
            .max()
            .unwrap_or(0)
            .max("NAME".len());

        let mut header = format!(
            "{:>8}  {:<name_width$}  DISC  DESC  PAGE  ADMIN",
            "NODE", "NAME"
        );
        if show_url {
            header.push_str("  URL");
        }
        println!("{}", header.info());

        for record in report.incomplete() {
            let checks = record.completeness;
            // marks are one column wide; pad to the header labels
            let mut line = format!(
                "{:>8}  {:<name_width$}  {}     {}     {}     {}    ",
                record.parent_node_id,
                record.name,
                check_mark(checks.has_discussions),
                check_mark(checks.has_description_length),
                check_mark(checks.has_main_page_length),
                check_mark(checks.has_non_exclusively_male_admin),
            );
            if show_url {
                line.push_str("  ");
                line.push_str(&record.url.dim());
            }
            println!("{}", line.trim_end());
        }

        println!();
        println!(
            "{}",
            format!(
                "⚠️  {} of {} official communities are incomplete",
                report.incomplete().len(),
                report.audited()
            )
            .warning()
        );
    }

    fn output_json(report: &AuditReport) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }

    fn output_summary(report: &AuditReport) {
        let records = report.incomplete();
        let failing = |check: fn(&community_audit::Completeness) -> bool| {
            records
                .iter()
                .filter(|record| !check(&record.completeness))
                .count()
        };

        println!("Audited:    {}", report.audited());
        println!("Incomplete: {}", records.len());
        println!("  no discussions:        {}", failing(|c| c.has_discussions));
        println!(
            "  short description:     {}",
            failing(|c| c.has_description_length)
        );
        println!(
            "  short main page:       {}",
            failing(|c| c.has_main_page_length)
        );
        println!(
            "  only male admins:      {}",
            failing(|c| c.has_non_exclusively_male_admin)
        );
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    match ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
        Ok(style) => bar.set_style(style.progress_chars("=> ")),
        Err(e) => tracing::debug!("Invalid progress template: {e}"),
    }
    bar
}
