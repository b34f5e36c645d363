use std::io::Write;

use anyhow::Result;
use core_upgrader_core::{Outcome, RunReport, SkipReason, WizardStatus};

/// Output format for reports and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One row of `list`.
#[derive(Debug, serde::Serialize)]
pub struct StatusLine {
    pub identifier: &'static str,
    pub title: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StatusLine {
    pub fn new(identifier: &'static str, title: String, status: &WizardStatus) -> Self {
        let (status, detail) = match status {
            WizardStatus::Necessary => ("necessary", None),
            WizardStatus::NotNecessary => ("not_necessary", None),
            WizardStatus::PrerequisiteUnmet(unmet) => ("prerequisite_unmet", Some(unmet.join(", "))),
            WizardStatus::Error(error) => ("error", Some(error.clone())),
        };
        Self {
            identifier,
            title,
            status,
            detail,
        }
    }
}

fn skip_text(reason: &SkipReason) -> String {
    match reason {
        SkipReason::PrerequisiteUnmet { prerequisites } => {
            format!("prerequisites not met: {}", prerequisites.join(", "))
        }
        SkipReason::NotNecessary => "not necessary".to_string(),
        SkipReason::Unconfirmed => "not confirmed".to_string(),
    }
}

pub fn render_report(report: &RunReport, format: OutputFormat, writer: &mut dyn Write) -> Result<()> {
    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        return Ok(());
    }

    for result in &report.results {
        let (marker, detail) = match &result.outcome {
            Outcome::Succeeded => ("ok", format!("{} ms", result.duration_ms)),
            Outcome::Skipped { reason } => ("skip", skip_text(reason)),
            Outcome::Failed { error } => ("FAIL", error.clone()),
        };
        writeln!(writer, "[{marker:>4}] {:<40} {detail}", result.identifier)?;
    }
    let summary = &report.summary;
    writeln!(
        writer,
        "{} wizard(s): {} succeeded, {} skipped, {} failed",
        summary.total, summary.succeeded, summary.skipped, summary.failed
    )?;
    Ok(())
}

pub fn render_status(lines: &[StatusLine], format: OutputFormat, writer: &mut dyn Write) -> Result<()> {
    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *writer, lines)?;
        writeln!(writer)?;
        return Ok(());
    }

    if lines.is_empty() {
        writeln!(writer, "No upgrade wizards need to run.")?;
        return Ok(());
    }
    for line in lines {
        writeln!(writer, "{:<40} {:<20} {}", line.identifier, line.status, line.title)?;
        if let Some(detail) = &line.detail {
            writeln!(writer, "{:<40} {detail}", "")?;
        }
    }
    Ok(())
}
