// Job summary reports

use crate::job::JobSummary;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_report(summary: &JobSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

pub fn generate_text_report(summary: &JobSummary) -> String {
    let rule = "━".repeat(60);
    let mut report = String::new();

    report.push_str(&format!("{}\n", rule.bright_blue()));
    report.push_str(&format!(
        "{}\n",
        format!("  {} JOB SUMMARY", summary.kind.as_str().to_uppercase())
            .bright_white()
            .bold()
    ));
    report.push_str(&format!("{}\n\n", rule.bright_blue()));

    report.push_str(&format!("Run ID:       {}\n", summary.run_id));
    report.push_str(&format!("Started:      {}\n", summary.started_at));
    report.push_str(&format!("Finished:     {}\n", summary.finished_at));
    report.push_str(&format!("Inputs:       {}\n", format_inputs(&summary.inputs)));
    report.push_str(&format!(
        "Output:       {} ({})\n",
        summary.output,
        summary.format.as_str()
    ));
    report.push_str(&format!("Shards:       {}\n", summary.shards));
    if summary.retries > 0 {
        report.push_str(&format!(
            "Retries:      {}\n",
            summary.retries.to_string().yellow()
        ));
    }
    report.push_str(&format!(
        "Rows:         {}\n\n",
        summary.rows.to_string().green().bold()
    ));

    report.push_str(&format!("{}\n", "COUNTERS".bright_white().bold()));
    for (name, value) in summary.counters.entries() {
        let value = if name.starts_with("BAD_") || name.ends_with("_ERROR") {
            if value > 0 {
                value.to_string().red().to_string()
            } else {
                value.to_string()
            }
        } else {
            value.to_string()
        };
        report.push_str(&format!("  {:<22}{}\n", name, value));
    }

    report
}

pub fn generate_json_report(summary: &JobSummary) -> Result<String, serde_json::Error> {
    let counters: serde_json::Map<String, serde_json::Value> = summary
        .counters
        .entries()
        .iter()
        .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
        .collect();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "warcgraph",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "id": summary.run_id,
                "kind": summary.kind,
                "started_at": summary.started_at,
                "finished_at": summary.finished_at,
                "inputs": summary.inputs,
                "output": summary.output,
                "output_format": summary.format,
                "shards": summary.shards,
                "retries": summary.retries,
                "rows": summary.rows
            },
            "counters": counters
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn format_inputs(inputs: &[String]) -> String {
    match inputs {
        [] => "none".to_string(),
        [single] => single.clone(),
        many => format!("{} paths", many.len()),
    }
}
