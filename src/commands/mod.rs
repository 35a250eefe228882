pub mod consolidate;
pub mod migrate;
pub mod status;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Console projection of a report. Details are suppressed by `--quiet`;
/// issues always reach stderr.
pub fn print_report(report: &CommandReport, quiet: bool) {
    if !quiet {
        println!(
            "{}: {}",
            report.command,
            if report.ok { "ok" } else { "failed" }
        );
        for detail in &report.details {
            println!(" - {detail}");
        }
    }
    for issue in &report.issues {
        eprintln!("{} issue: {issue}", report.command);
    }
}
