//! Human-readable build summaries with deltas against the previous report.

use crate::config::SummaryFormat;
use crate::report::Report;
use crate::status::Status;
use owo_colors::{OwoColorize, Style};
use std::fmt::Write;

/// Link target of the HTML totals line.
pub const RESULT_URL_NAME: &str = "testopiaResult";

/// Delta suffix shown next to a counter, only when it grew.
pub fn plus_signal(current: usize, previous: usize) -> String {
    if current > previous {
        format!(" (+{})", current - previous)
    } else {
        String::new()
    }
}

/// Plain label for a raw status id, `Undefined` when it is outside the taxonomy.
pub fn status_label(status_id: i32) -> &'static str {
    Status::from_id(status_id).map_or("Undefined", Status::label)
}

#[derive(Debug, Default, Clone)]
struct Styles {
    is_colorized: bool,
    pass: Style,
    fail: Style,
    blocked: Style,
    not_run: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.is_colorized = true;
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.blocked = Style::new().yellow().bold();
        self.not_run = Style::new().dimmed();
    }
}

/// Renders report summaries and per-case detail tables.
#[derive(Debug, Clone)]
pub struct SummaryRenderer {
    format: SummaryFormat,
    styles: Styles,
}

impl SummaryRenderer {
    pub fn new(format: SummaryFormat) -> Self {
        Self {
            format,
            styles: Styles::default(),
        }
    }

    /// Enable ANSI colors for the text format.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Summary line with totals. Without a previous report no deltas are shown.
    pub fn summary(&self, report: &Report, previous: Option<&Report>) -> String {
        let previous = previous.unwrap_or(report);
        let counter = |current: usize, prev: usize| format!("{current}{}", plus_signal(current, prev));

        let total = counter(report.tests_total(), previous.tests_total());
        let passed = counter(report.passed(), previous.passed());
        let failed = counter(report.failed(), previous.failed());
        let blocked = counter(report.blocked(), previous.blocked());
        let not_run = counter(report.not_run(), previous.not_run());

        match self.format {
            SummaryFormat::Html => format!(
                "<p><b>Build {}</b></p><p><b>Run {}</b></p><p><b>Environment {}</b></p>\
                 <p><a href=\"{RESULT_URL_NAME}\">Total of {total} tests</a>. \
                 Where {passed} passed, {failed} failed, {blocked} were blocked \
                 and {not_run} were not executed.</p>",
                report.build_id(),
                report.run_id(),
                report.env_id(),
            ),
            SummaryFormat::Text => format!(
                "Build {} | Run {} | Environment {}\n\
                 Total of {total} tests. Where {passed} passed, {failed} failed, \
                 {blocked} were blocked and {not_run} were not executed.\n",
                report.build_id(),
                report.run_id(),
                report.env_id(),
            ),
        }
    }

    /// One row per logged case, in append order.
    pub fn details(&self, report: &Report) -> String {
        let mut out = String::new();
        match self.format {
            SummaryFormat::Html => {
                out.push_str("<p>Summary details</p>");
                out.push_str("<table border=\"1\">\n");
                out.push_str("<tr><th>Test Case ID</th><th>Status</th></tr>\n");
                for entry in report.test_cases() {
                    let _ = write!(
                        out,
                        "<tr>\n<td>{}</td><td>{}</td>\n</tr>\n",
                        entry.id(),
                        html_status(entry.status_id())
                    );
                }
                out.push_str("</table>");
            }
            SummaryFormat::Text => {
                out.push_str("Test Case ID  Status\n");
                for entry in report.test_cases() {
                    let _ = writeln!(
                        out,
                        "{:<12}  {}",
                        entry.id(),
                        self.text_status(entry.status_id())
                    );
                }
            }
        }
        out
    }

    fn text_status(&self, status_id: i32) -> String {
        let label = status_label(status_id);
        if !self.styles.is_colorized {
            return label.to_string();
        }
        let style = match Status::from_id(status_id) {
            Some(Status::Passed) => self.styles.pass,
            Some(Status::Failed) => self.styles.fail,
            Some(Status::Blocked) => self.styles.blocked,
            Some(Status::Idle) => self.styles.not_run,
            None => return label.to_string(),
        };
        label.style(style).to_string()
    }
}

fn html_status(status_id: i32) -> String {
    let color = match Status::from_id(status_id) {
        Some(Status::Failed) => "red",
        Some(Status::Passed) => "green",
        Some(Status::Blocked) => "yellow",
        Some(Status::Idle) => "gray",
        None => return "Undefined".to_string(),
    };
    format!("<span style='color: {color}'>{}</span>", status_label(status_id))
}
