//! Renders group reports for people (colored text) and machines (JSON).

use std::io::{self, Write};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::config::{HarnessConfig, OutputFormat};
use crate::runner::GroupReport;

/// Totals across every group of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub groups: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_reports(reports: &[GroupReport]) -> Self {
        reports.iter().fold(Self::default(), |acc, r| Self {
            groups: acc.groups + 1,
            passed: acc.passed + r.passed(),
            failed: acc.failed + r.failed(),
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total_tests(&self) -> usize {
        self.passed + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_tests() == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total_tests() as f64) * 100.0
    }
}

#[derive(Serialize)]
struct JsonRun<'a> {
    summary: RunSummary,
    groups: &'a [GroupReport],
}

/// Writes a human-readable report, coloring only if `out` supports it.
pub fn render_text<W: WriteColor>(out: &mut W, reports: &[GroupReport]) -> io::Result<()> {
    for report in reports {
        out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(out, "{}", report.group)?;
        out.reset()?;

        for result in &report.results {
            if result.passed {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                write!(out, "  ✓ ")?;
                out.reset()?;
                writeln!(out, "{}", result.case_name)?;
                continue;
            }
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "  ✗ ")?;
            out.reset()?;
            writeln!(out, "{}", result.case_name)?;
            if let Some(reason) = &result.failure_reason {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(out, "      {}", reason)?;
                out.reset()?;
            }
        }
        writeln!(out)?;
    }

    let summary = RunSummary::from_reports(reports);
    let color = if summary.has_failures() {
        Color::Red
    } else {
        Color::Green
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(
        out,
        "{} passed, {} failed ({:.1}%)",
        summary.passed,
        summary.failed,
        summary.success_rate()
    )?;
    out.reset()
}

/// Serializes the reports plus their summary as pretty JSON.
pub fn render_json(reports: &[GroupReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonRun {
        summary: RunSummary::from_reports(reports),
        groups: reports,
    })
}

/// Prints reports to stdout in the configured format.
pub fn print_reports(reports: &[GroupReport], config: &HarnessConfig) -> io::Result<()> {
    match config.format {
        OutputFormat::Json => {
            let json = render_json(reports).map_err(io::Error::other)?;
            println!("{}", json);
            Ok(())
        }
        OutputFormat::Text => {
            let choice = if config.use_colors {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            };
            let mut stdout = StandardStream::stdout(choice);
            render_text(&mut stdout, reports)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorType;
    use crate::runner::CaseResult;
    use termcolor::Buffer;

    fn sample() -> Vec<GroupReport> {
        vec![GroupReport {
            group: "WeakRef".to_string(),
            results: vec![
                CaseResult {
                    case_name: "ok".to_string(),
                    passed: true,
                    failure_reason: None,
                    failure_kind: None,
                    assertions: 1,
                },
                CaseResult {
                    case_name: "broken".to_string(),
                    passed: false,
                    failure_reason: Some("Assertion failed: expected null".to_string()),
                    failure_kind: Some(ErrorType::AssertionFailed),
                    assertions: 1,
                },
            ],
        }]
    }

    #[test]
    fn summary_totals() {
        let summary = RunSummary::from_reports(&sample());
        assert_eq!(summary.groups, 1);
        assert_eq!(summary.total_tests(), 2);
        assert!(summary.has_failures());
        assert_eq!(summary.success_rate(), 50.0);
        assert_eq!(RunSummary::default().success_rate(), 0.0);
    }

    #[test]
    fn text_report_lists_failures_with_reason() {
        let mut buf = Buffer::no_color();
        render_text(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf.into_inner()).unwrap();
        assert!(text.starts_with("WeakRef\n"));
        assert!(text.contains("  ✓ ok\n"));
        assert!(text.contains("  ✗ broken\n      Assertion failed: expected null\n"));
        assert!(text.ends_with("1 passed, 1 failed (50.0%)\n"));
    }

    #[test]
    fn json_report_omits_empty_failure_fields() {
        let json = render_json(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["failed"], 1);
        let ok = &parsed["groups"][0]["results"][0];
        assert!(ok.get("failure_reason").is_none());
        let broken = &parsed["groups"][0]["results"][1];
        assert_eq!(broken["failure_kind"], "AssertionFailed");
    }
}
