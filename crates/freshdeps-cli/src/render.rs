use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use chrono::{DateTime, Utc};
use freshdeps_core::DedupedPackage;
use freshdeps_resolver::Report;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};

const COLUMN_GAP: &str = "  ";
const HEADERS: [&str; 4] = ["PACKAGE", "VERSION", "UPDATED", "FROM"];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn output_style_for(no_color: bool) -> OutputStyle {
    if no_color || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct Spinner {
    progress_bar: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn start_spinner(self, label: &str) -> Spinner {
        if self.style == OutputStyle::Plain {
            return Spinner { progress_bar: None };
        }

        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
            progress_bar.set_style(style.tick_chars("|/-\\ "));
        }
        progress_bar.set_message(label.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        Spinner {
            progress_bar: Some(progress_bar),
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }
}

impl Spinner {
    pub(crate) fn finish(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

struct Cell {
    text: String,
    style: Style,
}

impl Cell {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

pub(crate) fn render_report(report: &Report, now: DateTime<Utc>, style: OutputStyle) -> Vec<String> {
    let mut rows: Vec<[Cell; 4]> = Vec::with_capacity(report.packages.len() + 2);
    rows.push(HEADERS.map(|header| Cell::new(header, header_style())));
    for package in &report.packages {
        rows.push(package_row(package, now));
    }
    if report.is_truncated() {
        rows.push([
            Cell::new("...", package_style()),
            Cell::new("...", version_style()),
            Cell::new("...", fresh_style()),
            Cell::new("", Style::new()),
        ]);
    }

    let mut widths = [0_usize; 4];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.text.chars().count());
        }
    }

    rows.iter()
        .map(|row| render_row(row, &widths, style))
        .collect()
}

fn package_row(package: &DedupedPackage, now: DateTime<Utc>) -> [Cell; 4] {
    let published = package.package.published;
    [
        Cell::new(package.package.name.clone(), package_style()),
        Cell::new(package.package.version.to_string(), version_style()),
        Cell::new(format_age(now, published), age_style(now, published)),
        Cell::new(format_provenance(package), provenance_style()),
    ]
}

fn render_row(row: &[Cell; 4], widths: &[usize; 4], style: OutputStyle) -> String {
    let mut line = String::new();
    for (index, (cell, width)) in row.iter().zip(widths).enumerate() {
        if index > 0 {
            line.push_str(COLUMN_GAP);
        }
        let padding = width.saturating_sub(cell.text.chars().count());
        match style {
            OutputStyle::Plain => line.push_str(&cell.text),
            OutputStyle::Rich if cell.text.is_empty() => {}
            OutputStyle::Rich => line.push_str(&colorize(cell.style, &cell.text)),
        }
        line.push_str(&" ".repeat(padding));
    }
    line.trim_end().to_string()
}

/// Shared packages list who pulled them in; everything else shows its path.
fn format_provenance(package: &DedupedPackage) -> String {
    if package.is_shared() {
        return package
            .contributors
            .iter()
            .map(|name| format!("{name}..."))
            .collect::<Vec<_>>()
            .join(", ");
    }
    package.package.ancestors.to_string()
}

pub(crate) fn format_age(now: DateTime<Utc>, published: DateTime<Utc>) -> String {
    let seconds = (now - published).num_seconds().max(0);
    let minutes = (seconds as f64 / 60.0).round() as i64;
    let hours = (seconds as f64 / 3_600.0).round() as i64;
    let days = (seconds as f64 / 86_400.0).round() as i64;

    match seconds {
        s if s < 45 => "a few seconds ago".to_string(),
        s if s < 90 => "a minute ago".to_string(),
        _ if minutes < 45 => format!("{minutes} minutes ago"),
        _ if minutes < 90 => "an hour ago".to_string(),
        _ if hours < 22 => format!("{hours} hours ago"),
        _ if hours < 36 => "a day ago".to_string(),
        _ if days < 26 => format!("{days} days ago"),
        _ if days < 45 => "a month ago".to_string(),
        _ if days < 320 => format!("{} months ago", ((days as f64) / 30.4).round() as i64),
        _ if days < 548 => "a year ago".to_string(),
        _ => format!("{} years ago", ((days as f64) / 365.25).round() as i64),
    }
}

fn age_style(now: DateTime<Utc>, published: DateTime<Utc>) -> Style {
    let age = now - published;
    if age < chrono::Duration::hours(12) {
        Style::new().fg_color(Some(AnsiColor::Red.into()))
    } else if age < chrono::Duration::days(5) {
        Style::new().fg_color(Some(AnsiColor::Yellow.into()))
    } else {
        fresh_style()
    }
}

pub(crate) fn render_summary_line(
    style: OutputStyle,
    resolved: usize,
    fetched: usize,
    skipped: usize,
    elapsed: Duration,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let skipped = if skipped > 0 {
        format!(", {} skipped", HumanCount(skipped as u64))
    } else {
        String::new()
    };
    Some(format!(
        "{} {} dependency edges from {} packages{} in {}",
        colorize(summary_label_style(), "resolved"),
        HumanCount(resolved as u64),
        HumanCount(fetched as u64),
        skipped,
        format_elapsed(elapsed)
    ))
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn header_style() -> Style {
    Style::new().effects(Effects::BOLD)
}

fn package_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Blue.into()))
}

fn version_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Cyan.into()))
}

fn fresh_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Green.into()))
}

fn provenance_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Magenta.into()))
}

fn summary_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
