//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one `key=value` per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// How a value should stand out in table output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Good,
    Warn,
    Bad,
}

pub fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    match tone {
        Tone::Normal => text.to_owned(),
        Tone::Good => text.green().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().bold().to_string(),
    }
}

// ── Detail rows ──────────────────────────────────────────────────────

/// One `field | value` line of a detail table.
#[derive(Debug, Tabled)]
pub struct DetailRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl DetailRow {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table and plain both start from `rows_fn`: table draws them, plain
/// prints `field=value` lines with any color stripped.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    rows_fn: impl Fn(&T, bool) -> Vec<DetailRow>,
    color: bool,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => render_table(&rows_fn(data, color)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => rows_fn(data, false)
            .iter()
            .map(|r| format!("{}={}", r.field.to_lowercase().replace(' ', "_"), r.value))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Sample {
        remaining: i64,
    }

    fn rows(s: &Sample, color: bool) -> Vec<DetailRow> {
        let tone = if s.remaining < 0 { Tone::Bad } else { Tone::Good };
        vec![DetailRow::new(
            "Remaining capacity",
            paint(&s.remaining.to_string(), tone, color),
        )]
    }

    #[test]
    fn plain_is_key_value_without_color() {
        let out = render_single(&OutputFormat::Plain, &Sample { remaining: -5 }, rows, true);
        assert_eq!(out, "remaining_capacity=-5");
    }

    #[test]
    fn json_uses_serde_names() {
        let out = render_single(&OutputFormat::JsonCompact, &Sample { remaining: 72 }, rows, false);
        assert_eq!(out, r#"{"remaining":72}"#);
    }

    #[test]
    fn table_contains_values() {
        let out = render_single(&OutputFormat::Table, &Sample { remaining: 72 }, rows, false);
        assert!(out.contains("Remaining capacity"));
        assert!(out.contains("72"));
    }

    #[test]
    fn paint_is_identity_without_color() {
        assert_eq!(paint("unknown", Tone::Warn, false), "unknown");
        assert_ne!(paint("-5", Tone::Bad, true), "-5");
    }
}
