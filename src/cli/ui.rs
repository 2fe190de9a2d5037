//! Shared UI primitives for crmdesk
//!
//! Conventions:
//! - Prompts: lowercase with colon and space: `password: `
//! - Feedback: short sentences: `Saved.`
//! - Tables: plain columns, no borders

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};
use inquire::ui::RenderConfig;
use inquire::{Confirm, InquireError, Password, Text};

const MAX_COLUMN_WIDTH: usize = 32;
const COLUMN_GAP: &str = "  ";

// ============================================================================
// Layout Primitives
// ============================================================================

/// Truncate a string to max_chars, adding ellipsis if needed.
/// Result will be at most max_chars characters (including ellipsis if truncated).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars - 1).collect();
    format!("{}…", kept)
}

/// Render rows under a header, each column as wide as its widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count().min(MAX_COLUMN_WIDTH));
        }
    }

    let format_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let cell = truncate(cell, MAX_COLUMN_WIDTH);
                let pad = width.saturating_sub(cell.chars().count());
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(COLUMN_GAP)
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(headers.iter().map(|h| h.to_uppercase()).collect()));
    for row in rows {
        lines.push(format_row(row.clone()));
    }
    lines
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in render_table(headers, rows) {
        println!("{}", line);
    }
}

/// Money with thousands separators and two decimals: `INR 1,200.50`.
pub fn format_money(value: f64, currency: &str) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{} {}{}.{:02}", currency, sign, grouped, cents % 100)
}

/// Short form of a server timestamp. Unparseable values are shown as is.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%b %d %H:%M").to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format("%b %d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// `-` for empty optional cells.
pub fn cell(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

// ============================================================================
// Message Functions
// ============================================================================

/// Print a status message to stdout
#[inline]
pub fn status(msg: &str) {
    println!("{}", msg);
}

/// Print an error message to stderr
#[inline]
pub fn error(msg: &str) {
    eprintln!("Error: {}", msg);
}

/// Print a warning message to stderr
#[inline]
pub fn warning(msg: &str) {
    eprintln!("Warning: {}", msg);
}

// ============================================================================
// Prompts
// ============================================================================

pub fn minimal_render_config() -> RenderConfig<'static> {
    RenderConfig::default_colored()
        .with_prompt_prefix(inquire::ui::Styled::new(""))
        .with_answered_prompt_prefix(inquire::ui::Styled::new(""))
}

/// Prompt for yes/no confirmation (default: no)
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = tokio::task::block_in_place(|| {
        Confirm::new(prompt)
            .with_render_config(minimal_render_config())
            .with_default(false)
            .prompt()
    });
    match answer {
        Ok(yes) => Ok(yes),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Hidden password entry. `confirm` asks twice, for new passwords.
pub fn password(prompt: &str, confirm: bool) -> Result<String> {
    let answer = tokio::task::block_in_place(|| {
        let mut builder = Password::new(prompt).with_render_config(minimal_render_config());
        if !confirm {
            builder = builder.without_confirmation();
        }
        builder.prompt()
    })?;
    Ok(answer)
}

/// One line of input, `None` on Esc or Ctrl-C.
pub fn prompt_line(prompt: &str) -> Result<Option<String>> {
    let answer = tokio::task::block_in_place(|| {
        Text::new(prompt)
            .with_render_config(minimal_render_config())
            .prompt()
    });
    match answer {
        Ok(line) => Ok(Some(line)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
