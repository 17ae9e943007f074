//! CLI command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;

pub mod auth;
pub mod config;
pub mod events;

/// Reads one trimmed line after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Uses `value` if given, otherwise asks for it.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Like [`value_or_prompt`], for passwords. Typed input is echoed.
fn secret_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    if value.is_none() && io::stdin().is_terminal() {
        eprintln!("note: password input is visible; set EVENTDECK_PASSWORD to skip this prompt");
    }
    value_or_prompt(value, label)
}

/// `[y/N]` question; anything but `y`/`yes` (including EOF) is a no.
fn confirm(question: &str) -> bool {
    prompt(&format!("{question} [y/N] "))
        .map(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}
