//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a byte count as a human-readable string, "-" if absent
pub fn format_bytes(bytes: Option<f64>) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    match bytes {
        None => "-".to_string(),
        Some(b) if b >= GB => format!("{:.2}Gi", b / GB),
        Some(b) if b >= MB => format!("{:.2}Mi", b / MB),
        Some(b) if b >= KB => format!("{:.2}Ki", b / KB),
        Some(b) => format!("{:.0}B", b),
    }
}

/// Format a KiB quantity, "-" if absent
pub fn format_kib(kib: Option<f64>) -> String {
    format_bytes(kib.map(|k| k * 1024.0))
}

/// Format CPU cores as millicores below one core, "-" if absent
pub fn format_cores(cores: Option<f64>) -> String {
    match cores {
        None => "-".to_string(),
        Some(c) if c >= 1.0 => format!("{:.2}", c),
        Some(c) => format!("{:.0}m", c * 1000.0),
    }
}
