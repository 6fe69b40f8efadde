//! CLI command implementations.

pub mod payment;
pub mod services;
pub mod webhook;

use colored::Colorize;

pub fn header(title: &str) {
    println!();
    println!("  {}", title.bright_cyan().bold());
    println!("  {}", "─".repeat(title.chars().count()).dimmed());
}

pub fn success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn failure(msg: &str) {
    println!("  {} {}", "✗".red().bold(), msg.red());
}

pub fn warn(msg: &str) {
    println!("  {} {}", "⚠".yellow().bold(), msg.yellow());
}

pub fn info(msg: &str) {
    println!("  {} {}", "→".cyan(), msg);
}

/// Print an aligned `label: value` row
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<18} {}", format!("{}:", label).bright_white().bold(), value);
}

pub fn yes_no(value: bool) -> colored::ColoredString {
    if value { "yes".green() } else { "no".red() }
}
