//! Shared CLI helpers — path expansion, embed printing, version banner.

use std::path::PathBuf;

use colored::Colorize;

use cogbot_core::types::Embed;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Render an embed as plain terminal lines.
pub fn format_embed(content: &str, embed: &Embed) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(author) = &embed.author {
        lines.push(author.name.clone());
    }
    if let Some(title) = &embed.title {
        lines.push(title.clone());
    }
    lines.push(content.trim_matches(|c| c == '<' || c == '>').to_string());

    let width = embed
        .fields
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        + 1;
    for field in &embed.fields {
        lines.push(format!("  {:<width$} {}", format!("{}:", field.name), field.value));
    }
    lines
}

/// Print a report embed to stdout.
pub fn print_embed(content: &str, embed: &Embed) {
    let lines = format_embed(content, embed);
    println!();
    for (i, line) in lines.iter().enumerate() {
        match i {
            0 => println!("{}", line.cyan().bold()),
            1 => println!("{}", line.bold()),
            _ => println!("{line}"),
        }
    }
    println!();
}

/// Print the banner shown at startup.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🤖 Cogbot".cyan().bold(), version.dimmed());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
