//! Terminal rendering of log entries and connection banners

use agentdesk_core::domain::connection::ConnectionState;
use agentdesk_core::domain::log::{LogEntry, LogLevel};
use colored::*;

/// Colour table for log levels
fn colorize_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<8}", level.as_str());
    match level {
        LogLevel::Trace => label.dimmed(),
        LogLevel::Debug => label.blue(),
        LogLevel::Info => label.cyan(),
        LogLevel::Warning => label.yellow(),
        LogLevel::Error => label.red(),
        LogLevel::Critical => label.red().bold(),
    }
}

/// Format a log entry as one terminal line
pub fn format_log_entry(entry: &LogEntry) -> String {
    let time = entry
        .parsed_timestamp()
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| entry.timestamp.clone());

    let location = match (&entry.function, entry.line) {
        (Some(function), Some(line)) => format!(" ({}:{})", function, line),
        (Some(function), None) => format!(" ({})", function),
        (None, Some(line)) => format!(" (:{})", line),
        (None, None) => String::new(),
    };

    format!(
        "{} {} {}{} {}",
        time.dimmed(),
        colorize_level(entry.level),
        entry.source.magenta(),
        location.dimmed(),
        entry.message
    )
}

/// Print a log entry
pub fn print_log_entry(entry: &LogEntry) {
    println!("{}", format_log_entry(entry));
}

/// Whether an entry passes the minimum-level display filter
pub fn passes(entry: &LogEntry, min_level: Option<LogLevel>) -> bool {
    min_level.is_none_or(|min| entry.level >= min)
}

/// Entries of a freshly loaded page that were not printed yet
///
/// If the last printed entry appears in the page, only what follows it is
/// new; otherwise the whole page is.
pub fn unseen_tail<'a>(page: &'a [LogEntry], last_printed: Option<&LogEntry>) -> &'a [LogEntry] {
    let position = last_printed.and_then(|last| page.iter().rposition(|entry| entry == last));
    match position {
        Some(index) => &page[index + 1..],
        None => page,
    }
}

/// Banner shown when the stream connection changes
pub fn connection_banner(state: ConnectionState) -> ColoredString {
    match state {
        ConnectionState::Connected => "● connected".green(),
        ConnectionState::Disconnected => "○ disconnected, retrying…".yellow(),
        ConnectionState::Reconnecting => "◌ reconnecting…".yellow().dimmed(),
    }
}
