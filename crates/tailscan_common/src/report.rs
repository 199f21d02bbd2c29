//! Report Renderer - text output for scan results

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::classify::Category;
use crate::entry::LogEntry;
use crate::error::ScanError;
use crate::scanner::ScanResult;
use crate::stats::{PriorityBucket, ScanStatistics};

/// Render a full scan result
pub fn render_text(result: &ScanResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {}\n",
        "Debug log:".bold(),
        result.log_path.display()
    ));
    output.push_str(&format!(
        "{} last {}h (since {})\n\n",
        "Window:".bold(),
        result.window_hours,
        format_timestamp(&result.cutoff)
    ));

    if result.entries.is_empty() {
        output.push_str("No relevant errors in this window.\n");
    } else {
        for entry in &result.entries {
            output.push_str(&render_entry(entry));
            output.push('\n');
        }
        output.push('\n');
        output.push_str(&render_statistics(&result.statistics));
    }

    if result.truncated {
        output.push_str(&format!(
            "\n{} stopped after {} log lines; older entries in the window were not inspected.\n",
            "⚠".yellow(),
            result.lines_read
        ));
    }

    if let Some(failure) = &result.partial_failure {
        output.push_str(&format!(
            "\n{} scan interrupted: {} ({} bytes unread). Results are partial.\n",
            "⚠".yellow(),
            failure.message,
            failure.bytes_unread
        ));
    }

    output
}

/// Render a single entry (one line, plus location when known)
pub fn render_entry(entry: &LogEntry) -> String {
    let (badge, category) = match &entry.classification {
        Some(class) => (
            priority_badge(PriorityBucket::from_priority(class.priority)),
            category_label(class.category),
        ),
        None => ("     ".to_string(), ""),
    };

    let mut line = format!(
        "{} {} {:<9} {}: {}",
        format_timestamp(&entry.timestamp).dimmed(),
        badge,
        category,
        entry.level.bold(),
        entry.message
    );

    if let (Some(file), Some(n)) = (&entry.source_file, entry.source_line) {
        line.push_str(&format!("\n    {}", format!("at {}:{}", file, n).dimmed()));
    }

    line
}

/// Render the statistics block
pub fn render_statistics(stats: &ScanStatistics) -> String {
    let mut output = String::new();

    output.push_str(&format!("{} {}\n", "Total:".bold(), stats.total));
    output.push_str(&format!(
        "{} critical {}, high {}, medium {}, low {}\n",
        "Priority:".bold(),
        stats.by_priority.critical,
        stats.by_priority.high,
        stats.by_priority.medium,
        stats.by_priority.low
    ));

    if !stats.by_category.is_empty() {
        let categories = stats
            .by_category
            .iter()
            .map(|(category, count)| format!("{} {}", category.as_str(), count))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("{} {}\n", "Categories:".bold(), categories));
    }

    let busiest = stats
        .by_hour
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(&a.0)));
    if let Some((hour, count)) = busiest {
        output.push_str(&format!(
            "{} {:02}:00 UTC ({} entries)\n",
            "Busiest hour:".bold(),
            hour,
            count
        ));
    }

    if !stats.top_messages.is_empty() {
        output.push_str(&format!("{}\n", "Most frequent:".bold()));
        for group in &stats.top_messages {
            output.push_str(&format!("  {:>4}× {}\n", group.count, group.message));
        }
    }

    output
}

/// Informational outcomes read as a status line, everything else as a warning
pub fn render_error(error: &ScanError) -> String {
    if error.is_informational() {
        format!("{} No errors logged yet ({}).", "ℹ".blue(), error)
    } else {
        format!("{} {}", "⚠".yellow(), error.to_string().yellow())
    }
}

fn priority_badge(bucket: PriorityBucket) -> String {
    match bucket {
        PriorityBucket::Critical => "[CRIT]".red().bold().to_string(),
        PriorityBucket::High => "[HIGH]".red().to_string(),
        PriorityBucket::Medium => "[MED] ".yellow().to_string(),
        PriorityBucket::Low => "[LOW] ".dimmed().to_string(),
    }
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::PluginError => "plugin",
        Category::GatewayError => "gateway",
        Category::FlowContext => "checkout",
        Category::ResourceError => "resources",
        Category::GenericFatal => "fatal",
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::scanner::PartialFailure;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn result(entries: Vec<LogEntry>) -> ScanResult {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        ScanResult {
            log_path: PathBuf::from("/var/www/wp-content/debug.log"),
            scanned_at: now,
            cutoff: Utc.with_ymd_and_hms(2024, 12, 31, 12, 0, 0).unwrap(),
            window_hours: 24,
            statistics: ScanStatistics::from_entries(&entries),
            entries,
            truncated: false,
            lines_read: 0,
            bytes_read: 0,
            partial_failure: None,
        }
    }

    #[test]
    fn test_empty_result() {
        let text = render_text(&result(vec![]));
        assert!(text.contains("/var/www/wp-content/debug.log"));
        assert!(text.contains("No relevant errors"));
    }

    #[test]
    fn test_entry_and_statistics_rendered() {
        let entry = LogEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 10, 30, 0).unwrap(),
            level: "Fatal error".to_string(),
            message: "Stripe: card declined".to_string(),
            source_file: Some("/srv/gateway.php".to_string()),
            source_line: Some(7),
            classification: Some(Classification {
                priority: 80,
                category: Category::GatewayError,
                description: "Payment gateway error".to_string(),
            }),
        };
        let mut r = result(vec![entry]);
        r.truncated = true;
        r.lines_read = 5;
        r.partial_failure = Some(PartialFailure {
            message: "unexpected end of file".to_string(),
            bytes_unread: 100,
        });

        let text = render_text(&r);
        assert!(text.contains("2025-01-01 10:30:00"));
        assert!(text.contains("Stripe: card declined"));
        assert!(text.contains("/srv/gateway.php:7"));
        assert!(text.contains("gateway_error 1"));
        assert!(text.contains("10:00 UTC"));
        assert!(text.contains("stopped after 5 log lines"));
        assert!(text.contains("Results are partial"));
    }

    #[test]
    fn test_render_error_distinguishes_informational() {
        let info = render_error(&ScanError::NotFound { searched: vec![] });
        assert!(info.contains("No errors logged yet"));

        let warn = render_error(&ScanError::FileTooLarge {
            size_bytes: 2,
            max_bytes: 1,
        });
        assert!(warn.contains("too large"));
    }
}
