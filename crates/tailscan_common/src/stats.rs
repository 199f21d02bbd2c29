//! Scan statistics
//!
//! Derived from the returned entries only: counts by category, by priority
//! bucket and by hour of day, plus the most frequent messages after
//! simplification (paths, line numbers and digits stripped).

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::Timelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::Category;
use crate::entry::LogEntry;

/// Number of groups kept in `top_messages`
pub const TOP_MESSAGES: usize = 5;

/// Maximum length of a simplified message, in characters
pub const SIMPLIFIED_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityBucket {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityBucket {
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            80..=u8::MAX => PriorityBucket::Critical,
            60..=79 => PriorityBucket::High,
            40..=59 => PriorityBucket::Medium,
            _ => PriorityBucket::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBucket::Critical => "critical",
            PriorityBucket::High => "high",
            PriorityBucket::Medium => "medium",
            PriorityBucket::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    fn add(&mut self, bucket: PriorityBucket) {
        match bucket {
            PriorityBucket::Critical => self.critical += 1,
            PriorityBucket::High => self.high += 1,
            PriorityBucket::Medium => self.medium += 1,
            PriorityBucket::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCount {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_priority: PriorityCounts,
    /// Index is the UTC hour of day
    pub by_hour: [usize; 24],
    pub top_messages: Vec<MessageCount>,
}

impl ScanStatistics {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut stats = ScanStatistics {
            total: entries.len(),
            ..Default::default()
        };
        let mut groups: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            if let Some(class) = &entry.classification {
                *stats.by_category.entry(class.category).or_insert(0) += 1;
                stats
                    .by_priority
                    .add(PriorityBucket::from_priority(class.priority));
            }
            stats.by_hour[entry.timestamp.hour() as usize] += 1;
            *groups.entry(simplify_message(&entry.message)).or_insert(0) += 1;
        }

        let mut top: Vec<MessageCount> = groups
            .into_iter()
            .map(|(message, count)| MessageCount { message, count })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.message.cmp(&b.message)));
        top.truncate(TOP_MESSAGES);
        stats.top_messages = top;

        stats
    }
}

struct SimplifyPatterns {
    location: Regex,
    colon_location: Regex,
    path: Regex,
    on_line: Regex,
    digits: Regex,
    spaces: Regex,
}

fn patterns() -> &'static SimplifyPatterns {
    static PATTERNS: OnceLock<SimplifyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SimplifyPatterns {
        location: Regex::new(r"\s+in\s+\S+\s+on\s+line\s+\d+").expect("valid pattern"),
        colon_location: Regex::new(r"\s+in\s+\S+?:\d+\b").expect("valid pattern"),
        path: Regex::new(r#"(?P<pre>^|[\s(\['"])(?:[A-Za-z]:\\|/)[\w.\-/\\]+"#)
            .expect("valid pattern"),
        on_line: Regex::new(r"\s+on\s+line\s+\d+").expect("valid pattern"),
        digits: Regex::new(r"\d+").expect("valid pattern"),
        spaces: Regex::new(r"\s+").expect("valid pattern"),
    })
}

/// Grouping key for "same error, different place"
pub fn simplify_message(message: &str) -> String {
    let p = patterns();

    let s = p.location.replace_all(message, "");
    let s = p.colon_location.replace_all(&s, "");
    let s = p.path.replace_all(&s, "${pre}");
    let s = p.on_line.replace_all(&s, "");
    let s = p.digits.replace_all(&s, "N");
    let s = p.spaces.replace_all(&s, " ");

    s.trim().chars().take(SIMPLIFIED_MAX_CHARS).collect()
}
