//! Ordered classification rules
//!
//! Rules are evaluated first-match-wins in a fixed order:
//!
//! 1. plugin keywords (product name, business nouns, install path) - 100
//! 2. payment gateway names - 80
//! 3. checkout / payment flow keywords - 60
//! 4. resource exhaustion keywords - 40
//! 5. anything else that passed the level gate - 20
//!
//! The last rule is a catch-all, so only a custom `RuleSet` without one can
//! leave an entry unclassified. Unclassified entries are dropped from scan
//! output.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::entry::LogEntry;

/// Category assigned by a classification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PluginError,
    GatewayError,
    FlowContext,
    ResourceError,
    GenericFatal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PluginError => "plugin_error",
            Category::GatewayError => "gateway_error",
            Category::FlowContext => "flow_context",
            Category::ResourceError => "resource_error",
            Category::GenericFatal => "generic_fatal",
        }
    }
}

/// Result of a rule match, attached to the entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// 0-100, higher is more important
    pub priority: u8,
    pub category: Category,
    pub description: String,
}

/// What part of an entry a rule looks at
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// Keyword in the message or the source file path
    MessageOrFile(Regex),
    /// Keyword in the message only
    Message(Regex),
    /// Every entry
    Any,
}

impl RuleMatcher {
    fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            RuleMatcher::MessageOrFile(re) => {
                re.is_match(&entry.message)
                    || entry.source_file.as_deref().is_some_and(|f| re.is_match(f))
            }
            RuleMatcher::Message(re) => re.is_match(&entry.message),
            RuleMatcher::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub priority: u8,
    pub category: Category,
    pub description: String,
    pub matcher: RuleMatcher,
}

impl ClassificationRule {
    fn classification(&self) -> Classification {
        Classification {
            priority: self.priority,
            category: self.category,
            description: self.description.clone(),
        }
    }
}

/// Ordered rule list
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Build the five standard rules from configured keywords
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut plugin_keywords = vec![config.product_name.clone()];
        plugin_keywords.extend(config.business_keywords.iter().cloned());
        plugin_keywords.push(config.install_path_fragment.clone());

        let mut rules = Vec::new();
        push_keyword_rule(
            &mut rules,
            100,
            Category::PluginError,
            "Error raised inside the plugin",
            &plugin_keywords,
            true,
        );
        push_keyword_rule(
            &mut rules,
            80,
            Category::GatewayError,
            "Payment gateway error",
            &config.gateways,
            true,
        );
        push_keyword_rule(
            &mut rules,
            60,
            Category::FlowContext,
            "Error during checkout or payment flow",
            &config.flow_keywords,
            true,
        );
        push_keyword_rule(
            &mut rules,
            40,
            Category::ResourceError,
            "Memory or execution time exhausted",
            &config.resource_keywords,
            false,
        );
        rules.push(ClassificationRule {
            priority: 20,
            category: Category::GenericFatal,
            description: "Error outside known plugin, gateway or flow context".to_string(),
            matcher: RuleMatcher::Any,
        });

        Self { rules }
    }

    /// First matching rule wins
    pub fn classify(&self, entry: &LogEntry) -> Option<Classification> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(entry))
            .map(ClassificationRule::classification)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default())
    }
}

/// Skips the rule when no usable keyword is configured
fn push_keyword_rule(
    rules: &mut Vec<ClassificationRule>,
    priority: u8,
    category: Category,
    description: &str,
    keywords: &[String],
    include_file: bool,
) {
    let Some(re) = keyword_regex(keywords) else {
        return;
    };
    let matcher = if include_file {
        RuleMatcher::MessageOrFile(re)
    } else {
        RuleMatcher::Message(re)
    };
    rules.push(ClassificationRule {
        priority,
        category,
        description: description.to_string(),
        matcher,
    });
}

/// Case-insensitive alternation of literal keywords
pub fn keyword_regex(keywords: &[String]) -> Option<Regex> {
    let alternation = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }

    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::parse_line;

    fn classify(line: &str) -> Option<Classification> {
        let entry = parse_line(line).unwrap();
        RuleSet::default().classify(&entry)
    }

    #[test]
    fn test_plugin_path_wins_over_gateway() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Fatal error:  Stripe call failed in /var/www/wp-content/plugins/charitable/gateways/stripe.php on line 10").unwrap();
        assert_eq!(c.category, Category::PluginError);
        assert_eq!(c.priority, 100);
    }

    #[test]
    fn test_gateway_overrides_generic_fatal() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Fatal error:  Stripe API key invalid in /var/www/vendor/lib.php on line 3").unwrap();
        assert_eq!(c.category, Category::GatewayError);
        assert_eq!(c.priority, 80);
    }

    #[test]
    fn test_flow_keywords() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Warning:  Undefined index: amount during checkout").unwrap();
        assert_eq!(c.category, Category::FlowContext);
        assert_eq!(c.priority, 60);
    }

    #[test]
    fn test_resource_keywords() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Fatal error:  Maximum execution time of 30 seconds exceeded in /x.php on line 1").unwrap();
        assert_eq!(c.category, Category::ResourceError);
        assert_eq!(c.priority, 40);
    }

    #[test]
    fn test_generic_fatal_fallback() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Parse error:  syntax error, unexpected '}' in /x.php on line 1").unwrap();
        assert_eq!(c.category, Category::GenericFatal);
        assert_eq!(c.priority, 20);
    }

    #[test]
    fn test_unmatched_warning_falls_back_to_generic() {
        let c = classify("[01-Jan-2025 00:00:00 UTC] PHP Warning:  Undefined variable $x in /theme/functions.php on line 2").unwrap();
        assert_eq!(c.category, Category::GenericFatal);
        assert_eq!(c.priority, 20);
    }

    #[test]
    fn test_rule_set_without_catch_all_can_discard() {
        let rules = RuleSet::new(vec![ClassificationRule {
            priority: 80,
            category: Category::GatewayError,
            description: "gateway".to_string(),
            matcher: RuleMatcher::Message(keyword_regex(&["stripe".to_string()]).unwrap()),
        }]);
        let entry = parse_line("[01-Jan-2025 00:00:00 UTC] PHP Warning:  Undefined index: foo").unwrap();
        assert!(rules.classify(&entry).is_none());
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_and_literal() {
        let re = keyword_regex(&["authorize.net".to_string()]).unwrap();
        assert!(re.is_match("AUTHORIZE.NET timeout"));
        assert!(!re.is_match("authorizeXnet timeout"));
        assert!(keyword_regex(&["  ".to_string()]).is_none());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Category::GatewayError).unwrap(),
            "\"gateway_error\""
        );
        assert_eq!(Category::FlowContext.as_str(), "flow_context");
    }

    #[test]
    fn test_empty_keyword_list_drops_rule() {
        let config = RulesConfig {
            gateways: vec![],
            ..RulesConfig::default()
        };
        let rules = RuleSet::from_config(&config);
        assert_eq!(rules.rules().len(), 4);
        assert!(rules
            .rules()
            .iter()
            .all(|r| r.category != Category::GatewayError));
    }
}
