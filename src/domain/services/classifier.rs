//! Maps raw membership names from the exports onto canonical categories.
//!
//! Rules are ordered: capture patterns first, then keyword rules, first
//! match wins. Reordering changes results.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const OTHERS: &str = "Others";
pub const RETAIL: &str = "Retail";
pub const SESSION: &str = "Session";

struct SpecialPattern {
    pattern: Regex,
    render: fn(&Captures) -> String,
}

static SPECIAL_PATTERNS: Lazy<Vec<SpecialPattern>> = Lazy::new(|| {
    vec![
        SpecialPattern {
            pattern: Regex::new(r"(\d+)\s*(month|week)\s+unlimited").unwrap(),
            render: |caps| format!("Studio {} {} Unlimited", &caps[1], capitalize(&caps[2])),
        },
        SpecialPattern {
            pattern: Regex::new(r"studio\s+(\d+)\s+class\s+package").unwrap(),
            render: |caps| format!("Studio {} Class Package", &caps[1]),
        },
        SpecialPattern {
            pattern: Regex::new(r"virtual\s+(\d+)\s+(class package|month unlimited|week unlimited)")
                .unwrap(),
            render: |caps| format!("Virtual {} {}", &caps[1], &caps[2]),
        },
        SpecialPattern {
            pattern: Regex::new(r"newcomers\s+2\s+(for|week)\s+[12]").unwrap(),
            render: |caps| {
                if &caps[1] == "week" {
                    "Studio Newcomers 2 Week Unlimited".to_string()
                } else {
                    "Studio Newcomers 2 For 1".to_string()
                }
            },
        },
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordMatch {
    /// Any keyword present.
    Any,
    /// First keyword present together with at least one of the others.
    Combined,
}

struct KeywordRule {
    keywords: &'static [&'static str],
    category: &'static str,
    matching: KeywordMatch,
}

impl KeywordRule {
    fn matches(&self, item: &str) -> bool {
        match self.matching {
            KeywordMatch::Any => self.keywords.iter().any(|k| item.contains(k)),
            KeywordMatch::Combined => match self.keywords.split_first() {
                Some((base, rest)) => item.contains(base) && rest.iter().any(|k| item.contains(k)),
                None => false,
            },
        }
    }
}

static KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["amped up", "amped"],
        category: SESSION,
        matching: KeywordMatch::Any,
    },
    KeywordRule {
        keywords: &["powercycle", "power cycle"],
        category: SESSION,
        matching: KeywordMatch::Any,
    },
    KeywordRule {
        keywords: &["studio single class"],
        category: "Studio Single class",
        matching: KeywordMatch::Any,
    },
    KeywordRule {
        keywords: &["private", "single private"],
        category: "Studio Private Class",
        matching: KeywordMatch::Any,
    },
    KeywordRule {
        keywords: &["annual unlimited"],
        category: "Studio Annual Unlimited",
        matching: KeywordMatch::Any,
    },
    KeywordRule {
        keywords: &[
            "studio",
            "back body blaze",
            "barre 57",
            "cardio barre",
            "fit",
            "foundations",
            "hiit",
            "mat 57",
            "recovery",
            "sweat",
            "trainer's choice",
        ],
        category: SESSION,
        matching: KeywordMatch::Combined,
    },
    KeywordRule {
        keywords: &["virtual", "barre 57", "single class"],
        category: SESSION,
        matching: KeywordMatch::Combined,
    },
];

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Canonical category for a raw membership name.
///
/// An absent member id yields an empty string, which callers must treat as
/// "drop this row". Everything else resolves to a category, `Others` at worst.
pub fn classify(raw_name: &str, category: Option<&str>, member_id: Option<&str>) -> String {
    if member_id.map_or(true, |id| id.trim().is_empty()) {
        return String::new();
    }
    if raw_name.is_empty() {
        return OTHERS.to_string();
    }
    match category {
        Some("product") => return RETAIL.to_string(),
        Some("event") => return SESSION.to_string(),
        _ => {}
    }

    let item = raw_name.trim().to_lowercase();

    if let Some(name) = SPECIAL_PATTERNS
        .iter()
        .find_map(|p| p.pattern.captures(&item).map(|caps| (p.render)(&caps)))
    {
        return name;
    }

    KEYWORD_RULES
        .iter()
        .find(|rule| rule.matches(&item))
        .map_or_else(|| OTHERS.to_string(), |rule| rule.category.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_named(raw: &str) -> String {
        classify(raw, None, Some("m-1"))
    }

    #[test]
    fn test_missing_member_id_is_skip_signal() {
        assert_eq!(classify("Studio 3 Class Package", None, None), "");
        assert_eq!(classify("Studio 3 Class Package", None, Some("  ")), "");
    }

    #[test]
    fn test_empty_name_and_category_short_circuits() {
        assert_eq!(classify("", None, Some("1")), OTHERS);
        assert_eq!(classify("Studio 3 Class Package", Some("product"), Some("1")), RETAIL);
        assert_eq!(classify("Grip socks", Some("event"), Some("1")), SESSION);
    }

    #[test]
    fn test_blank_name_still_honours_category() {
        assert_eq!(classify("  ", Some("product"), Some("m-1")), RETAIL);
        assert_eq!(classify("  ", Some("event"), Some("m-1")), SESSION);
        assert_eq!(classify("  ", None, Some("m-1")), OTHERS);
    }

    #[test]
    fn test_capture_patterns() {
        assert_eq!(classify_named("3 Month Unlimited"), "Studio 3 Month Unlimited");
        assert_eq!(classify_named("Studio 2 week unlimited"), "Studio 2 Week Unlimited");
        assert_eq!(classify_named("Virtual 10 Class Package"), "Virtual 10 class package");
        assert_eq!(classify_named("Newcomers 2 Week 1"), "Studio Newcomers 2 Week Unlimited");
        assert_eq!(classify_named("Newcomers 2 For 1"), "Studio Newcomers 2 For 1");
    }

    #[test]
    fn test_patterns_take_priority_over_keywords() {
        // "studio" is also a combined-rule base keyword
        assert_eq!(classify_named("Studio 3 Class Package"), "Studio 3 Class Package");
        // the generic unlimited pattern precedes the virtual one
        assert_eq!(classify_named("Virtual 1 Month Unlimited"), "Studio 1 Month Unlimited");
    }

    #[test]
    fn test_keyword_rules() {
        assert_eq!(classify_named("Amped Up! 45"), SESSION);
        assert_eq!(classify_named("PowerCycle Ride"), SESSION);
        assert_eq!(classify_named("Studio Single Class"), "Studio Single class");
        assert_eq!(classify_named("Single Private Session"), "Studio Private Class");
        assert_eq!(classify_named("Annual Unlimited 2024"), "Studio Annual Unlimited");
        assert_eq!(classify_named("Studio Barre 57"), SESSION);
        assert_eq!(classify_named("Virtual Single Class"), SESSION);
    }

    #[test]
    fn test_combined_rule_needs_base_and_companion() {
        // companion keyword alone is not enough
        assert_eq!(classify_named("Cardio Barre Drop-in"), OTHERS);
        // base keyword alone is not enough
        assert_eq!(classify_named("Studio Merchandise"), OTHERS);
    }

    #[test]
    fn test_unmatched_falls_back_to_others() {
        assert_eq!(classify_named("Complimentary Pass"), OTHERS);
        assert_eq!(classify_named("   gift card  "), OTHERS);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for raw in ["Studio 8 Class Package", "Staff Comp", "hiit studio", ""] {
            assert_eq!(classify(raw, None, Some("7")), classify(raw, None, Some("7")));
        }
    }
}
