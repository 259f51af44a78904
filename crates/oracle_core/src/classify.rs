use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CATEGORY: &str = "government";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoriesFile {
    #[serde(default)]
    default: Option<String>,
    rules: Vec<CategoryRule>,
}

/// Ordered keyword rules. The first rule with any keyword found in the text
/// decides the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(category, keywords)| CategoryRule {
                category: category.to_string(),
                keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
            })
            .collect();
        Self {
            rules,
            fallback: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl Classifier {
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        if fallback.trim().is_empty() {
            return Err(anyhow!("fallback category must not be empty"));
        }
        let mut normalized = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.category.trim().is_empty() {
                return Err(anyhow!("category rule without a name"));
            }
            let keywords: Vec<String> = rule
                .keywords
                .iter()
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(anyhow!("category `{}` has no keywords", rule.category));
            }
            normalized.push(CategoryRule {
                category: rule.category,
                keywords,
            });
        }
        Ok(Self {
            rules: normalized,
            fallback,
        })
    }

    /// Loads `categories.yaml`:
    ///
    /// ```yaml
    /// default: government
    /// rules:
    ///   - category: workers
    ///     keywords: [wsib, workplace]
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let parsed: CategoriesFile = serde_yaml::from_str(raw)?;
        Self::new(
            parsed.rules,
            parsed.default.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        )
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn classify(&self, title: &str, description: &str) -> &str {
        let haystack = format!("{} {}", title, description).to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| contains_word(&haystack, kw)))
            .map(|rule| rule.category.as_str())
            .unwrap_or(self.fallback.as_str())
    }
}

/// Whole-word match. A trailing plural `s` is accepted, so `senior` matches
/// "seniors" but `mental` never matches "environmental".
fn contains_word(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        if before.is_some_and(char::is_alphanumeric) {
            return false;
        }
        let mut after = haystack[start + keyword.len()..].chars();
        match after.next() {
            None => true,
            Some('s') => !after.next().is_some_and(char::is_alphanumeric),
            Some(c) => !c.is_alphanumeric(),
        }
    })
}

const DEFAULT_RULES: &[(&str, &[&str])] = &[
    (
        "workers",
        &[
            "wsib",
            "worksafe",
            "worksafebc",
            "workers compensation",
            "workers' compensation",
            "workplace",
            "injured worker",
            "occupational",
            "employment insurance",
            "labour",
            "labor",
        ],
    ),
    (
        "disabilities",
        &[
            "disability",
            "disabilities",
            "disabled",
            "accessibility",
            "accessible",
            "odsp",
            "aish",
            "cpp-d",
        ],
    ),
    (
        "health",
        &[
            "health",
            "healthcare",
            "hospital",
            "mental",
            "medical",
            "pharmacare",
            "long-term care",
        ],
    ),
    (
        "housing",
        &[
            "housing",
            "homeless",
            "homelessness",
            "shelter",
            "rent",
            "rental",
            "tenant",
            "eviction",
        ],
    ),
    (
        "poverty",
        &[
            "poverty",
            "low income",
            "low-income",
            "social assistance",
            "food bank",
            "food insecurity",
            "ontario works",
        ],
    ),
    (
        "seniors",
        &["senior", "pension", "old age security", "elder", "elderly"],
    ),
    (
        "indigenous",
        &["indigenous", "first nations", "inuit", "métis", "metis"],
    ),
    (
        "environment",
        &[
            "climate",
            "environment",
            "environmental",
            "heat",
            "wildfire",
            "air quality",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_match_known_titles() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("WSIB Claims Data", ""), "workers");
        assert_eq!(classifier.classify("Accessibility Grants", ""), "disabilities");
        assert_eq!(classifier.classify("Budget tables", "fiscal year"), "government");
    }

    #[test]
    fn earlier_rule_wins_over_earlier_keyword_in_text() {
        let classifier = Classifier::default();
        // "disability" appears first in the text, but `workers` is the earlier rule.
        let category = classifier.classify("Disability supports", "for injured worker claims");
        assert_eq!(category, "workers");
    }

    #[test]
    fn keywords_do_not_match_inside_longer_words() {
        let classifier = Classifier::default();
        let cases = [
            ("Environmental Assessment Registry", "environment"),
            ("Departmental Results Report", "government"),
            ("Current Year Budget", "government"),
            ("Theatre Grants", "government"),
            ("Laboratory Inspections", "government"),
            ("Licence Suspensions", "government"),
        ];
        for (title, expected) in cases {
            assert_eq!(classifier.classify(title, ""), expected, "{title}");
        }
    }

    #[test]
    fn plural_and_punctuated_forms_still_match() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Seniors' pensions", ""), "seniors");
        assert_eq!(classifier.classify("Rental market survey", ""), "housing");
        assert_eq!(classifier.classify("Mental-health visits", ""), "health");
        assert_eq!(classifier.classify("Canada Labour Code", ""), "workers");
    }

    #[test]
    fn matching_is_case_insensitive_across_title_and_description() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Annual tables", "HOMELESS counts"), "housing");
    }

    #[test]
    fn loads_rules_from_yaml() {
        let raw = r#"
default: other
rules:
  - category: transit
    keywords: [" Bus ", subway]
"#;
        let classifier = Classifier::from_yaml(raw).unwrap();
        assert_eq!(classifier.rules()[0].keywords, vec!["bus", "subway"]);
        assert_eq!(classifier.classify("Bus routes", ""), "transit");
        assert_eq!(classifier.classify("Parks", ""), "other");
    }

    #[test]
    fn rejects_rule_without_keywords() {
        let raw = "rules:\n  - category: empty\n    keywords: []\n";
        assert!(Classifier::from_yaml(raw).is_err());
    }
}
