use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CardPivotError, Result};
use crate::models::{Transaction, UNCATEGORIZED};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    /// Whole-word match, so `bp` does not fire inside `bbq` or `shopbp`.
    Word,
    Regex,
}

impl MatchType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Word => "word",
            Self::Regex => "regex",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

impl CategoryRule {
    pub fn new(pattern: &str, match_type: MatchType, category: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            match_type,
            category: category.to_string(),
            merchant: None,
            priority: 0,
        }
    }

    pub fn merchant(mut self, merchant: &str) -> Self {
        self.merchant = Some(merchant.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn compile(&self) -> Result<Regex> {
        if self.pattern.trim().is_empty() {
            return Err(CardPivotError::InvalidRule {
                pattern: self.pattern.clone(),
                reason: "empty pattern".into(),
            });
        }
        let escaped = regex::escape(&self.pattern);
        let source = match self.match_type {
            MatchType::Contains => format!("(?i){escaped}"),
            MatchType::StartsWith => format!("(?i)^{escaped}"),
            MatchType::Word => format!("(?i)(?:^|[^[:alnum:]]){escaped}(?:$|[^[:alnum:]])"),
            MatchType::Regex => format!("(?i){}", self.pattern),
        };
        Regex::new(&source).map_err(|e| CardPivotError::InvalidRule {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    regex: Regex,
}

/// Immutable, precedence-ordered rule list. Higher priority first, then the
/// longer (more specific) pattern; remaining ties keep list order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        let mut compiled = rules
            .into_iter()
            .map(|rule| {
                let regex = rule.compile()?;
                Ok(CompiledRule { rule, regex })
            })
            .collect::<Result<Vec<_>>>()?;
        // sort_by is stable, which keeps list order for full ties
        compiled.sort_by(|a, b| {
            b.rule
                .priority
                .cmp(&a.rule.priority)
                .then(b.rule.pattern.len().cmp(&a.rule.pattern.len()))
        });
        tracing::debug!("compiled {} category rules", compiled.len());
        Ok(Self { rules: compiled })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(crate::rules::builtin_rules())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let rules: Vec<CategoryRule> = serde_json::from_str(text)?;
        Self::new(rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Rules in the order they are tried.
    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find(&self, description: &str) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .find(|c| c.regex.is_match(description))
            .map(|c| &c.rule)
    }
}

// ---------------------------------------------------------------------------
// Merchant cleanup
// ---------------------------------------------------------------------------

fn processor_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:SQ|TST|SP|PP|PAYPAL|DD|IN|BT|GOOGLE|APL)\s*\*\s*")
            .expect("invalid prefix regex")
    })
}

fn store_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\s*\d+").expect("invalid store number regex"))
}

const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Reduce a raw statement descriptor to a readable merchant name:
/// `SQ *BLUE BOTTLE COFFEE #12 OAKLAND CA` becomes `Blue Bottle Coffee Oakland`.
pub fn clean_merchant(description: &str) -> String {
    let s = processor_prefix_re().replace(description.trim(), "");
    let s = match s.find('*') {
        Some(idx) => &s[..idx],
        None => &s[..],
    };
    let s = store_number_re().replace_all(s, " ");

    let mut tokens: Vec<&str> = s
        .split_whitespace()
        .filter(|t| !t.chars().any(|c| c.is_ascii_digit()))
        .collect();
    if tokens.len() > 1 && tokens.last().is_some_and(|t| STATE_CODES.contains(t)) {
        tokens.pop();
    }

    let cleaned = tokens
        .iter()
        .map(|t| title_case(t))
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        description.trim().to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Categorizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub merchant: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategorizeResult {
    pub categorized: usize,
    pub uncategorized: usize,
}

impl CategorizeResult {
    pub fn add(&mut self, other: CategorizeResult) {
        self.categorized += other.categorized;
        self.uncategorized += other.uncategorized;
    }
}

pub struct Categorizer<'a> {
    rules: &'a RuleTable,
}

impl<'a> Categorizer<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn classify(&self, description: &str) -> Classification {
        match self.rules.find(description) {
            Some(rule) => Classification {
                category: rule.category.clone(),
                merchant: rule
                    .merchant
                    .clone()
                    .unwrap_or_else(|| clean_merchant(description)),
                matched: true,
            },
            None => Classification {
                category: UNCATEGORIZED.to_string(),
                merchant: clean_merchant(description),
                matched: false,
            },
        }
    }

    /// Classify every transaction. Nothing is dropped: unmatched
    /// transactions come back as Uncategorized.
    pub fn categorize(&self, transactions: Vec<Transaction>) -> (Vec<Transaction>, CategorizeResult) {
        let mut result = CategorizeResult::default();
        let classified = transactions
            .into_iter()
            .map(|txn| {
                let c = self.classify(&txn.description);
                if c.matched {
                    result.categorized += 1;
                } else {
                    result.uncategorized += 1;
                }
                txn.classified(&c.category, &c.merchant)
            })
            .collect();
        (classified, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn txn(description: &str) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        Transaction::new(date, Decimal::new(5000, 2), description, "Chase")
    }

    fn table(rules: Vec<CategoryRule>) -> RuleTable {
        RuleTable::new(rules).unwrap()
    }

    #[test]
    fn test_contains_rule() {
        let rules = table(vec![CategoryRule::new("adobe", MatchType::Contains, "Software")]);
        let c = Categorizer::new(&rules).classify("ADOBE CREATIVE CLOUD");
        assert_eq!(c.category, "Software");
        assert!(c.matched);
    }

    #[test]
    fn test_starts_with_rule() {
        let rules = table(vec![CategoryRule::new("STRIPE", MatchType::StartsWith, "Fees")]);
        let categorizer = Categorizer::new(&rules);
        assert!(categorizer.classify("STRIPE PAYMENT").matched);
        assert!(!categorizer.classify("PAY STRIPE FEE").matched);
    }

    #[test]
    fn test_word_rule() {
        let rules = table(vec![CategoryRule::new("bp", MatchType::Word, "Gas")]);
        let categorizer = Categorizer::new(&rules);
        assert!(categorizer.classify("BP#8123 HOUSTON").matched);
        assert!(categorizer.classify("FUEL BP").matched);
        assert!(!categorizer.classify("SHOPBPX").matched);
    }

    #[test]
    fn test_regex_rule() {
        let rules = table(vec![CategoryRule::new(r"^AWS.*\d+$", MatchType::Regex, "Hosting")]);
        assert!(Categorizer::new(&rules).classify("aws services 12345").matched);
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = RuleTable::new(vec![CategoryRule::new("([", MatchType::Regex, "X")]).unwrap_err();
        assert!(matches!(err, CardPivotError::InvalidRule { .. }));
    }

    #[test]
    fn test_higher_priority_wins() {
        let rules = table(vec![
            CategoryRule::new("PAYMENT", MatchType::Contains, "Fees").priority(5),
            CategoryRule::new("PAYMENT", MatchType::Contains, "Income").priority(10),
        ]);
        assert_eq!(Categorizer::new(&rules).classify("PAYMENT RECEIVED").category, "Income");
    }

    #[test]
    fn test_longer_pattern_wins_within_priority() {
        let rules = table(vec![
            CategoryRule::new("amazon", MatchType::Contains, "Shopping"),
            CategoryRule::new("amazon prime", MatchType::Contains, "Entertainment"),
        ]);
        let categorizer = Categorizer::new(&rules);
        assert_eq!(categorizer.classify("AMAZON PRIME*AB12").category, "Entertainment");
        assert_eq!(categorizer.classify("AMAZON.COM*123ABC").category, "Shopping");
    }

    #[test]
    fn test_list_order_breaks_full_ties() {
        let rules = table(vec![
            CategoryRule::new("target", MatchType::Contains, "Groceries"),
            CategoryRule::new("target", MatchType::Contains, "Shopping"),
        ]);
        assert_eq!(Categorizer::new(&rules).classify("TARGET 00012").category, "Groceries");
    }

    #[test]
    fn test_unmatched_is_uncategorized() {
        let rules = RuleTable::builtin().unwrap();
        let c = Categorizer::new(&rules).classify("XYZ UNKNOWN CORP 99887");
        assert_eq!(c.category, UNCATEGORIZED);
        assert!(!c.matched);
        assert_eq!(c.merchant, "Xyz Unknown Corp");
    }

    #[test]
    fn test_builtin_amazon() {
        let rules = RuleTable::builtin().unwrap();
        let c = Categorizer::new(&rules).classify("AMAZON.COM*123ABC");
        assert_eq!(c.category, "Shopping");
        assert_eq!(c.merchant, "Amazon");
    }

    #[test]
    fn test_categorize_counts_and_keeps_everything() {
        let rules = RuleTable::builtin().unwrap();
        let categorizer = Categorizer::new(&rules);
        let (out, result) = categorizer.categorize(vec![
            txn("STARBUCKS STORE 1234"),
            txn("XYZ UNKNOWN CORP 99887"),
            txn("SHELL OIL 57442"),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(result.categorized, 2);
        assert_eq!(result.uncategorized, 1);
        assert_eq!(out[0].category_name(), "Dining");
        assert_eq!(out[1].category_name(), UNCATEGORIZED);
        assert_eq!(out[2].category_name(), "Gas & Automotive");
    }

    #[test]
    fn test_categorize_is_idempotent() {
        let rules = RuleTable::builtin().unwrap();
        let categorizer = Categorizer::new(&rules);
        let (once, _) = categorizer.categorize(vec![txn("SQ *BLUE BOTTLE COFFEE"), txn("MYSTERY 42")]);
        let (twice, _) = categorizer.categorize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_merchant() {
        assert_eq!(clean_merchant("SQ *BLUE BOTTLE COFFEE #12 OAKLAND CA"), "Blue Bottle Coffee Oakland");
        assert_eq!(clean_merchant("TST* THE LOCAL DINER"), "The Local Diner");
        assert_eq!(clean_merchant("AMAZON.COM*123ABC"), "Amazon.com");
        assert_eq!(clean_merchant("SHELL OIL 57442"), "Shell Oil");
        assert_eq!(clean_merchant("   CORNER   DELI   "), "Corner Deli");
        assert_eq!(clean_merchant("12345"), "12345");
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"[
            {"pattern": "corner deli", "category": "Dining", "merchant": "Corner Deli"},
            {"pattern": "^ACME", "match_type": "regex", "category": "Work", "priority": 3}
        ]"#;
        let rules = RuleTable::from_json(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules().next().unwrap().category, "Work");
        let c = Categorizer::new(&rules).classify("CORNER DELI 0042");
        assert_eq!(c.merchant, "Corner Deli");
    }

    #[test]
    fn test_rules_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"pattern": "gym", "category": "Fitness"}]"#).unwrap();
        let rules = RuleTable::load(&path).unwrap();
        assert_eq!(rules.rules().next().unwrap().match_type, MatchType::Contains);
    }
}
