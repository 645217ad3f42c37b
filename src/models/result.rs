use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::TriageCategory;

/// Category → percentage string (one decimal, e.g. `"42.0%"`).
/// Always holds all four categories, most urgent first.
pub type Probabilities = BTreeMap<TriageCategory, String>;

/// Outcome of scoring one patient. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub category: TriageCategory,
    pub probabilities: Probabilities,
    /// 0-100, fixed per category.
    pub urgency_score: u8,
    /// 1 (most urgent) to 4.
    pub priority: u8,
}

impl TriageResult {
    /// Build a result whose score and priority come from the fixed category table.
    pub fn new(category: TriageCategory, probabilities: Probabilities) -> Self {
        Self {
            category,
            probabilities,
            urgency_score: category.urgency_score(),
            priority: category.priority(),
        }
    }

    /// Result returned whenever a patient cannot be scored.
    /// Mid-severity so the patient is always reviewed by a clinician.
    pub fn safe_default() -> Self {
        let probabilities = [
            (TriageCategory::Red, 10.0),
            (TriageCategory::Orange, 20.0),
            (TriageCategory::Yellow, 40.0),
            (TriageCategory::Green, 30.0),
        ]
        .into_iter()
        .map(|(cat, pct)| (cat, format_percent(pct)))
        .collect();
        Self::new(TriageCategory::Yellow, probabilities)
    }

    /// Parsed percentage for one category.
    pub fn probability(&self, category: TriageCategory) -> Option<f64> {
        self.probabilities
            .get(&category)
            .and_then(|s| s.trim_end_matches('%').parse().ok())
    }

    /// Sum of all parsed percentages (100 ± rounding).
    pub fn probability_total(&self) -> f64 {
        TriageCategory::ALL
            .iter()
            .filter_map(|c| self.probability(*c))
            .sum()
    }
}

/// Format a percentage (0-100) with one decimal and a trailing `%`.
pub fn format_percent(pct: f64) -> String {
    format!("{pct:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_default_is_exact() {
        let result = TriageResult::safe_default();
        assert_eq!(result.category, TriageCategory::Yellow);
        assert_eq!(result.urgency_score, 50);
        assert_eq!(result.priority, 3);
        assert_eq!(result.probabilities[&TriageCategory::Red], "10.0%");
        assert_eq!(result.probabilities[&TriageCategory::Orange], "20.0%");
        assert_eq!(result.probabilities[&TriageCategory::Yellow], "40.0%");
        assert_eq!(result.probabilities[&TriageCategory::Green], "30.0%");
        assert!((result.probability_total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn new_uses_category_table() {
        for cat in TriageCategory::ALL {
            let result = TriageResult::new(cat, Probabilities::new());
            assert_eq!(result.urgency_score, cat.urgency_score());
            assert_eq!(result.priority, cat.priority());
        }
    }

    #[test]
    fn format_percent_one_decimal() {
        assert_eq!(format_percent(7.692307), "7.7%");
        assert_eq!(format_percent(100.0), "100.0%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn serializes_with_category_keys() {
        let json = serde_json::to_value(TriageResult::safe_default()).unwrap();
        assert_eq!(json["category"], "yellow");
        assert_eq!(json["probabilities"]["red"], "10.0%");
        assert_eq!(json["urgency_score"], 50);
        assert_eq!(json["priority"], 3);
    }
}
