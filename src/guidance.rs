//! Caller-side display mapping for triage categories: banner colour, level
//! name, message and expected wait. The engine never consults this.

use serde::Serialize;

use crate::models::TriageCategory;

/// What the result screen shows for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriageGuidance {
    pub category: TriageCategory,
    /// Hex colour, e.g. `#e74c3c`.
    pub color: &'static str,
    pub level_name: &'static str,
    pub message: &'static str,
    /// Target time to first clinical contact, `None` when deferrable.
    pub max_wait_minutes: Option<u32>,
}

pub fn guidance(category: TriageCategory) -> TriageGuidance {
    guidance_i18n(category, "en")
}

/// Guidance in the given language (`en`, `fr`). Unknown languages get English.
pub fn guidance_i18n(category: TriageCategory, lang: &str) -> TriageGuidance {
    let (color, max_wait_minutes) = match category {
        TriageCategory::Red => ("#e74c3c", Some(0)),
        TriageCategory::Orange => ("#f39c12", Some(15)),
        TriageCategory::Yellow => ("#f1c40f", Some(60)),
        TriageCategory::Green => ("#27ae60", None),
    };

    let (level_name, message) = match (lang, category) {
        ("fr", TriageCategory::Red) => (
            "URGENCE VITALE",
            "URGENCE VITALE - Prise en charge immédiate requise",
        ),
        ("fr", TriageCategory::Orange) => (
            "TRÈS URGENT",
            "TRÈS URGENT - Prise en charge dans les 15 minutes",
        ),
        ("fr", TriageCategory::Yellow) => ("URGENT", "URGENT - Prise en charge dans l'heure"),
        ("fr", TriageCategory::Green) => (
            "NON URGENT",
            "NON URGENT - Prise en charge différée possible",
        ),
        (_, TriageCategory::Red) => (
            "LIFE-THREATENING",
            "LIFE-THREATENING - Immediate care required",
        ),
        (_, TriageCategory::Orange) => ("VERY URGENT", "VERY URGENT - Care within 15 minutes"),
        (_, TriageCategory::Yellow) => ("URGENT", "URGENT - Care within the hour"),
        (_, TriageCategory::Green) => ("NON-URGENT", "NON-URGENT - Care can be deferred"),
    };

    TriageGuidance {
        category,
        color,
        level_name,
        message,
        max_wait_minutes,
    }
}

/// Guidance for a stored category name; unknown names show as yellow.
pub fn guidance_for_label(label: &str, lang: &str) -> TriageGuidance {
    let category = label.parse().unwrap_or(TriageCategory::Yellow);
    guidance_i18n(category, lang)
}
