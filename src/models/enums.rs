use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value:?}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Declaration order is urgency order: derived `Ord` sorts red first.
str_enum!(TriageCategory {
    Red => "red",
    Orange => "orange",
    Yellow => "yellow",
    Green => "green",
});

str_enum!(TriageStatus {
    Waiting => "waiting",
    InProgress => "in_progress",
    Completed => "completed",
});

impl TriageCategory {
    /// All categories, most urgent first.
    pub const ALL: [TriageCategory; 4] = [
        TriageCategory::Red,
        TriageCategory::Orange,
        TriageCategory::Yellow,
        TriageCategory::Green,
    ];

    /// Urgency score shown for sorting/display (0-100).
    pub fn urgency_score(self) -> u8 {
        match self {
            Self::Red => 95,
            Self::Orange => 75,
            Self::Yellow => 50,
            Self::Green => 25,
        }
    }

    /// Queue rank, 1 = most urgent.
    pub fn priority(self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Orange => 2,
            Self::Yellow => 3,
            Self::Green => 4,
        }
    }

    /// Map an additive rule severity score to a category.
    pub fn from_severity_score(score: u32) -> Self {
        match score {
            s if s >= 8 => Self::Red,
            s if s >= 5 => Self::Orange,
            s if s >= 2 => Self::Yellow,
            _ => Self::Green,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn triage_category_round_trip() {
        for cat in TriageCategory::ALL {
            assert_eq!(TriageCategory::from_str(cat.as_str()).unwrap(), cat);
        }
    }

    #[test]
    fn triage_status_round_trip() {
        for (s, v) in [
            ("waiting", TriageStatus::Waiting),
            ("in_progress", TriageStatus::InProgress),
            ("completed", TriageStatus::Completed),
        ] {
            assert_eq!(TriageStatus::from_str(s).unwrap(), v);
            assert_eq!(v.as_str(), s);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = TriageCategory::from_str("purple").unwrap_err();
        assert_eq!(err.field, "TriageCategory");
        assert_eq!(err.value, "purple");
    }

    #[test]
    fn score_and_priority_table_is_fixed() {
        let table: Vec<(u8, u8)> = TriageCategory::ALL
            .iter()
            .map(|c| (c.urgency_score(), c.priority()))
            .collect();
        assert_eq!(table, vec![(95, 1), (75, 2), (50, 3), (25, 4)]);
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(TriageCategory::from_severity_score(0), TriageCategory::Green);
        assert_eq!(TriageCategory::from_severity_score(1), TriageCategory::Green);
        assert_eq!(TriageCategory::from_severity_score(2), TriageCategory::Yellow);
        assert_eq!(TriageCategory::from_severity_score(4), TriageCategory::Yellow);
        assert_eq!(TriageCategory::from_severity_score(5), TriageCategory::Orange);
        assert_eq!(TriageCategory::from_severity_score(7), TriageCategory::Orange);
        assert_eq!(TriageCategory::from_severity_score(8), TriageCategory::Red);
        assert_eq!(TriageCategory::from_severity_score(18), TriageCategory::Red);
    }

    #[test]
    fn ordering_is_most_urgent_first() {
        let mut cats = vec![TriageCategory::Green, TriageCategory::Red, TriageCategory::Yellow];
        cats.sort();
        assert_eq!(
            cats,
            vec![TriageCategory::Red, TriageCategory::Yellow, TriageCategory::Green]
        );
    }

    #[test]
    fn serializes_as_lowercase() {
        let json = serde_json::to_string(&TriageCategory::Orange).unwrap();
        assert_eq!(json, "\"orange\"");
        let json = serde_json::to_string(&TriageStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
