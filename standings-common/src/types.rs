use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ranks at or above this position get the featured styling
pub const FEATURED_RANK_CUTOFF: i64 = 7;

/// One row of standings data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Display rank as supplied by the uploader (not validated)
    pub rank: i64,
    pub team_name: String,
    pub total_points: i64,
    pub placement_points: i64,
    pub kill_points: i64,
    pub total_kills: i64,
    pub matches_played: i64,
    /// Number of matches finished in first place
    pub first_place_wins: i64,
}

impl TeamRecord {
    /// Whether this record belongs to the featured (top) tier
    pub fn is_featured(&self) -> bool {
        self.rank <= FEATURED_RANK_CUTOFF
    }
}

/// Editable text labels shown in the card header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub title: String,
    pub subtitle: String,
    /// Day/stage the standings represent, e.g. "OVERALL STANDINGS" or "DAY 2"
    pub period_label: String,
}

impl LabelSet {
    pub const DEFAULT_TITLE: &'static str = "TOURNAMENT";
    pub const DEFAULT_SUBTITLE: &'static str = "Season 1";
    pub const DEFAULT_PERIOD_LABEL: &'static str = "OVERALL STANDINGS";

    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        period_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            period_label: period_label.into(),
        }
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_TITLE,
            Self::DEFAULT_SUBTITLE,
            Self::DEFAULT_PERIOD_LABEL,
        )
    }
}

/// How rows are arranged on the card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutVariant {
    #[default]
    #[serde(rename = "single")]
    SingleColumn,
    #[serde(rename = "two-column")]
    TwoColumn,
}

impl LayoutVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutVariant::SingleColumn => "single",
            LayoutVariant::TwoColumn => "two-column",
        }
    }
}

impl std::fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LayoutVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "single-column" | "one" => Ok(LayoutVariant::SingleColumn),
            "two-column" | "two_column" | "two" | "split" => Ok(LayoutVariant::TwoColumn),
            _ => Err(format!("Unknown layout variant: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient user-facing message (load / export outcome)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
