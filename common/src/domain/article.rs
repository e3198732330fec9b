use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ArticleId, ArticleTitle, Category, TargetUrl};

/// Number of fixed info-box slots an article can fill.
pub const INFO_BOX_SLOTS: usize = 4;

/// Largest countdown length or random bound an article may carry; the
/// record store keeps counters in signed 32-bit columns.
pub const MAX_COUNTER_VALUE: u32 = i32::MAX as u32;

/// A publishable funnel unit.
///
/// `id` and `created_at` are fixed at creation; every admin edit replaces
/// `details` as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ArticleDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetails {
    pub title: ArticleTitle,
    pub excerpt: String,
    pub content: String,
    pub image: Option<String>,
    pub category: Category,
    pub keywords: String,
    pub target_url: TargetUrl,
    pub placement: Placement,
    pub show_ads: bool,
    pub landing_gate: bool,
    pub auto_refresh: bool,
    pub counter: CounterMode,
    pub lead_mode: LeadMode,
    pub traffic_routing: TrafficRouting,
    pub specs: Vec<SpecRow>,
    pub info_boxes: Vec<InfoBox>,
}

/// The single display slot an article occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Featured,
    Premium,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CounterMode {
    /// Visible countdown from `seconds` to zero.
    FixedCountdown { seconds: u32 },
    /// Static "active users" figure drawn from `[min, max]`.
    RandomNumber { min: u32, max: u32 },
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadMode {
    #[default]
    None,
    Quiet,
    Aggressive,
    EmailToUnlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficRouting {
    #[default]
    Direct,
    TwoStageVerification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRow {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoBox {
    pub label: String,
    pub value: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleError {
    InvalidField { field: &'static str, reason: String },
    InvalidCounterRange { min: u32, max: u32 },
    CounterTooLarge(u32),
    TooManyInfoBoxes(usize),
}

impl fmt::Display for ArticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleError::InvalidField { field, reason } => write!(f, "invalid {field}: {reason}"),
            ArticleError::InvalidCounterRange { min, max } => {
                write!(f, "counter range [{min}, {max}] is empty")
            }
            ArticleError::CounterTooLarge(value) => {
                write!(f, "counter value {value} exceeds {MAX_COUNTER_VALUE}")
            }
            ArticleError::TooManyInfoBoxes(count) => write!(
                f,
                "{count} info boxes given, only {INFO_BOX_SLOTS} slots available"
            ),
        }
    }
}

impl std::error::Error for ArticleError {}

impl Article {
    pub fn new(id: ArticleId, created_at: DateTime<Utc>, details: ArticleDetails) -> Self {
        Self {
            id,
            created_at,
            details,
        }
    }

    /// Replace editable content, keeping identity and creation time.
    pub fn revise(&mut self, details: ArticleDetails) {
        self.details = details;
    }

    pub fn placement(&self) -> Placement {
        self.details.placement
    }

    pub fn category(&self) -> &Category {
        &self.details.category
    }
}

impl ArticleDetails {
    pub fn validate(&self) -> Result<(), ArticleError> {
        match self.counter {
            CounterMode::FixedCountdown { seconds } if seconds > MAX_COUNTER_VALUE => {
                return Err(ArticleError::CounterTooLarge(seconds));
            }
            CounterMode::RandomNumber { min, max } if min > max => {
                return Err(ArticleError::InvalidCounterRange { min, max });
            }
            CounterMode::RandomNumber { max, .. } if max > MAX_COUNTER_VALUE => {
                return Err(ArticleError::CounterTooLarge(max));
            }
            _ => {}
        }
        if self.info_boxes.len() > INFO_BOX_SLOTS {
            return Err(ArticleError::TooManyInfoBoxes(self.info_boxes.len()));
        }
        Ok(())
    }

    /// Whether a visitor must pass the email capture step first.
    pub fn requires_email_capture(&self) -> bool {
        self.landing_gate || self.lead_mode == LeadMode::EmailToUnlock
    }
}

/// Unvalidated article content as submitted by the admin forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: Option<String>,
    pub category: String,
    pub keywords: String,
    pub target_url: String,
    pub placement: Option<Placement>,
    pub show_ads: Option<bool>,
    pub landing_gate: bool,
    pub auto_refresh: bool,
    pub counter: Option<CounterMode>,
    pub lead_mode: LeadMode,
    pub traffic_routing: TrafficRouting,
    pub specs: Vec<SpecRow>,
    pub info_boxes: Vec<InfoBox>,
}

impl TryFrom<ArticleDraft> for ArticleDetails {
    type Error = ArticleError;

    fn try_from(value: ArticleDraft) -> Result<Self, Self::Error> {
        let title = ArticleTitle::try_new(value.title).map_err(|e| invalid("title", e))?;
        let category = Category::try_new(value.category).map_err(|e| invalid("category", e))?;
        let target_url =
            TargetUrl::try_new(value.target_url).map_err(|e| invalid("targetUrl", e))?;
        let image = value
            .image
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty());
        let specs = value
            .specs
            .into_iter()
            .filter(|row| !row.key.trim().is_empty())
            .collect();

        let details = Self {
            title,
            excerpt: value.excerpt,
            content: value.content,
            image,
            category,
            keywords: value.keywords,
            target_url,
            placement: value.placement.unwrap_or(Placement::Grid),
            show_ads: value.show_ads.unwrap_or(true),
            landing_gate: value.landing_gate,
            auto_refresh: value.auto_refresh,
            counter: value
                .counter
                .unwrap_or(CounterMode::FixedCountdown { seconds: 10 }),
            lead_mode: value.lead_mode,
            traffic_routing: value.traffic_routing,
            specs,
            info_boxes: value.info_boxes,
        };
        details.validate()?;
        Ok(details)
    }
}

fn invalid(field: &'static str, err: impl fmt::Display) -> ArticleError {
    ArticleError::InvalidField {
        field,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ArticleBuilder;

    fn draft() -> ArticleDraft {
        ArticleDraft {
            title: "Edge Computing Revolution".to_string(),
            category: "Infrastructure".to_string(),
            target_url: "https://example.com/edge".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn draft_defaults_to_grid_with_ads_and_ten_second_countdown() {
        let details = ArticleDetails::try_from(draft()).unwrap();

        assert_eq!(details.placement, Placement::Grid);
        assert!(details.show_ads);
        assert_eq!(details.counter, CounterMode::FixedCountdown { seconds: 10 });
        assert_eq!(details.traffic_routing, TrafficRouting::Direct);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut draft = draft();
        draft.title = "   ".to_string();

        let err = ArticleDetails::try_from(draft).unwrap_err();
        assert!(matches!(err, ArticleError::InvalidField { field: "title", .. }));
    }

    #[test]
    fn inverted_random_range_is_rejected() {
        let mut draft = draft();
        draft.counter = Some(CounterMode::RandomNumber { min: 90, max: 10 });

        let err = ArticleDetails::try_from(draft).unwrap_err();
        assert_eq!(err, ArticleError::InvalidCounterRange { min: 90, max: 10 });
    }

    #[test]
    fn counters_beyond_the_storable_range_are_rejected() {
        let mut draft = draft();
        draft.counter = Some(CounterMode::FixedCountdown { seconds: 3_000_000_000 });
        let err = ArticleDetails::try_from(draft.clone()).unwrap_err();
        assert_eq!(err, ArticleError::CounterTooLarge(3_000_000_000));

        draft.counter = Some(CounterMode::RandomNumber { min: 5, max: u32::MAX });
        let err = ArticleDetails::try_from(draft.clone()).unwrap_err();
        assert_eq!(err, ArticleError::CounterTooLarge(u32::MAX));

        draft.counter = Some(CounterMode::FixedCountdown { seconds: MAX_COUNTER_VALUE });
        assert!(ArticleDetails::try_from(draft).is_ok());
    }

    #[test]
    fn info_boxes_are_limited_to_fixed_slots() {
        let mut draft = draft();
        draft.info_boxes = (0..5)
            .map(|i| InfoBox {
                label: format!("label {i}"),
                value: "v".to_string(),
                icon: "star".to_string(),
            })
            .collect();

        let err = ArticleDetails::try_from(draft).unwrap_err();
        assert_eq!(err, ArticleError::TooManyInfoBoxes(5));
    }

    #[test]
    fn blank_image_and_spec_keys_are_dropped() {
        let mut draft = draft();
        draft.image = Some("  ".to_string());
        draft.specs = vec![
            SpecRow { key: "CPU".to_string(), value: "8 cores".to_string() },
            SpecRow { key: " ".to_string(), value: "orphan".to_string() },
        ];

        let details = ArticleDetails::try_from(draft).unwrap();
        assert_eq!(details.image, None);
        assert_eq!(details.specs.len(), 1);
    }

    #[test]
    fn email_to_unlock_requires_capture_without_landing_gate() {
        let mut article = ArticleBuilder::new("a1").build();
        assert!(!article.details.requires_email_capture());

        article.details.lead_mode = LeadMode::EmailToUnlock;
        assert!(article.details.requires_email_capture());

        article.details.lead_mode = LeadMode::Aggressive;
        article.details.landing_gate = true;
        assert!(article.details.requires_email_capture());
    }

    #[test]
    fn revise_keeps_identity() {
        let mut article = ArticleBuilder::new("a1").build();
        let created_at = article.created_at;
        let mut details = article.details.clone();
        details.placement = Placement::Featured;

        article.revise(details);

        assert_eq!(article.id.as_ref(), "a1");
        assert_eq!(article.created_at, created_at);
        assert_eq!(article.placement(), Placement::Featured);
    }

    #[test]
    fn counter_mode_serializes_with_mode_tag() {
        let json = serde_json::to_value(CounterMode::RandomNumber { min: 1, max: 9 }).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "random-number", "min": 1, "max": 9}));
    }
}
