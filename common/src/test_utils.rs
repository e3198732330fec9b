use chrono::{DateTime, TimeZone, Utc};

use crate::domain::article::{
    Article, ArticleDetails, CounterMode, LeadMode, Placement, TrafficRouting,
};
use crate::domain::{ArticleId, ArticleTitle, Category, TargetUrl};

/// Builder for valid articles with sensible defaults.
///
/// Public so that other crates can reuse it for their own tests.
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    /// Grid article in "General", created 2026-02-01, direct routing, ten
    /// second countdown, no gate.
    pub fn new(id: &str) -> Self {
        let details = ArticleDetails {
            title: ArticleTitle::try_new(format!("Article {id}")).unwrap(),
            excerpt: String::new(),
            content: String::new(),
            image: None,
            category: Category::try_new("General").unwrap(),
            keywords: String::new(),
            target_url: TargetUrl::try_new(format!("https://example.com/{id}")).unwrap(),
            placement: Placement::Grid,
            show_ads: true,
            landing_gate: false,
            auto_refresh: false,
            counter: CounterMode::FixedCountdown { seconds: 10 },
            lead_mode: LeadMode::None,
            traffic_routing: TrafficRouting::Direct,
            specs: Vec::new(),
            info_boxes: Vec::new(),
        };
        Self {
            article: Article::new(ArticleId::try_new(id).unwrap(), february(1), details),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.article.details.title = ArticleTitle::try_new(title).unwrap();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.article.details.category = Category::try_new(category).unwrap();
        self
    }

    pub fn target(mut self, url: &str) -> Self {
        self.article.details.target_url = TargetUrl::try_new(url).unwrap();
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.article.details.placement = placement;
        self
    }

    pub fn counter(mut self, counter: CounterMode) -> Self {
        self.article.details.counter = counter;
        self
    }

    pub fn routing(mut self, routing: TrafficRouting) -> Self {
        self.article.details.traffic_routing = routing;
        self
    }

    pub fn landing_gate(mut self, enabled: bool) -> Self {
        self.article.details.landing_gate = enabled;
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.article.details.auto_refresh = enabled;
        self
    }

    /// Creation date as a day of February 2026.
    pub fn day(mut self, day: u32) -> Self {
        self.article.created_at = february(day);
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}

fn february(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, day, 0, 0, 0).unwrap()
}
