use chrono::{DateTime, Utc};
use marquee_common::article::{
    Article, ArticleDetails, CounterMode, InfoBox, LeadMode, Placement, SpecRow, TrafficRouting,
};
use marquee_common::database::Database;
use marquee_common::store::{ArticleStore, StoreError};
use marquee_common::{ARTICLES_TABLE_NAME, ArticleId, ArticleTitle, Category, TargetUrl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::types::Json;

const COLUMNS: &str = "id, created_at, title, excerpt, content, image, category, keywords, \
    target_url, placement, show_ads, landing_gate, auto_refresh, counter_mode, counter_fixed, \
    counter_min, counter_max, lead_mode, traffic_routing, specs, info_boxes";

#[derive(Clone)]
pub struct PostgresArticleStore {
    database: Database,
}

impl PostgresArticleStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn table(&self) -> String {
        format!("\"{}\".\"{}\"", self.database.database_schema(), ARTICLES_TABLE_NAME)
    }
}

/// One row of the articles table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: Option<String>,
    pub category: String,
    pub keywords: String,
    pub target_url: String,
    pub placement: String,
    pub show_ads: bool,
    pub landing_gate: bool,
    pub auto_refresh: bool,
    pub counter_mode: String,
    pub counter_fixed: Option<i32>,
    pub counter_min: Option<i32>,
    pub counter_max: Option<i32>,
    pub lead_mode: String,
    pub traffic_routing: String,
    pub specs: Json<Vec<SpecRow>>,
    pub info_boxes: Json<Vec<InfoBox>>,
}

impl ArticleStore for PostgresArticleStore {
    async fn upsert(&self, article: &Article) -> Result<(), StoreError> {
        let row = ArticleRow::try_from(article)?;
        let sql = format!(
            "INSERT INTO {} ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            ON CONFLICT (id) DO UPDATE SET
              title = EXCLUDED.title,
              excerpt = EXCLUDED.excerpt,
              content = EXCLUDED.content,
              image = EXCLUDED.image,
              category = EXCLUDED.category,
              keywords = EXCLUDED.keywords,
              target_url = EXCLUDED.target_url,
              placement = EXCLUDED.placement,
              show_ads = EXCLUDED.show_ads,
              landing_gate = EXCLUDED.landing_gate,
              auto_refresh = EXCLUDED.auto_refresh,
              counter_mode = EXCLUDED.counter_mode,
              counter_fixed = EXCLUDED.counter_fixed,
              counter_min = EXCLUDED.counter_min,
              counter_max = EXCLUDED.counter_max,
              lead_mode = EXCLUDED.lead_mode,
              traffic_routing = EXCLUDED.traffic_routing,
              specs = EXCLUDED.specs,
              info_boxes = EXCLUDED.info_boxes",
            self.table()
        );

        sqlx::query(&sql)
            .bind(row.id)
            .bind(row.created_at)
            .bind(row.title)
            .bind(row.excerpt)
            .bind(row.content)
            .bind(row.image)
            .bind(row.category)
            .bind(row.keywords)
            .bind(row.target_url)
            .bind(row.placement)
            .bind(row.show_ads)
            .bind(row.landing_gate)
            .bind(row.auto_refresh)
            .bind(row.counter_mode)
            .bind(row.counter_fixed)
            .bind(row.counter_min)
            .bind(row.counter_max)
            .bind(row.lead_mode)
            .bind(row.traffic_routing)
            .bind(row.specs)
            .bind(row.info_boxes)
            .execute(self.database.database_pool())
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn delete(&self, id: &ArticleId) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table());
        sqlx::query(&sql)
            .bind(id.as_ref())
            .execute(self.database.database_pool())
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get_by_id(&self, id: &ArticleId) -> Result<Option<Article>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table());
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id.as_ref())
            .fetch_optional(self.database.database_pool())
            .await
            .map_err(unavailable)?;
        row.map(Article::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} ORDER BY created_at DESC",
            self.table()
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .fetch_all(self.database.database_pool())
            .await
            .map_err(unavailable)?;
        Ok(readable_articles(rows))
    }
}

/// Convert rows, skipping the ones that no longer form a valid article.
fn readable_articles(rows: Vec<ArticleRow>) -> Vec<Article> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            Article::try_from(row)
                .inspect_err(|err| {
                    tracing::warn!(article = %id, %err, "skipping unreadable article row")
                })
                .ok()
        })
        .collect()
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!("{:?}", err);
    StoreError::Unavailable(err.to_string())
}

impl TryFrom<&Article> for ArticleRow {
    type Error = StoreError;

    fn try_from(article: &Article) -> Result<Self, Self::Error> {
        let details = &article.details;
        let (counter_fixed, counter_min, counter_max) = match details.counter {
            CounterMode::FixedCountdown { seconds } => (Some(to_db_int(seconds)?), None, None),
            CounterMode::RandomNumber { min, max } => {
                (None, Some(to_db_int(min)?), Some(to_db_int(max)?))
            }
            CounterMode::Hidden => (None, None, None),
        };
        Ok(Self {
            id: article.id.to_string(),
            created_at: article.created_at,
            title: details.title.to_string(),
            excerpt: details.excerpt.clone(),
            content: details.content.clone(),
            image: details.image.clone(),
            category: details.category.to_string(),
            keywords: details.keywords.clone(),
            target_url: details.target_url.to_string(),
            placement: to_text(&details.placement),
            show_ads: details.show_ads,
            landing_gate: details.landing_gate,
            auto_refresh: details.auto_refresh,
            counter_mode: counter_mode_name(&details.counter).to_string(),
            counter_fixed,
            counter_min,
            counter_max,
            lead_mode: to_text(&details.lead_mode),
            traffic_routing: to_text(&details.traffic_routing),
            specs: Json(details.specs.clone()),
            info_boxes: Json(details.info_boxes.clone()),
        })
    }
}

impl TryFrom<ArticleRow> for Article {
    type Error = StoreError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        let id = ArticleId::try_new(row.id).map_err(corrupted)?;
        let counter = match row.counter_mode.as_str() {
            "fixed-countdown" => CounterMode::FixedCountdown {
                seconds: from_db_int("counter_fixed", row.counter_fixed)?,
            },
            "random-number" => CounterMode::RandomNumber {
                min: from_db_int("counter_min", row.counter_min)?,
                max: from_db_int("counter_max", row.counter_max)?,
            },
            "hidden" => CounterMode::Hidden,
            other => return Err(StoreError::Corrupted(format!("unknown counter mode {other}"))),
        };
        let details = ArticleDetails {
            title: ArticleTitle::try_new(row.title).map_err(corrupted)?,
            excerpt: row.excerpt,
            content: row.content,
            image: row.image,
            category: Category::try_new(row.category).map_err(corrupted)?,
            keywords: row.keywords,
            target_url: TargetUrl::try_new(row.target_url).map_err(corrupted)?,
            placement: from_text::<Placement>(&row.placement)?,
            show_ads: row.show_ads,
            landing_gate: row.landing_gate,
            auto_refresh: row.auto_refresh,
            counter,
            lead_mode: from_text::<LeadMode>(&row.lead_mode)?,
            traffic_routing: from_text::<TrafficRouting>(&row.traffic_routing)?,
            specs: row.specs.0,
            info_boxes: row.info_boxes.0,
        };
        details.validate().map_err(corrupted)?;
        Ok(Article::new(id, row.created_at, details))
    }
}

fn counter_mode_name(counter: &CounterMode) -> &'static str {
    match counter {
        CounterMode::FixedCountdown { .. } => "fixed-countdown",
        CounterMode::RandomNumber { .. } => "random-number",
        CounterMode::Hidden => "hidden",
    }
}

/// Serialized name of a unit enum variant, e.g. `two-stage-verification`.
fn to_text<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(text.to_string())).map_err(corrupted)
}

fn to_db_int(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| {
        StoreError::Rejected(format!("counter value {value} does not fit the table"))
    })
}

fn from_db_int(column: &str, value: Option<i32>) -> Result<u32, StoreError> {
    value
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| StoreError::Corrupted(format!("{column} is missing or negative")))
}

fn corrupted(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupted(err.to_string())
}

#[cfg(test)]
mod tests {
    use marquee_common::test_utils::ArticleBuilder;

    use super::*;

    #[test]
    fn row_conversion_preserves_every_field() {
        let mut article = ArticleBuilder::new("a1")
            .placement(Placement::Premium)
            .routing(TrafficRouting::TwoStageVerification)
            .counter(CounterMode::RandomNumber { min: 40, max: 90 })
            .build();
        article.details.lead_mode = LeadMode::EmailToUnlock;
        article.details.image = Some("https://cdn.example.com/a1.png".to_string());
        article.details.specs = vec![SpecRow {
            key: "CPU".to_string(),
            value: "8 cores".to_string(),
        }];

        let row = ArticleRow::try_from(&article).unwrap();
        assert_eq!(row.placement, "premium");
        assert_eq!(row.traffic_routing, "two-stage-verification");
        assert_eq!(row.lead_mode, "email-to-unlock");
        assert_eq!(row.counter_mode, "random-number");
        assert_eq!((row.counter_fixed, row.counter_min, row.counter_max), (None, Some(40), Some(90)));

        assert_eq!(Article::try_from(row).unwrap(), article);
    }

    #[test]
    fn fixed_and_hidden_counters_round_trip() {
        for counter in [CounterMode::FixedCountdown { seconds: 0 }, CounterMode::Hidden] {
            let article = ArticleBuilder::new("a1").counter(counter).build();
            assert_eq!(Article::try_from(ArticleRow::try_from(&article).unwrap()).unwrap(), article);
        }
    }

    #[test]
    fn oversized_counters_are_refused_instead_of_truncated() {
        let article = ArticleBuilder::new("a1")
            .counter(CounterMode::FixedCountdown { seconds: 3_000_000_000 })
            .build();
        assert!(matches!(ArticleRow::try_from(&article), Err(StoreError::Rejected(_))));

        let article = ArticleBuilder::new("a2")
            .counter(CounterMode::RandomNumber { min: 1, max: i32::MAX as u32 })
            .build();
        let row = ArticleRow::try_from(&article).unwrap();
        assert_eq!(row.counter_max, Some(i32::MAX));
        assert_eq!(Article::try_from(row).unwrap(), article);
    }

    #[test]
    fn listing_skips_unreadable_rows() {
        let good = ArticleBuilder::new("good").build();
        let mut bad = ArticleRow::try_from(&ArticleBuilder::new("bad").build()).unwrap();
        bad.lead_mode = "shouting".to_string();
        let rows = vec![bad, ArticleRow::try_from(&good).unwrap()];

        assert_eq!(readable_articles(rows), vec![good]);
    }

    #[test]
    fn rows_with_unknown_values_are_corrupted() {
        let article = ArticleBuilder::new("a1").build();

        let mut row = ArticleRow::try_from(&article).unwrap();
        row.placement = "sidebar".to_string();
        assert!(matches!(Article::try_from(row), Err(StoreError::Corrupted(_))));

        let mut row = ArticleRow::try_from(&article).unwrap();
        row.counter_fixed = None;
        assert!(matches!(Article::try_from(row), Err(StoreError::Corrupted(_))));

        let mut row = ArticleRow::try_from(&article).unwrap();
        row.counter_mode = "random-number".to_string();
        row.counter_min = Some(9);
        row.counter_max = Some(1);
        assert!(matches!(Article::try_from(row), Err(StoreError::Corrupted(_))));
    }
}
