use chrono::{DateTime, Utc};
use marquee_common::article::{Article, Placement};
use marquee_common::funnel::{Counter, Redirect, Stage};
use marquee_common::layout::{AdSlot, ArticleAds, FriendlySite, SectionKind};
use marquee_common::session::Role;
use marquee_common::{ArticleId, TargetUrl};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Mutation, SyncStatus};
use crate::domain::verifications::{VerificationId, VerificationSnapshot};
use crate::domain::views::{ViewId, ViewSnapshot, VisitorId};

// public site

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeParams {
    pub tab: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub sections: Vec<SectionKind>,
    pub featured: Vec<ArticleCard>,
    pub premium: Vec<ArticleCard>,
    pub carousel_interval_secs: u64,
    pub grid: GridResponse,
    pub ads: AdsResponse,
    pub heavy_ad: Option<AdSlot>,
    pub network: Vec<FriendlySite>,
    /// Subscribe to `/api/home/refresh` when set.
    pub silent_refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    pub tab: String,
    pub tabs: Vec<String>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items: Vec<ArticleCard>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdsResponse {
    pub top: Option<AdSlot>,
    pub middle: Option<AdSlot>,
    pub bottom: Option<AdSlot>,
}

impl From<ArticleAds<'_>> for AdsResponse {
    fn from(value: ArticleAds<'_>) -> Self {
        Self {
            top: value.top.cloned(),
            middle: value.middle.cloned(),
            bottom: value.bottom.cloned(),
        }
    }
}

/// Summary shown in carousels and the grid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCard {
    pub id: ArticleId,
    pub title: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub category: String,
    pub placement: Placement,
    pub created_at: DateTime<Utc>,
}

impl From<&Article> for ArticleCard {
    fn from(article: &Article) -> Self {
        let details = &article.details;
        Self {
            id: article.id.clone(),
            title: details.title.to_string(),
            excerpt: details.excerpt.clone(),
            image: details.image.clone(),
            category: details.category.to_string(),
            placement: details.placement,
            created_at: article.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticlePageResponse {
    pub article: Article,
    pub ads: AdsResponse,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenViewRequest {
    pub article_id: String,
    pub visitor: Option<VisitorId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StageName {
    EmailCapture,
    Counting,
    Ready,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CounterResponse {
    Countdown { remaining: u32, total: u32, progress: u8 },
    #[serde(rename_all = "camelCase")]
    ActiveUsers { shown: u32, unlocks_in: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RedirectResponse {
    Direct { url: TargetUrl },
    #[serde(rename_all = "camelCase")]
    Verification { article_id: ArticleId },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub view_id: Option<ViewId>,
    pub visitor: Option<VisitorId>,
    pub article_id: String,
    pub stage: StageName,
    pub counter: Option<CounterResponse>,
    pub redirect: Option<RedirectResponse>,
    pub next_tick_at: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    pub social_proof: bool,
}

impl ViewResponse {
    pub fn not_found(article_id: String) -> Self {
        Self {
            view_id: None,
            visitor: None,
            article_id,
            stage: StageName::NotFound,
            counter: None,
            redirect: None,
            next_tick_at: None,
            auto_refresh: false,
            social_proof: false,
        }
    }
}

impl From<ViewSnapshot> for ViewResponse {
    fn from(value: ViewSnapshot) -> Self {
        let (stage, counter, redirect) = match value.stage {
            Stage::EmailCapture => (StageName::EmailCapture, None, None),
            Stage::Counting(Counter::Countdown(countdown)) => (
                StageName::Counting,
                Some(CounterResponse::Countdown {
                    remaining: countdown.remaining(),
                    total: countdown.total(),
                    progress: countdown.progress(),
                }),
                None,
            ),
            Stage::Counting(Counter::ActiveUsers { shown, delay }) => (
                StageName::Counting,
                Some(CounterResponse::ActiveUsers {
                    shown,
                    unlocks_in: delay.remaining(),
                }),
                None,
            ),
            Stage::Ready(Redirect::Direct(url)) => {
                (StageName::Ready, None, Some(RedirectResponse::Direct { url }))
            }
            Stage::Ready(Redirect::Verification(article_id)) => (
                StageName::Ready,
                None,
                Some(RedirectResponse::Verification { article_id }),
            ),
            Stage::NotFound => (StageName::NotFound, None, None),
        };
        Self {
            view_id: Some(value.view_id),
            visitor: Some(value.visitor),
            article_id: value.article_id.to_string(),
            stage,
            counter,
            redirect,
            next_tick_at: value.next_tick_at,
            auto_refresh: value.auto_refresh,
            social_proof: value.social_proof,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub verification_id: VerificationId,
    pub article_id: ArticleId,
    pub title: String,
    pub remaining: u32,
    pub total: u32,
    pub progress: u8,
    pub next_tick_at: Option<DateTime<Utc>>,
    pub target_url: Option<TargetUrl>,
}

impl From<VerificationSnapshot> for VerificationResponse {
    fn from(value: VerificationSnapshot) -> Self {
        Self {
            verification_id: value.id,
            article_id: value.article_id,
            title: value.title.to_string(),
            remaining: value.remaining,
            total: value.total,
            progress: value.progress,
            next_tick_at: value.next_tick_at,
            target_url: value.target_url,
        }
    }
}

// admin

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub role: Role,
    pub established_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRequest {
    pub silent_refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepUpResponse {
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncName {
    Synced,
    LocalOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub sync: SyncName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<SyncStatus> for SyncResponse {
    fn from(value: SyncStatus) -> Self {
        match value {
            SyncStatus::Synced => Self {
                sync: SyncName::Synced,
                notice: None,
            },
            SyncStatus::LocalOnly { notice } => Self {
                sync: SyncName::LocalOnly,
                notice: Some(notice),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse {
    pub article: Article,
    #[serde(flatten)]
    pub sync: SyncResponse,
}

impl From<Mutation> for MutationResponse {
    fn from(value: Mutation) -> Self {
        Self {
            article: value.article,
            sync: value.sync.into(),
        }
    }
}
