use axum::extract::{Query, State};
use axum::http::StatusCode;
use marquee_common::article::Article;
use marquee_common::layout::{AdPosition, SiteLayout};
use marquee_common::visibility::{CAROUSEL_INTERVAL_SECS, GridTab, paginate, partition};

use crate::domain::AppState;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::dto::{
    AdsResponse, ArticleCard, GridResponse, HomeParams, HomeResponse,
};

pub async fn home_page<S: AppState>(
    Query(params): Query<HomeParams>,
    State(state): State<S>,
) -> Result<ApiSuccess<HomeResponse>, ApiError> {
    let tab = params
        .tab
        .as_deref()
        .unwrap_or_default()
        .parse::<GridTab>()
        .map_err(ApiError::UnprocessableEntity)?;

    let articles = state.catalog().articles();
    let layout = state.catalog().layout();
    let page = params.page.unwrap_or(1);

    Ok(ApiSuccess::new(
        StatusCode::OK,
        compose(&articles, &layout, &tab, page, state.page_size()),
    ))
}

/// Lay the article set out over the home page sections.
pub fn compose(
    articles: &[Article],
    layout: &SiteLayout,
    tab: &GridTab,
    page: usize,
    page_size: usize,
) -> HomeResponse {
    let slots = partition(articles);
    let cards = |group: &[&Article]| -> Vec<ArticleCard> {
        group.iter().map(|article| ArticleCard::from(*article)).collect()
    };

    let selected = tab.select(&slots.grid);
    let grid_page = paginate(selected, page, page_size);
    let grid = GridResponse {
        tab: tab.to_string(),
        tabs: GridTab::available(&slots.grid)
            .iter()
            .map(ToString::to_string)
            .collect(),
        page: grid_page.page,
        total_pages: grid_page.total_pages,
        total_items: grid_page.total_items,
        items: cards(&grid_page.items),
    };

    HomeResponse {
        sections: layout.visible_sections().collect(),
        featured: cards(&slots.featured),
        premium: cards(&slots.premium),
        carousel_interval_secs: CAROUSEL_INTERVAL_SECS,
        grid,
        ads: AdsResponse {
            top: layout.positional_ad(AdPosition::Top).cloned(),
            middle: layout.positional_ad(AdPosition::Middle).cloned(),
            bottom: layout.positional_ad(AdPosition::Bottom).cloned(),
        },
        heavy_ad: layout.heavy_ad().cloned(),
        network: layout.network.clone(),
        silent_refresh: layout.silent_refresh,
    }
}
