use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::{TimeDelta, TimeZone, Utc};
use marquee_common::article::{Placement, TrafficRouting};
use marquee_common::clock::ManualClock;
use marquee_common::infrastructure::memory::InMemoryArticleStore;
use marquee_common::layout::SiteLayout;
use marquee_common::test_utils::ArticleBuilder;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{ADMIN_GATEWAY_PATH, router};
use crate::domain::catalog::ArticleCatalog;
use crate::domain::verifications::Verifications;
use crate::domain::views::FunnelViews;
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::auth::tests::{ELEVATED_SECRET, RESTRICTED_SECRET, verifier};

struct TestApp {
    app: axum::Router,
    clock: ManualClock,
    store: InMemoryArticleStore,
}

async fn test_app() -> TestApp {
    let store = InMemoryArticleStore::with_articles([
        ArticleBuilder::new("featured").placement(Placement::Featured).build(),
        ArticleBuilder::new("direct").category("Cloud").day(2).build(),
        ArticleBuilder::new("gated").landing_gate(true).day(3).build(),
        ArticleBuilder::new("two-stage")
            .routing(TrafficRouting::TwoStageVerification)
            .day(4)
            .build(),
    ]);
    let catalog = ArticleCatalog::new(store.clone(), SiteLayout::default());
    catalog.load().await.unwrap();

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    let ttl = TimeDelta::seconds(1800);
    let state = AppStateImpl::new(
        catalog,
        FunnelViews::with_rng(ttl, StdRng::seed_from_u64(7)),
        Verifications::new(ttl),
        verifier(),
        clock.clone(),
        5,
    );
    TestApp {
        app: router(state),
        clock,
        store,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> Response {
        self.send(json_request("POST", uri, None, body)).await
    }

    async fn login(&self, secret: &str) -> String {
        let response = self
            .post("/admin/login", json!({"username": "", "secret": secret}))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body(response).await["token"].as_str().unwrap().to_string()
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authorized(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_ok() {
    let app = test_app().await;

    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn home_lays_out_sections_and_grid() {
    let app = test_app().await;

    let response = app.get("/api/home").await;
    assert_eq!(response.status(), StatusCode::OK);
    let home = body(response).await;

    assert_eq!(home["featured"][0]["id"], "featured");
    assert_eq!(home["grid"]["items"][0]["id"], "two-stage");
    assert_eq!(home["grid"]["tabs"], json!(["latest", "all", "General", "Cloud"]));
    assert_eq!(home["sections"][0], "featured");
    assert_eq!(home["ads"]["top"]["content"], "Top Banner Ad");
    assert_eq!(home["heavyAd"], Value::Null);

    let cloud = body(app.get("/api/home?tab=Cloud&page=3").await).await;
    assert_eq!(cloud["grid"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(cloud["grid"]["page"], 1);
}

#[tokio::test]
async fn unknown_article_is_not_found() {
    let app = test_app().await;

    assert_eq!(app.get("/api/articles/missing").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/articles/a%2Fb").await.status(), StatusCode::NOT_FOUND);

    let page = body(app.get("/api/articles/direct").await).await;
    assert_eq!(page["article"]["targetUrl"], "https://example.com/direct");
    assert_eq!(page["ads"]["middle"]["content"], "Mid-Page Ad");
}

#[tokio::test]
async fn direct_funnel_redirects_after_its_countdown() {
    let app = test_app().await;

    let response = app.post("/api/views", json!({"articleId": "direct"})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let view = body(response).await;
    assert_eq!(view["stage"], "counting");
    assert_eq!(view["counter"], json!({"kind": "countdown", "remaining": 10, "total": 10, "progress": 0}));
    let uri = format!("/api/views/{}", view["viewId"].as_str().unwrap());

    app.clock.advance_secs(9);
    let almost = body(app.get(&uri).await).await;
    assert_eq!(almost["stage"], "counting");
    assert_eq!(almost["redirect"], Value::Null);

    app.clock.advance_secs(1);
    let ready = body(app.get(&uri).await).await;
    assert_eq!(ready["stage"], "ready");
    assert_eq!(
        ready["redirect"],
        json!({"kind": "direct", "url": "https://example.com/direct"})
    );
}

#[tokio::test]
async fn view_of_missing_article_is_not_found() {
    let app = test_app().await;

    let response = app.post("/api/views", json!({"articleId": "missing"})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["stage"], "notFound");
}

#[tokio::test]
async fn landing_gate_is_passed_once_per_visitor() {
    let app = test_app().await;

    let view = body(app.post("/api/views", json!({"articleId": "gated"})).await).await;
    assert_eq!(view["stage"], "emailCapture");
    let email_uri = format!("/api/views/{}/email", view["viewId"].as_str().unwrap());

    let rejected = app.post(&email_uri, json!({"email": "   "})).await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let accepted = app.post(&email_uri, json!({"email": "a@b.com"})).await;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(body(accepted).await["stage"], "counting");

    let again = app.post(&email_uri, json!({"email": "a@b.com"})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let revisit = body(
        app.post("/api/views", json!({"articleId": "gated", "visitor": view["visitor"]}))
            .await,
    )
    .await;
    assert_eq!(revisit["stage"], "counting");
}

#[tokio::test]
async fn closed_views_are_gone() {
    let app = test_app().await;
    let view = body(app.post("/api/views", json!({"articleId": "direct"})).await).await;
    let uri = format!("/api/views/{}", view["viewId"].as_str().unwrap());

    let closed = app.send(Request::delete(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(closed.status(), StatusCode::NO_CONTENT);

    assert_eq!(app.get(&uri).await.status(), StatusCode::NOT_FOUND);
    let feed = format!("{uri}/refresh");
    assert_eq!(app.get(&feed).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn two_stage_funnel_ends_in_a_five_second_verification() {
    let app = test_app().await;
    let view = body(app.post("/api/views", json!({"articleId": "two-stage"})).await).await;
    let uri = format!("/api/views/{}", view["viewId"].as_str().unwrap());

    app.clock.advance_secs(10);
    let ready = body(app.get(&uri).await).await;
    assert_eq!(
        ready["redirect"],
        json!({"kind": "verification", "articleId": "two-stage"})
    );

    let response = app.post("/api/verifications/two-stage", json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let verification = body(response).await;
    assert_eq!(verification["remaining"], 5);
    assert_eq!(verification["targetUrl"], Value::Null);
    let uri = format!(
        "/api/verifications/{}",
        verification["verificationId"].as_str().unwrap()
    );

    app.clock.advance(TimeDelta::milliseconds(4999));
    assert_eq!(body(app.get(&uri).await).await["targetUrl"], Value::Null);

    app.clock.advance(TimeDelta::milliseconds(1));
    assert_eq!(
        body(app.get(&uri).await).await["targetUrl"],
        "https://example.com/two-stage"
    );
}

#[tokio::test]
async fn admin_api_redirects_to_the_gateway_without_a_session() {
    let app = test_app().await;

    let response = app.get("/admin/api/dashboard").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], ADMIN_GATEWAY_PATH);

    let stale = app
        .send(authorized("GET", "/admin/api/dashboard", "67e5504410b1426f9247bb680e5fe0c8"))
        .await;
    assert_eq!(stale.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn filled_decoy_is_an_intrusion_even_with_the_right_secret() {
    let app = test_app().await;

    let response = app
        .post("/admin/login", json!({"username": "x", "secret": ELEVATED_SECRET}))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body(response).await["data"]["message"], "intrusionDetected");
}

#[tokio::test]
async fn wrong_secret_gets_a_generic_denial() {
    let app = test_app().await;

    let response = app
        .post("/admin/login", json!({"username": "", "secret": "guess"}))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body(response).await["data"],
        json!({"message": "Access denied", "clearAfterMs": 3000})
    );
}

#[tokio::test]
async fn elevated_login_opens_the_admin_surface() {
    let app = test_app().await;

    let response = app
        .post("/admin/login", json!({"username": "", "secret": ELEVATED_SECRET}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let login = body(response).await;
    assert_eq!(login["role"], "elevated");
    assert!(cookie.starts_with("marquee_session="));

    let via_cookie = app
        .send(
            Request::get("/admin/api/dashboard")
                .header(header::COOKIE, cookie.split(';').next().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(via_cookie.status(), StatusCode::OK);
    assert_eq!(
        body(via_cookie).await,
        json!({
            "total": 4,
            "featured": 1,
            "premium": 0,
            "grid": 3,
            "store": "connected",
            "trafficMode": "standard"
        })
    );
}

#[tokio::test]
async fn restricted_role_edits_but_cannot_delete_or_change_layout() {
    let app = test_app().await;
    let token = app.login(RESTRICTED_SECRET).await;

    let session = body(app.send(authorized("GET", "/admin/api/session", &token)).await).await;
    assert_eq!(session["role"], "restricted");

    let draft = json!({
        "title": "Renamed",
        "category": "Cloud",
        "targetUrl": "https://example.com/renamed"
    });
    let updated = app
        .send(json_request("PUT", "/admin/api/articles/direct", Some(&token), draft))
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body(updated).await["article"]["title"], "Renamed");

    let deleted = app
        .send(authorized("DELETE", "/admin/api/articles/direct", &token))
        .await;
    assert_eq!(deleted.status(), StatusCode::FORBIDDEN);

    let layout = serde_json::to_value(SiteLayout::default()).unwrap();
    let replaced = app
        .send(json_request("PUT", "/admin/api/layout", Some(&token), layout))
        .await;
    assert_eq!(replaced.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn elevated_role_deletes_articles() {
    let app = test_app().await;
    let token = app.login(ELEVATED_SECRET).await;

    let deleted = app
        .send(authorized("DELETE", "/admin/api/articles/direct", &token))
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body(deleted).await, json!({"sync": "synced"}));

    assert_eq!(app.get("/api/articles/direct").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_outage_is_a_soft_warning() {
    let app = test_app().await;
    let token = app.login(ELEVATED_SECRET).await;
    app.store.set_offline(true);

    let draft = json!({
        "title": "Written offline",
        "category": "Cloud",
        "targetUrl": "https://example.com/offline",
        "placement": "premium"
    });
    let created = app
        .send(json_request("POST", "/admin/api/articles", Some(&token), draft))
        .await;

    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body(created).await;
    assert_eq!(created["sync"], "localOnly");
    assert!(created["notice"].is_string());

    let home = body(app.get("/api/home").await).await;
    assert_eq!(home["premium"][0]["title"], "Written offline");
}

#[tokio::test]
async fn invalid_draft_is_unprocessable() {
    let app = test_app().await;
    let token = app.login(ELEVATED_SECRET).await;

    let draft = json!({
        "title": "Bad range",
        "category": "Cloud",
        "targetUrl": "https://example.com/x",
        "counter": {"mode": "random-number", "min": 9, "max": 1}
    });
    let response = app
        .send(json_request("POST", "/admin/api/articles", Some(&token), draft))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn step_up_accepts_only_the_elevated_secret_and_keeps_the_session() {
    let app = test_app().await;
    let token = app.login(RESTRICTED_SECRET).await;
    let verify = |secret: &str| {
        json_request(
            "POST",
            "/admin/api/security/verify",
            Some(&token),
            json!({"secret": secret}),
        )
    };

    assert_eq!(app.send(verify(RESTRICTED_SECRET)).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(verify(ELEVATED_SECRET)).await.status(), StatusCode::OK);

    let session = body(app.send(authorized("GET", "/admin/api/session", &token)).await).await;
    assert_eq!(session["role"], "restricted");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = test_app().await;
    let token = app.login(ELEVATED_SECRET).await;

    let response = app.send(authorized("POST", "/admin/api/logout", &token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = app.send(authorized("GET", "/admin/api/dashboard", &token)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
}

fn is_event_stream(response: &Response) -> bool {
    response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream")
}

#[tokio::test]
async fn silent_refresh_switch_opens_the_home_feed() {
    let app = test_app().await;
    assert_eq!(app.get("/api/home/refresh").await.status(), StatusCode::NOT_FOUND);

    let restricted = app.login(RESTRICTED_SECRET).await;
    let refused = app
        .send(json_request(
            "PUT",
            "/admin/api/traffic",
            Some(&restricted),
            json!({"silentRefresh": true}),
        ))
        .await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let token = app.login(ELEVATED_SECRET).await;
    let switched = app
        .send(json_request(
            "PUT",
            "/admin/api/traffic",
            Some(&token),
            json!({"silentRefresh": true}),
        ))
        .await;
    assert_eq!(switched.status(), StatusCode::OK);
    assert_eq!(body(switched).await, json!({"silentRefresh": true}));

    assert_eq!(body(app.get("/api/home").await).await["silentRefresh"], true);
    let feed = app.get("/api/home/refresh").await;
    assert_eq!(feed.status(), StatusCode::OK);
    assert!(is_event_stream(&feed));

    let dashboard = body(app.send(authorized("GET", "/admin/api/dashboard", &token)).await).await;
    assert_eq!(dashboard["trafficMode"], "silentRefresh");

    app.send(json_request(
        "PUT",
        "/admin/api/traffic",
        Some(&token),
        json!({"silentRefresh": false}),
    ))
    .await;
    assert_eq!(app.get("/api/home/refresh").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn configured_notices_reach_article_views() {
    let app = test_app().await;
    let plain = body(app.post("/api/views", json!({"articleId": "direct"})).await).await;
    assert_eq!(plain["socialProof"], false);
    let plain_feed = format!("/api/views/{}/notices", plain["viewId"].as_str().unwrap());
    assert_eq!(app.get(&plain_feed).await.status(), StatusCode::NOT_FOUND);

    let token = app.login(ELEVATED_SECRET).await;
    let mut layout = serde_json::to_value(SiteLayout::default()).unwrap();
    layout["socialProofs"] = json!([
        {"id": "1", "text": "Someone in Cairo just unlocked this", "active": true}
    ]);
    let replaced = app
        .send(json_request("PUT", "/admin/api/layout", Some(&token), layout))
        .await;
    assert_eq!(replaced.status(), StatusCode::OK);

    let opened = body(app.post("/api/views", json!({"articleId": "direct"})).await).await;
    assert_eq!(opened["socialProof"], true);
    let feed = app
        .get(&format!("/api/views/{}/notices", opened["viewId"].as_str().unwrap()))
        .await;
    assert_eq!(feed.status(), StatusCode::OK);
    assert!(is_event_stream(&feed));
}
