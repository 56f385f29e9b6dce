use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use showcase_api::auth::{hash_password, issue_token};
use showcase_api::config::AppConfig;
use showcase_api::routes::build_router;
use showcase_api::state::AppState;
use showcase_core::document::NewContent;
use showcase_core::events::ChangeAction;
use showcase_core::{EventBus, ShowcaseEvent, Store};

const PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    router: Router,
    state: AppState,
    token: String,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig {
            admin_password_hash: Some(hash_password(PASSWORD).unwrap()),
            ..AppConfig::default()
        };
        let state = AppState::new(Store::memory(), config, EventBus::new(64)).unwrap();
        let (token, _) = issue_token(
            &state.config().jwt_secret,
            "admin",
            Duration::from_secs(600),
        )
        .unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            token,
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.send(request(Method::GET, uri, None, None)).await
    }

    async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(request(method, uri, body, Some(&self.token))).await
    }

    async fn anonymous(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(request(method, uri, body, None)).await
    }
}

fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn names(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| {
            i.get("name")
                .or_else(|| i["content"].get("name"))
                .and_then(Value::as_str)
                .unwrap()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn health_reports_store_backend() {
    let app = TestApp::new();
    let res = app.get("/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["store"], "memory");

    let res = app.get("/v1/ping").await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn writes_require_admin_token() {
    let app = TestApp::new();
    let res = app
        .anonymous(Method::POST, "/api/content", Some(json!({"type": "faq"})))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["type"], "unauthorized");
    assert_eq!(res.body["error"]["statusCode"], 401);

    let res = app
        .send(request(
            Method::POST,
            "/api/content",
            Some(json!({"type": "faq"})),
            Some("not-a-token"),
        ))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_usable_token() {
    let app = TestApp::new();
    let res = app
        .anonymous(
            Method::POST,
            "/api/auth/login",
            Some(json!({"username": "admin", "password": "nope"})),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .anonymous(
            Method::POST,
            "/api/auth/login",
            Some(json!({"username": "admin", "password": PASSWORD})),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.body["token"].as_str().unwrap().to_string();
    assert!(res.body["expiresAt"].is_string());

    let res = app
        .send(request(
            Method::POST,
            "/api/content",
            Some(json!({"type": "faq", "content": {"items": []}})),
            Some(&token),
        ))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["type"], "faq");
}

#[tokio::test]
async fn page_content_is_filtered_by_region() {
    let app = TestApp::new();
    let page = json!({
        "title": "Home",
        "content": {
            "hero": {"title": "Welcome"},
            "pricing": {"plans": [
                {"name": "fr", "targetRegions": ["france"]},
                {"name": "ma", "targetRegions": ["morocco"]},
                {"name": "intl", "targetRegions": ["international"]},
                {"name": "custom", "targetRegions": ["all"]}
            ]}
        }
    });
    let res = app.admin(Method::PUT, "/api/content/home-page", Some(page)).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.get("/api/content/home-page?region=france").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(&res.body["content"]["pricing"]["plans"]), ["fr", "custom"]);
    assert_eq!(res.body["content"]["hero"]["title"], "Welcome");

    // No routable client address resolves to international.
    let res = app.get("/api/content/home-page").await;
    assert_eq!(names(&res.body["content"]["pricing"]["plans"]), ["intl", "custom"]);

    let res = app.get("/api/content/home-page?region=all").await;
    assert_eq!(res.body["content"]["pricing"]["plans"].as_array().unwrap().len(), 4);

    let res = app.get("/api/content/home-page?region=mars").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_and_malformed_types() {
    let app = TestApp::new();
    let res = app.get("/api/content/pricing-page").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"]["type"], "notFound");

    let res = app.get("/api/content/Pricing_Page").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["type"], "validationError");
}

#[tokio::test]
async fn cached_page_is_refreshed_by_dashboard_writes() {
    let app = TestApp::new();
    app.admin(
        Method::PUT,
        "/api/content/blog-page",
        Some(json!({"content": {"hero": {"title": "v1"}}})),
    )
    .await;
    let res = app.get("/api/content/blog-page").await;
    assert_eq!(res.body["content"]["hero"]["title"], "v1");

    // A write that bypasses the API is not seen until the cache entry expires.
    app.state
        .store()
        .upsert_by_type(NewContent::new("blog-page", json!({"hero": {"title": "v2"}})))
        .await
        .unwrap();
    let res = app.get("/api/content/blog-page").await;
    assert_eq!(res.body["content"]["hero"]["title"], "v1");

    let res = app
        .admin(
            Method::PUT,
            "/api/content/blog-page",
            Some(json!({"content": {"hero": {"title": "v3"}}})),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get("/api/content/blog-page").await;
    assert_eq!(res.body["content"]["hero"]["title"], "v3");
}

#[tokio::test]
async fn content_items_crud() {
    let app = TestApp::new();
    let res = app
        .admin(
            Method::POST,
            "/api/content",
            Some(json!({"type": "testimonial", "title": "A", "content": {"name": "A"}})),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["_id"].as_str().unwrap().to_string();
    let uri = format!("/api/content/item/{id}");

    let res = app.get(&uri).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "A");

    let res = app
        .admin(Method::PUT, &uri, Some(json!({"title": "A2", "isActive": false})))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "A2");
    assert_eq!(res.body["isActive"], false);
    assert_eq!(res.body["content"]["name"], "A");

    let res = app.get("/api/content?type=testimonial&active=false").await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    let res = app.get("/api/content?type=testimonial&active=true").await;
    assert!(res.body.as_array().unwrap().is_empty());

    let res = app.admin(Method::DELETE, &uri, None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app.get(&uri).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_by_type_removes_every_document() {
    let app = TestApp::new();
    for name in ["a", "b"] {
        app.admin(
            Method::POST,
            "/api/content",
            Some(json!({"type": "faq", "content": {"name": name}})),
        )
        .await;
    }
    let res = app.admin(Method::DELETE, "/api/content/faq", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["deleted"], 2);

    let res = app.admin(Method::DELETE, "/api/content/faq", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn testimonials_filter_by_region_with_fallback() {
    let app = TestApp::new();
    let mut ids = Vec::new();
    for (name, regions) in [
        ("claire", json!(["france"])),
        ("youssef", json!(["morocco"])),
        ("sam", json!(["all"])),
    ] {
        let res = app
            .admin(
                Method::POST,
                "/api/content",
                Some(json!({"type": "testimonial", "content": {"name": name, "targetRegions": regions}})),
            )
            .await;
        ids.push(res.body["_id"].as_str().unwrap().to_string());
    }

    let res = app.get("/api/testimonials?region=morocco").await;
    assert_eq!(res.status, StatusCode::OK);
    let mut got = names(&res.body);
    got.sort();
    assert_eq!(got, ["sam", "youssef"]);

    // Only France-tagged items selected: nothing matches Morocco, so all are shown.
    let uri = format!("/api/testimonials?region=morocco&ids={}", ids[0]);
    let res = app.get(&uri).await;
    assert_eq!(names(&res.body), ["claire"]);

    let ghost = uuid::Uuid::now_v7();
    let uri = format!("/api/testimonials?region=all&ids={},{ghost},{}", ids[2], ids[1]);
    let res = app.get(&uri).await;
    assert_eq!(names(&res.body), ["sam", "youssef"]);
    assert_eq!(
        res.headers.get("x-missing-testimonials").unwrap(),
        ghost.to_string().as_str()
    );
}

#[tokio::test]
async fn page_views_count_per_normalized_path() {
    let app = TestApp::new();
    let res = app
        .anonymous(Method::POST, "/api/track-page-view", Some(json!({"path": "/blog/"})))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"path": "/blog", "count": 1}));

    let res = app
        .anonymous(
            Method::POST,
            "/api/track-page-view",
            Some(json!({"path": "/blog?utm_source=x"})),
        )
        .await;
    assert_eq!(res.body["count"], 2);

    let res = app
        .anonymous(Method::POST, "/api/track-page-view", Some(json!({"path": ""})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/track-page-view").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = app.admin(Method::GET, "/api/track-page-view?limit=10", None).await;
    assert_eq!(res.body, json!([{"path": "/blog", "count": 2}]));
}

#[tokio::test]
async fn one_theme_is_active_after_every_change() {
    let app = TestApp::new();
    let res = app.get("/api/appearance").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let light = app
        .admin(
            Method::POST,
            "/api/appearance",
            Some(json!({"name": "Light", "isActive": true})),
        )
        .await;
    assert_eq!(light.status, StatusCode::CREATED);
    let light_id = light.body["_id"].as_str().unwrap().to_string();

    let dark = app
        .admin(
            Method::POST,
            "/api/appearance",
            Some(json!({"name": "Dark", "backgroundColor": "#000", "isActive": true})),
        )
        .await;
    let dark_id = dark.body["_id"].as_str().unwrap().to_string();

    let active = |themes: &Value| {
        themes
            .as_array()
            .unwrap()
            .iter()
            .filter(|t| t["isActive"] == true)
            .map(|t| t["_id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };

    let res = app.get("/api/appearance/themes").await;
    assert_eq!(active(&res.body), [dark_id.clone()]);

    let res = app
        .admin(Method::POST, &format!("/api/appearance/{light_id}/activate"), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get("/api/appearance/themes").await;
    assert_eq!(active(&res.body), [light_id.clone()]);

    let res = app.get("/api/appearance").await;
    assert_eq!(res.body["name"], "Light");

    let res = app
        .admin(
            Method::PUT,
            &format!("/api/appearance/{dark_id}"),
            Some(json!({"textColor": "#fff", "isActive": true})),
        )
        .await;
    assert_eq!(res.body["textColor"], "#fff");
    let res = app.get("/api/appearance/themes").await;
    assert_eq!(active(&res.body), [dark_id.clone()]);

    let res = app
        .admin(Method::DELETE, &format!("/api/appearance/{dark_id}"), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    let res = app
        .admin(Method::DELETE, &format!("/api/appearance/{light_id}"), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app
        .admin(Method::POST, "/api/appearance", Some(json!({"name": " "})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn newsletter_signup_is_idempotent() {
    let app = TestApp::new();
    let body = json!({"email": "Jane@Example.com", "region": "france"});
    let res = app
        .anonymous(Method::POST, "/api/newsletter", Some(body.clone()))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["email"], "jane@example.com");
    assert_eq!(res.body["region"], "france");

    let res = app.anonymous(Method::POST, "/api/newsletter", Some(body)).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .anonymous(Method::POST, "/api/newsletter", Some(json!({"email": "nope"})))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/newsletter").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = app.admin(Method::GET, "/api/newsletter", None).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blog_lists_by_tag_and_finds_by_slug() {
    let app = TestApp::new();
    for (slug, tags) in [("erp-drift", json!(["erp"])), ("cloud-costs", json!(["cloud"]))] {
        app.admin(
            Method::POST,
            "/api/content",
            Some(json!({"type": "blog-post", "title": slug, "content": {"slug": slug, "tags": tags}})),
        )
        .await;
    }

    let res = app.get("/api/blog").await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);

    let res = app.get("/api/blog?tag=ERP").await;
    let posts = res.body.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"]["slug"], "erp-drift");

    let res = app.get("/api/blog?limit=1").await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);

    let res = app.get("/api/blog/cloud-costs").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["title"], "cloud-costs");

    let res = app.get("/api/blog/missing").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn region_endpoint_reports_resolution() {
    let app = TestApp::new();
    let res = app.get("/api/region").await;
    assert_eq!(res.body, json!({"region": "international", "countryCode": null, "source": "local"}));

    let res = app.get("/api/region?region=morocco").await;
    assert_eq!(res.body["region"], "morocco");
    assert_eq!(res.body["source"], "override");
}

#[tokio::test]
async fn region_parameter_is_read_the_same_everywhere() {
    let app = TestApp::new();
    app.admin(
        Method::PUT,
        "/api/content/home-page",
        Some(json!({"content": {"plans": [{"name": "fr", "targetRegions": ["france"]}]}})),
    )
    .await;

    for query in ["?region=all", "?region=ALL", "?region=", "?region=%20"] {
        let res = app.get(&format!("/api/region{query}")).await;
        assert_eq!(res.status, StatusCode::OK, "/api/region{query}");
        assert_eq!(res.body["source"], "local", "/api/region{query}");

        let res = app.get(&format!("/api/content/home-page{query}")).await;
        assert_eq!(res.status, StatusCode::OK, "/api/content/home-page{query}");
    }

    let res = app.get("/api/region?region=%20France%20").await;
    assert_eq!(res.body["region"], "france");
    assert_eq!(res.body["source"], "override");

    let res = app.get("/api/region?region=mars").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app.get("/api/content/home-page?region=mars").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn writes_publish_change_events() {
    let app = TestApp::new();
    let mut rx = app.state.event_bus().subscribe();

    app.admin(
        Method::PUT,
        "/api/content/clients-page",
        Some(json!({"content": {"logos": []}})),
    )
    .await;

    match rx.try_recv().unwrap() {
        ShowcaseEvent::ContentChanged(change) => assert_eq!(change.content_type, "clients-page"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_never_cache_a_superseded_page() {
    let app = TestApp::new();

    for round in 0..50 {
        let stop = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = app.state.clone();
                let stop = stop.clone();
                tokio::spawn(async move {
                    while !stop.load(Ordering::Relaxed) {
                        state.content_by_type("home-page").await.unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for version in 1..=20 {
            app.state
                .store()
                .upsert_by_type(NewContent::new("home-page", json!({ "version": version })))
                .await
                .unwrap();
            app.state
                .notify(ShowcaseEvent::content("home-page", None, ChangeAction::Updated))
                .await;
            tokio::task::yield_now().await;
        }

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.await.unwrap();
        }

        let doc = app.state.content_by_type("home-page").await.unwrap().unwrap();
        assert_eq!(doc.content["version"], 20, "round {round} served a stale page");
    }
}
