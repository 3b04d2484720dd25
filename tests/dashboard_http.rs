use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use sigdash::{
    dashboard_router, BackendProxy, DashboardOptions, FetchError, MarketSnapshot, Signal,
    SignalRecord, SnapshotStore,
};
use tower::util::ServiceExt;

fn record(signal: Signal, rsi: Option<f64>) -> SignalRecord {
    SignalRecord {
        signal,
        score: Some(0.25),
        price: Some(1.5),
        change_24h: Some(3.25),
        rsi,
    }
}

fn store_with(entries: Vec<(String, SignalRecord)>) -> SnapshotStore {
    SnapshotStore::with_snapshot(entries.into_iter().collect::<MarketSnapshot>())
}

fn thirteen_pairs() -> SnapshotStore {
    store_with(
        (0..13)
            .map(|idx| (format!("PAIR{idx:02}"), record(Signal::Buy, Some(50.0))))
            .collect(),
    )
}

async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: Router, uri: &str) -> serde_json::Value {
    let (status, text) = get_text(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn dashboard_page_renders_controls_cards_and_refresh_script() {
    let store = store_with(vec![("BTC".to_string(), record(Signal::StrongBuy, Some(65.0)))]);
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let (status, text) = get_text(app, "/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("name=\"filter\""));
    assert!(text.contains("name=\"sort\""));
    assert!(text.contains("<option value=\"STRONG_SELL\">Strong Sell</option>"));
    assert!(text.contains("data-symbol=\"BTC\""));
    assert!(text.contains("badge signal-strong-buy"));
    assert!(text.contains("RSI: 65.0"));
    assert!(text.contains("✅ Connected"));
    assert!(text.contains("setInterval(()=>window.location.reload(),15000)"));
}

#[tokio::test]
async fn missing_rsi_renders_not_available() {
    let store = store_with(vec![("DOGE".to_string(), record(Signal::Neutral, None))]);
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let (_, text) = get_text(app.clone(), "/dashboard").await;
    assert!(text.contains("RSI: N/A"));
    assert!(!text.contains("NaN"));

    let json = get_json(app, "/dashboard/view").await;
    assert_eq!(json["rows"][0]["rsi"], "N/A");
}

#[tokio::test]
async fn flat_day_renders_zero_change_not_placeholder() {
    let flat = SignalRecord {
        change_24h: Some(0.0),
        ..record(Signal::Neutral, Some(50.0))
    };
    let store = store_with(vec![("USDC".to_string(), flat)]);
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let json = get_json(app.clone(), "/dashboard/view").await;
    assert_eq!(json["rows"][0]["change_24h"], "0.00%");

    let (_, text) = get_text(app, "/dashboard").await;
    assert!(text.contains("<div>24h: 0.00%</div>"));
}

#[tokio::test]
async fn last_page_disables_next_control() {
    let app = dashboard_router(Arc::new(thirteen_pairs()), DashboardOptions::default());

    let (_, text) = get_text(app.clone(), "/dashboard?page=2").await;
    assert!(text.contains("<button id=\"pager-next\" class=\"pager-btn\" disabled>"));
    assert!(text.contains("id=\"pager-prev\" class=\"pager-btn\" href="));
    assert!(text.contains("Showing 1 of 13 pairs (Page 2 of 2)"));

    let json = get_json(app, "/dashboard/view?page=2").await;
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["shown_count"], 1);
    assert_eq!(json["has_next"], false);
    assert_eq!(json["has_previous"], true);
    assert_eq!(json["rows"][0]["symbol"], "PAIR12");
}

#[tokio::test]
async fn page_past_the_end_renders_empty_grid_and_steps_back_to_last_page() {
    let store = store_with(
        (0..30)
            .map(|idx| (format!("PAIR{idx:02}"), record(Signal::Neutral, Some(50.0))))
            .collect(),
    );
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let (status, text) = get_text(app.clone(), "/dashboard?page=10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("<section class=\"grid\" id=\"signal-grid\">\n</section>"));
    assert!(!text.contains("data-symbol="));
    assert!(text.contains(
        "<a id=\"pager-prev\" class=\"pager-btn\" href=\"/dashboard?filter=ALL&amp;sort=symbol&amp;page=3\">"
    ));
    assert!(text.contains("<button id=\"pager-next\" class=\"pager-btn\" disabled>"));
    assert!(text.contains("Showing 0 of 30 pairs (Page 10 of 3)"));

    let json = get_json(app, "/dashboard/view?page=10").await;
    assert_eq!(json["total_pages"], 3);
    assert_eq!(json["shown_count"], 0);
    assert_eq!(json["has_previous"], true);
    assert_eq!(json["has_next"], false);
}

#[tokio::test]
async fn root_redirects_to_dashboard() {
    let app = dashboard_router(Arc::new(SnapshotStore::new()), DashboardOptions::default());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
}

#[tokio::test]
async fn view_endpoint_applies_filter_and_sort_query() {
    let store = store_with(vec![
        ("BTC".to_string(), record(Signal::StrongBuy, None)),
        ("ETH".to_string(), record(Signal::Sell, None)),
        ("SOL".to_string(), record(Signal::Sell, None)),
    ]);
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let json = get_json(app, "/dashboard/view?filter=SELL&sort=symbol").await;
    let rows = json["rows"].as_array().unwrap();

    assert_eq!(json["filter"], "SELL");
    assert_eq!(json["filtered_count"], 2);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["symbol"], "ETH");
    assert_eq!(rows[1]["symbol"], "SOL");
    assert_eq!(rows[0]["style"], "signal-sell");
}

#[tokio::test]
async fn unknown_query_values_fall_back_to_defaults() {
    let app = dashboard_router(Arc::new(thirteen_pairs()), DashboardOptions::default());

    let json = get_json(app, "/dashboard/view?filter=MOON&sort=hype&page=-3").await;
    assert_eq!(json["filter"], "ALL");
    assert_eq!(json["sort"], "symbol");
    assert_eq!(json["page"], 1);
    assert_eq!(json["shown_count"], 12);
}

#[tokio::test]
async fn proxy_data_path_serves_last_known_snapshot() {
    let store = store_with(vec![("BTC".to_string(), record(Signal::StrongBuy, Some(65.0)))]);
    store.apply(Err(FetchError::Transport("backend down".to_string())));
    let app = dashboard_router(Arc::new(store), DashboardOptions::default());

    let json = get_json(app.clone(), "/api/proxy/data").await;
    assert_eq!(json["data"]["BTC"]["signal"], "STRONG_BUY");
    assert_eq!(json["data"]["BTC"]["rsi"], 65.0);

    let view = get_json(app, "/dashboard/view").await;
    assert_eq!(view["status"], "connection_error");
    assert_eq!(view["status_label"], "❌ Connection Error");
}

#[tokio::test]
async fn loading_state_before_first_poll() {
    let app = dashboard_router(Arc::new(SnapshotStore::new()), DashboardOptions::default());

    let json = get_json(app.clone(), "/api/proxy/data").await;
    assert_eq!(json["data"], serde_json::json!({}));

    let view = get_json(app, "/dashboard/view").await;
    assert_eq!(view["status_label"], "Loading...");
    assert!(view["last_update"].is_null());
    assert_eq!(view["total_pages"], 0);
}

#[tokio::test]
async fn auth_stub_always_succeeds_without_caching() {
    let app = dashboard_router(Arc::new(SnapshotStore::new()), DashboardOptions::default());

    for (method, uri) in [
        ("GET", "/api/auth"),
        ("POST", "/api/auth"),
        ("GET", "/api/auth/check"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(r#"{"password":"anything"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["timestamp"].is_string());
        assert!(json["deployment"].is_string());
    }
}

#[tokio::test]
async fn api_routes_carry_cors_headers() {
    let app = dashboard_router(Arc::new(SnapshotStore::new()), DashboardOptions::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/proxy/data")
                .header(header::ORIGIN, "https://elsewhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn backend_route_is_absent_without_proxy() {
    let app = dashboard_router(Arc::new(SnapshotStore::new()), DashboardOptions::default());
    let (status, _) = get_text(app, "/api/backend/data").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backend_route_forwards_to_api_prefix() {
    let upstream = Router::new().route(
        "/api/echo",
        post(|body: String| async move { format!("upstream saw: {body}") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let options = DashboardOptions {
        backend_proxy: Some(BackendProxy::new(
            reqwest::Client::new(),
            format!("http://{upstream_addr}"),
        )),
        ..DashboardOptions::default()
    };
    let app = dashboard_router(Arc::new(SnapshotStore::new()), options);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/backend/echo")
                .body(Body::from("ping"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"upstream saw: ping");

    let (status, _) = get_text(app, "/api/backend/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backend_route_reports_bad_gateway_when_upstream_is_down() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let options = DashboardOptions {
        backend_proxy: Some(BackendProxy::new(
            reqwest::Client::new(),
            format!("http://{dead_addr}"),
        )),
        ..DashboardOptions::default()
    };
    let app = dashboard_router(Arc::new(SnapshotStore::new()), options);

    let (status, text) = get_text(app, "/api/backend/data").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(text.contains("backend unavailable"));
}

#[tokio::test]
async fn backend_route_carries_cors_headers_even_on_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let options = DashboardOptions {
        backend_proxy: Some(BackendProxy::new(
            reqwest::Client::new(),
            format!("http://{dead_addr}"),
        )),
        ..DashboardOptions::default()
    };
    let app = dashboard_router(Arc::new(SnapshotStore::new()), options);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/backend/data")
                .header(header::ORIGIN, "https://elsewhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    // The other routes still share the snapshot state alongside the proxy.
    let json = get_json(app, "/api/proxy/data").await;
    assert_eq!(json["data"], serde_json::json!({}));
}
