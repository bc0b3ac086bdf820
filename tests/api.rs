use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use pos_inventory::{AppConfig, AppState, app};
use serde_json::{Value, json};
use tower::ServiceExt;

fn demo_app() -> Router {
    app::router(AppState::demo(AppConfig::demo())).expect("demo router")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn readiness_reports_demo_database() {
    let (status, body) = send(demo_app(), get("/health/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "demo");
}

#[tokio::test]
async fn lists_seeded_products() {
    let (status, body) = send(demo_app(), get("/api/products")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn search_filters_by_name() {
    let (status, body) = send(demo_app(), get("/api/products/search?query=iphone")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["total"].as_i64().is_some_and(|total| total >= 1));
}

#[tokio::test]
async fn suggests_smartphones_for_phone_names() {
    let request = with_json(
        "POST",
        "/api/categories/suggest",
        json!({ "name": "iPhone 16 Pro 256GB" }),
    );
    let (status, body) = send(demo_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["suggested_name"], "Smartphones");
    assert_eq!(body[0]["existing_category_id"], 1);
}

#[tokio::test]
async fn blank_name_yields_no_suggestions() {
    let request = with_json("POST", "/api/categories/suggest", json!({ "name": "  " }));
    let (status, body) = send(demo_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn product_lifecycle_in_demo_store() {
    let app = demo_app();

    let create = with_json(
        "POST",
        "/api/products",
        json!({
            "name": "Parlante Bluetooth",
            "category_id": 3,
            "purchase_price": "20",
            "sale_price": "45",
            "stock": 5,
            "min_stock": 1
        }),
    );
    let (status, body) = send(app.clone(), create).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().expect("id");

    let update = with_json(
        "PUT",
        &format!("/api/products/{}", id),
        json!({ "stock": 12 }),
    );
    let (status, body) = send(app.clone(), update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 12);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/products/{}", id))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app.clone(), delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app, get(&format!("/api/products/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_product_is_unprocessable() {
    let request = with_json(
        "POST",
        "/api/products",
        json!({ "name": "X", "sale_price": "0" }),
    );
    let (status, body) = send(demo_app(), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"].as_array().is_some_and(|errors| errors.len() >= 2));
}

#[tokio::test]
async fn duplicate_product_name_conflicts() {
    let request = with_json(
        "POST",
        "/api/products",
        json!({ "name": "iPhone 15 128GB", "purchase_price": "700", "sale_price": "999" }),
    );
    let (status, _) = send(demo_app(), request).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn validate_endpoint_reports_without_saving() {
    let app = demo_app();
    let request = with_json(
        "POST",
        "/api/products/validate",
        json!({ "name": "Cable HDMI", "purchase_price": "10", "sale_price": "5" }),
    );
    let (status, body) = send(app.clone(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["warnings"][0]["field"], "sale_price");

    let (_, products) = send(app, get("/api/products")).await;
    assert_eq!(products.as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn database_backed_endpoints_are_unavailable() {
    for uri in ["/api/sales", "/api/imports", "/api/users", "/api/audit/logs"] {
        let (status, _) = send(demo_app(), get(uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
    }
}

#[tokio::test]
async fn malformed_token_is_rejected_even_in_demo() {
    let request = Request::builder()
        .uri("/api/products")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(demo_app(), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inventory_summary_covers_catalog() {
    let (status, body) = send(demo_app(), get("/api/analytics/inventory")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_products"], 8);
}

#[tokio::test]
async fn reorder_list_is_served() {
    let (status, _) = send(demo_app(), get("/api/analytics/reorder")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn csv_export_has_header_row() {
    let (status, body) = send(demo_app(), get("/api/products/export?format=csv")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().is_some_and(|csv| csv.starts_with("id,name")));
}

#[tokio::test]
async fn auto_classify_assigns_uncategorised_products() {
    let (status, body) = send(
        demo_app(),
        Request::builder()
            .method("POST")
            .uri("/api/categories/auto-classify")
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["examined"], 1);
}

#[tokio::test]
async fn oversized_prices_are_rejected_without_crashing() {
    let app = demo_app();

    let create = with_json(
        "POST",
        "/api/products",
        json!({
            "name": "Lingote de oro",
            "purchase_price": "0.01",
            "sale_price": "79228162514264337593543950335"
        }),
    );
    let (status, body) = send(app.clone(), create).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "sale_price");

    let update = with_json(
        "PUT",
        "/api/products/1",
        json!({ "purchase_price": "10.555" }),
    );
    let (status, _) = send(app.clone(), update).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let validate = with_json(
        "POST",
        "/api/products/validate",
        json!({ "name": "Lingote", "purchase_price": "0.01", "sale_price": "79228162514264337593543950335" }),
    );
    let (status, body) = send(app.clone(), validate).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);

    let (status, _) = send(app, get("/api/analytics/inventory")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn insights_accept_extreme_candidate_prices() {
    let (status, body) = send(
        demo_app(),
        get("/api/categories/1/insights?price=-79228162514264337593543950335"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["insights"].as_array().is_some_and(|i| !i.is_empty()));
}
