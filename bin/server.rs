// MDRM Explorer - Web Server
// Browser front end for the same explorer handlers the TUI uses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use mdrm_explorer::{
    explorer, init_logging, Action, AppConfig, Catalog, DistributionCharts, ExplorerInput,
    ExplorerView, FilterOptions,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Shared application state. The catalog is read-only after startup.
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    rows: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        version: mdrm_explorer::VERSION,
        rows: state.catalog.len(),
    }))
}

/// GET /api/options - Choices for the selector controls
async fn get_options(State(state): State<AppState>) -> Json<ApiResponse<FilterOptions>> {
    Json(ApiResponse::ok(explorer::filter_options(&state.catalog)))
}

/// GET /api/search?mnemonic=&item_code=&item_type=&reporting_form=&confidentiality=
async fn search(
    State(state): State<AppState>,
    Query(input): Query<ExplorerInput>,
) -> Json<ApiResponse<ExplorerView>> {
    let view = explorer::handle(&state.catalog, Action::Search, &input);
    info!(matches = view.total_matches, truncated = view.truncated, "search");
    Json(ApiResponse::ok(view))
}

/// GET /api/reset - First rows of the table, filters ignored
async fn reset(State(state): State<AppState>) -> Json<ApiResponse<ExplorerView>> {
    let view = explorer::handle(&state.catalog, Action::Reset, &ExplorerInput::default());
    Json(ApiResponse::ok(view))
}

/// GET /api/charts - Distribution charts over the whole catalog
async fn get_charts(State(state): State<AppState>) -> Json<ApiResponse<DistributionCharts>> {
    Json(ApiResponse::ok(explorer::distribution_charts(&state.catalog)))
}

/// GET /api/items/:mnemonic/:item_code - Detail text for one item
async fn get_item(
    State(state): State<AppState>,
    Path((mnemonic, item_code)): Path<(String, String)>,
) -> impl IntoResponse {
    if state.catalog.find(&mnemonic, &item_code).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(
                explorer::NO_SELECTION_MESSAGE.to_string(),
                format!("No item {}{}", mnemonic, item_code),
            )),
        );
    }

    let text = explorer::item_details(&state.catalog, Some((&mnemonic, &item_code)));
    (StatusCode::OK, Json(ApiResponse::ok(text)))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn app(state: AppState) -> Router {
    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/options", get(get_options))
        .route("/search", get(search))
        .route("/reset", get(reset))
        .route("/charts", get(get_charts))
        .route("/items/:mnemonic/:item_code", get(get_item))
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    println!("🌐 MDRM Explorer - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut config = AppConfig::from_env();
    if let Some(path) = std::env::args().nth(1) {
        config = config.with_catalog_path(path);
    }

    let catalog = match Catalog::load(&config.catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "Catalog load failed");
            eprintln!("❌ {}", e);
            eprintln!("   Set MDRM_CSV or pass the CSV path as an argument.");
            std::process::exit(1);
        }
    };
    println!("✓ Loaded {} rows of data", catalog.len());

    let state = AppState {
        catalog: Arc::new(catalog),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()?).await?;
    let addr = listener.local_addr()?;

    info!(%addr, "Server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/search", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mdrm_explorer::{CatalogEntry, Confidentiality, ItemType};
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> AppState {
        let entries = (0..25)
            .map(|i| CatalogEntry {
                mnemonic: if i < 15 { "RCON".to_string() } else { "RIAD".to_string() },
                item_code: Some(format!("{:04}", 2000 + i)),
                item_name: format!("Item {}", i),
                item_type: ItemType::Financial,
                reporting_form: Some("FFIEC 031".to_string()),
                confidentiality: if i % 5 == 0 {
                    Confidentiality::Confidential
                } else {
                    Confidentiality::Public
                },
                ..CatalogEntry::default()
            })
            .collect();
        AppState {
            catalog: Arc::new(Catalog::from_entries(entries)),
        }
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["rows"], 25);
    }

    #[tokio::test]
    async fn test_search_with_filters() {
        let (status, json) = get_json("/api/search?mnemonic=RIAD&confidentiality=all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["rows"].as_array().unwrap().len(), 10);
        assert_eq!(json["data"]["count_text"], "Found 10 rows");
        assert_eq!(json["data"]["kind"], "search");
    }

    #[tokio::test]
    async fn test_search_confidential_only() {
        let (_, json) = get_json("/api/search?confidentiality=Y").await;
        let rows = json["data"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r["confidentiality"] == "Y"));
    }

    #[tokio::test]
    async fn test_reset() {
        let (_, json) = get_json("/api/reset").await;
        assert_eq!(json["data"]["rows"].as_array().unwrap().len(), 10);
        assert_eq!(
            json["data"]["count_text"],
            "Showing first 10 rows (total dataset: 25 rows)"
        );
        assert_eq!(json["data"]["kind"], "reset");
    }

    #[tokio::test]
    async fn test_charts() {
        let (_, json) = get_json("/api/charts").await;
        let points = json["data"]["mnemonics"]["points"].as_array().unwrap();
        assert_eq!(points[0]["label"], "RCON");
        assert_eq!(points[0]["value"], 15);
    }

    #[tokio::test]
    async fn test_options() {
        let (_, json) = get_json("/api/options").await;
        let mnemonics: Vec<&str> = json["data"]["mnemonics"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["value"].as_str().unwrap())
            .collect();
        assert_eq!(mnemonics, vec!["RCON", "RIAD"]);
    }

    #[tokio::test]
    async fn test_item_details() {
        let (status, json) = get_json("/api/items/RCON/2003").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]
            .as_str()
            .unwrap()
            .contains("MDRM Identifier: RCON2003"));
    }

    #[tokio::test]
    async fn test_unknown_item_is_404() {
        let (status, json) = get_json("/api/items/XXXX/0000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], explorer::NO_SELECTION_MESSAGE);
    }

    #[tokio::test]
    async fn test_index_served() {
        let response = app(state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
