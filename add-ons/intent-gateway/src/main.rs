//! Axum-based API gateway for the intent resolver. Config-driven via ResolverConfig.

mod handlers;

use axum::http::{header, HeaderValue, Method};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use intent_core::{CsvFallbackLogger, DatasetRegistry, FallbackSink, ResolverConfig};
use std::path::Path as StdPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<ResolverConfig>,
    pub(crate) datasets: Arc<DatasetRegistry>,
}

/// Loads config, every knowledge base and embedding cache. Shared by startup and `--verify`.
async fn build_state(config: ResolverConfig) -> Result<AppState, String> {
    let embedder = intent_providers::embedder_from_config(&config)
        .map_err(|e| format!("Embedder setup failed: {}", e))?;
    let sink: Arc<dyn FallbackSink> = Arc::new(CsvFallbackLogger::new(&config.unanswered_log_path));
    let datasets = DatasetRegistry::from_config(&config, embedder, sink)
        .await
        .map_err(|e| format!("Knowledge base load failed: {}", e))?;
    Ok(AppState {
        config: Arc::new(config),
        datasets: Arc::new(datasets),
    })
}

/// Pre-flight check: config, knowledge bases, log sink directory, and port availability.
async fn run_verify() -> Result<(), String> {
    let config = ResolverConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking knowledge bases... ");
    let state = build_state(config.clone()).await?;
    println!("OK ({} datasets)", state.datasets.iter().count());

    let log_path = StdPath::new(&config.unanswered_log_path);
    print!("Checking unanswered log at {}... ", log_path.display());
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| StdPath::new("."));
    if !log_dir.is_dir() {
        return Err(format!("Log directory {} does not exist", log_dir.display()));
    }
    println!("OK");

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = format!("{}:{}", config.host, port);
    match std::net::TcpListener::bind(&addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", port, e));
        }
    }

    println!("\nSUCCESS: all checks passed. Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[intent-gateway] .env not loaded: {} (using system environment)", e);
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify().await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = serve().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), String> {
    let config = ResolverConfig::load().map_err(|e| format!("Config load failed: {}", e))?;
    let state = build_state(config).await?;

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app_name = state.config.app_name.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("{} listening on {}", app_name, addr);
    axum::serve(listener, build_app(state))
        .await
        .map_err(|e| format!("Server error: {}", e))
}

fn cors_layer(config: &ResolverConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = origin.as_str(), "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
}

fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/", get(root))
        .route("/api/v1/health", get(health))
        .route("/v1/status", get(status))
        .route("/api/v1/intent", post(handlers::intent::find_intent))
        .route("/encontrar-intencion", post(handlers::intent::find_intent))
        .with_state(state)
        .layer(cors)
}

/// GET / – liveness message with the app identity.
async fn root(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "OK",
        "message": format!("{} is running.", state.config.app_name),
    }))
}

/// GET /api/v1/health – liveness check for scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/status – identity, threshold, and loaded datasets.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let datasets: Vec<serde_json::Value> = state
        .datasets
        .iter()
        .map(|(name, classifier)| {
            let kb = classifier.context().knowledge();
            serde_json::json!({
                "name": name,
                "intents": kb.len(),
                "examples": kb.example_count(),
            })
        })
        .collect();
    axum::Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "confidence_threshold": state.config.confidence_threshold,
        "default_dataset": state.datasets.default_dataset(),
        "datasets": datasets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use intent_core::{MemoryFallbackLog, FALLBACK_INTENT};
    use intent_providers::HashingEmbedder;
    use std::io::Write;
    use tower::ServiceExt;

    const KB_JSON: &str = r#"{
        "greeting": {"golden_keywords": ["hola"], "examples": ["buenos días"]},
        "pricing": {"golden_keywords": ["precio"], "examples": ["cuánto cuesta una página web"]},
        "contact": ["cómo puedo contactarlos por correo"]
    }"#;

    struct TestApp {
        app: Router,
        log: Arc<MemoryFallbackLog>,
        _dir: tempfile::TempDir,
    }

    async fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let kb_path = dir.path().join("knowledge_base.json");
        std::fs::File::create(&kb_path)
            .unwrap()
            .write_all(KB_JSON.as_bytes())
            .unwrap();
        let config = ResolverConfig {
            app_name: "Test Resolver".to_string(),
            datasets: [("default".to_string(), kb_path.display().to_string())]
                .into_iter()
                .collect(),
            ..ResolverConfig::default()
        };
        let log = Arc::new(MemoryFallbackLog::new());
        let datasets = DatasetRegistry::from_config(
            &config,
            Arc::new(HashingEmbedder::default()),
            Arc::clone(&log) as Arc<dyn FallbackSink>,
        )
        .await
        .unwrap();
        let app = build_app(AppState {
            config: Arc::new(config),
            datasets: Arc::new(datasets),
        });
        TestApp {
            app,
            log,
            _dir: dir,
        }
    }

    async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_keyword_request_resolves_greeting() {
        let t = test_app().await;
        let (status, json) = post_json(
            &t.app,
            "/api/v1/intent",
            r#"{"user_message": "Hola, buenos días"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "greeting");
        assert_eq!(json["confidence"], 1.0);
        assert_eq!(json["method"], "keyword");
        assert_eq!(json["user_message"], "Hola, buenos días");
    }

    #[tokio::test]
    async fn test_semantic_request_on_alias_route() {
        let t = test_app().await;
        let (status, json) = post_json(
            &t.app,
            "/encontrar-intencion",
            r#"{"user_message": "Cómo puedo contactarlos por correo", "dataset": "vswebdesign"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "contact");
        assert_eq!(json["method"], "semantic");
        assert!(json["confidence"].as_f64().unwrap() >= 0.65);
        assert!(t.log.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_message_falls_back_and_is_logged() {
        let t = test_app().await;
        let (status, json) = post_json(
            &t.app,
            "/api/v1/intent",
            r#"{"user_message": "xylofón zumbido quásar"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], FALLBACK_INTENT);
        assert_eq!(json["method"], "semantic");

        let records = t.log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_message, "xylofón zumbido quásar");
        assert_eq!(records[0].dataset, "default");
        assert_ne!(records[0].suggested_intent, FALLBACK_INTENT);
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let t = test_app().await;
        let (status, json) =
            post_json(&t.app, "/api/v1/intent", r#"{"user_message": "   "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "message must not be empty");
        assert!(t.log.is_empty());
    }

    #[tokio::test]
    async fn test_unembeddable_message_is_bad_request() {
        let t = test_app().await;
        let (status, json) = post_json(&t.app, "/api/v1/intent", r#"{"user_message": "¿¿??"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "message not embeddable");
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected() {
        let t = test_app().await;
        let (status, _) = post_json(&t.app, "/api/v1/intent", r#"{}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_status_lists_datasets() {
        let t = test_app().await;
        let req = Request::builder()
            .method("GET")
            .uri("/v1/status")
            .body(Body::empty())
            .unwrap();
        let res = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["app_name"], "Test Resolver");
        assert_eq!(json["default_dataset"], "default");
        assert_eq!(json["datasets"][0]["name"], "default");
        assert_eq!(json["datasets"][0]["intents"], 3);
        assert_eq!(json["datasets"][0]["examples"], 3);
    }

    #[tokio::test]
    async fn test_root_reports_ok() {
        let t = test_app().await;
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "OK");
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let t = test_app().await;
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/intent")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let res = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:5173")
        );
    }
}
