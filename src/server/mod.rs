//! HTTP server for the dashboard.
//!
//! Two surfaces only: `GET /` renders the page with freshly aggregated
//! data, and the assets directory is served verbatim under a URL prefix.
//! Every request recomputes the data; nothing is cached between requests.

use crate::analysis::{produce_with, Dashboard};
use crate::config::Config;
use crate::report;
use crate::tables::LoadConfig;
use anyhow::{bail, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Where tables are read from on each request.
    pub load: LoadConfig,
    /// Directory served under `url_prefix`.
    pub assets_dir: PathBuf,
    /// URL prefix for static assets, e.g. `/static`.
    pub url_prefix: String,
    /// Page template contents.
    pub template: String,
}

impl ServerConfig {
    /// Build the server configuration from the merged application config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let url_prefix = normalize_prefix(&config.assets.url_prefix)?;

        Ok(Self {
            host: config.server.host.clone(),
            port: config.server.port,
            load: LoadConfig::from(&config.data),
            assets_dir: config.assets.dir.clone(),
            template: report::apply_static_prefix(
                &report::load_template(config.assets.template.as_deref()),
                &url_prefix,
            ),
            url_prefix,
        })
    }

    /// `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Validate a static URL prefix and strip any trailing slash.
fn normalize_prefix(prefix: &str) -> Result<String> {
    let trimmed = prefix.trim_end_matches('/');
    if !prefix.starts_with('/') {
        bail!("Static URL prefix must start with '/': {}", prefix);
    }
    if trimmed.is_empty() {
        bail!("Static URL prefix cannot be the site root");
    }
    Ok(trimmed.to_string())
}

/// Build the application router.
pub fn router(config: Arc<ServerConfig>) -> Router {
    if !config.assets_dir.is_dir() {
        debug!(
            "Assets directory {} does not exist; static requests will 404",
            config.assets_dir.display()
        );
    }

    Router::new()
        .route("/", get(index))
        .nest_service(&config.url_prefix, ServeDir::new(&config.assets_dir))
        .with_state(config)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(
        "Serving dashboard on http://{} (assets: {} -> {})",
        listener.local_addr().context("Failed to read local address")?,
        config.url_prefix,
        config.assets_dir.display()
    );

    axum::serve(listener, router(Arc::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// `GET /`: aggregate the tables and render the page.
async fn index(State(config): State<Arc<ServerConfig>>) -> Response {
    let load = config.load.clone();
    let dashboard = match tokio::task::spawn_blocking(move || produce_with(&load)).await {
        Ok(dashboard) => dashboard,
        Err(e) => {
            error!("Aggregation task failed: {}", e);
            Dashboard::new()
        }
    };

    match report::generate_page(&config.template, &dashboard) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_config(root: &std::path::Path) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            load: LoadConfig {
                base_dir: root.to_path_buf(),
                ..LoadConfig::default()
            },
            assets_dir: root.join("assets"),
            url_prefix: "/static".to_string(),
            template: "<script>window.analyticsData = {{ analytics_data }};</script>".to_string(),
        }
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/static").unwrap(), "/static");
        assert_eq!(normalize_prefix("/static/").unwrap(), "/static");
        assert!(normalize_prefix("static").is_err());
        assert!(normalize_prefix("/").is_err());
    }

    #[test]
    fn test_from_config() {
        let config = ServerConfig::from_config(&Config::default()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.url_prefix, "/static");
        assert!(config.template.contains(report::DATA_PLACEHOLDER));
    }

    #[test]
    fn test_custom_prefix_reaches_page() {
        let mut config = Config::default();
        config.assets.url_prefix = "/assets/".to_string();

        let server_config = ServerConfig::from_config(&config).unwrap();
        assert_eq!(server_config.url_prefix, "/assets");
        assert!(server_config
            .template
            .contains(r#"src="/assets/js/breathemap_app.js""#));
        assert!(!server_config.template.contains("/static/"));
    }

    #[tokio::test]
    async fn test_index_renders_without_tables() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(Arc::new(test_config(temp_dir.path())));

        let (status, body) = fetch(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("window.analyticsData = {};"));
    }

    #[tokio::test]
    async fn test_index_embeds_fresh_data() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(Arc::new(test_config(temp_dir.path())));

        let (_, body) = fetch(app.clone(), "/").await;
        assert!(!body.contains("\"ratio\""));

        std::fs::write(
            temp_dir.path().join("table_pm_ratio.csv"),
            "country,mean_ratio\nSpain,0.5\n",
        )
        .unwrap();

        let (status, body) = fetch(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""ratio":{"countries":["Spain"],"values":[0.5]}"#));
    }

    #[tokio::test]
    async fn test_static_assets_served_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let js_dir = temp_dir.path().join("assets").join("js");
        std::fs::create_dir_all(&js_dir).unwrap();
        std::fs::write(js_dir.join("app.js"), "console.log('hi');").unwrap();

        let app = router(Arc::new(test_config(temp_dir.path())));

        let (status, body) = fetch(app.clone(), "/static/js/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log('hi');");

        let (status, _) = fetch(app, "/static/js/missing.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_no_other_routes() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(Arc::new(test_config(temp_dir.path())));

        let (status, _) = fetch(app.clone(), "/get_values").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
