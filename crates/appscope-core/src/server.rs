//! HTTP server wiring

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::FutureExt;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use crate::codes;
use crate::config::HEALTH_ROUTE;
use crate::envelope::ResponseEnvelope;
use crate::error::{AppscopeError, Result};
use crate::handler::handle_parse;
use crate::reporter::PanicReport;
use crate::state::AppState;

/// Router with every configured parse route, the health route and the
/// panic boundary
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route(HEALTH_ROUTE, get(handle_health));
    for route in &state.server.routes {
        router = router.route(route.as_str(), get(handle_parse));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), catch_panic))
        .with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn serve(state: AppState) -> Result<()> {
    let bind_addr: SocketAddr = state.server.bind.parse().map_err(|e| {
        AppscopeError::Other(format!(
            "invalid bind address '{}': {}",
            state.server.bind, e
        ))
    })?;

    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;

    info!(
        addr = %local_addr,
        routes = ?state.server.routes,
        version = %state.server.service_version,
        "appscope listening"
    );

    axum::serve(listener, build_router(Arc::new(state))).await?;
    Ok(())
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    ResponseEnvelope::ok(json!({
        "status": "ready",
        "version": state.server.service_version,
    }))
    .into_response()
}

/// Turn a panic anywhere below into a 500 envelope and a report
async fn catch_panic(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            state
                .reporter
                .report(&PanicReport::new(method, path, payload.as_ref()));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResponseEnvelope::empty(
                    codes::INTERNAL_ERROR,
                    "internal server error",
                )),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reporter::MemoryReporter;
    use appscope_inspect::fixtures::{self, IpaFixture};
    use appscope_inspect::{PackageInspector, PackageMetadata};
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn config_in(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.download.temp_dir = Some(temp.path().to_path_buf());
        config.download.timeout_secs = 10;
        config
    }

    fn router_with(config: &Config) -> Router {
        build_router(Arc::new(AppState::from_config(config).expect("build state")))
    }

    fn encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let request = HttpRequest::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let parsed = serde_json::from_slice(&body).expect("parse response body as json");
        (status, parsed)
    }

    fn serve_bytes(server: &MockServer, path: &str, body: Vec<u8>) {
        let path = path.to_string();
        server.mock(move |when, then| {
            when.method(GET).path(path.as_str());
            then.status(200).body(body.clone());
        });
    }

    fn dir_is_empty(temp: &TempDir) -> bool {
        std::fs::read_dir(temp.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_missing_url_returns_900() {
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let (status, body) = get_json(router, "/parser").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 900);
        assert_eq!(body["message"], "download address must be present");
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_903() {
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let uri = format!("/parser?download_url={}", encode("http://127.0.0.1:1/app.ipa"));
        let (status, body) = get_json(router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 903);
        assert_eq!(body["result"], json!({}));
        assert!(dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_unrecognized_file_returns_901_unknown_platform() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/notes.txt", b"just some text".to_vec());
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let uri = format!("/parser?download_url={}", encode(&upstream.url("/notes.txt")));
        let (_, body) = get_json(router, &uri).await;
        assert_eq!(body["code"], 901);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("unknown platform"));
        assert_eq!(body["result"], json!({}));
        assert!(dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_ipa_returns_metadata_and_cleans_up() {
        let upstream = MockServer::start_async().await;
        let ipa = IpaFixture {
            devices: vec!["00008030-0001".to_string()],
            ..IpaFixture::default()
        }
        .build()
        .unwrap();
        let ipa_len = ipa.len() as u64;
        serve_bytes(&upstream, "/builds/demo.ipa", ipa);
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let uri = format!(
            "/parser?download_url={}",
            encode(&upstream.url("/builds/demo.ipa"))
        );
        let (status, body) = get_json(router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "OK");

        let result = &body["result"];
        assert_eq!(result["name"], "Demo");
        assert_eq!(result["package_name"], "com.example.demo");
        assert_eq!(result["version"], "1.2.3");
        assert_eq!(result["build_id"], "42");
        assert_eq!(result["size"], ipa_len);
        assert_eq!(result["platform"], 2);
        assert_eq!(result["ios"]["type"], 2);
        assert_eq!(result["ios"]["allow_device"], json!(["00008030-0001"]));
        assert_eq!(result["ios"]["team_name"], "Example Corp");
        assert_eq!(result["system"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(result["system"]["download_time"].is_u64());
        assert!(result["system"]["parser_time"].is_u64());

        let icon = STANDARD
            .decode(result["icon"].as_str().unwrap())
            .expect("icon is base64");
        assert!(icon.starts_with(PNG_MAGIC));
        assert!(image::load_from_memory(&icon).is_ok());

        assert!(dir_is_empty(&temp));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apk_returns_android_metadata() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/builds/app.apk", fixtures::apk_stub().unwrap());
        let tools = TempDir::new().unwrap();
        let aapt = fixtures::aapt_stub(tools.path(), fixtures::APK_STUB_BADGING).unwrap();
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.inspector.aapt_path = aapt;
        let router = router_with(&config);

        let uri = format!(
            "/parser?download_url={}",
            encode(&upstream.url("/builds/app.apk"))
        );
        let (status, body) = get_json(router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);

        let result = &body["result"];
        assert_eq!(result["platform"], 1);
        assert_eq!(result["name"], "Example App");
        assert_eq!(result["package_name"], "com.example.app");
        assert_eq!(result["version"], "1.0");
        assert_eq!(result["build_id"], "7");
        assert_eq!(
            result["ios"],
            json!({"type": 0, "allow_device": [], "team_name": ""})
        );

        let icon = STANDARD
            .decode(result["icon"].as_str().unwrap())
            .expect("icon is base64");
        assert!(icon.starts_with(PNG_MAGIC));
        assert_eq!(image::load_from_memory(&icon).unwrap().width(), 144);

        assert!(dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_ipa_without_profile_has_empty_device_list() {
        let upstream = MockServer::start_async().await;
        let ipa = IpaFixture {
            team_name: None,
            ..IpaFixture::default()
        }
        .build()
        .unwrap();
        serve_bytes(&upstream, "/store.ipa", ipa);
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let uri = format!("/parser?download_url={}", encode(&upstream.url("/store.ipa")));
        let (_, body) = get_json(router, &uri).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["result"]["ios"]["allow_device"], json!([]));
        assert_eq!(body["result"]["ios"]["team_name"], "");
    }

    #[tokio::test]
    async fn test_handler_alias_and_url_param() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/demo.ipa", IpaFixture::default().build().unwrap());
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let uri = format!("/handler?url={}", encode(&upstream.url("/demo.ipa")));
        let (_, body) = get_json(router, &uri).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["result"]["package_name"], "com.example.demo");
    }

    #[tokio::test]
    async fn test_url_param_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.server.accepted_query_params = vec!["download_url".to_string()];
        config.server.routes = vec!["/parser".to_string()];
        let router = router_with(&config);

        let (_, body) = get_json(
            router.clone(),
            "/parser?url=http%3A%2F%2F127.0.0.1%3A1%2Fa.ipa",
        )
        .await;
        assert_eq!(body["code"], 900);

        let request = HttpRequest::builder()
            .uri("/handler?download_url=x")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_telemetry_disabled_omits_system_block() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/demo.ipa", IpaFixture::default().build().unwrap());
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.server.telemetry_enabled = false;
        let router = router_with(&config);

        let uri = format!("/parser?download_url={}", encode(&upstream.url("/demo.ipa")));
        let (_, body) = get_json(router, &uri).await;
        assert_eq!(body["code"], 200);
        assert!(body["result"].get("system").is_none());
    }

    #[tokio::test]
    async fn test_repeated_requests_yield_identical_content() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/demo.ipa", IpaFixture::default().build().unwrap());
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));
        let uri = format!("/parser?download_url={}", encode(&upstream.url("/demo.ipa")));

        let (_, first) = get_json(router.clone(), &uri).await;
        let (_, second) = get_json(router, &uri).await;

        let strip = |mut body: Value| {
            body["result"]
                .as_object_mut()
                .expect("result object")
                .remove("system");
            body
        };
        assert_eq!(strip(first), strip(second));
        assert!(dir_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let upstream = MockServer::start_async().await;
        let ids: Vec<String> = (0..6).map(|i| format!("com.example.app{i}")).collect();
        for (i, id) in ids.iter().enumerate() {
            let ipa = IpaFixture {
                bundle_id: id.clone(),
                build: i.to_string(),
                ..IpaFixture::default()
            }
            .build()
            .unwrap();
            serve_bytes(&upstream, &format!("/app{i}.ipa"), ipa);
        }
        let temp = TempDir::new().unwrap();
        let router = router_with(&config_in(&temp));

        let requests = (0..ids.len()).map(|i| {
            let router = router.clone();
            let uri = format!(
                "/parser?download_url={}",
                encode(&upstream.url(format!("/app{i}.ipa")))
            );
            async move { get_json(router, &uri).await }
        });
        let responses = futures_util::future::join_all(requests).await;

        for (i, (_, body)) in responses.iter().enumerate() {
            assert_eq!(body["code"], 200);
            assert_eq!(body["result"]["package_name"], ids[i].as_str());
            assert_eq!(body["result"]["build_id"], i.to_string());
        }
        assert!(dir_is_empty(&temp));
    }

    struct PanickingInspector;

    impl PackageInspector for PanickingInspector {
        fn inspect(&self, _path: &Path) -> appscope_inspect::Result<PackageMetadata> {
            panic!("inspector exploded");
        }
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_reported() {
        let upstream = MockServer::start_async().await;
        serve_bytes(&upstream, "/demo.ipa", fixtures::apk_stub().unwrap());
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let state = AppState::from_config(&config_in(&temp))
            .unwrap()
            .with_inspector(Arc::new(PanickingInspector))
            .with_reporter(reporter.clone());
        let router = build_router(Arc::new(state));

        let uri = format!("/parser?download_url={}", encode(&upstream.url("/demo.ipa")));
        let (status, body) = get_json(router.clone(), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
        assert_eq!(body["result"], json!({}));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].path, "/parser");
        assert_eq!(reports[0].message, "inspector exploded");
        assert!(dir_is_empty(&temp));

        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["status"], "ready");
    }
}
