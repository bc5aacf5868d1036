//! HTTP request handlers.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::ApiState;
use crate::error::ApiError;
use crate::tts::AudioStream;

/// Build all API routes.
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        .route("/plugin", post(dispatch_plugin))
        .route("/search", get(search))
        .route("/tts", get(tts).post(tts))
        .route("/health", get(health_check))
}

/// Dispatch request body. A missing `input` defaults to the empty string.
#[derive(Deserialize)]
struct PluginRequest {
    plugin: String,
    #[serde(default)]
    input: String,
}

/// Query string shared by the search and synthesis endpoints.
#[derive(Deserialize)]
struct QueryParams {
    #[serde(default)]
    q: String,
}

/// `POST /api/plugin` — resolve the named handler and run it.
///
/// Unknown names are rejected before any handler is invoked; everything a
/// resolved handler returns is a success payload, including its encoded
/// error strings.
async fn dispatch_plugin(
    State(state): State<ApiState>,
    Json(request): Json<PluginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(plugin) = state.plugins.resolve(&request.plugin) else {
        return Err(ApiError::UnknownPlugin);
    };

    debug!(plugin = %request.plugin, input_len = request.input.len(), "dispatching");
    let result = plugin.execute(&request.input).await;
    Ok(Json(json!({ "result": result })))
}

/// `GET /api/search?q=` — delegate to the search collaborator.
async fn search(
    State(state): State<ApiState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::EmptyQuery);
    }

    let results = state
        .search
        .search(&params.q)
        .await
        .map_err(ApiError::SearchFailed)?;
    Ok(Json(json!({ "results": results })))
}

/// `GET|POST /api/tts?q=` — stream synthesized speech.
///
/// The producer is opened before the response starts, so handshake
/// failures surface as a structured 502. After that the body streams
/// chunks in production order; a mid-stream producer failure aborts the
/// body (bytes already flushed cannot be retracted).
async fn tts(
    State(state): State<ApiState>,
    Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::EmptyQuery);
    }

    let events = state
        .synthesizer
        .open(&params.q, &state.voice)
        .await
        .map_err(ApiError::SynthesisFailed)?;
    let audio = AudioStream::spawn(events);

    Ok((
        [(header::CONTENT_TYPE, "audio/mpeg")],
        Body::from_stream(audio),
    )
        .into_response())
}

/// Server start time, set once at process start.
static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Returns basic health status, version, and uptime.
async fn health_check() -> Json<serde_json::Value> {
    let start = START_TIME.get_or_init(std::time::Instant::now);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": start.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::plugins::builtin::{FileAccessPlugin, SamplePlugin};
    use crate::plugins::PluginRegistry;
    use crate::search::{SearchProvider, SearchResult};
    use crate::tts::{EventStream, Synthesizer, TtsError, TtsEvent};

    /// Search stub that counts invocations and returns canned results.
    #[derive(Debug)]
    struct StubSearch {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("stub provider down");
            }
            Ok(vec![SearchResult {
                title: format!("About {query}"),
                url: "https://example.com".to_string(),
                snippet: "snippet".to_string(),
            }])
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    /// Synthesizer stub yielding a fixed chunk sequence.
    struct StubSynthesizer {
        calls: Arc<AtomicUsize>,
        fail_open: bool,
    }

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn open(&self, _text: &str, _voice: &str) -> Result<EventStream, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(TtsError::Connect("stub refused".to_string()));
            }
            Ok(Box::pin(futures::stream::iter(vec![
                Ok(TtsEvent::Metadata("turn.start".to_string())),
                Ok(TtsEvent::Audio(b"b1".to_vec())),
                Ok(TtsEvent::Audio(b"b2".to_vec())),
                Ok(TtsEvent::Audio(b"b3".to_vec())),
            ])))
        }
    }

    struct TestHarness {
        router: Router,
        search_calls: Arc<AtomicUsize>,
        synth_calls: Arc<AtomicUsize>,
        _sandbox: tempfile::TempDir,
    }

    fn harness(search_fails: bool, synth_fails: bool) -> TestHarness {
        let sandbox = tempfile::tempdir().unwrap();
        std::fs::write(sandbox.path().join("hello.txt"), "sandboxed contents").unwrap();

        let mut plugins = PluginRegistry::new();
        plugins.register(Arc::new(SamplePlugin::new()));
        plugins.register(Arc::new(FileAccessPlugin::new(sandbox.path()).unwrap()));

        let search_calls = Arc::new(AtomicUsize::new(0));
        let synth_calls = Arc::new(AtomicUsize::new(0));

        let state = ApiState {
            plugins: Arc::new(plugins),
            search: Arc::new(StubSearch {
                calls: search_calls.clone(),
                fail: search_fails,
            }),
            synthesizer: Arc::new(StubSynthesizer {
                calls: synth_calls.clone(),
                fail_open: synth_fails,
            }),
            voice: "en-GB-LibbyNeural".to_string(),
        };

        TestHarness {
            router: crate::api::build_router(state),
            search_calls,
            synth_calls,
            _sandbox: sandbox,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_sample_plugin() {
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(post_json(
                "/api/plugin",
                json!({ "plugin": "sample", "input": "x" }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "result": "Sample plugin received: x" })
        );
    }

    #[tokio::test]
    async fn test_dispatch_missing_input_defaults_to_empty() {
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(post_json("/api/plugin", json!({ "plugin": "sample" })))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "result": "Sample plugin received: " })
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_plugin_is_rejected() {
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(post_json(
                "/api/plugin",
                json!({ "plugin": "ghost", "input": "x" }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Invalid Request" }));
    }

    #[tokio::test]
    async fn test_dispatch_file_read_through_sandbox() {
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(post_json(
                "/api/plugin",
                json!({ "plugin": "file_access", "input": "read:hello.txt" }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "result": "sandboxed contents" })
        );
    }

    #[tokio::test]
    async fn test_dispatch_sandbox_denial_is_a_success_payload() {
        // Containment-over-rejection: probing the sandbox returns 200 with
        // a denial string, indistinguishable from other handler output.
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(post_json(
                "/api/plugin",
                json!({ "plugin": "file_access", "input": "read:../../etc/passwd" }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            json!({ "result": "Access denied: Outside sandbox." })
        );
    }

    #[tokio::test]
    async fn test_search_returns_results() {
        let h = harness(false, false);
        let res = h.router.oneshot(get("/api/search?q=rust")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["results"][0]["title"], "About rust");
        assert_eq!(h.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_empty_query_skips_provider() {
        let h = harness(false, false);

        let res = h.router.clone().oneshot(get("/api/search")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "No query provided" }));

        let res = h.router.oneshot(get("/api/search?q=")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert_eq!(h.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_provider_failure_is_bad_gateway() {
        let h = harness(true, false);
        let res = h.router.oneshot(get("/api/search?q=rust")).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(res).await,
            json!({ "error": "Search provider error" })
        );
    }

    #[tokio::test]
    async fn test_tts_streams_chunks_in_order() {
        let h = harness(false, false);
        let res = h.router.oneshot(get("/api/tts?q=hello")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get("content-type").unwrap(),
            "audio/mpeg"
        );
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"b1b2b3");
    }

    #[tokio::test]
    async fn test_tts_accepts_post() {
        let h = harness(false, false);
        let res = h
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tts?q=hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_tts_empty_query_skips_synthesizer() {
        let h = harness(false, false);
        let res = h.router.oneshot(get("/api/tts?q=")).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "No query provided" }));
        assert_eq!(h.synth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tts_open_failure_is_bad_gateway() {
        let h = harness(false, true);
        let res = h.router.oneshot(get("/api/tts?q=hello")).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(res).await,
            json!({ "error": "Synthesis provider error" })
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let h = harness(false, false);
        let res = h.router.oneshot(get("/api/health")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
