use crate::assets;
use crate::config::AppConfig;
use crate::polling::PollingController;
use crate::render::{ChartBackend, ChartJsBackend, ScoreRenderer};
use crate::scores::compute_scores;
use crate::source::{EvaluationRequest, EvaluationSource, SourceError, source_from_config};
use crate::templates::{self, EvaluationView, IdentifierForm};
use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn EvaluationSource>,
    pub renderer: Arc<ScoreRenderer>,
    pub polling: Arc<Mutex<PollingController>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        source: Arc<dyn EvaluationSource>,
        renderer: ScoreRenderer,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            renderer: Arc::new(renderer),
            polling: Arc::new(Mutex::new(PollingController::new())),
        }
    }

    /// Pick the evaluation source and chart backend the config asks for.
    pub fn from_config(config: AppConfig) -> Result<Self, SourceError> {
        let source = source_from_config(&config)?;
        let chart: Option<Arc<dyn ChartBackend>> = match &config.chart_js_url {
            Some(_) => Some(Arc::new(ChartJsBackend)),
            None => {
                info!("no chart library configured; aggregate chart disabled");
                None
            }
        };
        Ok(Self::new(config, source, ScoreRenderer::new(chart)))
    }
}

pub fn router(state: AppState) -> Router {
    let img_dir = Path::new(assets::STATIC_ROOT).join("img");
    let mut router = Router::new()
        .route("/", get(index).post(submit_identifier))
        .route("/evaluator", get(evaluator_query).post(evaluator_form))
        .route("/error", get(error))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route("/static/js/polling.js", get(assets::serve_polling_js))
        .route("/static/js/selector.js", get(assets::serve_selector_js))
        .route("/static/css/theme.css", get(assets::serve_theme_css))
        .nest_service("/static/img", ServeDir::new(img_dir));
    if state.config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let polling = state.polling.clone();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(polling))
        .await?;
    Ok(())
}

async fn shutdown_signal(polling: Arc<Mutex<PollingController>>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutting down");
    polling.lock().await.stop_updates();
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(templates::index_page(
        &state.config,
        &IdentifierForm::default(),
        None,
    ))
}

async fn submit_identifier(
    State(state): State<AppState>,
    Form(form): Form<IdentifierForm>,
) -> Response {
    match form.validate() {
        Ok((item_id, plugin)) => Redirect::to(&evaluator_url(&item_id, &plugin)).into_response(),
        Err(msg) => Html(templates::index_page(&state.config, &form, Some(msg))).into_response(),
    }
}

fn evaluator_url(item_id: &str, plugin: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("item_id", item_id)
        .append_pair("plugin", plugin)
        .finish();
    format!("/evaluator?{query}")
}

#[derive(Debug, Default, Deserialize)]
pub struct EvaluatorParams {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub oai_base: String,
}

impl EvaluatorParams {
    fn request(&self) -> EvaluationRequest {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        EvaluationRequest {
            plugin: non_empty(&self.plugin),
            repo: non_empty(&self.repo),
            oai_base: non_empty(&self.oai_base),
            ..EvaluationRequest::new(self.item_id.trim())
        }
    }
}

async fn evaluator_query(
    State(state): State<AppState>,
    Query(params): Query<EvaluatorParams>,
) -> Response {
    evaluate(state, params).await
}

async fn evaluator_form(
    State(state): State<AppState>,
    Form(params): Form<EvaluatorParams>,
) -> Response {
    evaluate(state, params).await
}

async fn evaluate(state: AppState, params: EvaluatorParams) -> Response {
    let req = params.request();
    if req.id.is_empty() {
        return Redirect::to("/").into_response();
    }

    let data = match state.source.fetch(&req).await {
        Ok(data) => data,
        Err(SourceError::NoData) => {
            return error_response(&state, StatusCode::NOT_FOUND, "No evaluation data returned.");
        }
        Err(err) => {
            warn!(id = %req.id, ?err, "evaluation fetch failed");
            return error_response(
                &state,
                StatusCode::BAD_GATEWAY,
                &format!("Error loading evaluation data: {err}"),
            );
        }
    };

    let scores = compute_scores(&data);
    info!(id = %req.id, fair = scores.fair_points, "evaluation scored");
    let view = EvaluationView {
        resource_id: req.id.clone(),
        plugin_name: req.plugin.clone().unwrap_or_else(|| "default".to_string()),
        evaluated_at: chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string(),
        scores,
    };
    let page = templates::evaluation_page(&state.config, &view);
    let (html, report) = state.renderer.render_html(&page);
    tracing::debug!(
        progress_nodes = report.progress.len(),
        chart = report.chart.is_some(),
        chart_backend = state.renderer.has_chart_backend(),
        "evaluation page rendered"
    );
    Html(html).into_response()
}

async fn error(State(state): State<AppState>) -> Response {
    error_response(&state, StatusCode::OK, "An unexpected error occurred.")
}

fn error_response(state: &AppState, status: StatusCode, message: &str) -> Response {
    (status, Html(templates::error_page(&state.config, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    enum FixedSource {
        Data(Value),
        NoData,
        Upstream,
    }

    #[async_trait]
    impl EvaluationSource for FixedSource {
        async fn fetch(&self, _req: &EvaluationRequest) -> Result<Value, SourceError> {
            match self {
                FixedSource::Data(v) => Ok(v.clone()),
                FixedSource::NoData => Err(SourceError::NoData),
                FixedSource::Upstream => {
                    Err(SourceError::Status(StatusCode::INTERNAL_SERVER_ERROR))
                }
            }
        }
    }

    fn app(source: FixedSource, renderer: ScoreRenderer) -> Router {
        router(AppState::new(
            AppConfig::default(),
            Arc::new(source),
            renderer,
        ))
    }

    fn sample_app() -> Router {
        app(
            FixedSource::Data(json!({
                "findable": {"f1": {"points": 150, "score": {"weight": 1}}},
                "accessible": {"a1": {"points": 40, "score": {"weight": 1}}}
            })),
            ScoreRenderer::new(Some(Arc::new(ChartJsBackend))),
        )
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_renders_form() {
        let resp = sample_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("name=\"item_id\""));
    }

    #[tokio::test]
    async fn valid_submission_redirects_to_evaluator() {
        let resp = sample_app()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("item_id=10.1234%2Fabc+&plugin=oai_pmh"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/evaluator?item_id=10.1234%2Fabc&plugin=oai_pmh"
        );
    }

    #[tokio::test]
    async fn invalid_submission_shows_error() {
        let resp = sample_app()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("item_id=&plugin=oai_pmh"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("form-error"));
    }

    #[tokio::test]
    async fn evaluator_without_id_redirects_home() {
        let resp = sample_app()
            .oneshot(Request::get("/evaluator").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn evaluator_renders_painted_page() {
        let resp = sample_app()
            .oneshot(
                Request::get("/evaluator?item_id=10.1234%2Fabc&plugin=signposting")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        // indicator with 150 points is clamped
        assert!(html.contains("width: 100%; background-color: #2ECC71"));
        assert!(html.contains("width: 40%; background-color: #E74C3C"));
        assert!(html.contains("new Chart(el, "));
        assert!(html.contains("\"labels\":[\"findable\",\"accessible\",\"interoperable\",\"reusable\"]"));
        assert!(html.contains("Plugin: <code>signposting</code>"));
    }

    #[tokio::test]
    async fn evaluator_form_post_is_accepted() {
        let resp = sample_app()
            .oneshot(
                Request::post("/evaluator")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("item_id=abc"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("<code>default</code>"));
    }

    #[tokio::test]
    async fn source_failure_renders_error_page() {
        let router = app(
            FixedSource::Upstream,
            ScoreRenderer::without_chart(),
        );
        let resp = router
            .oneshot(
                Request::get("/evaluator?item_id=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(body_string(resp).await.contains("Error loading evaluation data"));
    }

    #[tokio::test]
    async fn empty_evaluation_renders_no_data() {
        let router = app(
            FixedSource::NoData,
            ScoreRenderer::without_chart(),
        );
        let resp = router
            .oneshot(
                Request::get("/evaluator?item_id=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_string(resp).await.contains("No evaluation data returned."));
    }

    #[tokio::test]
    async fn serves_polling_stub() {
        let resp = sample_app()
            .oneshot(
                Request::get("/static/js/polling.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
        let script = body_string(resp).await;
        assert!(script.contains("function updateValues() {}"));
        assert!(script.contains("clearInterval(global.updateInterval)"));
    }

    #[test]
    fn dev_mode_state_uses_sample_file() {
        let config = AppConfig {
            dev_mode: true,
            chart_js_url: None,
            ..AppConfig::default()
        };
        let state = AppState::from_config(config).unwrap();
        assert!(!state.renderer.has_chart_backend());
    }

    #[tokio::test]
    async fn default_logo_is_served() {
        let logo = format!("/static/img/{}", crate::config::DEFAULT_LOGO_IMAGE);
        let resp = sample_app()
            .oneshot(Request::get(logo.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let index = body_string(
            sample_app()
                .oneshot(Request::get("/").body(Body::empty()).unwrap())
                .await
                .unwrap(),
        )
        .await;
        assert!(index.contains(&format!("src=\"{logo}\"")));
    }
}
