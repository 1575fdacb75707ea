use crate::cli::ServeArgs;
use crate::infra::{apply_backend_overrides, build_session, AppState};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::pipeline::LoadOutcome;
use hireflow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    apply_backend_overrides(&mut config, &args.backend)?;

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let session = build_session(&config)?;
    match session.refresh(None).await {
        LoadOutcome::Loaded {
            jobs, candidates, ..
        } => info!(jobs, candidates, "initial screening results loaded"),
        LoadOutcome::Unauthorized => {
            warn!("backend rejected credentials; results stay empty until a refresh succeeds")
        }
        other => warn!(?other, "initial screening results load did not complete"),
    }

    let app = with_pipeline_routes(session)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = %config.backend.base_url,
        "candidate pipeline service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
