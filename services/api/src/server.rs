use crate::cli::ServeArgs;
use crate::infra::{build_recorder, load_definition, AppState};
use crate::routes::with_session_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use triage::config::AppConfig;
use triage::error::AppError;
use triage::gate::AccessGate;
use triage::telemetry;
use triage::workflow::TriageService;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let definition = load_definition(&config)?;
    let recorder = build_recorder(&config);
    let sinks = recorder.sink_names();
    let service = Arc::new(TriageService::new(
        definition,
        AccessGate::new(config.access.code.clone()),
        recorder,
    )
    .with_idle_timeout(config.sessions.idle_timeout));

    let app = with_session_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, ?sinks, "triage questionnaire service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
