use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use triage::config::AppConfig;
use triage::error::AppError;
use triage::persistence::{HttpRelay, RelayOptions, ResponseRecorder, SqliteResponseStore};
use triage::survey::QuestionnaireDefinition;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn load_definition(config: &AppConfig) -> Result<Arc<QuestionnaireDefinition>, AppError> {
    let definition = QuestionnaireDefinition::from_path(&config.survey.definition_path)?;
    info!(
        path = %config.survey.definition_path.display(),
        version = %definition.version(),
        paths = definition.paths.len(),
        "questionnaire loaded"
    );
    Ok(Arc::new(definition))
}

/// Wires the configured sinks. A sink that cannot be opened is skipped with a warning so
/// the questionnaire stays usable without persistence.
pub(crate) fn build_recorder(config: &AppConfig) -> ResponseRecorder {
    let mut recorder = ResponseRecorder::new();

    if let Some(path) = &config.storage.database_path {
        match SqliteResponseStore::open(path) {
            Ok(store) => {
                info!(path = %path.display(), "local response store opened");
                recorder = recorder.with_sink(Arc::new(store));
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "local response store disabled");
            }
        }
    }

    if let Some(relay) = &config.relay {
        let mut options = RelayOptions::new(relay.url.clone()).with_timeout(relay.timeout);
        if let Some(token) = &relay.token {
            options = options.with_token(token.clone());
        }
        match HttpRelay::new(options) {
            Ok(sink) => {
                info!(url = %sink.url(), "response relay enabled");
                recorder = recorder.with_sink(Arc::new(sink));
            }
            Err(error) => warn!(%error, "response relay disabled"),
        }
    }

    if recorder.is_empty() {
        warn!("no response sinks configured; answers will not be stored");
    }

    recorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::path::PathBuf;
    use std::time::Duration;
    use triage::config::{
        AccessConfig, AppEnvironment, RelayConfig, ServerConfig, SessionConfig, StorageConfig,
        SurveyConfig, TelemetryConfig,
    };

    fn config(database_path: Option<PathBuf>, relay: Option<RelayConfig>) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            survey: SurveyConfig {
                definition_path: PathBuf::from("survey.json"),
            },
            access: AccessConfig {
                code: SecretString::new("abc".to_string()),
            },
            storage: StorageConfig { database_path },
            relay,
            sessions: SessionConfig {
                idle_timeout: Duration::from_secs(1800),
            },
        }
    }

    #[test]
    fn recorder_includes_every_configured_sink() {
        let dir = tempfile::tempdir().expect("temp dir");
        let relay = RelayConfig {
            url: "http://127.0.0.1:9/ingest".to_string(),
            timeout: Duration::from_secs(1),
            token: None,
        };

        let recorder = build_recorder(&config(Some(dir.path().join("r.sqlite3")), Some(relay)));

        assert_eq!(recorder.sink_names(), vec!["sqlite", "relay"]);
    }

    #[test]
    fn unopenable_store_is_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing_parent = dir.path().join("missing").join("r.sqlite3");

        let recorder = build_recorder(&config(Some(missing_parent), None));

        assert!(recorder.is_empty());
    }

    #[test]
    fn missing_definition_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = config(None, None);
        config.survey.definition_path = dir.path().join("absent.json");

        assert!(matches!(load_definition(&config), Err(AppError::Definition(_))));
    }
}
