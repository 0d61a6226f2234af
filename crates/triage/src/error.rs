use crate::config::ConfigError;
use crate::persistence::{DumpError, SinkError};
use crate::survey::DefinitionError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Definition(DefinitionError),
    Store(SinkError),
    Dump(DumpError),
    Input(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Definition(err) => write!(f, "questionnaire error: {}", err),
            AppError::Store(err) => write!(f, "response store error: {}", err),
            AppError::Dump(err) => write!(f, "export error: {}", err),
            AppError::Input(message) => write!(f, "invalid input: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Definition(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Dump(err) => Some(err),
            AppError::Input(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DefinitionError> for AppError {
    fn from(value: DefinitionError) -> Self {
        Self::Definition(value)
    }
}

impl From<SinkError> for AppError {
    fn from(value: SinkError) -> Self {
        Self::Store(value)
    }
}

impl From<DumpError> for AppError {
    fn from(value: DumpError) -> Self {
        Self::Dump(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn wraps_domain_errors_with_their_source() {
        let err = AppError::from(ConfigError::MissingAccessCode);

        assert!(matches!(err, AppError::Config(ConfigError::MissingAccessCode)));
        assert_eq!(
            err.to_string(),
            "configuration error: TRIAGE_ACCESS_CODE must be set to a non-empty value"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn definition_errors_surface_the_questionnaire_problem() {
        let err = AppError::from(DefinitionError::NoPaths);

        assert_eq!(err.to_string(), "questionnaire error: questionnaire defines no paths");
    }

    #[test]
    fn input_errors_have_no_source() {
        let err = AppError::Input("unknown path 'x'".to_string());

        assert_eq!(err.to_string(), "invalid input: unknown path 'x'");
        assert!(err.source().is_none());
    }
}
