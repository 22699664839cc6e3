//! Error types for slurp operations.
//!
//! Errors are raised before a run starts (registry construction, request validation,
//! configuration) or collected after it ends (panicked consumer tasks). Once a run is started
//! nothing inside the pipeline reports errors through this type, loaders signal "no data"
//! through an empty key instead.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use slurp_config::shared::ValidationError;

/// Result type for slurp operations.
pub type SlurpResult<T> = Result<T, SlurpError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Main error type for slurp operations.
///
/// A [`SlurpError`] is either a single classified error or an aggregate of several errors,
/// the latter being produced when more than one task of a pool fails.
#[derive(Debug, Clone)]
pub struct SlurpError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    Many {
        errors: Vec<SlurpError>,
        location: &'static Location<'static>,
    },
}

/// Classification of the failures a caller may want to react to.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Registration errors
    DuplicateKey,
    InvalidKey,

    // Request validation errors
    UnknownAnalyst,
    UnknownProducer,
    EmptyAnalysis,

    // Configuration errors
    ConfigError,

    // Task errors
    SlurperPanic,
    ProducerPanic,
    RuntimeUnavailable,

    Unknown,
}

impl SlurpError {
    /// Returns the [`ErrorKind`] of this error, the first one for aggregates.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every [`ErrorKind`] contained in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the dynamic detail, for aggregates the first one available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the call site that created this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches the originating error. Has no effect on aggregates.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        SlurpError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source: None,
                location: Location::caller(),
            }),
        }
    }
}

impl PartialEq for SlurpError {
    fn eq(&self, other: &SlurpError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SlurpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(
                    f,
                    "[{:?}] {} @ {}:{}",
                    payload.kind,
                    payload.description,
                    payload.location.file(),
                    payload.location.line()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                write!(
                    f,
                    "[Many] {} errors aggregated @ {}:{}",
                    errors.len(),
                    location.file(),
                    location.line()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    for (line_index, line) in error.to_string().lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {line}", index + 1)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for SlurpError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

impl From<(ErrorKind, &'static str)> for SlurpError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SlurpError {
        SlurpError::from_components(kind, Cow::Borrowed(desc), None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for SlurpError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SlurpError {
        SlurpError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()))
    }
}

/// Aggregates errors, a single error is returned unwrapped.
impl<E> From<Vec<E>> for SlurpError
where
    E: Into<SlurpError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> SlurpError {
        let location = Location::caller();
        let mut errors: Vec<SlurpError> = errors.into_iter().map(Into::into).collect();

        match errors.len() {
            1 => errors.remove(0),
            _ => SlurpError {
                repr: ErrorRepr::Many { errors, location },
            },
        }
    }
}

impl From<ValidationError> for SlurpError {
    #[track_caller]
    fn from(err: ValidationError) -> SlurpError {
        let detail = err.to_string();
        SlurpError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid slurp configuration"),
            Some(Cow::Owned(detail)),
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slurp_error;

    #[test]
    fn single_error_keeps_kind_and_detail() {
        let err = slurp_error!(ErrorKind::UnknownAnalyst, "Unknown analyst", "ex");

        assert_eq!(err.kind(), ErrorKind::UnknownAnalyst);
        assert_eq!(err.detail(), Some("ex"));
        assert!(err.to_string().contains("Unknown analyst"));
    }

    #[test]
    fn aggregate_of_one_is_unwrapped() {
        let err: SlurpError =
            vec![slurp_error!(ErrorKind::SlurperPanic, "Slurper panicked")].into();

        assert_eq!(err.kinds(), vec![ErrorKind::SlurperPanic]);
        assert!(!err.to_string().starts_with("[Many]"));
    }

    #[test]
    fn aggregate_lists_every_error() {
        let err: SlurpError = vec![
            slurp_error!(ErrorKind::SlurperPanic, "Slurper panicked"),
            slurp_error!(ErrorKind::ProducerPanic, "Producer panicked"),
        ]
        .into();

        assert_eq!(
            err.kinds(),
            vec![ErrorKind::SlurperPanic, ErrorKind::ProducerPanic]
        );
        assert!(err.to_string().starts_with("[Many] 2 errors"));
    }

    #[test]
    fn validation_errors_become_config_errors() {
        let err: SlurpError = ValidationError::InvalidFieldValue {
            field: "slurp_buffer".to_string(),
            constraint: "must be greater than 0".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(error::Error::source(&err).is_some());
    }
}
