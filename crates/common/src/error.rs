//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names_the_field() {
        let err = Error::invalid("api.base_url", "must start with http:// or https://");
        assert_eq!(
            err.to_string(),
            "Invalid value for api.base_url: must start with http:// or https://"
        );
    }

    #[test]
    fn every_variant_describes_its_source() {
        let invalid = Error::invalid("session.login_route", "must start with '/'");
        assert!(matches!(invalid, Error::Invalid { field: "session.login_route", .. }));
        let debug = format!("{invalid:?}");
        assert!(debug.contains("Invalid"), "got: {debug}");
    }

    #[test]
    fn io_errors_convert() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::NotFound, "session file missing").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_errors_convert() {
        let parse = toml::from_str::<toml::Table>("not = valid = toml").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Toml(_)));
    }
}
