//! Guard error model.
//! Authentication failures are not errors: they surface as `Ok(false)` / `Ok(None)`.
//! Only configuration mistakes and collaborator failures reach this enum.

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A recall cookie was needed but no cookie jar was configured on the guard.
    #[error("cookie jar has not been set on the guard")]
    MissingCookieJar,

    /// Failure raised by the session store, cookie jar or identity backend, passed through as-is.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl GuardError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, GuardError::MissingCookieJar)
    }
}

pub type GuardResult<T> = Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("session backend offline")]
    struct Offline;

    #[test]
    fn missing_cookie_jar_is_configuration() {
        assert!(GuardError::MissingCookieJar.is_configuration());
        assert_eq!(GuardError::MissingCookieJar.to_string(), "cookie jar has not been set on the guard");
    }

    #[test]
    fn backend_errors_pass_through_unchanged() {
        let err: GuardError = anyhow::Error::new(Offline).into();
        assert_eq!(err.to_string(), "session backend offline");
        assert!(!err.is_configuration());
        match err {
            GuardError::Backend(inner) => assert!(inner.downcast_ref::<Offline>().is_some()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
