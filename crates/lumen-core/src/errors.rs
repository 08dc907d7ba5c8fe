use std::future::Future;
use std::time::Duration;

/// Failure of a collaborator call (search provider or reasoning client).
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::MissingCredentials(_) => "missing_credentials",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 404 | 422 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Run a collaborator call under a deadline. Expiry becomes
/// `GatewayError::Timeout`; the inner future is dropped, not aborted upstream.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_mapping() {
        assert!(matches!(
            GatewayError::from_status(401, "unauthorized".into()),
            GatewayError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GatewayError::from_status(429, "slow down".into()),
            GatewayError::RateLimited { .. }
        ));
        assert!(matches!(
            GatewayError::from_status(502, "bad gateway".into()),
            GatewayError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            GatewayError::from_status(302, "moved".into()),
            GatewayError::InvalidRequest(_)
        ));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(GatewayError::Timeout(Duration::from_secs(1)).error_kind(), "timeout");
        assert_eq!(
            GatewayError::MalformedResponse("x".into()).error_kind(),
            "malformed_response"
        );
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(!GatewayError::NetworkError("tcp".into()).is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_is_timeout() {
        let result: Result<(), GatewayError> = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Timeout(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn deadline_passes_through_inner_result() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok::<_, GatewayError>(3) }).await;
        assert_eq!(ok.unwrap(), 3);

        let err = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(GatewayError::NetworkError("reset".into()))
        })
        .await;
        assert!(matches!(err, Err(GatewayError::NetworkError(_))));
    }
}
