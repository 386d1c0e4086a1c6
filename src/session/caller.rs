use std::sync::Arc;

use reqwest::StatusCode;

use crate::{
    error::PlaybackError,
    management::TokenStore,
    spotify::{ApiRequest, ApiResponse, Transport},
};

/// Executes Web API requests with the session's bearer token.
///
/// On a 401 the token is refreshed once and the same request is retried
/// once. Every operation goes through here, so the policy lives in one place.
#[derive(Clone)]
pub struct AuthorizedCaller {
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenStore>,
}

impl AuthorizedCaller {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<TokenStore>) -> Self {
        Self { transport, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Sends `request`, retrying once after a refresh on a 401.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Unauthenticated`] without credentials (nothing is sent)
    /// - [`PlaybackError::AuthRefresh`] if the refresh fails or the retry is
    ///   rejected again
    /// - [`PlaybackError::RateLimited`] on 429
    /// - [`PlaybackError::RemoteCall`] on any other non-2xx status
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, PlaybackError> {
        let token = self.tokens.access_token().await?;
        let response = self.transport.send(request, &token).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return classify(response);
        }

        tracing::debug!(path = %request.path, "access token rejected, refreshing once");
        let token = self.tokens.refresh_after(&token).await?;
        let response = self.transport.send(request, &token).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Err(PlaybackError::AuthRefresh(format!(
                "{} still unauthorized after token refresh",
                request.path
            )));
        }
        classify(response)
    }

    /// One raw attempt with an explicit token: no refresh, no classification.
    ///
    /// The skip engine applies its own batch-level policy on top of this.
    pub async fn send_once(
        &self,
        request: &ApiRequest,
        token: &str,
    ) -> Result<ApiResponse, PlaybackError> {
        self.transport.send(request, token).await
    }
}

fn classify(response: ApiResponse) -> Result<ApiResponse, PlaybackError> {
    match response.status {
        s if s.is_success() => Ok(response),
        StatusCode::TOO_MANY_REQUESTS => Err(PlaybackError::RateLimited),
        status => Err(PlaybackError::RemoteCall { status }),
    }
}
