use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url, header};

use crate::{
    config,
    error::PlaybackError,
    server::CallbackServer,
    types::TokenResponse,
    utils, warning,
};

/// The accounts-service side of OAuth: code exchange and refresh grant.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, PlaybackError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, PlaybackError>;
}

/// Client credentials and endpoints of the Spotify accounts service.
#[derive(Debug, Clone)]
pub struct SpotifyAccounts {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
}

impl SpotifyAccounts {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str, token_url: &str) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            token_url: token_url.to_string(),
        }
    }

    /// Builds the accounts client from the environment.
    ///
    /// # Errors
    ///
    /// Fails with [`PlaybackError::Config`] if the client credentials are missing.
    pub fn from_env() -> Result<Self, PlaybackError> {
        Ok(Self::new(
            &config::spotify_client_id()?,
            &config::spotify_client_secret()?,
            &config::spotify_redirect_uri(),
            &config::spotify_apitoken_url(),
        ))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    async fn post_grant(&self, form: &[(&str, &str)]) -> Result<Response, PlaybackError> {
        let response = self
            .client
            .post(&self.token_url)
            .header(
                header::AUTHORIZATION,
                utils::basic_auth_header(&self.client_id, &self.client_secret),
            )
            .form(form)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl AuthBackend for SpotifyAccounts {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, PlaybackError> {
        let response = self
            .post_grant(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("no error details"));
            return Err(PlaybackError::AuthExchange { status, reason });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, PlaybackError> {
        let response = self
            .post_grant(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
            .map_err(|e| PlaybackError::AuthRefresh(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("no error details"));
            return Err(PlaybackError::AuthRefresh(format!("{status}: {reason}")));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| PlaybackError::AuthRefresh(e.to_string()))
    }
}

/// Builds the URL of the consent page.
///
/// `show_dialog=true` forces the dialog even for an already approved app so
/// the user can switch accounts.
pub fn authorize_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> Result<String, PlaybackError> {
    let url = Url::parse_with_params(
        auth_url,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("scope", scope),
            ("redirect_uri", redirect_uri),
            ("state", state),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| PlaybackError::Config(format!("invalid authorization url: {e}")))?;
    Ok(url.into())
}

/// Browser-based authorization code flow.
///
/// Binds the redirect receiver, opens the consent page in the system browser
/// and waits for the one redirect carrying the code.
pub struct AuthorizationFlow {
    pub auth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub listen_addr: String,
    pub timeout: Duration,
}

impl AuthorizationFlow {
    pub fn from_env(accounts: &SpotifyAccounts) -> Self {
        Self {
            auth_url: config::spotify_apiauth_url(),
            client_id: accounts.client_id().to_string(),
            redirect_uri: accounts.redirect_uri().to_string(),
            scope: config::spotify_scope(),
            listen_addr: config::server_addr(),
            timeout: config::authorization_timeout(),
        }
    }

    /// Runs the flow and returns the authorization code.
    ///
    /// The receiver is shut down when this returns, whatever the outcome.
    pub async fn obtain_code(&self) -> Result<String, PlaybackError> {
        let state = utils::generate_state();
        let server = CallbackServer::bind(&self.listen_addr, Some(state.clone())).await?;

        let url = match authorize_url(
            &self.auth_url,
            &self.client_id,
            &self.redirect_uri,
            &self.scope,
            &state,
        ) {
            Ok(url) => url,
            Err(e) => {
                server.shutdown().await;
                return Err(e);
            }
        };

        tracing::info!(addr = %server.local_addr(), "waiting for authorization redirect");
        if webbrowser::open(&url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            );
        }

        server.wait_for_code(self.timeout).await
    }
}
