use crate::{error, info, spotify::AuthorizationFlow, success, warning};

/// Authorizes the CLI against the Spotify account.
///
/// Cached credentials with a refresh token are refreshed instead, unless
/// `force` asks for the browser flow.
pub async fn auth(force: bool) {
    let accounts = super::accounts();
    let flow = AuthorizationFlow::from_env(&accounts);
    let session = super::build_session(accounts);

    if !force {
        if let Err(e) = session.resume().await {
            warning!("Cached credentials unusable, starting over: {}", e);
        }
    }

    if !session.tokens().has_refresh_token().await {
        info!("Opening the authorization page in your browser...");
    }

    match session.authenticate(&flow).await {
        Ok(()) => success!("Authentication completed successfully"),
        Err(e) => error!("Authentication failed: {}", e),
    }
    session.shutdown().await;
}
