use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};

use crate::server::CallbackState;

const SUCCESS_PAGE: &str = "<html><body><h2>Authentication successful!</h2><p>You can close this window now.</p></body></html>";

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<CallbackState>>,
) -> Html<&'static str> {
    if let Some(expected) = &shared_state.expected_state {
        if params.get("state") != Some(expected) {
            return Html("<h4>State mismatch, request ignored.</h4>");
        }
    }

    let outcome = match (params.get("code"), params.get("error")) {
        (Some(code), _) => Ok(code.clone()),
        (None, Some(error)) => Err(format!("authorization denied: {error}")),
        (None, None) => return Html("<h4>Missing authorization code.</h4>"),
    };

    let Some(sender) = shared_state.sender.lock().await.take() else {
        return Html("<h4>Authorization already handled.</h4>");
    };

    let accepted = outcome.is_ok();
    // the flow may already have timed out and dropped its receiver
    let _ = sender.send(outcome);

    if accepted {
        Html(SUCCESS_PAGE)
    } else {
        Html("<h4>Login failed.</h4>")
    }
}
