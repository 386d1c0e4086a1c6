use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Extension, Router, routing::get};
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
    task::JoinHandle,
};

use crate::{api, error::PlaybackError};

/// What the `/callback` handler delivers to the waiting flow.
pub type RedirectResult = Result<String, String>;

/// Shared state of the redirect receiver.
///
/// The sender is taken by the first redirect carrying a code or an error, so
/// exactly one redirect is ever accepted.
pub struct CallbackState {
    pub expected_state: Option<String>,
    pub sender: Mutex<Option<oneshot::Sender<RedirectResult>>>,
}

/// Transient local listener for the OAuth redirect.
pub struct CallbackServer {
    addr: SocketAddr,
    code_rx: oneshot::Receiver<RedirectResult>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Binds the receiver and starts serving `/callback` and `/health`.
    pub async fn bind(
        addr: &str,
        expected_state: Option<String>,
    ) -> Result<Self, PlaybackError> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| PlaybackError::Config(format!("invalid server address {addr}: {e}")))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PlaybackError::Authorization(format!("cannot listen on {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| PlaybackError::Authorization(e.to_string()))?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(CallbackState {
            expected_state,
            sender: Mutex::new(Some(code_tx)),
        });

        let app = Router::new()
            .route("/health", get(api::health))
            .route("/callback", get(api::callback).layer(Extension(state)));

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::warn!(error = %e, "redirect receiver stopped with an error");
            }
        });

        Ok(Self {
            addr: local_addr,
            code_rx,
            shutdown_tx,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the redirect, then shuts the receiver down.
    pub async fn wait_for_code(mut self, timeout: Duration) -> Result<String, PlaybackError> {
        let received = tokio::time::timeout(timeout, &mut self.code_rx).await;
        self.shutdown().await;

        match received {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(reason))) => Err(PlaybackError::Authorization(reason)),
            Ok(Err(_)) => Err(PlaybackError::Authorization(String::from(
                "redirect receiver stopped before a code arrived",
            ))),
            Err(_) => Err(PlaybackError::Authorization(String::from(
                "timed out waiting for the authorization redirect",
            ))),
        }
    }

    /// Stops the listener and waits for in-flight responses to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        tracing::debug!(addr = %self.addr, "redirect receiver shut down");
    }
}
