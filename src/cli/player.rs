use crate::{error, info, success, utils, warning};

pub async fn status() {
    let session = super::connect().await;
    match session.current_state().await {
        Ok(Some(snapshot)) => {
            info!("{}", utils::describe_snapshot(&snapshot));
            if let Some(uri) = &snapshot.context_uri {
                info!("Context: {}", uri);
            }
        }
        Ok(None) => warning!("No active device"),
        Err(e) => error!("Cannot read playback state: {}", e),
    }
    super::finish(session).await;
}

pub async fn play_pause() {
    let session = super::connect().await;
    match session.play_pause().await {
        Ok(true) => success!("Playing"),
        Ok(false) => success!("Paused"),
        Err(e) => error!("Cannot toggle playback: {}", e),
    }
    super::finish(session).await;
}

pub async fn next() {
    let session = super::connect().await;
    if let Err(e) = session.next().await {
        error!("Cannot skip: {}", e);
    }
    super::finish(session).await;
}

pub async fn previous() {
    let session = super::connect().await;
    if let Err(e) = session.previous().await {
        error!("Cannot go back: {}", e);
    }
    super::finish(session).await;
}

pub async fn play(uri: &str) {
    let session = super::connect().await;
    match session.play_uri(uri).await {
        Ok(()) => success!("Playing {}", uri),
        Err(e) => error!("Cannot play {}: {}", uri, e),
    }
    super::finish(session).await;
}

pub async fn shuffle() {
    let session = super::connect().await;
    match session.toggle_shuffle().await {
        Ok(on) => success!("Shuffle {}", if on { "on" } else { "off" }),
        Err(e) => error!("Cannot toggle shuffle: {}", e),
    }
    super::finish(session).await;
}

pub async fn repeat() {
    let session = super::connect().await;
    match session.toggle_repeat().await {
        Ok(mode) => success!("Repeat {}", mode),
        Err(e) => error!("Cannot change repeat mode: {}", e),
    }
    super::finish(session).await;
}

pub async fn seek(position_ms: i64) {
    let session = super::connect().await;
    match session.seek(position_ms).await {
        Ok(Some(snapshot)) => success!("{}", utils::describe_snapshot(&snapshot)),
        Ok(None) => warning!("No active device"),
        Err(e) => error!("Cannot seek: {}", e),
    }
    super::finish(session).await;
}
