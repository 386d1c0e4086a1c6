use tabled::Table;

use crate::{error, info, session::Jump, success, utils, warning};

pub async fn queue() {
    let session = super::connect().await;
    let pb = super::spinner("Fetching queue...");
    let view = session.queue_view().await;
    pb.finish_and_clear();

    match view {
        Ok(view) if view.is_empty() => warning!("Queue is empty"),
        Ok(view) => {
            let table = Table::new(utils::queue_rows(&view));
            println!("{}", table);
            info!("{} tracks queued", view.upcoming.len());
        }
        Err(e) => error!("Cannot read queue: {}", e),
    }
    super::finish(session).await;
}

/// Jumps to `uri` in the upcoming queue.
///
/// With `via_context` the enclosing context is played at the right offset
/// instead of skipping one track at a time.
pub async fn skip_to(uri: &str, via_context: bool) {
    let session = super::connect().await;

    if via_context {
        match session.jump_via_context(uri).await {
            Ok(Jump::Context { position }) => success!("Jumped to context position {}", position),
            Ok(Jump::Direct) => success!("No context playing, started {} directly", uri),
            Err(e) => error!("Cannot jump to {}: {}", uri, e),
        }
        super::finish(session).await;
        return;
    }

    let pb = super::spinner("Skipping through the queue...");
    let result = session.skip_to_queue_item(uri).await;
    pb.set_message("Waiting for playback to settle...");
    session.settle().await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            match report.reached_target {
                Some(false) => warning!(
                    "Issued {} skips but {} is not playing, the queue may have changed",
                    report.skips_succeeded,
                    uri
                ),
                _ => success!("Reached {} after {} skips", uri, report.skips_succeeded),
            }
            if report.skips_abandoned > 0 {
                warning!("{} skips failed and were given up", report.skips_abandoned);
            }
        }
        Err(e) => error!("Cannot skip to {}: {}", uri, e),
    }
    super::finish(session).await;
}
