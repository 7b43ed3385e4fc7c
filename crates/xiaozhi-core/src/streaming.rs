//! Latest-value relay between a streaming completion and a periodic renderer.
//!
//! The producer side ([`StreamPublisher`]) overwrites a single slot with the
//! accumulated text; the consumer ([`run_renderer`]) wakes on a fixed interval
//! and renders whatever is newest. Intermediate snapshots may be skipped. A
//! [`StreamSnapshot::Done`] sentinel, also sent when the publisher is dropped,
//! ends the renderer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Appended to in-progress text so readers can tell it is still growing.
pub const STREAM_CURSOR: &str = "▌";

/// Default spacing between renders. Discord tolerates roughly five message
/// edits per second per channel.
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSnapshot {
    /// Nothing generated yet.
    Waiting,
    /// Text accumulated so far.
    Partial(String),
    /// End of stream; the final reply is delivered separately.
    Done,
}

/// Create a connected publisher/watcher pair.
pub fn channel() -> (StreamPublisher, StreamWatcher) {
    let (tx, rx) = watch::channel(StreamSnapshot::Waiting);
    (
        StreamPublisher {
            tx,
            accumulated: String::new(),
        },
        StreamWatcher { rx },
    )
}

/// Producer half. Accumulates fragments and publishes the running text.
#[derive(Debug)]
pub struct StreamPublisher {
    tx: watch::Sender<StreamSnapshot>,
    accumulated: String,
}

impl StreamPublisher {
    /// Append a fragment and replace the slot with the new total.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.accumulated.push_str(fragment);
        self.tx
            .send_replace(StreamSnapshot::Partial(self.accumulated.clone()));
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Signal end of stream.
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for StreamPublisher {
    fn drop(&mut self) {
        self.tx.send_replace(StreamSnapshot::Done);
    }
}

/// Consumer half.
#[derive(Debug, Clone)]
pub struct StreamWatcher {
    rx: watch::Receiver<StreamSnapshot>,
}

impl StreamWatcher {
    pub fn latest(&self) -> StreamSnapshot {
        self.rx.borrow().clone()
    }
}

/// Where partial text gets shown (e.g. a Discord followup message being edited).
#[async_trait]
pub trait RenderTarget: Send + Sync {
    async fn render_partial(&self, text: &str) -> anyhow::Result<()>;
}

/// Render the newest snapshot every `every` until the stream finishes.
///
/// Unchanged slots are skipped, so a quiet stream causes no edits. Render
/// failures are logged and do not stop the loop. The loop returns as soon as
/// the stream finishes rather than on the next tick. Returns the number of
/// successful renders.
pub async fn run_renderer<T>(mut watcher: StreamWatcher, every: Duration, target: T) -> usize
where
    T: RenderTarget,
{
    let mut done_rx = watcher.rx.clone();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the first render waits
    // a full interval.
    ticker.tick().await;

    let mut renders = 0;
    loop {
        tokio::select! {
            biased;
            // Err means the publisher is gone, which also ends the stream.
            _ = done_rx.wait_for(|s| *s == StreamSnapshot::Done) => break,
            _ = ticker.tick() => {}
        }

        match watcher.rx.has_changed() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => break,
        }

        let snapshot = watcher.rx.borrow_and_update().clone();
        match snapshot {
            StreamSnapshot::Waiting => {}
            StreamSnapshot::Partial(text) => {
                let shown = format!("{}{}", text, STREAM_CURSOR);
                match target.render_partial(&shown).await {
                    Ok(()) => renders += 1,
                    Err(e) => warn!("Failed to render partial reply: {}", e),
                }
            }
            StreamSnapshot::Done => break,
        }
    }

    debug!("Renderer finished after {} render(s)", renders);
    renders
}
