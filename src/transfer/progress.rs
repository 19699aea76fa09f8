//! Progress reporting for transfers
//!
//! Progress is coarse: observers hear about each collection once, before its
//! documents move, with a 1-based position and the total collection count.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::warn;

use super::TransferResult;

/// Receives per-collection progress from a running transfer
///
/// Positions passed to `on_collection` strictly increase within one transfer.
pub trait ProgressObserver: Send {
    /// A collection is about to be transferred
    fn on_collection(&mut self, name: &str, position: usize, total: usize);

    /// The transfer finished successfully
    fn on_complete(&mut self, _result: &TransferResult) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(&str, usize, usize) + Send,
{
    fn on_collection(&mut self, name: &str, position: usize, total: usize) {
        self(name, position, total)
    }
}

/// Observer that ignores progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_collection(&mut self, _name: &str, _position: usize, _total: usize) {}
}

/// Progress event sent by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Collection {
        name: String,
        position: usize,
        total: usize,
    },
    Completed {
        collections: usize,
        documents: u64,
    },
}

/// Observer forwarding progress as events on a channel
///
/// Lets a caller render progress from another task. Events are dropped once
/// the receiver is gone; the transfer itself is unaffected.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            warn!("Progress receiver dropped");
        }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_collection(&mut self, name: &str, position: usize, total: usize) {
        self.send(ProgressEvent::Collection {
            name: name.to_string(),
            position,
            total,
        });
    }

    fn on_complete(&mut self, result: &TransferResult) {
        self.send(ProgressEvent::Completed {
            collections: result.collections,
            documents: result.documents,
        });
    }
}

/// Terminal progress bar over collections
///
/// The bar length is set from the first `on_collection` call, since the total
/// is only known once the source has been enumerated.
pub struct ProgressTracker {
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
    /// Last position reported
    position: usize,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        });

        Self { bar, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for ProgressTracker {
    fn on_collection(&mut self, name: &str, position: usize, total: usize) {
        self.position = position;

        if let Some(ref bar) = self.bar {
            bar.set_length(total as u64);
            // Position counts completed collections; the current one is in flight.
            bar.set_position(position.saturating_sub(1) as u64);
            bar.set_message(name.to_string());
        }
    }

    fn on_complete(&mut self, result: &TransferResult) {
        if let Some(ref bar) = self.bar {
            bar.set_position(result.collections as u64);
        }
        self.finish();
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}
