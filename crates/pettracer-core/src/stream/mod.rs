// ── Cycle update streams ──
//
// Async alternative to callback observers: a `watch`-backed handle that
// always holds the latest completed cycle.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::CycleUpdate;

/// A subscription to completed refresh cycles.
///
/// `watch` semantics: a slow consumer skips intermediate cycles and
/// only ever sees the most recent one.
pub struct UpdateStream {
    current: Arc<CycleUpdate>,
    receiver: watch::Receiver<Arc<CycleUpdate>>,
}

impl UpdateStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Arc<CycleUpdate>>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The cycle captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<CycleUpdate> {
        &self.current
    }

    /// The latest cycle, which may be newer than `current()`.
    pub fn latest(&self) -> Arc<CycleUpdate> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next completed cycle.
    /// Returns `None` once the coordinator has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<CycleUpdate>> {
        self.receiver.changed().await.ok()?;
        let update = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&update);
        Some(update)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current value first, then every change.
    pub fn into_stream(self) -> UpdateWatchStream {
        UpdateWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct UpdateWatchStream {
    inner: WatchStream<Arc<CycleUpdate>>,
}

impl Stream for UpdateWatchStream {
    type Item = Arc<CycleUpdate>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
