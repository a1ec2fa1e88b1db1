use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::handler::messages;
use crate::transport::{ChatTransport, MessageRef, TransportError};
use crate::utils::format_speed;

/// Default minimum spacing between two status edits
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Receives byte counters while a file is being uploaded
pub trait ProgressObserver: Send {
    fn on_progress(&mut self, current: u64, total: u64);
}

/// Source of time for progress throttling
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One accepted progress sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub speed_mbps: f64,
}

/// Integer percentage, clamped to 100
pub fn percent(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (current as u128 * 100) / total as u128;
    value.min(100) as u8
}

/// Lets at most one sample through per interval
pub struct ProgressThrottle {
    clock: Arc<dyn Clock>,
    interval: Duration,
    started: Instant,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let started = clock.now();
        Self {
            clock,
            interval,
            started,
            last: None,
        }
    }

    pub fn accept(&mut self, current: u64, total: u64) -> Option<ProgressSnapshot> {
        let now = self.clock.now();
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last = Some(now);

        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        Some(ProgressSnapshot {
            percent: percent(current, total),
            speed_mbps: format_speed(current, elapsed),
        })
    }
}

/// Observer that turns throttled samples into status texts.
///
/// Texts go through a channel so the synchronous read path never waits on the chat API;
/// [`spawn_status_updater`] applies them to the status message in order.
pub struct ProgressReporter {
    throttle: ProgressThrottle,
    updates: mpsc::UnboundedSender<String>,
}

impl ProgressReporter {
    pub fn new(throttle: ProgressThrottle, updates: mpsc::UnboundedSender<String>) -> Self {
        Self { throttle, updates }
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_progress(&mut self, current: u64, total: u64) {
        if let Some(snapshot) = self.throttle.accept(current, total) {
            // The updater is gone once the upload finished, late samples are dropped
            let _ = self.updates.send(messages::upload_progress(&snapshot));
        }
    }
}

/// Apply queued progress texts to the status message until the reporter is dropped
pub fn spawn_status_updater(
    transport: Arc<dyn ChatTransport>,
    status: MessageRef,
    mut updates: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = updates.recv().await {
            match transport.edit(status, &text).await {
                Ok(()) | Err(TransportError::NotModified) => {}
                Err(e) => tracing::error!("Failed to update upload progress: {}", e),
            }
        }
    })
}

/// `AsyncRead` adapter reporting how many bytes have been read so far
pub struct ProgressReader<R> {
    inner: R,
    read: u64,
    total: u64,
    observer: Box<dyn ProgressObserver>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, total: u64, observer: Box<dyn ProgressObserver>) -> Self {
        Self {
            inner,
            read: 0,
            total,
            observer,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &poll {
            let n = (buf.filled().len() - before) as u64;
            if n > 0 {
                let this = &mut *self;
                this.read += n;
                this.observer.on_progress(this.read, this.total);
            }
        }

        poll
    }
}
