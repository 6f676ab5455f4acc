use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::tasks::status::TaskStatus;

/// Ordered stream of a task's statuses.
///
/// Yields the status current at subscription time first, then every later transition
/// exactly once and in order. Ends after yielding a terminal status.
pub struct StatusStream<T, E> {
    rx: mpsc::UnboundedReceiver<TaskStatus<T, E>>,
}

impl<T, E> StatusStream<T, E> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<TaskStatus<T, E>>) -> Self {
        Self { rx }
    }

    /// Waits for the next status; `None` once the terminal status has been consumed.
    pub async fn next(&mut self) -> Option<TaskStatus<T, E>> {
        self.rx.recv().await
    }

    /// Returns an already-delivered status without waiting.
    pub fn try_next(&mut self) -> Option<TaskStatus<T, E>> {
        self.rx.try_recv().ok()
    }

    /// Drains the stream until it ends and returns the final (terminal) status.
    pub async fn last(mut self) -> Option<TaskStatus<T, E>> {
        let mut last = None;
        while let Some(s) = self.rx.recv().await {
            last = Some(s);
        }
        last
    }
}

impl<T, E> Stream for StatusStream<T, E> {
    type Item = TaskStatus<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
