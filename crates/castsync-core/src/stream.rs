// ── Presentation event subscriptions ──
//
// Consumers watch the owner context through a broadcast feed. Lagging
// subscribers skip what they missed; the next snapshot read catches them up.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_core::Stream;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::event::PresentationEvent;

/// A subscription to presentation events.
pub struct EventStream {
    receiver: broadcast::Receiver<PresentationEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<PresentationEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. Returns `None` once the synchronizer is dropped.
    pub async fn next_event(&mut self) -> Option<PresentationEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "presentation event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-published event without waiting.
    pub fn try_next(&mut self) -> Option<PresentationEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> PresentationEventStream {
        PresentationEventStream {
            inner: BroadcastStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `broadcast::Receiver`.
pub struct PresentationEventStream {
    inner: BroadcastStream<PresentationEvent>,
}

impl Stream for PresentationEventStream {
    type Item = PresentationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "presentation event stream lagged");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut stream = EventStream::new(rx);
        for value in 0..4 {
            tx.send(PresentationEvent::LagValueChanged { value }).unwrap();
        }
        assert_eq!(
            stream.next_event().await,
            Some(PresentationEvent::LagValueChanged { value: 2 })
        );
        assert_eq!(
            stream.try_next(),
            Some(PresentationEvent::LagValueChanged { value: 3 })
        );
        assert_eq!(stream.try_next(), None);
    }

    #[tokio::test]
    async fn stream_adapter_skips_lag_and_ends() {
        use tokio_stream::StreamExt;

        let (tx, rx) = broadcast::channel(2);
        let stream = EventStream::new(rx).into_stream();
        for value in 0..3 {
            tx.send(PresentationEvent::LagValueChanged { value }).unwrap();
        }
        drop(tx);

        let values: Vec<_> = stream.collect().await;
        assert_eq!(
            values,
            vec![
                PresentationEvent::LagValueChanged { value: 1 },
                PresentationEvent::LagValueChanged { value: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn ends_when_sender_drops() {
        let (tx, rx) = broadcast::channel::<PresentationEvent>(4);
        let mut stream = EventStream::new(rx);
        drop(tx);
        assert_eq!(stream.next_event().await, None);
    }
}
