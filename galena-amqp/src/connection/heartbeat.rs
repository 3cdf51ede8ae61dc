//! Asynchronous heartbeat for the connection engine.

use std::io;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio_stream::wrappers::IntervalStream;

pin_project! {
    /// A wrapper over an `Option<IntervalStream>` that never yields when
    /// the underlying interval is `None`.
    ///
    /// The engine sends an empty frame on every tick; a peer that did not
    /// advertise an idle-time-out gets [`HeartBeat::never`].
    #[derive(Debug)]
    pub struct HeartBeat {
        #[pin]
        interval: Option<IntervalStream>,
    }
}

impl HeartBeat {
    /// A heartbeat that never fires.
    pub fn never() -> Self {
        Self { interval: None }
    }

    /// A heartbeat firing at the given period.
    pub fn new(period: Duration) -> Self {
        let interval = IntervalStream::new(tokio::time::interval(period));
        Self {
            interval: Some(interval),
        }
    }
}

impl Stream for HeartBeat {
    type Item = io::Result<()>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.interval.as_pin_mut() {
            Some(interval) => match interval.poll_next(cx) {
                Poll::Ready(Some(_instant)) => Poll::Ready(Some(Ok(()))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            None => Poll::Pending,
        }
    }
}
