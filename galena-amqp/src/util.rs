//! Common utilities

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Whether an engine event loop keeps running after handling an event.
#[derive(Debug)]
pub(crate) enum Running {
    Continue,
    Stop,
}

/// A resettable deadline that elapses when no inbound traffic arrives for
/// the configured duration.
#[derive(Debug)]
pub(crate) struct IdleTimeout {
    delay: Pin<Box<Sleep>>,
    duration: Duration,
}

impl IdleTimeout {
    pub fn new(duration: Duration) -> Self {
        let delay = Box::pin(tokio::time::sleep(duration));
        Self { delay, duration }
    }

    pub fn reset(&mut self) {
        let next = Instant::now() + self.duration;
        self.delay.as_mut().reset(next);
    }
}

impl Future for IdleTimeout {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        self.delay.as_mut().poll(cx)
    }
}

/// Generates link-scoped delivery tags from a counter.
///
/// A tag only has to be unique among the link's unsettled deliveries, so
/// an incrementing counter re-encoded as bytes is sufficient.
#[derive(Debug, Default)]
pub(crate) struct DeliveryTagGenerator {
    next: u64,
}

impl DeliveryTagGenerator {
    pub fn next_tag(&mut self) -> galena_amqp_types::definitions::DeliveryTag {
        let tag = self.next.to_be_bytes();
        self.next = self.next.wrapping_add(1);
        galena_amqp_types::primitives::Binary::from(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryTagGenerator;

    #[test]
    fn tags_are_distinct() {
        let mut gen = DeliveryTagGenerator::default();
        let a = gen.next_tag();
        let b = gen.next_tag();
        assert_ne!(a, b);
    }
}
