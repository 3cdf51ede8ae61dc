//! An AMQP 1.0 protocol engine and asynchronous client.
//!
//! The protocol engine is sans-I/O at its core: frames go in, state
//! transitions happen, frames come out. Each connection runs the engine on
//! a single task, and each session runs its multiplexer on a single task,
//! so all endpoint state is mutated from exactly one place. The client
//! facade (`Connection`, `Session`, `Sender`, `Receiver`) talks to those
//! tasks over channels and hands callers one-shot futures for completion.
//!
//! ```rust,ignore
//! let mut connection = Connection::open("example-client", "amqp://localhost:5672").await?;
//! let mut session = Session::begin(&mut connection).await?;
//! let mut sender = Sender::attach(&mut session, "sender-1", "q1").await?;
//!
//! let outcome = sender.send("hello AMQP").await?;
//! outcome.accepted_or(SendError::NotAccepted)?;
//!
//! sender.close().await?;
//! session.end().await?;
//! connection.close().await?;
//! ```

#![deny(missing_debug_implementations)]

pub mod connection;
pub mod error;
pub mod frames;
pub mod link;
pub mod sasl_profile;
pub mod session;
pub mod transport;

mod control;
mod util;

use bytes::Bytes;

/// The raw payload of a transfer frame.
///
/// `Bytes` gives the retain/release semantics payload slices need: each
/// incoming frame's payload is a shared view into the frame buffer that is
/// reclaimed when the last holder drops it.
pub type Payload = Bytes;

pub use connection::{Connection, ConnectionHandle};
pub use error::{EngineError, OpenError};
pub use link::delivery::{Delivery, DeliveryFut, Sendable};
pub use link::receiver::{CreditMode, Receiver};
pub use link::sender::Sender;
pub use link::stream::{StreamReceiver, StreamSender};
pub use session::{Session, SessionHandle};
