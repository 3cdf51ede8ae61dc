//! Performatives defined in AMQP 1.0 specification Part 2.7
//!
//! A performative is a frame body that drives a connection, session, or
//! link state transition. All of them are described lists with positional,
//! nullable fields.

mod attach;
mod begin;
mod close;
mod detach;
mod disposition;
mod end;
mod flow;
mod open;
mod transfer;

pub use attach::Attach;
pub use begin::Begin;
pub use close::Close;
pub use detach::Detach;
pub use disposition::Disposition;
pub use end::End;
pub use flow::Flow;
pub use open::{ChannelMax, MaxFrameSize, Open};
pub use transfer::Transfer;

use crate::composite::DescribedType;
use crate::value::Value;

/// Any performative.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum Performative {
    Open(Open),
    Begin(Begin),
    Attach(Attach),
    Flow(Flow),
    Transfer(Transfer),
    Disposition(Disposition),
    Detach(Detach),
    End(End),
    Close(Close),
}

impl From<Performative> for Value {
    fn from(performative: Performative) -> Self {
        match performative {
            Performative::Open(p) => p.to_value(),
            Performative::Begin(p) => p.to_value(),
            Performative::Attach(p) => p.to_value(),
            Performative::Flow(p) => p.to_value(),
            Performative::Transfer(p) => p.to_value(),
            Performative::Disposition(p) => p.to_value(),
            Performative::Detach(p) => p.to_value(),
            Performative::End(p) => p.to_value(),
            Performative::Close(p) => p.to_value(),
        }
    }
}
