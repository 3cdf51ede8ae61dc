//! Types defined in AMQP 1.0 specification Part 3: Messaging

use crate::definitions::Fields;
use crate::primitives::{OrderedMap, Symbol};
use crate::value::Value;

mod amqp_sequence;
mod amqp_value;
mod annotations;
mod application_properties;
mod data;
mod delivery_state;
mod header;
mod message;
mod properties;
mod source;
mod target;
mod terminus;

pub use amqp_sequence::AmqpSequence;
pub use amqp_value::AmqpValue;
pub use annotations::{DeliveryAnnotations, Footer, MessageAnnotations};
pub use application_properties::ApplicationProperties;
pub use data::Data;
pub use delivery_state::{Accepted, DeliveryState, Modified, Outcome, Received, Rejected, Released};
pub use header::Header;
pub use message::{Body, Message};
pub use properties::{MessageId, Properties};
pub use source::Source;
pub use target::Target;
pub use terminus::{DistributionMode, TerminusDurability, TerminusExpiryPolicy};

/// 3.5.6 Address String
///
/// Addresses of a node are not defined by the core specification; only the
/// string form is modeled.
pub type Address = String;

/// 3.5.9 Node Properties
pub type NodeProperties = Fields;

/// 3.5.8 Filter Set
///
/// A set of named filters; the value of each entry is a described filter
/// type conveyed opaquely.
pub type FilterSet = OrderedMap<Symbol, Value>;

/// Section keys of the annotation maps
pub type Annotations = OrderedMap<Symbol, Value>;
