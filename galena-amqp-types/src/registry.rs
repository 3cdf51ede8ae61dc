//! The described-type registry.
//!
//! Descriptor dispatch is a small map keyed by the numeric descriptor,
//! with a parallel symbol index so the symbolic and numeric forms of a
//! descriptor decode identically. The registry is a per-engine instance,
//! created at engine construction; there is no process-global state.

use std::collections::HashMap;

use crate::composite::DescribedType;
use crate::decode::Decoder;
use crate::described::{Described, Descriptor};
use crate::error::Error;
use crate::messaging::{
    Accepted, AmqpSequence, AmqpValue, ApplicationProperties, Data, DeliveryAnnotations, Footer,
    Header, MessageAnnotations, Modified, Properties, Received, Rejected, Released, Source, Target,
};
use crate::performatives::{
    Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
};
use crate::sasl::{
    SaslChallenge, SaslFrameBody, SaslInit, SaslMechanisms, SaslOutcome, SaslResponse,
};
use crate::value::Value;

/// A decoded described type, dispatched by descriptor.
///
/// Unregistered descriptors land in [`AmqpComposite::Unknown`] with their
/// descriptor and body intact.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum AmqpComposite {
    // performatives
    Open(Open),
    Begin(Begin),
    Attach(Attach),
    Flow(Flow),
    Transfer(Transfer),
    Disposition(Disposition),
    Detach(Detach),
    End(End),
    Close(Close),

    // messaging sections
    Header(Header),
    DeliveryAnnotations(DeliveryAnnotations),
    MessageAnnotations(MessageAnnotations),
    Properties(Properties),
    ApplicationProperties(ApplicationProperties),
    Data(Data),
    AmqpSequence(AmqpSequence),
    AmqpValue(AmqpValue),
    Footer(Footer),

    // terminus types
    Source(Source),
    Target(Target),

    // delivery states
    Received(Received),
    Accepted(Accepted),
    Rejected(Rejected),
    Released(Released),
    Modified(Modified),

    // wire error
    Error(crate::definitions::Error),

    // sasl frame bodies
    SaslMechanisms(SaslMechanisms),
    SaslInit(SaslInit),
    SaslChallenge(SaslChallenge),
    SaslResponse(SaslResponse),
    SaslOutcome(SaslOutcome),

    /// A described type with no registered decoder
    Unknown(Described<Value>),
}

macro_rules! impl_into_composite {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for AmqpComposite {
                fn from(val: $ty) -> Self {
                    AmqpComposite::$ty(val)
                }
            }
        )*
    };
}

impl_into_composite! {
    Open, Begin, Attach, Flow, Transfer, Disposition, Detach, End, Close,
    Header, DeliveryAnnotations, MessageAnnotations, Properties,
    ApplicationProperties, Data, AmqpSequence, AmqpValue, Footer,
    Source, Target,
    Received, Accepted, Rejected, Released, Modified,
    SaslMechanisms, SaslInit, SaslChallenge, SaslResponse, SaslOutcome,
}

impl From<crate::definitions::Error> for AmqpComposite {
    fn from(val: crate::definitions::Error) -> Self {
        AmqpComposite::Error(val)
    }
}

impl AmqpComposite {
    /// Extracts a performative, if this composite is one.
    pub fn into_performative(self) -> Option<Performative> {
        let performative = match self {
            AmqpComposite::Open(p) => Performative::Open(p),
            AmqpComposite::Begin(p) => Performative::Begin(p),
            AmqpComposite::Attach(p) => Performative::Attach(p),
            AmqpComposite::Flow(p) => Performative::Flow(p),
            AmqpComposite::Transfer(p) => Performative::Transfer(p),
            AmqpComposite::Disposition(p) => Performative::Disposition(p),
            AmqpComposite::Detach(p) => Performative::Detach(p),
            AmqpComposite::End(p) => Performative::End(p),
            AmqpComposite::Close(p) => Performative::Close(p),
            _ => return None,
        };
        Some(performative)
    }

    /// Extracts a SASL frame body, if this composite is one.
    pub fn into_sasl_body(self) -> Option<SaslFrameBody> {
        let body = match self {
            AmqpComposite::SaslMechanisms(b) => SaslFrameBody::Mechanisms(b),
            AmqpComposite::SaslInit(b) => SaslFrameBody::Init(b),
            AmqpComposite::SaslChallenge(b) => SaslFrameBody::Challenge(b),
            AmqpComposite::SaslResponse(b) => SaslFrameBody::Response(b),
            AmqpComposite::SaslOutcome(b) => SaslFrameBody::Outcome(b),
            _ => return None,
        };
        Some(body)
    }
}

type DecodeFn = fn(Described<Value>) -> Result<AmqpComposite, Error>;

fn decode_entry<T>(described: Described<Value>) -> Result<AmqpComposite, Error>
where
    T: DescribedType + Into<AmqpComposite>,
{
    T::from_described(described).map(Into::into)
}

/// Registry mapping descriptors to type decoders.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_code: HashMap<u64, DecodeFn>,
    by_symbol: HashMap<&'static str, u64>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type under both its descriptor forms.
    pub fn register<T>(&mut self)
    where
        T: DescribedType + Into<AmqpComposite>,
    {
        self.by_code.insert(T::DESCRIPTOR_CODE, decode_entry::<T>);
        self.by_symbol.insert(T::DESCRIPTOR_SYMBOL, T::DESCRIPTOR_CODE);
    }

    /// A registry with every core-specification type registered.
    pub fn core() -> Self {
        let mut registry = Self::new();

        registry.register::<Open>();
        registry.register::<Begin>();
        registry.register::<Attach>();
        registry.register::<Flow>();
        registry.register::<Transfer>();
        registry.register::<Disposition>();
        registry.register::<Detach>();
        registry.register::<End>();
        registry.register::<Close>();

        registry.register::<Header>();
        registry.register::<DeliveryAnnotations>();
        registry.register::<MessageAnnotations>();
        registry.register::<Properties>();
        registry.register::<ApplicationProperties>();
        registry.register::<Data>();
        registry.register::<AmqpSequence>();
        registry.register::<AmqpValue>();
        registry.register::<Footer>();

        registry.register::<Source>();
        registry.register::<Target>();

        registry.register::<Received>();
        registry.register::<Accepted>();
        registry.register::<Rejected>();
        registry.register::<Released>();
        registry.register::<Modified>();

        registry.register::<crate::definitions::Error>();

        registry.register::<SaslMechanisms>();
        registry.register::<SaslInit>();
        registry.register::<SaslChallenge>();
        registry.register::<SaslResponse>();
        registry.register::<SaslOutcome>();

        registry
    }

    /// Dispatches a decoded described value to its registered decoder.
    ///
    /// Unknown descriptors return [`AmqpComposite::Unknown`] rather than
    /// failing.
    pub fn dispatch(&self, described: Described<Value>) -> Result<AmqpComposite, Error> {
        let code = match &described.descriptor {
            Descriptor::Code(code) => Some(*code),
            Descriptor::Symbol(symbol) => self.by_symbol.get(symbol.as_str()).copied(),
        };
        match code.and_then(|code| self.by_code.get(&code)) {
            Some(decode) => decode(described),
            None => Ok(AmqpComposite::Unknown(described)),
        }
    }

    /// Reads one described value from the decoder and dispatches it.
    pub fn read_object(&self, decoder: &mut Decoder<'_>) -> Result<AmqpComposite, Error> {
        match decoder.read_value()? {
            Value::Described(described) => self.dispatch(*described),
            _ => Err(Error::InvalidValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AmqpComposite, TypeRegistry};
    use crate::composite::DescribedType;
    use crate::decode::Decoder;
    use crate::described::Described;
    use crate::encode::to_vec;
    use crate::performatives::{Open, Performative};
    use crate::value::Value;

    #[test]
    fn numeric_and_symbolic_descriptors_are_aliases() {
        let registry = TypeRegistry::core();
        let open = Open {
            container_id: "c1".to_string(),
            ..Default::default()
        };

        // numeric form
        let buf = to_vec(&open.to_value()).unwrap();
        let mut decoder = Decoder::new(&buf);
        let composite = registry.read_object(&mut decoder).unwrap();
        assert!(matches!(composite, AmqpComposite::Open(_)));

        // symbolic form
        let described = Described::new(Open::DESCRIPTOR_SYMBOL, open.to_body());
        let buf = to_vec(&Value::from(described)).unwrap();
        let mut decoder = Decoder::new(&buf);
        let composite = registry.read_object(&mut decoder).unwrap();
        let performative = composite.into_performative().unwrap();
        assert!(matches!(performative, Performative::Open(p) if p.container_id == "c1"));
    }

    #[test]
    fn unknown_descriptor_does_not_fail() {
        let registry = TypeRegistry::core();
        let described = Described::new(0xdead_beefu64, Value::from("opaque"));
        let buf = to_vec(&Value::from(described.clone())).unwrap();
        let mut decoder = Decoder::new(&buf);
        match registry.read_object(&mut decoder).unwrap() {
            AmqpComposite::Unknown(unknown) => assert_eq!(unknown, described),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }
}
