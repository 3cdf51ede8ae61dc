use bytes::BytesMut;

use crate::composite::DescribedType;
use crate::encode::Encoder;
use crate::error::Error;
use crate::registry::{AmqpComposite, TypeRegistry};
use crate::value::Value;

use super::{
    AmqpSequence, AmqpValue, ApplicationProperties, Data, DeliveryAnnotations, Footer, Header,
    MessageAnnotations, Properties,
};

/// 3.2 Message Format
///
/// An annotated message: the optional transport and delivery sections
/// around the bare message body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Transport headers
    pub header: Option<Header>,
    /// Delivery annotations for the transport layers
    pub delivery_annotations: Option<DeliveryAnnotations>,
    /// Message annotations propagated with the message
    pub message_annotations: Option<MessageAnnotations>,
    /// Immutable bare-message properties
    pub properties: Option<Properties>,
    /// Structured application data
    pub application_properties: Option<ApplicationProperties>,
    /// The body sections
    pub body: Body,
    /// Transport footers
    pub footer: Option<Footer>,
}

/// The body of a message: one or more data sections, one or more sequence
/// sections, or a single amqp-value section.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body section at all
    #[default]
    Empty,
    /// One or more data sections
    Data(Vec<Data>),
    /// One or more amqp-sequence sections
    Sequence(Vec<AmqpSequence>),
    /// A single amqp-value section
    Value(AmqpValue),
}

impl Message {
    /// A message with a single amqp-value body.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            body: Body::Value(AmqpValue(value.into())),
            ..Default::default()
        }
    }

    /// A message with a single data-section body.
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Body::Data(vec![Data::from(bytes.into())]),
            ..Default::default()
        }
    }

    /// The body sections.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The concatenated bytes of a data body, if this message has one.
    pub fn body_data(&self) -> Option<Vec<u8>> {
        match &self.body {
            Body::Data(sections) => Some(
                sections
                    .iter()
                    .flat_map(|d| d.as_slice().iter().copied())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// The value of an amqp-value body, if this message has one.
    pub fn body_value(&self) -> Option<&Value> {
        match &self.body {
            Body::Value(AmqpValue(value)) => Some(value),
            _ => None,
        }
    }

    /// Encodes the message sections in order into `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut encoder = Encoder::new(buf);
        if let Some(header) = &self.header {
            encoder.write_value(&header.to_value())?;
        }
        if let Some(section) = &self.delivery_annotations {
            encoder.write_value(&section.to_value())?;
        }
        if let Some(section) = &self.message_annotations {
            encoder.write_value(&section.to_value())?;
        }
        if let Some(section) = &self.properties {
            encoder.write_value(&section.to_value())?;
        }
        if let Some(section) = &self.application_properties {
            encoder.write_value(&section.to_value())?;
        }
        match &self.body {
            Body::Empty => {}
            Body::Data(sections) => {
                for section in sections {
                    encoder.write_value(&section.to_value())?;
                }
            }
            Body::Sequence(sections) => {
                for section in sections {
                    encoder.write_value(&section.to_value())?;
                }
            }
            Body::Value(section) => encoder.write_value(&section.to_value())?,
        }
        if let Some(footer) = &self.footer {
            encoder.write_value(&footer.to_value())?;
        }
        Ok(())
    }

    /// Encodes the message to a fresh payload.
    pub fn encode(&self) -> Result<bytes::Bytes, Error> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decodes a message from a complete delivery payload.
    ///
    /// Sections with unknown descriptors are skipped; anything that is not
    /// a section is a decode error.
    pub fn decode(registry: &TypeRegistry, payload: &[u8]) -> Result<Self, Error> {
        let mut decoder = crate::decode::Decoder::new(payload);
        let mut message = Message::default();
        while decoder.has_remaining() {
            match registry.read_object(&mut decoder)? {
                AmqpComposite::Header(section) => message.header = Some(section),
                AmqpComposite::DeliveryAnnotations(section) => {
                    message.delivery_annotations = Some(section)
                }
                AmqpComposite::MessageAnnotations(section) => {
                    message.message_annotations = Some(section)
                }
                AmqpComposite::Properties(section) => message.properties = Some(section),
                AmqpComposite::ApplicationProperties(section) => {
                    message.application_properties = Some(section)
                }
                AmqpComposite::Data(section) => match &mut message.body {
                    Body::Data(sections) => sections.push(section),
                    Body::Empty => message.body = Body::Data(vec![section]),
                    _ => return Err(Error::InvalidValue),
                },
                AmqpComposite::AmqpSequence(section) => match &mut message.body {
                    Body::Sequence(sections) => sections.push(section),
                    Body::Empty => message.body = Body::Sequence(vec![section]),
                    _ => return Err(Error::InvalidValue),
                },
                AmqpComposite::AmqpValue(section) => match &message.body {
                    Body::Empty => message.body = Body::Value(section),
                    _ => return Err(Error::InvalidValue),
                },
                AmqpComposite::Footer(section) => message.footer = Some(section),
                AmqpComposite::Unknown(_) => {}
                _ => return Err(Error::InvalidValue),
            }
        }
        Ok(message)
    }
}

impl From<&str> for Message {
    fn from(val: &str) -> Self {
        Message::value(val)
    }
}

impl From<String> for Message {
    fn from(val: String) -> Self {
        Message::value(val)
    }
}

impl From<Value> for Message {
    fn from(val: Value) -> Self {
        Message::value(val)
    }
}

#[cfg(test)]
mod tests {
    use super::{Body, Message};
    use crate::messaging::{Data, Header, Properties};
    use crate::registry::TypeRegistry;
    use crate::value::Value;

    #[test]
    fn value_body_round_trip() {
        let registry = TypeRegistry::core();
        let message = Message::from("hello");
        let payload = message.encode().unwrap();
        let decoded = Message::decode(&registry, &payload).unwrap();
        assert_eq!(decoded.body_value(), Some(&Value::from("hello")));
    }

    #[test]
    fn sections_round_trip_in_order() {
        let registry = TypeRegistry::core();
        let message = Message {
            header: Some(Header {
                durable: true,
                ..Default::default()
            }),
            properties: Some(Properties {
                subject: Some("greeting".to_string()),
                ..Default::default()
            }),
            body: Body::Data(vec![Data::from(b"hello".to_vec())]),
            ..Default::default()
        };
        let payload = message.encode().unwrap();
        let decoded = Message::decode(&registry, &payload).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.body_data().unwrap(), b"hello");
    }

    #[test]
    fn multiple_data_sections_concatenate() {
        let registry = TypeRegistry::core();
        let message = Message {
            body: Body::Data(vec![
                Data::from(b"AAAAA".to_vec()),
                Data::from(b"BBBBB".to_vec()),
            ]),
            ..Default::default()
        };
        let payload = message.encode().unwrap();
        let decoded = Message::decode(&registry, &payload).unwrap();
        assert_eq!(decoded.body_data().unwrap(), b"AAAAABBBBB");
    }
}
