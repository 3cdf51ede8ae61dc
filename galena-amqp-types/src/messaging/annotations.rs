use crate::composite::DescribedType;
use crate::error::Error;
use crate::value::Value;

use super::Annotations;

macro_rules! annotation_section {
    ($(#[$attr:meta])* $name:ident, $code:literal, $symbol:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name(pub Annotations);

        impl $name {
            /// Creates an empty section
            pub fn new() -> Self {
                Self(Annotations::new())
            }
        }

        impl From<Annotations> for $name {
            fn from(val: Annotations) -> Self {
                Self(val)
            }
        }

        impl DescribedType for $name {
            const DESCRIPTOR_CODE: u64 = $code;
            const DESCRIPTOR_SYMBOL: &'static str = $symbol;

            fn to_body(&self) -> Value {
                Value::from(self.0.clone())
            }

            fn from_body(value: Value) -> Result<Self, Error> {
                Annotations::try_from(value).map(Self)
            }
        }
    };
}

annotation_section! {
    /// 3.2.2 Delivery Annotations
    ///
    /// <type name="delivery-annotations" class="restricted" source="annotations" provides="section">
    ///     <descriptor name="amqp:delivery-annotations:map" code="0x00000000:0x00000071"/>
    /// </type>
    DeliveryAnnotations, 0x0000_0000_0000_0071, "amqp:delivery-annotations:map"
}

annotation_section! {
    /// 3.2.3 Message Annotations
    ///
    /// <type name="message-annotations" class="restricted" source="annotations" provides="section">
    ///     <descriptor name="amqp:message-annotations:map" code="0x00000000:0x00000072"/>
    /// </type>
    MessageAnnotations, 0x0000_0000_0000_0072, "amqp:message-annotations:map"
}

annotation_section! {
    /// 3.2.10 Footer
    ///
    /// Transport footers for a message.
    /// <type name="footer" class="restricted" source="annotations" provides="section">
    ///     <descriptor name="amqp:footer:map" code="0x00000000:0x00000078"/>
    /// </type>
    Footer, 0x0000_0000_0000_0078, "amqp:footer:map"
}
