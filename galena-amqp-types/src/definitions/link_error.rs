use crate::primitives::Symbol;

/// 2.8.18 Link Error
///
/// Symbols used to indicate link error conditions.
/// <type name="link-error" class="restricted" source="symbol" provides="error-condition">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// An operator intervened to detach for some reason.
    DetachForced,
    /// The peer sent more message transfers than currently allowed on the
    /// link.
    TransferLimitExceeded,
    /// The peer sent a larger message than is supported on the link.
    MessageSizeExceeded,
    /// The address provided cannot be resolved to a terminus at the current
    /// container.
    Redirect,
    /// The link has been attached elsewhere, causing the existing
    /// attachment to be forcibly closed.
    Stolen,
}

impl From<LinkError> for Symbol {
    fn from(value: LinkError) -> Self {
        let s = match value {
            LinkError::DetachForced => "amqp:link:detach-forced",
            LinkError::TransferLimitExceeded => "amqp:link:transfer-limit-exceeded",
            LinkError::MessageSizeExceeded => "amqp:link:message-size-exceeded",
            LinkError::Redirect => "amqp:link:redirect",
            LinkError::Stolen => "amqp:link:stolen",
        };
        Symbol::from(s)
    }
}

impl<'a> TryFrom<&'a str> for LinkError {
    type Error = &'a str;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        let val = match value {
            "amqp:link:detach-forced" => LinkError::DetachForced,
            "amqp:link:transfer-limit-exceeded" => LinkError::TransferLimitExceeded,
            "amqp:link:message-size-exceeded" => LinkError::MessageSizeExceeded,
            "amqp:link:redirect" => LinkError::Redirect,
            "amqp:link:stolen" => LinkError::Stolen,
            _ => return Err(value),
        };
        Ok(val)
    }
}
