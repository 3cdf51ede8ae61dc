//! SASL frame bodies defined in AMQP 1.0 specification Part 5.3

use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::error::Error;
use crate::primitives::{Array, Binary, Symbol};
use crate::value::Value;

/// 5.3.3.1 SASL Mechanisms
///
/// Advertise available sasl mechanisms.
/// <type name="sasl-mechanisms" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-mechanisms:list" code="0x00000000:0x00000040"/>
/// </type>
#[derive(Debug, Clone, Default)]
pub struct SaslMechanisms {
    /// <field name="sasl-server-mechanisms" type="symbol" multiple="true" mandatory="true"/>
    pub sasl_server_mechanisms: Array<Symbol>,
}

impl DescribedType for SaslMechanisms {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0040;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:sasl-mechanisms:list";

    fn to_body(&self) -> Value {
        Value::List(vec![Value::from(self.sasl_server_mechanisms.clone())])
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            sasl_server_mechanisms: fields.required("sasl-server-mechanisms")?,
        })
    }
}

/// 5.3.3.2 SASL Init
///
/// Initiate sasl exchange.
/// <type name="sasl-init" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-init:list" code="0x00000000:0x00000041"/>
/// </type>
#[derive(Debug, Clone)]
pub struct SaslInit {
    /// <field name="mechanism" type="symbol" mandatory="true"/>
    pub mechanism: Symbol,

    /// <field name="initial-response" type="binary"/>
    pub initial_response: Option<Binary>,

    /// <field name="hostname" type="string"/>
    pub hostname: Option<String>,
}

impl DescribedType for SaslInit {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0041;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:sasl-init:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::Symbol(self.mechanism.clone()),
            Value::from(self.initial_response.clone()),
            Value::from(self.hostname.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            mechanism: fields.required("mechanism")?,
            initial_response: fields.optional()?,
            hostname: fields.optional()?,
        })
    }
}

/// 5.3.3.3 SASL Challenge
///
/// Security mechanism challenge.
/// <type name="sasl-challenge" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-challenge:list" code="0x00000000:0x00000042"/>
/// </type>
#[derive(Debug, Clone)]
pub struct SaslChallenge {
    /// <field name="challenge" type="binary" mandatory="true"/>
    pub challenge: Binary,
}

impl DescribedType for SaslChallenge {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0042;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:sasl-challenge:list";

    fn to_body(&self) -> Value {
        Value::List(vec![Value::Binary(self.challenge.clone())])
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            challenge: fields.required("challenge")?,
        })
    }
}

/// 5.3.3.4 SASL Response
///
/// Security mechanism response.
/// <type name="sasl-response" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-response:list" code="0x00000000:0x00000043"/>
/// </type>
#[derive(Debug, Clone)]
pub struct SaslResponse {
    /// <field name="response" type="binary" mandatory="true"/>
    pub response: Binary,
}

impl DescribedType for SaslResponse {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0043;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:sasl-response:list";

    fn to_body(&self) -> Value {
        Value::List(vec![Value::Binary(self.response.clone())])
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            response: fields.required("response")?,
        })
    }
}

/// 5.3.3.5 SASL Outcome
///
/// Indicates the outcome of the sasl dialog.
/// <type name="sasl-outcome" class="composite" source="list" provides="sasl-frame">
///     <descriptor name="amqp:sasl-outcome:list" code="0x00000000:0x00000044"/>
/// </type>
#[derive(Debug, Clone)]
pub struct SaslOutcome {
    /// <field name="code" type="sasl-code" mandatory="true"/>
    pub code: SaslCode,

    /// <field name="additional-data" type="binary"/>
    pub additional_data: Option<Binary>,
}

impl DescribedType for SaslOutcome {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0044;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:sasl-outcome:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.code),
            Value::from(self.additional_data.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            code: fields.required("code")?,
            additional_data: fields.optional()?,
        })
    }
}

/// 5.3.3.6 SASL Code
///
/// Codes to indicate the outcome of the sasl dialog.
/// <type name="sasl-code" class="restricted" source="ubyte">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslCode {
    /// <choice name="ok" value="0"/> Connection authentication succeeded.
    Ok,
    /// <choice name="auth" value="1"/> Due to unspecified credential problems.
    Auth,
    /// <choice name="sys" value="2"/> Due to a system error.
    Sys,
    /// <choice name="sys-perm" value="3"/> A permanent system error.
    SysPerm,
    /// <choice name="sys-temp" value="4"/> A transient system error.
    SysTemp,
}

impl From<SaslCode> for u8 {
    fn from(code: SaslCode) -> Self {
        match code {
            SaslCode::Ok => 0,
            SaslCode::Auth => 1,
            SaslCode::Sys => 2,
            SaslCode::SysPerm => 3,
            SaslCode::SysTemp => 4,
        }
    }
}

impl From<SaslCode> for Value {
    fn from(code: SaslCode) -> Self {
        Value::UByte(code.into())
    }
}

impl TryFrom<Value> for SaslCode {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let code = match u8::try_from(value)? {
            0 => SaslCode::Ok,
            1 => SaslCode::Auth,
            2 => SaslCode::Sys,
            3 => SaslCode::SysPerm,
            4 => SaslCode::SysTemp,
            _ => return Err(Error::InvalidValue),
        };
        Ok(code)
    }
}

/// Any SASL frame body.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum SaslFrameBody {
    Mechanisms(SaslMechanisms),
    Init(SaslInit),
    Challenge(SaslChallenge),
    Response(SaslResponse),
    Outcome(SaslOutcome),
}

impl From<SaslFrameBody> for Value {
    fn from(body: SaslFrameBody) -> Self {
        match body {
            SaslFrameBody::Mechanisms(b) => b.to_value(),
            SaslFrameBody::Init(b) => b.to_value(),
            SaslFrameBody::Challenge(b) => b.to_value(),
            SaslFrameBody::Response(b) => b.to_value(),
            SaslFrameBody::Outcome(b) => b.to_value(),
        }
    }
}
