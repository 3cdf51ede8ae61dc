//! Client-side SASL profiles.
//!
//! Only the mechanisms with no challenge round are provided: ANONYMOUS
//! and PLAIN. The negotiation state machine lives in
//! [`negotiate_sasl`](crate::transport::negotiate_sasl).

use galena_amqp_types::primitives::{Binary, Symbol};
use galena_amqp_types::sasl::{SaslChallenge, SaslInit, SaslMechanisms, SaslResponse};

pub(crate) const ANONYMOUS: &str = "ANONYMOUS";
pub(crate) const PLAIN: &str = "PLAIN";

/// A SASL mechanism the client can offer.
#[derive(Debug, Clone)]
pub enum SaslProfile {
    /// The ANONYMOUS mechanism
    Anonymous,
    /// The PLAIN mechanism with username and password
    Plain {
        /// The authentication identity
        username: String,
        /// The password
        password: String,
    },
}

impl SaslProfile {
    fn mechanism(&self) -> Symbol {
        match self {
            SaslProfile::Anonymous => Symbol::from(ANONYMOUS),
            SaslProfile::Plain { .. } => Symbol::from(PLAIN),
        }
    }

    fn initial_response(&self) -> Option<Binary> {
        match self {
            SaslProfile::Anonymous => None,
            SaslProfile::Plain { username, password } => {
                let mut bytes = Vec::with_capacity(username.len() + password.len() + 2);
                bytes.push(0);
                bytes.extend_from_slice(username.as_bytes());
                bytes.push(0);
                bytes.extend_from_slice(password.as_bytes());
                Some(Binary::from(bytes))
            }
        }
    }

    /// Picks this profile's mechanism out of the advertised list and
    /// builds the Init frame, or `None` if the server does not offer it.
    pub(crate) fn on_mechanisms(
        &mut self,
        mechanisms: &SaslMechanisms,
        hostname: Option<&str>,
    ) -> Option<SaslInit> {
        let wanted = self.mechanism();
        let offered = mechanisms
            .sasl_server_mechanisms
            .iter()
            .any(|m| m.as_str() == wanted.as_str());
        if !offered {
            return None;
        }
        Some(SaslInit {
            mechanism: wanted,
            initial_response: self.initial_response(),
            hostname: hostname.map(String::from),
        })
    }

    /// Neither ANONYMOUS nor PLAIN expects a challenge; answer with an
    /// empty response and let the server decide.
    pub(crate) fn on_challenge(&mut self, _challenge: &SaslChallenge) -> SaslResponse {
        SaslResponse {
            response: Binary::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use galena_amqp_types::primitives::{Array, Symbol};
    use galena_amqp_types::sasl::SaslMechanisms;

    use super::SaslProfile;

    #[test]
    fn plain_initial_response_layout() {
        let mut profile = SaslProfile::Plain {
            username: "guest".to_string(),
            password: "secret".to_string(),
        };
        let mechanisms = SaslMechanisms {
            sasl_server_mechanisms: Array(vec![Symbol::from("PLAIN")]),
        };
        let init = profile.on_mechanisms(&mechanisms, Some("localhost")).unwrap();
        assert_eq!(init.mechanism.as_str(), "PLAIN");
        assert_eq!(
            init.initial_response.unwrap().as_slice(),
            b"\x00guest\x00secret"
        );
    }

    #[test]
    fn unoffered_mechanism_yields_none() {
        let mut profile = SaslProfile::Anonymous;
        let mechanisms = SaslMechanisms {
            sasl_server_mechanisms: Array(vec![Symbol::from("SCRAM-SHA-256")]),
        };
        assert!(profile.on_mechanisms(&mechanisms, None).is_none());
    }
}
