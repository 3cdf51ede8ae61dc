//! Builder for a [`Connection`](super::Connection)

use std::sync::Arc;
use std::time::Duration;

use galena_amqp_types::definitions::{Fields, Milliseconds, MIN_MAX_FRAME_SIZE, PORT};
use galena_amqp_types::performatives::{ChannelMax, MaxFrameSize, Open};
use galena_amqp_types::primitives::{Array, Symbol};
use galena_amqp_types::registry::TypeRegistry;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use url::Url;

use crate::connection::engine::ConnectionEngine;
use crate::connection::{Connection, ConnectionHandle, ConnectionState};
use crate::error::OpenError;
use crate::sasl_profile::SaslProfile;
use crate::transport::protocol_header::ProtocolHeader;
use crate::transport::{negotiate_sasl, Transport};

/// Default max-frame-size proposed in the local Open.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 65_536;

const DEFAULT_CONTROL_BUFFER: usize = 128;

/// Builder for a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct Builder {
    /// The container-id sent in the local Open
    pub container_id: String,
    /// Hostname override; defaults to the url host
    pub hostname: Option<String>,
    /// The proposed max-frame-size
    pub max_frame_size: Option<MaxFrameSize>,
    /// The proposed channel-max
    pub channel_max: ChannelMax,
    /// The local idle-time-out in milliseconds
    pub idle_time_out: Option<Milliseconds>,
    /// Offered capabilities
    pub offered_capabilities: Option<Array<Symbol>>,
    /// Desired capabilities
    pub desired_capabilities: Option<Array<Symbol>>,
    /// Connection properties
    pub properties: Option<Fields>,
    /// SASL profile; inferred from url credentials when not set
    pub sasl_profile: Option<SaslProfile>,
}

impl Builder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container-id.
    pub fn container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self
    }

    /// Sets the hostname carried in the Open.
    pub fn hostname(mut self, hostname: impl Into<Option<String>>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Sets the proposed max-frame-size.
    pub fn max_frame_size(mut self, max_frame_size: impl Into<MaxFrameSize>) -> Self {
        self.max_frame_size = Some(max_frame_size.into());
        self
    }

    /// Sets the proposed channel-max.
    pub fn channel_max(mut self, channel_max: impl Into<ChannelMax>) -> Self {
        self.channel_max = channel_max.into();
        self
    }

    /// Sets the local idle-time-out in milliseconds.
    pub fn idle_time_out(mut self, millis: Milliseconds) -> Self {
        self.idle_time_out = Some(millis);
        self
    }

    /// Sets the offered capabilities.
    pub fn offered_capabilities(mut self, capabilities: Array<Symbol>) -> Self {
        self.offered_capabilities = Some(capabilities);
        self
    }

    /// Sets the desired capabilities.
    pub fn desired_capabilities(mut self, capabilities: Array<Symbol>) -> Self {
        self.desired_capabilities = Some(capabilities);
        self
    }

    /// Sets the connection properties.
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Sets the SASL profile explicitly.
    pub fn sasl_profile(mut self, profile: SaslProfile) -> Self {
        self.sasl_profile = Some(profile);
        self
    }

    /// Connects a TCP stream to the url and opens the connection over it.
    pub async fn open(mut self, url: impl AsRef<str>) -> Result<ConnectionHandle, OpenError> {
        let url = Url::parse(url.as_ref()).map_err(|_| OpenError::InvalidAddress)?;
        match url.scheme() {
            "amqp" => {}
            scheme => return Err(OpenError::UnsupportedScheme(scheme.to_string())),
        }
        let host = url.host_str().ok_or(OpenError::InvalidAddress)?.to_string();
        let port = url.port().unwrap_or(PORT);

        // url credentials select the PLAIN profile
        if self.sasl_profile.is_none() {
            if let Some(password) = url.password() {
                self.sasl_profile = Some(SaslProfile::Plain {
                    username: url.username().to_string(),
                    password: password.to_string(),
                });
            }
        }
        if self.hostname.is_none() {
            self.hostname = Some(host.clone());
        }

        let stream = TcpStream::connect((host.as_str(), port)).await?;
        self.open_with_stream(stream).await
    }

    /// Opens the connection over an already-connected byte stream.
    ///
    /// This is the transport seam: anything `AsyncRead + AsyncWrite`
    /// works, including an in-memory duplex pipe.
    pub async fn open_with_stream<Io>(self, mut io: Io) -> Result<ConnectionHandle, OpenError>
    where
        Io: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let registry = Arc::new(TypeRegistry::core());

        // SASL layer first, when configured
        if let Some(mut profile) = self.sasl_profile.clone() {
            negotiate_sasl(
                &mut io,
                registry.clone(),
                self.hostname.as_deref(),
                &mut profile,
            )
            .await?;
        }

        // AMQP protocol header exchange
        let mut local_state = ConnectionState::Start;
        Transport::negotiate(&mut io, &mut local_state, ProtocolHeader::amqp()).await?;

        // the engine must see a frame within twice the local idle timeout
        let idle_deadline = self
            .idle_time_out
            .filter(|millis| *millis > 0)
            .map(|millis| Duration::from_millis(millis as u64) * 2);
        let transport = Transport::bind(
            io,
            registry.clone(),
            MIN_MAX_FRAME_SIZE as usize,
            idle_deadline,
        );

        let local_open = Open {
            container_id: self.container_id,
            hostname: self.hostname,
            max_frame_size: self
                .max_frame_size
                .unwrap_or(MaxFrameSize(DEFAULT_MAX_FRAME_SIZE)),
            channel_max: self.channel_max,
            idle_time_out: self.idle_time_out,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: self.offered_capabilities,
            desired_capabilities: self.desired_capabilities,
            properties: self.properties,
        };
        let connection = Connection::new(local_state, local_open);

        let (control_tx, control_rx) = mpsc::channel(DEFAULT_CONTROL_BUFFER);
        let (session_frame_tx, session_frame_rx) = mpsc::channel(DEFAULT_CONTROL_BUFFER);

        let engine =
            ConnectionEngine::open(transport, connection, control_rx, session_frame_rx).await?;
        let max_frame_size = engine.agreed_max_frame_size();
        let engine_handle = engine.spawn();

        Ok(ConnectionHandle::new(
            control_tx,
            engine_handle,
            session_frame_tx,
            registry,
            max_frame_size,
        ))
    }
}
