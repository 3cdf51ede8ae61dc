//! The connection engine: one task that owns the transport and the
//! connection state machine, multiplexing session frames over channels.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use galena_amqp_types::definitions::Error as WireError;
use galena_amqp_types::performatives::{Begin, Close, Open};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::connection::heartbeat::HeartBeat;
use crate::connection::{Connection, ConnectionState};
use crate::control::ConnectionControl;
use crate::error::EngineError;
use crate::frames::amqp::{Frame, FrameBody};
use crate::session::frame::{SessionFrame, SessionFrameBody};
use crate::transport::Transport;
use crate::util::Running;

pub(crate) struct ConnectionEngine<Io> {
    transport: Transport<Io>,
    connection: Connection,
    control: tokio::sync::mpsc::Receiver<ConnectionControl>,
    outgoing_session_frames: tokio::sync::mpsc::Receiver<SessionFrame>,
    heartbeat: HeartBeat,
}

impl<Io> std::fmt::Debug for ConnectionEngine<Io> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("local_state", &self.connection.local_state)
            .finish()
    }
}

impl<Io> ConnectionEngine<Io>
where
    Io: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Performs the Open handshake and returns the engine ready to run.
    pub(crate) async fn open(
        mut transport: Transport<Io>,
        mut connection: Connection,
        control: tokio::sync::mpsc::Receiver<ConnectionControl>,
        outgoing_session_frames: tokio::sync::mpsc::Receiver<SessionFrame>,
    ) -> Result<Self, EngineError> {
        // send our Open
        let open = connection.local_open.clone();
        transport.send(Frame::new(0u16, FrameBody::Open(open))).await?;
        match connection.local_state {
            ConnectionState::HeaderExchange => connection.local_state = ConnectionState::OpenSent,
            ConnectionState::HeaderSent => connection.local_state = ConnectionState::OpenPipe,
            state => return Err(EngineError::UnexpectedConnectionState(state)),
        }

        // wait for the remote Open
        let frame = loop {
            match transport.next().await {
                Some(frame) => break frame?,
                None => return Err(EngineError::ControlChannelClosed),
            }
        };
        let remote_open = match frame.body {
            FrameBody::Open(open) => open,
            _ => return Err(EngineError::FramingError),
        };

        let mut engine = Self {
            transport,
            connection,
            control,
            outgoing_session_frames,
            heartbeat: HeartBeat::never(),
        };
        engine.handle_remote_open(remote_open)?;
        Ok(engine)
    }

    /// Applies the remote Open: negotiated frame size, heartbeat period.
    fn handle_remote_open(&mut self, remote_open: Open) -> Result<(), EngineError> {
        let remote_idle_timeout = remote_open.idle_time_out;
        self.connection.on_incoming_open(remote_open)?;

        self.transport
            .set_max_frame_size(self.connection.agreed_max_frame_size);

        // heartbeat at no more than half the remote idle timeout
        self.heartbeat = match remote_idle_timeout {
            Some(millis) if millis > 0 => {
                HeartBeat::new(Duration::from_millis(millis as u64 / 2))
            }
            _ => HeartBeat::never(),
        };
        Ok(())
    }

    pub(crate) fn agreed_max_frame_size(&self) -> usize {
        self.connection.agreed_max_frame_size
    }

    pub(crate) fn spawn(self) -> JoinHandle<Result<(), EngineError>> {
        tokio::spawn(self.event_loop())
    }

    async fn event_loop(mut self) -> Result<(), EngineError> {
        let result = loop {
            let result = tokio::select! {
                _ = self.heartbeat.next() => self.on_heartbeat().await,
                incoming = self.transport.next() => match incoming {
                    Some(incoming) => self.on_incoming(incoming).await,
                    None => break Err(EngineError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "transport closed by peer",
                    ))),
                },
                control = self.control.recv() => match control {
                    Some(control) => self.on_control(control).await,
                    None => break Err(EngineError::ControlChannelClosed),
                },
                outgoing = self.outgoing_session_frames.recv() => match outgoing {
                    Some(frame) => self.on_outgoing_session_frame(frame).await,
                    None => break Err(EngineError::ControlChannelClosed),
                },
            };

            match result {
                Ok(Running::Continue) => {}
                Ok(Running::Stop) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        if let Err(err) = &result {
            error!(%err, "connection engine failed");
            self.close_with_engine_error(err).await;
        }

        // dropping the session channels fails every session, which in
        // turn fails every link and pending delivery
        self.connection.local_sessions.clear();
        debug!("connection engine stopped");
        result
    }

    /// Best-effort Close carrying the error's condition.
    async fn close_with_engine_error(&mut self, err: &EngineError) {
        let can_close = matches!(
            self.connection.local_state,
            ConnectionState::Opened | ConnectionState::OpenReceived | ConnectionState::OpenSent
        );
        if !can_close {
            return;
        }
        let error = err
            .error_condition()
            .map(|condition| WireError::new(condition, Some(err.to_string()), None));
        let close = Close { error };
        self.connection.local_state = ConnectionState::End;
        let _ = self
            .transport
            .send(Frame::new(0u16, FrameBody::Close(close)))
            .await;
    }

    /* ------------------------------- incoming ------------------------------ */

    #[instrument(skip_all)]
    async fn on_incoming(
        &mut self,
        frame: Result<Frame, EngineError>,
    ) -> Result<Running, EngineError> {
        let Frame { channel, body } = frame?;

        match body {
            FrameBody::Open(_) => {
                // both Opens were exchanged during the handshake
                Err(EngineError::UnexpectedConnectionState(
                    self.connection.local_state,
                ))
            }
            FrameBody::Begin(begin) => self.on_incoming_begin(channel, begin).await,
            FrameBody::Attach(attach) => {
                self.forward_to_session(channel, SessionFrameBody::Attach(attach))
                    .await
            }
            FrameBody::Flow(flow) => {
                self.forward_to_session(channel, SessionFrameBody::Flow(flow))
                    .await
            }
            FrameBody::Transfer {
                performative,
                payload,
            } => {
                self.forward_to_session(
                    channel,
                    SessionFrameBody::Transfer {
                        performative,
                        payload,
                    },
                )
                .await
            }
            FrameBody::Disposition(disposition) => {
                self.forward_to_session(channel, SessionFrameBody::Disposition(disposition))
                    .await
            }
            FrameBody::Detach(detach) => {
                self.forward_to_session(channel, SessionFrameBody::Detach(detach))
                    .await
            }
            FrameBody::End(end) => {
                self.forward_to_session(channel, SessionFrameBody::End(end))
                    .await
            }
            FrameBody::Close(close) => self.on_incoming_close(close).await,
            FrameBody::Empty => {
                trace!("heartbeat frame received");
                Ok(Running::Continue)
            }
        }
    }

    /// The remote Begin answers ours: `remote_channel` names the local
    /// channel we chose, and the frame's own channel becomes the
    /// session's incoming channel.
    async fn on_incoming_begin(
        &mut self,
        channel: u16,
        begin: Begin,
    ) -> Result<Running, EngineError> {
        let session_id = match begin.remote_channel {
            Some(local_channel) => local_channel as usize,
            // remotely-initiated sessions belong to the listener role
            None => return Err(EngineError::SessionNotFound(channel)),
        };
        if !self.connection.local_sessions.contains(session_id) {
            return Err(EngineError::SessionNotFound(channel));
        }
        self.connection
            .session_by_incoming_channel
            .insert(channel, session_id);

        let tx = self.connection.local_sessions[session_id].clone();
        let frame = SessionFrame::new(channel, SessionFrameBody::Begin(begin));
        tx.send(frame)
            .await
            .map_err(|_| EngineError::SessionNotFound(channel))?;
        Ok(Running::Continue)
    }

    async fn forward_to_session(
        &mut self,
        channel: u16,
        body: SessionFrameBody,
    ) -> Result<Running, EngineError> {
        let session_id = self
            .connection
            .session_by_incoming_channel
            .get(&channel)
            .copied()
            .ok_or(EngineError::SessionNotFound(channel))?;
        let tx = self
            .connection
            .local_sessions
            .get(session_id)
            .ok_or(EngineError::SessionNotFound(channel))?
            .clone();
        if tx
            .send(SessionFrame::new(channel, body))
            .await
            .is_err()
        {
            trace!(channel, "session engine stopped; frame dropped");
        }
        Ok(Running::Continue)
    }

    async fn on_incoming_close(&mut self, close: Close) -> Result<Running, EngineError> {
        match self.connection.local_state {
            ConnectionState::Opened => {
                // remote-initiated close: echo a Close and stop
                self.connection.local_state = ConnectionState::CloseReceived;
                self.transport
                    .send(Frame::new(0u16, FrameBody::Close(Close { error: None })))
                    .await?;
                self.connection.local_state = ConnectionState::End;
            }
            ConnectionState::CloseSent => {
                self.connection.local_state = ConnectionState::End;
            }
            state => return Err(EngineError::UnexpectedConnectionState(state)),
        }

        match close.error {
            Some(error) => Err(EngineError::Remote(error)),
            None => Ok(Running::Stop),
        }
    }

    /* ------------------------------- control ------------------------------- */

    async fn on_control(&mut self, control: ConnectionControl) -> Result<Running, EngineError> {
        match control {
            ConnectionControl::Close(error) => {
                match self.connection.local_state {
                    ConnectionState::Opened => {
                        self.connection.local_state = ConnectionState::CloseSent;
                        self.transport
                            .send(Frame::new(0u16, FrameBody::Close(Close { error })))
                            .await?;
                    }
                    // simultaneous local and remote close: already ended
                    ConnectionState::End => return Ok(Running::Stop),
                    state => return Err(EngineError::UnexpectedConnectionState(state)),
                }
                Ok(Running::Continue)
            }
            ConnectionControl::AllocateSession { tx, responder } => {
                let result = self.connection.allocate_session(tx);
                let _ = responder.send(result);
                Ok(Running::Continue)
            }
            ConnectionControl::DeallocateSession(session_id) => {
                self.connection.deallocate_session(session_id);
                Ok(Running::Continue)
            }
        }
    }

    /* ------------------------------ outgoing ------------------------------- */

    async fn on_outgoing_session_frame(
        &mut self,
        frame: SessionFrame,
    ) -> Result<Running, EngineError> {
        if self.connection.local_state != ConnectionState::Opened {
            // frames racing a close are dropped, not failed
            trace!("dropping outgoing session frame in non-opened state");
            return Ok(Running::Continue);
        }

        let SessionFrame { channel, body } = frame;
        let body = match body {
            SessionFrameBody::Begin(begin) => FrameBody::Begin(begin),
            SessionFrameBody::Attach(attach) => FrameBody::Attach(attach),
            SessionFrameBody::Flow(flow) => FrameBody::Flow(flow),
            SessionFrameBody::Transfer {
                performative,
                payload,
            } => FrameBody::Transfer {
                performative,
                payload,
            },
            SessionFrameBody::Disposition(disposition) => FrameBody::Disposition(disposition),
            SessionFrameBody::Detach(detach) => FrameBody::Detach(detach),
            SessionFrameBody::End(end) => FrameBody::End(end),
        };
        self.transport.send(Frame::new(channel, body)).await?;
        Ok(Running::Continue)
    }

    async fn on_heartbeat(&mut self) -> Result<Running, EngineError> {
        match self.connection.local_state {
            ConnectionState::Start | ConnectionState::CloseSent => return Ok(Running::Continue),
            ConnectionState::End => return Ok(Running::Stop),
            _ => {}
        }
        self.transport.send(Frame::empty()).await?;
        Ok(Running::Continue)
    }
}
