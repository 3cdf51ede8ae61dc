//! A scripted mock peer for driving the engine through an in-memory
//! duplex pipe.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::DuplexStream;

use galena_amqp::connection::ConnectionState;
use galena_amqp::frames::amqp::{Frame, FrameBody};
use galena_amqp::transport::protocol_header::ProtocolHeader;
use galena_amqp::transport::Transport;
use galena_amqp_types::definitions::Handle;
use galena_amqp_types::performatives::{Attach, Begin, Open};

pub const PEER_MAX_FRAME_SIZE: usize = 65_536;

pub struct MockPeer {
    pub transport: Transport<DuplexStream>,
}

#[allow(dead_code)]
impl MockPeer {
    /// Accepts the client's protocol header and Open, answering with
    /// `open`.
    pub async fn accept(mut io: DuplexStream, open: Open) -> Self {
        let mut state = ConnectionState::Start;
        let header = ProtocolHeader::amqp();
        Transport::recv_proto_header(&mut io, &mut state, &header)
            .await
            .unwrap();
        Transport::send_proto_header(&mut io, &mut state, header)
            .await
            .unwrap();

        let registry = Arc::new(galena_amqp_types::registry::TypeRegistry::core());
        let mut transport = Transport::bind(io, registry, PEER_MAX_FRAME_SIZE, None);

        let frame = transport.next().await.unwrap().unwrap();
        match frame.body {
            FrameBody::Open(_) => {}
            other => panic!("expected Open, got {:?}", other),
        }
        transport
            .send(Frame::new(0u16, FrameBody::Open(open)))
            .await
            .unwrap();

        Self { transport }
    }

    /// A peer Open with the given idle timeout.
    pub fn open_performative(idle_time_out: Option<u32>) -> Open {
        Open {
            container_id: "mock-peer".to_string(),
            max_frame_size: (PEER_MAX_FRAME_SIZE as u32).into(),
            idle_time_out,
            ..Default::default()
        }
    }

    /// The next non-heartbeat frame.
    pub async fn next_frame(&mut self) -> Frame {
        loop {
            let frame = self
                .transport
                .next()
                .await
                .expect("transport closed")
                .expect("frame error");
            if matches!(frame.body, FrameBody::Empty) {
                continue;
            }
            return frame;
        }
    }

    pub async fn send(&mut self, channel: u16, body: FrameBody) {
        self.transport
            .send(Frame::new(channel, body))
            .await
            .unwrap();
    }

    /// Answers the client's Begin on peer channel 0 and returns the
    /// client's channel.
    pub async fn accept_begin(&mut self) -> u16 {
        let frame = self.next_frame().await;
        let client_channel = frame.channel;
        match frame.body {
            FrameBody::Begin(_) => {}
            other => panic!("expected Begin, got {:?}", other),
        }
        let reply = Begin {
            remote_channel: Some(client_channel),
            next_outgoing_id: 0,
            incoming_window: 5_000,
            outgoing_window: 5_000,
            handle_max: Handle::default(),
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send(0, FrameBody::Begin(reply)).await;
        client_channel
    }

    /// Answers the client's Attach by mirroring its termini, and returns
    /// the client's Attach.
    pub async fn accept_attach(&mut self) -> Attach {
        let frame = self.next_frame().await;
        let attach = match frame.body {
            FrameBody::Attach(attach) => attach,
            other => panic!("expected Attach, got {:?}", other),
        };
        let role = match attach.role.is_sender() {
            true => galena_amqp_types::definitions::Role::Receiver,
            false => galena_amqp_types::definitions::Role::Sender,
        };
        let reply = Attach {
            name: attach.name.clone(),
            handle: Handle(0),
            role,
            snd_settle_mode: attach.snd_settle_mode,
            rcv_settle_mode: attach.rcv_settle_mode,
            source: attach
                .source
                .clone()
                .or_else(|| Some(Default::default())),
            target: attach
                .target
                .clone()
                .or_else(|| Some(Default::default())),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: match role.is_sender() {
                true => Some(0),
                false => None,
            },
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send(0, FrameBody::Attach(reply)).await;
        attach
    }

    /// Completes the client-initiated Close handshake.
    pub async fn accept_close(&mut self) {
        let frame = self.next_frame().await;
        match frame.body {
            FrameBody::Close(_) => {}
            other => panic!("expected Close, got {:?}", other),
        }
        self.send(0, FrameBody::Close(Default::default())).await;
    }

    /// Completes the client-initiated End handshake.
    pub async fn accept_end(&mut self) {
        let frame = self.next_frame().await;
        match frame.body {
            FrameBody::End(_) => {}
            other => panic!("expected End, got {:?}", other),
        }
        self.send(0, FrameBody::End(Default::default())).await;
    }

    /// Completes the client-initiated Detach handshake.
    pub async fn accept_detach(&mut self) {
        let frame = self.next_frame().await;
        let detach = match frame.body {
            FrameBody::Detach(detach) => detach,
            other => panic!("expected Detach, got {:?}", other),
        };
        let reply = galena_amqp_types::performatives::Detach {
            handle: Handle(0),
            closed: detach.closed,
            error: None,
        };
        self.send(0, FrameBody::Detach(reply)).await;
    }
}
