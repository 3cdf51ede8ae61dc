//! Connection-level protocol tests against a scripted mock peer.

mod common;

use std::time::Duration;

use futures_util::StreamExt;

use galena_amqp::error::EngineError;
use galena_amqp::frames::amqp::FrameBody;
use galena_amqp::Connection;
use galena_amqp_types::definitions::{AmqpError, ErrorCondition};

use common::MockPeer;

#[tokio::test]
async fn open_close_round_trip() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer =
            MockPeer::accept(server_io, MockPeer::open_performative(Some(30_000))).await;
        peer.accept_close().await;
    });

    let mut connection = Connection::builder()
        .container_id("open-close-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    connection.close().await.unwrap();

    peer.await.unwrap();
}

#[tokio::test]
async fn close_is_idempotent() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_close().await;
    });

    let mut connection = Connection::builder()
        .container_id("idempotent-close-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    connection.close().await.unwrap();
    // the second close must not hang or fail
    connection.close().await.unwrap();

    peer.await.unwrap();
}

#[tokio::test]
async fn simultaneous_close_resolves_both_sides() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        // close from the peer side without waiting for the client's Close
        peer.send(0, FrameBody::Close(Default::default())).await;
        // the client answers with its own Close
        let frame = peer.next_frame().await;
        assert!(matches!(frame.body, FrameBody::Close(_)));
    });

    let mut connection = Connection::builder()
        .container_id("simultaneous-close-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    // local close races the remote one; both must resolve cleanly
    connection.close().await.unwrap();

    peer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn heartbeats_flow_at_half_the_remote_idle_timeout() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    // the peer advertises a 1s idle timeout and then only listens
    let peer = tokio::spawn(async move {
        let mut peer =
            MockPeer::accept(server_io, MockPeer::open_performative(Some(1_000))).await;
        let frame = peer
            .transport
            .next()
            .await
            .expect("transport closed")
            .expect("frame error");
        assert!(matches!(frame.body, FrameBody::Empty));
    });

    let _connection = Connection::builder()
        .container_id("heartbeat-client")
        .open_with_stream(client_io)
        .await
        .unwrap();

    peer.await.unwrap();
}

#[tokio::test]
async fn sasl_plain_negotiation_precedes_the_open() {
    use galena_amqp::sasl_profile::SaslProfile;
    use galena_amqp::transport::protocol_header::ProtocolHeader;
    use galena_amqp_types::primitives::{Array, Symbol};
    use galena_amqp_types::sasl::{SaslCode, SaslFrameBody, SaslMechanisms, SaslOutcome};

    let (client_io, mut server_io) = tokio::io::duplex(16 * 1024);

    let peer = tokio::spawn(async move {
        use std::sync::Arc;

        use bytes::{Bytes, BytesMut};
        use futures_util::{SinkExt, StreamExt};
        use galena_amqp::frames::sasl::{SaslFrame, SaslFrameCodec};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio_util::codec::{Decoder, Encoder, Framed, LengthDelimitedCodec};

        // SASL header exchange
        let mut header = [0u8; 8];
        server_io.read_exact(&mut header).await.unwrap();
        assert_eq!(
            ProtocolHeader::try_from(header).unwrap(),
            ProtocolHeader::sasl()
        );
        let reply: [u8; 8] = ProtocolHeader::sasl().into();
        server_io.write_all(&reply).await.unwrap();

        let registry = Arc::new(galena_amqp_types::registry::TypeRegistry::core());
        let mut codec = SaslFrameCodec::new(registry);
        let mut framed = Framed::new(
            &mut server_io,
            LengthDelimitedCodec::builder()
                .big_endian()
                .length_field_length(4)
                .length_adjustment(-4)
                .new_codec(),
        );

        // advertise PLAIN, expect the init, accept
        let mechanisms = SaslMechanisms {
            sasl_server_mechanisms: Array(vec![Symbol::from("PLAIN")]),
        };
        let mut buf = BytesMut::new();
        codec
            .encode(SaslFrame::from(SaslFrameBody::Mechanisms(mechanisms)), &mut buf)
            .unwrap();
        framed.send(Bytes::from(buf)).await.unwrap();

        let mut src = framed.next().await.unwrap().unwrap();
        let frame = codec.decode(&mut src).unwrap().unwrap();
        let init = match frame.body {
            SaslFrameBody::Init(init) => init,
            other => panic!("expected Init, got {:?}", other),
        };
        assert_eq!(init.mechanism.as_str(), "PLAIN");
        assert_eq!(
            init.initial_response.unwrap().as_slice(),
            b"\x00guest\x00secret"
        );

        let outcome = SaslOutcome {
            code: SaslCode::Ok,
            additional_data: None,
        };
        let mut buf = BytesMut::new();
        codec
            .encode(SaslFrame::from(SaslFrameBody::Outcome(outcome)), &mut buf)
            .unwrap();
        framed.send(Bytes::from(buf)).await.unwrap();
        drop(framed);

        // then the regular AMQP open and close
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_close().await;
    });

    let mut connection = Connection::builder()
        .container_id("sasl-client")
        .sasl_profile(SaslProfile::Plain {
            username: "guest".to_string(),
            password: "secret".to_string(),
        })
        .open_with_stream(client_io)
        .await
        .unwrap();
    connection.close().await.unwrap();

    peer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_fails_the_connection() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    // the peer goes silent after the open handshake
    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        let frame = peer.next_frame().await;
        let close = match frame.body {
            FrameBody::Close(close) => close,
            other => panic!("expected Close, got {:?}", other),
        };
        let condition = close.error.expect("close must carry an error").condition;
        assert_eq!(
            condition,
            ErrorCondition::AmqpError(AmqpError::ResourceLimitExceeded)
        );
    });

    let mut connection = Connection::builder()
        .container_id("idle-timeout-client")
        .idle_time_out(1_000)
        .open_with_stream(client_io)
        .await
        .unwrap();

    // no inbound frame for longer than twice the local idle timeout
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let result = connection.close().await;
    assert!(matches!(result, Err(EngineError::IdleTimeoutElapsed)));

    peer.await.unwrap();
}
