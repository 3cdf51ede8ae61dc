//! Link-level tests against a scripted mock peer: sending, receiving,
//! reassembly, credit, and dispositions.

mod common;

use std::time::Duration;

use galena_amqp::error::EngineError;
use galena_amqp::frames::amqp::FrameBody;
use galena_amqp::link::AttachError;
use galena_amqp::{Connection, CreditMode, Receiver, Sender, Session};
use galena_amqp_types::definitions::{
    AmqpError, ErrorCondition, Handle, Role, SessionError,
};
use galena_amqp_types::messaging::{Accepted, DeliveryState, Message};
use galena_amqp_types::performatives::{Attach, Detach, Disposition, Flow, Transfer};
use galena_amqp_types::primitives::Binary;
use galena_amqp_types::registry::TypeRegistry;

use common::MockPeer;

fn link_flow(credit: u32, delivery_count: u32, drain: bool) -> Flow {
    Flow {
        next_incoming_id: Some(0),
        incoming_window: 5_000,
        next_outgoing_id: 0,
        outgoing_window: 5_000,
        handle: Some(Handle(0)),
        delivery_count: Some(delivery_count),
        link_credit: Some(credit),
        available: None,
        drain,
        echo: false,
        properties: None,
    }
}

#[tokio::test]
async fn single_frame_send_is_accepted() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        let attach = peer.accept_attach().await;
        assert!(attach.role.is_sender());

        // grant credit so the stalled send can proceed
        peer.send(0, FrameBody::Flow(link_flow(100, 0, false))).await;

        let frame = peer.next_frame().await;
        let (transfer, payload) = match frame.body {
            FrameBody::Transfer {
                performative,
                payload,
            } => (performative, payload),
            other => panic!("expected Transfer, got {:?}", other),
        };
        assert_eq!(transfer.delivery_id, Some(0));
        assert!(!transfer.more);

        let registry = TypeRegistry::core();
        let message = Message::decode(&registry, &payload).unwrap();
        assert_eq!(
            message.body_value(),
            Some(&galena_amqp_types::Value::from("hello"))
        );

        let disposition = Disposition {
            role: Role::Receiver,
            first: 0,
            last: Some(0),
            settled: true,
            state: Some(DeliveryState::Accepted(Accepted {})),
            batchable: false,
        };
        peer.send(0, FrameBody::Disposition(disposition)).await;

        peer.accept_detach().await;
        peer.accept_end().await;
        peer.accept_close().await;
    });

    let mut connection = Connection::builder()
        .container_id("send-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut sender = Sender::attach(&mut session, "sender-1", "q1").await.unwrap();

    let outcome = sender.send("hello").await.unwrap();
    assert!(outcome.is_accepted());

    sender.close().await.unwrap();
    session.end().await.unwrap();
    connection.close().await.unwrap();

    peer.await.unwrap();
}

#[tokio::test]
async fn presettled_send_settles_without_a_disposition() {
    use galena_amqp_types::definitions::SenderSettleMode;

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;
        peer.send(0, FrameBody::Flow(link_flow(10, 0, false))).await;

        let frame = peer.next_frame().await;
        match frame.body {
            FrameBody::Transfer { performative, .. } => {
                assert_eq!(performative.settled, Some(true));
            }
            other => panic!("expected Transfer, got {:?}", other),
        }
        // deliberately no disposition: a pre-settled delivery needs none
    });

    let mut connection = Connection::builder()
        .container_id("presettled-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut sender = Sender::builder()
        .name("sender-presettled")
        .target("q1")
        .sender_settle_mode(SenderSettleMode::Settled)
        .attach(&mut session)
        .await
        .unwrap();

    let outcome = sender.send("fire and forget").await.unwrap();
    assert!(outcome.is_accepted());

    peer.await.unwrap();
}

#[tokio::test]
async fn multi_frame_delivery_reassembles_in_order() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        let attach = peer.accept_attach().await;
        assert!(attach.role.is_receiver());

        // the credit window announces itself right after attach
        let frame = peer.next_frame().await;
        let flow = match frame.body {
            FrameBody::Flow(flow) => flow,
            other => panic!("expected Flow, got {:?}", other),
        };
        assert_eq!(flow.link_credit, Some(10));

        // a single delivery split over three transfer frames
        let payload = Message::data(b"AAAAABBBBBCCCCC".to_vec()).encode().unwrap();
        let third = payload.len() / 3;
        let chunks = [
            payload.slice(0..third),
            payload.slice(third..2 * third),
            payload.slice(2 * third..),
        ];

        let first = Transfer {
            handle: Handle(0),
            delivery_id: Some(0),
            delivery_tag: Some(Binary::from(&b"d0"[..])),
            message_format: Some(0),
            more: true,
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: first,
                payload: chunks[0].clone(),
            },
        )
        .await;

        let middle = Transfer {
            handle: Handle(0),
            delivery_id: Some(0), // continuation may repeat the id
            more: true,
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: middle,
                payload: chunks[1].clone(),
            },
        )
        .await;

        let last = Transfer {
            handle: Handle(0),
            more: false,
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: last,
                payload: chunks[2].clone(),
            },
        )
        .await;

        // the accept disposition settles delivery 0
        let frame = peer.next_frame().await;
        let disposition = match frame.body {
            FrameBody::Disposition(disposition) => disposition,
            other => panic!("expected Disposition, got {:?}", other),
        };
        assert!(disposition.role.is_receiver());
        assert!(disposition.settled);
        assert_eq!(disposition.range(), 0..=0);
        assert!(matches!(disposition.state, Some(state) if state.is_accepted()));

        // no further flow: 9 credits remaining is above the refill mark
        let extra = tokio::time::timeout(Duration::from_millis(100), peer.next_frame()).await;
        assert!(extra.is_err(), "unexpected extra frame {:?}", extra);

        payload
    });

    let mut connection = Connection::builder()
        .container_id("receive-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut receiver = Receiver::builder()
        .name("receiver-1")
        .source("q1")
        .credit_mode(CreditMode::Auto(10))
        .attach(&mut session)
        .await
        .unwrap();

    let delivery = receiver.recv().await.unwrap();
    assert_eq!(delivery.delivery_id(), 0);
    assert_eq!(delivery.body_data().unwrap(), b"AAAAABBBBBCCCCC");
    receiver.accept(&delivery).await.unwrap();

    let full_payload = peer.await.unwrap();
    // the reassembled payload is exactly the concatenation of the slices
    assert_eq!(delivery.raw_payload(), &full_payload);
}

#[tokio::test]
async fn aborted_delivery_is_discarded_without_consuming_credit() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;

        // manual credit arrives as one flow
        let frame = peer.next_frame().await;
        let flow = match frame.body {
            FrameBody::Flow(flow) => flow,
            other => panic!("expected Flow, got {:?}", other),
        };
        assert_eq!(flow.link_credit, Some(5));

        let first = Transfer {
            handle: Handle(0),
            delivery_id: Some(0),
            delivery_tag: Some(Binary::from(&b"d1"[..])),
            more: true,
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: first,
                payload: bytes::Bytes::from_static(b"X"),
            },
        )
        .await;

        let aborted = Transfer {
            handle: Handle(0),
            aborted: true,
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: aborted,
                payload: bytes::Bytes::new(),
            },
        )
        .await;
    });

    let mut connection = Connection::builder()
        .container_id("abort-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut receiver = Receiver::builder()
        .name("receiver-abort")
        .source("q1")
        .credit_mode(CreditMode::Manual)
        .attach(&mut session)
        .await
        .unwrap();
    receiver.set_credit(5).await.unwrap();

    // the aborted delivery never surfaces
    let received = receiver.recv_with_timeout(Duration::from_millis(100)).await.unwrap();
    assert!(received.is_none());
    assert_eq!(receiver.credit(), 5);

    peer.await.unwrap();
}

#[tokio::test]
async fn drain_resolves_when_credit_reaches_zero() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;

        // the manual credit grant
        let frame = peer.next_frame().await;
        match frame.body {
            FrameBody::Flow(flow) => assert_eq!(flow.link_credit, Some(5)),
            other => panic!("expected Flow, got {:?}", other),
        }

        // the drain request
        let frame = peer.next_frame().await;
        let flow = match frame.body {
            FrameBody::Flow(flow) => flow,
            other => panic!("expected Flow, got {:?}", other),
        };
        assert!(flow.drain);
        assert_eq!(flow.link_credit, Some(5));

        // consume no deliveries: advance delivery-count past the credit
        // and zero it out
        peer.send(0, FrameBody::Flow(link_flow(0, 5, true))).await;
    });

    let mut connection = Connection::builder()
        .container_id("drain-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut receiver = Receiver::builder()
        .name("receiver-drain")
        .source("q1")
        .credit_mode(CreditMode::Manual)
        .attach(&mut session)
        .await
        .unwrap();

    receiver.set_credit(5).await.unwrap();
    receiver.drain().await.unwrap();
    assert_eq!(receiver.credit(), 0);

    peer.await.unwrap();
}

#[tokio::test]
async fn add_credit_is_refused_under_a_credit_window() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;
        // initial window grant
        peer.next_frame().await;
    });

    let mut connection = Connection::builder()
        .container_id("credit-misuse-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut receiver = Receiver::builder()
        .name("receiver-auto")
        .source("q1")
        .credit_mode(CreditMode::Auto(10))
        .attach(&mut session)
        .await
        .unwrap();

    let result = receiver.add_credit(5).await;
    assert!(matches!(
        result,
        Err(galena_amqp::link::DrainError::AutoCreditMode)
    ));

    peer.await.unwrap();
}

#[tokio::test]
async fn remote_refusal_fails_the_attach() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;

        let frame = peer.next_frame().await;
        let attach = match frame.body {
            FrameBody::Attach(attach) => attach,
            other => panic!("expected Attach, got {:?}", other),
        };

        // refusal: answer with null termini, then a closing detach
        let refusal = Attach {
            name: attach.name.clone(),
            handle: Handle(0),
            role: Role::Receiver,
            source: None,
            target: None,
            snd_settle_mode: Default::default(),
            rcv_settle_mode: Default::default(),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: None,
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        peer.send(0, FrameBody::Attach(refusal)).await;
        let detach = Detach {
            handle: Handle(0),
            closed: true,
            error: Some(galena_amqp_types::definitions::Error::new(
                AmqpError::NotFound,
                Some("no such node".to_string()),
                None,
            )),
        };
        peer.send(0, FrameBody::Detach(detach)).await;
    });

    let mut connection = Connection::builder()
        .container_id("refusal-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();

    let result = Sender::attach(&mut session, "sender-refused", "nowhere").await;
    match result {
        Err(AttachError::Refused(Some(error))) => {
            assert_eq!(
                error.condition,
                ErrorCondition::AmqpError(AmqpError::NotFound)
            );
        }
        other => panic!("expected refusal, got {:?}", other),
    }

    peer.await.unwrap();
}

#[tokio::test]
async fn oversized_outgoing_delivery_is_split_across_frames() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        // the peer only accepts 512-byte frames
        let mut open = MockPeer::open_performative(None);
        open.max_frame_size = 512.into();
        let mut peer = MockPeer::accept(server_io, open).await;
        peer.accept_begin().await;
        peer.accept_attach().await;

        peer.send(0, FrameBody::Flow(link_flow(100, 0, false))).await;

        // collect transfers until the final one
        let mut frames = 0usize;
        let mut collected = bytes::BytesMut::new();
        loop {
            let frame = peer.next_frame().await;
            let (transfer, payload) = match frame.body {
                FrameBody::Transfer {
                    performative,
                    payload,
                } => (performative, payload),
                other => panic!("expected Transfer, got {:?}", other),
            };
            assert_eq!(transfer.delivery_id, Some(0));
            frames += 1;
            collected.extend_from_slice(&payload);
            if !transfer.more {
                break;
            }
        }
        assert!(frames > 1, "a 2000-byte body must not fit one 512-byte frame");

        let registry = TypeRegistry::core();
        let message = Message::decode(&registry, &collected).unwrap();
        assert_eq!(message.body_data().unwrap(), vec![0x42u8; 2000]);

        let disposition = Disposition {
            role: Role::Receiver,
            first: 0,
            last: None,
            settled: true,
            state: Some(DeliveryState::Accepted(Accepted {})),
            batchable: false,
        };
        peer.send(0, FrameBody::Disposition(disposition)).await;
    });

    let mut connection = Connection::builder()
        .container_id("split-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut sender = Sender::attach(&mut session, "sender-large", "q1").await.unwrap();

    let outcome = sender.send(Message::data(vec![0x42u8; 2000])).await.unwrap();
    assert!(outcome.is_accepted());

    peer.await.unwrap();
}

#[tokio::test]
async fn transfer_on_unattached_handle_ends_the_session() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;

        // no link was ever attached on handle 9
        let rogue = Transfer {
            handle: Handle(9),
            delivery_id: Some(0),
            delivery_tag: Some(Binary::from(&b"r0"[..])),
            ..Default::default()
        };
        peer.send(
            0,
            FrameBody::Transfer {
                performative: rogue,
                payload: bytes::Bytes::from_static(b"?"),
            },
        )
        .await;

        let frame = peer.next_frame().await;
        let end = match frame.body {
            FrameBody::End(end) => end,
            other => panic!("expected End, got {:?}", other),
        };
        let condition = end.error.expect("end must carry an error").condition;
        assert_eq!(
            condition,
            ErrorCondition::SessionError(SessionError::UnattachedHandle)
        );
    });

    let mut connection = Connection::builder()
        .container_id("rogue-transfer-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();

    peer.await.unwrap();

    let result = session.end().await;
    assert!(matches!(result, Err(EngineError::UnattachedHandle)));
}
