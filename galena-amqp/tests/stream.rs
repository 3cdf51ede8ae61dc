//! Streaming send and receive against a scripted mock peer.

mod common;

use galena_amqp::frames::amqp::FrameBody;
use galena_amqp::{Connection, CreditMode, Receiver, Sender, Session};
use galena_amqp_types::definitions::{Handle, Role};
use galena_amqp_types::messaging::{Accepted, DeliveryState};
use galena_amqp_types::performatives::{Disposition, Flow, Transfer};
use galena_amqp_types::primitives::Binary;

use common::MockPeer;

fn credit_flow(credit: u32) -> Flow {
    Flow {
        next_incoming_id: Some(0),
        incoming_window: 5_000,
        next_outgoing_id: 0,
        outgoing_window: 5_000,
        handle: Some(Handle(0)),
        delivery_count: Some(0),
        link_credit: Some(credit),
        available: None,
        drain: false,
        echo: false,
        properties: None,
    }
}

#[tokio::test]
async fn streaming_send_spreads_chunks_over_transfers() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;
        peer.send(0, FrameBody::Flow(credit_flow(100))).await;

        // first chunk: carries the delivery-tag, more=true
        let frame = peer.next_frame().await;
        let first = match frame.body {
            FrameBody::Transfer { performative, .. } => performative,
            other => panic!("expected Transfer, got {:?}", other),
        };
        assert_eq!(first.delivery_id, Some(0));
        assert!(first.delivery_tag.is_some());
        assert!(first.more);

        // second chunk: continuation, more=true
        let frame = peer.next_frame().await;
        let second = match frame.body {
            FrameBody::Transfer { performative, .. } => performative,
            other => panic!("expected Transfer, got {:?}", other),
        };
        assert_eq!(second.delivery_id, Some(0));
        assert!(second.more);

        // closing transfer: empty payload, more=false
        let frame = peer.next_frame().await;
        let (last, payload) = match frame.body {
            FrameBody::Transfer {
                performative,
                payload,
            } => (performative, payload),
            other => panic!("expected Transfer, got {:?}", other),
        };
        assert!(!last.more);
        assert!(payload.is_empty());

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
        .container_id("stream-send-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut sender = Sender::attach(&mut session, "stream-sender", "q1").await.unwrap();

    let mut stream = sender.open_stream();
    stream.write_chunk(b"AAAAA").await.unwrap();
    stream.write_chunk(b"BBBBB").await.unwrap();
    let fut = stream.finish().await.unwrap();

    let outcome = fut.await.unwrap();
    assert!(outcome.is_accepted());

    peer.await.unwrap();
}

#[tokio::test]
async fn streaming_receive_yields_chunks_as_they_arrive() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let peer = tokio::spawn(async move {
        let mut peer = MockPeer::accept(server_io, MockPeer::open_performative(None)).await;
        peer.accept_begin().await;
        peer.accept_attach().await;

        // manual credit grant
        let frame = peer.next_frame().await;
        assert!(matches!(frame.body, FrameBody::Flow(_)));

        for (index, (chunk, more)) in
            [(&b"AAAAA"[..], true), (&b"BBBBB"[..], true), (&b"CCCCC"[..], false)]
                .into_iter()
                .enumerate()
        {
            let transfer = Transfer {
                handle: Handle(0),
                delivery_id: (index == 0).then_some(0),
                delivery_tag: (index == 0).then(|| Binary::from(&b"s0"[..])),
                more,
                ..Default::default()
            };
            peer.send(
                0,
                FrameBody::Transfer {
                    performative: transfer,
                    payload: bytes::Bytes::copy_from_slice(chunk),
                },
            )
            .await;
        }
    });

    let mut connection = Connection::builder()
        .container_id("stream-receive-client")
        .open_with_stream(client_io)
        .await
        .unwrap();
    let mut session = Session::begin(&mut connection).await.unwrap();
    let mut receiver = Receiver::builder()
        .name("stream-receiver")
        .source("q1")
        .credit_mode(CreditMode::Manual)
        .attach(&mut session)
        .await
        .unwrap();
    receiver.set_credit(5).await.unwrap();

    let mut stream = receiver.recv_stream();
    assert_eq!(stream.next_chunk().await.unwrap().unwrap().as_ref(), b"AAAAA");
    assert_eq!(stream.next_chunk().await.unwrap().unwrap().as_ref(), b"BBBBB");
    assert_eq!(stream.next_chunk().await.unwrap().unwrap().as_ref(), b"CCCCC");
    assert!(stream.is_done());
    assert!(stream.next_chunk().await.unwrap().is_none());

    peer.await.unwrap();
}
