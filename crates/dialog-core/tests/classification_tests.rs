//! Inbound classification tests
//!
//! A raw loopback peer sends messages the engine itself would never build.

mod common;

use common::{invite_to, Harness, RawPeer};

use sipprobe_dialog_core::{EventKind, Reply};
use sipprobe_sip_core::{Method, MessageOverrides, NameAddr};

const BOB: u16 = 5080;
const PEER: u16 = 5090;

#[tokio::test]
async fn test_missing_call_id_is_invalid() {
    let mut h = Harness::new();
    let bob = h.endpoint(BOB);
    let peer = RawPeer::bind(&h.network, PEER);

    peer.send_raw(
        "OPTIONS sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>\r\n\
         CSeq: 1 OPTIONS\r\n\r\n",
    );
    let event = h.wait_for(bob, "invalid_message").await;
    match event.kind {
        EventKind::InvalidMessage { reason, .. } => assert_eq!(reason, "missing Call-ID"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_cseq_is_invalid() {
    let mut h = Harness::new();
    let bob = h.endpoint(BOB);
    let peer = RawPeer::bind(&h.network, PEER);

    peer.send_raw(
        "INVITE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>\r\n\
         Call-ID: bad-cseq\r\n\
         CSeq: one INVITE\r\n\r\n",
    );
    h.wait_for(bob, "invalid_message").await;
    assert_eq!(h.engine.dialog_count(), 0);
}

#[tokio::test]
async fn test_tagged_invite_for_unknown_dialog() {
    let mut h = Harness::new();
    let bob = h.endpoint(BOB);
    let peer = RawPeer::bind(&h.network, PEER);

    peer.send_raw(
        "INVITE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>;tag=gone\r\n\
         Call-ID: stale-dialog\r\n\
         CSeq: 7 INVITE\r\n\r\n",
    );
    let req = h.request(bob, "request_for_unknown_dialog").await;
    assert_eq!(req.to_tag(), Some("gone"));
    assert_eq!(h.engine.dialog_count(), 0);

    h.engine
        .send_reply(bob, &req, &Reply::new(481, "Call/Transaction Does Not Exist"))
        .unwrap();
    let mut peer = peer;
    let res = peer.recv().await;
    assert_eq!(res.status(), Some(481));
    assert_eq!(res.to_tag(), Some("gone"));
}

#[tokio::test]
async fn test_out_of_dialog_options_and_reply_tag() {
    let mut h = Harness::new();
    let ada = h.endpoint(5070);
    let bob = h.endpoint(BOB);

    let options = MessageOverrides::new()
        .method(Method::Options)
        .uri("sip:bob@127.0.0.1:5080")
        .from(NameAddr::new("sip:ada@test1.com"))
        .to(NameAddr::new("sip:bob@test2.com"));
    h.engine.send_non_dialog_request(ada, &options, None, None).unwrap();

    let req = h.request(bob, "out_of_dialog_request").await;
    assert!(req.call_id().is_some());
    assert!(req.from_tag().is_some());
    assert_eq!(req.cseq().map(|c| c.seq), Some(1));

    h.engine.send_reply(bob, &req, &Reply::new(200, "OK")).unwrap();
    let event = h.wait_for(ada, "response").await;
    assert_eq!(event.dialog_id(), None);
    let res = event.message().unwrap();
    let tag = res.to_tag().unwrap().to_string();
    assert_eq!(tag, sipprobe_sip_core::builder::derive_reply_tag(&req));

    // a retransmitted reply to the same request carries the same tag
    h.engine.send_reply(bob, &req, &Reply::new(200, "OK")).unwrap();
    let again = h.response(ada).await;
    assert_eq!(again.to_tag(), Some(tag.as_str()));
    assert_eq!(h.engine.dialog_count(), 0);
}

#[tokio::test]
async fn test_remote_target_is_sticky_across_non_2xx() {
    let mut h = Harness::new();
    let ada = h.endpoint(5070);
    let mut peer = RawPeer::bind(&h.network, PEER);

    let dialog = h.engine.create_dialog(ada, &invite_to(PEER), None).unwrap();
    let invite = peer.recv().await;

    let mut ok = sipprobe_sip_core::make_response(&invite, 200, "OK");
    if let Some(to) = ok.headers.address_mut("to") {
        to.set_tag(Some("peer-tag".to_string()));
    }
    let ok = ok
        .with_header("Contact", NameAddr::new("sip:first@127.0.0.1:5090;transport=udp"))
        .with_header("Record-Route", NameAddr::new("sip:127.0.0.1:5090;lr"))
        .with_header("Record-Route", NameAddr::new("sip:proxy2.test;lr"));
    peer.send(ok);
    h.response(ada).await;

    let answered = h.engine.dialog(dialog).unwrap();
    assert_eq!(answered.remote_target.as_deref(), Some("sip:first@127.0.0.1:5090;transport=udp"));
    assert_eq!(
        answered.route_set,
        vec!["<sip:127.0.0.1:5090;lr>".to_string(), "<sip:proxy2.test;lr>".to_string()]
    );

    h.engine
        .send_dialog_request(dialog, &MessageOverrides::new().method(Method::Invite), None, None)
        .unwrap();
    let reinvite = peer.recv().await;
    assert_eq!(reinvite.uri(), Some("sip:first@127.0.0.1:5090;transport=udp"));
    let routes: Vec<String> = reinvite
        .headers
        .values("route")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(routes, answered.route_set);

    let mut rejected = sipprobe_sip_core::make_response(&reinvite, 488, "Not Acceptable Here");
    rejected.headers.set(
        "contact",
        NameAddr::new("sip:second@127.0.0.1:5090").into(),
    );
    peer.send(rejected);
    assert_eq!(h.response(ada).await.status(), Some(488));

    h.engine
        .send_dialog_request(dialog, &MessageOverrides::new().method(Method::Bye), None, None)
        .unwrap();
    let bye = peer.recv().await;
    assert_eq!(bye.uri(), Some("sip:first@127.0.0.1:5090;transport=udp"));
    assert_eq!(bye.cseq().map(|c| c.seq), Some(3));
}

#[tokio::test]
async fn test_in_dialog_request_refreshes_target_only_when_present() {
    let mut h = Harness::new();
    let bob = h.endpoint(BOB);
    let peer = RawPeer::bind(&h.network, PEER);

    peer.send_raw(
        "INVITE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>\r\n\
         Call-ID: sticky\r\n\
         CSeq: 1 INVITE\r\n\
         Contact: <sip:peer@127.0.0.1:5090>\r\n\r\n",
    );
    let dialog_id = h.wait_for(bob, "dialog_offer").await.dialog_id().unwrap();

    peer.send_raw(
        "INFO sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>\r\n\
         Call-ID: sticky\r\n\
         CSeq: 2 INFO\r\n\r\n",
    );
    h.wait_for(bob, "in_dialog_request").await;
    let dialog = h.engine.dialog(dialog_id).unwrap();
    assert_eq!(dialog.remote_target.as_deref(), Some("sip:peer@127.0.0.1:5090"));
    assert_eq!(dialog.remote_seq, Some(2));

    peer.send_raw(
        "UPDATE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
         From: <sip:peer@test3.com>;tag=p\r\n\
         To: <sip:bob@test2.com>\r\n\
         Call-ID: sticky\r\n\
         CSeq: 3 UPDATE\r\n\
         Contact: <sip:moved@127.0.0.1:5090>\r\n\
         Record-Route: <sip:rr.test;lr>\r\n\r\n",
    );
    h.wait_for(bob, "in_dialog_request").await;
    let dialog = h.engine.dialog(dialog_id).unwrap();
    assert_eq!(dialog.remote_target.as_deref(), Some("sip:moved@127.0.0.1:5090"));
    assert_eq!(dialog.route_set, vec!["<sip:rr.test;lr>".to_string()]);
    assert_eq!(dialog.remote_seq, Some(3));
}

#[tokio::test]
async fn test_unmatched_response_is_reported() {
    let mut h = Harness::new();
    let bob = h.endpoint(BOB);
    let peer = RawPeer::bind(&h.network, PEER);

    peer.send_raw(
        "SIP/2.0 200 OK\r\n\
         Via: SIP/2.0/UDP 127.0.0.1:5080;branch=z9hG4bKnobody\r\n\
         From: <sip:bob@test2.com>;tag=b\r\n\
         To: <sip:peer@test3.com>;tag=p\r\n\
         Call-ID: nobody-asked\r\n\
         CSeq: 1 OPTIONS\r\n\r\n",
    );
    let event = h.wait_for(bob, "response").await;
    assert_eq!(event.dialog_id(), None);
    assert_eq!(event.message().and_then(|m| m.status()), Some(200));
}
