// Message Model and matcher tests over complete messages

use sipprobe_sip_core::matching::{build_matcher, Expect};
use sipprobe_sip_core::{FieldValue, MessageView, SipMessage};

const REINVITE: &str = "INVITE sip:bob@127.0.0.1:7072 SIP/2.0\r\n\
Via: SIP/2.0/UDP 127.0.0.1:7070;branch=z9hG4bKa1\r\n\
Route: <sip:p1.example.com;lr>\r\n\
Route: <sip:p2.example.com;lr>\r\n\
From: \"Ada\" <sip:ada@test1.com>;tag=a1\r\n\
To: <sip:bob@127.0.0.1:7072>;tag=b1\r\n\
Call-ID: call-7\r\n\
CSeq: 3 INVITE\r\n\
Contact: <sip:sipprobe@127.0.0.1:7070>\r\n\
Refer-To: <sip:carol@C?Replaces=x>\r\n\
Remote-Party-ID: \"Ada\" <sip:+100@test1.com>;party=calling\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 4\r\n\
\r\n\
v=0\n";

#[test]
fn test_pseudo_variables_over_reinvite() {
    let view = MessageView::parse(REINVITE).unwrap();
    assert_eq!(view.text("$fn").as_deref(), Some("Ada"));
    assert_eq!(view.text("$fu").as_deref(), Some("sip:ada@test1.com"));
    assert_eq!(view.text("$fd").as_deref(), Some("test1.com"));
    assert_eq!(view.text("$ft").as_deref(), Some("a1"));
    assert_eq!(view.text("$tU").as_deref(), Some("bob"));
    assert_eq!(view.text("$tt").as_deref(), Some("b1"));
    assert_eq!(view.text("$ru").as_deref(), Some("sip:bob@127.0.0.1:7072"));
    assert_eq!(view.get("$rp"), Some(FieldValue::Integer(7072)));
    assert_eq!(view.text("$rz").as_deref(), Some("sip"));
    assert_eq!(view.text("$ci").as_deref(), Some("call-7"));
    assert_eq!(view.text("$cT").as_deref(), Some("application/sdp"));
    assert_eq!(view.text("$cl").as_deref(), Some("4"));
    assert_eq!(view.text("$rb").as_deref(), Some("v=0\n"));
    assert_eq!(view.text("$rt").as_deref(), Some("sip:carol@C?Replaces=x"));
    assert_eq!(view.text("$re").as_deref(), Some("sip:+100@test1.com"));
    assert_eq!(view.get("$ua"), None);
    assert_eq!(view.get("$(hdrcnt(Route))"), Some(FieldValue::Integer(2)));
    assert_eq!(
        view.text("$(hdr(Route)[1])").as_deref(),
        Some("<sip:p2.example.com;lr>")
    );
}

#[test]
fn test_view_over_borrowed_message() {
    let msg = SipMessage::parse(REINVITE).unwrap();
    let view = MessageView::new(&msg);
    assert_eq!(view.text("$rm").as_deref(), Some("INVITE"));
    assert_eq!(view.get("$ml"), None);
    assert!(view.is_request());
}

#[test]
fn test_matcher_over_reinvite() {
    let msg = SipMessage::parse(REINVITE).unwrap();
    let matcher = build_matcher([
        ("$rm", Expect::from("INVITE")),
        ("$cs", Expect::from(3)),
        ("$tt", Expect::pattern("^b").unwrap()),
        ("$hdr(Record-Route)", Expect::Absent),
        ("$(hdr(Route)[*])", Expect::predicate(|v| matches!(v, FieldValue::List(l) if l.len() == 2))),
    ]);
    assert!(matcher.matches(&msg));
    assert!(matcher.check(&msg).is_ok());

    let mismatch = build_matcher([("$(hdr(Route)[0])", Expect::Absent)]);
    let err = mismatch.check(&msg).unwrap_err();
    assert_eq!(err.path, "sip_msg.$(hdr(Route)[0])");
    assert_eq!(err.expected, "absent");
}

#[test]
fn test_message_json_shape() {
    let msg = SipMessage::parse(REINVITE).unwrap();
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["start_line"]["kind"], "request");
    assert_eq!(json["start_line"]["uri"], "sip:bob@127.0.0.1:7072");
    assert_eq!(json["version"], "SIP/2.0");
    assert_eq!(json["body"], "v=0\n");

    let back: SipMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, msg);
}
