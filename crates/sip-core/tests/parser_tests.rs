// Wire codec tests over realistic messages

use sipprobe_sip_core::{
    parse_message, CSeq, Error, HeaderEntry, HeaderValue, Method, SipMessage,
};

const INVITE_TEMPLATE: &str = "INVITE sip:780@192.168.200.6:5060 SIP/2.0\r\n\
Via: SIP/2.0/UDP 192.168.200.68:5060;branch=z9hG4bK6810pr20205h2akqe381.1\r\n\
Contact: \"Anonymous\"<sip:anonymous@192.168.200.68:5060;transport=udp>\r\n\
Supported: 100rel\r\n\
From: \"Anonymous\"<sip:anonymous@anonymous.invalid>;tag=SDfd9sa01-000000ba00023280\r\n\
To: <sip:780@192.168.200.6:5060>\r\n\
Call-ID: SDfd9sa01-6f93292521b83a0980647f34451c5afd-06ahc21\r\n\
CSeq: 2 INVITE\r\n\
P-Preferred-Identity: \"rdoe\"<sip:42343@192.168.200.68:5060>\r\n\
Privacy: id\r\n\
Content-Length: 50\r\n\
Content-Type: application/sdp\r\n\
Max-Forwards: 70\r\n\
\r\n\
v=0\r\n\
o=IWF 5 5 IN IP4 192.168.200.5\r\n\
s=H323 Call\r\n";

const ANSWER_TEMPLATE: &str = "SIP/2.0 200 OK\r\n\
Via: SIP/2.0/TCP ss1.atlanta.example.com:5060;branch=z9hG4bK2d4790.1;received=192.0.2.111\r\n\
Via: SIP/2.0/TCP client.atlanta.example.com:5060;branch=z9hG4bK74bf9;received=192.0.2.101\r\n\
From: June <sip:june@atlanta.example.com>;tag=9fxced76sl\r\n\
To: Adam <sip:adam@biloxi.example.com>;tag=314159\r\n\
Call-ID: 3848276298220188511@atlanta.example.com\r\n\
CSeq: 2 INVITE\r\n\
Contact: <sip:adam@client.biloxi.example.com;transport=tcp>\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 0\r\n\
\r\n";

#[test]
fn test_parse_invite_template() {
    let msg = parse_message(INVITE_TEMPLATE).unwrap();
    assert_eq!(msg.method(), Some(&Method::Invite));
    assert_eq!(msg.uri(), Some("sip:780@192.168.200.6:5060"));
    assert_eq!(msg.cseq(), Some(&CSeq::new(2, Method::Invite)));
    assert_eq!(msg.from_tag(), Some("SDfd9sa01-000000ba00023280"));
    assert_eq!(
        msg.from().and_then(|f| f.display_name.as_deref()),
        Some("Anonymous")
    );
    assert_eq!(
        msg.contact_uri(),
        Some("sip:anonymous@192.168.200.68:5060;transport=udp")
    );
    assert_eq!(msg.headers.text("max-forwards").as_deref(), Some("70"));
    assert!(msg.body.starts_with("v=0\r\n"));
    assert_eq!(msg.body.len(), 50);
}

#[test]
fn test_parse_answer_template() {
    let msg = parse_message(ANSWER_TEMPLATE).unwrap();
    assert_eq!(msg.status(), Some(200));
    assert_eq!(msg.to_tag(), Some("314159"));
    let vias = msg.headers.values("via");
    assert_eq!(vias.len(), 2);
    let top = vias[0].as_via().unwrap();
    assert_eq!(top.protocol, "TCP");
    assert_eq!(top.response_target(), ("192.0.2.111".to_string(), 5060));
    assert!(msg.body.is_empty());
}

#[test]
fn test_wire_round_trip_preserves_structure() {
    let msg = parse_message(INVITE_TEMPLATE).unwrap();
    let reparsed: SipMessage = msg.to_wire().parse().unwrap();
    assert_eq!(reparsed.start_line, msg.start_line);
    assert_eq!(reparsed.call_id(), msg.call_id());
    assert_eq!(reparsed.from(), msg.from());
    assert_eq!(reparsed.body, msg.body);
    assert_eq!(
        reparsed.headers.text("content-length").as_deref(),
        Some("50")
    );
}

#[test]
fn test_compact_and_folded_headers() {
    let raw = "MESSAGE sip:bob@B SIP/2.0\r\n\
v: SIP/2.0/UDP a:5060;branch=z9hG4bKa, SIP/2.0/UDP b:5060;branch=z9hG4bKb\r\n\
f: <sip:ada@test1.com>;tag=1\r\n\
t: <sip:bob@B>\r\n\
i: folded\r\n\
s: first line\r\n\
\tsecond line\r\n\
CSeq: 9 MESSAGE\r\n\
c: text/plain\r\n\
l: 2\r\n\
\r\n\
hi";
    let msg = parse_message(raw).unwrap();
    assert_eq!(msg.headers.values("Via").len(), 2);
    assert_eq!(msg.headers.text("Subject").as_deref(), Some("first line second line"));
    assert_eq!(msg.headers.text("content-type").as_deref(), Some("text/plain"));
    assert_eq!(msg.body, "hi");
    assert!(matches!(msg.headers.get("via"), Some(HeaderEntry::List(_))));
}

#[test]
fn test_structured_values_degrade_individually() {
    let raw = "INVITE sip:bob@B SIP/2.0\r\n\
Via: not a via\r\n\
From: <sip:ada@test1.com>;tag=1\r\n\
To: <broken\r\n\
Call-ID: c\r\n\
CSeq: 1 INVITE\r\n\r\n";
    let msg = parse_message(raw).unwrap();
    assert_eq!(msg.headers.first("via"), Some(&HeaderValue::text("not a via")));
    assert_eq!(msg.headers.first("to"), Some(&HeaderValue::text("<broken")));
    assert!(msg.to().is_none());
    assert_eq!(msg.from_tag(), Some("1"));
    assert_eq!(msg.cseq().map(|c| c.seq), Some(1));
}

#[test]
fn test_unparseable_messages() {
    assert!(matches!(parse_message("\r\n\r\n"), Err(Error::InvalidFormat(_))));
    assert!(matches!(
        parse_message("SIP/2.0 OK\r\n\r\n"),
        Err(Error::InvalidFormat(_))
    ));
    assert!(matches!(
        parse_message("INVITE sip:b SIP/2.0\r\nBad Header\r\n\r\n"),
        Err(Error::InvalidHeader(_))
    ));
}
