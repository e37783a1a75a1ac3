//! Dialog state and the protocol rules that read or update it
//!
//! ```text
//! field           outgoing dialog                 incoming dialog
//! ─────────────── ─────────────────────────────── ──────────────────────────────
//! local_tag       generated at create             generated at dialog_offer
//! remote_tag      To tag of the answering 2xx     From tag of the offer
//! local_seq       CSeq of the defining request    0 until we send
//! remote_target   Contact of the 2xx, refreshed   Contact of the offer, refreshed
//! route_set       Record-Route of the 2xx         Record-Route of the offer
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use sipprobe_sip_core::parser::address::parse_address;
use sipprobe_sip_core::{CSeq, HeaderValue, Method, NameAddr, SipMessage};

use super::{DialogId, DialogState, Direction, EndpointId};
use crate::errors::{DialogError, DialogResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    /// Unique identifier for this dialog
    pub id: DialogId,

    /// Endpoint the dialog belongs to
    pub endpoint_id: EndpointId,

    pub direction: Direction,

    pub state: DialogState,

    pub call_id: String,

    pub local_tag: String,

    /// Learned from the answer (outgoing) or the offer (incoming)
    pub remote_tag: Option<String>,

    /// CSeq of the last request we sent inside the dialog
    pub local_seq: u32,

    /// CSeq of the last request the peer sent, ACK and CANCEL excluded
    pub remote_seq: Option<u32>,

    /// Our address, without tag
    pub local_uri: NameAddr,

    /// Peer address, without tag
    pub remote_uri: NameAddr,

    /// Peer Contact URI; Request-URI for in-dialog requests once answered
    pub remote_target: Option<String>,

    /// Route set, rendered name-addr values in the order received
    pub route_set: Vec<String>,

    /// The defining INVITE/SUBSCRIBE
    pub initial_offer: SipMessage,

    /// CSeq of the defining request
    pub offer_cseq: CSeq,

    /// CSeq of the latest INVITE sent; ACK and CANCEL reuse it
    pub last_invite_seq: u32,
}

fn header_uri(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Address(addr) => addr.uri.clone(),
        other => other.to_string(),
    }
}

impl Dialog {
    /// Dialog for a request we are about to send. `offer` must already
    /// carry the final Call-ID, From (with our tag), To and CSeq.
    pub fn outgoing(endpoint_id: EndpointId, offer: SipMessage) -> DialogResult<Self> {
        let call_id = offer
            .call_id()
            .ok_or_else(|| DialogError::configuration("missing Call-ID"))?
            .to_string();
        let from = offer
            .from()
            .ok_or_else(|| DialogError::configuration("missing From"))?;
        let local_tag = from
            .tag()
            .ok_or_else(|| DialogError::configuration("From without tag"))?
            .to_string();
        let to = offer
            .to()
            .ok_or_else(|| DialogError::configuration("missing To"))?;
        let offer_cseq = offer
            .cseq()
            .ok_or_else(|| DialogError::configuration("missing CSeq"))?
            .clone();

        Ok(Self {
            id: DialogId::new(),
            endpoint_id,
            direction: Direction::Outgoing,
            state: DialogState::Offering,
            call_id,
            local_tag,
            remote_tag: None,
            local_seq: offer_cseq.seq,
            remote_seq: None,
            local_uri: from.without_tag(),
            remote_uri: to.without_tag(),
            remote_target: None,
            route_set: offer.headers.values("route").iter().map(ToString::to_string).collect(),
            last_invite_seq: if offer_cseq.method == Method::Invite { offer_cseq.seq } else { 0 },
            offer_cseq,
            initial_offer: offer,
        })
    }

    /// Dialog for an offering INVITE/SUBSCRIBE received from the peer
    pub fn incoming(endpoint_id: EndpointId, offer: &SipMessage, local_tag: String) -> DialogResult<Self> {
        let call_id = offer
            .call_id()
            .ok_or_else(|| DialogError::protocol("missing Call-ID"))?
            .to_string();
        let from = offer
            .from()
            .ok_or_else(|| DialogError::protocol("missing From"))?;
        let to = offer
            .to()
            .ok_or_else(|| DialogError::protocol("missing To"))?;
        let offer_cseq = offer
            .cseq()
            .ok_or_else(|| DialogError::protocol("missing CSeq"))?
            .clone();

        Ok(Self {
            id: DialogId::new(),
            endpoint_id,
            direction: Direction::Incoming,
            state: DialogState::Offering,
            call_id,
            local_tag,
            remote_tag: from.tag().map(str::to_string),
            local_seq: 0,
            remote_seq: Some(offer_cseq.seq),
            local_uri: to.without_tag(),
            remote_uri: from.without_tag(),
            remote_target: offer.contact_uri().map(str::to_string),
            route_set: offer.record_route(),
            last_invite_seq: 0,
            offer_cseq,
            initial_offer: offer.clone(),
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DialogState::Terminated
    }

    pub fn terminate(&mut self) {
        self.state = DialogState::Terminated;
    }

    /// Whether `cseq` identifies the defining request
    pub fn is_defining(&self, cseq: &CSeq) -> bool {
        cseq.seq == self.offer_cseq.seq && cseq.method == self.offer_cseq.method
    }

    /// Record a request received inside the dialog.
    ///
    /// Contact and Record-Route only replace what we know when present.
    pub fn update_from_request(&mut self, request: &SipMessage) {
        if let Some(contact) = request.contact_uri() {
            self.remote_target = Some(contact.to_string());
        }
        let record_route = request.record_route();
        if !record_route.is_empty() {
            self.route_set = record_route;
        }
        if let Some(cseq) = request.cseq() {
            if !cseq.method.reuses_cseq() {
                self.remote_seq = Some(cseq.seq);
            }
        }
    }

    /// Apply a response to a request we sent in this dialog. Returns true
    /// when the dialog moved to `Answered`.
    ///
    /// Only 2xx responses touch dialog state. A 2xx to the defining request
    /// while offering answers the dialog and learns the peer tag, target and
    /// route set; a later 2xx to a target-refresh request updates the target.
    pub fn update_from_response(&mut self, response: &SipMessage) -> bool {
        let Some(status) = response.status() else {
            return false;
        };
        if !(200..300).contains(&status) || self.is_terminated() {
            return false;
        }
        let Some(cseq) = response.cseq() else {
            return false;
        };

        if self.state == DialogState::Offering && self.is_defining(cseq) {
            self.state = DialogState::Answered;
            self.remote_tag = response.to_tag().map(str::to_string);
            if let Some(contact) = response.contact_uri() {
                self.remote_target = Some(contact.to_string());
            }
            let record_route = response.record_route();
            if !record_route.is_empty() {
                self.route_set = record_route;
            }
            debug!(dialog = %self.id, remote_tag = ?self.remote_tag, "dialog answered");
            return true;
        }

        if cseq.method.is_target_refresh() {
            if let Some(contact) = response.contact_uri() {
                self.remote_target = Some(contact.to_string());
            }
        }
        false
    }

    /// Mark the dialog answered after we sent a 2xx to the defining request
    pub fn answer(&mut self, request: &SipMessage, status: u16) -> bool {
        let defining = request.cseq().is_some_and(|cseq| self.is_defining(cseq));
        if self.state == DialogState::Offering && defining && (200..300).contains(&status) {
            self.state = DialogState::Answered;
            return true;
        }
        false
    }

    /// CSeq for the next request of `method`, advancing `local_seq` unless
    /// the method reuses the INVITE sequence.
    pub fn next_cseq(&mut self, method: &Method) -> CSeq {
        let seq = if method.reuses_cseq() {
            if self.last_invite_seq > 0 {
                self.last_invite_seq
            } else {
                self.local_seq
            }
        } else {
            self.local_seq += 1;
            self.local_seq
        };
        if *method == Method::Invite {
            self.last_invite_seq = seq;
        }
        CSeq::new(seq, method.clone())
    }

    /// Request-URI of the defining request as seen from our side
    pub fn offer_uri(&self) -> String {
        match self.direction {
            Direction::Outgoing => self.initial_offer.uri().unwrap_or(&self.remote_uri.uri).to_string(),
            Direction::Incoming => self
                .remote_target
                .clone()
                .unwrap_or_else(|| self.remote_uri.uri.clone()),
        }
    }

    /// Request-URI for an in-dialog request of `method`
    pub fn request_uri(&self, method: &Method) -> String {
        if *method == Method::Cancel || self.state == DialogState::Offering {
            return self.offer_uri();
        }
        self.remote_target.clone().unwrap_or_else(|| self.offer_uri())
    }

    /// From header for requests we send
    pub fn from_header(&self) -> NameAddr {
        self.local_uri.clone().with_tag(self.local_tag.clone())
    }

    /// To header for requests we send; tagged once the dialog is answered
    pub fn to_header(&self) -> NameAddr {
        match (&self.remote_tag, self.state) {
            (Some(tag), DialogState::Answered | DialogState::Terminated) => {
                self.remote_uri.clone().with_tag(tag.clone())
            }
            _ => self.remote_uri.clone(),
        }
    }

    /// Route header values built from the route set
    pub fn route_headers(&self) -> Vec<HeaderValue> {
        self.route_set
            .iter()
            .map(|route| match parse_address(route) {
                Ok(addr) => HeaderValue::Address(addr),
                Err(_) => HeaderValue::text(route),
            })
            .collect()
    }

    /// URI of the first route, if any
    pub fn first_hop(&self) -> Option<String> {
        self.route_headers().first().map(header_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer() -> SipMessage {
        SipMessage::parse(
            "INVITE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
             Via: SIP/2.0/UDP 127.0.0.1:5070;branch=z9hG4bK1\r\n\
             From: \"Ada\" <sip:ada@test1.com>;tag=a1\r\n\
             To: <sip:bob@B>\r\n\
             Call-ID: c1\r\n\
             CSeq: 5 INVITE\r\n\
             Contact: <sip:ada@127.0.0.1:5070>\r\n\
             Record-Route: <sip:p1;lr>, <sip:p2;lr>\r\n\r\n",
        )
        .unwrap()
    }

    fn answer(contact: &str) -> SipMessage {
        SipMessage::parse(&format!(
            "SIP/2.0 200 OK\r\n\
             From: <sip:ada@test1.com>;tag=a1\r\n\
             To: <sip:bob@B>;tag=b1\r\n\
             Call-ID: c1\r\n\
             CSeq: 5 INVITE\r\n\
             Contact: <{}>\r\n\
             Record-Route: <sip:p9;lr>\r\n\r\n",
            contact
        ))
        .unwrap()
    }

    #[test]
    fn test_outgoing_dialog_sequence() {
        let mut dialog = Dialog::outgoing(EndpointId::new(), offer()).unwrap();
        assert_eq!(dialog.local_tag, "a1");
        assert_eq!(dialog.local_seq, 5);
        assert_eq!(dialog.last_invite_seq, 5);
        assert_eq!(dialog.to_header().tag(), None);

        assert_eq!(dialog.next_cseq(&Method::Ack).seq, 5);
        assert_eq!(dialog.next_cseq(&Method::Info).seq, 6);
        assert_eq!(dialog.next_cseq(&Method::Cancel).seq, 5);
        assert_eq!(dialog.next_cseq(&Method::Invite).seq, 7);
        assert_eq!(dialog.next_cseq(&Method::Ack).seq, 7);
        assert_eq!(dialog.next_cseq(&Method::Bye).seq, 8);
    }

    #[test]
    fn test_answer_learns_remote_state() {
        let mut dialog = Dialog::outgoing(EndpointId::new(), offer()).unwrap();
        assert_eq!(dialog.request_uri(&Method::Ack), "sip:bob@127.0.0.1:5080");

        let mut provisional = answer("sip:early@x");
        provisional.start_line = sipprobe_sip_core::StartLine::Response {
            status: 180,
            reason: "Ringing".to_string(),
        };
        assert!(!dialog.update_from_response(&provisional));
        assert_eq!(dialog.state, DialogState::Offering);
        assert_eq!(dialog.remote_target, None);

        assert!(dialog.update_from_response(&answer("sip:bob@127.0.0.1:5090")));
        assert_eq!(dialog.state, DialogState::Answered);
        assert_eq!(dialog.remote_tag.as_deref(), Some("b1"));
        assert_eq!(dialog.route_set, vec!["<sip:p9;lr>".to_string()]);
        assert_eq!(dialog.request_uri(&Method::Bye), "sip:bob@127.0.0.1:5090");
        assert_eq!(dialog.request_uri(&Method::Cancel), "sip:bob@127.0.0.1:5080");
        assert_eq!(dialog.to_header().tag(), Some("b1"));
        assert_eq!(dialog.first_hop().as_deref(), Some("sip:p9;lr"));
    }

    #[test]
    fn test_incoming_dialog() {
        let mut dialog = Dialog::incoming(EndpointId::new(), &offer(), "b1".to_string()).unwrap();
        assert_eq!(dialog.remote_tag.as_deref(), Some("a1"));
        assert_eq!(dialog.remote_seq, Some(5));
        assert_eq!(dialog.local_uri.uri, "sip:bob@B");
        assert_eq!(dialog.remote_target.as_deref(), Some("sip:ada@127.0.0.1:5070"));
        assert_eq!(dialog.route_set.len(), 2);
        assert_eq!(dialog.next_cseq(&Method::Bye).seq, 1);

        let mut ok_to_other = offer();
        ok_to_other.headers.set("cseq", CSeq::new(6, Method::Info).into());
        assert!(!dialog.answer(&ok_to_other, 200));
        assert!(!dialog.answer(&offer(), 180));
        assert!(dialog.answer(&offer(), 200));
        assert_eq!(dialog.state, DialogState::Answered);
    }

    #[test]
    fn test_request_refresh_is_sticky() {
        let mut dialog = Dialog::incoming(EndpointId::new(), &offer(), "b1".to_string()).unwrap();
        let mut bye = SipMessage::parse(
            "BYE sip:bob@B SIP/2.0\r\nCall-ID: c1\r\nCSeq: 6 BYE\r\n\r\n",
        )
        .unwrap();
        dialog.update_from_request(&bye);
        assert_eq!(dialog.remote_target.as_deref(), Some("sip:ada@127.0.0.1:5070"));
        assert_eq!(dialog.route_set.len(), 2);
        assert_eq!(dialog.remote_seq, Some(6));

        bye.headers.set("cseq", CSeq::new(9, Method::Ack).into());
        dialog.update_from_request(&bye);
        assert_eq!(dialog.remote_seq, Some(6));
    }
}
