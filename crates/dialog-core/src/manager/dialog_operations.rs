//! Outbound operations
//!
//! Requests and replies are composed in three layers: the stripped
//! template, the caller's overrides, then the protocol fields the engine
//! owns. For requests inside a dialog those are:
//!
//! ```text
//! Call-ID        dialog Call-ID
//! From           local URI + local tag
//! To             remote URI, + remote tag once answered
//! CSeq           ACK/CANCEL: CSeq of the last INVITE; otherwise local_seq + 1
//! Request-URI    CANCEL, or still offering: URI of the offer
//!                otherwise: remote target (Contact learned from the peer)
//! Route          route set
//! Contact        endpoint Contact (written by the endpoint on send)
//! ```
//!
//! ACK never gets a response, so it is sent without a response callback.
//!
//! Every operation validates before it mutates: an `Err` leaves the dialog
//! tables and sequence numbers as they were.

use tracing::{debug, info};

use sipprobe_sip_core::builder::{
    build_request, build_response, derive_reply_tag, generate_call_id, generate_tag, strip_template,
    MessageOverrides,
};
use sipprobe_sip_core::{
    CSeq, ChallengeParams, Credentials, HeaderValue, Method, SipMessage, StartLine,
};

use super::core::Engine;
use crate::dialog::{Dialog, DialogId, EndpointId};
use crate::errors::{DialogError, DialogResult};

/// Challenge and credentials used to sign an outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    /// The 401 or 407 response being answered
    pub challenge: SipMessage,
    pub credentials: Credentials,
}

impl SignRequest {
    pub fn new(challenge: SipMessage, credentials: Credentials) -> Self {
        Self {
            challenge,
            credentials,
        }
    }
}

/// Everything needed to answer a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub reason: String,
    pub overrides: MessageOverrides,
    /// Response whose headers and body seed the reply
    pub template: Option<SipMessage>,
    /// Emit a digest challenge (401/407 only)
    pub challenge: Option<ChallengeParams>,
}

impl Reply {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            overrides: MessageOverrides::new(),
            template: None,
            challenge: None,
        }
    }

    pub fn with_overrides(mut self, overrides: MessageOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_template(mut self, template: SipMessage) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_challenge(mut self, challenge: ChallengeParams) -> Self {
        self.challenge = Some(challenge);
        self
    }
}

impl Engine {
    // Out-of-dialog

    /// Send a request outside any dialog (OPTIONS, REGISTER, MESSAGE, ...).
    ///
    /// Method, Request-URI, From and To must come from the template or the
    /// overrides; without them nothing is sent and a configuration error is
    /// returned.
    ///
    /// Missing identity fields are filled in: a fresh Call-ID, a From tag
    /// and `CSeq: 1 <method>`. Responses arrive as `response` events without
    /// a dialog id.
    pub fn send_non_dialog_request(
        &self,
        endpoint_id: EndpointId,
        overrides: &MessageOverrides,
        template: Option<&SipMessage>,
        sign: Option<&SignRequest>,
    ) -> DialogResult<()> {
        let endpoint = self.endpoint_record(endpoint_id)?;
        let mut request = build_request(template, overrides).map_err(DialogError::from_build)?;
        let method = request
            .method()
            .cloned()
            .ok_or_else(|| DialogError::configuration("missing method"))?;

        if request.from().is_none() {
            return Err(DialogError::configuration("missing From"));
        }
        if request.to().is_none() {
            return Err(DialogError::configuration("missing To"));
        }
        if request.call_id().is_none() {
            request.headers.set(
                "call-id",
                HeaderValue::text(generate_call_id(&endpoint.info.bind_address)),
            );
        }
        if request.cseq().is_none() {
            request.headers.set("cseq", CSeq::new(1, method.clone()).into());
        }
        if let Some(from) = request.headers.address_mut("from") {
            if from.tag().is_none() {
                from.set_tag(Some(generate_tag()));
            }
        }
        self.apply_request_defaults(&mut request);
        if let Some(sign) = sign {
            self.inner
                .digest
                .sign_request(&mut request, &sign.challenge, &sign.credentials)?;
        }

        debug!(endpoint = %endpoint_id, method = %method, "sending out-of-dialog request");
        let handler = (method != Method::Ack).then(|| self.response_handler(endpoint_id, None));
        endpoint.send(request, handler)?;
        Ok(())
    }

    /// Answer a request outside any dialog. The To tag is derived from the
    /// request so retransmitted replies match; a 100 never carries one.
    pub fn send_reply(&self, endpoint_id: EndpointId, request: &SipMessage, reply: &Reply) -> DialogResult<()> {
        let endpoint = self.endpoint_record(endpoint_id)?;
        let response = self.compose_reply(request, reply, None)?;
        debug!(endpoint = %endpoint_id, status = reply.status, "sending reply");
        endpoint.send(response, None)?;
        Ok(())
    }

    // Dialogs

    /// Start an outgoing dialog by sending its defining INVITE or SUBSCRIBE.
    ///
    /// The Call-ID is fresh unless the overrides set one; the From tag is
    /// always generated. The CSeq number from the template or overrides
    /// (default 1) becomes the dialog's first local sequence number.
    pub fn create_dialog(
        &self,
        endpoint_id: EndpointId,
        overrides: &MessageOverrides,
        template: Option<&SipMessage>,
    ) -> DialogResult<DialogId> {
        let endpoint = self.endpoint_record(endpoint_id)?;
        let mut offer = build_request(template, overrides).map_err(DialogError::from_build)?;
        let method = offer
            .method()
            .cloned()
            .ok_or_else(|| DialogError::configuration("missing method"))?;
        if !method.creates_dialog() {
            return Err(DialogError::configuration(format!(
                "{} does not create a dialog",
                method
            )));
        }

        if !overrides.sets_header("call-id") || offer.call_id().is_none() {
            offer.headers.set(
                "call-id",
                HeaderValue::text(generate_call_id(&endpoint.info.bind_address)),
            );
        }
        let from = offer
            .from()
            .ok_or_else(|| DialogError::configuration("missing From"))?
            .without_tag()
            .with_tag(generate_tag());
        let to = offer
            .to()
            .ok_or_else(|| DialogError::configuration("missing To"))?
            .without_tag();
        let seq = offer.cseq().map(|cseq| cseq.seq).unwrap_or(1);
        offer.headers.set("from", from.into());
        offer.headers.set("to", to.into());
        offer.headers.set("cseq", CSeq::new(seq, method.clone()).into());
        self.apply_request_defaults(&mut offer);

        let dialog = Dialog::outgoing(endpoint_id, offer.clone())?;
        let call_id = dialog.call_id.clone();
        let dialog_id = self.register_dialog(dialog)?;

        let handler = self.response_handler(endpoint_id, Some(dialog_id));
        if let Err(e) = endpoint.send(offer, Some(handler)) {
            let _ = self.retire_dialog(dialog_id);
            return Err(e.into());
        }
        info!(endpoint = %endpoint_id, dialog = %dialog_id, call_id = %call_id, method = %method, "outgoing dialog created");
        Ok(dialog_id)
    }

    /// Send a request inside a dialog (ACK, BYE, re-INVITE, INFO, ...)
    pub fn send_dialog_request(
        &self,
        dialog_id: DialogId,
        overrides: &MessageOverrides,
        template: Option<&SipMessage>,
        sign: Option<&SignRequest>,
    ) -> DialogResult<()> {
        let handle = self.dialog_handle(dialog_id)?;
        let mut dialog = handle.lock();
        if dialog.is_terminated() {
            return Err(DialogError::InvalidState {
                id: dialog_id.to_string(),
                state: dialog.state.to_string(),
                operation: "send request".to_string(),
            });
        }
        let endpoint = self.endpoint_record(dialog.endpoint_id)?;

        let saved = (dialog.local_seq, dialog.last_invite_seq);
        let request = match self.compose_dialog_request(&mut dialog, overrides, template, sign) {
            Ok(request) => request,
            Err(e) => {
                (dialog.local_seq, dialog.last_invite_seq) = saved;
                return Err(e);
            }
        };

        debug!(
            dialog = %dialog_id,
            method = ?request.method(),
            cseq = ?request.cseq().map(|c| c.seq),
            uri = ?request.uri(),
            "sending in-dialog request"
        );
        let handler = (request.method() != Some(&Method::Ack))
            .then(|| self.response_handler(dialog.endpoint_id, Some(dialog_id)));
        endpoint.send(request, handler)?;
        Ok(())
    }

    /// Answer a request inside a dialog. The To tag is the dialog's local
    /// tag (none on a 100); a 2xx to the defining request answers the dialog.
    pub fn send_dialog_reply(&self, dialog_id: DialogId, request: &SipMessage, reply: &Reply) -> DialogResult<()> {
        let handle = self.dialog_handle(dialog_id)?;
        let mut dialog = handle.lock();
        let endpoint = self.endpoint_record(dialog.endpoint_id)?;
        let response = self.compose_reply(request, reply, Some(&dialog.local_tag))?;

        debug!(dialog = %dialog_id, status = reply.status, "sending in-dialog reply");
        endpoint.send(response, None)?;
        if dialog.answer(request, reply.status) {
            info!(dialog = %dialog_id, "dialog answered");
        }
        Ok(())
    }

    fn compose_dialog_request(
        &self,
        dialog: &mut Dialog,
        overrides: &MessageOverrides,
        template: Option<&SipMessage>,
        sign: Option<&SignRequest>,
    ) -> DialogResult<SipMessage> {
        let method = overrides
            .method
            .clone()
            .or_else(|| template.and_then(|t| t.method().cloned()))
            .ok_or_else(|| DialogError::configuration("missing method"))?;
        let mut request = match template {
            Some(template) if template.is_request() => strip_template(template),
            Some(_) => {
                return Err(DialogError::configuration(
                    "request template must be a request",
                ))
            }
            None => SipMessage::request(method.clone(), String::new()),
        };
        overrides.apply_to(&mut request).map_err(DialogError::from_build)?;

        let cseq = dialog.next_cseq(&method);
        request.start_line = StartLine::Request {
            method: method.clone(),
            uri: dialog.request_uri(&method),
        };
        request
            .headers
            .set("call-id", HeaderValue::text(dialog.call_id.clone()));
        request.headers.set("from", dialog.from_header().into());
        request.headers.set("to", dialog.to_header().into());
        request.headers.set("cseq", cseq.into());
        request.headers.set_list("route", dialog.route_headers());
        self.apply_request_defaults(&mut request);

        if let Some(sign) = sign {
            self.inner
                .digest
                .sign_request(&mut request, &sign.challenge, &sign.credentials)?;
        }
        Ok(request)
    }

    fn compose_reply(&self, request: &SipMessage, reply: &Reply, local_tag: Option<&str>) -> DialogResult<SipMessage> {
        if !request.is_request() {
            return Err(DialogError::protocol("cannot reply to a response"));
        }
        let mut response = build_response(
            request,
            reply.status,
            &reply.reason,
            reply.template.as_ref(),
            &reply.overrides,
        )
        .map_err(DialogError::from_build)?;

        if let Some(to) = response.headers.address_mut("to") {
            if reply.status == 100 {
                to.set_tag(None);
            } else if let Some(tag) = local_tag {
                to.set_tag(Some(tag.to_string()));
            } else if to.tag().is_none() {
                to.set_tag(Some(derive_reply_tag(request)));
            }
        }
        if let Some(challenge) = &reply.challenge {
            self.inner.digest.build_challenge(challenge, &mut response)?;
        }
        Ok(response)
    }

    /// Max-Forwards and User-Agent, unless the request already has them
    fn apply_request_defaults(&self, request: &mut SipMessage) {
        let config = &self.inner.config;
        if !request.headers.contains("max-forwards") {
            request
                .headers
                .set("max-forwards", HeaderValue::text(config.max_forwards.to_string()));
        }
        if let Some(user_agent) = &config.user_agent {
            if !request.headers.contains("user-agent") {
                request
                    .headers
                    .set("user-agent", HeaderValue::text(user_agent.clone()));
            }
        }
    }
}
