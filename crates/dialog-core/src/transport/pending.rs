//! Response callbacks keyed by the top Via branch of the request that
//! registered them.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tracing::trace;

use sipprobe_sip_core::{Method, SipMessage};

use super::{ResponseHandler, TransportError};

/// How long an INVITE callback outlives its first final response, so
/// retransmitted 2xx responses still reach the dialog (64*T1, RFC 3261 Timer H)
pub(crate) const INVITE_LINGER: Duration = Duration::from_secs(32);

struct Pending {
    handler: ResponseHandler,
    releasing: bool,
}

pub(crate) struct PendingResponses {
    handlers: DashMap<String, Pending>,
    invite_linger: Duration,
}

impl Default for PendingResponses {
    fn default() -> Self {
        Self::with_linger(INVITE_LINGER)
    }
}

impl PendingResponses {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_linger(invite_linger: Duration) -> Self {
        Self {
            handlers: DashMap::new(),
            invite_linger,
        }
    }

    pub(crate) fn register(&self, branch: String, handler: ResponseHandler) {
        self.handlers.insert(
            branch,
            Pending {
                handler,
                releasing: false,
            },
        );
    }

    /// Hand `response` to its callback. Returns the response back when no
    /// callback is registered for its branch.
    ///
    /// Provisional responses keep the callback; a final response for a
    /// non-INVITE request releases it. The first final response to an
    /// INVITE schedules the release after the linger period.
    pub(crate) fn dispatch(self: &Arc<Self>, response: SipMessage) -> Option<SipMessage> {
        let Some(branch) = response.branch().map(str::to_string) else {
            return Some(response);
        };
        let is_final = response.status().is_some_and(|s| s >= 200);
        let is_invite = response
            .cseq()
            .is_some_and(|cseq| cseq.method == Method::Invite);

        let (handler, schedule_release) = match self.handlers.get_mut(&branch) {
            Some(mut entry) => {
                let schedule = is_final && is_invite && !entry.releasing;
                if schedule {
                    entry.releasing = true;
                }
                (entry.handler.clone(), schedule)
            }
            None => return Some(response),
        };
        if is_final && !is_invite {
            self.handlers.remove(&branch);
        }
        if schedule_release {
            self.release_later(branch.clone());
        }
        trace!(branch = %branch, "dispatching response");
        handler(Ok(response));
        None
    }

    fn release_later(self: &Arc<Self>, branch: String) {
        let runtime = match Handle::try_current() {
            Ok(runtime) if !self.invite_linger.is_zero() => runtime,
            _ => {
                self.handlers.remove(&branch);
                return;
            }
        };
        let pending = Arc::downgrade(self);
        let linger = self.invite_linger;
        runtime.spawn(async move {
            tokio::time::sleep(linger).await;
            if let Some(pending) = pending.upgrade() {
                pending.handlers.remove(&branch);
                trace!(branch = %branch, "released INVITE callback");
            }
        });
    }

    /// Report a delivery failure for `branch` and drop its callback
    pub(crate) fn fail(&self, branch: &str, err: TransportError) {
        if let Some((_, pending)) = self.handlers.remove(branch) {
            (pending.handler)(Err(err));
        }
    }

    pub(crate) fn clear(&self) {
        self.handlers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sipprobe_sip_core::{CSeq, Via};

    fn response(status: u16, branch: &str, method: Method) -> SipMessage {
        SipMessage::response(status, "X")
            .with_header("Via", Via::new("UDP", "h", Some(5060)).with_branch(branch))
            .with_header("CSeq", CSeq::new(1, method))
    }

    #[test]
    fn test_dispatch_by_branch() {
        let pending = Arc::new(PendingResponses::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        pending.register(
            "z9hG4bKa".to_string(),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(pending.dispatch(response(100, "z9hG4bKa", Method::Options)).is_none());
        assert_eq!(pending.len(), 1);
        assert!(pending.dispatch(response(200, "z9hG4bKa", Method::Options)).is_none());
        assert_eq!(pending.len(), 0);
        assert!(pending.dispatch(response(200, "z9hG4bKa", Method::Options)).is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invite_released_at_once_without_linger() {
        let pending = Arc::new(PendingResponses::with_linger(Duration::ZERO));
        pending.register("z9hG4bKi".to_string(), Arc::new(|_| {}));
        assert!(pending.dispatch(response(180, "z9hG4bKi", Method::Invite)).is_none());
        assert_eq!(pending.len(), 1);
        assert!(pending.dispatch(response(200, "z9hG4bKi", Method::Invite)).is_none());
        assert_eq!(pending.len(), 0);
    }

    #[tokio::test]
    async fn test_invite_callback_lingers_for_retransmissions() {
        let pending = Arc::new(PendingResponses::with_linger(Duration::from_millis(50)));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        pending.register(
            "z9hG4bKi".to_string(),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(pending.dispatch(response(200, "z9hG4bKi", Method::Invite)).is_none());
        assert!(pending.dispatch(response(200, "z9hG4bKi", Method::Invite)).is_none());
        assert_eq!(pending.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(pending.len(), 0);
        assert!(pending.dispatch(response(200, "z9hG4bKi", Method::Invite)).is_some());
    }

    #[test]
    fn test_fail_drops_callback() {
        let pending = PendingResponses::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        pending.register(
            "z9hG4bKf".to_string(),
            Arc::new(move |res| {
                assert!(res.is_err());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        pending.fail("z9hG4bKf", TransportError::Closed);
        pending.fail("z9hG4bKf", TransportError::Closed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(pending.len(), 0);
    }
}
