//! Core Engine implementation
//!
//! The [`Engine`] owns three tables:
//!
//! ```text
//! endpoints    EndpointId           → EndpointRecord (transport + Contact)
//! dialogs      DialogId             → Dialog
//! correlation  (Call-ID, EndpointId) → DialogId
//! ```
//!
//! Correlation is keyed by Call-ID per endpoint, so two endpoints of the
//! same engine can sit on both ends of one call. Transport callbacks hold a
//! weak reference to the engine; dropping the last [`Engine`] clone tears
//! everything down.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use sipprobe_sip_core::{DigestAuthenticator, Md5Digest};

use crate::config::{EndpointOptions, EngineConfig};
use crate::dialog::{Dialog, DialogId, EndpointId};
use crate::endpoint::{EndpointInfo, EndpointRecord};
use crate::errors::{DialogError, DialogResult};
use crate::events::{ErrorOrigin, EventHub, EventKind, EventReceiver};
use crate::transport::{RequestHandler, TransportFactory, TransportOptions};

pub(crate) type CorrelationKey = (String, EndpointId);

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) factory: Arc<dyn TransportFactory>,
    pub(crate) digest: Arc<dyn DigestAuthenticator>,
    pub(crate) endpoints: DashMap<EndpointId, Arc<EndpointRecord>>,
    pub(crate) dialogs: DashMap<DialogId, Arc<Mutex<Dialog>>>,
    pub(crate) correlation: Mutex<HashMap<CorrelationKey, DialogId>>,
    pub(crate) events: EventHub,
}

/// Programmable SIP user agent core
///
/// Cheap to clone; all clones share the same endpoints, dialogs and event
/// stream.
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Arc<EngineInner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("endpoints", &self.inner.endpoints.len())
            .field("dialogs", &self.inner.dialogs.len())
            .finish()
    }
}

impl Engine {
    /// Create an engine signing and challenging with MD5 digest
    pub fn new(config: EngineConfig, factory: Arc<dyn TransportFactory>) -> DialogResult<(Self, EventReceiver)> {
        Self::with_authenticator(config, factory, Arc::new(Md5Digest::new()))
    }

    pub fn with_authenticator(
        config: EngineConfig,
        factory: Arc<dyn TransportFactory>,
        digest: Arc<dyn DigestAuthenticator>,
    ) -> DialogResult<(Self, EventReceiver)> {
        config.validate()?;
        let (events, receiver) = EventHub::new();
        let engine = Self {
            inner: Arc::new(EngineInner {
                config,
                factory,
                digest,
                endpoints: DashMap::new(),
                dialogs: DashMap::new(),
                correlation: Mutex::new(HashMap::new()),
                events,
            }),
        };
        Ok((engine, receiver))
    }

    pub(crate) fn from_weak(weak: &Weak<EngineInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // Endpoint lifecycle

    /// Bind a new endpoint. Fails with a configuration error when the
    /// options lack an address or port, without touching any table.
    pub fn create_endpoint(&self, options: EndpointOptions) -> DialogResult<EndpointId> {
        let (address, port) = options.validate()?;
        let id = EndpointId::new();

        let weak = Arc::downgrade(&self.inner);
        let on_request: RequestHandler = Arc::new(move |msg| {
            if let Some(engine) = Engine::from_weak(&weak) {
                engine.handle_inbound(id, msg);
            }
        });
        let transport_options = TransportOptions {
            address,
            port,
            public_address: options.public_address.clone(),
            kind: options.transport,
        };
        let transport = self.inner.factory.create(&transport_options, on_request)?;

        let contact_user = options
            .contact_user
            .as_deref()
            .unwrap_or(&self.inner.config.contact_user);
        let record = EndpointRecord::new(
            id,
            transport,
            &self.inner.config.contact_scheme,
            contact_user,
            options.public_address,
            options.transport,
        );
        info!(endpoint = %id, contact = %record.contact(), "endpoint created");
        self.inner.endpoints.insert(id, Arc::new(record));
        Ok(id)
    }

    /// Release an endpoint's transport.
    ///
    /// Its dialogs stay readable but are dropped from correlation, and each
    /// one is reported with an `error` event of origin `endpoint_destroyed`.
    pub fn destroy_endpoint(&self, endpoint_id: EndpointId) -> DialogResult<()> {
        let (_, record) = self
            .inner
            .endpoints
            .remove(&endpoint_id)
            .ok_or_else(|| DialogError::EndpointNotFound {
                id: endpoint_id.to_string(),
            })?;
        record.destroy();

        let orphaned: Vec<DialogId> = {
            let mut correlation = self.inner.correlation.lock();
            let keys: Vec<CorrelationKey> = correlation
                .keys()
                .filter(|(_, owner)| *owner == endpoint_id)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| correlation.remove(key)).collect()
        };
        for dialog_id in &orphaned {
            warn!(endpoint = %endpoint_id, dialog = %dialog_id, "dialog orphaned by endpoint destroy");
            self.emit(
                endpoint_id,
                EventKind::Error {
                    origin: ErrorOrigin::EndpointDestroyed,
                    details: format!("endpoint {} destroyed", endpoint_id),
                    dialog_id: Some(*dialog_id),
                },
            );
        }
        info!(endpoint = %endpoint_id, orphaned = orphaned.len(), "endpoint destroyed");
        Ok(())
    }

    pub fn endpoint(&self, endpoint_id: EndpointId) -> DialogResult<EndpointInfo> {
        self.endpoint_record(endpoint_id).map(|record| record.info.clone())
    }

    /// Contact URI the endpoint writes into every outbound message
    pub fn endpoint_contact(&self, endpoint_id: EndpointId) -> DialogResult<String> {
        self.endpoint_record(endpoint_id)
            .map(|record| record.contact().to_string())
    }

    /// Requests sent from `endpoint_id` whose response callbacks are
    /// still registered with its transport
    pub fn pending_responses(&self, endpoint_id: EndpointId) -> DialogResult<usize> {
        self.endpoint_record(endpoint_id)
            .map(|record| record.pending_responses())
    }

    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints.len()
    }

    pub(crate) fn endpoint_record(&self, endpoint_id: EndpointId) -> DialogResult<Arc<EndpointRecord>> {
        self.inner
            .endpoints
            .get(&endpoint_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DialogError::EndpointNotFound {
                id: endpoint_id.to_string(),
            })
    }

    // Dialog table

    /// Snapshot of a dialog
    pub fn dialog(&self, dialog_id: DialogId) -> DialogResult<Dialog> {
        self.dialog_handle(dialog_id).map(|handle| handle.lock().clone())
    }

    /// Dialog correlated with `call_id` on `endpoint_id`
    pub fn find_dialog(&self, call_id: &str, endpoint_id: EndpointId) -> Option<DialogId> {
        self.inner
            .correlation
            .lock()
            .get(&(call_id.to_string(), endpoint_id))
            .copied()
    }

    /// Dialogs currently correlated on `endpoint_id`
    pub fn dialogs_for_endpoint(&self, endpoint_id: EndpointId) -> Vec<DialogId> {
        self.inner
            .correlation
            .lock()
            .iter()
            .filter(|((_, owner), _)| *owner == endpoint_id)
            .map(|(_, dialog_id)| *dialog_id)
            .collect()
    }

    pub fn dialog_count(&self) -> usize {
        self.inner.dialogs.len()
    }

    /// Mark a dialog terminated. It stays correlated, so late requests for
    /// its Call-ID still classify as in-dialog; sending on it is refused.
    pub fn terminate_dialog(&self, dialog_id: DialogId) -> DialogResult<()> {
        let handle = self.dialog_handle(dialog_id)?;
        handle.lock().terminate();
        debug!(dialog = %dialog_id, "dialog terminated");
        Ok(())
    }

    /// Remove a dialog from every table and return its final state
    pub fn retire_dialog(&self, dialog_id: DialogId) -> DialogResult<Dialog> {
        let (_, handle) = self
            .inner
            .dialogs
            .remove(&dialog_id)
            .ok_or_else(|| DialogError::DialogNotFound {
                id: dialog_id.to_string(),
            })?;
        let dialog = handle.lock().clone();
        let key = (dialog.call_id.clone(), dialog.endpoint_id);
        let mut correlation = self.inner.correlation.lock();
        if correlation.get(&key) == Some(&dialog_id) {
            correlation.remove(&key);
        }
        debug!(dialog = %dialog_id, "dialog retired");
        Ok(dialog)
    }

    pub(crate) fn dialog_handle(&self, dialog_id: DialogId) -> DialogResult<Arc<Mutex<Dialog>>> {
        self.inner
            .dialogs
            .get(&dialog_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DialogError::DialogNotFound {
                id: dialog_id.to_string(),
            })
    }

    /// Add a dialog to the tables; fails if its Call-ID is already
    /// correlated on the same endpoint.
    pub(crate) fn register_dialog(&self, dialog: Dialog) -> DialogResult<DialogId> {
        let dialog_id = dialog.id;
        let key = (dialog.call_id.clone(), dialog.endpoint_id);
        let mut correlation = self.inner.correlation.lock();
        if correlation.contains_key(&key) {
            return Err(DialogError::configuration(format!(
                "Call-ID {} already has a dialog on endpoint {}",
                key.0, key.1
            )));
        }
        self.inner.dialogs.insert(dialog_id, Arc::new(Mutex::new(dialog)));
        correlation.insert(key, dialog_id);
        Ok(dialog_id)
    }

    pub(crate) fn emit(&self, endpoint_id: EndpointId, kind: EventKind) {
        self.inner.events.emit(endpoint_id, kind);
    }
}
