//! Address table and inbound dispatch
//!
//! The dispatcher maps full addresses (base address included) to
//! handlers. Inbound messages are matched exactly first; an address
//! containing `*` fans out to every registered address the pattern
//! matches, in registration order. Replies go back to the sender through
//! the injected [`DatagramSender`].

use fastosc_core::address::{self, is_pattern};
use fastosc_core::{encode_message, ArgValue, Bundle, Message, Packet, WildcardMatch, WildcardPattern};
use fastosc_transport::{DatagramSender, PacketSink};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Span};

use crate::error::{Result, RouterError};
use crate::handler::{Handler, HandlerDescription, HandlerError, HandlerInfo, HandlerResult, Outcome};

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name used in log spans
    pub name: String,
    /// Prefix applied to every registered address; `""` and `"/"` add none
    pub base_address: String,
    /// Anchoring of inbound wildcard patterns
    pub wildcard: WildcardMatch,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "fastosc".to_string(),
            base_address: String::new(),
            wildcard: WildcardMatch::Prefix,
        }
    }
}

/// Handlers keyed by address, remembering first-registration order
#[derive(Default)]
struct HandlerTable {
    order: Vec<String>,
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    fn insert(&mut self, address: String, handler: Handler) -> bool {
        let replaced = self.handlers.insert(address.clone(), handler).is_some();
        if !replaced {
            self.order.push(address);
        }
        replaced
    }

    fn matching(&self, pattern: &WildcardPattern) -> Vec<(String, Handler)> {
        self.order
            .iter()
            .filter(|address| pattern.matches(address))
            .filter_map(|address| {
                self.handlers
                    .get(address)
                    .map(|h| (address.clone(), Arc::clone(h)))
            })
            .collect()
    }
}

pub struct Dispatcher {
    config: DispatcherConfig,
    base: String,
    table: RwLock<HandlerTable>,
    descriptions: RwLock<Vec<HandlerDescription>>,
    sender: RwLock<Option<Arc<dyn DatagramSender>>>,
    span: Span,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let span = tracing::info_span!("dispatcher", name = %config.name);
        Self::with_span(config, span)
    }

    /// Create a dispatcher that logs inside the given span
    pub fn with_span(config: DispatcherConfig, span: Span) -> Self {
        let base = address::prefix(&config.base_address);
        Self {
            config,
            base,
            table: RwLock::new(HandlerTable::default()),
            descriptions: RwLock::new(Vec::new()),
            sender: RwLock::new(None),
            span,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Normalized base address (empty for the root)
    pub fn base_address(&self) -> &str {
        &self.base
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Install the transport replies are sent through
    pub fn set_sender(&self, sender: Arc<dyn DatagramSender>) {
        *self.sender.write() = Some(sender);
    }

    pub fn has_sender(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Register a handler under `base + address` and return that full
    /// address. A later registration at the same address replaces the
    /// earlier one.
    pub fn register<F>(&self, address: &str, handler: F, info: Option<HandlerInfo>) -> String
    where
        F: Fn(&[ArgValue], SocketAddr) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(address, Arc::new(handler), info)
    }

    pub fn register_handler(&self, address: &str, handler: Handler, info: Option<HandlerInfo>) -> String {
        let _enter = self.span.enter();
        let full = address::join(&self.base, address);

        if self.table.write().insert(full.clone(), handler) {
            debug!("Replaced handler at {}", full);
        }

        let mut descriptions = self.descriptions.write();
        let existing = descriptions.iter().position(|d| d.address == full);
        match (info, existing) {
            (Some(info), existing) => {
                let desc = HandlerDescription::new(full.clone(), info);
                info!("{}", desc.summary());
                match existing {
                    Some(index) => descriptions[index] = desc,
                    None => descriptions.push(desc),
                }
            }
            // The replacing handler carries no metadata
            (None, Some(index)) => {
                descriptions.remove(index);
                info!("Added route {}", full);
            }
            (None, None) => info!("Added route {}", full),
        }
        drop(descriptions);

        full
    }

    pub fn is_registered(&self, address: &str) -> bool {
        self.table.read().handlers.contains_key(address)
    }

    /// Registered addresses in registration order
    pub fn addresses(&self) -> Vec<String> {
        self.table.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().handlers.is_empty()
    }

    /// Remove every handler and its description
    pub fn clear(&self) {
        let _enter = self.span.enter();
        *self.table.write() = HandlerTable::default();
        self.descriptions.write().clear();
        info!("Cleared all handlers");
    }

    /// Metadata of every described registration, in registration order
    pub fn descriptions(&self) -> Vec<HandlerDescription> {
        self.descriptions.read().clone()
    }

    pub fn descriptions_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.descriptions.read())?)
    }

    /// Encode and send a message, logging any failure.
    ///
    /// With `include_base` the dispatcher's base address is prepended.
    pub fn send(&self, address: &str, remote: SocketAddr, args: &[ArgValue], include_base: bool) {
        if let Err(e) = self.try_send(address, remote, args, include_base) {
            let _enter = self.span.enter();
            match e {
                RouterError::NoSender(remote) => error!(
                    "Trying to send OSC message to remote address {}, but no sender is set up",
                    remote
                ),
                e => error!("Failed to send {} to {}: {}", address, remote, e),
            }
        }
    }

    pub fn try_send(&self, address: &str, remote: SocketAddr, args: &[ArgValue], include_base: bool) -> Result<()> {
        let sender = self.sender.read().clone().ok_or(RouterError::NoSender(remote))?;

        let address = if include_base {
            address::join(&self.base, address)
        } else {
            address.to_string()
        };
        let frame = encode_message(&address, args)?;
        sender.send_to(frame.as_bytes(), remote)?;

        let _enter = self.span.enter();
        debug!("Sent {} {} to {}", address, frame.type_tags(), remote);
        Ok(())
    }

    /// Dispatch one message.
    ///
    /// Returns an error only when a handler fails hard; misses, wildcard
    /// patterns matching nothing and inapplicable handlers are logged.
    pub fn process_message(&self, message: &Message, remote: SocketAddr) -> Result<()> {
        let _enter = self.span.enter();

        let exact = self.table.read().handlers.get(&message.address).cloned();
        if let Some(handler) = exact {
            match call(&message.address, &handler, &message.args, remote)? {
                Outcome::Reply(values) => self.send(&message.address, remote, &values, false),
                Outcome::Silent => {}
                Outcome::NotApplicable(reason) => {
                    warn!("Ignoring {} from {}: {}", message.address, remote, reason);
                }
            }
            return Ok(());
        }

        if is_pattern(&message.address) {
            let pattern = WildcardPattern::compile(&message.address, self.config.wildcard)?;
            // Handlers run outside the table lock so they may register or send
            let candidates = self.table.read().matching(&pattern);
            if candidates.is_empty() {
                debug!("No routes match {}", message.address);
            }

            for (address, handler) in candidates {
                match call(&address, &handler, &message.args, remote)? {
                    Outcome::Reply(values) => self.send(&address, remote, &values, false),
                    Outcome::Silent => {}
                    Outcome::NotApplicable(reason) => {
                        debug!("Skipping {} for {}: {}", address, message.address, reason);
                    }
                }
            }
            return Ok(());
        }

        error!("Unknown OSC address: {}", message.address);
        Ok(())
    }

    /// Dispatch every message of a bundle, depth first, in order
    pub fn process_bundle(&self, bundle: &Bundle, remote: SocketAddr) -> Result<()> {
        for element in &bundle.content {
            self.process_packet(element, remote)?;
        }
        Ok(())
    }

    pub fn process_packet(&self, packet: &Packet, remote: SocketAddr) -> Result<()> {
        match packet {
            Packet::Message(message) => self.process_message(message, remote),
            Packet::Bundle(bundle) => self.process_bundle(bundle, remote),
        }
    }
}

/// Run a handler. An argument error raised by the handler itself counts
/// as not applicable, the same as a schema mismatch.
fn call(address: &str, handler: &Handler, args: &[ArgValue], remote: SocketAddr) -> Result<Outcome> {
    match handler(args, remote) {
        Ok(outcome) => Ok(outcome),
        Err(e @ HandlerError::Argument { .. }) => Ok(Outcome::NotApplicable(e.to_string())),
        Err(source) => Err(RouterError::Handler {
            address: address.to_string(),
            source,
        }),
    }
}

impl PacketSink for Dispatcher {
    type Error = RouterError;

    fn process_packet(&self, packet: &Packet, remote: SocketAddr) -> Result<()> {
        Dispatcher::process_packet(self, packet, remote)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("routes", &self.len())
            .field("has_sender", &self.has_sender())
            .finish()
    }
}
