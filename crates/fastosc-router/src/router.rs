//! Namespaced router
//!
//! The router registers declared routes with a [`Dispatcher`]:
//!
//! ```text
//! base + namespace + /get/<address>            route procedure
//! base + namespace + /set/<address>            route procedure
//! base + namespace + /start_listen/<address>   subscribe, then send value
//! base + namespace + /stop_listen/<address>    unsubscribe, then send value
//! ```
//!
//! Listen routes are derived for every listenable getter. Subscriptions
//! are delegated to a [`SubscriptionProvider`]; when the provider reports
//! a change the getter is re-run and its value pushed to the subscriber.

use fastosc_core::address;
use fastosc_core::ArgValue;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn, Span};

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::handler::{HandlerError, HandlerResult, IntoReply, Outcome};
use crate::listener::{ChangeCallback, ListenerKey, ListenerTable, NoSubscriptions, SubscriptionProvider};
use crate::route::{Route, RouteCall, RouteSource, RouteSpec, RouteTable};

const START_LISTEN: &str = "/start_listen";
const STOP_LISTEN: &str = "/stop_listen";

pub struct RouterBuilder {
    dispatcher: Arc<Dispatcher>,
    namespace: String,
    provider: Arc<dyn SubscriptionProvider>,
    routes: RouteTable,
}

impl RouterBuilder {
    /// Subscription provider for listen routes; without one every start
    /// request just sends the current value
    pub fn provider(mut self, provider: Arc<dyn SubscriptionProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn route<F, R>(mut self, spec: RouteSpec, procedure: F) -> Self
    where
        F: Fn(&RouteCall<'_>) -> std::result::Result<R, HandlerError> + Send + Sync + 'static,
        R: IntoReply,
    {
        self.routes.add(spec, procedure);
        self
    }

    pub fn routes(mut self, routes: RouteTable) -> Self {
        for route in routes.into_routes() {
            self.routes.push(route);
        }
        self
    }

    /// Add every route a service declares
    pub fn mount<S: RouteSource>(mut self, service: &Arc<S>) -> Self {
        S::declare_routes(service, &mut self.routes);
        self
    }

    /// Validate every route, then register them all
    pub fn build(self) -> Result<OscRouter> {
        for route in self.routes.iter() {
            route.spec().validate()?;
        }

        let span = tracing::info_span!(parent: self.dispatcher.span(), "router", namespace = %self.namespace);
        let listeners = Arc::new(ListenerTable::new());
        let mut addresses = Vec::new();

        for route in self.routes.into_routes() {
            let route = Arc::new(route);
            let relative = format!("{}{}", self.namespace, route.spec().address());

            let handler_route = Arc::clone(&route);
            let full = self.dispatcher.register(
                &relative,
                move |args: &[ArgValue], remote: SocketAddr| handler_route.invoke(args, remote),
                Some(route.spec().handler_info()),
            );
            addresses.push(full.clone());

            if !route.spec().is_listenable() {
                continue;
            }

            let context = Arc::new(ListenContext {
                dispatcher: Arc::downgrade(&self.dispatcher),
                route: Arc::clone(&route),
                provider: Arc::clone(&self.provider),
                listeners: Arc::clone(&listeners),
                key_address: full,
                reply_address: relative,
                span: span.clone(),
            });

            for (prefix, start) in [(START_LISTEN, true), (STOP_LISTEN, false)] {
                let ctx = Arc::clone(&context);
                let listen_address = format!("{}{}{}", self.namespace, prefix, route.spec().raw_address());
                let full = self.dispatcher.register(
                    &listen_address,
                    move |args: &[ArgValue], remote: SocketAddr| {
                        if start {
                            ctx.start(args, remote)
                        } else {
                            ctx.stop(args, remote)
                        }
                    },
                    Some(route.spec().handler_info()),
                );
                addresses.push(full);
            }
        }

        Ok(OscRouter {
            dispatcher: self.dispatcher,
            namespace: self.namespace,
            listeners,
            addresses,
            span,
        })
    }
}

/// A set of routes registered under one namespace
pub struct OscRouter {
    dispatcher: Arc<Dispatcher>,
    namespace: String,
    listeners: Arc<ListenerTable>,
    addresses: Vec<String>,
    span: Span,
}

impl OscRouter {
    pub fn builder(dispatcher: Arc<Dispatcher>, namespace: &str) -> RouterBuilder {
        RouterBuilder {
            dispatcher,
            namespace: address::prefix(namespace),
            provider: Arc::new(NoSubscriptions),
            routes: RouteTable::new(),
        }
    }

    /// Build a router for a single service
    pub fn for_service<S>(dispatcher: Arc<Dispatcher>, namespace: &str, service: Arc<S>) -> Result<Self>
    where
        S: RouteSource + SubscriptionProvider,
    {
        let provider: Arc<dyn SubscriptionProvider> = service.clone();
        Self::builder(dispatcher, namespace)
            .provider(provider)
            .mount(&service)
            .build()
    }

    /// Normalized namespace (empty for the root)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Full addresses this router registered, in registration order
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listener_keys(&self) -> Vec<ListenerKey> {
        self.listeners.keys()
    }

    /// Cancel every active subscription
    pub fn clear_listeners(&self) -> usize {
        let _enter = self.span.enter();
        let count = self.listeners.clear();
        info!("Cleared {} listeners", count);
        count
    }
}

impl std::fmt::Debug for OscRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscRouter")
            .field("namespace", &self.namespace)
            .field("routes", &self.addresses.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Shared state of one getter's start/stop listen handlers
struct ListenContext {
    dispatcher: Weak<Dispatcher>,
    route: Arc<Route>,
    provider: Arc<dyn SubscriptionProvider>,
    listeners: Arc<ListenerTable>,
    /// Full getter address, base included
    key_address: String,
    /// Getter address relative to the base; replies add the base back
    reply_address: String,
    span: Span,
}

impl ListenContext {
    fn start(&self, args: &[ArgValue], remote: SocketAddr) -> HandlerResult {
        let _enter = self.span.enter();
        if let Err(e) = self.route.spec().check_args(args) {
            return Ok(Outcome::NotApplicable(e.to_string()));
        }

        let key = ListenerKey::new(remote, self.key_address.as_str(), args.to_vec());
        info!("{}", key);

        let mut added = false;
        if self.listeners.contains(&key) {
            info!(
                "listener already existing for {} and args {:?} for client@{}",
                self.key_address, args, remote
            );
        } else {
            let on_change = self.on_change(args.to_vec(), remote);
            match self.provider.subscribe(self.route.spec().raw_address(), args, on_change) {
                Some(handle) => match self.listeners.insert(key.clone(), handle) {
                    None => {
                        added = true;
                        info!(
                            "listener added for {} and args {:?} for client@{}",
                            self.key_address, args, remote
                        );
                    }
                    Some(duplicate) => duplicate.cancel(),
                },
                None => info!(
                    "start listen called for {} and args {:?}, but no listener was added",
                    self.key_address, args
                ),
            }
        }

        if let Err(e) = self.send_current(args, remote) {
            // A getter that cannot be read leaves no subscription behind
            if added && self.listeners.stop(&key) {
                warn!("listener removed for {}: getter failed", key);
            }
            return Err(e);
        }
        Ok(Outcome::Silent)
    }

    fn stop(&self, args: &[ArgValue], remote: SocketAddr) -> HandlerResult {
        let _enter = self.span.enter();
        if let Err(e) = self.route.spec().check_args(args) {
            return Ok(Outcome::NotApplicable(e.to_string()));
        }

        let key = ListenerKey::new(remote, self.key_address.as_str(), args.to_vec());
        if self.listeners.stop(&key) {
            info!(
                "listener stopped for {} and args {:?} for client@{}",
                self.key_address, args, remote
            );
        } else {
            debug!("No listener to stop for {}", key);
        }

        self.send_current(args, remote)?;
        Ok(Outcome::Silent)
    }

    /// Run the getter and send its value to the requester
    fn send_current(&self, args: &[ArgValue], remote: SocketAddr) -> std::result::Result<(), HandlerError> {
        let values = self.route.call(args, remote)?;
        push(&self.dispatcher, &self.reply_address, remote, values);
        Ok(())
    }

    fn on_change(&self, args: Vec<ArgValue>, remote: SocketAddr) -> ChangeCallback {
        let dispatcher = Weak::clone(&self.dispatcher);
        let route = Arc::downgrade(&self.route);
        let reply_address = self.reply_address.clone();
        let span = self.span.clone();

        Arc::new(move || {
            let _enter = span.enter();
            let Some(route) = route.upgrade() else {
                debug!("Change for {} after its route was removed", reply_address);
                return;
            };
            match route.call(&args, remote) {
                Ok(values) => push(&dispatcher, &reply_address, remote, values),
                Err(e) => warn!("Failed to read {} for client@{}: {}", reply_address, remote, e),
            }
        })
    }
}

fn push(dispatcher: &Weak<Dispatcher>, address: &str, remote: SocketAddr, values: Vec<ArgValue>) {
    let Some(dispatcher) = dispatcher.upgrade() else {
        return;
    };
    match Outcome::reply(values) {
        Outcome::Reply(values) => dispatcher.send(address, remote, &values, true),
        _ => debug!("No value to send for {}", address),
    }
}
