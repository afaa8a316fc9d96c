//! FastOSC Router
//!
//! Routing for inbound FastOSC traffic:
//! - [`Dispatcher`] owns the address table and dispatches decoded
//!   messages and bundles, with wildcard fan-out
//! - [`OscRouter`] registers declared routes under a namespace, checks
//!   argument schemas at call time and manages listen subscriptions
//!
//! # Example
//!
//! ```
//! use fastosc_core::ArgKind;
//! use fastosc_router::{Dispatcher, DispatcherConfig, OscRouter, RouteSpec};
//! use std::sync::Arc;
//!
//! let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig::default()));
//! let router = OscRouter::builder(Arc::clone(&dispatcher), "song")
//!     .route(RouteSpec::get("tempo").returns("float"), |_call| Ok(120.0))
//!     .route(
//!         RouteSpec::set("tempo").param("bpm", ArgKind::Float),
//!         |call| {
//!             let _bpm = call.float(0)?;
//!             Ok(())
//!         },
//!     )
//!     .build()?;
//!
//! assert!(dispatcher.is_registered("/song/get/tempo"));
//! assert!(dispatcher.is_registered("/song/start_listen/tempo"));
//! assert_eq!(router.addresses().len(), 4);
//! # Ok::<(), fastosc_router::RouterError>(())
//! ```

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod listener;
pub mod route;
pub mod router;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{Result, RouterError, ValidationError};
pub use handler::{
    Handler, HandlerDescription, HandlerError, HandlerInfo, HandlerResult, IntoReply, Outcome,
    ParamInfo,
};
pub use listener::{
    CancelHandle, ChangeCallback, ListenerKey, ListenerTable, NoSubscriptions,
    SubscriptionProvider,
};
pub use route::{Route, RouteCall, RouteKind, RouteSource, RouteSpec, RouteTable};
pub use router::{OscRouter, RouterBuilder};
