//! Declared routes
//!
//! A route pairs a [`RouteSpec`] (address, kind, parameter schema and
//! flags) with a procedure. Services list their routes through
//! [`RouteSource`]; the router registers them with the dispatcher.
//!
//! ```text
//! RouteSpec::get("tempo")              ->  <namespace>/get/tempo
//!                                          <namespace>/start_listen/tempo
//!                                          <namespace>/stop_listen/tempo
//! RouteSpec::set("tempo")              ->  <namespace>/set/tempo
//! ```

use fastosc_core::address::{is_pattern, normalize};
use fastosc_core::{ArgKind, ArgValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Result, RouterError, ValidationError};
use crate::handler::{HandlerError, HandlerInfo, HandlerResult, IntoReply, Outcome, ParamInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Get,
    Set,
}

impl RouteKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RouteKind::Get => "/get",
            RouteKind::Set => "/set",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix()[1..])
    }
}

/// Route descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    kind: RouteKind,
    raw_address: String,
    name: Option<String>,
    params: Vec<ParamInfo>,
    returns: String,
    doc: Option<String>,
    listen: bool,
    include_remote_addr: bool,
    include_original_args: bool,
}

impl RouteSpec {
    fn new(kind: RouteKind, address: &str, listen: bool) -> Self {
        Self {
            kind,
            raw_address: normalize(address),
            name: None,
            params: Vec::new(),
            returns: "None".to_string(),
            doc: None,
            listen,
            include_remote_addr: false,
            include_original_args: false,
        }
    }

    /// A getter; listenable unless turned off with [`listen(false)`](Self::listen)
    pub fn get(address: &str) -> Self {
        Self::new(RouteKind::Get, address, true)
    }

    pub fn set(address: &str) -> Self {
        Self::new(RouteKind::Set, address, false)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a declared parameter
    pub fn param(mut self, name: impl Into<String>, kind: ArgKind) -> Self {
        self.params.push(ParamInfo::new(name, kind));
        self
    }

    /// Declared result type, for descriptions only
    pub fn returns(mut self, result_type: impl Into<String>) -> Self {
        self.returns = result_type.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn listen(mut self, listen: bool) -> Self {
        self.listen = listen;
        self
    }

    /// Pass the caller's endpoint to the procedure
    pub fn include_remote_addr(mut self) -> Self {
        self.include_remote_addr = true;
        self
    }

    /// Pass the unvalidated argument list to the procedure
    pub fn include_original_args(mut self) -> Self {
        self.include_original_args = true;
        self
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Address as declared, e.g. `/tempo`
    pub fn raw_address(&self) -> &str {
        &self.raw_address
    }

    /// Address relative to the namespace, e.g. `/get/tempo`
    pub fn address(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.raw_address)
    }

    /// Procedure name; derived from the address when not declared
    pub fn function_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "{}_{}",
                self.kind,
                self.raw_address.trim_matches('/').replace('/', "_")
            ),
        }
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    pub fn is_listenable(&self) -> bool {
        self.listen
    }

    /// Check the descriptor is well formed
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| RouterError::InvalidRoute {
            address: self.address(),
            reason: reason.to_string(),
        };

        if self.raw_address == "/" {
            return Err(invalid("address cannot be empty"));
        }
        if is_pattern(&self.raw_address) {
            return Err(invalid("address cannot contain '*'"));
        }
        if self.listen && self.kind != RouteKind::Get {
            return Err(invalid("only get routes can be listened to"));
        }
        for (i, param) in self.params.iter().enumerate() {
            if param.name.is_empty() {
                return Err(invalid(&format!("parameter {} has no name", i)));
            }
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(invalid(&format!("duplicate parameter '{}'", param.name)));
            }
        }
        Ok(())
    }

    /// Check received arguments against the declared schema
    pub fn check_args(&self, args: &[ArgValue]) -> std::result::Result<(), ValidationError> {
        if args.len() != self.params.len() {
            return Err(ValidationError::ArgumentCount {
                expected: self.params.len(),
                received: args.len(),
            });
        }
        for (index, (arg, param)) in args.iter().zip(&self.params).enumerate() {
            if !param.kind.accepts(arg) {
                return Err(ValidationError::ArgumentKind {
                    index,
                    value: arg.to_string(),
                    found: arg.kind(),
                    expected: param.kind,
                });
            }
        }
        Ok(())
    }

    pub fn handler_info(&self) -> HandlerInfo {
        HandlerInfo {
            function_name: Some(self.function_name()),
            params: self.params.clone(),
            result_type: self.returns.clone(),
            doc: self.doc.clone(),
        }
    }
}

/// Arguments handed to a route procedure
#[derive(Debug, Clone, Copy)]
pub struct RouteCall<'a> {
    args: &'a [ArgValue],
    remote: Option<SocketAddr>,
    original: Option<&'a [ArgValue]>,
}

impl<'a> RouteCall<'a> {
    pub fn args(&self) -> &'a [ArgValue] {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Caller endpoint, present when the route includes it
    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Untouched argument list, present when the route includes it
    pub fn original_args(&self) -> Option<&'a [ArgValue]> {
        self.original
    }

    pub fn arg(&self, index: usize) -> std::result::Result<&'a ArgValue, HandlerError> {
        self.args.get(index).ok_or(HandlerError::Argument {
            index,
            expected: ArgKind::Any,
        })
    }

    pub fn int(&self, index: usize) -> std::result::Result<i64, HandlerError> {
        self.typed(index, ArgKind::Int, ArgValue::as_i64)
    }

    /// A float argument; integers are widened
    pub fn float(&self, index: usize) -> std::result::Result<f64, HandlerError> {
        self.typed(index, ArgKind::Float, ArgValue::as_f64)
    }

    pub fn bool(&self, index: usize) -> std::result::Result<bool, HandlerError> {
        self.typed(index, ArgKind::Bool, ArgValue::as_bool)
    }

    pub fn string(&self, index: usize) -> std::result::Result<&'a str, HandlerError> {
        self.typed(index, ArgKind::String, ArgValue::as_str)
    }

    fn typed<T>(
        &self,
        index: usize,
        expected: ArgKind,
        get: impl FnOnce(&'a ArgValue) -> Option<T>,
    ) -> std::result::Result<T, HandlerError> {
        self.args
            .get(index)
            .and_then(get)
            .ok_or(HandlerError::Argument { index, expected })
    }
}

type Procedure = dyn Fn(&RouteCall<'_>) -> std::result::Result<Vec<ArgValue>, HandlerError> + Send + Sync;

/// A descriptor with its procedure
pub struct Route {
    spec: RouteSpec,
    procedure: Arc<Procedure>,
}

impl Route {
    pub fn new<F, R>(spec: RouteSpec, procedure: F) -> Self
    where
        F: Fn(&RouteCall<'_>) -> std::result::Result<R, HandlerError> + Send + Sync + 'static,
        R: IntoReply,
    {
        Self {
            spec,
            procedure: Arc::new(move |call: &RouteCall<'_>| procedure(call).map(IntoReply::into_reply)),
        }
    }

    pub fn spec(&self) -> &RouteSpec {
        &self.spec
    }

    /// Validate and call.
    ///
    /// Arguments that do not fit the schema make the call
    /// [`Outcome::NotApplicable`]; the procedure is not run.
    pub fn invoke(&self, args: &[ArgValue], remote: SocketAddr) -> HandlerResult {
        if let Err(e) = self.spec.check_args(args) {
            return Ok(Outcome::NotApplicable(e.to_string()));
        }
        self.call(args, remote).map(Outcome::reply)
    }

    /// Call without validating; the response list as the procedure built it
    pub fn call(&self, args: &[ArgValue], remote: SocketAddr) -> std::result::Result<Vec<ArgValue>, HandlerError> {
        let call = RouteCall {
            args,
            remote: self.spec.include_remote_addr.then_some(remote),
            original: self.spec.include_original_args.then_some(args),
        };
        (self.procedure)(&call)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("spec", &self.spec).finish_non_exhaustive()
    }
}

/// Routes collected for one router
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F, R>(&mut self, spec: RouteSpec, procedure: F) -> &mut Self
    where
        F: Fn(&RouteCall<'_>) -> std::result::Result<R, HandlerError> + Send + Sync + 'static,
        R: IntoReply,
    {
        self.routes.push(Route::new(spec, procedure));
        self
    }

    pub fn push(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

/// A service that declares its routes
pub trait RouteSource: Send + Sync + 'static {
    fn declare_routes(service: &Arc<Self>, table: &mut RouteTable)
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn test_addresses() {
        let spec = RouteSpec::get("track/volume");
        assert_eq!(spec.raw_address(), "/track/volume");
        assert_eq!(spec.address(), "/get/track/volume");
        assert_eq!(spec.function_name(), "get_track_volume");
        assert!(spec.is_listenable());

        let spec = RouteSpec::set("/tempo").name("set_tempo");
        assert_eq!(spec.address(), "/set/tempo");
        assert_eq!(spec.function_name(), "set_tempo");
        assert!(!spec.is_listenable());
    }

    #[test]
    fn test_validate() {
        assert!(RouteSpec::get("tempo").validate().is_ok());
        assert!(RouteSpec::get("").validate().is_err());
        assert!(RouteSpec::get("track/*").validate().is_err());
        assert!(RouteSpec::set("tempo").listen(true).validate().is_err());
        assert!(RouteSpec::get("x")
            .param("a", ArgKind::Int)
            .param("a", ArgKind::Int)
            .validate()
            .is_err());
        assert!(RouteSpec::get("x").param("", ArgKind::Int).validate().is_err());
    }

    #[test]
    fn test_check_args() {
        let spec = RouteSpec::get("track/volume")
            .param("track", ArgKind::Int)
            .param("name", ArgKind::String);

        assert!(spec.check_args(&[1.into(), "a".into()]).is_ok());
        assert_eq!(
            spec.check_args(&[1.into()]),
            Err(ValidationError::ArgumentCount {
                expected: 2,
                received: 1
            })
        );

        let err = spec.check_args(&["a".into(), "b".into()]).unwrap_err();
        assert_eq!(err.to_string(), "arg 'a' of type <str> does not match <int>");
    }

    #[test]
    fn test_invoke_wraps_bare_values() {
        let route = Route::new(RouteSpec::get("tempo"), |_| Ok(120.0));
        assert_eq!(
            route.invoke(&[], remote()).unwrap(),
            Outcome::Reply(vec![ArgValue::Float(120.0)])
        );

        let route = Route::new(RouteSpec::get("pair"), |_| Ok(vec![ArgValue::Int(1), ArgValue::Int(2)]));
        assert_eq!(
            route.invoke(&[], remote()).unwrap(),
            Outcome::Reply(vec![ArgValue::Int(1), ArgValue::Int(2)])
        );
    }

    #[test]
    fn test_invoke_rejects_mismatch() {
        let route = Route::new(RouteSpec::get("x").param("i", ArgKind::Int), |call| call.int(0));
        assert!(!route.invoke(&[], remote()).unwrap().is_applicable());
        assert!(!route.invoke(&[true.into()], remote()).unwrap().is_applicable());
        assert_eq!(
            route.invoke(&[7.into()], remote()).unwrap(),
            Outcome::Reply(vec![ArgValue::Int(7)])
        );
    }

    #[test]
    fn test_optional_call_parts() {
        let route = Route::new(
            RouteSpec::get("whoami").include_remote_addr().include_original_args(),
            |call| {
                let remote = call.remote().map(|r| r.to_string()).unwrap_or_default();
                let original = call.original_args().map(|a| a.len() as i64).unwrap_or(-1);
                Ok(vec![ArgValue::from(remote), ArgValue::from(original)])
            },
        );
        assert_eq!(
            route.call(&[], remote()).unwrap(),
            vec![ArgValue::from("127.0.0.1:9000"), ArgValue::Int(0)]
        );

        let plain = Route::new(RouteSpec::get("plain"), |call| Ok(call.remote().is_none()));
        assert_eq!(plain.call(&[], remote()).unwrap(), vec![ArgValue::Bool(true)]);
    }
}
