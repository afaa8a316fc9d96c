//! In-memory parameter store served by `fastosc serve`
//!
//! Routes, under the router namespace:
//! ```text
//! /get/tempo              -> tempo            (listenable)
//! /set/tempo  bpm
//! /get/param  name        -> value            (listenable)
//! /set/param  name value
//! /get/params             -> name...
//! ```

use fastosc_core::{ArgKind, ArgValue};
use fastosc_router::{
    CancelHandle, ChangeCallback, HandlerError, RouteSource, RouteSpec, RouteTable, SubscriptionProvider,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub const TEMPO: &str = "tempo";
const DEFAULT_TEMPO: f64 = 120.0;

#[derive(Default)]
struct Watchers {
    next_id: u64,
    by_name: HashMap<String, Vec<(u64, ChangeCallback)>>,
}

pub struct ParamStore {
    values: RwLock<BTreeMap<String, f64>>,
    watchers: Arc<Mutex<Watchers>>,
}

impl ParamStore {
    pub fn new(initial: BTreeMap<String, f64>) -> Arc<Self> {
        let mut values = initial;
        values.entry(TEMPO.to_string()).or_insert(DEFAULT_TEMPO);
        Arc::new(Self {
            values: RwLock::new(values),
            watchers: Arc::new(Mutex::new(Watchers::default())),
        })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.read().get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Store a value and notify watchers if it changed
    pub fn set(&self, name: &str, value: f64) {
        let previous = self.values.write().insert(name.to_string(), value);
        if previous == Some(value) {
            return;
        }

        let callbacks: Vec<ChangeCallback> = self
            .watchers
            .lock()
            .by_name
            .get(name)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        debug!("{} = {} ({} watchers)", name, value, callbacks.len());
        for callback in callbacks {
            callback();
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().by_name.values().map(Vec::len).sum()
    }

    fn watch(&self, name: &str, on_change: ChangeCallback) -> CancelHandle {
        let id = {
            let mut watchers = self.watchers.lock();
            let id = watchers.next_id;
            watchers.next_id += 1;
            watchers
                .by_name
                .entry(name.to_string())
                .or_default()
                .push((id, on_change));
            id
        };

        let watchers = Arc::clone(&self.watchers);
        let name = name.to_string();
        CancelHandle::new(move || {
            let mut watchers = watchers.lock();
            if let Some(list) = watchers.by_name.get_mut(&name) {
                list.retain(|(existing, _)| *existing != id);
                if list.is_empty() {
                    watchers.by_name.remove(&name);
                }
            }
        })
    }

    fn require(&self, name: &str) -> Result<f64, HandlerError> {
        self.get(name)
            .ok_or_else(|| HandlerError::failed(format!("unknown parameter '{}'", name)))
    }
}

impl RouteSource for ParamStore {
    fn declare_routes(service: &Arc<Self>, table: &mut RouteTable) {
        let store = Arc::clone(service);
        table.add(
            RouteSpec::get(TEMPO).returns("float").doc("Current tempo in BPM"),
            move |_call| store.require(TEMPO),
        );

        let store = Arc::clone(service);
        table.add(
            RouteSpec::set(TEMPO).param("bpm", ArgKind::Any).doc("Set the tempo"),
            move |call| {
                store.set(TEMPO, call.float(0)?);
                Ok(())
            },
        );

        let store = Arc::clone(service);
        table.add(
            RouteSpec::get("param")
                .param("name", ArgKind::String)
                .returns("float")
                .doc("Value of a named parameter"),
            move |call| store.require(call.string(0)?),
        );

        let store = Arc::clone(service);
        table.add(
            RouteSpec::set("param")
                .param("name", ArgKind::String)
                .param("value", ArgKind::Any)
                .doc("Set a named parameter, creating it if needed"),
            move |call| {
                store.set(call.string(0)?, call.float(1)?);
                Ok(())
            },
        );

        let store = Arc::clone(service);
        table.add(
            RouteSpec::get("params").listen(false).returns("list").doc("Names of all parameters"),
            move |_call| {
                Ok(store
                    .names()
                    .into_iter()
                    .map(ArgValue::String)
                    .collect::<Vec<_>>())
            },
        );
    }
}

impl SubscriptionProvider for ParamStore {
    fn subscribe(&self, address: &str, args: &[ArgValue], on_change: ChangeCallback) -> Option<CancelHandle> {
        let name = match address {
            "/tempo" => TEMPO,
            "/param" => args.first()?.as_str()?,
            _ => return None,
        };
        self.get(name)?;
        Some(self.watch(name, on_change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                cb_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_default_tempo() {
        let store = ParamStore::new(BTreeMap::new());
        assert_eq!(store.get(TEMPO), Some(120.0));
        assert_eq!(store.names(), vec!["tempo".to_string()]);
    }

    #[test]
    fn test_initial_values_kept() {
        let store = ParamStore::new(BTreeMap::from([("tempo".to_string(), 90.0), ("volume".to_string(), 0.5)]));
        assert_eq!(store.get(TEMPO), Some(90.0));
        assert_eq!(store.get("volume"), Some(0.5));
    }

    #[test]
    fn test_set_notifies_on_change_only() {
        let store = ParamStore::new(BTreeMap::new());
        let (count, cb) = counter();
        let handle = store.subscribe("/tempo", &[], cb).unwrap();

        store.set(TEMPO, 128.0);
        store.set(TEMPO, 128.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.cancel();
        store.set(TEMPO, 100.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.watcher_count(), 0);
    }

    #[test]
    fn test_param_subscription() {
        let store = ParamStore::new(BTreeMap::from([("volume".to_string(), 0.5)]));
        let (count, cb) = counter();
        let _handle = store.subscribe("/param", &[ArgValue::from("volume")], cb).unwrap();

        store.set("pan", 0.25);
        store.set("volume", 0.75);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unwatchable() {
        let store = ParamStore::new(BTreeMap::new());
        let (_, cb) = counter();
        assert!(store.subscribe("/param", &[ArgValue::from("missing")], Arc::clone(&cb)).is_none());
        assert!(store.subscribe("/param", &[], Arc::clone(&cb)).is_none());
        assert!(store.subscribe("/params", &[], cb).is_none());
        assert_eq!(store.watcher_count(), 0);
    }
}
