//! Module registry: existence, permission, instantiation order, discovery.
//!
//! Design goals:
//! - Feature modules register a factory under a string name and never link
//!   against each other directly; cross-module access goes through
//!   [`lookup`](crate::Enhancer::lookup).
//! - Load order is not guaranteed beyond first-registration order, so the
//!   lookup future must work when issued *before* the target is registered.
//!
//! Implementation details:
//! - One slot per module name, created on demand by `register`, `bind` or
//!   `subscribe` — a lookup may legitimately precede registration.
//! - The instance cell is a `tokio::sync::watch` channel written at most
//!   once. Every pending lookup subscribes independently, so publication is
//!   a broadcast and late subscribers still observe the value.
//! - Re-registering a name replaces the factory, never an existing
//!   instance, and keeps the name's original position in the run order.
//! - No lock is held across an await point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::contracts::{Module, ModuleFactory};
use crate::error::RegistryError;

/// Default window a lookup waits for a module to appear before failing
/// with [`RegistryError::LoadTimeout`].
pub const MODULE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback invoked around a module's `run` hook.
pub type BindFn = Arc<dyn Fn(&Arc<dyn Module>) + Send + Sync>;

/// Before/after callbacks around a module's `run` hook, supplied
/// out-of-band by host configuration rather than by the module itself.
#[derive(Default, Clone)]
pub struct ModuleBinds {
    pub before_run: Option<BindFn>,
    pub after_run: Option<BindFn>,
}

struct Slot {
    factory: Option<Arc<dyn ModuleFactory>>,
    binds: Option<ModuleBinds>,
    cell: watch::Sender<Option<Arc<dyn Module>>>,
}

impl Slot {
    fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self {
            factory: None,
            binds: None,
            cell,
        }
    }

    fn instance(&self) -> Option<Arc<dyn Module>> {
        self.cell.borrow().clone()
    }
}

#[derive(Default)]
struct Slots {
    map: HashMap<String, Slot>,
    /// Names with a factory, in first-registration order.
    order: Vec<String>,
}

impl Slots {
    fn entry(&mut self, name: &str) -> &mut Slot {
        self.map.entry(name.to_owned()).or_insert_with(Slot::new)
    }
}

/// Slot map behind the registry operations. Permission gating lives with
/// the settings store; this type only tracks factories, binds and
/// instances.
pub(crate) struct ModuleRegistry {
    slots: RwLock<Slots>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
        }
    }

    /// Store `factory` under `name`; the latest registration wins.
    pub(crate) fn register(&self, name: &str, factory: Arc<dyn ModuleFactory>) {
        let mut slots = self.slots.write();
        let slot = slots.entry(name);
        let fresh = slot.factory.is_none();
        slot.factory = Some(factory);
        if fresh {
            slots.order.push(name.to_owned());
        } else {
            tracing::debug!(module = name, "factory re-registered");
        }
    }

    pub(crate) fn bind(&self, name: &str, binds: ModuleBinds) {
        self.slots.write().entry(name).binds = Some(binds);
    }

    pub(crate) fn factory(&self, name: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.slots
            .read()
            .map
            .get(name)
            .and_then(|slot| slot.factory.clone())
    }

    pub(crate) fn binds(&self, name: &str) -> Option<ModuleBinds> {
        self.slots
            .read()
            .map
            .get(name)
            .and_then(|slot| slot.binds.clone())
    }

    pub(crate) fn instance(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.slots
            .read()
            .map
            .get(name)
            .and_then(Slot::instance)
    }

    /// Names with a registered factory, in first-registration order.
    pub(crate) fn registration_order(&self) -> Vec<String> {
        self.slots.read().order.clone()
    }

    /// Publish the instance unless the slot already holds one. Returns
    /// whether this call won the write. The cell is written at most once
    /// per slot; the write wakes every pending subscriber.
    pub(crate) fn try_publish(&self, name: &str, instance: Arc<dyn Module>) -> bool {
        let mut slots = self.slots.write();
        let slot = slots.entry(name);
        if slot.instance().is_some() {
            return false;
        }
        slot.cell.send_replace(Some(instance));
        true
    }

    fn subscribe(&self, name: &str) -> watch::Receiver<Option<Arc<dyn Module>>> {
        self.slots.write().entry(name).cell.subscribe()
    }

    /// Wait until the module's instance exists, bounded by `window`.
    ///
    /// Resolves immediately when the instance is already published;
    /// otherwise suspends until `try_publish` writes the cell. Concurrent
    /// waits on the same name all receive the same `Arc`.
    pub(crate) async fn lookup_timeout(
        &self,
        name: &str,
        window: Duration,
    ) -> Result<Arc<dyn Module>, RegistryError> {
        let mut rx = self.subscribe(name);
        let timeout_err = || RegistryError::LoadTimeout {
            module: name.to_owned(),
        };

        match tokio::time::timeout(window, rx.wait_for(Option::is_some)).await {
            Ok(Ok(current)) => current.as_ref().cloned().ok_or_else(timeout_err),
            Ok(Err(_)) | Err(_) => Err(timeout_err()),
        }
    }

    pub(crate) async fn lookup(&self, name: &str) -> Result<Arc<dyn Module>, RegistryError> {
        self.lookup_timeout(name, MODULE_LOAD_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    #[async_trait::async_trait]
    impl Module for Stub {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn stub_factory() -> Arc<dyn ModuleFactory> {
        fn build(_ctx: &crate::ModuleCtx) -> anyhow::Result<Arc<dyn Module>> {
            Ok(Arc::new(Stub))
        }
        Arc::new(build)
    }

    #[test]
    fn registration_order_is_first_registration_order() {
        let registry = ModuleRegistry::new();
        registry.register("utils", stub_factory());
        registry.register("smiles", stub_factory());
        registry.register("chatControls", stub_factory());
        // Re-registration keeps the original position.
        registry.register("utils", stub_factory());

        assert_eq!(
            registry.registration_order(),
            ["utils", "smiles", "chatControls"]
        );
    }

    #[test]
    fn publish_is_at_most_once() {
        let registry = ModuleRegistry::new();
        let first: Arc<dyn Module> = Arc::new(Stub);
        let second: Arc<dyn Module> = Arc::new(Stub);

        assert!(registry.try_publish("utils", first.clone()));
        assert!(!registry.try_publish("utils", second));

        let held = registry.instance("utils").unwrap();
        assert!(Arc::ptr_eq(&held, &first));
    }

    #[tokio::test]
    async fn lookup_resolves_immediately_for_published_instance() {
        let registry = ModuleRegistry::new();
        let instance: Arc<dyn Module> = Arc::new(Stub);
        registry.try_publish("utils", instance.clone());

        let found = registry.lookup("utils").await.unwrap();
        assert!(Arc::ptr_eq(&found, &instance));
    }

    #[tokio::test]
    async fn lookup_times_out_for_absent_module() {
        let registry = ModuleRegistry::new();

        let err = registry
            .lookup_timeout("never", Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::LoadTimeout { .. }));
        assert_eq!(err.module(), "never");
    }
}
