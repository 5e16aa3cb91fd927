//! The application object: one per host-page load.
//!
//! Construction mirrors the host bootstrap: build with the channel name,
//! language and settings layers, let feature modules register factories and
//! translations at script-load time, then call [`Enhancer::run_all`] once
//! the page signals it is ready for interactive use.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use enhancekit_i18n::{SOURCE_LANGUAGE, Translator};
use serde_json::Value;

use crate::context::ModuleCtx;
use crate::contracts::{Module, ModuleFactory};
use crate::error::RegistryError;
use crate::registry::{ModuleBinds, ModuleRegistry};
use crate::settings::{self, SettingsError, SettingsStore};

/// The enhancement application. Owns the module registry, the settings
/// store and the translator; everything a feature module sees goes through
/// the [`ModuleCtx`] scoped to it.
///
/// There is no teardown: the application lives as long as the page, and
/// module instances are never destroyed.
#[derive(Clone)]
pub struct Enhancer {
    inner: Arc<EnhancerInner>,
}

pub(crate) struct EnhancerInner {
    channel_name: Arc<str>,
    pub(crate) translator: Translator,
    pub(crate) settings: SettingsStore,
    pub(crate) registry: ModuleRegistry,
}

impl EnhancerInner {
    pub(crate) fn channel_name(&self) -> &str {
        &self.channel_name
    }
}

/// Outcome of a [`run_all`](Enhancer::run_all) pass.
///
/// Failures are isolated per module: every registered module is attempted
/// exactly once regardless of earlier errors.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Modules instantiated and run, in registration order.
    pub started: Vec<String>,
    /// Modules whose settings gate them off.
    pub skipped: Vec<String>,
    /// Per-module failures; [`RegistryError::module`] names the culprit.
    pub failed: Vec<RegistryError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Enhancer {
    pub fn builder(channel_name: impl Into<String>) -> EnhancerBuilder {
        EnhancerBuilder::new(channel_name.into())
    }

    #[inline]
    pub fn channel_name(&self) -> &str {
        self.inner.channel_name()
    }

    #[inline]
    pub fn language(&self) -> &str {
        self.inner.translator.language()
    }

    /// Store a module factory under `name`. The latest registration wins;
    /// an already-created instance is never replaced. Does not instantiate.
    pub fn register<F: ModuleFactory>(&self, name: &str, factory: F) {
        self.inner.registry.register(name, Arc::new(factory));
    }

    /// Replace the settings record for `name` wholesale (no merge).
    pub fn configure(&self, name: &str, record: Value) {
        self.inner.settings.configure(name, record);
    }

    /// Attach before/after callbacks around the module's `run` hook.
    pub fn bind(&self, name: &str, binds: ModuleBinds) {
        self.inner.registry.bind(name, binds);
    }

    /// Store or replace the whole translation table for `language`.
    pub fn add_translation(&self, language: impl Into<String>, table: Value) {
        self.inner.translator.add_translation(language, table);
    }

    /// Resolve `key` for the active language.
    pub fn t<'a>(&self, key: &'a str) -> Cow<'a, str> {
        self.inner.translator.translate(key)
    }

    /// Whether `name` has a settings record with `enabled: true`. A module
    /// with no configured settings is never permitted.
    pub fn is_module_permitted(&self, name: &str) -> bool {
        self.inner.settings.is_enabled(name)
    }

    /// Clone of the raw settings record for `name`, for introspection.
    pub fn settings(&self, name: &str) -> Option<Value> {
        self.inner.settings.record(name)
    }

    /// Wait for a module's instance, bounded by the default window.
    ///
    /// # Errors
    /// Returns [`RegistryError::LoadTimeout`] if the module has not been
    /// instantiated within the window.
    pub async fn lookup(&self, name: &str) -> Result<Arc<dyn Module>, RegistryError> {
        self.inner.registry.lookup(name).await
    }

    /// [`lookup`](Self::lookup) with an explicit window.
    ///
    /// # Errors
    /// Returns [`RegistryError::LoadTimeout`] when the window elapses.
    pub async fn lookup_timeout(
        &self,
        name: &str,
        window: Duration,
    ) -> Result<Arc<dyn Module>, RegistryError> {
        self.inner.registry.lookup_timeout(name, window).await
    }

    /// Instantiate and run one module, if it is permitted.
    ///
    /// A module gated off by its settings is silently skipped; an
    /// already-instantiated module is not rebuilt. Otherwise the factory
    /// builds the instance, the instance is published (waking every pending
    /// [`lookup`](Self::lookup)), and the `before_run` bind, the `run`
    /// hook and the `after_run` bind execute in that order.
    ///
    /// # Errors
    /// [`RegistryError::MissingConstructor`] when permitted but no factory
    /// was ever registered; [`RegistryError::Build`]/[`RegistryError::Run`]
    /// when the factory or the hook fails. A failed `run` hook leaves the
    /// instance published.
    pub async fn run_module(&self, name: &str) -> Result<(), RegistryError> {
        if !self.inner.settings.is_enabled(name) {
            tracing::debug!(module = name, "module not permitted, skipping");
            return Ok(());
        }
        if self.inner.registry.instance(name).is_some() {
            tracing::debug!(module = name, "module already instantiated");
            return Ok(());
        }

        let factory =
            self.inner
                .registry
                .factory(name)
                .ok_or_else(|| RegistryError::MissingConstructor {
                    module: name.to_owned(),
                })?;

        let ctx = ModuleCtx::new(name, Arc::clone(&self.inner));
        let instance = factory.build(&ctx).map_err(|e| RegistryError::Build {
            module: name.to_owned(),
            source: e,
        })?;

        if !self.inner.registry.try_publish(name, Arc::clone(&instance)) {
            tracing::debug!(module = name, "instance already published, dropping duplicate");
            return Ok(());
        }

        let binds = self.inner.registry.binds(name).unwrap_or_default();
        if let Some(before) = &binds.before_run {
            before(&instance);
        }

        tracing::debug!(module = name, "running module");
        instance.run(&ctx).await.map_err(|e| RegistryError::Run {
            module: name.to_owned(),
            source: e,
        })?;

        if let Some(after) = &binds.after_run {
            after(&instance);
        }
        Ok(())
    }

    /// Single lifecycle entry point: run every registered module in
    /// first-registration order. Invoked once when the host page becomes
    /// ready. One module's failure never prevents the rest from running.
    pub async fn run_all(&self) -> RunReport {
        let order = self.inner.registry.registration_order();
        tracing::info!(
            channel = %self.inner.channel_name,
            modules = order.len(),
            "running registered modules"
        );

        let mut report = RunReport::default();
        for name in order {
            if !self.is_module_permitted(&name) {
                tracing::debug!(module = %name, "module not permitted, skipping");
                report.skipped.push(name);
                continue;
            }
            match self.run_module(&name).await {
                Ok(()) => report.started.push(name),
                Err(e) => {
                    tracing::error!(
                        module = %name,
                        error = %e,
                        "module failed, continuing with the rest"
                    );
                    report.failed.push(e);
                }
            }
        }
        report
    }
}

/// Builder capturing the construction parameters supplied once at startup:
/// channel name, active language and the two settings layers.
pub struct EnhancerBuilder {
    channel_name: String,
    language: String,
    defaults: Value,
    overrides: Value,
}

impl EnhancerBuilder {
    fn new(channel_name: String) -> Self {
        Self {
            channel_name,
            language: SOURCE_LANGUAGE.to_owned(),
            defaults: Value::Object(serde_json::Map::new()),
            overrides: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// The global defaults layer of the settings tree.
    pub fn default_settings(mut self, tree: Value) -> Self {
        self.defaults = tree;
        self
    }

    /// The user override layer, deep-merged on top of the defaults.
    pub fn user_settings(mut self, tree: Value) -> Self {
        self.overrides = tree;
        self
    }

    /// # Errors
    /// Returns [`SettingsError::Merge`] if the two settings layers cannot
    /// be merged into a single tree.
    pub fn build(self) -> Result<Enhancer, SettingsError> {
        let records = settings::merge_layers(self.defaults, self.overrides)?;
        tracing::debug!(
            channel = %self.channel_name,
            language = %self.language,
            modules = records.len(),
            "enhancer configured"
        );

        Ok(Enhancer {
            inner: Arc::new(EnhancerInner {
                channel_name: self.channel_name.into(),
                translator: Translator::new(self.language),
                settings: SettingsStore::new(records),
                registry: ModuleRegistry::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_defaults_to_source_language() {
        let enhancer = Enhancer::builder("Channel name").build().unwrap();

        assert_eq!(enhancer.channel_name(), "Channel name");
        assert_eq!(enhancer.language(), "en");
    }

    #[test]
    fn builder_layers_user_settings_over_defaults() {
        let enhancer = Enhancer::builder("Channel name")
            .language("ru")
            .default_settings(json!({
                "videoControls": {"enabled": true, "turnOffVideoOption": true},
                "smiles": {"enabled": true}
            }))
            .user_settings(json!({
                "videoControls": {"enabled": false}
            }))
            .build()
            .unwrap();

        assert!(!enhancer.is_module_permitted("videoControls"));
        assert!(enhancer.is_module_permitted("smiles"));
        // Sibling keys of the overridden record survive the merge.
        assert_eq!(
            enhancer.settings("videoControls"),
            Some(json!({"enabled": false, "turnOffVideoOption": true}))
        );
    }

    #[test]
    fn configure_seeds_a_record_after_construction() {
        let enhancer = Enhancer::builder("Channel name").build().unwrap();
        assert!(!enhancer.is_module_permitted("motd"));

        enhancer.configure("motd", json!({"enabled": true}));
        assert!(enhancer.is_module_permitted("motd"));
    }
}
