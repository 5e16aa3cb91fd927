use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app::EnhancerInner;
use crate::contracts::Module;
use crate::error::RegistryError;
use crate::settings::SettingsError;

/// Module execution context - the primary interface for a module to reach
/// the application.
///
/// A context is scoped to one module and passed to its factory and `run`
/// hook. It provides:
/// - **Identity**: the module's own name and the channel name.
/// - **Settings**: the module's raw record or typed access via [`config`](Self::config).
/// - **Translations**: [`t`](Self::t) resolves namespaced text keys.
/// - **Siblings**: [`is_module_permitted`](Self::is_module_permitted) and
///   [`lookup`](Self::lookup) for cross-module cooperation.
///
/// Cheap to clone; a module that spawns background work keeps its own copy:
///
/// ```ignore
/// async fn run(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
///     let ctx = ctx.clone();
///     tokio::spawn(async move {
///         if let Ok(commands) = ctx.lookup("additionalChatCommands").await {
///             // downcast through `as_any` and cooperate
///         }
///     });
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ModuleCtx {
    module_name: Arc<str>,
    inner: Arc<EnhancerInner>,
}

impl ModuleCtx {
    pub(crate) fn new(module_name: &str, inner: Arc<EnhancerInner>) -> Self {
        Self {
            module_name: Arc::from(module_name),
            inner,
        }
    }

    #[inline]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[inline]
    pub fn channel_name(&self) -> &str {
        self.inner.channel_name()
    }

    /// The active language identifier.
    #[inline]
    pub fn language(&self) -> &str {
        self.inner.translator.language()
    }

    /// Clone of this module's raw settings record, if one was configured.
    pub fn settings(&self) -> Option<Value> {
        self.inner.settings.record(&self.module_name)
    }

    /// Deserialize this module's settings record into `T`, or use defaults
    /// if no record was configured.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] if a record exists but cannot be
    /// deserialized as `T`.
    pub fn config<T: DeserializeOwned + Default>(&self) -> Result<T, SettingsError> {
        self.inner.settings.typed_or_default(&self.module_name)
    }

    /// Resolve `key` for the active language. See the i18n crate for the
    /// namespace and fallback rules.
    pub fn t<'a>(&self, key: &'a str) -> Cow<'a, str> {
        self.inner.translator.translate(key)
    }

    /// Whether `name` has a settings record with `enabled: true`.
    pub fn is_module_permitted(&self, name: &str) -> bool {
        self.inner.settings.is_enabled(name)
    }

    /// Wait for another module's instance, bounded by the default window.
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
}
