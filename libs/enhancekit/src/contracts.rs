use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ModuleCtx;

/// A live feature module.
///
/// The registry assumes nothing about a module beyond this trait: an
/// optional `run` hook and a downcast seam. Module-specific state stays
/// inside the implementing type; sibling modules reach it by looking the
/// instance up and downcasting through [`Module::as_any`].
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Lifecycle hook, awaited once right after construction.
    ///
    /// Hooks run in first-registration order. A module that depends on one
    /// registered *later* must not await it here — spawn the dependent work
    /// around `ctx.lookup(..)` instead, and let it resolve out of band.
    async fn run(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Module")
    }
}

/// Deferred constructor for a module, invoked lazily at most once.
///
/// Implemented for free by any
/// `Fn(&ModuleCtx) -> anyhow::Result<Arc<dyn Module>>` closure.
pub trait ModuleFactory: Send + Sync + 'static {
    /// Build the instance for the module the context is scoped to.
    fn build(&self, ctx: &ModuleCtx) -> anyhow::Result<Arc<dyn Module>>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&ModuleCtx) -> anyhow::Result<Arc<dyn Module>> + Send + Sync + 'static,
{
    fn build(&self, ctx: &ModuleCtx) -> anyhow::Result<Arc<dyn Module>> {
        self(ctx)
    }
}
