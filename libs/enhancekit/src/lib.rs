//! Core enhancement module kit.
//!
//! A small in-process framework for the enhancement layer of a chat/video
//! channel page: independently authored feature modules declare themselves
//! against an [`Enhancer`], get gated by per-module settings, and discover
//! each other asynchronously without a guaranteed load order.
//!
//! # Lifecycle
//!
//! ```ignore
//! let enhancer = Enhancer::builder("Channel name")
//!     .language("ru")
//!     .default_settings(default_tree)
//!     .user_settings(user_tree)
//!     .build()?;
//!
//! // Script-load time: factories and translations register in any order.
//! enhancer.register("chatCommandsHelp", |ctx: &ModuleCtx| {
//!     Ok(Arc::new(ChatCommandsHelp::new(ctx)?) as Arc<dyn Module>)
//! });
//! enhancer.add_translation("ru", table);
//!
//! // Once the host page is ready: run everything that is permitted.
//! let report = enhancer.run_all().await;
//! ```
//!
//! Modules cooperate through their [`ModuleCtx`]: `lookup` waits for a
//! sibling's instance (even one registered later), `t` localizes text,
//! `config` reads the module's own settings record.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod app;
pub mod contracts;
pub mod context;
pub mod error;
pub mod registry;
pub mod settings;

pub use app::{Enhancer, EnhancerBuilder, RunReport};
pub use contracts::{Module, ModuleFactory};
pub use context::ModuleCtx;
pub use error::RegistryError;
pub use registry::{MODULE_LOAD_TIMEOUT, BindFn, ModuleBinds};
pub use settings::SettingsError;

// The translation service lives in its own crate; re-export it for
// consumers that only depend on the kit.
pub use enhancekit_i18n as i18n;
