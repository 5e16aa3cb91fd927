use thiserror::Error;

/// Errors surfaced by registry operations.
///
/// Failures are local to the offending module: `run_all` records them and
/// keeps going, `lookup` hands its timeout to whichever caller issued it.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A `lookup` waited out its window without the module appearing.
    #[error("load timeout for module '{module}'")]
    LoadTimeout { module: String },

    /// A permitted module was asked to run with no registered factory.
    #[error("no factory registered for module '{module}'")]
    MissingConstructor { module: String },

    /// The module's factory refused to build an instance.
    #[error("module '{module}' failed to build")]
    Build {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    /// The module's `run` hook returned an error.
    #[error("module '{module}' failed to run")]
    Run {
        module: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistryError {
    /// Name of the module the error is about.
    pub fn module(&self) -> &str {
        match self {
            Self::LoadTimeout { module }
            | Self::MissingConstructor { module }
            | Self::Build { module, .. }
            | Self::Run { module, .. } => module,
        }
    }
}
