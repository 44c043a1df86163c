use apm_collector_types::CollectorResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapErr {
    #[error("Cycle module dependencies among {0:?}")]
    CycleDependency(Vec<String>),
    #[error("{module} is required by {provider}, but not found")]
    ModuleNotFound { provider: String, module: String },
    #[error("Service {service} of module {module} is not provided by {provider}")]
    ServiceNotProvided {
        provider: String,
        module: String,
        service: String,
    },
    #[error("Module {module} is provided by both {first} and {second}")]
    DuplicateModule {
        module: String,
        first: String,
        second: String,
    },
    #[error("Provider {provider} failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BootstrapErr {
    pub fn provider<E: std::error::Error + Send + Sync + 'static>(provider: &str, e: E) -> Self {
        Self::Provider {
            provider: provider.to_owned(),
            source: Box::new(e),
        }
    }
}

pub type BootstrapResult<T> = CollectorResult<T, BootstrapErr>;
