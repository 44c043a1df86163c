use crate::{BootstrapErr, ModuleProvider};
use std::{collections::HashMap, sync::Arc};

/// Order providers so that each comes after the providers of the modules it requires.
///
/// Scans the remaining providers repeatedly, moving each one whose requirements are all
/// sequenced already; within a scan, a provider sequenced earlier counts for the ones after
/// it. Fails if a scan makes no progress.
pub fn make_sequence(
    providers: Vec<Arc<dyn ModuleProvider>>,
) -> Result<Vec<Arc<dyn ModuleProvider>>, BootstrapErr> {
    let mut modules: HashMap<&str, &str> = HashMap::new();
    for provider in providers.iter() {
        let module = provider.module().name();
        if let Some(first) = modules.insert(module, provider.name()) {
            return Err(BootstrapErr::DuplicateModule {
                module: module.to_owned(),
                first: first.to_owned(),
                second: provider.name().to_owned(),
            });
        }
    }
    for provider in providers.iter() {
        for required in provider.required_modules() {
            if !modules.contains_key(required) {
                return Err(BootstrapErr::ModuleNotFound {
                    provider: provider.name().to_owned(),
                    module: (*required).to_owned(),
                });
            }
        }
    }

    let mut remaining = providers;
    let mut sequence: Vec<Arc<dyn ModuleProvider>> = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let before = remaining.len();
        let mut i = 0;
        while i < remaining.len() {
            let ready = remaining[i].required_modules().iter().all(|required| {
                sequence
                    .iter()
                    .any(|p| p.module().name() == *required)
            });
            if ready {
                sequence.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }
        if remaining.len() == before {
            return Err(BootstrapErr::CycleDependency(
                remaining
                    .iter()
                    .map(|p| format!("{}[provider={}]", p.module().name(), p.name()))
                    .collect(),
            ));
        }
    }
    Ok(sequence)
}

/// Starts a set of module providers in dependency order.
pub struct BootstrapFlow {
    declared: Vec<Arc<dyn ModuleProvider>>,
    sequence: Vec<Arc<dyn ModuleProvider>>,
}

impl std::fmt::Debug for BootstrapFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapFlow")
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl BootstrapFlow {
    pub fn new(providers: Vec<Arc<dyn ModuleProvider>>) -> Result<Self, BootstrapErr> {
        let sequence = make_sequence(providers.clone())?;
        Ok(Self {
            declared: providers,
            sequence,
        })
    }

    /// Provider names, in startup order.
    pub fn sequence(&self) -> Vec<&str> {
        self.sequence.iter().map(|p| p.name()).collect()
    }

    /// Prepare every provider, then start them in sequence. Before a provider starts, the
    /// modules it requires must have started, and it must offer every service its module
    /// declares.
    pub async fn start(&self) -> Result<(), BootstrapErr> {
        for provider in self.declared.iter() {
            provider.prepare()?;
        }

        let mut started: Vec<&str> = Vec::with_capacity(self.sequence.len());
        for provider in self.sequence.iter() {
            for required in provider.required_modules() {
                if !started.contains(required) {
                    return Err(BootstrapErr::ModuleNotFound {
                        provider: provider.name().to_owned(),
                        module: (*required).to_owned(),
                    });
                }
            }
            Self::required_check(provider.as_ref())?;
            log::info!(
                "Start the provider {} in {} module",
                provider.name(),
                provider.module().name()
            );
            provider.start().await?;
            started.push(provider.module().name());
        }
        Ok(())
    }

    /// Notify every provider, in sequence, that all have started.
    pub async fn notify_after_completed(&self) -> Result<(), BootstrapErr> {
        for provider in self.sequence.iter() {
            provider.notify_after_completed().await?;
        }
        Ok(())
    }

    fn required_check(provider: &dyn ModuleProvider) -> Result<(), BootstrapErr> {
        let provided = provider.provided_services();
        for service in provider.module().services() {
            if !provided.contains(service) {
                return Err(BootstrapErr::ServiceNotProvided {
                    provider: provider.name().to_owned(),
                    module: provider.module().name().to_owned(),
                    service: (*service).to_owned(),
                });
            }
        }
        Ok(())
    }
}
