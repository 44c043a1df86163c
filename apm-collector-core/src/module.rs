use crate::BootstrapErr;
use apm_collector_types::export::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A module: a name and the services any provider of it must offer.
pub struct Module {
    name: &'static str,
    services: &'static [&'static str],
}

impl Module {
    pub const fn new(name: &'static str, services: &'static [&'static str]) -> Self {
        Self { name, services }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn services(&self) -> &'static [&'static str] {
        self.services
    }
}

#[async_trait]
/// Implements a [`Module`]. Providers are started in an order where each provider comes
/// after the providers of the modules it requires.
pub trait ModuleProvider: Send + Sync {
    fn name(&self) -> &str;

    fn module(&self) -> &Module;

    fn required_modules(&self) -> &[&'static str] {
        &[]
    }

    /// Services this provider offers. Must cover the module's services.
    fn provided_services(&self) -> Vec<&'static str>;

    /// Called on every provider, in declaration order, before any is started.
    fn prepare(&self) -> Result<(), BootstrapErr> {
        Ok(())
    }

    async fn start(&self) -> Result<(), BootstrapErr>;

    /// Called once every provider has started.
    async fn notify_after_completed(&self) -> Result<(), BootstrapErr> {
        Ok(())
    }
}
