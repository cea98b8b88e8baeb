//! Provider name → gateway resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::gateway::PacGateway;

/// Registry of configured gateways, keyed by provider name.
///
/// A company configured with a provider name the registry does not know
/// resolves to `None`; callers skip the sign/cancel step for that record
/// and leave its status untouched, which is the contract the batch
/// drivers rely on.
#[derive(Default)]
pub struct PacRegistry {
    gateways: HashMap<String, Arc<dyn PacGateway>>,
}

impl PacRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its provider name. Replaces any previous
    /// registration for the same name.
    pub fn register(&mut self, gateway: Arc<dyn PacGateway>) {
        self.gateways
            .insert(gateway.provider_name().to_owned(), gateway);
    }

    /// Resolve a provider name. Unknown names log a warning and return
    /// `None`.
    pub fn resolve(&self, provider: &str) -> Option<Arc<dyn PacGateway>> {
        let found = self.gateways.get(provider).cloned();
        if found.is_none() {
            warn!(provider, "no gateway registered for provider; skipping");
        }
        found
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.gateways.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockPacGateway;

    #[test]
    fn registered_gateway_resolves_by_name() {
        let mut registry = PacRegistry::new();
        registry.register(Arc::new(MockPacGateway::accepting()));
        assert!(registry.resolve("mock").is_some());
    }

    #[test]
    fn unknown_provider_resolves_to_none() {
        let registry = PacRegistry::new();
        assert!(registry.resolve("finkok").is_none());
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = PacRegistry::new();
        registry.register(Arc::new(MockPacGateway::accepting()));
        registry.register(Arc::new(MockPacGateway::rejecting(None, "no")));
        assert_eq!(registry.provider_names(), vec!["mock"]);
    }
}
