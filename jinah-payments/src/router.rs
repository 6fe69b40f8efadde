//! Service name to provider resolution

use crate::config::{ChannelRoute, JinahConfig};
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::providers::{FinPayProvider, JinahProvider};
use crate::store::{MemoryStore, PayloadStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Health of one configured service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderAvailability {
    pub name: String,
    pub display_name: String,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drivers with an adapter
pub const SUPPORTED_DRIVERS: [&str; 2] = ["finpay", "jinah"];

/// Resolves service names to provider adapters
///
/// Cheap to clone; clones share configuration and store.
#[derive(Clone)]
pub struct ProviderRouter {
    config: Arc<JinahConfig>,
    store: Arc<dyn PayloadStore>,
}

impl ProviderRouter {
    /// Router with an in-memory store
    pub fn new(config: JinahConfig) -> Self {
        Self::with_store(Arc::new(config), Arc::new(MemoryStore::new()))
    }

    /// Router with an external store
    pub fn with_store(config: Arc<JinahConfig>, store: Arc<dyn PayloadStore>) -> Self {
        Self { config, store }
    }

    /// Shared configuration
    pub fn config(&self) -> &JinahConfig {
        &self.config
    }

    /// Shared store
    pub fn store(&self) -> Arc<dyn PayloadStore> {
        Arc::clone(&self.store)
    }

    /// Resolve a service, defaulting to `default_service`
    pub fn resolve(&self, name: Option<&str>) -> PaymentResult<Arc<dyn PaymentProvider>> {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.config.default_service);
        let section = self.config.service(name)?;
        let driver = section.driver.as_deref().unwrap_or(name);
        debug!(service = name, driver, "Resolving payment service");

        match driver {
            "finpay" => Ok(Arc::new(FinPayProvider::from_config(name, &self.config)?)),
            "jinah" => Ok(Arc::new(JinahProvider::from_router(name, self.clone())?)),
            other => Err(PaymentError::UnknownProvider(format!(
                "No adapter for driver '{}' (service '{}')",
                other, name
            ))),
        }
    }

    /// Try every configured service; failures are reported, not raised
    pub fn list_available(&self) -> Vec<ProviderAvailability> {
        self.config
            .services
            .iter()
            .map(|(name, section)| {
                let display_name = section.name.clone().unwrap_or_else(|| name.clone());
                match self.resolve(Some(name)) {
                    Ok(provider) => ProviderAvailability {
                        name: name.clone(),
                        display_name: provider.display_name().to_string(),
                        configured: true,
                        error: None,
                    },
                    Err(e) => ProviderAvailability {
                        name: name.clone(),
                        display_name,
                        configured: false,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }

    /// Whether a service resolves
    pub fn is_available(&self, name: &str) -> bool {
        self.resolve(Some(name)).is_ok()
    }

    /// Configured service names, sorted
    pub fn supported_services(&self) -> Vec<String> {
        self.config.services.keys().cloned().collect()
    }

    /// Route for a channel in the first meta service that defines it
    pub fn channel_route(&self, channel: &str) -> Option<&ChannelRoute> {
        self.config
            .services
            .iter()
            .filter(|(name, section)| section.driver.as_deref().unwrap_or(name) == "jinah")
            .find_map(|(_, section)| section.channels.get(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use secrecy::SecretString;

    fn configured() -> JinahConfig {
        let mut config = JinahConfig::default();
        if let Some(finpay) = config.services.get_mut("finpay") {
            finpay.client_id = Some("merchant".into());
            finpay.client_secret = Some(SecretString::new("secret".into()));
        }
        config
    }

    #[test]
    fn test_resolve_default_service() {
        let router = ProviderRouter::new(configured());
        let provider = router.resolve(None).unwrap();
        assert_eq!(provider.service_name(), "jinah");
    }

    #[test]
    fn test_resolve_named_service() {
        let router = ProviderRouter::new(configured());
        let provider = router.resolve(Some("finpay")).unwrap();
        assert_eq!(provider.service_name(), "finpay");
        assert_eq!(provider.display_name(), "FinPay");
    }

    #[test]
    fn test_missing_section_is_configuration_error() {
        let router = ProviderRouter::new(configured());
        assert!(matches!(
            router.resolve(Some("doku")),
            Err(PaymentError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let router = ProviderRouter::new(JinahConfig::default());
        assert!(matches!(
            router.resolve(Some("finpay")),
            Err(PaymentError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_driver() {
        let mut config = configured();
        config.services.insert(
            "xendit".into(),
            ServiceConfig {
                driver: Some("xendit".into()),
                ..ServiceConfig::default()
            },
        );
        let router = ProviderRouter::new(config);
        assert!(matches!(
            router.resolve(Some("xendit")),
            Err(PaymentError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_list_available_captures_errors() {
        let router = ProviderRouter::new(JinahConfig::default());
        let services = router.list_available();
        assert_eq!(services.len(), 2);

        let finpay = services.iter().find(|s| s.name == "finpay").unwrap();
        assert!(!finpay.configured);
        assert!(finpay.error.as_deref().unwrap().contains("client_id"));

        let jinah = services.iter().find(|s| s.name == "jinah").unwrap();
        assert!(jinah.configured);
        assert!(jinah.error.is_none());

        assert!(!router.is_available("finpay"));
        assert!(router.is_available("jinah"));
    }

    #[test]
    fn test_channel_route_lookup() {
        let router = ProviderRouter::new(configured());
        assert_eq!(router.channel_route("qris").unwrap().service, "finpay");
        assert!(router.channel_route("gopay").is_none());
        assert_eq!(router.supported_services(), vec!["finpay", "jinah"]);
    }
}
