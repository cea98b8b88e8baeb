//! Per-provider configuration and endpoint resolution.
//!
//! Each provider exposes separate sign and cancel services with distinct
//! test and production endpoints. In the test environment the providers'
//! published demo accounts are used when the deployment has not set its
//! own credentials, matching how the provider sandboxes are operated.

use serde::{Deserialize, Serialize};

/// Which provider environment requests are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacEnvironment {
    Test,
    Production,
}

/// The two services a provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacService {
    Sign,
    Cancel,
}

/// Deployment configuration for one provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacConfig {
    /// Provider name as registered in the gateway registry, e.g.
    /// `"solucionfactible"` or `"finkok"`.
    pub provider: String,
    pub environment: PacEnvironment,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL override, used to point adapters at a local stub.
    pub base_url_override: Option<String>,
}

impl PacConfig {
    /// Default per-request timeout, matching the providers' documented
    /// gateway limits.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

    pub fn new(provider: impl Into<String>, environment: PacEnvironment) -> Self {
        Self {
            provider: provider.into(),
            environment,
            username: None,
            password: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            base_url_override: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Effective credentials: the configured account, or the provider's
    /// published demo account in the test environment.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ if self.environment == PacEnvironment::Test => {
                demo_credentials(&self.provider).map(|(u, p)| (u.to_owned(), p.to_owned()))
            }
            _ => None,
        }
    }

    /// Resolve the service base URL for this provider and environment.
    pub fn endpoint(&self, service: PacService) -> Option<String> {
        if let Some(base) = &self.base_url_override {
            let base = base.trim_end_matches('/');
            return Some(match service {
                PacService::Sign => format!("{base}/sign"),
                PacService::Cancel => format!("{base}/cancel"),
            });
        }
        published_endpoint(&self.provider, self.environment, service).map(str::to_owned)
    }
}

fn demo_credentials(provider: &str) -> Option<(&'static str, &'static str)> {
    match provider {
        "solucionfactible" => Some(("testing@solucionfactible.com", "timbrado.SF.16672")),
        "finkok" => Some(("cfdi@vauxoo.com", "vAux00__")),
        _ => None,
    }
}

fn published_endpoint(
    provider: &str,
    environment: PacEnvironment,
    service: PacService,
) -> Option<&'static str> {
    match (provider, environment, service) {
        ("solucionfactible", PacEnvironment::Test, _) => {
            Some("https://testing.solucionfactible.com/ws/services/Timbrado")
        }
        ("solucionfactible", PacEnvironment::Production, _) => {
            Some("https://solucionfactible.com/ws/services/Timbrado")
        }
        ("finkok", PacEnvironment::Test, PacService::Sign) => {
            Some("https://demo-facturacion.finkok.com/servicios/stamp")
        }
        ("finkok", PacEnvironment::Test, PacService::Cancel) => {
            Some("https://demo-facturacion.finkok.com/servicios/cancel")
        }
        ("finkok", PacEnvironment::Production, PacService::Sign) => {
            Some("https://facturacion.finkok.com/servicios/stamp")
        }
        ("finkok", PacEnvironment::Production, PacService::Cancel) => {
            Some("https://facturacion.finkok.com/servicios/cancel")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_falls_back_to_demo_credentials() {
        let config = PacConfig::new("finkok", PacEnvironment::Test);
        let (user, _) = config.credentials().unwrap();
        assert_eq!(user, "cfdi@vauxoo.com");
    }

    #[test]
    fn production_without_credentials_has_none() {
        let config = PacConfig::new("finkok", PacEnvironment::Production);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn configured_credentials_win_over_demo() {
        let config = PacConfig::new("finkok", PacEnvironment::Test)
            .with_credentials("empresa@example.com", "secreto");
        let (user, pass) = config.credentials().unwrap();
        assert_eq!(user, "empresa@example.com");
        assert_eq!(pass, "secreto");
    }

    #[test]
    fn finkok_endpoints_differ_per_service() {
        let config = PacConfig::new("finkok", PacEnvironment::Production);
        assert_eq!(
            config.endpoint(PacService::Sign).unwrap(),
            "https://facturacion.finkok.com/servicios/stamp"
        );
        assert_eq!(
            config.endpoint(PacService::Cancel).unwrap(),
            "https://facturacion.finkok.com/servicios/cancel"
        );
    }

    #[test]
    fn base_url_override_routes_both_services() {
        let config =
            PacConfig::new("finkok", PacEnvironment::Test).with_base_url("http://127.0.0.1:9090/");
        assert_eq!(
            config.endpoint(PacService::Sign).unwrap(),
            "http://127.0.0.1:9090/sign"
        );
        assert_eq!(
            config.endpoint(PacService::Cancel).unwrap(),
            "http://127.0.0.1:9090/cancel"
        );
    }

    #[test]
    fn unknown_provider_has_no_endpoint() {
        let config = PacConfig::new("quien-sabe", PacEnvironment::Test);
        assert!(config.endpoint(PacService::Sign).is_none());
    }
}
