use {
    crate::domain::{
        EngineFuture, commerce::CommercePlatform, gateway::PaymentGateway,
        region::RegionRegistry,
    },
    serde::Serialize,
    std::{sync::Arc, time::Duration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Health {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: Health,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: Health,
    pub checks: Vec<HealthCheck>,
    pub version: &'static str,
}

/// Checks the ledger and every configured PSP account, each within `timeout`.
pub struct StatusReporter {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn CommercePlatform>,
    regions: Arc<RegionRegistry>,
    timeout: Duration,
}

impl StatusReporter {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn CommercePlatform>,
        regions: Arc<RegionRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            regions,
            timeout,
        }
    }

    pub async fn report(&self) -> StatusReport {
        let mut checks = vec![self.check("commerce platform", self.ledger.check_health()).await];
        for region in self.regions.regions() {
            if let Some(ctx) = self.regions.get(region) {
                let name = format!("stripe {region}");
                checks.push(self.check(&name, self.gateway.check_health(&ctx)).await);
            }
        }

        let status = if checks.iter().all(|c| c.status == Health::Up) {
            Health::Up
        } else {
            Health::Down
        };
        StatusReport {
            status,
            checks,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    async fn check(&self, name: &str, call: EngineFuture<'_, ()>) -> HealthCheck {
        let (status, message) = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(())) => (Health::Up, "reachable".to_string()),
            Ok(Err(e)) => {
                tracing::warn!(check = name, error = %e, "health check failed");
                (Health::Down, e.code().to_string())
            }
            Err(_) => {
                tracing::warn!(check = name, timeout = ?self.timeout, "health check timed out");
                (Health::Down, "timed out".to_string())
            }
        };
        HealthCheck {
            name: name.to_string(),
            status,
            message,
        }
    }
}
