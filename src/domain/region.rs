use {
    super::error::EngineError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr, sync::Arc},
};

/// Isolated PSP account. Each one has its own credentials and webhook secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[display("US")]
    Us,
    #[display("CA")]
    Ca,
    #[display("EU")]
    Eu,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Us, Region::Ca, Region::Eu];
}

impl FromStr for Region {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Self::Us),
            "CA" => Ok(Self::Ca),
            "EU" => Ok(Self::Eu),
            other => Err(EngineError::Configuration(format!(
                "unknown region: {other}"
            ))),
        }
    }
}

/// Immutable per-region bundle. Selected once per request and passed
/// explicitly to every PSP call.
#[derive(Clone)]
pub struct RegionContext {
    region: Region,
    secret_key: Arc<str>,
    webhook_secret: Arc<str>,
}

impl RegionContext {
    pub fn new(region: Region, secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            region,
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }
}

impl fmt::Debug for RegionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// The set of configured regions, loaded at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    contexts: Vec<Arc<RegionContext>>,
    default: Option<Region>,
}

impl RegionRegistry {
    pub fn new(contexts: Vec<RegionContext>, default: Option<Region>) -> Result<Self, EngineError> {
        if contexts.is_empty() {
            return Err(EngineError::Configuration(
                "at least one PSP region must be configured".into(),
            ));
        }

        for (i, a) in contexts.iter().enumerate() {
            for b in &contexts[i + 1..] {
                if a.region == b.region {
                    return Err(EngineError::Configuration(format!(
                        "region {} configured twice",
                        a.region
                    )));
                }
                if a.webhook_secret == b.webhook_secret {
                    return Err(EngineError::Configuration(format!(
                        "regions {} and {} share a webhook secret",
                        a.region, b.region
                    )));
                }
            }
        }

        let default = match default {
            Some(region) if !contexts.iter().any(|c| c.region == region) => {
                return Err(EngineError::Configuration(format!(
                    "default region {region} is not configured"
                )));
            }
            Some(region) => Some(region),
            None if contexts.len() == 1 => Some(contexts[0].region),
            None => None,
        };

        Ok(Self {
            contexts: contexts.into_iter().map(Arc::new).collect(),
            default,
        })
    }

    pub fn get(&self, region: Region) -> Option<Arc<RegionContext>> {
        self.contexts.iter().find(|c| c.region == region).cloned()
    }

    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.contexts.iter().map(|c| c.region)
    }

    /// Checkout requests name their region explicitly, or fall back to the
    /// configured default.
    pub fn resolve_checkout(&self, header: Option<&str>) -> Result<Arc<RegionContext>, EngineError> {
        let region = match header.filter(|h| !h.trim().is_empty()) {
            Some(raw) => raw.parse::<Region>()?,
            None => self.default.ok_or_else(|| {
                EngineError::Configuration(
                    "no region header and no default region configured".into(),
                )
            })?,
        };

        self.get(region).ok_or_else(|| {
            EngineError::Configuration(format!("region {region} is not configured"))
        })
    }

    /// Webhooks are attributed to the single region whose secret verifies the
    /// signature. `expected` pins the delivery to the region named in the route.
    pub fn resolve_webhook<F>(
        &self,
        expected: Option<Region>,
        verifies: F,
    ) -> Result<Arc<RegionContext>, EngineError>
    where
        F: Fn(&RegionContext) -> bool,
    {
        let matches: Vec<&Arc<RegionContext>> =
            self.contexts.iter().filter(|c| verifies(c)).collect();

        let ctx = match matches.as_slice() {
            [] => {
                return Err(EngineError::WebhookSignature(
                    "signature does not match any configured region".into(),
                ));
            }
            [one] => Arc::clone(one),
            many => {
                let names: Vec<String> = many.iter().map(|c| c.region.to_string()).collect();
                return Err(EngineError::Configuration(format!(
                    "signature matches several regions: {}",
                    names.join(", ")
                )));
            }
        };

        if let Some(expected) = expected {
            if ctx.region != expected {
                return Err(EngineError::WebhookSignature(format!(
                    "event signed for region {} delivered to region {expected}",
                    ctx.region
                )));
            }
        }

        Ok(ctx)
    }
}
