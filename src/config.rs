use {
    crate::{
        domain::{
            error::EngineError,
            gateway::{CaptureMethod, FeatureMap},
            region::{Region, RegionContext, RegionRegistry},
        },
        services::{disambiguator::MultiOperations, lifecycle::CheckoutSettings},
    },
    std::{net::SocketAddr, time::Duration},
};

#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub webhook_tolerance: Duration,
}

#[derive(Debug, Clone)]
pub struct CommerceSettings {
    pub project_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub regions: RegionRegistry,
    pub multi_operations: MultiOperations,
    pub stripe: StripeSettings,
    pub commerce: CommerceSettings,
    pub checkout: CheckoutSettings,
    pub health_check_timeout: Duration,
    pub operations_token: Option<String>,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| EngineError::Configuration(format!("{key} must be set")))
        };

        let mut contexts = Vec::new();
        for region in Region::ALL {
            let secret = get(&format!("STRIPE_SECRET_KEY_{region}"));
            let webhook = get(&format!("STRIPE_WEBHOOK_SIGNING_SECRET_{region}"));
            match (secret, webhook) {
                (Some(secret), Some(webhook)) => {
                    contexts.push(RegionContext::new(region, &secret, &webhook))
                }
                (None, None) => {}
                _ => {
                    return Err(EngineError::Configuration(format!(
                        "region {region} needs both STRIPE_SECRET_KEY_{region} and STRIPE_WEBHOOK_SIGNING_SECRET_{region}"
                    )));
                }
            }
        }
        let default = get("STRIPE_DEFAULT_REGION")
            .map(|r| r.parse::<Region>())
            .transpose()?;
        let regions = RegionRegistry::new(contexts, default)?;

        let capture_method = get("STRIPE_CAPTURE_METHOD")
            .map(|v| v.parse::<CaptureMethod>())
            .transpose()?
            .unwrap_or(CaptureMethod::Automatic);

        let multi_operations = MultiOperations::from(parse_bool(
            "STRIPE_ENABLE_MULTI_OPERATIONS",
            get("STRIPE_ENABLE_MULTI_OPERATIONS"),
        )?);

        let stripe = StripeSettings {
            request_timeout: Duration::from_secs(parse_num(
                "STRIPE_REQUEST_TIMEOUT_SECS",
                get("STRIPE_REQUEST_TIMEOUT_SECS"),
                10,
            )?),
            max_retries: parse_num("STRIPE_MAX_RETRIES", get("STRIPE_MAX_RETRIES"), 2)?,
            webhook_tolerance: Duration::from_secs(parse_num(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                get("STRIPE_WEBHOOK_TOLERANCE_SECS"),
                300,
            )?),
        };

        let setup_future_usage = match get("STRIPE_PAYMENT_INTENT_SETUP_FUTURE_USAGE").as_deref() {
            None | Some("none") => None,
            Some(v @ ("off_session" | "on_session")) => Some(v.to_string()),
            Some(other) => {
                return Err(EngineError::Configuration(format!(
                    "STRIPE_PAYMENT_INTENT_SETUP_FUTURE_USAGE: unknown value {other}"
                )));
            }
        };

        let commerce = CommerceSettings {
            project_key: required("CTP_PROJECT_KEY")?,
            client_id: required("CTP_CLIENT_ID")?,
            client_secret: required("CTP_CLIENT_SECRET")?,
            auth_url: required("CTP_AUTH_URL")?,
            api_url: required("CTP_API_URL")?,
        };

        let saved_payment_methods = match get("STRIPE_SAVED_PAYMENT_METHODS_CONFIG") {
            None => FeatureMap::new(),
            Some(raw) => serde_json::from_str::<FeatureMap>(&raw).map_err(|e| {
                EngineError::Configuration(format!(
                    "STRIPE_SAVED_PAYMENT_METHODS_CONFIG: expected a JSON object: {e}"
                ))
            })?,
        };
        let collect_billing_address =
            get("STRIPE_COLLECT_BILLING_ADDRESS").unwrap_or_else(|| "auto".into());

        let checkout = CheckoutSettings {
            project_key: commerce.project_key.clone(),
            capture_method,
            payment_interface: get("PAYMENT_INTERFACE").unwrap_or_else(|| "stripe".into()),
            merchant_return_url: get("MERCHANT_RETURN_URL").unwrap_or_default(),
            setup_future_usage,
            send_billing_address: collect_billing_address != "auto",
            collect_billing_address,
            appearance: get("STRIPE_APPEARANCE_PAYMENT_ELEMENT"),
            layout: get("STRIPE_LAYOUT")
                .unwrap_or_else(|| r#"{"type":"tabs","defaultCollapsed":false}"#.into()),
            saved_payment_methods,
            apple_pay_well_known: get("STRIPE_APPLE_PAY_WELL_KNOWN"),
        };

        let health_check_timeout = Duration::from_millis(parse_num(
            "HEALTH_CHECK_TIMEOUT_MS",
            get("HEALTH_CHECK_TIMEOUT_MS"),
            5000,
        )?);

        let operations_token = get("OPERATIONS_API_TOKEN");
        if operations_token.is_none() {
            tracing::warn!("OPERATIONS_API_TOKEN not set, operations routes will refuse all requests");
        }

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".into())
            .parse::<SocketAddr>()
            .map_err(|e| EngineError::Configuration(format!("BIND_ADDR: {e}")))?;

        Ok(Self {
            regions,
            multi_operations,
            stripe,
            commerce,
            checkout,
            health_check_timeout,
            operations_token,
            bind_addr,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool, EngineError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(EngineError::Configuration(format!(
            "{key}: expected true or false, got {other}"
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, EngineError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| EngineError::Configuration(format!("{key}: not a number: {v}"))),
    }
}
