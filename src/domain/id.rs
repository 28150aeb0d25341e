use {
    super::error::EngineError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
};

/// PSP payment-intent identifier (`pi_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        if !id.starts_with("pi_") {
            return Err(EngineError::Validation(format!(
                "IntentId must start with pi_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ledger payment identifier. Opaque, assigned by the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::Validation("PaymentId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::Validation("CartId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Key the PSP uses to collapse retried mutations into one side effect.
/// Minted once per logical attempt and reused for every retry of it.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn generate(operation: &str) -> Self {
        Self(format!("{operation}_{}", uuid::Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
