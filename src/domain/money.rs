use {
    super::error::EngineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Integer minor units (cents, centavos, yen). Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(minor_units: i64) -> Result<Self, EngineError> {
        if minor_units < 0 {
            return Err(EngineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {minor_units}"
            )));
        }
        Ok(Self(minor_units))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for MoneyAmount {
    type Error = EngineError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<MoneyAmount> for i64 {
    fn from(v: MoneyAmount) -> i64 {
        v.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 code, stored upper-case. The PSP reports lower-case codes; the
/// ledger wants upper-case, so both sides go through `CurrencyCode::parse`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(code: &str) -> Result<Self, EngineError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::Validation(format!(
                "unknown currency: {code}"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used on the PSP wire.
    pub fn to_psp(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CurrencyCode> for String {
    fn from(c: CurrencyCode) -> String {
        c.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    cent_amount: MoneyAmount,
    currency_code: CurrencyCode,
}

impl Money {
    pub fn new(cent_amount: MoneyAmount, currency_code: CurrencyCode) -> Self {
        Self {
            cent_amount,
            currency_code,
        }
    }

    /// Build from raw PSP values (`amount`, lower-case `currency`).
    pub fn from_psp(amount: i64, currency: &str) -> Result<Self, EngineError> {
        Ok(Self::new(
            MoneyAmount::new(amount)?,
            CurrencyCode::parse(currency)?,
        ))
    }

    pub fn amount(&self) -> MoneyAmount {
        self.cent_amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency_code
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cent_amount, self.currency_code)
    }
}
