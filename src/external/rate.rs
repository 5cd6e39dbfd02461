//! Rate source
//!
//! External base-rate lookup used when pricing a new credit. The ledger adds
//! a configured increment on top of whatever the source returns. Lookup
//! failure blocks credit issuance.

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Errors from the external rate lookup.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Rate source unavailable: {0}")]
    Unavailable(String),

    #[error("Rate source returned malformed data: {0}")]
    Malformed(String),
}

/// Supplier of the current external base interest rate, in annual percent.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn current_rate(&self) -> Result<Decimal, RateError>;
}

/// Rate source backed by a configured constant. Stands in for the external
/// central-bank feed in deployments and tests that don't reach one.
#[derive(Debug, Clone)]
pub struct StaticRateSource {
    rate: Decimal,
}

impl StaticRateSource {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn current_rate(&self) -> Result<Decimal, RateError> {
        Ok(self.rate)
    }
}

/// Rate source that always fails, for exercising issuance failure paths.
#[derive(Debug, Clone, Default)]
pub struct UnavailableRateSource;

#[async_trait]
impl RateSource for UnavailableRateSource {
    async fn current_rate(&self) -> Result<Decimal, RateError> {
        Err(RateError::Unavailable("rate source disabled".to_string()))
    }
}
