use async_trait::async_trait;

use crate::{DataError, MarketQuote, RawFinancialRecord};

/// Trait for upstream financial data providers. Implemented by the FMP
/// client; the data service only talks to this seam so tests can inject a
/// canned provider.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Fetch financial statements for a ticker, most recent period first.
    async fn financial_statements(
        &self,
        ticker: &str,
    ) -> Result<Vec<RawFinancialRecord>, DataError>;

    /// Fetch the current market quote for a ticker.
    async fn market_quote(&self, ticker: &str) -> Result<MarketQuote, DataError>;
}
