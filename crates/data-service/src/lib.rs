pub mod cache;
pub mod dedup;

pub use cache::TtlCache;
pub use dedup::RequestCoordinator;

use chrono::Utc;
use futures_util::future::join_all;
use insurance_core::{
    BatchItem, CompanyAnalysis, DataError, FinancialDataProvider, MarketQuote, RawFinancialRecord,
};
use pnc_metrics::MetricsEngine;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FINANCIALS_TTL: Duration = Duration::from_secs(600);
const QUOTE_TTL: Duration = Duration::from_secs(60);
const MAX_CACHE_ENTRIES: usize = 200;

/// Data access layer: fetches statements and quotes from the upstream
/// provider through an owned TTL cache and in-flight request coordinator,
/// and feeds the metrics engine.
///
/// Cache and coordinator are explicit per-service handles rather than
/// process-wide singletons, so independent instances (and tests) do not
/// share state.
pub struct CompanyDataService<P: FinancialDataProvider> {
    provider: Arc<P>,
    metrics: Mutex<MetricsEngine>,
    financials_cache: TtlCache<Vec<RawFinancialRecord>>,
    quote_cache: TtlCache<MarketQuote>,
    financials_flights: RequestCoordinator<Vec<RawFinancialRecord>>,
    quote_flights: RequestCoordinator<MarketQuote>,
}

impl<P: FinancialDataProvider + 'static> CompanyDataService<P> {
    pub fn new(provider: P) -> Self {
        Self::with_engine(provider, MetricsEngine::new())
    }

    /// Service with a seeded metrics engine, for deterministic output.
    pub fn with_seed(provider: P, seed: u64) -> Self {
        Self::with_engine(provider, MetricsEngine::with_seed(seed))
    }

    fn with_engine(provider: P, engine: MetricsEngine) -> Self {
        Self {
            provider: Arc::new(provider),
            metrics: Mutex::new(engine),
            financials_cache: TtlCache::new(FINANCIALS_TTL, MAX_CACHE_ENTRIES),
            quote_cache: TtlCache::new(QUOTE_TTL, MAX_CACHE_ENTRIES),
            financials_flights: RequestCoordinator::new(),
            quote_flights: RequestCoordinator::new(),
        }
    }

    /// Financial statements for a ticker, most recent first (cached,
    /// 10-min TTL, deduplicated).
    ///
    /// An empty statement list, or one with no usable revenue/period data,
    /// is a hard error: metric derivation cannot proceed meaningfully
    /// without at least revenue and a period label.
    pub async fn financial_statements(
        &self,
        ticker: &str,
    ) -> Result<Vec<RawFinancialRecord>, DataError> {
        let key = format!("financials_{}", ticker.to_uppercase());
        if let Some(cached) = self.financials_cache.get(&key) {
            tracing::debug!("cache hit for {}", key);
            return Ok(cached);
        }

        let provider = Arc::clone(&self.provider);
        let symbol = ticker.to_string();
        let records = self
            .financials_flights
            .run(&key, move || async move {
                provider.financial_statements(&symbol).await
            })
            .await?;

        if records.is_empty() {
            return Err(DataError::EmptyPayload(format!(
                "No financial statements returned for {}",
                ticker
            )));
        }
        if !records
            .iter()
            .any(|r| r.revenue.is_some() && r.period.is_some())
        {
            return Err(DataError::EmptyPayload(format!(
                "Statements for {} carry no revenue/period data",
                ticker
            )));
        }

        self.financials_cache
            .set_with_ttl(&key, records.clone(), FINANCIALS_TTL);
        Ok(records)
    }

    /// Current market quote for a ticker (cached, 1-min TTL, deduplicated).
    pub async fn market_quote(&self, ticker: &str) -> Result<MarketQuote, DataError> {
        let key = format!("market_{}", ticker.to_uppercase());
        if let Some(cached) = self.quote_cache.get(&key) {
            tracing::debug!("cache hit for {}", key);
            return Ok(cached);
        }

        let provider = Arc::clone(&self.provider);
        let symbol = ticker.to_string();
        let quote = self
            .quote_flights
            .run(&key, move || async move { provider.market_quote(&symbol).await })
            .await?;

        self.quote_cache.set_with_ttl(&key, quote.clone(), QUOTE_TTL);
        Ok(quote)
    }

    /// Full analysis for one company: statements and quote fetched
    /// concurrently, metrics derived per period once statements resolve.
    ///
    /// A statements failure is fatal; a quote failure degrades the analysis
    /// to metrics-only and is logged, since the metric pipeline does not
    /// depend on the quote.
    pub async fn company_analysis(&self, ticker: &str) -> Result<CompanyAnalysis, DataError> {
        let (statements, quote) =
            tokio::join!(self.financial_statements(ticker), self.market_quote(ticker));
        let statements = statements?;
        let quote = match quote {
            Ok(q) => Some(q),
            Err(e) => {
                tracing::warn!("quote fetch failed for {}: {}", ticker, e);
                None
            }
        };

        let metrics = {
            let mut engine = self
                .metrics
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            statements.iter().map(|r| engine.derive(r)).collect()
        };

        Ok(CompanyAnalysis {
            symbol: ticker.to_uppercase(),
            timestamp: Utc::now(),
            quote,
            metrics,
        })
    }

    /// Fan out one independent analysis per ticker and collect every result.
    /// One ticker's failure is captured in its own entry and never cancels
    /// or fails the batch for the others.
    pub async fn batch_analysis(&self, tickers: &[&str]) -> Vec<BatchItem> {
        let fetches = tickers.iter().map(|&t| async move {
            let ticker = t.to_uppercase();
            match self.company_analysis(t).await {
                Ok(analysis) => BatchItem {
                    ticker,
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => BatchItem {
                    ticker,
                    analysis: None,
                    error: Some(e.to_string()),
                },
            }
        });
        join_all(fetches).await
    }

    /// Drop all cached data. In-flight requests are unaffected.
    pub fn clear_cache(&self) {
        self.financials_cache.clear();
        self.quote_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned provider: well-known tickers succeed, anything else fails
    /// upstream. Counts statement fetches to observe cache/dedup behavior.
    struct FakeProvider {
        statement_calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                statement_calls: AtomicUsize::new(0),
                delay: Duration::from_millis(0),
            }
        }

        fn slow(delay_ms: u64) -> Self {
            Self {
                statement_calls: AtomicUsize::new(0),
                delay: Duration::from_millis(delay_ms),
            }
        }

        fn record(symbol: &str) -> RawFinancialRecord {
            RawFinancialRecord {
                symbol: symbol.to_string(),
                revenue: Some(41_364_000_000.0),
                net_income: Some(2_991_000_000.0),
                total_assets: Some(125_978_000_000.0),
                total_stockholders_equity: Some(24_921_000_000.0),
                weighted_average_shares_outstanding: Some(232_000_000.0),
                selling_general_and_administrative_expenses: Some(10_500_000_000.0),
                total_debt: Some(8_004_000_000.0),
                calendar_year: Some(2023),
                period: Some("FY".to_string()),
            }
        }
    }

    #[async_trait]
    impl FinancialDataProvider for FakeProvider {
        async fn financial_statements(
            &self,
            ticker: &str,
        ) -> Result<Vec<RawFinancialRecord>, DataError> {
            self.statement_calls.fetch_add(1, Ordering::SeqCst);
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            match ticker {
                "TRV" | "PGR" | "ALL" => Ok(vec![Self::record(ticker)]),
                "EMPTY" => Ok(Vec::new()),
                _ => Err(DataError::provider(
                    "FMP",
                    format!("HTTP 404: unknown symbol {}", ticker),
                )),
            }
        }

        async fn market_quote(&self, ticker: &str) -> Result<MarketQuote, DataError> {
            match ticker {
                "TRV" | "PGR" | "ALL" => Ok(MarketQuote {
                    symbol: ticker.to_string(),
                    price: Some(212.4),
                    change: Some(1.1),
                    change_percent: Some(0.5),
                    volume: Some(1_500_000.0),
                    market_cap: Some(48_000_000_000.0),
                    pe: Some(16.0),
                }),
                _ => Err(DataError::NotFound(format!("No quote for {}", ticker))),
            }
        }
    }

    #[tokio::test]
    async fn statements_are_cached_after_first_fetch() {
        let service = CompanyDataService::with_seed(FakeProvider::new(), 5);

        let first = service.financial_statements("TRV").await.unwrap();
        let second = service.financial_statements("TRV").await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(service.provider.statement_calls.load(Ordering::SeqCst), 1);

        service.clear_cache();
        service.financial_statements("TRV").await.unwrap();
        assert_eq!(service.provider.statement_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_fetches_are_deduplicated() {
        let service = CompanyDataService::with_seed(FakeProvider::slow(40), 5);

        let (a, b) = tokio::join!(
            service.financial_statements("PGR"),
            service.financial_statements("PGR"),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(service.provider.statement_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_statement_list_is_a_hard_error() {
        let service = CompanyDataService::with_seed(FakeProvider::new(), 5);
        let err = service.financial_statements("EMPTY").await.unwrap_err();
        assert!(matches!(err, DataError::EmptyPayload(_)));

        // Bad payloads are not cached; the provider is consulted again.
        let _ = service.financial_statements("EMPTY").await;
        assert_eq!(service.provider.statement_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn analysis_derives_metrics_and_carries_quote() {
        let service = CompanyDataService::with_seed(FakeProvider::new(), 5);
        let analysis = service.company_analysis("TRV").await.unwrap();

        assert_eq!(analysis.symbol, "TRV");
        assert!(analysis.quote.is_some());
        assert_eq!(analysis.metrics.len(), 1);
        let m = &analysis.metrics[0];
        assert_eq!(
            m.combined_ratio,
            ((m.loss_ratio + m.expense_ratio) * 10.0).round() / 10.0
        );
    }

    #[tokio::test]
    async fn batch_captures_per_ticker_failure_without_failing_the_batch() {
        let service = CompanyDataService::with_seed(FakeProvider::new(), 5);
        let items = service
            .batch_analysis(&["TRV", "ZZZZ_INVALID", "PGR"])
            .await;

        assert_eq!(items.len(), 3);

        let failed: Vec<_> = items.iter().filter(|i| i.error.is_some()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].ticker, "ZZZZ_INVALID");
        assert!(failed[0].analysis.is_none());

        for ok in items.iter().filter(|i| i.error.is_none()) {
            assert!(ok.analysis.is_some());
        }
    }
}
