use async_trait::async_trait;
use insurance_core::{DataError, FinancialDataProvider, MarketQuote, RawFinancialRecord};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const STATEMENT_LIMIT: u32 = 5;
const MAX_RETRIES: u32 = 3;

/// Backoff before the next 429 retry, or `None` when the attempt was the
/// last one and the caller should fail immediately instead of sleeping.
fn retry_backoff(attempt: u32) -> Option<Duration> {
    (attempt + 1 < MAX_RETRIES).then(|| Duration::from_secs(10))
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = match ts.front().and_then(|f| f.checked_add(self.window)) {
                Some(t) => t,
                None => now + self.window,
            };
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for FMP API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Client for the Financial Modeling Prep statements and quote endpoints.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        // Default 300 req/min for paid plans. Free tier users should set
        // FMP_RATE_LIMIT to something small.
        let rate_limit: usize = std::env::var("FMP_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Client keyed from the `FMP_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, DataError> {
        dotenvy::dotenv().ok();
        let key = std::env::var("FMP_API_KEY")
            .map_err(|_| DataError::Other("FMP_API_KEY not set".to_string()))?;
        Ok(Self::new(key))
    }

    /// Override the endpoint base, for pointing at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, DataError> {
        let request = builder
            .build()
            .map_err(|e| DataError::provider("FMP", e.to_string()))?;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| DataError::provider("FMP", "Cannot clone request"))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| DataError::provider("FMP", e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let Some(wait) = retry_backoff(attempt) else {
                break;
            };
            tracing::warn!(
                "FMP 429 rate limited, waiting {}s before retry {}/{}",
                wait.as_secs(),
                attempt + 1,
                MAX_RETRIES
            );
            tokio::time::sleep(wait).await;
        }

        Err(DataError::RateLimited(format!(
            "FMP still rate limiting after {} retries",
            MAX_RETRIES
        )))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, DataError> {
        let response = self
            .send_request(self.client.get(url).query(&[("apikey", &self.api_key)]))
            .await?;

        if !response.status().is_success() {
            return Err(DataError::provider(
                "FMP",
                format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DataError::provider("FMP", e.to_string()))
    }

    async fn income_statements(&self, symbol: &str) -> Result<Vec<IncomeStatementRow>, DataError> {
        let url = format!(
            "{}/income-statement/{}?period=annual&limit={}",
            self.base_url, symbol, STATEMENT_LIMIT
        );
        self.get_json(&url).await
    }

    async fn balance_sheets(&self, symbol: &str) -> Result<Vec<BalanceSheetRow>, DataError> {
        let url = format!(
            "{}/balance-sheet-statement/{}?period=annual&limit={}",
            self.base_url, symbol, STATEMENT_LIMIT
        );
        self.get_json(&url).await
    }

    /// Fetch income and balance sheet statements and merge them into one
    /// record per reporting period, most recent first (FMP's native order).
    /// Periods with no matching balance sheet keep their income fields and
    /// leave the balance fields absent.
    pub async fn financial_statements(
        &self,
        symbol: &str,
    ) -> Result<Vec<RawFinancialRecord>, DataError> {
        let (income, balance) = tokio::join!(
            self.income_statements(symbol),
            self.balance_sheets(symbol)
        );
        let income = income?;
        let balance = balance?;

        Ok(income
            .into_iter()
            .map(|inc| {
                let matching = balance
                    .iter()
                    .find(|b| b.calendar_year == inc.calendar_year && b.period == inc.period);

                RawFinancialRecord {
                    symbol: symbol.to_uppercase(),
                    revenue: inc.revenue,
                    net_income: inc.net_income,
                    selling_general_and_administrative_expenses: inc
                        .selling_general_and_administrative_expenses,
                    weighted_average_shares_outstanding: inc.weighted_average_shs_out,
                    total_assets: matching.and_then(|b| b.total_assets),
                    total_stockholders_equity: matching.and_then(|b| b.total_stockholders_equity),
                    total_debt: matching.and_then(|b| b.total_debt),
                    calendar_year: inc.calendar_year.as_deref().and_then(|y| y.parse().ok()),
                    period: inc.period,
                }
            })
            .collect())
    }

    /// Fetch the current market quote for a symbol.
    pub async fn quote(&self, symbol: &str) -> Result<MarketQuote, DataError> {
        let url = format!("{}/quote/{}", self.base_url, symbol);
        let rows: Vec<QuoteRow> = self.get_json(&url).await?;

        rows.into_iter()
            .next()
            .map(|q| MarketQuote {
                symbol: q.symbol,
                price: q.price,
                change: q.change,
                change_percent: q.changes_percentage,
                volume: q.volume,
                market_cap: q.market_cap,
                pe: q.pe,
            })
            .ok_or_else(|| DataError::NotFound(format!("No quote returned for {}", symbol)))
    }
}

#[async_trait]
impl FinancialDataProvider for FmpClient {
    async fn financial_statements(
        &self,
        ticker: &str,
    ) -> Result<Vec<RawFinancialRecord>, DataError> {
        FmpClient::financial_statements(self, ticker).await
    }

    async fn market_quote(&self, ticker: &str) -> Result<MarketQuote, DataError> {
        self.quote(ticker).await
    }
}

// Response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
struct IncomeStatementRow {
    calendar_year: Option<String>,
    period: Option<String>,
    revenue: Option<f64>,
    net_income: Option<f64>,
    selling_general_and_administrative_expenses: Option<f64>,
    #[serde(alias = "weightedAverageSharesOutstanding")]
    weighted_average_shs_out: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
struct BalanceSheetRow {
    calendar_year: Option<String>,
    period: Option<String>,
    total_assets: Option<f64>,
    total_stockholders_equity: Option<f64>,
    total_debt: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
struct QuoteRow {
    symbol: String,
    price: Option<f64>,
    change: Option<f64>,
    changes_percentage: Option<f64>,
    volume: Option<f64>,
    market_cap: Option<f64>,
    pe: Option<f64>,
}
