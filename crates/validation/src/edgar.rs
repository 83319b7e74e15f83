use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";

/// Ticker to zero-padded SEC registry identifier (CIK) for the covered P&C
/// carriers. EDGAR is keyed by CIK, not ticker.
const CIK_TABLE: &[(&str, &str)] = &[
    ("TRV", "0000086312"),
    ("PGR", "0000080661"),
    ("ALL", "0000899051"),
    ("CB", "0000896159"),
    ("AIG", "0000005272"),
    ("HIG", "0000874766"),
    ("WRB", "0000011544"),
    ("CINF", "0000020286"),
    ("MKL", "0001096343"),
    ("ACGL", "0000947484"),
];

/// Company identity and filing metadata from the SEC submissions feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryFiling {
    pub ticker: String,
    pub cik: String,
    pub name: String,
    pub sic_description: Option<String>,
    /// Filing date of the most recent annual report (10-K), if any.
    pub latest_annual_filing: Option<String>,
    pub recent_filing_count: usize,
}

/// Client for the SEC EDGAR submissions API. EDGAR requires a descriptive
/// User-Agent and will reject anonymous default agents.
#[derive(Clone)]
pub struct EdgarClient {
    client: reqwest::Client,
    base_url: String,
}

impl EdgarClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("insur-iq research client (research@insuriq.dev)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: SUBMISSIONS_URL.to_string(),
        }
    }

    /// Override the endpoint base, for pointing at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The registry identifier for a ticker, if it is one we track.
    pub fn cik_for(ticker: &str) -> Option<&'static str> {
        let upper = ticker.to_uppercase();
        CIK_TABLE
            .iter()
            .find(|(t, _)| *t == upper)
            .map(|(_, cik)| *cik)
    }

    /// Look up company identity and recent filings for a ticker.
    ///
    /// Unmapped tickers are an explicit not-found error rather than a
    /// guessed lookup against the wrong registrant.
    pub async fn company_filings(&self, ticker: &str) -> Result<RegulatoryFiling> {
        let cik = Self::cik_for(ticker)
            .ok_or_else(|| anyhow!("No SEC registry identifier for {}", ticker))?;

        let url = format!("{}/CIK{}.json", self.base_url, cik);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "EDGAR submissions HTTP {} for {}",
                response.status(),
                ticker
            ));
        }

        let json: serde_json::Value = response.json().await?;

        let name = json
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("EDGAR payload for {} has no registrant name", ticker))?
            .to_string();

        let sic_description = json
            .get("sicDescription")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // The recent-filings block is parallel arrays keyed by column.
        let forms: Vec<String> = json
            .pointer("/filings/recent/form")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let dates: Vec<String> = json
            .pointer("/filings/recent/filingDate")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let latest_annual_filing = forms
            .iter()
            .position(|f| f == "10-K")
            .and_then(|i| dates.get(i).cloned());

        Ok(RegulatoryFiling {
            ticker: ticker.to_uppercase(),
            cik: cik.to_string(),
            name,
            sic_description,
            latest_annual_filing,
            recent_filing_count: forms.len(),
        })
    }
}

impl Default for EdgarClient {
    fn default() -> Self {
        Self::new()
    }
}
