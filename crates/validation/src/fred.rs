use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const HISTORY_POINTS: usize = 12;

/// One observation of a macro series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub value: f64,
}

/// Latest value plus a short history for one named series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroSeries {
    pub series_id: String,
    pub latest: f64,
    pub history: Vec<SeriesPoint>,
}

/// The macro indicators the validation engine cares about. Any individual
/// series may be absent when its fetch failed; a snapshot with every field
/// `None` is still a valid (if useless) snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroSnapshot {
    pub unemployment_rate: Option<f64>,
    pub fed_funds_rate: Option<f64>,
    pub cpi: Option<f64>,
    pub ten_year_yield: Option<f64>,
    pub series: Vec<MacroSeries>,
}

/// Client for the FRED observations API.
#[derive(Clone)]
pub struct FredClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl FredClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Client keyed from the `FRED_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let key = std::env::var("FRED_API_KEY")
            .map_err(|_| anyhow!("FRED_API_KEY not set"))?;
        Ok(Self::new(key))
    }

    /// Override the endpoint base, for pointing at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the latest observations for one series, most recent first.
    pub async fn series(&self, series_id: &str) -> Result<MacroSeries> {
        let url = format!(
            "{}?series_id={}&api_key={}&file_type=json&sort_order=desc&limit={}",
            self.base_url, series_id, self.api_key, HISTORY_POINTS
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("FRED HTTP {} for {}", response.status(), series_id));
        }

        let json: serde_json::Value = response.json().await?;
        if let Some(message) = json.get("error_message").and_then(|v| v.as_str()) {
            return Err(anyhow!("FRED error for {}: {}", series_id, message));
        }

        let observations = json
            .get("observations")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("No observations returned for {}", series_id))?;

        // FRED reports missing values as the literal string "." — skip them.
        let history: Vec<SeriesPoint> = observations
            .iter()
            .filter_map(|o| {
                let date = o.get("date").and_then(|v| v.as_str())?.to_string();
                let value = o
                    .get("value")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<f64>().ok())?;
                Some(SeriesPoint { date, value })
            })
            .collect();

        let latest = history
            .first()
            .map(|p| p.value)
            .ok_or_else(|| anyhow!("Series {} has no numeric observations", series_id))?;

        Ok(MacroSeries {
            series_id: series_id.to_string(),
            latest,
            history,
        })
    }

    /// Fetch the full indicator set concurrently. Individual series failures
    /// degrade to `None` and are logged; only a fully-failed snapshot is an
    /// error.
    pub async fn snapshot(&self) -> Result<MacroSnapshot> {
        let (unrate, fedfunds, cpi, gs10) = tokio::join!(
            self.series("UNRATE"),
            self.series("FEDFUNDS"),
            self.series("CPIAUCSL"),
            self.series("GS10"),
        );

        let mut snapshot = MacroSnapshot::default();
        let mut fetched = 0usize;

        for (slot, result) in [
            ("UNRATE", unrate),
            ("FEDFUNDS", fedfunds),
            ("CPIAUCSL", cpi),
            ("GS10", gs10),
        ] {
            match result {
                Ok(series) => {
                    fetched += 1;
                    match slot {
                        "UNRATE" => snapshot.unemployment_rate = Some(series.latest),
                        "FEDFUNDS" => snapshot.fed_funds_rate = Some(series.latest),
                        "CPIAUCSL" => snapshot.cpi = Some(series.latest),
                        _ => snapshot.ten_year_yield = Some(series.latest),
                    }
                    snapshot.series.push(series);
                }
                Err(e) => tracing::warn!("FRED series {} unavailable: {}", slot, e),
            }
        }

        if fetched == 0 {
            return Err(anyhow!("All FRED series fetches failed"));
        }
        Ok(snapshot)
    }
}
