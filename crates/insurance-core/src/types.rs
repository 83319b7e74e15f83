use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reporting period for one company, as received from the upstream
/// provider. Every numeric field is optional; the metrics engine treats
/// absent values as 0. Never mutated after retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFinancialRecord {
    pub symbol: String,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_stockholders_equity: Option<f64>,
    #[serde(alias = "weightedAverageShsOut")]
    pub weighted_average_shares_outstanding: Option<f64>,
    pub selling_general_and_administrative_expenses: Option<f64>,
    pub total_debt: Option<f64>,
    pub calendar_year: Option<i32>,
    /// Reporting period label, e.g. "FY" or "Q1".
    pub period: Option<String>,
}

/// Market quote for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe: Option<f64>,
}

/// Full set of derived P&C metrics for one reporting period.
///
/// Invariants held by construction:
/// - `combined_ratio == round1(loss_ratio + expense_ratio)`
/// - `underwriting_profit_margin == round1(100 - combined_ratio)`
/// - percentages rounded to 1 decimal, per-share figures to 2 decimals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub symbol: String,
    pub year: i32,
    pub period: String,
    pub revenue: f64,
    pub net_income: f64,
    pub total_assets: f64,
    pub total_equity: f64,
    pub shares_outstanding: f64,
    pub profit_margin: f64,
    pub roe: f64,
    pub roa: f64,
    pub book_value_per_share: f64,
    pub tangible_book_value: f64,
    pub debt_to_equity: f64,
    pub expense_ratio: f64,
    pub loss_ratio: f64,
    pub combined_ratio: f64,
    pub underwriting_profit_margin: f64,
    pub investment_yield: f64,
    pub float_per_share: f64,
    pub reserve_ratio: f64,
}

/// Company size bucket by annual premium volume, used only to select the
/// matching benchmark band table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanySizeClass {
    Large,
    Medium,
    Small,
}

impl CompanySizeClass {
    /// Classify by annual premium volume in millions: >= 10,000 large,
    /// >= 1,000 medium, else small. Non-finite input defaults to medium.
    pub fn from_premium_volume(millions: f64) -> Self {
        if !millions.is_finite() {
            return CompanySizeClass::Medium;
        }
        if millions >= 10_000.0 {
            CompanySizeClass::Large
        } else if millions >= 1_000.0 {
            CompanySizeClass::Medium
        } else {
            CompanySizeClass::Small
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySizeClass::Large => "large",
            CompanySizeClass::Medium => "medium",
            CompanySizeClass::Small => "small",
        }
    }
}

/// Performance tier for one metric against industry benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
    /// Value outside every band for the metric.
    Outlier,
    /// Unrecognized metric name or non-finite value.
    Unknown,
}

impl Rating {
    /// Score contribution when averaging a validation report.
    pub fn weight(&self) -> f64 {
        match self {
            Rating::Excellent => 100.0,
            Rating::Good => 80.0,
            Rating::Fair => 60.0,
            Rating::Poor => 40.0,
            Rating::Critical => 20.0,
            Rating::Outlier => 10.0,
            Rating::Unknown => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::Fair => "fair",
            Rating::Poor => "poor",
            Rating::Critical => "critical",
            Rating::Outlier => "outlier",
            Rating::Unknown => "unknown",
        }
    }
}

/// Benchmark classification result: tier plus approximate industry percentile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub rating: Rating,
    pub percentile: u8,
}

/// Overall data-quality tier for a validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Error,
}

impl DataQuality {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => DataQuality::Excellent,
            s if s >= 70.0 => DataQuality::Good,
            s if s >= 50.0 => DataQuality::Fair,
            _ => DataQuality::Poor,
        }
    }
}

/// One scored metric inside a validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub metric: String,
    pub value: f64,
    pub rating: Rating,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<u8>,
}

/// Non-fatal issue recorded while validating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportWarning {
    #[serde(rename = "type")]
    pub warning_type: String,
    pub message: String,
}

/// Actionable note appended to a validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub rec_type: String,
    pub message: String,
}

/// Cross-check source consulted while validating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Confidence report for one company's derived metrics. Built fresh per
/// validation call and read-only once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub data_quality: DataQuality,
    pub validations: Vec<ValidationEntry>,
    pub warnings: Vec<ReportWarning>,
    pub recommendations: Vec<Recommendation>,
    pub sources: Vec<SourceRecord>,
}

/// Combined data-access result for one company: latest quote plus derived
/// metrics for every available reporting period (most recent first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyAnalysis {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub quote: Option<MarketQuote>,
    pub metrics: Vec<DerivedMetrics>,
}

/// One entry of a multi-ticker batch fetch. A failed ticker carries its
/// error message and never fails the batch for the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CompanyAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
