use async_trait::async_trait;
use chrono::Utc;
use insurance_core::{
    CompanySizeClass, DataQuality, DerivedMetrics, Rating, Recommendation, ReportWarning,
    SourceRecord, ValidationEntry, ValidationReport,
};

use crate::edgar::{EdgarClient, RegulatoryFiling};
use crate::fred::{FredClient, MacroSnapshot};

/// The core ratio set every report scores.
const SCORED_METRICS: &[&str] = &["combined_ratio", "roe", "loss_ratio", "expense_ratio"];

/// Fixed bonus added to the running total when the regulatory cross-check
/// verifies the company.
const REGULATORY_BONUS: f64 = 10.0;

/// Seam for the regulatory cross-check, so the engine can be exercised with
/// canned outcomes.
#[async_trait]
pub trait RegulatorySource: Send + Sync {
    async fn company_filings(&self, ticker: &str) -> anyhow::Result<RegulatoryFiling>;
}

#[async_trait]
impl RegulatorySource for EdgarClient {
    async fn company_filings(&self, ticker: &str) -> anyhow::Result<RegulatoryFiling> {
        EdgarClient::company_filings(self, ticker).await
    }
}

/// Seam for the macroeconomic-context lookup.
#[async_trait]
pub trait MacroSource: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<MacroSnapshot>;
}

#[async_trait]
impl MacroSource for FredClient {
    async fn snapshot(&self) -> anyhow::Result<MacroSnapshot> {
        FredClient::snapshot(self).await
    }
}

/// Produces a confidence report for one company's derived metrics by
/// combining benchmark classification with external cross-checks.
///
/// `validate` is infallible by contract: every lookup failure is captured as
/// report content (warnings/sources), never raised past this type. Callers
/// always receive a report object.
pub struct ValidationEngine<R: RegulatorySource, M: MacroSource> {
    regulatory: R,
    macro_source: M,
}

impl ValidationEngine<EdgarClient, FredClient> {
    /// Engine wired to the real EDGAR and FRED endpoints.
    pub fn new(fred_api_key: String) -> Self {
        Self {
            regulatory: EdgarClient::new(),
            macro_source: FredClient::new(fred_api_key),
        }
    }
}

impl<R: RegulatorySource, M: MacroSource> ValidationEngine<R, M> {
    pub fn with_sources(regulatory: R, macro_source: M) -> Self {
        Self {
            regulatory,
            macro_source,
        }
    }

    pub async fn validate(&self, ticker: &str, metrics: &DerivedMetrics) -> ValidationReport {
        let mut validations: Vec<ValidationEntry> = Vec::new();
        let mut warnings: Vec<ReportWarning> = Vec::new();
        let mut recommendations: Vec<Recommendation> = Vec::new();
        let mut sources: Vec<SourceRecord> = Vec::new();

        let size = CompanySizeClass::from_premium_volume(metrics.revenue / 1_000_000.0);

        // Score the core ratio set. A missing metric degrades the average
        // rather than aborting the report.
        let mut total = 0.0;
        let mut scored = 0usize;
        for &name in SCORED_METRICS {
            let value = metric_value(metrics, name);
            let assessment = benchmark_engine::classify(name, value, size);

            if assessment.rating == Rating::Unknown {
                warnings.push(ReportWarning {
                    warning_type: "missing_metric".to_string(),
                    message: format!("{} missing or non-numeric; excluded from scoring", name),
                });
                continue;
            }

            total += assessment.rating.weight();
            scored += 1;
            validations.push(ValidationEntry {
                metric: name.to_string(),
                value,
                rating: assessment.rating,
                message: format!(
                    "{} of {:.1} rates {} for {} carriers",
                    name,
                    value,
                    assessment.rating.as_str(),
                    size.as_str()
                ),
                benchmark: benchmark_engine::target_range(name, size)
                    .map(|(lo, hi)| format!("{:.0}-{:.0}", lo, hi)),
                percentile: Some(assessment.percentile),
            });
        }

        // Regulatory cross-check. Failure is report content, not an error.
        match self.regulatory.company_filings(ticker).await {
            Ok(filing) => {
                total += REGULATORY_BONUS;
                sources.push(SourceRecord {
                    name: "SEC EDGAR".to_string(),
                    status: "verified".to_string(),
                    data: serde_json::to_value(&filing).ok(),
                });
            }
            Err(e) => {
                tracing::warn!("EDGAR verification failed for {}: {}", ticker, e);
                warnings.push(ReportWarning {
                    warning_type: "regulatory_lookup".to_string(),
                    message: format!("Regulatory verification unavailable: {}", e),
                });
            }
        }

        // Macro context shapes recommendations only; it never gates the score.
        match self.macro_source.snapshot().await {
            Ok(snapshot) => {
                if let Some(unemployment) = snapshot.unemployment_rate {
                    if unemployment > 5.5 {
                        recommendations.push(Recommendation {
                            rec_type: "macro_context".to_string(),
                            message: format!(
                                "Unemployment at {:.1}% is elevated; expect pressure on premium growth and higher liability claim frequency",
                                unemployment
                            ),
                        });
                    }
                }
                if let Some(rate) = snapshot.fed_funds_rate {
                    if rate > 5.0 {
                        recommendations.push(Recommendation {
                            rec_type: "macro_context".to_string(),
                            message: format!(
                                "Policy rate at {:.2}% lifts investment yield on float but marks reserve adequacy to a tighter regime",
                                rate
                            ),
                        });
                    }
                }
                sources.push(SourceRecord {
                    name: "FRED".to_string(),
                    status: "ok".to_string(),
                    data: serde_json::to_value(&snapshot).ok(),
                });
            }
            Err(e) => {
                tracing::warn!("macro snapshot failed: {}", e);
                warnings.push(ReportWarning {
                    warning_type: "macro_lookup".to_string(),
                    message: format!("Macro context unavailable: {}", e),
                });
            }
        }

        let overall_score = if scored > 0 {
            (total / scored as f64).round().clamp(0.0, 100.0)
        } else {
            0.0
        };

        // Nothing scorable means the report content is fully degenerate.
        let data_quality = if scored == 0 {
            DataQuality::Error
        } else {
            DataQuality::from_score(overall_score)
        };

        if warnings.len() > 2 {
            recommendations.push(Recommendation {
                rec_type: "data_quality".to_string(),
                message: "Multiple data issues were recorded; verify figures against the carrier's statutory filings before relying on them".to_string(),
            });
        }
        if scored < SCORED_METRICS.len() {
            recommendations.push(Recommendation {
                rec_type: "data_quality".to_string(),
                message: format!(
                    "Only {} of {} core ratios were scorable; the confidence score covers a partial picture",
                    scored,
                    SCORED_METRICS.len()
                ),
            });
        }

        ValidationReport {
            ticker: ticker.to_uppercase(),
            timestamp: Utc::now(),
            overall_score,
            data_quality,
            validations,
            warnings,
            recommendations,
            sources,
        }
    }
}

fn metric_value(metrics: &DerivedMetrics, name: &str) -> f64 {
    match name {
        "combined_ratio" => metrics.combined_ratio,
        "roe" => metrics.roe,
        "loss_ratio" => metrics.loss_ratio,
        "expense_ratio" => metrics.expense_ratio,
        _ => f64::NAN,
    }
}
