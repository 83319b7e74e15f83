use insurance_core::{DerivedMetrics, RawFinancialRecord};

/// Plausible combined-ratio ranges for well-known P&C carriers, as
/// `(ticker, base, spread)`. The estimate drawn is `base + rng * spread`.
///
/// This table is a placeholder fixture standing in for a reported industry
/// data source; it should be replaced, not extended, once a real source of
/// reported combined ratios is wired in.
const CARRIER_COMBINED_RANGES: &[(&str, f64, f64)] = &[
    ("TRV", 94.0, 6.0),
    ("PGR", 89.0, 6.0),
    ("ALL", 93.0, 8.0),
    ("CB", 87.0, 8.0),
    ("AIG", 95.0, 10.0),
    ("HIG", 92.0, 6.0),
    ("WRB", 90.0, 6.0),
    ("CINF", 94.0, 8.0),
    ("MKL", 92.0, 8.0),
    ("ACGL", 85.0, 8.0),
];

/// Round to one decimal place (percentage-valued fields).
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to two decimal places (currency and per-share fields).
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Derives the full set of P&C insurance metrics from one raw financial
/// statement record.
///
/// The engine never fails: missing numeric inputs degrade to zeroed or
/// default-banded output, and the caller decides whether zeroed output should
/// be treated as an error. The only non-deterministic step is the
/// combined-ratio estimate, which draws a bounded offset from an explicit
/// seedable RNG so tests can pin the output.
pub struct MetricsEngine {
    rng: fastrand::Rng,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Engine with a fixed RNG seed. Two engines built with the same seed
    /// produce identical output for identical input sequences.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Transform one raw statement record into derived metrics.
    ///
    /// A fresh value is returned on every call; nothing is mutated in place.
    pub fn derive(&mut self, record: &RawFinancialRecord) -> DerivedMetrics {
        // Missing numerics default to 0 so no absence ever reaches the
        // ratio arithmetic. Shares outstanding floors at 1.
        let revenue = record.revenue.unwrap_or(0.0);
        let net_income = record.net_income.unwrap_or(0.0);
        let assets = record.total_assets.unwrap_or(0.0);
        let equity = record.total_stockholders_equity.unwrap_or(0.0);
        let shares = match record.weighted_average_shares_outstanding {
            Some(s) if s > 0.0 => s,
            _ => 1.0,
        };
        let operating_expenses = record
            .selling_general_and_administrative_expenses
            .unwrap_or(0.0);
        let debt = record.total_debt.unwrap_or(0.0);

        let profit_margin = if revenue > 0.0 {
            net_income / revenue * 100.0
        } else {
            0.0
        };
        let roe = if equity > 0.0 {
            net_income / equity * 100.0
        } else {
            0.0
        };
        let roa = if assets > 0.0 {
            net_income / assets * 100.0
        } else {
            0.0
        };
        let book_value_per_share = if equity > 0.0 { equity / shares } else { 0.0 };
        let debt_to_equity = if equity > 0.0 { debt / equity * 100.0 } else { 0.0 };

        // Expense ratios derived outside plausible P&C bounds are clipped
        // rather than surfaced raw. Note this silently distorts carriers
        // whose true operating-expense ratio genuinely falls outside the
        // band; preserved as observed upstream behavior.
        let base_expense_ratio = if revenue > 0.0 {
            operating_expenses / revenue * 100.0
        } else {
            0.0
        };
        let expense_ratio = round1(base_expense_ratio.clamp(15.0, 35.0));

        // Loss ratio is the remainder of the combined-ratio estimate after
        // expenses, floored at 50. The combined ratio is then recomputed
        // from the two parts so the identity holds exactly even after the
        // floor clamp.
        let estimate = self.combined_ratio_estimate(&record.symbol, profit_margin);
        let loss_ratio = round1((estimate - expense_ratio).max(50.0));
        let combined_ratio = round1(loss_ratio + expense_ratio);
        let underwriting_profit_margin = round1(100.0 - combined_ratio);

        // Investment income is rarely broken out by the upstream statements;
        // estimate it as 30% of net income.
        let investment_yield = if assets > 0.0 {
            round1((net_income * 0.3) / assets * 100.0)
        } else {
            2.5
        };

        // Coarse estimates, not GAAP figures.
        let float_per_share = round2(assets * 0.7 / shares);
        let reserve_ratio = if revenue > 0.0 {
            round2(assets * 0.6 / revenue)
        } else {
            0.0
        };
        let tangible_book_value = if equity > 0.0 {
            // 5% intangibles haircut.
            round2(equity * 0.95)
        } else {
            0.0
        };

        DerivedMetrics {
            symbol: record.symbol.clone(),
            year: record.calendar_year.unwrap_or(0),
            period: record.period.clone().unwrap_or_else(|| "FY".to_string()),
            revenue,
            net_income,
            total_assets: assets,
            total_equity: equity,
            shares_outstanding: shares,
            profit_margin: round1(profit_margin),
            roe: round1(roe),
            roa: round1(roa),
            book_value_per_share: round2(book_value_per_share),
            tangible_book_value,
            debt_to_equity: round1(debt_to_equity),
            expense_ratio,
            loss_ratio,
            combined_ratio,
            underwriting_profit_margin,
            investment_yield,
            float_per_share,
            reserve_ratio,
        }
    }

    /// Combined-ratio estimate for a carrier: ticker-specific band when the
    /// carrier is in the fixture table, otherwise a profitability-tiered
    /// generic band (better margins imply better underwriting).
    fn combined_ratio_estimate(&mut self, symbol: &str, profit_margin: f64) -> f64 {
        let (base, spread) = match CARRIER_COMBINED_RANGES
            .iter()
            .find(|(ticker, _, _)| ticker.eq_ignore_ascii_case(symbol))
        {
            Some(&(_, base, spread)) => (base, spread),
            None if profit_margin > 15.0 => (88.0, 8.0),
            None if profit_margin > 8.0 => (94.0, 8.0),
            None if profit_margin >= 0.0 => (98.0, 10.0),
            // Negative margin carriers land in the worst band.
            None => (105.0, 15.0),
        };
        base + self.rng.f64() * spread
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: a filled-in annual record for a mid-sized carrier.
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

    #[test]
    fn combined_ratio_is_sum_of_parts() {
        let mut engine = MetricsEngine::with_seed(7);
        for symbol in ["TRV", "PGR", "XYZ"] {
            let m = engine.derive(&record(symbol));
            assert_eq!(
                m.combined_ratio,
                ((m.loss_ratio + m.expense_ratio) * 10.0).round() / 10.0
            );
            assert_eq!(
                m.underwriting_profit_margin,
                ((100.0 - m.combined_ratio) * 10.0).round() / 10.0
            );
        }
    }

    #[test]
    fn expense_ratio_stays_in_band() {
        let mut engine = MetricsEngine::with_seed(1);

        // SG&A far beyond 35% of revenue clamps at the top of the band.
        let mut rec = record("TRV");
        rec.selling_general_and_administrative_expenses = Some(30_000_000_000.0);
        assert_eq!(engine.derive(&rec).expense_ratio, 35.0);

        // Tiny SG&A clamps at the bottom.
        rec.selling_general_and_administrative_expenses = Some(100_000_000.0);
        assert_eq!(engine.derive(&rec).expense_ratio, 15.0);

        // Zero revenue still lands inside the band.
        rec.revenue = Some(0.0);
        let m = engine.derive(&rec);
        assert!(m.expense_ratio >= 15.0 && m.expense_ratio <= 35.0);
    }

    #[test]
    fn loss_ratio_never_below_floor() {
        let mut engine = MetricsEngine::with_seed(2);
        for seed in 0..50u64 {
            let mut e = MetricsEngine::with_seed(seed);
            let m = e.derive(&record("CB"));
            assert!(m.loss_ratio >= 50.0, "seed {seed}: {}", m.loss_ratio);
        }
        let m = engine.derive(&record("ACGL"));
        assert!(m.loss_ratio >= 50.0);
    }

    #[test]
    fn same_seed_same_output() {
        let mut a = MetricsEngine::with_seed(42);
        let mut b = MetricsEngine::with_seed(42);
        let rec = record("UNKNOWN_TICKER");
        let ma = a.derive(&rec);
        let mb = b.derive(&rec);
        assert_eq!(
            serde_json::to_value(&ma).unwrap(),
            serde_json::to_value(&mb).unwrap()
        );
    }

    #[test]
    fn all_zero_record_degrades_gracefully() {
        let mut engine = MetricsEngine::with_seed(3);
        let m = engine.derive(&RawFinancialRecord {
            symbol: "ZERO".to_string(),
            ..Default::default()
        });
        assert_eq!(m.profit_margin, 0.0);
        assert_eq!(m.roe, 0.0);
        assert_eq!(m.roa, 0.0);
        assert_eq!(m.book_value_per_share, 0.0);
        assert_eq!(m.shares_outstanding, 1.0);
        assert!(m.expense_ratio >= 15.0 && m.expense_ratio <= 35.0);
        assert_eq!(m.investment_yield, 2.5);
        assert_eq!(m.reserve_ratio, 0.0);
        assert_eq!(m.period, "FY");
    }

    #[test]
    fn negative_margin_falls_into_worst_band() {
        let mut rec = record("NOBODY");
        rec.net_income = Some(-4_000_000_000.0);
        // The generic band for a loss-making carrier starts at 105; spread
        // tops out at 120.
        for seed in 0..50u64 {
            let mut e = MetricsEngine::with_seed(seed);
            let m = e.derive(&rec);
            assert!(
                m.combined_ratio >= 104.9 && m.combined_ratio <= 120.1,
                "seed {seed}: {}",
                m.combined_ratio
            );
        }
    }

    #[test]
    fn rounding_precision() {
        let mut engine = MetricsEngine::with_seed(11);
        let m = engine.derive(&record("TRV"));
        for pct in [
            m.profit_margin,
            m.roe,
            m.roa,
            m.debt_to_equity,
            m.expense_ratio,
            m.loss_ratio,
            m.combined_ratio,
            m.underwriting_profit_margin,
            m.investment_yield,
        ] {
            assert_eq!(pct, (pct * 10.0).round() / 10.0);
        }
        for per_share in [m.book_value_per_share, m.float_per_share] {
            assert_eq!(per_share, (per_share * 100.0).round() / 100.0);
        }
    }
}
