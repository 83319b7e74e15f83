use insurance_core::{Assessment, CompanySizeClass, Rating};

/// One benchmark band: a closed `[min, max]` value range mapped to a rating
/// and an approximate industry percentile.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub rating: Rating,
    pub min: f64,
    pub max: f64,
    pub percentile: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

const fn band(rating: Rating, min: f64, max: f64, percentile: u8) -> Band {
    Band {
        rating,
        min,
        max,
        percentile,
    }
}

// Band tables are ordered excellent -> critical (canonical rating order);
// the first band containing the value wins, so a shared boundary resolves
// to the better rating. Smaller carriers get wider, shifted bands.

const COMBINED_LARGE: [Band; 5] = [
    band(Rating::Excellent, 85.0, 95.0, 90),
    band(Rating::Good, 95.0, 100.0, 75),
    band(Rating::Fair, 100.0, 105.0, 50),
    band(Rating::Poor, 105.0, 110.0, 25),
    band(Rating::Critical, 110.0, 125.0, 10),
];
const COMBINED_MEDIUM: [Band; 5] = [
    band(Rating::Excellent, 85.0, 96.0, 90),
    band(Rating::Good, 96.0, 101.0, 75),
    band(Rating::Fair, 101.0, 106.0, 50),
    band(Rating::Poor, 106.0, 112.0, 25),
    band(Rating::Critical, 112.0, 128.0, 10),
];
const COMBINED_SMALL: [Band; 5] = [
    band(Rating::Excellent, 84.0, 97.0, 90),
    band(Rating::Good, 97.0, 103.0, 75),
    band(Rating::Fair, 103.0, 108.0, 50),
    band(Rating::Poor, 108.0, 115.0, 25),
    band(Rating::Critical, 115.0, 130.0, 10),
];

const LOSS_LARGE: [Band; 5] = [
    band(Rating::Excellent, 50.0, 60.0, 90),
    band(Rating::Good, 60.0, 68.0, 75),
    band(Rating::Fair, 68.0, 75.0, 50),
    band(Rating::Poor, 75.0, 82.0, 25),
    band(Rating::Critical, 82.0, 95.0, 10),
];
const LOSS_MEDIUM: [Band; 5] = [
    band(Rating::Excellent, 50.0, 62.0, 90),
    band(Rating::Good, 62.0, 70.0, 75),
    band(Rating::Fair, 70.0, 78.0, 50),
    band(Rating::Poor, 78.0, 85.0, 25),
    band(Rating::Critical, 85.0, 98.0, 10),
];
const LOSS_SMALL: [Band; 5] = [
    band(Rating::Excellent, 48.0, 64.0, 90),
    band(Rating::Good, 64.0, 72.0, 75),
    band(Rating::Fair, 72.0, 80.0, 50),
    band(Rating::Poor, 80.0, 88.0, 25),
    band(Rating::Critical, 88.0, 100.0, 10),
];

const EXPENSE_LARGE: [Band; 5] = [
    band(Rating::Excellent, 15.0, 24.0, 90),
    band(Rating::Good, 24.0, 28.0, 75),
    band(Rating::Fair, 28.0, 31.0, 50),
    band(Rating::Poor, 31.0, 34.0, 25),
    band(Rating::Critical, 34.0, 40.0, 10),
];
const EXPENSE_MEDIUM: [Band; 5] = [
    band(Rating::Excellent, 15.0, 26.0, 90),
    band(Rating::Good, 26.0, 30.0, 75),
    band(Rating::Fair, 30.0, 33.0, 50),
    band(Rating::Poor, 33.0, 36.0, 25),
    band(Rating::Critical, 36.0, 42.0, 10),
];
const EXPENSE_SMALL: [Band; 5] = [
    band(Rating::Excellent, 15.0, 28.0, 90),
    band(Rating::Good, 28.0, 32.0, 75),
    band(Rating::Fair, 32.0, 35.0, 50),
    band(Rating::Poor, 35.0, 38.0, 25),
    band(Rating::Critical, 38.0, 45.0, 10),
];

const ROE_LARGE: [Band; 5] = [
    band(Rating::Excellent, 12.0, 35.0, 90),
    band(Rating::Good, 9.0, 12.0, 75),
    band(Rating::Fair, 6.0, 9.0, 50),
    band(Rating::Poor, 3.0, 6.0, 25),
    band(Rating::Critical, 0.0, 3.0, 10),
];
const ROE_MEDIUM: [Band; 5] = [
    band(Rating::Excellent, 11.0, 38.0, 90),
    band(Rating::Good, 8.0, 11.0, 75),
    band(Rating::Fair, 5.0, 8.0, 50),
    band(Rating::Poor, 2.0, 5.0, 25),
    band(Rating::Critical, -2.0, 2.0, 10),
];
const ROE_SMALL: [Band; 5] = [
    band(Rating::Excellent, 10.0, 40.0, 90),
    band(Rating::Good, 7.0, 10.0, 75),
    band(Rating::Fair, 4.0, 7.0, 50),
    band(Rating::Poor, 1.0, 4.0, 25),
    band(Rating::Critical, -5.0, 1.0, 10),
];

fn table_for(metric: &str, size: CompanySizeClass) -> Option<(&'static [Band; 5], Direction)> {
    use CompanySizeClass::*;
    use Direction::*;
    match metric {
        "combined_ratio" => Some((
            match size {
                Large => &COMBINED_LARGE,
                Medium => &COMBINED_MEDIUM,
                Small => &COMBINED_SMALL,
            },
            LowerIsBetter,
        )),
        "loss_ratio" => Some((
            match size {
                Large => &LOSS_LARGE,
                Medium => &LOSS_MEDIUM,
                Small => &LOSS_SMALL,
            },
            LowerIsBetter,
        )),
        "expense_ratio" => Some((
            match size {
                Large => &EXPENSE_LARGE,
                Medium => &EXPENSE_MEDIUM,
                Small => &EXPENSE_SMALL,
            },
            LowerIsBetter,
        )),
        "roe" => Some((
            match size {
                Large => &ROE_LARGE,
                Medium => &ROE_MEDIUM,
                Small => &ROE_SMALL,
            },
            HigherIsBetter,
        )),
        _ => None,
    }
}

/// Classify a metric value against the benchmark table for the given size
/// class.
///
/// Unknown metric names and non-finite values map to a neutral `Unknown`
/// assessment at percentile 50; values outside every band are outliers at
/// percentile 95 (beyond excellent) or 5 (beyond critical). Pure function,
/// never fails.
pub fn classify(metric: &str, value: f64, size: CompanySizeClass) -> Assessment {
    if !value.is_finite() {
        return Assessment {
            rating: Rating::Unknown,
            percentile: 50,
        };
    }
    let Some((bands, direction)) = table_for(metric, size) else {
        return Assessment {
            rating: Rating::Unknown,
            percentile: 50,
        };
    };

    for b in bands {
        if value >= b.min && value <= b.max {
            return Assessment {
                rating: b.rating,
                percentile: b.percentile,
            };
        }
    }

    // Outside every band: decide which extreme it fell past.
    let beyond_excellent = match direction {
        Direction::LowerIsBetter => value < bands[0].min,
        Direction::HigherIsBetter => value > bands[0].max,
    };
    Assessment {
        rating: Rating::Outlier,
        percentile: if beyond_excellent { 95 } else { 5 },
    }
}

/// The excellent-tier target range for a metric, used to annotate report
/// entries with the benchmark being applied.
pub fn target_range(metric: &str, size: CompanySizeClass) -> Option<(f64, f64)> {
    table_for(metric, size).map(|(bands, _)| (bands[0].min, bands[0].max))
}
