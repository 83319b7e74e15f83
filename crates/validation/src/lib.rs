pub mod edgar;
pub mod engine;
pub mod fred;

pub use edgar::{EdgarClient, RegulatoryFiling};
pub use engine::{MacroSource, RegulatorySource, ValidationEngine};
pub use fred::{FredClient, MacroSeries, MacroSnapshot, SeriesPoint};
