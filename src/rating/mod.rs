pub mod estimator;
pub mod prior;
pub mod types;

pub use estimator::{
    FLOOR_PERCENTILE, PERCENTILE_BANDS, bayesian_average, confidence, enhance, explanation,
    percentile_bucket,
};
pub use prior::PriorRefresher;
pub use types::GlobalPrior;
