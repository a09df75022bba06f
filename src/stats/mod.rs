//! Stats module - grouping, reductions and derived rates

mod aggregator;

pub use aggregator::{
    rate, AggregateError, Aggregator, CASE_METRICS, CONFIRMED, DATE, DECEASED, MORTALITY_RATE,
    RECOVERED, RECOVERY_RATE, STATE,
};
