pub mod coalesce;

pub use coalesce::{decide_submit, SubmitDecision, SubmitStore};
