pub mod dashboard;
pub mod health;
pub mod preview;
pub mod progress;
pub mod submit;

pub use dashboard::{record_event, view_dashboard};
pub use health::health;
pub use preview::preview;
pub use progress::job_progress;
pub use submit::submit_job;
