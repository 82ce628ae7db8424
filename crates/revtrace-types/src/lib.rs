pub mod baseline;
pub mod transition;
mod util;

pub use baseline::Baseline;
pub use transition::{COMMIT_DATE_FORMAT, Occurrence, Reading, Transition};
pub use util::{SHORT_REVISION_LEN, short_revision};
