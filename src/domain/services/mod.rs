pub mod aggregate;
pub mod annotations;
pub mod classifier;
pub mod dates;
pub mod dedup;
pub mod periods;
pub mod query;
pub mod standardizer;
pub mod tagging;

pub use aggregate::{build_processed_data, RecordSet};
pub use classifier::classify;
pub use dedup::{resolve, ExclusionMatcher, ExclusionPolicy, ExclusionTarget};
pub use periods::group_by_period;
pub use query::{filter, sort};
pub use standardizer::standardize;
pub use tagging::tag;
