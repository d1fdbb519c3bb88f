pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{etl::EtlEngine, pipeline::MembershipPipeline};
pub use domain::model::{MembershipRecord, ProcessedData, ProcessingOptions};
pub use domain::services::{build_processed_data, RecordSet};
pub use utils::error::{EtlError, Result};
