pub mod etl;
pub mod export;
pub mod pipeline;
pub mod reader;

pub use crate::domain::model::{
    ExportFormat, FollowUp, MembershipRecord, ProcessedData, RawRow, SourceBatch, SourceType,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RenderedExport, Storage, TransformResult};
pub use crate::utils::error::Result;
