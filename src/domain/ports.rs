use crate::domain::model::{
    AnnotationEdit, ExportFormat, ProcessedData, ProcessingOptions, SourceBatch, SourcePrefixes,
};
use crate::domain::services::annotations::AnnotationStore;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_files(&self) -> &[String];
    fn source_prefixes(&self) -> SourcePrefixes;
    fn output_path(&self) -> &str;
    fn export_formats(&self) -> &[ExportFormat];
    /// ZIP 檔名；None 表示各格式分開輸出
    fn bundle_name(&self) -> Option<&str>;
    fn annotations_file(&self) -> Option<&str>;
    fn annotation_edits(&self) -> Vec<AnnotationEdit>;
    fn processing_options(&self) -> Result<ProcessingOptions>;
}

/// A file produced by the transform phase, waiting to be written.
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed: ProcessedData,
    pub exports: Vec<RenderedExport>,
    /// Present when edits were applied and must be persisted.
    pub annotations: Option<AnnotationStore>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceBatch>;
    async fn transform(&self, batch: SourceBatch) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
