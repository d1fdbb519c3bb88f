use crate::core::export::{self, DEFAULT_FILE_STEM, PROCESSED_FILE_NAME};
use crate::core::reader::parse_csv;
use crate::core::{ConfigProvider, Pipeline, SourceBatch, SourceType, Storage, TransformResult};
use crate::domain::services::annotations::AnnotationStore;
use crate::domain::services::RecordSet;
use crate::utils::error::{EtlError, Result};

pub struct MembershipPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> MembershipPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn output_file(&self, file_name: &str) -> String {
        let base = self.config.output_path().trim_end_matches('/');
        if base.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", base, file_name)
        }
    }

    async fn load_annotations(&self) -> Result<AnnotationStore> {
        let Some(path) = self.config.annotations_file() else {
            return Ok(AnnotationStore::new());
        };
        if !self.storage.exists(path).await {
            tracing::debug!("Annotation store {} not found, starting empty", path);
            return Ok(AnnotationStore::new());
        }

        let bytes = self.storage.read_file(path).await?;
        let store = AnnotationStore::from_json(&bytes)?;
        tracing::debug!("Loaded {} annotations from {}", store.len(), path);
        Ok(store)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for MembershipPipeline<S, C> {
    async fn extract(&self) -> Result<SourceBatch> {
        let prefixes = self.config.source_prefixes();
        let mut batch = SourceBatch::default();

        for path in self.config.input_files() {
            let Some(source) = SourceType::from_file_name(path, &prefixes) else {
                tracing::warn!("Skipping {}: file name matches no known report prefix", path);
                continue;
            };

            tracing::debug!("Reading {} report from {}", source, path);
            let bytes = self.storage.read_file(path).await?;
            let table = parse_csv(&bytes)?;
            // 到期報表以欄位位置取姓名與信箱；過短的資料列交給 standardize 丟棄
            if source == SourceType::Expirations
                && !table.headers.is_empty()
                && table.headers.len() < 2
            {
                return Err(EtlError::ValidationError {
                    message: format!("{} has a header with fewer than two columns", path),
                });
            }
            let rows = table.rows;
            tracing::info!("Loaded {} {} rows from {}", rows.len(), source, path);
            batch.rows_mut(source).extend(rows);
        }

        if batch.expirations.is_empty() {
            tracing::warn!("No expirations rows loaded; the output will be empty");
        }

        Ok(batch)
    }

    async fn transform(&self, batch: SourceBatch) -> Result<TransformResult> {
        let options = self.config.processing_options()?;
        let annotations = self.load_annotations().await?;

        let mut records = RecordSet::from_sources(&batch, &options).with_annotations(annotations);
        tracing::debug!("Resolved {} unique customers", records.len());

        let edits = self.config.annotation_edits();
        for edit in &edits {
            records.apply_edit(edit, options.today)?;
            tracing::info!("Applied annotation edit for {}", edit.email());
        }

        let processed = records.processed(&options);
        let exports = export::render_exports(
            &processed.all_records,
            self.config.export_formats(),
            DEFAULT_FILE_STEM,
        )?;

        Ok(TransformResult {
            processed,
            exports,
            annotations: (!edits.is_empty()).then(|| records.annotations().clone()),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        if let (Some(path), Some(store)) = (self.config.annotations_file(), &result.annotations) {
            self.storage.write_file(path, &store.to_json()?).await?;
            tracing::debug!("Saved {} annotations to {}", store.len(), path);
        }

        if let Some(bundle_name) = self.config.bundle_name() {
            // 全部打包成單一 ZIP
            let zip_data = export::bundle(&result.exports, &result.processed)?;
            let output_path = self.output_file(bundle_name);
            tracing::debug!("Writing ZIP file ({} bytes) to {}", zip_data.len(), output_path);
            self.storage.write_file(&output_path, &zip_data).await?;
            return Ok(output_path);
        }

        for rendered in &result.exports {
            let path = self.output_file(&rendered.file_name);
            tracing::debug!("Writing {} ({} bytes)", path, rendered.bytes.len());
            self.storage.write_file(&path, &rendered.bytes).await?;
        }

        let processed_json = serde_json::to_vec_pretty(&result.processed)?;
        self.storage
            .write_file(&self.output_file(PROCESSED_FILE_NAME), &processed_json)
            .await?;

        Ok(self.config.output_path().to_string())
    }
}
