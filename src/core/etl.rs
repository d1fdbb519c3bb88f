use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor_enabled: bool,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor_enabled,
        }
    }

    pub async fn run(&self) -> Result<String> {
        let mut monitor = StageMonitor::new(self.monitor_enabled);
        tracing::info!("Starting membership ETL process...");

        // Extract
        let batch = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} rows ({} expirations, {} frozen, {} not activated)",
            batch.total_rows(),
            batch.expirations.len(),
            batch.frozen.len(),
            batch.not_activated.len()
        );
        monitor.mark("extract", batch.total_rows());

        // Transform
        let result = self.pipeline.transform(batch).await?;
        tracing::info!(
            "Processed {} membership records into {} export files",
            result.processed.all_records.len(),
            result.exports.len()
        );
        monitor.mark("transform", result.processed.all_records.len());

        // Load
        let records = result.processed.all_records.len();
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        monitor.mark("load", records);

        monitor.log_final_stats();
        Ok(output_path)
    }
}
