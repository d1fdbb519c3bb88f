use super::{resolve_today, validate_run_settings};
use crate::core::{ConfigProvider, ExportFormat};
use crate::domain::model::{
    AnnotationEdit, FilterOptions, PeriodGrouping, ProcessingOptions, SortSpec, SourcePrefixes,
};
use crate::domain::services::ExclusionPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_path, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Keys follow the dashboard's camelCase names, e.g. `membershipName`.
    #[serde(default)]
    pub filter: FilterOptions,
    /// `field` is camelCase (`expiresAt`), `direction` is `asc` or `desc`.
    #[serde(default)]
    pub sort: SortSpec,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub prefixes: SourcePrefixes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub today: Option<String>,
    #[serde(default)]
    pub grouping: PeriodGrouping,
    #[serde(default)]
    pub exclusion: ExclusionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<ExportFormat>,
    pub compression: Option<CompressionConfig>,
    pub annotations_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${REPORT_DIR})；未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_run_settings(
            &self.source.files,
            &self.load.output_path,
            &self.load.output_formats,
            &self.filter,
            self.processing.today.as_deref(),
        )?;

        if let Some(compression) = self.load.compression.as_ref().filter(|c| c.enabled) {
            validate_path("load.compression.filename", &compression.filename)?;
        }
        if let Some(path) = &self.load.annotations_file {
            validate_path("load.annotations_file", path)?;
        }
        if self.source.files.iter().any(|f| f.contains("${")) {
            return Err(EtlError::ConfigError {
                message: "source.files references an unset environment variable".to_string(),
            });
        }
        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_files(&self) -> &[String] {
        &self.source.files
    }

    fn source_prefixes(&self) -> SourcePrefixes {
        self.source.prefixes.clone()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn export_formats(&self) -> &[ExportFormat] {
        &self.load.output_formats
    }

    fn bundle_name(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    fn annotations_file(&self) -> Option<&str> {
        self.load.annotations_file.as_deref()
    }

    fn annotation_edits(&self) -> Vec<AnnotationEdit> {
        // 批次設定檔不帶編輯，只沿用既有的 annotations
        Vec::new()
    }

    fn processing_options(&self) -> Result<ProcessingOptions> {
        Ok(ProcessingOptions {
            today: resolve_today("processing.today", self.processing.today.as_deref())?,
            grouping: self.processing.grouping,
            filter: self.filter.clone(),
            sort: self.sort,
            exclusion: self.processing.exclusion.clone(),
        })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
