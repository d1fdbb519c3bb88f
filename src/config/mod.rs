pub mod cli;
pub mod toml_config;

use crate::core::ExportFormat;
use crate::domain::model::FilterOptions;
use crate::domain::services::dates;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_list, validate_optional_date, validate_path,
};
use chrono::NaiveDate;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

/// `today` 未指定時使用本地日期
pub(crate) fn resolve_today(field_name: &str, value: Option<&str>) -> Result<NaiveDate> {
    match value {
        None => Ok(chrono::Local::now().date_naive()),
        Some(raw) => {
            dates::parse_calendar_date(raw).ok_or_else(|| EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: raw.to_string(),
                reason: "Unrecognized date format".to_string(),
            })
        }
    }
}

/// Checks shared by every configuration source.
pub(crate) fn validate_run_settings(
    inputs: &[String],
    output_path: &str,
    formats: &[ExportFormat],
    filter: &FilterOptions,
    today: Option<&str>,
) -> Result<()> {
    validate_non_empty_list("inputs", inputs)?;
    validate_file_extensions("inputs", inputs, &["csv"])?;
    validate_path("output_path", output_path)?;

    validate_non_empty_list("formats", formats)?;
    if formats.contains(&ExportFormat::Pdf) {
        return Err(EtlError::InvalidConfigValueError {
            field: "formats".to_string(),
            value: ExportFormat::Pdf.to_string(),
            reason: "PDF export is not available, use csv, excel or json".to_string(),
        });
    }

    validate_optional_date("today", today)?;
    validate_optional_date("expires_after", filter.expires_after.as_deref())?;
    validate_optional_date("expires_before", filter.expires_before.as_deref())?;
    Ok(())
}

#[cfg(feature = "cli")]
mod cli_config {
    use super::{resolve_today, validate_run_settings};
    use crate::core::{ConfigProvider, ExportFormat};
    use crate::domain::model::{
        AnnotationEdit, FilterOptions, PeriodGrouping, ProcessingOptions, SortDirection,
        SortField, SortSpec, SourcePrefixes,
    };
    use crate::domain::services::{ExclusionPolicy, ExclusionTarget};
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_path, Validate};
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "membership-etl")]
    #[command(about = "Builds the membership expiry dashboard data from Momence report exports")]
    pub struct CliConfig {
        /// Report CSV files; the type is detected from each file name
        #[arg(long, short, value_delimiter = ',', required = true)]
        pub inputs: Vec<String>,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, value_delimiter = ',', default_value = "csv")]
        pub formats: Vec<ExportFormat>,

        /// Write a single ZIP with every export plus processed.json
        #[arg(long)]
        pub bundle: Option<String>,

        #[arg(long, default_value = "month")]
        pub group_by: PeriodGrouping,

        #[arg(long, default_value = "expiresAt")]
        pub sort_by: SortField,

        #[arg(long, default_value = "asc")]
        pub sort_direction: SortDirection,

        /// Case-insensitive match on customer name or email
        #[arg(long)]
        pub search: Option<String>,

        #[arg(long = "membership", value_delimiter = ',')]
        pub membership_names: Vec<String>,

        #[arg(long = "location", value_delimiter = ',')]
        pub home_locations: Vec<String>,

        #[arg(long = "tag", value_delimiter = ',')]
        pub tags: Vec<String>,

        #[arg(long)]
        pub assigned_to: Option<String>,

        #[arg(long)]
        pub expires_after: Option<String>,

        #[arg(long)]
        pub expires_before: Option<String>,

        /// Drop records without a readable expiry when date bounds are set
        #[arg(long)]
        pub require_expiry: bool,

        /// Reference date for days lapsed (defaults to the local date)
        #[arg(long)]
        pub today: Option<String>,

        #[arg(long, default_value = "both")]
        pub exclusion_target: ExclusionTarget,

        /// JSON file holding assignments and follow-ups between runs
        #[arg(long)]
        pub annotations: Option<String>,

        /// EMAIL=NAME, empty NAME clears the assignment
        #[arg(long = "assign", value_parser = AnnotationEdit::parse_assignment)]
        pub assignments: Vec<AnnotationEdit>,

        /// EMAIL=COMMENT, dated with today
        #[arg(long = "follow-up", value_parser = AnnotationEdit::parse_follow_up)]
        pub follow_ups: Vec<AnnotationEdit>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log stage timings and memory usage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub json_logs: bool,
    }

    impl CliConfig {
        pub fn filter_options(&self) -> FilterOptions {
            FilterOptions {
                search: self.search.clone(),
                membership_name: self.membership_names.clone(),
                home_location: self.home_locations.clone(),
                tags: self.tags.clone(),
                expires_after: self.expires_after.clone(),
                expires_before: self.expires_before.clone(),
                assigned_to: self.assigned_to.clone(),
                require_expiry: self.require_expiry,
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_files(&self) -> &[String] {
            &self.inputs
        }

        fn source_prefixes(&self) -> SourcePrefixes {
            SourcePrefixes::default()
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn export_formats(&self) -> &[ExportFormat] {
            &self.formats
        }

        fn bundle_name(&self) -> Option<&str> {
            self.bundle.as_deref()
        }

        fn annotations_file(&self) -> Option<&str> {
            self.annotations.as_deref()
        }

        fn annotation_edits(&self) -> Vec<AnnotationEdit> {
            self.assignments
                .iter()
                .chain(self.follow_ups.iter())
                .cloned()
                .collect()
        }

        fn processing_options(&self) -> Result<ProcessingOptions> {
            Ok(ProcessingOptions {
                today: resolve_today("today", self.today.as_deref())?,
                grouping: self.group_by,
                filter: self.filter_options(),
                sort: SortSpec {
                    field: self.sort_by,
                    direction: self.sort_direction,
                },
                exclusion: ExclusionPolicy {
                    target: self.exclusion_target,
                    ..Default::default()
                },
            })
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_run_settings(
                &self.inputs,
                &self.output_path,
                &self.formats,
                &self.filter_options(),
                self.today.as_deref(),
            )?;
            if let Some(path) = &self.annotations {
                validate_path("annotations", path)?;
            }
            Ok(())
        }
    }

}
