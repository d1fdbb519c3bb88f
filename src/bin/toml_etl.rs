use clap::Parser;
use membership_etl::core::{ConfigProvider, Pipeline, SourceType};
use membership_etl::domain::services::dates::describe_days_lapsed;
use membership_etl::utils::{logger, validation::Validate};
use membership_etl::{EtlEngine, LocalStorage, MembershipPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "membership-toml")]
#[command(about = "Membership expiry ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "membership-etl.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No files will be written");
        perform_dry_run(config).await?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = MembershipPipeline::new(LocalStorage::default(), config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    let formats: Vec<String> = config
        .export_formats()
        .iter()
        .map(|f| f.to_string())
        .collect();

    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("-")
    );
    println!("  Inputs: {} file(s)", config.source.files.len());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", formats.join(", "));
    println!("  Grouping: {:?}", config.processing.grouping);

    if let Some(bundle) = config.bundle_name() {
        println!("  Bundle: {}", bundle);
    }
    if let Some(path) = config.annotations_file() {
        println!("  Annotations: {}", path);
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: TomlConfig) -> anyhow::Result<()> {
    let prefixes = config.source_prefixes();

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📥 Input Files:");
    for file in config.input_files() {
        match SourceType::from_file_name(file, &prefixes) {
            Some(source) => println!("  {} -> {}", file, source),
            None => println!("  {} -> skipped, no matching prefix", file),
        }
    }

    // 只跑 extract 與 transform，不寫入任何檔案
    let pipeline = MembershipPipeline::new(LocalStorage::default(), config);
    let batch = pipeline.extract().await?;
    let result = pipeline.transform(batch).await?;
    let summary = &result.processed.summary;

    println!();
    println!("⚙️ Processing Preview:");
    println!("  Records: {}", summary.total);
    println!(
        "  Upcoming: {}, today: {}, recent: {}, 30 days: {}, 90 days: {}, old: {}",
        summary.upcoming,
        summary.today,
        summary.recent,
        summary.within_30_days,
        summary.within_90_days,
        summary.old
    );
    for record in result.processed.all_records.iter().take(5) {
        println!(
            "  {} <{}> {} ({})",
            record.customer_name,
            record.customer_email,
            record.membership_name,
            describe_days_lapsed(record.days_lapsed)
        );
    }

    println!();
    println!(
        "💾 Would write {} export file(s): {}",
        result.exports.len(),
        export_names(&result.exports)
    );
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
    Ok(())
}

fn export_names(exports: &[membership_etl::core::RenderedExport]) -> String {
    exports
        .iter()
        .map(|e| e.file_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
