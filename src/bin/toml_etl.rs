use clap::Parser;
use freight_etl::config::toml_config::TomlConfig;
use freight_etl::core::extraction::RecordedExtractor;
use freight_etl::core::ConfigProvider;
use freight_etl::domain::model::Email;
use freight_etl::utils::{logger, validation::Validate};
use freight_etl::{EtlEngine, LocalStorage, ReferenceIndex, ShipmentPipeline};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Freight email post-processing with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override worker count from config
    #[arg(long)]
    workers: Option<usize>,

    /// Override max records from config
    #[arg(long)]
    max_records: Option<usize>,

    /// Dry run - check inputs without writing output
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_logger(config.log_format().unwrap_or("text"), args.verbose);
    tracing::info!("🚀 Starting TOML-based freight ETL");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(workers) = args.workers {
        config.transform.workers = Some(workers);
        tracing::info!("🔧 Workers overridden to: {}", workers);
    }
    if let Some(max_records) = args.max_records {
        config.extract.max_records = Some(max_records);
        tracing::info!("🔧 Max records overridden to: {}", max_records);
    }

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
        tracing::info!("🔍 DRY RUN MODE - No output will be written");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match ShipmentPipeline::from_config(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("❌ Failed to initialize pipeline: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    let engine = EtlEngine::new(pipeline);

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

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Reference: {}", config.source.reference_file);
    println!("  Emails: {}", config.source.emails_file);
    println!("  Extractions: {}", config.source.extractions_file);
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));

    if let Some(max_records) = config.max_records() {
        println!("  Max Records: {}", max_records);
    }

    println!("  Workers: {}", config.workers());
    let policy = config.retry_policy();
    println!(
        "  Retry: {} attempts, {:?} base delay",
        policy.max_attempts, policy.base_delay
    );

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📚 Reference Data:");
    let index = ReferenceIndex::from_file(&config.source.reference_file)?;
    println!("  Entries: {}", index.len());
    println!("  Distinct codes: {}", index.codes().len());

    println!();
    println!("📥 Inputs:");
    let emails: Vec<Email> =
        serde_json::from_slice(&std::fs::read(&config.source.emails_file)?)?;
    let recorded = RecordedExtractor::from_file(&config.source.extractions_file)?;
    let limit = config.max_records().unwrap_or(emails.len()).min(emails.len());
    println!("  Emails: {} ({} will be processed)", emails.len(), limit);
    println!("  Recorded extractions: {}", recorded.len());

    let missing: Vec<&str> = emails
        .iter()
        .take(limit)
        .filter(|email| !recorded.contains(&email.id))
        .map(|email| email.id.as_str())
        .collect();
    if !missing.is_empty() {
        println!(
            "  ⚠️ {} emails have no recorded extraction and will fall back: {}",
            missing.len(),
            missing.join(", ")
        );
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
