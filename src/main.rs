//! cloud-storage-dump
//!
//! Dumps a whole Elasticsearch index to CSV, JSON or XLSX and publishes it to
//! a Google Cloud Storage bucket. The public URL of the uploaded file is the
//! only thing written to stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! CLOUD_STORAGE_BUCKET=dumps ELASTICSEARCH_HOST=localhost \
//!     cloud-storage-dump orders --format csv
//! ```

use tracing_subscriber::EnvFilter;

use cloud_storage_dump::cli::CliInterface;
use cloud_storage_dump::error::Result;
use cloud_storage_dump::export::{ExportJob, ExportService};
use cloud_storage_dump::retrieval::SearchClient;
use cloud_storage_dump::storage::GcsStorage;

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Validate the job before any network call
/// 4. Connect to Elasticsearch and Cloud Storage
/// 5. Run the export and print the public URL
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.args().list_formats {
        println!("{}", CliInterface::formats_listing());
        return Ok(());
    }

    if let Some(path) = cli.config_path() {
        tracing::debug!("Using configuration file {}", path.display());
    }

    let (index, format) = cli.job_request()?;
    let job = ExportJob::new(index, format)?;

    let config = cli.config();
    config.validate()?;

    let source = SearchClient::connect(&config.search)
        .await?
        .with_progress(config.export.progress);
    let storage = GcsStorage::connect(&config.storage).await?;

    let service = ExportService::new(Box::new(source), Box::new(storage))
        .with_scratch_root(config.export.scratch_dir.clone());

    let report = service.run(&job).await?;
    println!("{}", report.public_url);
    Ok(())
}

/// Initialize logging system based on verbosity level
///
/// `RUST_LOG` wins over the configured level when set.
fn initialize_logging(cli: &CliInterface) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,cloud_storage_dump={}",
            cli.log_level().as_str()
        ))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
