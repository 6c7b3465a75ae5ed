mod bootstrap;
mod repl;
mod summary;

use std::process::ExitCode;

use anyhow::Result;
use pivot_core::error::PivotError;
use pivot_core::settings::Settings;
use pivot_data::exporter::SHEET_NAME;
use pivot_data::pivot::build_pivot;
use pivot_data::store::FsSnapshotStore;
use pivot_runtime::batch::{exit_code, run_batch, BatchConfig, BatchOutcome};
use pivot_runtime::session::UploadSession;
use pivot_ui::app::PivotViewer;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories(&settings.output_dir)?;
    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Enrollment Pivot v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Schema: {:?}, Keys: {:?}, Input: {}, Output: {}",
        settings.mode,
        settings.schema,
        settings.key_layout(),
        settings.input_dir.display(),
        settings.output_dir.display()
    );

    match settings.mode.as_str() {
        "batch" => return Ok(run_batch_mode(&settings)),

        "session" => {
            let session = UploadSession::new(
                FsSnapshotStore::new(settings.results_dir()),
                settings.schema.schema(),
                settings.key_layout(),
            );
            repl::run_session(&session, &settings.theme).await?;
        }

        "view" => {
            let store = FsSnapshotStore::new(settings.results_dir());
            let table = build_pivot(&store, settings.key_layout())?;
            PivotViewer::new(&settings.theme, SHEET_NAME, table).run()?;
        }

        unknown => {
            eprintln!("Unknown mode: {}", unknown);
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run a batch over `settings.input_dir`, printing per-file status lines and
/// the end-of-run summary.
fn run_batch_mode(settings: &Settings) -> ExitCode {
    let config = BatchConfig {
        input_dir: settings.input_dir.clone(),
        results_dir: settings.results_dir(),
        output_file: settings.output_file(),
        schema: settings.schema.schema(),
        layout: settings.key_layout(),
    };

    println!("Processing {}", config.input_dir.display());
    let result = run_batch(&config, |status| println!("{status}"));

    match &result {
        Ok(BatchOutcome::Completed(report)) => {
            println!();
            print!("{}", summary::format_summary(report));
        }
        Ok(BatchOutcome::NoInputFiles(dir)) => {
            println!("Warning: no .xlsx files found in {}", dir.display());
        }
        Err(e @ PivotError::Batch { .. }) => {
            tracing::error!(error = %e, "batch aborted");
            eprintln!("{e}");
        }
        Err(e) => eprintln!("{e}"),
    }

    ExitCode::from(exit_code(&result) as u8)
}
