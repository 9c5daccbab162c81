use crate::cli::SyncArgs;
use crate::config::{PartialSyncConfig, defaults};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ensync::engine::external::Toolbox;
use ensync::engine::progress::ProgressReporter;
use ensync::workflows::{self, ensemble::EnsembleDescriptor, sync::SyncResult};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: SyncArgs) -> Result<()> {
    validate_name(&args.name)?;

    let partial_config = match &args.config {
        Some(path) => PartialSyncConfig::from_file(path)?,
        None => PartialSyncConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    info!("Reading ensemble descriptor from {:?}", &args.ensemble);
    let descriptor = EnsembleDescriptor::from_path(&args.ensemble)?;
    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| defaults::output_dir(&args.name));

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let tools = Toolbox::from_config(&config);

    println!(
        "Synchronizing {} structures of ensemble '{}'...",
        descriptor.members().len(),
        args.name
    );
    info!("Invoking the core synchronization workflow...");
    let result = workflows::sync::run(&descriptor.paths(), &out_dir, &config, &tools, &reporter)?;

    report_exclusions(&result, &descriptor);

    let table_path = defaults::residue_table_path(&out_dir, &args.name);
    let table = descriptor.residue_table(&result.outcome.structures);
    info!(
        rows = table.rows().len(),
        "Writing residue table to {:?}", &table_path
    );
    table
        .write_csv_path(&table_path)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to write '{}': {}", table_path.display(), e)))?;

    println!(
        "Wrote {} structures sharing chains [{}] to {}",
        result.output_files.len(),
        result
            .outcome
            .shared_chains
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        out_dir.display()
    );
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || Path::new(name).file_name().is_none() {
        return Err(CliError::Argument(format!(
            "Ensemble name '{}' must be a plain file name",
            name
        )));
    }
    Ok(())
}

fn report_exclusions(result: &SyncResult, descriptor: &EnsembleDescriptor) {
    let excluded = &result.outcome.excluded;
    if excluded.is_empty() {
        return;
    }
    warn!("{} structure(s) were excluded from the ensemble.", excluded.len());
    println!("Excluded {} structure(s):", excluded.len());
    for exclusion in excluded {
        let name = descriptor
            .name_for(Path::new(&exclusion.structure))
            .unwrap_or(&exclusion.structure);
        println!(
            "  - {} ({}): {}",
            name, exclusion.stage, exclusion.reason
        );
    }
}
