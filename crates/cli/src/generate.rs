// `econfab generate` - run the whole wizard non-interactively

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use econfab_cleaner::CleanerClient;
use econfab_config::Settings;
use econfab_core::{RegressionChoices, RoleAssignment};
use econfab_engine::roles::parse_role_pairs;
use econfab_engine::ScriptGenerator;
use econfab_io::TableParser;
use econfab_pipeline::{ingest_paths, AssemblyMode, DatasetAssembler, Wizard};

use crate::{warn_dropped, CliError};

pub struct GenerateArgs {
    pub files: Vec<PathBuf>,
    pub roles: Vec<String>,
    pub options: Option<PathBuf>,
    pub kind: Option<String>,
    pub robust: bool,
    pub cluster: Option<String>,
    pub time_trends: bool,
    pub interactions: bool,
    pub fixed_effects: Vec<String>,
    pub scatter: bool,
    pub bar: bool,
    pub sheet: Option<String>,
    pub clean: bool,
    pub cleaner_url: Option<String>,
    pub csv: bool,
    pub output: PathBuf,
}

pub async fn cmd_generate(args: GenerateArgs) -> Result<(), CliError> {
    let settings = Settings::load();

    // Everything the user typed is checked before any file is read
    let roles = parse_role_pairs(&args.roles).map_err(|e| {
        CliError::usage(e.to_string()).with_hint("roles are written HEADER=ROLE, e.g. --role gdp=dependent")
    })?;
    let choices = build_choices(&args)?;

    let parser = TableParser::new(settings.preview_rows);
    let report = ingest_paths(parser, &args.files).await;
    warn_dropped(&report);
    if report.is_empty() {
        return Err(CliError::nothing_ingested(&report));
    }

    let mut wizard = Wizard::new(ScriptGenerator::new(settings.dataset_name.clone()));
    wizard.complete_upload(report.files).map_err(CliError::wizard)?;

    if let Some(sheet) = &args.sheet {
        select_sheet(&mut wizard, parser, sheet).await?;
    }

    // A single file is assembled locally and never needs the service
    let client = match AssemblyMode::for_files(wizard.files().len(), args.clean) {
        AssemblyMode::Local => None,
        AssemblyMode::Delegated => Some(cleaner_client(&settings, args.cleaner_url.as_deref())?),
    };
    let assembler = DatasetAssembler::new(client, parser).with_max_files(settings.max_files);
    wizard.assemble(&assembler, args.clean).await.map_err(CliError::wizard)?;

    if let Some(dataset) = wizard.dataset() {
        warn_unknown_headers(&roles, dataset.headers());
        eprintln!("dataset: {} rows x {} columns", dataset.row_count(), dataset.column_count());
    }
    let notes = wizard.complete_mapping(&roles).map_err(CliError::wizard)?;
    for note in &notes {
        eprintln!("note: {}", note);
    }

    wizard.complete_options(&choices).map_err(CliError::wizard)?;
    let artifact = wizard.generate().map_err(CliError::wizard)?.clone();

    fs::create_dir_all(&args.output)
        .map_err(|e| CliError::io(format!("cannot create {}: {}", args.output.display(), e)))?;

    let script_path = args.output.join(&settings.script_name);
    fs::write(&script_path, artifact.script_text())
        .map_err(|e| CliError::io(format!("cannot write {}: {}", script_path.display(), e)))?;

    let dataset_path = args.output.join(&settings.dataset_name);
    let exported = econfab_io::xlsx::export(artifact.cleaned_dataset(), &dataset_path)
        .map_err(|e| CliError::io(format!("cannot write {}: {}", dataset_path.display(), e)))?;

    println!("{}", script_path.display());
    println!("{}", dataset_path.display());

    if args.csv {
        let csv_path = dataset_path.with_extension("csv");
        econfab_io::csv::export(artifact.cleaned_dataset(), &csv_path)
            .map_err(|e| CliError::io(format!("cannot write {}: {}", csv_path.display(), e)))?;
        println!("{}", csv_path.display());
    }

    tracing::info!(
        rows = exported.rows_exported,
        cells = exported.cells_exported,
        ms = exported.export_duration_ms as u64,
        "dataset exported"
    );
    eprintln!("fingerprint: {}", artifact.fingerprint());
    Ok(())
}

/// Options file first, then individual flags on top of it.
fn build_choices(args: &GenerateArgs) -> Result<RegressionChoices, CliError> {
    let mut choices = match &args.options {
        Some(path) => read_choices(path)?,
        None => RegressionChoices::default(),
    };

    if let Some(kind) = &args.kind {
        choices.kind = kind.clone();
    }
    if args.robust {
        choices.robust_se = Some(true);
    }
    if let Some(var) = &args.cluster {
        choices.clustering = Some(true);
        choices.cluster_variable = Some(var.clone());
    }
    if args.time_trends {
        choices.time_trends = Some(true);
    }
    if args.interactions {
        choices.interactions = Some(true);
    }
    if !args.fixed_effects.is_empty() {
        choices.fixed_effects_variables = args.fixed_effects.clone();
    }
    if args.scatter {
        choices.scatter_plot = Some(true);
    }
    if args.bar {
        choices.bar_chart = Some(true);
    }
    Ok(choices)
}

fn read_choices(path: &Path) -> Result<RegressionChoices, CliError> {
    let text = fs::read_to_string(path).map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| {
        CliError::usage(format!("invalid options file {}: {}", path.display(), e))
            .with_hint(r#"expected e.g. {"type": "OLS", "robustSE": true}"#)
    })
}

fn cleaner_client(settings: &Settings, cleaner_url: Option<&str>) -> Result<CleanerClient, CliError> {
    let endpoint = cleaner_url.unwrap_or(&settings.cleaner_endpoint);
    let client = CleanerClient::new(endpoint, Duration::from_secs(settings.cleaner_timeout_secs)).map_err(|e| {
        CliError::config(e.to_string()).with_hint(format!("set cleaner.endpoint in {}", Settings::config_path_display()))
    })?;
    Ok(client.with_use_ai(settings.cleaner_use_ai))
}

/// Switch every uploaded file that has `sheet`. Fails if none has it.
async fn select_sheet(wizard: &mut Wizard, parser: TableParser, sheet: &str) -> Result<(), CliError> {
    let indices: Vec<usize> = wizard
        .files()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.raw.has_sheet(sheet))
        .map(|(i, _)| i)
        .collect();
    if indices.is_empty() {
        return Err(CliError::usage(format!("no input file has a sheet named '{}'", sheet))
            .with_hint("run `econfab inspect` to list the sheets of each file"));
    }
    for i in indices {
        wizard.select_sheet(parser, i, sheet).await.map_err(CliError::wizard)?;
    }
    Ok(())
}

/// Roles given for headers the dataset does not have are dropped by the
/// mapping step; say so instead of staying silent.
fn warn_unknown_headers(roles: &RoleAssignment, headers: &[String]) {
    for (header, role) in roles.iter() {
        if !headers.iter().any(|h| h == header) {
            eprintln!("warning: no column named '{}'; role '{}' ignored", header, role.as_str());
        }
    }
}
