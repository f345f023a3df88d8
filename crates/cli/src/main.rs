// econfab CLI - data files in, Stata do-file and cleaned dataset out

mod config;
mod exit_codes;
mod generate;
mod health;
mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use econfab_pipeline::{IngestError, IngestReport, WizardError};

use exit_codes::{
    EXIT_ASSEMBLY, EXIT_CONFIG, EXIT_ERROR, EXIT_GENERATION, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "econfab")]
#[command(about = "Turn tabular data files into a regression do-file and a cleaned dataset")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview files: sheets, headers and the first rows
    #[command(after_help = "\
Examples:
  econfab inspect panel.csv
  econfab inspect survey.xlsx --sheet wave2 --rows 5
  econfab inspect gdp.csv rates.csv --json")]
    Inspect {
        /// Input files (CSV, TSV or spreadsheet workbooks)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Sheet to preview in workbooks that have it
        #[arg(long)]
        sheet: Option<String>,

        /// Preview rows per file
        #[arg(long)]
        rows: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the dataset, map roles, configure the model and write the do-file
    #[command(after_help = "\
Examples:
  econfab generate panel.csv --role gdp=dependent --role inflation=independent --robust
  econfab generate panel.csv --role id=id --role year=time --role gdp=dependent \\
      --role inflation=independent --type fe --fe id --cluster id -o out/
  econfab generate gdp.csv rates.csv --role gdp=dependent --role rate=independent \\
      --cleaner-url http://localhost:5000
  econfab generate panel.xlsx --sheet 2001 --role y=dependent --role x=independent \\
      --options choices.json --scatter --bar")]
    Generate {
        /// Input files (CSV, TSV or spreadsheet workbooks)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Column role as HEADER=ROLE (repeatable). Roles: dependent, independent,
        /// control, fixed_effect, time, id, instrument, weight, cluster, ignore
        #[arg(long = "role", short = 'r', value_name = "HEADER=ROLE")]
        roles: Vec<String>,

        /// Regression options as JSON (same keys as the options form: type, robustSE, ...)
        #[arg(long, value_name = "FILE.json")]
        options: Option<PathBuf>,

        /// Model: OLS, IV, FixedEffects (fe), Logit, Probit
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        kind: Option<String>,

        /// Robust standard errors
        #[arg(long)]
        robust: bool,

        /// Cluster standard errors on this id / fixed_effect column
        #[arg(long, value_name = "VAR")]
        cluster: Option<String>,

        /// Add a linear time trend on the time column
        #[arg(long)]
        time_trends: bool,

        /// Add pairwise interactions of the independent variables
        #[arg(long)]
        interactions: bool,

        /// Fixed-effect variable (repeatable; first one is the panel variable)
        #[arg(long = "fe", value_name = "VAR")]
        fixed_effects: Vec<String>,

        /// Emit scatter plots of the dependent against each independent variable
        #[arg(long)]
        scatter: bool,

        /// Emit a bar chart of variable means
        #[arg(long)]
        bar: bool,

        /// Sheet to use in workbooks that have it
        #[arg(long)]
        sheet: Option<String>,

        /// Send the files to the cleaning service even when there is only one
        #[arg(long)]
        clean: bool,

        /// Cleaning service URL (overrides settings)
        #[arg(long, env = "ECONFAB_CLEANER_URL", value_name = "URL")]
        cleaner_url: Option<String>,

        /// Also write the cleaned dataset as CSV
        #[arg(long)]
        csv: bool,

        /// Output directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
    },

    /// Check that the cleaning service is up
    #[command(after_help = "\
Examples:
  econfab health
  econfab health --cleaner-url http://cleaner.internal:5000")]
    Health {
        /// Cleaning service URL (overrides settings)
        #[arg(long, env = "ECONFAB_CLEANER_URL", value_name = "URL")]
        cleaner_url: Option<String>,
    },

    /// Print the settings file path and the effective settings as JSON
    #[command(after_help = "\
Examples:
  econfab config
  econfab config --init")]
    Config {
        /// Write the default settings if no settings file exists yet
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { files, sheet, rows, json } => inspect::cmd_inspect(files, sheet, rows, json).await,
        Commands::Generate {
            files,
            roles,
            options,
            kind,
            robust,
            cluster,
            time_trends,
            interactions,
            fixed_effects,
            scatter,
            bar,
            sheet,
            clean,
            cleaner_url,
            csv,
            output,
        } => {
            let args = generate::GenerateArgs {
                files,
                roles,
                options,
                kind,
                robust,
                cluster,
                time_trends,
                interactions,
                fixed_effects,
                scatter,
                bar,
                sheet,
                clean,
                cleaner_url,
                csv,
                output,
            };
            generate::cmd_generate(args).await
        }
        Commands::Health { cleaner_url } => health::cmd_health(cleaner_url).await,
        Commands::Config { init } => config::cmd_config(init),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default level.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "econfab=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(EXIT_PARSE, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Map a wizard failure to its exit code.
    pub fn wizard(err: WizardError) -> Self {
        let message = err.to_string();
        match err {
            WizardError::Parse(_) => Self::new(EXIT_PARSE, message),
            WizardError::Assembly(_) => Self::new(EXIT_ASSEMBLY, message)
                .with_hint("check the cleaning service with `econfab health`"),
            WizardError::Config(_) => Self::new(EXIT_CONFIG, message),
            WizardError::Generation(_) => {
                Self::new(EXIT_GENERATION, message).with_hint("map columns with --role HEADER=dependent and --role HEADER=independent")
            }
            WizardError::NoFiles => Self::new(EXIT_PARSE, message),
            _ => Self::new(EXIT_ERROR, message),
        }
    }

    /// Error for an ingestion where every file was dropped.
    pub fn nothing_ingested(report: &IngestReport) -> Self {
        let all_unreadable = !report.failures.is_empty()
            && report.failures.iter().all(|f| matches!(f.error, IngestError::Read(_)));
        let code = if all_unreadable { EXIT_IO } else { EXIT_PARSE };
        Self::new(code, "no input file could be read").with_hint("supported types: csv, tsv, txt, xlsx, xlsm, xlsb, xls, ods")
    }
}

/// Report files dropped during ingestion on stderr.
pub fn warn_dropped(report: &IngestReport) {
    for failure in &report.failures {
        eprintln!("warning: skipped {}: {}", failure.source_name, failure.error);
    }
}
