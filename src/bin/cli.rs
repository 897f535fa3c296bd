use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tabled::{Table, Tabled, settings::Style};

use bqv::commands::{self, ApplyOptions, BigQueryConnector, DestroyOptions, DestroyOutcome, Exit, PlanOptions};
use bqv::error::{BqvError, BigQueryError};
use bqv::executor::ApplyReport;
use bqv::{ViewConfig, ViewLoader};

#[derive(Parser)]
#[command(name = "bqv")]
#[command(about = "Manage BigQuery views from a directory of SQL definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing <dataset>/<view>/query.sql definitions
    #[arg(short, long, default_value = ".", env = "BQV_DIR", global = true)]
    dir: PathBuf,

    /// YAML or JSON file with parameters for {{ placeholders }} in view SQL
    #[arg(long, env = "BQV_PARAMS", global = true)]
    params: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the views
    Apply {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Destroy deletes all the views you defined
    Destroy {
        #[command(flatten)]
        project: ProjectArgs,

        /// Delete every view in the project, including views not defined locally
        #[arg(long)]
        all: bool,
    },

    /// List the views defined locally
    List {
        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Render the SQL of every view without touching BigQuery
    Plan {
        /// Only show this view (dataset.view)
        #[arg(long)]
        view: Option<String>,
    },
}

#[derive(Args)]
struct ProjectArgs {
    /// GCP project ID
    #[arg(
        long = "projectID",
        visible_alias = "project",
        env = "GCP_PROJECT_ID",
        value_parser = NonEmptyStringValueParser::new(),
    )]
    project_id: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
    Json,
}

#[derive(Tabled)]
struct ViewTableRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "View")]
    view: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&ViewConfig> for ViewTableRow {
    fn from(config: &ViewConfig) -> Self {
        Self {
            dataset: config.dataset.clone(),
            view: config.view.clone(),
            source: config.source.display().to_string(),
            description: config.meta.description.clone().unwrap_or_default(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bqv=debug,info")
    } else {
        EnvFilter::new("bqv=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Apply { project } => {
            cmd_apply(ApplyOptions {
                dir: cli.dir,
                params: cli.params,
                project_id: project.project_id,
            }).await
        }

        Commands::Destroy { project, all } => {
            cmd_destroy(DestroyOptions {
                dir: cli.dir,
                project_id: project.project_id,
                all,
            }).await
        }

        Commands::List { output } => cmd_list(&cli.dir, output),

        Commands::Plan { view } => {
            cmd_plan(PlanOptions {
                dir: cli.dir,
                params: cli.params,
            }, view)
        }
    }
}

fn exit_code(exit: Exit) -> ExitCode {
    match exit {
        Exit::Success => ExitCode::SUCCESS,
        Exit::Failure | Exit::Abort => ExitCode::FAILURE,
    }
}

fn print_error(err: &BqvError) {
    error!("{}", err);

    if let Some(bq) = err.bigquery() {
        print_bq_error(bq);
    }
}

fn print_bq_error(err: &BigQueryError) {
    eprintln!("\n{} [{}]", "✗ BigQuery Error".red(), err.error_code());
    eprintln!("\n{}", "Suggestion:".yellow());
    for line in err.suggestion().lines() {
        eprintln!("  {}", line);
    }
    eprintln!();
}

async fn cmd_apply(opts: ApplyOptions) -> ExitCode {
    info!("Applying views from {} to project {}", opts.dir.display(), opts.project_id);

    let result = commands::apply(&opts, &BigQueryConnector).await;

    match &result {
        Ok(report) => print_apply_summary(report),
        Err(e) => print_error(e),
    }

    match commands::apply_exit(&result) {
        Exit::Abort => panic!("Failed to create bigquery client"),
        exit => exit_code(exit),
    }
}

fn print_apply_summary(report: &ApplyReport) {
    for failure in &report.failures {
        eprintln!("{} {}: {}", "✗".red(), failure.view, failure.error);
    }

    println!("\n{} applied, {} failed", report.applied.len(), report.failures.len());
}

async fn cmd_destroy(opts: DestroyOptions) -> ExitCode {
    if opts.all {
        warn!("Deleting every view in project {}", opts.project_id);
    } else {
        info!("Deleting views defined in {} from project {}", opts.dir.display(), opts.project_id);
    }

    let result = commands::destroy(&opts, &BigQueryConnector).await;

    match &result {
        Ok(DestroyOutcome::Selective(report)) => {
            println!(
                "\n{} deleted, {} already absent, {} failed",
                report.deleted.len(),
                report.absent.len(),
                report.error_count()
            );
            if !report.is_success() {
                error!("Some views might get deleted but {} errors occured", report.error_count());
            }
        }

        Ok(DestroyOutcome::All(deleted)) => {
            println!("\n{} Deleted {} views", "✓".green(), deleted.len());
        }

        Err(e @ BqvError::BulkDelete { deleted_any, .. }) => {
            error!("Error occured: {}", e);
            if *deleted_any {
                error!("Some views have already been deleted");
            }
            if let Some(bq) = e.bigquery() {
                print_bq_error(bq);
            }
        }

        Err(e) => print_error(e),
    }

    exit_code(commands::destroy_exit(&result))
}

fn cmd_list(dir: &Path, output: OutputFormat) -> ExitCode {
    let configs = match ViewLoader::new().load_dir(dir) {
        Ok(configs) => configs,
        Err(e) => {
            print_error(&e);
            return ExitCode::FAILURE;
        }
    };

    if configs.is_empty() {
        println!("No views found in {}", dir.display());
        return ExitCode::SUCCESS;
    }

    let rendered = match output {
        OutputFormat::Yaml => serde_yaml::to_string(&configs).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(&configs).map_err(|e| e.to_string()),
        OutputFormat::Table => {
            let rows: Vec<ViewTableRow> = configs.iter().map(ViewTableRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            Ok(table.to_string())
        }
    };

    match rendered {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to render view list: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_plan(opts: PlanOptions, only: Option<String>) -> ExitCode {
    let mut result = commands::plan(&opts);

    if let (Ok(planned), Some(name)) = (&mut result, &only) {
        planned.retain(|p| &p.config.qualified_name() == name);
        if planned.is_empty() {
            error!("View '{}' not found in {}", name, opts.dir.display());
            return ExitCode::FAILURE;
        }
    }

    match &result {
        Ok(planned) => {
            for item in planned {
                println!("{} {}", "View:".bold(), item.config.qualified_name());
                println!("Source: {}", item.config.source.display());
                if let Some(desc) = &item.config.meta.description {
                    println!("Description: {}", desc);
                }
                match &item.rendered {
                    Ok(sql) => println!("\n--- SQL ---\n{}\n-----------\n", sql.trim_end()),
                    Err(e) => eprintln!("{} {}\n", "✗".red(), e),
                }
            }
        }
        Err(e) => print_error(e),
    }

    exit_code(commands::plan_exit(&result))
}
