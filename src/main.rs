use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowcanvas_client::HttpBackend;
use flowcanvas_config::{TestExecution, WorkflowDocument};
use flowcanvas_editor::{AppConfig, WorkflowSession};
use flowcanvas_workflow::{Severity, map_overlay, validate};

/// Flowcanvas - validate, test and manage workflow graphs
#[derive(Parser)]
#[command(name = "flowcanvas")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flowcanvas)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Base URL of the workflow API
  #[arg(long, global = true, env = "FLOWCANVAS_API_URL")]
  api_url: Option<String>,

  /// Bearer token for the workflow API
  #[arg(long, global = true, env = "FLOWCANVAS_TOKEN", hide_env_values = true)]
  token: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a workflow file for errors and warnings
  Validate {
    /// Path to the workflow document (JSON)
    workflow_file: PathBuf,
  },

  /// Print the per-node and per-edge status of a test execution
  Overlay {
    /// Path to the workflow document (JSON)
    workflow_file: PathBuf,

    /// Path to the test execution result (JSON)
    #[arg(long)]
    results: PathBuf,

    /// Treat the test as still running
    #[arg(long)]
    running: bool,
  },

  /// Download a workflow's export into a directory
  Export {
    #[arg(long)]
    workflow: String,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
  },

  /// Replace a workflow's graph with an exported document
  Import {
    #[arg(long)]
    workflow: String,

    /// Path to the exported document
    file: PathBuf,
  },

  /// List saved versions of a workflow
  Versions {
    #[arg(long)]
    workflow: String,
  },

  /// Make a saved version the current graph
  Restore {
    #[arg(long)]
    workflow: String,

    #[arg(long)]
    version: u32,
  },

  /// Run a test execution
  Test {
    #[arg(long)]
    workflow: String,

    /// Sample record to run the test against
    #[arg(long)]
    record: Option<String>,
  },

  /// Publish a workflow
  Publish {
    #[arg(long)]
    workflow: String,
  },

  /// Unpublish a workflow
  Unpublish {
    #[arg(long)]
    workflow: String,
  },
}

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flowcanvas"),
  };

  let command = match cli.command {
    Some(command) => command,
    None => {
      println!("flowcanvas - use --help to see available commands");
      return Ok(ExitCode::SUCCESS);
    }
  };

  match command {
    Commands::Validate { workflow_file } => validate_file(&workflow_file),
    Commands::Overlay {
      workflow_file,
      results,
      running,
    } => {
      overlay_file(&workflow_file, &results, running)?;
      Ok(ExitCode::SUCCESS)
    }
    remote => {
      let mut config = load_config(&data_dir)?;
      if let Some(api_url) = cli.api_url {
        config.client.base_url = api_url;
      }
      if cli.token.is_some() {
        config.client.token = cli.token;
      }

      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_remote(remote, config).await })?;
      Ok(ExitCode::SUCCESS)
    }
  }
}

fn load_config(data_dir: &Path) -> Result<AppConfig> {
  let path = data_dir.join("config.json");
  let config = AppConfig::load(&path)?;
  info!(path = %path.display(), base_url = %config.client.base_url, "configuration loaded");
  Ok(config)
}

fn read_document(path: &Path) -> Result<WorkflowDocument> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

fn validate_file(path: &Path) -> Result<ExitCode> {
  let document = read_document(path)?;
  let report = validate(&document.nodes, &document.edges);

  for issue in report.errors.iter().chain(report.warnings.iter()) {
    let severity = match issue.severity {
      Severity::Error => "error",
      Severity::Warning => "warning",
    };
    let label = document
      .get_node(&issue.node_id)
      .map(|n| n.display_label())
      .unwrap_or_default();
    println!("{:<8} {} ({}): {}", severity, issue.node_id, label, issue.message);
  }

  eprintln!(
    "{} error(s), {} warning(s) in {} nodes",
    report.errors.len(),
    report.warnings.len(),
    document.nodes.len()
  );

  if report.has_errors() {
    Ok(ExitCode::FAILURE)
  } else {
    Ok(ExitCode::SUCCESS)
  }
}

fn overlay_file(workflow_file: &Path, results_file: &Path, running: bool) -> Result<()> {
  let document = read_document(workflow_file)?;
  let content = std::fs::read_to_string(results_file)
    .with_context(|| format!("failed to read results file: {}", results_file.display()))?;
  let execution: TestExecution = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse results file: {}", results_file.display()))?;

  let overlay = map_overlay(&document.nodes, &document.edges, Some(&execution), running);
  println!("{}", serde_json::to_string_pretty(&overlay)?);
  Ok(())
}

async fn run_remote(command: Commands, config: AppConfig) -> Result<()> {
  let backend = HttpBackend::new(&config.client).context("failed to create API client")?;
  let session = |workflow: String| WorkflowSession::new(workflow, Arc::new(backend), config.editor);

  match command {
    Commands::Export { workflow, out_dir } => {
      let session = session(workflow);
      let path = session
        .export(&out_dir)
        .await
        .context("failed to export workflow")?;
      println!("{}", path.display());
    }
    Commands::Import { workflow, file } => {
      let json = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
      let mut session = session(workflow);
      session
        .import(&json)
        .await
        .context("failed to import workflow")?;
      eprintln!(
        "Imported {} nodes, now at version {}",
        session.canvas().nodes().len(),
        session.version()
      );
    }
    Commands::Versions { workflow } => {
      let versions = session(workflow)
        .versions()
        .await
        .context("failed to list versions")?;
      println!("{}", serde_json::to_string_pretty(&versions)?);
    }
    Commands::Restore { workflow, version } => {
      let mut session = session(workflow);
      session
        .restore(version)
        .await
        .context("failed to restore version")?;
      eprintln!("Restored version {}, now at version {}", version, session.version());
    }
    Commands::Test { workflow, record } => {
      let mut session = session(workflow);
      session.load().await.context("failed to load workflow")?;
      let execution = session
        .test(record.as_deref())
        .await
        .context("test execution failed")?
        .clone();
      let overlay = session.canvas().overlay(Some(&execution), false);
      println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
          "execution": execution,
          "overlay": overlay,
        }))?
      );
    }
    Commands::Publish { workflow } => {
      let mut session = session(workflow);
      session.load().await.context("failed to load workflow")?;
      session.publish().await.context("failed to publish workflow")?;
      eprintln!("Published {}", session.workflow_id());
    }
    Commands::Unpublish { workflow } => {
      let mut session = session(workflow);
      session
        .unpublish()
        .await
        .context("failed to unpublish workflow")?;
      eprintln!("Unpublished {}", session.workflow_id());
    }
    Commands::Validate { .. } | Commands::Overlay { .. } => {}
  }

  Ok(())
}
