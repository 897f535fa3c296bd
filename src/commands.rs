//! Command handlers shared by the `bqv` binary.
//!
//! Each handler receives its options explicitly and a [`Connector`] that builds
//! the remote client once local inputs have been read.

use std::path::PathBuf;
use async_trait::async_trait;
use tracing::{error, info};
use crate::dsl::{Params, TemplateRenderer, ViewConfig, ViewLoader};
use crate::error::{BqvError, Result};
use crate::executor::{ApplyReport, BqClient, DestroyReport, Reconciler, RemoteView, ViewClient};

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub dir: PathBuf,
    pub params: Option<PathBuf>,
    pub project_id: String,
}

#[derive(Debug, Clone)]
pub struct DestroyOptions {
    pub dir: PathBuf,
    pub project_id: String,
    pub all: bool,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub dir: PathBuf,
    pub params: Option<PathBuf>,
}

/// Builds the remote client for a project.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: ViewClient;

    async fn connect(&self, project_id: &str) -> Result<Self::Client>;
}

/// Connects to BigQuery with application default credentials.
pub struct BigQueryConnector;

#[async_trait]
impl Connector for BigQueryConnector {
    type Client = BqClient;

    async fn connect(&self, project_id: &str) -> Result<BqClient> {
        BqClient::new(project_id).await
    }
}

#[derive(Debug)]
pub enum DestroyOutcome {
    Selective(DestroyReport),
    All(Vec<RemoteView>),
}

#[derive(Debug)]
pub struct PlannedView {
    pub config: ViewConfig,
    pub rendered: Result<String>,
}

/// How the process should end after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failure,
    /// Unrecoverable: the process panics instead of exiting.
    Abort,
}

/// Unreadable views are logged and apply carries on with none of them.
pub async fn apply<K: Connector>(opts: &ApplyOptions, connector: &K) -> Result<ApplyReport> {
    let configs = ViewLoader::new().load_dir(&opts.dir).unwrap_or_else(|e| {
        error!("{}", e);
        Vec::new()
    });
    let params = Params::load_optional(opts.params.as_deref())?;
    info!("Loaded {} views and {} params", configs.len(), params.len());

    let client = connector.connect(&opts.project_id).await
        .map_err(|e| BqvError::Client(Box::new(e)))?;

    Ok(Reconciler::new(client).apply(&configs, &params).await)
}

pub async fn destroy<K: Connector>(opts: &DestroyOptions, connector: &K) -> Result<DestroyOutcome> {
    let configs = ViewLoader::new().load_dir(&opts.dir)?;

    let client = connector.connect(&opts.project_id).await
        .map_err(|e| BqvError::Client(Box::new(e)))?;
    let reconciler = Reconciler::new(client);

    if opts.all {
        if !configs.is_empty() {
            info!("--all ignores the {} local view definitions", configs.len());
        }
        return reconciler.destroy_all().await.map(DestroyOutcome::All);
    }

    Ok(DestroyOutcome::Selective(reconciler.destroy(&configs).await))
}

/// Renders every view locally without touching BigQuery.
pub fn plan(opts: &PlanOptions) -> Result<Vec<PlannedView>> {
    let configs = ViewLoader::new().load_dir(&opts.dir)?;
    let params = Params::load_optional(opts.params.as_deref())?;
    let renderer = TemplateRenderer::new();

    Ok(configs
        .into_iter()
        .map(|config| {
            let rendered = renderer.render(&config, &params);
            PlannedView { config, rendered }
        })
        .collect())
}

/// Apply only ever fails by aborting, when the client cannot be built. Per-view
/// failures and an unloadable params file are reported and exit cleanly.
pub fn apply_exit(result: &Result<ApplyReport>) -> Exit {
    match result {
        Ok(_) | Err(BqvError::ParamLoad(_)) => Exit::Success,
        Err(BqvError::Client(_)) => Exit::Abort,
        Err(_) => Exit::Failure,
    }
}

pub fn destroy_exit(result: &Result<DestroyOutcome>) -> Exit {
    match result {
        Ok(DestroyOutcome::Selective(report)) if !report.is_success() => Exit::Failure,
        Ok(_) => Exit::Success,
        Err(_) => Exit::Failure,
    }
}

pub fn plan_exit(result: &Result<Vec<PlannedView>>) -> Exit {
    match result {
        Ok(planned) if planned.iter().all(|p| p.rendered.is_ok()) => Exit::Success,
        _ => Exit::Failure,
    }
}
