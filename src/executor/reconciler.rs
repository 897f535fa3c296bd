use tracing::{error, info};
use crate::dsl::{Params, TemplateRenderer, ViewConfig};
use crate::error::Result;
use super::remote::{RemoteView, ViewClient};

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<RemoteView>,
    pub failures: Vec<ViewFailure>,
}

#[derive(Debug, Default)]
pub struct DestroyReport {
    pub deleted: Vec<RemoteView>,
    /// Views that were already absent remotely.
    pub absent: Vec<RemoteView>,
    pub failures: Vec<ViewFailure>,
}

#[derive(Debug)]
pub struct ViewFailure {
    pub view: RemoteView,
    pub error: String,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl DestroyReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives local view definitions against a [`ViewClient`], one view at a time.
pub struct Reconciler<C> {
    client: C,
    renderer: TemplateRenderer,
}

impl<C: ViewClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Creates or replaces every configured view. Failures are recorded and skipped.
    pub async fn apply(&self, configs: &[ViewConfig], params: &Params) -> ApplyReport {
        let mut report = ApplyReport::default();

        for config in configs {
            let target = RemoteView::new(&config.dataset, &config.view);
            match self.apply_view(config, params).await {
                Ok(()) => {
                    info!("Applied view {}", target);
                    report.applied.push(target);
                }
                Err(e) => {
                    error!("Failed to create view {}: {}", target, e);
                    report.failures.push(ViewFailure {
                        view: target,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    async fn apply_view(&self, config: &ViewConfig, params: &Params) -> Result<()> {
        let sql = self.renderer.render(config, params)?;
        self.client
            .create_or_replace_view(&config.dataset, &config.view, &sql, &config.meta)
            .await
    }

    /// Deletes the configured views. Views that do not exist are skipped.
    pub async fn destroy(&self, configs: &[ViewConfig]) -> DestroyReport {
        let mut report = DestroyReport::default();

        for config in configs {
            let target = RemoteView::new(&config.dataset, &config.view);
            match self.client.delete_view_if_exists(&config.dataset, &config.view).await {
                Ok(true) => {
                    info!("Deleted view {}", target);
                    report.deleted.push(target);
                }
                Ok(false) => {
                    info!("View {} does not exist, skipping", target);
                    report.absent.push(target);
                }
                Err(e) => {
                    error!("Failed to delete a view {}: {}", target, e);
                    report.failures.push(ViewFailure {
                        view: target,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Deletes every view in the project, ignoring local definitions.
    pub async fn destroy_all(&self) -> Result<Vec<RemoteView>> {
        info!("Deleting all views in project {}", self.client.project_id());
        self.client.delete_all_views().await
    }
}
