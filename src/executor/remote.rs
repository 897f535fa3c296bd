use std::fmt;
use async_trait::async_trait;
use tracing::{debug, info};
use crate::dsl::ViewMeta;
use crate::error::{BqvError, Result};

/// A view that exists in the target project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteView {
    pub dataset: String,
    pub view: String,
}

impl RemoteView {
    pub fn new(dataset: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            view: view.into(),
        }
    }
}

impl fmt::Display for RemoteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.view)
    }
}

/// Remote operations on the views of a single project.
#[async_trait]
pub trait ViewClient: Send + Sync {
    fn project_id(&self) -> &str;

    async fn create_or_replace_view(
        &self,
        dataset: &str,
        view: &str,
        sql: &str,
        meta: &ViewMeta,
    ) -> Result<()>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_view_if_exists(&self, dataset: &str, view: &str) -> Result<bool>;

    async fn list_datasets(&self) -> Result<Vec<String>>;

    async fn list_views(&self, dataset: &str) -> Result<Vec<String>>;

    /// Deletes every view in every dataset of the project.
    ///
    /// Stops at the first failure. The returned [`BqvError::BulkDelete`] records
    /// whether any view was already gone by then.
    async fn delete_all_views(&self) -> Result<Vec<RemoteView>> {
        delete_views_one_by_one(self).await
    }
}

/// Enumerates datasets and their views through `client`, deleting as it goes.
pub async fn delete_views_one_by_one<C: ViewClient + ?Sized>(client: &C) -> Result<Vec<RemoteView>> {
    let mut deleted = Vec::new();

    let datasets = client.list_datasets().await
        .map_err(|e| bulk_failure(&deleted, e))?;

    for dataset in datasets {
        let views = client.list_views(&dataset).await
            .map_err(|e| bulk_failure(&deleted, e))?;
        debug!("Found {} views in {}", views.len(), dataset);

        for view in views {
            if client.delete_view_if_exists(&dataset, &view).await
                .map_err(|e| bulk_failure(&deleted, e))?
            {
                info!("Deleted view {}.{}", dataset, view);
                deleted.push(RemoteView::new(dataset.clone(), view));
            }
        }
    }

    Ok(deleted)
}

fn bulk_failure(deleted: &[RemoteView], error: BqvError) -> BqvError {
    BqvError::BulkDelete {
        deleted_any: !deleted.is_empty(),
        source: Box::new(error),
    }
}
