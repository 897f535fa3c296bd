mod client;
mod reconciler;
mod remote;

pub use client::{BqClient, build_view_ddl};
pub use reconciler::{Reconciler, ApplyReport, DestroyReport, ViewFailure};
pub use remote::{ViewClient, RemoteView, delete_views_one_by_one};
