pub mod error;
pub mod dsl;
pub mod executor;
pub mod commands;

pub use error::{BqvError, BigQueryError, Result};
pub use dsl::{ViewConfig, ViewMeta, ViewLoader, Params, TemplateRenderer};
pub use executor::{BqClient, ViewClient, RemoteView, Reconciler, ApplyReport, DestroyReport, ViewFailure};
pub use commands::{ApplyOptions, DestroyOptions, PlanOptions, Connector, BigQueryConnector, DestroyOutcome, PlannedView, Exit};
