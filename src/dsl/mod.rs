mod parser;
mod params;
mod resolver;
mod loader;

pub use parser::{ViewConfig, ViewMeta, QUERY_FILE, META_FILE};
pub use params::Params;
pub use resolver::TemplateRenderer;
pub use loader::ViewLoader;
