//! Template storage, resolution, and rendering.

pub mod error;
pub mod renderer;
pub mod service;

pub use error::TemplateError;
pub use service::TemplateService;
