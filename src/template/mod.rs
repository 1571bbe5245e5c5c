// src/template/mod.rs

//! Track templates: the read-only JSON inputs a task graph is
//! instantiated from.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_template, template_path};
pub use model::TrackTemplate;
pub use validate::validate_template;
