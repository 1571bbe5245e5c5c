// src/template/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{OrchdagError, Result};
use crate::template::model::TrackTemplate;
use crate::template::validate::validate_template;
use crate::types::Track;

/// Path of the template file for a track within a template directory.
pub fn template_path(template_dir: &Path, track: Track) -> PathBuf {
    template_dir.join(format!("{track}_track.json"))
}

/// Load and validate the template for a track.
///
/// Fails with `TemplateNotFound` when the file is missing; parse and
/// structural problems surface as `JsonError` / `ConfigError` / `DagCycle`.
pub fn load_template(template_dir: &Path, track: Track) -> Result<TrackTemplate> {
    let path = template_path(template_dir, track);

    if !path.is_file() {
        return Err(OrchdagError::TemplateNotFound(path.display().to_string()));
    }

    let contents = fs::read_to_string(&path)?;
    let template: TrackTemplate = serde_json::from_str(&contents)?;

    validate_template(&template)?;

    Ok(template)
}
