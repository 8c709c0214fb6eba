//! Initial task set loader.
//!
//! Reads a JSON array of `{ "name", "period", "execution_time", "deadline"? }`
//! objects and validates every entry before the tick loop starts.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::{LoadError, ValidationError};
use crate::task::{TaskDefinition, TaskSpec};

/// Parse and validate a task list from a JSON string.
pub fn parse_tasks(json: &str) -> Result<Vec<TaskDefinition>, LoadError> {
    let specs: Vec<TaskSpec> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        let name = spec
            .name
            .as_deref()
            .ok_or(LoadError::MissingName { index })?;

        let definition = TaskDefinition::from_spec(name, spec).map_err(|source| {
            LoadError::Invalid {
                index,
                name: name.to_string(),
                source,
            }
        })?;

        if !seen.insert(definition.name.clone()) {
            return Err(LoadError::Invalid {
                index,
                name: name.to_string(),
                source: ValidationError::DuplicateName(name.to_string()),
            });
        }
        tasks.push(definition);
    }

    Ok(tasks)
}

/// Load and validate a task list from a JSON file.
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<TaskDefinition>, LoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tasks = parse_tasks(&content)?;
    debug!(path = %path.display(), count = tasks.len(), "loaded initial tasks");
    Ok(tasks)
}
