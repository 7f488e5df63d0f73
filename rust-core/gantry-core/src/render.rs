//! # HTML Templates
//!
//! Named templates rendered by [`Context::html`], backed by minijinja.
//!
//! [`Context::html`]: crate::context::Context::html

use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Template registry shared by every request
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new()
    }
}

impl Templates {
    /// Empty registry with the builtin filters and tests
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Load every `*.html` file below `dir`
    ///
    /// Templates are named by their path relative to `dir` with `/`
    /// separators, e.g. `admin/index.html`. Returns how many were loaded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be walked and
    /// `Error::Template` if a file does not parse.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let root = dir.as_ref();
        let mut loaded = 0;

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("html")
            {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let source = fs::read_to_string(path)?;
            debug!(template = %name, "Template loaded");
            self.env.add_template_owned(name, source)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Register a single template from source
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` if the source does not parse.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        self.env.add_template_owned(name.into(), source.into())?;
        Ok(())
    }

    /// Render template `name` with `data` as its context
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` if the template is unknown or rendering fails.
    pub fn render<S: Serialize>(&self, name: &str, data: S) -> Result<String> {
        Ok(self.env.get_template(name)?.render(data)?)
    }

    /// Underlying environment, for registering functions and filters
    pub fn env_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}
