#![forbid(unsafe_code)]

use inquire::Confirm;
use std::path::Path;

use crate::archive::{Error, Result};

/// Asks whether an existing destination may be replaced.
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool>;
}

/// Terminal prompt; a single key answers. Defaults to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct Interactive;

impl OverwritePrompt for Interactive {
    fn confirm_overwrite(&mut self, path: &Path) -> Result<bool> {
        let msg = format!("{} already exists. Overwrite?", path.display());
        Confirm::new(&msg)
            .with_default(false)
            .prompt()
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

/// Fixed answer for non-interactive runs (`--yes`, scripts, tests).
#[derive(Debug, Clone, Copy)]
pub struct Assume(pub bool);

impl OverwritePrompt for Assume {
    fn confirm_overwrite(&mut self, _path: &Path) -> Result<bool> {
        Ok(self.0)
    }
}
