use std::path::{Path, PathBuf};

use anyhow::Result;
use dialoguer::Input;

/// Ask for a folder, offering `default` when the answer is left empty
pub fn folder(prompt: &str, default: &Path) -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(answer.trim()))
}
