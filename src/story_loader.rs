//! Story loading.
//!
//! A story is either a persisted story record (`.json`) or a raw HTML body
//! (`.html`/`.htm`), which becomes a bare record titled after the file. Either
//! way the HTML is untrusted and only ever reaches the reader through the
//! sanitizer.

use anyhow::{Context, Result, bail};
use narration_core::models::Story;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn load_story(path: &Path) -> Result<Story> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let story = if is_json(path) {
        Story::from_json(&contents)
            .with_context(|| format!("Invalid story record at {}", path.display()))?
    } else if is_html(path) {
        Story {
            id: path.display().to_string(),
            title: title_from_path(path),
            description: None,
            story_html: contents,
            level_id: None,
            level: None,
            images: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    } else {
        bail!(
            "Unsupported story format for {} (expected .html or .json)",
            path.display()
        );
    };

    info!(
        path = %path.display(),
        id = %story.id,
        title = %story.title,
        bytes = story.story_html.len(),
        "Loaded story"
    );
    Ok(story)
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("story")
        .to_string()
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "html" || ext == "htm"
    )
}

fn is_json(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "json"
    )
}
