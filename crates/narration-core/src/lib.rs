//! Story narration core: sanitize story HTML, index its words, narrate it
//! through a speech engine and render the word being spoken.

pub mod config;
pub mod engine;
pub mod highlight;
pub mod markup;
pub mod models;
pub mod narration;
pub mod sanitizer;
pub mod segmenter;
pub mod session;
pub mod text_utils;
pub mod voices;
pub mod word_index;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<()> {
    T::export_all_to(out_dir)
        .with_context(|| format!("Failed to export {} to {}", T::name(), out_dir.display()))
}

/// Write TypeScript definitions of every observable type into `out_dir`,
/// replacing any previously generated `.ts` files.
pub fn export_ts_bindings(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for entry in
        fs::read_dir(out_dir).with_context(|| format!("Failed to list {}", out_dir.display()))?
    {
        let path = entry.context("Failed to read entry")?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }

    export_single_type::<session::ReaderSnapshot>(out_dir)?;
    export_single_type::<session::NarrationView>(out_dir)?;
    export_single_type::<narration::NarrationState>(out_dir)?;
    export_single_type::<engine::VoiceHandle>(out_dir)?;
    export_single_type::<config::AfterWordPolicy>(out_dir)?;
    export_single_type::<models::Story>(out_dir)?;
    export_single_type::<models::StoryLevel>(out_dir)?;
    export_single_type::<models::Profile>(out_dir)?;
    export_single_type::<models::UserRole>(out_dir)?;

    let index_content = r#"export type { ReaderSnapshot } from "./ReaderSnapshot";
export type { NarrationView } from "./NarrationView";
export type { NarrationState } from "./NarrationState";
export type { VoiceHandle } from "./VoiceHandle";
export type { AfterWordPolicy } from "./AfterWordPolicy";
export type { Story } from "./Story";
export type { StoryLevel } from "./StoryLevel";
export type { Profile } from "./Profile";
export type { UserRole } from "./UserRole";
"#;

    let index_path = out_dir.join("index.ts");
    fs::write(&index_path, index_content)
        .with_context(|| format!("Failed to write {}", index_path.display()))?;

    Ok(())
}
