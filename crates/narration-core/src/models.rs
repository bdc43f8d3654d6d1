//! Persisted story records as the library's backend stores them.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const MIN_LEVEL_NUMBER: u32 = 1;
pub const MAX_LEVEL_NUMBER: u32 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserRole {
    Admin,
    #[default]
    Children,
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "children" => Ok(UserRole::Children),
            other => bail!("Unknown user role '{other}'"),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UserRole::Admin => "admin",
            UserRole::Children => "children",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct StoryLevel {
    pub id: i64,
    pub level_number: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl StoryLevel {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LEVEL_NUMBER..=MAX_LEVEL_NUMBER).contains(&self.level_number) {
            bail!(
                "Level number {} must be between {MIN_LEVEL_NUMBER} and {MAX_LEVEL_NUMBER}",
                self.level_number
            );
        }
        Ok(())
    }
}

impl std::fmt::Display for StoryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "Level {}", self.level_number)
        } else {
            write!(f, "Level {} - {}", self.level_number, self.description)
        }
    }
}

/// A story and its untrusted HTML body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export)]
pub struct Story {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub story_html: String,
    #[serde(default)]
    pub level_id: Option<i64>,
    #[serde(default)]
    pub level: Option<StoryLevel>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Story {
    pub fn from_json(contents: &str) -> Result<Self> {
        let story: Story =
            serde_json::from_str(contents).context("Failed to parse story record")?;
        story.validate()?;
        Ok(story)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("Story {} has an empty title", self.id);
        }
        if let Some(level) = &self.level {
            level
                .validate()
                .with_context(|| format!("Story '{}' has an invalid level", self.title))?;
        }
        Ok(())
    }
}
