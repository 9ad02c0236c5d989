use serde::{Deserialize, Serialize};

/// The slice of a user record the pipeline reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Reference recording for voice cloning, relative to the voice profile directory
    pub voice_profile_path: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            voice_profile_path: None,
        }
    }

    pub fn with_voice_profile(mut self, path: impl Into<String>) -> Self {
        self.voice_profile_path = Some(path.into());
        self
    }
}
