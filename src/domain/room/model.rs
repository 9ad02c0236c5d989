use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    /// userId -> language code of every participant
    #[serde(default)]
    pub participant_languages: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            participant_languages: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_participant(mut self, user_id: impl Into<String>, language: impl Into<String>) -> Self {
        self.participant_languages
            .insert(user_id.into(), language.into());
        self
    }

    /// Languages every participant other than `sender_id` listens in,
    /// de-duplicated in participant order
    pub fn target_languages(&self, sender_id: &str) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for (user_id, language) in &self.participant_languages {
            let language = language.trim();
            if user_id == sender_id || language.is_empty() {
                continue;
            }
            if !languages.iter().any(|l| l == language) {
                languages.push(language.to_string());
            }
        }
        languages
    }
}
