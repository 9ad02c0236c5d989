use crate::infrastructure::repositories::UserRepository;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Directory, relative to the profile root, where uploads land by convention
const REFERENCE_DIR: &str = "audio_references";

/// Resolves a user to the reference recording used for voice cloning.
/// Never fails: every problem degrades to "no profile".
pub struct VoiceProfileResolver {
    user_repo: Arc<dyn UserRepository>,
    root: PathBuf,
}

impl VoiceProfileResolver {
    pub fn new(user_repo: Arc<dyn UserRepository>, root: PathBuf) -> Self {
        Self { user_repo, root }
    }

    /// Stored profile path first, then `{uid}_{lang}.wav` and `{uid}.wav`
    /// under the reference directory. Only files that exist are returned.
    pub async fn resolve(&self, user_id: &str, language: Option<&str>) -> Option<PathBuf> {
        if !is_safe_segment(user_id) {
            tracing::warn!(user_id = user_id, "Refusing to resolve voice profile for unsafe user id");
            return None;
        }

        for candidate in self.candidates(user_id, language).await {
            if is_file(&candidate).await {
                tracing::debug!(
                    user_id = user_id,
                    path = %candidate.display(),
                    "Voice profile resolved"
                );
                return Some(candidate);
            }
        }

        tracing::debug!(user_id = user_id, "No voice profile found");
        None
    }

    async fn candidates(&self, user_id: &str, language: Option<&str>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => {
                if let Some(stored) = user.voice_profile_path.as_deref() {
                    match self.stored_path(stored) {
                        Some(path) => candidates.push(path),
                        None => tracing::warn!(
                            user_id = user_id,
                            stored_path = stored,
                            "Ignoring voice profile path outside the profile directory"
                        ),
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = user_id,
                    error = %e,
                    "Voice profile lookup failed, trying conventional locations"
                );
            }
        }

        let reference_dir = self.root.join(REFERENCE_DIR);
        if let Some(language) = language.filter(|l| is_safe_segment(l)) {
            candidates.push(reference_dir.join(format!("{}_{}.wav", user_id, language)));
        }
        candidates.push(reference_dir.join(format!("{}.wav", user_id)));

        candidates
    }

    /// Stored paths look like `/audio_references/u1.wav` and live under the root
    fn stored_path(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored.trim_start_matches('/'));
        let confined = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        (confined && !stored.trim().is_empty()).then(|| self.root.join(relative))
    }
}

fn is_safe_segment(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
