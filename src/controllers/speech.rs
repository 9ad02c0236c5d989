use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    domain::speech::SpeechServiceApi,
    domain::voice_profile::VoiceProfileResolver,
    error::{AppError, AppResult},
};

pub const X_TRANSLATED_TEXT: &str = "x-translated-text";

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ar".to_string()
}

/// Request for POST /api/voice-synthesis/test
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSynthesisTestRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    pub voice_profile_user_id: Option<String>,
    /// Language of the profile recording when it differs from the target
    pub voice_profile_language: Option<String>,
}

pub struct SpeechController {
    speech: Arc<dyn SpeechServiceApi>,
    voice_profiles: Arc<VoiceProfileResolver>,
}

impl SpeechController {
    pub fn new(speech: Arc<dyn SpeechServiceApi>, voice_profiles: Arc<VoiceProfileResolver>) -> Self {
        Self {
            speech,
            voice_profiles,
        }
    }

    /// POST /api/voice-synthesis/test - Translate and synthesize one piece of text
    pub async fn test_synthesis(
        State(controller): State<Arc<SpeechController>>,
        Json(request): Json<VoiceSynthesisTestRequest>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        if request.text.trim().is_empty() {
            return Err(AppError::BadRequest("Text cannot be empty".to_string()));
        }

        let reference = match request.voice_profile_user_id.as_deref() {
            Some(user_id) => {
                let language = request
                    .voice_profile_language
                    .as_deref()
                    .unwrap_or(&request.target_language);
                controller.voice_profiles.resolve(user_id, Some(language)).await
            }
            None => None,
        };

        tracing::info!(
            source_language = %request.source_language,
            target_language = %request.target_language,
            text_length = request.text.chars().count(),
            has_reference = reference.is_some(),
            "Voice synthesis test requested"
        );

        let result = controller
            .speech
            .translate_and_synthesize(
                &request.text,
                &request.source_language,
                &request.target_language,
                reference.as_deref(),
            )
            .await;

        if result.audio_buffer.is_empty() {
            return Err(AppError::ServiceUnavailable(
                "Voice synthesis produced no audio".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
        headers.insert(
            header::CONTENT_DISPOSITION,
            header_value(&format!(
                "attachment; filename=\"synthesis_{}.wav\"",
                urlencoding::encode(&request.target_language)
            ))?,
        );
        headers.insert(
            X_TRANSLATED_TEXT,
            header_value(&urlencoding::encode(&result.translated_text))?,
        );

        Ok((StatusCode::OK, headers, Body::from(result.audio_buffer)))
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AppError::Internal(format!("invalid header value: {}", e)))
}
