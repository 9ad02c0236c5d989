use crate::e2e::helpers;

use helpers::{echo_translation, write_voice_profile, TestContext};
use hyper::StatusCode;
use serde_json::json;
use test_context::test_context;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn decode_header(value: &str) -> String {
    urlencoding::decode(value).unwrap().into_owned()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_translate_and_synthesize_test_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/voice-synthesis/test",
            &json!({
                "text": "Good morning",
                "sourceLanguage": "en",
                "targetLanguage": "es"
            }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav")
        .assert_header(
            "content-disposition",
            "attachment; filename=\"synthesis_es.wav\"",
        );

    let translated = decode_header(response.header("x-translated-text").unwrap());
    assert_eq!(translated, echo_translation("es", "Good morning"));
    assert_eq!(&response.body_bytes[0..4], b"RIFF");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_default_to_english_into_arabic(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/voice-synthesis/test", &json!({ "text": "Hello" }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let translated = decode_header(response.header("x-translated-text").unwrap());
    assert_eq!(translated, echo_translation("ar", "Hello"));

    let requests = ctx.translate_server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("sl=en"));
    assert!(query.contains("tl=ar"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/voice-synthesis/test",
            &json!({ "text": "  ", "targetLanguage": "es" }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Text cannot be empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clone_the_requested_voice_profile(ctx: &TestContext) {
    write_voice_profile(ctx, "alice_es").await.unwrap();

    let response = ctx
        .client
        .post(
            "/api/voice-synthesis/test",
            &json!({
                "text": "Good morning",
                "targetLanguage": "es",
                "voiceProfileUserId": "alice"
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let synth = ctx
        .xtts_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/api/synthesize")
        .expect("synthesis server was not called");
    let body = String::from_utf8_lossy(&synth.body);
    assert!(body.contains("filename=\"speaker.wav\""));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_synthesize_without_cloning_for_unknown_profile(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/voice-synthesis/test",
            &json!({
                "text": "Good morning",
                "targetLanguage": "es",
                "voiceProfileUserId": "nobody"
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let synth = ctx
        .xtts_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/api/synthesize")
        .expect("synthesis server was not called");
    let body = String::from_utf8_lossy(&synth.body);
    assert!(!body.contains("speaker_wav"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_503_when_no_audio_is_produced(ctx: &TestContext) {
    ctx.xtts_server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not a wav"))
        .mount(&ctx.xtts_server)
        .await;

    let response = ctx
        .client
        .post(
            "/api/voice-synthesis/test",
            &json!({ "text": "Good morning", "targetLanguage": "es" }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::SERVICE_UNAVAILABLE)
        .assert_error_message("no audio");
}
