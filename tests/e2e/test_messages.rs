use crate::e2e::helpers;

use helpers::{echo_translation, write_voice_profile, TestContext};
use hyper::StatusCode;
use noota_backend::domain::message::{Message, ProcessingStatus};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_context::test_context;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const TWO_SENTENCES: &str = "Hello there. How are you today?";

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .expect("expected an array")
        .iter()
        .map(|v| v.as_str().expect("expected a string").to_string())
        .collect()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_translate_and_voice_a_new_message_for_every_listener(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar"), ("carol", "es")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", TWO_SENTENCES).with_language("en"))
        .await
        .unwrap();

    ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    let response = ctx
        .client
        .get("/api/messages/status/room-1/msg-1")
        .await
        .unwrap();
    response.assert_status(StatusCode::OK);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["processingStatus"], "completed");
    assert_eq!(body["totalChunks"], 2);
    assert_eq!(body["processedChunks"], 2);
    assert!(body["processingError"].is_null());

    // The sender's own language is never produced
    let languages: Vec<&String> = body["translations"].as_object().unwrap().keys().collect();
    assert_eq!(languages, vec!["ar", "es"]);

    assert_eq!(
        strings(&body["translations"]["ar"]),
        vec![
            echo_translation("ar", "Hello there."),
            echo_translation("ar", "How are you today?"),
        ]
    );
    assert_eq!(
        strings(&body["translations"]["es"]),
        vec![
            echo_translation("es", "Hello there."),
            echo_translation("es", "How are you today?"),
        ]
    );

    let ar_urls = strings(&body["audioUrls"]["ar"]);
    assert_eq!(
        ar_urls,
        vec![
            format!("{}/audio/chunks/ar_msg-1_chunk0.wav", ctx.base_url),
            format!("{}/audio/chunks/ar_msg-1_chunk1.wav", ctx.base_url),
        ]
    );
    assert_eq!(strings(&body["audioUrls"]["es"]).len(), 2);

    // Published chunk audio is served back as WAV
    let audio = ctx.client.get_url(&ar_urls[0]).await.unwrap();
    audio.assert_status(StatusCode::OK);
    assert_eq!(&audio.body_bytes[0..4], b"RIFF");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_process_a_message_only_once(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", TWO_SENTENCES).with_language("en"))
        .await
        .unwrap();

    let message = ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();
    ctx.dispatcher.drain().await;

    assert_eq!(message.processing_status, Some(ProcessingStatus::Completed));
    assert_eq!(message.processing_run, 1);

    // One translation call per chunk and language
    let requests = ctx.translate_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_text_for_listeners_sharing_the_senders_language(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("dave", "en-US")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", TWO_SENTENCES).with_language("en"))
        .await
        .unwrap();

    let message = ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    assert_eq!(
        message.translations["en-US"],
        vec!["Hello there.".to_string(), "How are you today?".to_string()]
    );
    assert!(ctx
        .translate_server
        .received_requests()
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fall_back_to_the_default_target_in_a_solo_room(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "es")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", "Hola a todos.").with_language("es"))
        .await
        .unwrap();

    let message = ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    assert_eq!(message.processing_status, Some(ProcessingStatus::Completed));
    assert_eq!(
        message.translations["en"],
        vec![echo_translation("en", "Hola a todos.")]
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_complete_with_text_only_when_synthesis_fails(ctx: &TestContext) {
    ctx.xtts_server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/synthesize"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&ctx.xtts_server)
        .await;

    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", TWO_SENTENCES).with_language("en"))
        .await
        .unwrap();

    ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    let response = ctx
        .client
        .get("/api/messages/status/room-1/msg-1")
        .await
        .unwrap();
    let body = response.body.as_ref().unwrap();

    assert_eq!(body["processingStatus"], "completed");
    assert_eq!(body["translations"]["ar"].as_array().unwrap().len(), 2);
    assert_eq!(body["audioUrls"]["ar"], json!([null, null]));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clone_the_senders_voice_profile(ctx: &TestContext) {
    write_voice_profile(ctx, "alice").await.unwrap();
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", "Hello there.").with_language("en"))
        .await
        .unwrap();

    ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    let synth_requests: Vec<_> = ctx
        .xtts_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/synthesize")
        .collect();
    assert_eq!(synth_requests.len(), 1);

    let body = String::from_utf8_lossy(&synth_requests[0].body);
    assert!(body.contains("name=\"speaker_wav\""));
    assert!(body.contains("filename=\"speaker.wav\""));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_a_message_with_blank_text(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_message(Message::new("msg-1", "room-1", "alice", "   ").with_language("en"))
        .await
        .unwrap();

    ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();

    let response = ctx
        .client
        .get("/api/messages/status/room-1/msg-1")
        .await
        .unwrap();
    let body = response.body.as_ref().unwrap();

    assert_eq!(body["processingStatus"], "failed");
    assert_eq!(body["processingError"], "Text cannot be empty");
    assert!(body["processingEndedAt"].is_string());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_leave_already_processed_messages_alone(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_completed_message("room-1", "msg-1", "alice", TWO_SENTENCES)
        .await
        .unwrap();

    // Give the watcher time to see it
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    ctx.dispatcher.drain().await;

    let message = ctx.fixtures.find_message("room-1", "msg-1").await.unwrap().unwrap();
    assert_eq!(message.processing_run, 0);
    assert!(message.translations.is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_404_for_unknown_message(ctx: &TestContext) {
    let response = ctx
        .client
        .get("/api/messages/status/room-1/missing")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("missing");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reprocess_a_completed_message(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_completed_message("room-1", "msg-1", "alice", TWO_SENTENCES)
        .await
        .unwrap();

    let response = ctx
        .client
        .post_empty("/api/messages/reprocess/room-1/msg-1")
        .await
        .unwrap();

    response.assert_status(StatusCode::ACCEPTED);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["messageId"], "msg-1");
    assert_eq!(body["roomId"], "room-1");
    assert_eq!(body["processingStatus"], "processing");
    assert_eq!(body["run"], 1);

    let message = ctx
        .fixtures
        .wait_for("room-1", "msg-1", |m| {
            m.processing_status == Some(ProcessingStatus::Completed) && m.total_chunks == 2
        })
        .await
        .unwrap();
    assert_eq!(message.translations["ar"].len(), 2);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_refuse_to_reprocess_a_message_in_flight(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_processing_message("room-1", "msg-1", "alice", TWO_SENTENCES)
        .await
        .unwrap();

    let response = ctx
        .client
        .post_empty("/api/messages/reprocess/room-1/msg-1")
        .await
        .unwrap();

    response
        .assert_status(StatusCode::CONFLICT)
        .assert_error_message("processing");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_take_over_a_message_in_flight_when_forced(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    ctx.fixtures
        .create_processing_message("room-1", "msg-1", "alice", TWO_SENTENCES)
        .await
        .unwrap();

    let response = ctx
        .client
        .post_empty("/api/messages/reprocess/room-1/msg-1?force=true")
        .await
        .unwrap();

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.body.as_ref().unwrap()["run"], 2);

    let message = ctx.fixtures.wait_for_terminal("room-1", "msg-1").await.unwrap();
    assert_eq!(message.processing_status, Some(ProcessingStatus::Completed));
    assert_eq!(message.processing_run, 2);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_404_when_reprocessing_unknown_message(ctx: &TestContext) {
    let response = ctx
        .client
        .post_empty("/api/messages/reprocess/room-1/missing")
        .await
        .unwrap();

    response.assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_room_messages_newest_first(ctx: &TestContext) {
    ctx.fixtures
        .create_room("room-1", &[("alice", "en"), ("bob", "ar")])
        .await
        .unwrap();
    for id in ["msg-1", "msg-2", "msg-3"] {
        ctx.fixtures
            .create_completed_message("room-1", id, "alice", "Hello there.")
            .await
            .unwrap();
    }
    ctx.fixtures
        .create_completed_message("room-2", "other", "alice", "Hello there.")
        .await
        .unwrap();

    let response = ctx.client.get("/api/messages/room/room-1").await.unwrap();

    response.assert_status(StatusCode::OK);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["roomId"], "room-1");

    let ids: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["msg-3", "msg-2", "msg-1"]);
    assert_eq!(body["messages"][0]["processingStatus"], "completed");
}
