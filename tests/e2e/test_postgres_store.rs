use crate::e2e::helpers::postgres::fresh_database;

use noota_backend::domain::message::{
    ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease, ProcessingStatus,
};
use noota_backend::domain::room::Room;
use noota_backend::domain::user::User;
use noota_backend::error::AppError;
use noota_backend::infrastructure::db::DbPool;
use noota_backend::infrastructure::events::{MessageEventSource, PgEventSource};
use noota_backend::infrastructure::repositories::{
    MessageRepository, PgMessageRepository, PgRoomRepository, PgUserRepository, RoomRepository,
    UserRepository,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct PgStore {
    pool: Arc<DbPool>,
    messages: Arc<PgMessageRepository>,
    rooms: Arc<PgRoomRepository>,
    users: PgUserRepository,
}

impl PgStore {
    async fn new() -> Self {
        let pool = Arc::new(fresh_database().await.expect("Failed to create database"));
        Self {
            messages: Arc::new(PgMessageRepository::new(pool.clone())),
            rooms: Arc::new(PgRoomRepository::new(pool.clone())),
            users: PgUserRepository::new(pool.clone()),
            pool,
        }
    }

    async fn with_room_and_message(self) -> Self {
        self.rooms
            .upsert(&Room::new("r1").with_participant("u1", "en").with_participant("u2", "ar"))
            .await
            .unwrap();
        self.messages
            .create(&Message::new("m1", "r1", "u1", "Hello there.").with_language("en"))
            .await
            .unwrap();
        self
    }

    fn events(&self) -> PgEventSource {
        PgEventSource::new(self.pool.clone(), self.rooms.clone(), self.messages.clone())
    }
}

fn claimed(outcome: ClaimOutcome) -> ProcessingLease {
    match outcome {
        ClaimOutcome::Claimed(lease) => lease,
        other => panic!("expected a claim, got {:?}", other),
    }
}

#[tokio::test]
async fn it_should_claim_a_pending_message_once() {
    let store = PgStore::new().await.with_room_and_message().await;

    let first = store
        .messages
        .try_claim("r1", "m1", ClaimMode::Automatic)
        .await
        .unwrap();
    let second = store
        .messages
        .try_claim("r1", "m1", ClaimMode::Automatic)
        .await
        .unwrap();

    assert_eq!(claimed(first).run, 1);
    assert_eq!(second, ClaimOutcome::Declined(Some(ProcessingStatus::Processing)));

    let message = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(message.processing_status, Some(ProcessingStatus::Processing));
    assert!(message.processing_started_at.is_some());
}

#[tokio::test]
async fn it_should_report_missing_messages_on_claim() {
    let store = PgStore::new().await;

    let result = store
        .messages
        .try_claim("r1", "missing", ClaimMode::Automatic)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn it_should_reject_writes_from_a_superseded_run() {
    let store = PgStore::new().await.with_room_and_message().await;

    let stale = claimed(
        store
            .messages
            .try_claim("r1", "m1", ClaimMode::Automatic)
            .await
            .unwrap(),
    );
    let current = claimed(
        store
            .messages
            .try_claim("r1", "m1", ClaimMode::Reprocess { force: true })
            .await
            .unwrap(),
    );
    assert_eq!(current.run, stale.run + 1);

    let result = store
        .messages
        .apply(&stale, MessageUpdate::TotalChunks(3))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    store
        .messages
        .apply(&current, MessageUpdate::TotalChunks(1))
        .await
        .unwrap();
    let message = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(message.total_chunks, 1);
}

#[tokio::test]
async fn it_should_stream_chunk_progress_then_complete() {
    let store = PgStore::new().await.with_room_and_message().await;
    let lease = claimed(
        store
            .messages
            .try_claim("r1", "m1", ClaimMode::Automatic)
            .await
            .unwrap(),
    );

    store
        .messages
        .apply(&lease, MessageUpdate::TotalChunks(2))
        .await
        .unwrap();
    store
        .messages
        .apply(
            &lease,
            MessageUpdate::ChunkProgress {
                language: "ar".to_string(),
                translations: vec!["مرحبا".to_string()],
                audio_urls: vec![None],
                processed_chunks: 1,
            },
        )
        .await
        .unwrap();

    let partial = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(partial.processed_chunks, 1);
    assert_eq!(partial.translations["ar"], vec!["مرحبا".to_string()]);
    assert_eq!(partial.audio_urls["ar"], vec![None]);

    let translations = BTreeMap::from([(
        "ar".to_string(),
        vec!["مرحبا".to_string(), "كيف حالك".to_string()],
    )]);
    let audio_urls = BTreeMap::from([(
        "ar".to_string(),
        vec![Some("http://localhost/audio/chunks/ar_m1_chunk0.wav".to_string()), None],
    )]);
    store
        .messages
        .apply(
            &lease,
            MessageUpdate::Completed {
                translations: translations.clone(),
                audio_urls: audio_urls.clone(),
            },
        )
        .await
        .unwrap();

    let done = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(done.processing_status, Some(ProcessingStatus::Completed));
    assert_eq!(done.translations, translations);
    assert_eq!(done.audio_urls, audio_urls);
    assert!(done.processing_ended_at.is_some());

    // A completed run no longer holds the lease
    let result = store
        .messages
        .apply(&lease, MessageUpdate::TotalChunks(5))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn it_should_record_failures() {
    let store = PgStore::new().await.with_room_and_message().await;
    let lease = claimed(
        store
            .messages
            .try_claim("r1", "m1", ClaimMode::Automatic)
            .await
            .unwrap(),
    );

    store
        .messages
        .apply(
            &lease,
            MessageUpdate::Failed {
                error: "translation provider unreachable".to_string(),
            },
        )
        .await
        .unwrap();

    let message = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(message.processing_status, Some(ProcessingStatus::Failed));
    assert_eq!(
        message.processing_error.as_deref(),
        Some("translation provider unreachable")
    );

    // Failed messages are retryable without force
    let retry = store
        .messages
        .try_claim("r1", "m1", ClaimMode::Reprocess { force: false })
        .await
        .unwrap();
    assert_eq!(claimed(retry).run, 2);
    let reset = store.messages.find("r1", "m1").await.unwrap().unwrap();
    assert_eq!(reset.processing_error, None);
}

#[tokio::test]
async fn it_should_list_recent_messages_newest_first() {
    let store = PgStore::new().await.with_room_and_message().await;
    for id in ["m2", "m3"] {
        store
            .messages
            .create(&Message::new(id, "r1", "u1", "More."))
            .await
            .unwrap();
    }

    let recent = store.messages.list_recent("r1", 2).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|m| m.id.as_str()).collect();

    assert_eq!(ids, vec!["m3", "m2"]);
}

#[tokio::test]
async fn it_should_store_rooms_and_users() {
    let store = PgStore::new().await.with_room_and_message().await;

    let room = store.rooms.find("r1").await.unwrap().unwrap();
    assert_eq!(room.target_languages("u1"), vec!["ar".to_string()]);
    assert_eq!(store.rooms.list_ids().await.unwrap(), vec!["r1".to_string()]);

    store
        .users
        .upsert(&User::new("u1").with_voice_profile("/audio_references/u1.wav"))
        .await
        .unwrap();
    let user = store.users.find_by_id("u1").await.unwrap().unwrap();
    assert_eq!(user.voice_profile_path.as_deref(), Some("/audio_references/u1.wav"));
    assert!(store.users.find_by_id("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn it_should_replay_then_stream_room_messages() {
    let store = PgStore::new().await.with_room_and_message().await;
    let events = store.events();

    let mut feed = events.watch_messages("r1").await.unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.id, "m1");

    // Other rooms do not leak into the feed
    store.rooms.upsert(&Room::new("r2")).await.unwrap();
    store
        .messages
        .create(&Message::new("elsewhere", "r2", "u1", "Hi."))
        .await
        .unwrap();
    store
        .messages
        .create(&Message::new("m2", "r1", "u2", "مرحبا."))
        .await
        .unwrap();

    let created = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.id, "m2");
    assert_eq!(created.processing_status, Some(ProcessingStatus::Pending));
}

#[tokio::test]
async fn it_should_publish_room_snapshots_on_new_rooms() {
    let store = PgStore::new().await.with_room_and_message().await;
    let events = store.events();

    let mut rooms = events.watch_rooms().await.unwrap();

    let initial = tokio::time::timeout(Duration::from_secs(5), rooms.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initial, vec!["r1".to_string()]);

    store.rooms.upsert(&Room::new("r2")).await.unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(5), rooms.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated, vec!["r1".to_string(), "r2".to_string()]);
}

#[tokio::test]
async fn it_should_serve_every_room_from_one_message_listener() {
    let store = PgStore::new().await;
    let events = store.events();
    let room_ids: Vec<String> = (0..8).map(|i| format!("room-{}", i)).collect();

    let mut feeds = Vec::new();
    for room_id in &room_ids {
        store.rooms.upsert(&Room::new(room_id.as_str())).await.unwrap();
        feeds.push(events.watch_messages(room_id).await.unwrap());
    }

    let (listeners,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pg_stat_activity \
         WHERE datname = current_database() AND query ILIKE 'LISTEN%message_events%'",
    )
    .fetch_one(store.pool.as_ref())
    .await
    .unwrap();
    assert_eq!(listeners, 1);

    for room_id in &room_ids {
        store
            .messages
            .create(&Message::new(format!("{}-m", room_id), room_id.as_str(), "u1", "Hi."))
            .await
            .unwrap();
    }

    for (room_id, feed) in room_ids.iter().zip(feeds.iter_mut()) {
        let delivered = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.room_id, *room_id);
        assert_eq!(delivered.id, format!("{}-m", room_id));
    }
}
