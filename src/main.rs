use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use noota_backend::controllers::health::{HealthController, StoreProbe};
use noota_backend::controllers::message::MessageController;
use noota_backend::controllers::speech::SpeechController;
use noota_backend::domain::limits::ConcurrencyLimit;
use noota_backend::domain::message::{
    ChunkAudioPublisher, MessageDispatcher, MessageProcessor, MessageWatcher, ProcessorSettings,
    RoomRegistry,
};
use noota_backend::domain::speech::{SpeechService, SpeechServiceApi, TranslationService};
use noota_backend::domain::voice_profile::VoiceProfileResolver;
use noota_backend::infrastructure::config::{Config, LogFormat, StoreBackend};
use noota_backend::infrastructure::db::{check_connection, create_pool};
use noota_backend::infrastructure::events::{MemoryEventSource, MessageEventSource, PgEventSource};
use noota_backend::infrastructure::http::{build_router, start_http_server};
use noota_backend::infrastructure::repositories::{
    GoogleTranslateRepository, HttpRecordingRepository, LocalAudioStorage, MemoryStore,
    MessageRepository, PgMessageRepository, PgRoomRepository, PgUserRepository,
    PlaceholderTtsRepository, RecordingRepository, RoomRepository, TtsRepository, UserRepository,
    XttsTtsRepository,
};

struct Store {
    probe: StoreProbe,
    message_repo: Arc<dyn MessageRepository>,
    room_repo: Arc<dyn RoomRepository>,
    user_repo: Arc<dyn UserRepository>,
    events: Arc<dyn MessageEventSource>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Noota Backend on {}:{}",
        config.host,
        config.port
    );

    let store = open_store(&config).await?;
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Provider adapters
    tracing::info!("Instantiating providers...");
    let translation_repo = Arc::new(GoogleTranslateRepository::new(
        config.translation_api_url.clone(),
        Duration::from_secs(config.translation_timeout_secs),
    )?);
    let tts_repo = synthesis_provider(&config)?;
    let recordings: Arc<dyn RecordingRepository> = Arc::new(HttpRecordingRepository::new(
        Duration::from_secs(config.reference_download_timeout_secs),
    )?);
    let audio_storage = Arc::new(LocalAudioStorage::new(
        config.audio_storage_dir.clone(),
        config.public_base_url.clone(),
    ));

    // 2. Services
    tracing::info!("Instantiating services...");
    let translation_service = Arc::new(TranslationService::new(
        translation_repo,
        ConcurrencyLimit::new(config.translation_max_concurrency),
        config.translation_cache_enabled,
    ));
    let speech_service: Arc<dyn SpeechServiceApi> = Arc::new(SpeechService::new(
        translation_service,
        tts_repo,
        ConcurrencyLimit::new(config.synthesis_max_concurrency),
    ));
    let voice_profiles = Arc::new(VoiceProfileResolver::new(
        store.user_repo.clone(),
        config.voice_profile_dir.clone(),
    ));
    let publisher = Arc::new(ChunkAudioPublisher::new(audio_storage));
    let processor = Arc::new(MessageProcessor::new(
        store.message_repo.clone(),
        store.room_repo.clone(),
        speech_service.clone(),
        voice_profiles.clone(),
        publisher,
        Some(recordings),
        ProcessorSettings {
            max_chars_per_chunk: config.chunk_max_chars,
            default_target_language: config.default_target_language.clone(),
        },
    ));
    let dispatcher = Arc::new(MessageDispatcher::new(ConcurrencyLimit::new(
        config.max_concurrent_messages,
    )));
    let watcher = Arc::new(MessageWatcher::new(
        store.events.clone(),
        processor.clone(),
        dispatcher.clone(),
        Arc::new(RoomRegistry::new()),
    ));

    // 3. Controllers
    tracing::info!("Instantiating controllers...");
    let health_controller = Arc::new(HealthController::new(
        store.probe.clone(),
        speech_service.clone(),
        watcher.clone(),
    ));
    let message_controller = Arc::new(MessageController::new(
        store.message_repo.clone(),
        processor,
        dispatcher.clone(),
    ));
    let speech_controller = Arc::new(SpeechController::new(speech_service, voice_profiles));

    watcher.start().await?;

    let app = build_router(
        health_controller,
        message_controller,
        speech_controller,
        &config.audio_storage_dir,
    );

    start_http_server(config, app, watcher, dispatcher).await?;

    Ok(())
}

async fn open_store(config: &Config) -> Result<Store, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required when STORE_BACKEND=postgres")?;

            let pool = create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            check_connection(&pool).await?;
            tracing::info!("Database connection verified");

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");

            let pool = Arc::new(pool);
            let message_repo: Arc<dyn MessageRepository> =
                Arc::new(PgMessageRepository::new(pool.clone()));
            let room_repo: Arc<dyn RoomRepository> = Arc::new(PgRoomRepository::new(pool.clone()));
            let user_repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
            let events: Arc<dyn MessageEventSource> = Arc::new(PgEventSource::new(
                pool.clone(),
                room_repo.clone(),
                message_repo.clone(),
            ));

            Ok(Store {
                probe: StoreProbe::Postgres(pool),
                message_repo,
                room_repo,
                user_repo,
                events,
            })
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            let store = Arc::new(MemoryStore::new());

            Ok(Store {
                probe: StoreProbe::Memory,
                message_repo: store.clone(),
                room_repo: store.clone(),
                user_repo: store.clone(),
                events: Arc::new(MemoryEventSource::new(store)),
            })
        }
    }
}

fn synthesis_provider(
    config: &Config,
) -> Result<Option<Arc<dyn TtsRepository>>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.xtts_server_url {
        tracing::info!(url = %url, "Using XTTS synthesis server");
        let repo = XttsTtsRepository::new(url.clone(), Duration::from_secs(config.xtts_timeout_secs))?;
        return Ok(Some(Arc::new(repo)));
    }

    if config.placeholder_audio_enabled {
        tracing::warn!("No XTTS server configured, emitting placeholder audio");
        return Ok(Some(Arc::new(PlaceholderTtsRepository)));
    }

    tracing::warn!("No synthesis provider configured, messages will carry text only");
    Ok(None)
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "noota_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "noota_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
