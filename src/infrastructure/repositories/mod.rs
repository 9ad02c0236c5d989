pub mod audio_storage_repository;
pub mod google_translate_repository;
pub mod memory_store;
pub mod message_repository;
pub mod pg_message_repository;
pub mod pg_room_repository;
pub mod pg_user_repository;
pub mod placeholder_tts_repository;
pub mod recording_repository;
pub mod room_repository;
pub mod translation_repository;
pub mod tts_repository;
pub mod user_repository;
pub mod xtts_tts_repository;

pub use audio_storage_repository::{AudioStorageRepository, LocalAudioStorage};
pub use google_translate_repository::GoogleTranslateRepository;
pub use memory_store::{MemoryStore, StoreEvent};
pub use message_repository::MessageRepository;
pub use pg_message_repository::PgMessageRepository;
pub use pg_room_repository::PgRoomRepository;
pub use pg_user_repository::PgUserRepository;
pub use placeholder_tts_repository::PlaceholderTtsRepository;
pub use recording_repository::{HttpRecordingRepository, RecordingRepository};
pub use room_repository::RoomRepository;
pub use translation_repository::TranslationRepository;
pub use tts_repository::TtsRepository;
pub use user_repository::UserRepository;
pub use xtts_tts_repository::XttsTtsRepository;
