pub mod resolver;

pub use resolver::VoiceProfileResolver;
