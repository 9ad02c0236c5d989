pub mod chunking;
pub mod limits;
pub mod message;
pub mod room;
pub mod speech;
pub mod user;
pub mod voice_profile;
