pub mod config;
pub mod db;
pub mod events;
pub mod http;
pub mod repositories;
