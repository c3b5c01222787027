//! HTTP API handlers for shelfwatch-dash

pub mod buildinfo;
pub mod chat;
pub mod events;
pub mod health;

pub use buildinfo::get_build_info;
pub use chat::{get_chat_history, post_chat};
pub use events::{event_stream, get_status, get_view};
pub use health::health_routes;
