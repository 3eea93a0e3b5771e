pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub storage: ObjectStorage,
    pub session_key: [u8; 32],
    pub session_ttl_days: u64,
    pub upload_max_bytes: i64,
    pub secure_cookies: bool,
}
