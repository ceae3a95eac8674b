use std::sync::Arc;

use nh_chat::NewsChat;
use nh_storage::CachedTables;

pub struct AppState {
    pub tables: CachedTables,
    /// Absent when no chat-model credentials are configured; the highlights
    /// endpoints keep working without it.
    pub chat: Option<Arc<NewsChat>>,
}
