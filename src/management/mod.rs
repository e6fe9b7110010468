mod auth;
mod cache;
mod catalog;
mod history;

pub use auth::{
    CallbackListener, OAUTH_CODE_KEY, REFRESH_TOKEN_KEY, TokenExchanger, TokenManager, WaitFn,
};
pub use cache::{ByteCache, FileCache};
pub use catalog::CatalogManager;
pub use catalog::StoreError;
pub use history::HistoryManager;
