pub mod config;
pub mod error;
pub mod filter;
pub mod highlights;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::Error;
pub use models::{Article, Category, Cluster, HighlightRow, ScoredArticle, ScoredCluster, SortMode};
pub use storage::{Embedder, NewsSearch, TableSource};

pub type Result<T> = std::result::Result<T, Error>;
