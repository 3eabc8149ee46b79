// 外部系統的實作：目前只有 SQLite 電影資料庫
pub mod sqlite_store;

pub use sqlite_store::SqliteMovieStore;
