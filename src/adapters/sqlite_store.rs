use crate::domain::model::MovieRecord;
use crate::domain::ports::MovieStore;
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::RwLock;

const CREATE_MOVIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    vote_average REAL NOT NULL DEFAULT 0,
    vote_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    release_date TEXT,
    revenue INTEGER NOT NULL DEFAULT 0,
    budget INTEGER NOT NULL DEFAULT 0,
    runtime INTEGER,
    imdb_id TEXT,
    original_language TEXT,
    original_title TEXT,
    overview TEXT,
    tagline TEXT,
    poster_path TEXT,
    popularity REAL,
    imdb_rating REAL,
    imdb_votes INTEGER,
    genres TEXT NOT NULL DEFAULT '[]',
    production_companies TEXT NOT NULL DEFAULT '[]',
    production_countries TEXT NOT NULL DEFAULT '[]',
    spoken_languages TEXT NOT NULL DEFAULT '[]',
    "cast" TEXT NOT NULL DEFAULT '[]',
    cast_members TEXT NOT NULL DEFAULT '[]',
    director TEXT NOT NULL DEFAULT '[]',
    director_of_photography TEXT NOT NULL DEFAULT '[]',
    writers TEXT NOT NULL DEFAULT '[]',
    producers TEXT NOT NULL DEFAULT '[]',
    music_composer TEXT NOT NULL DEFAULT '[]',
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const UPSERT_MOVIE: &str = r#"
INSERT INTO movies (
    id, title, vote_average, vote_count, status, release_date, revenue, budget, runtime,
    imdb_id, original_language, original_title, overview, tagline, poster_path,
    popularity, imdb_rating, imdb_votes, genres, production_companies,
    production_countries, spoken_languages, "cast", cast_members, director,
    director_of_photography, writers, producers, music_composer
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    title = excluded.title,
    vote_average = excluded.vote_average,
    vote_count = excluded.vote_count,
    status = excluded.status,
    release_date = excluded.release_date,
    revenue = excluded.revenue,
    budget = excluded.budget,
    runtime = excluded.runtime,
    imdb_id = excluded.imdb_id,
    original_language = excluded.original_language,
    original_title = excluded.original_title,
    overview = excluded.overview,
    tagline = excluded.tagline,
    poster_path = excluded.poster_path,
    popularity = excluded.popularity,
    imdb_rating = excluded.imdb_rating,
    imdb_votes = excluded.imdb_votes,
    genres = excluded.genres,
    production_companies = excluded.production_companies,
    production_countries = excluded.production_countries,
    spoken_languages = excluded.spoken_languages,
    "cast" = excluded."cast",
    cast_members = excluded.cast_members,
    director = excluded.director,
    director_of_photography = excluded.director_of_photography,
    writers = excluded.writers,
    producers = excluded.producers,
    music_composer = excluded.music_composer,
    updated_at = CURRENT_TIMESTAMP
"#;

/// 以 SQLite 實作的電影資料庫
///
/// 連線池放在 `RwLock` 裡，保活失敗時可以整個換掉；寫入時只複製池的 handle，
/// 不會在等待資料庫時持有鎖。
pub struct SqliteMovieStore {
    pool: RwLock<SqlitePool>,
    url: String,
    max_connections: u32,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(ImportError::SerializationError)
}

async fn open_pool(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    // 記憶體資料庫每條連線各自獨立，連線不能被回收
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

impl SqliteMovieStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("🗄️ Connecting to {} (max {} connections)", url, max_connections);
        let pool = open_pool(url, max_connections).await?;

        Ok(Self {
            pool: RwLock::new(pool),
            url: url.to_string(),
            max_connections,
        })
    }

    async fn pool(&self) -> SqlitePool {
        self.pool.read().await.clone()
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_MOVIES_TABLE)
            .execute(&self.pool().await)
            .await?;
        tracing::debug!("movies table is ready");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool().await)
            .await?;
        Ok(count)
    }

    pub async fn fetch_title(&self, id: &str) -> Result<Option<String>> {
        let title: Option<String> = sqlx::query_scalar("SELECT title FROM movies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool().await)
            .await?;
        Ok(title)
    }
}

#[async_trait]
impl MovieStore for SqliteMovieStore {
    async fn upsert(&self, record: &MovieRecord) -> Result<()> {
        if record.id.trim().is_empty() {
            return Err(ImportError::storage(format!(
                "refusing to upsert movie {:?} without an id",
                record.title
            )));
        }

        sqlx::query(UPSERT_MOVIE)
            .bind(&record.id)
            .bind(&record.title)
            .bind(record.vote_average)
            .bind(record.vote_count)
            .bind(&record.status)
            .bind(record.release_date)
            .bind(record.revenue)
            .bind(record.budget)
            .bind(record.runtime)
            .bind(&record.imdb_id)
            .bind(&record.original_language)
            .bind(&record.original_title)
            .bind(&record.overview)
            .bind(&record.tagline)
            .bind(&record.poster_path)
            .bind(record.popularity)
            .bind(record.imdb_rating)
            .bind(record.imdb_votes)
            .bind(to_json(&record.genres)?)
            .bind(to_json(&record.production_companies)?)
            .bind(to_json(&record.production_countries)?)
            .bind(to_json(&record.spoken_languages)?)
            .bind(to_json(&record.cast)?)
            .bind(to_json(&record.cast_members)?)
            .bind(to_json(&record.director)?)
            .bind(to_json(&record.director_of_photography)?)
            .bind(to_json(&record.writers)?)
            .bind(to_json(&record.producers)?)
            .bind(to_json(&record.music_composer)?)
            .execute(&self.pool().await)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool().await).await?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let fresh = open_pool(&self.url, self.max_connections).await?;
        let stale = {
            let mut guard = self.pool.write().await;
            std::mem::replace(&mut *guard, fresh)
        };
        stale.close().await;
        tracing::info!("🔄 Reconnected to {}", self.url);
        Ok(())
    }

    async fn close(&self) {
        self.pool.read().await.close().await;
        tracing::debug!("Database pool closed");
    }
}
