use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Idempotently creates the `animals` table when it is absent.
    ///
    /// Existing structure is never dropped or altered. Callers treat a
    /// failure here as fatal; the service must not serve traffic against a
    /// store that may be missing its table.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS animals (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT,\
                 name TEXT NOT NULL,\
                 age TEXT NOT NULL,\
                 size TEXT NOT NULL,\
                 type TEXT NOT NULL,\
                 imageUrl TEXT NOT NULL,\
                 description TEXT NOT NULL,\
                 phoneNumber TEXT NOT NULL,\
                 latLong TEXT NOT NULL,\
                 provincia TEXT NOT NULL,\
                 ciudad TEXT NOT NULL\
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Schema)?;

        Ok(())
    }

    /// Returns a handle to operate on animal records.
    pub fn animals(&self) -> AnimalRepository {
        AnimalRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to create animals table: {0}")]
    Schema(sqlx::Error),
}

/// Repository for the append-only `animals` table.
#[derive(Clone)]
pub struct AnimalRepository {
    pool: SqlitePool,
}

impl AnimalRepository {
    /// Appends one record and returns the stored row with its assigned id.
    pub async fn insert(&self, record: &NewAnimal<'_>) -> Result<StoredAnimal, AnimalStoreError> {
        let row = sqlx::query_as::<_, StoredAnimal>(
            "INSERT INTO animals \
             (name, age, size, type, imageUrl, description, phoneNumber, latLong, provincia, ciudad) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id, name, age, size, type, imageUrl, description, phoneNumber, latLong, provincia, ciudad",
        )
        .bind(record.name)
        .bind(record.age)
        .bind(record.size)
        .bind(record.species)
        .bind(record.image_url)
        .bind(record.description)
        .bind(record.phone_number)
        .bind(record.lat_long)
        .bind(record.provincia)
        .bind(record.ciudad)
        .fetch_one(&self.pool)
        .await
        .map_err(AnimalStoreError::Write)?;

        Ok(row)
    }

    /// Returns every stored record in store-native order.
    ///
    /// An empty table yields an empty vec, never an error.
    pub async fn list_all(&self) -> Result<Vec<StoredAnimal>, AnimalStoreError> {
        let rows = sqlx::query_as::<_, StoredAnimal>(
            "SELECT id, name, age, size, type, imageUrl, description, phoneNumber, latLong, provincia, ciudad \
             FROM animals",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AnimalStoreError::Read)?;

        Ok(rows)
    }
}

/// Parameters required to insert an animal record.
pub struct NewAnimal<'a> {
    pub name: &'a str,
    pub age: &'a str,
    pub size: &'a str,
    pub species: &'a str,
    pub image_url: &'a str,
    pub description: &'a str,
    pub phone_number: &'a str,
    pub lat_long: &'a str,
    pub provincia: &'a str,
    pub ciudad: &'a str,
}

/// A stored animal row. Serialized field names match the wire contract and
/// the column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoredAnimal {
    pub id: i64,
    pub name: String,
    pub age: String,
    pub size: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub species: String,
    #[sqlx(rename = "imageUrl")]
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub description: String,
    #[sqlx(rename = "phoneNumber")]
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    #[sqlx(rename = "latLong")]
    #[serde(rename = "latLong")]
    pub lat_long: String,
    pub provincia: String,
    pub ciudad: String,
}

/// Errors that can occur while reading or writing animal records.
#[derive(Debug, Error)]
pub enum AnimalStoreError {
    #[error("failed to insert animal record: {0}")]
    Write(sqlx::Error),
    #[error("failed to list animal records: {0}")]
    Read(sqlx::Error),
}
