//! SQLite storage backend for clubsync-server.

use super::{RecordStorage, StoredRecord};
use crate::error::StorageError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use sync_types::{Collection, RecordId, Snapshot};

/// SQLite-based record storage.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        let path_str = path.to_str().ok_or_else(|| StorageError::InvalidPath {
            path: path.to_path_buf(),
        })?;

        let options = SqliteConnectOptions::from_str(path_str)
            .map_err(StorageError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                record_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, record_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(())
    }

    fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Normalize a payload for storage: pin the id, drop client-local fields.
    fn normalize(id: &RecordId, mut payload: serde_json::Value) -> serde_json::Value {
        if let Some(map) = payload.as_object_mut() {
            map.insert("id".to_string(), serde_json::Value::String(id.to_string()));
            map.remove("synced");
        }
        payload
    }
}

#[async_trait]
impl RecordStorage for SqliteStorage {
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT collection, record_id, payload, updated_at
            FROM records
            WHERE collection = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn get(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT collection, record_id, payload, updated_at
            FROM records
            WHERE collection = ?1 AND record_id = ?2
            "#,
        )
        .bind(collection.as_str())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn upsert(
        &self,
        collection: Collection,
        id: RecordId,
        payload: serde_json::Value,
    ) -> Result<StoredRecord, StorageError> {
        let payload = Self::normalize(&id, payload);
        let updated_at = Self::current_timestamp();
        let body = payload.to_string();

        sqlx::query(
            r#"
            INSERT INTO records (collection, record_id, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, record_id)
            DO UPDATE SET payload = ?3, updated_at = ?4
            "#,
        )
        .bind(collection.as_str())
        .bind(id.to_string())
        .bind(&body)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(StoredRecord {
            collection,
            record_id: id,
            payload,
            updated_at,
        })
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            DELETE FROM records WHERE collection = ?1 AND record_id = ?2
            "#,
        )
        .bind(collection.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<u64, StorageError> {
        let updated_at = Self::current_timestamp();
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        sqlx::query("DELETE FROM records")
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Database)?;

        let mut stored = 0u64;
        for collection in Collection::ALL {
            for record in snapshot.records(collection) {
                let payload = record.wire_value().map_err(|_| StorageError::Corrupt {
                    record_id: record.id().to_string(),
                })?;

                sqlx::query(
                    r#"
                    INSERT INTO records (collection, record_id, payload, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(collection.as_str())
                .bind(record.id().to_string())
                .bind(payload.to_string())
                .bind(updated_at)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::Database)?;

                stored += 1;
            }
        }

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(stored)
    }

    async fn count(&self, collection: Collection) -> Result<u64, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?1")
                .bind(collection.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(StorageError::Database)?;

        Ok(count as u64)
    }

    async fn total_records(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count as u64)
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct RecordRow {
    collection: String,
    record_id: String,
    payload: String,
    updated_at: i64,
}

impl TryFrom<RecordRow> for StoredRecord {
    type Error = StorageError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let collection =
            Collection::from_str(&row.collection).map_err(|_| StorageError::Corrupt {
                record_id: row.record_id.clone(),
            })?;
        let record_id =
            RecordId::from_str(&row.record_id).map_err(|_| StorageError::Corrupt {
                record_id: row.record_id.clone(),
            })?;
        let payload =
            serde_json::from_str(&row.payload).map_err(|_| StorageError::Corrupt {
                record_id: row.record_id.clone(),
            })?;

        Ok(StoredRecord {
            collection,
            record_id,
            payload,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_types::{Member, Record};

    fn member_body(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "document": "12345678A",
            "phone": "600111222",
            "email": format!("{}@club.example", name.to_lowercase()),
        })
    }

    #[tokio::test]
    async fn upsert_stores_and_returns_record() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let id = RecordId::new();

        let stored = storage
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();

        assert_eq!(stored.record_id, id);
        assert_eq!(stored.payload["name"], "Ana");
        assert_eq!(stored.payload["id"], id.to_string());
    }

    #[tokio::test]
    async fn upsert_strips_client_local_fields() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let id = RecordId::new();

        let mut body = member_body("Ana");
        body["synced"] = json!(true);

        let stored = storage
            .upsert(Collection::Members, id, body)
            .await
            .unwrap();

        assert!(stored.payload.get("synced").is_none());

        let fetched = storage.get(Collection::Members, &id).await.unwrap().unwrap();
        assert!(fetched.payload.get("synced").is_none());
    }

    #[tokio::test]
    async fn upsert_same_id_replaces() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let id = RecordId::new();

        storage
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();
        storage
            .upsert(Collection::Members, id, member_body("Ana Maria"))
            .await
            .unwrap();

        let records = storage.list(Collection::Members).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["name"], "Ana Maria");
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let storage = SqliteStorage::in_memory().await.unwrap();

        for name in ["Ana", "Luis", "Marta"] {
            storage
                .upsert(Collection::Members, RecordId::new(), member_body(name))
                .await
                .unwrap();
        }

        let records = storage.list(Collection::Members).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.payload["name"].clone()).collect();
        assert_eq!(names, vec!["Ana", "Luis", "Marta"]);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let storage = SqliteStorage::in_memory().await.unwrap();

        storage
            .upsert(Collection::Members, RecordId::new(), member_body("Ana"))
            .await
            .unwrap();
        storage
            .upsert(
                Collection::Teams,
                RecordId::new(),
                json!({"name": "Senior A", "category": "senior"}),
            )
            .await
            .unwrap();

        assert_eq!(storage.count(Collection::Members).await.unwrap(), 1);
        assert_eq!(storage.count(Collection::Teams).await.unwrap(), 1);
        assert_eq!(storage.count(Collection::Players).await.unwrap(), 0);
        assert_eq!(storage.total_records().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let id = RecordId::new();

        storage
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();

        assert!(storage.delete(Collection::Members, &id).await.unwrap());
        assert!(!storage.delete(Collection::Members, &id).await.unwrap());
        assert!(storage.get(Collection::Members, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_all_is_wholesale() {
        let storage = SqliteStorage::in_memory().await.unwrap();

        // Pre-existing data that the snapshot does not contain
        storage
            .upsert(Collection::Members, RecordId::new(), member_body("Old"))
            .await
            .unwrap();
        storage
            .upsert(
                Collection::Events,
                RecordId::new(),
                json!({"title": "Old event", "venue": "", "starts_at": 0}),
            )
            .await
            .unwrap();

        let mut snapshot = Snapshot::default();
        let member = Member {
            id: RecordId::new(),
            name: "Ana".to_string(),
            document: "12345678A".to_string(),
            phone: String::new(),
            email: String::new(),
            synced: true,
        };
        snapshot.members = vec![member.clone()];

        let stored = storage.replace_all(&snapshot).await.unwrap();
        assert_eq!(stored, 1);

        // Old records in every collection are gone
        assert_eq!(storage.count(Collection::Events).await.unwrap(), 0);
        let members = storage.list(Collection::Members).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].record_id, member.id);
        // The client-local flag never reaches storage
        assert!(members[0].payload.get("synced").is_none());
    }

    #[tokio::test]
    async fn stored_payload_parses_as_record() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let id = RecordId::new();

        storage
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();

        let stored = storage.get(Collection::Members, &id).await.unwrap().unwrap();
        let record = Record::from_value(Collection::Members, stored.payload).unwrap();
        assert_eq!(record.id(), id);
        assert!(!record.synced());
    }

    #[tokio::test]
    async fn file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.db");
        let id = RecordId::new();

        {
            let storage = SqliteStorage::new(&path).await.unwrap();
            storage
                .upsert(Collection::Members, id, member_body("Ana"))
                .await
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).await.unwrap();
        let fetched = storage.get(Collection::Members, &id).await.unwrap();
        assert!(fetched.is_some());
    }
}
