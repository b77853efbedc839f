//! Mileage repository for PostgreSQL.
//!
//! [`MileageRepository`] owns the pool and opens one [`PgSession`] per sync
//! run. A session is a single pooled connection with an open transaction;
//! every read and write of the run goes through it, so rows inserted earlier
//! in the run are visible to later duplicate checks.

use chrono::{DateTime, NaiveDate, Utc};
use mileage_core::error::AppError;
use mileage_core::models::MileageRecord;
use mileage_core::sync::InsertOutcome;
use mileage_core::traits::{MileageStore, StoreSession};
use sqlx::{PgPool, Pool, Postgres, Transaction};
use tracing::{debug, warn};

/// Schema of the mileage log table.
pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_arac_km_log.sql");

const EXISTS_FOR_DATE: &str = r#"SELECT EXISTS (SELECT 1 FROM arac_km_log WHERE "DeviceId" = $1 AND "Date" = $2)"#;

const INSERT_ROW: &str = r#"INSERT INTO arac_km_log ("DeviceId", "License_Plate", "Date", "Mileage") VALUES ($1, $2, $3, $4)"#;

/// Serializes writers of the same device and day until the transaction ends.
const LOCK_DEVICE_DAY: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

const INSERT_IF_ABSENT: &str = r#"
    INSERT INTO arac_km_log ("DeviceId", "License_Plate", "Date", "Mileage")
    SELECT $1, $2, $3, $4
    WHERE NOT EXISTS (
        SELECT 1 FROM arac_km_log WHERE "DeviceId" = $1 AND "Date" = $3
    )
"#;

const COUNT_FOR_DATE: &str = r#"SELECT COUNT(*) FROM arac_km_log WHERE "Date" = $1"#;

const LIST_FOR_DATE: &str = r#"
    SELECT "DeviceId", "License_Plate", "Date", "Mileage", "KayitTarihi"
    FROM arac_km_log
    WHERE "Date" = $1
    ORDER BY "KayitTarihi", "DeviceId"
"#;

/// Repository for the `arac_km_log` table.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use mileage_db::MileageRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(2)
///     .connect("postgresql://localhost/fleet")
///     .await?;
///
/// let repo = MileageRepository::new(pool);
/// repo.health_check().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MileageRepository {
    pool: Pool<Postgres>,
}

impl MileageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the table and index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    /// Number of rows stored for `date`.
    pub async fn count_for_date(&self, date: NaiveDate) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(COUNT_FOR_DATE)
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(count)
    }

    /// Rows stored for `date`, oldest first.
    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<StoredMileage>, AppError> {
        sqlx::query_as(LIST_FOR_DATE)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }
}

impl MileageStore for MileageRepository {
    type Session = PgSession;

    async fn open(&self) -> Result<PgSession, AppError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::ConnectionError(e.to_string()))?;
        debug!("Store session opened");
        Ok(PgSession::new(tx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    RolledBack,
    /// Commit was sent but failed; the server has discarded the transaction.
    CommitFailed,
}

impl SessionState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Committed => "already committed",
            Self::RolledBack => "already rolled back",
            Self::CommitFailed => "aborted by a failed commit",
        }
    }
}

/// One connection with an open transaction, owned by a single sync run.
pub struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
    state: SessionState,
}

impl PgSession {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Some(tx),
            state: SessionState::Open,
        }
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, AppError> {
        match (self.state, self.tx.as_mut()) {
            (SessionState::Open, Some(tx)) => Ok(tx),
            (state, _) => Err(AppError::StoreState(format!(
                "transaction is {}",
                state.describe()
            ))),
        }
    }

    fn take_open_tx(&mut self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.tx()?;
        self.tx
            .take()
            .ok_or_else(|| AppError::StoreState("transaction is missing".to_string()))
    }
}

impl StoreSession for PgSession {
    async fn exists_for_date(&mut self, device_id: &str, date: NaiveDate) -> Result<bool, AppError> {
        let tx = self.tx()?;
        let (exists,): (bool,) = sqlx::query_as(EXISTS_FOR_DATE)
            .bind(device_id)
            .bind(date)
            .fetch_one(&mut **tx)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(exists)
    }

    async fn insert(&mut self, record: &MileageRecord, date: NaiveDate) -> Result<(), AppError> {
        let tx = self.tx()?;
        sqlx::query(INSERT_ROW)
            .bind(&record.device_id)
            .bind(&record.license_plate)
            .bind(date)
            .bind(record.mileage)
            .execute(&mut **tx)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    async fn insert_if_absent(
        &mut self,
        record: &MileageRecord,
        date: NaiveDate,
    ) -> Result<InsertOutcome, AppError> {
        let tx = self.tx()?;
        let key = format!("{}|{}", record.device_id, date);

        sqlx::query(LOCK_DEVICE_DAY)
            .bind(&key)
            .execute(&mut **tx)
            .await
            .map_err(AppError::DatabaseError)?;

        let result = sqlx::query(INSERT_IF_ABSENT)
            .bind(&record.device_id)
            .bind(&record.license_plate)
            .bind(date)
            .bind(record.mileage)
            .execute(&mut **tx)
            .await
            .map_err(AppError::DatabaseError)?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyPresent)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        let tx = self.take_open_tx()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = SessionState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::CommitFailed;
                Err(AppError::DatabaseError(e))
            }
        }
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        if self.state == SessionState::CommitFailed {
            // Nothing left to undo on the server.
            self.state = SessionState::RolledBack;
            return Ok(());
        }
        let tx = self.take_open_tx()?;
        self.state = SessionState::RolledBack;
        tx.rollback().await.map_err(AppError::DatabaseError)
    }

    async fn close(self) {
        if let Some(tx) = self.tx {
            warn!("Store session closed with an open transaction, rolling back");
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback on close failed");
            }
        }
        debug!(state = self.state.describe(), "Store session closed");
    }
}

/// A row of `arac_km_log`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredMileage {
    #[sqlx(rename = "DeviceId")]
    pub device_id: String,
    #[sqlx(rename = "License_Plate")]
    pub license_plate: Option<String>,
    #[sqlx(rename = "Date")]
    pub date: NaiveDate,
    #[sqlx(rename = "Mileage")]
    pub mileage: Option<i64>,
    /// Insertion timestamp assigned by the database.
    #[sqlx(rename = "KayitTarihi")]
    pub recorded_at: DateTime<Utc>,
}

impl StoredMileage {
    pub fn to_record(&self) -> MileageRecord {
        MileageRecord {
            device_id: self.device_id.clone(),
            license_plate: self.license_plate.clone(),
            mileage: self.mileage,
        }
    }
}
