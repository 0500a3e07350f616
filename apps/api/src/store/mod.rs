//! Persistence Store — indexed Postgres repository for users, analyses,
//! companies, and the activity log.
//!
//! All operations run under a 5 s budget with bounded retries on transient
//! errors. Credit mutation happens only through [`PgStore::update_user_credits`],
//! whose check-and-decrement is a single atomic statement.

pub mod models;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use models::{ActivityEvent, AnalysisRow, ScoreBaseline, UserRow};

/// Budget for one persistence operation including retries.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff schedule for transient failures.
const RETRY_DELAYS_MS: [u64; 3] = [100, 500, 1500];

/// Outcome of an atomic credit adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// New balance after the adjustment.
    Updated(i64),
    /// Balance would have gone negative; unchanged balance returned.
    Insufficient(i64),
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    /// Create tables and the indexes the query paths rely on. Idempotent.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        const STATEMENTS: &[&str] = &[
            r#"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                tier TEXT NOT NULL DEFAULT 'free',
                credits BIGINT NOT NULL DEFAULT 0 CHECK (credits >= 0),
                payment_customer_id TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_seen_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
            r#"CREATE TABLE IF NOT EXISTS analyses (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                source TEXT NOT NULL,
                company_name TEXT,
                analysis_kind TEXT NOT NULL,
                industry_sector TEXT,
                reporting_period TEXT,
                environmental DOUBLE PRECISION NOT NULL,
                social DOUBLE PRECISION NOT NULL,
                governance DOUBLE PRECISION NOT NULL,
                overall DOUBLE PRECISION NOT NULL,
                result JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_analyses_user_created \
                ON analyses (user_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_analyses_company_created \
                ON analyses (company_name, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_analyses_sector_overall \
                ON analyses (industry_sector, overall DESC)",
            r#"CREATE TABLE IF NOT EXISTS activity (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL,
                event TEXT NOT NULL,
                payload JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_activity_user_event_time \
                ON activity (user_id, event, created_at)",
            r#"CREATE TABLE IF NOT EXISTS companies (
                name TEXT PRIMARY KEY,
                industry_sector TEXT,
                latest_analysis_id UUID,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
        ];
        for statement in STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────────

    /// Create a user, or refresh `last_seen_at` if the email is already
    /// registered. Registration is idempotent.
    pub async fn create_user(
        &self,
        id: &str,
        email: &str,
        credits: i64,
    ) -> Result<UserRow, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (id, email, tier, credits)
                VALUES ($1, $2, 'free', $3)
                ON CONFLICT (id) DO UPDATE SET last_seen_at = now()
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(email)
            .bind(credits)
            .fetch_one(&self.pool)
            .await
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserRow>, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
        })
        .await
    }

    /// Atomically adjust a user's balance. A debit that would go negative
    /// leaves the balance untouched and reports `Insufficient`.
    pub async fn update_user_credits(
        &self,
        user_id: &str,
        delta: i64,
    ) -> Result<CreditOutcome, AppError> {
        let updated: Option<i64> = self
            .run(|| async {
                sqlx::query_scalar(
                    r#"
                    UPDATE users
                    SET credits = credits + $2, last_seen_at = now()
                    WHERE id = $1 AND credits + $2 >= 0
                    RETURNING credits
                    "#,
                )
                .bind(user_id)
                .bind(delta)
                .fetch_optional(&self.pool)
                .await
            })
            .await?;

        match updated {
            Some(balance) => Ok(CreditOutcome::Updated(balance)),
            None => {
                let balance = self
                    .get_user(user_id)
                    .await?
                    .map(|u| u.credits)
                    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
                Ok(CreditOutcome::Insufficient(balance))
            }
        }
    }

    /// Subscription path: set tier, reset the balance to the tier's
    /// allowance, and record the external payment customer id.
    pub async fn set_user_subscription(
        &self,
        user_id: &str,
        tier: &str,
        credits: i64,
        payment_customer_id: &str,
    ) -> Result<UserRow, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, UserRow>(
                r#"
                UPDATE users
                SET tier = $2, credits = $3, payment_customer_id = $4, last_seen_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(tier)
            .bind(credits)
            .bind(payment_customer_id)
            .fetch_one(&self.pool)
            .await
        })
        .await
    }

    // ── Analyses ────────────────────────────────────────────────────────

    pub async fn insert_analysis(&self, row: &AnalysisRow) -> Result<(), AppError> {
        self.run(|| async {
            sqlx::query(
                r#"
                INSERT INTO analyses
                    (id, user_id, source, company_name, analysis_kind,
                     industry_sector, reporting_period,
                     environmental, social, governance, overall, result, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(row.id)
            .bind(&row.user_id)
            .bind(&row.source)
            .bind(&row.company_name)
            .bind(&row.analysis_kind)
            .bind(&row.industry_sector)
            .bind(&row.reporting_period)
            .bind(row.environmental)
            .bind(row.social)
            .bind(row.governance)
            .bind(row.overall)
            .bind(&row.result)
            .bind(row.created_at)
            .execute(&self.pool)
            .await
            .map(|_| ())
        })
        .await
    }

    /// Owner-scoped lookup. A mismatching owner is indistinguishable from a
    /// missing row, so existence never leaks.
    pub async fn get_analysis(
        &self,
        user_id: &str,
        analysis_id: Uuid,
    ) -> Result<Option<AnalysisRow>, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, AnalysisRow>(
                "SELECT * FROM analyses WHERE id = $1 AND user_id = $2",
            )
            .bind(analysis_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
        })
        .await
    }

    pub async fn list_analyses_by_user(
        &self,
        user_id: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<AnalysisRow>, AppError> {
        let offset = page.max(0) * page_size;
        self.run(|| async {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT * FROM analyses
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(user_id)
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        })
        .await
    }

    /// Latest analysis for a company, shared read across users.
    pub async fn latest_analysis_for_company(
        &self,
        company_name: &str,
    ) -> Result<Option<AnalysisRow>, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT * FROM analyses
                WHERE lower(company_name) = lower($1)
                ORDER BY created_at DESC
                LIMIT 1
                "#,
            )
            .bind(company_name)
            .fetch_optional(&self.pool)
            .await
        })
        .await
    }

    /// Recent analyses for a company, oldest first.
    pub async fn company_history(
        &self,
        company_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnalysisRow>, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT * FROM analyses
                WHERE lower(company_name) = lower($1) AND created_at >= $2
                ORDER BY created_at ASC
                "#,
            )
            .bind(company_name)
            .bind(since)
            .fetch_all(&self.pool)
            .await
        })
        .await
    }

    /// Last N analyses for a company, newest first; used for trend tags.
    pub async fn recent_company_scores(
        &self,
        company_name: &str,
        limit: i64,
    ) -> Result<Vec<AnalysisRow>, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, AnalysisRow>(
                r#"
                SELECT * FROM analyses
                WHERE lower(company_name) = lower($1)
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(company_name)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        })
        .await
    }

    pub async fn upsert_company(
        &self,
        name: &str,
        industry_sector: Option<&str>,
        latest_analysis_id: Uuid,
    ) -> Result<(), AppError> {
        self.run(|| async {
            sqlx::query(
                r#"
                INSERT INTO companies (name, industry_sector, latest_analysis_id, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (name) DO UPDATE
                    SET industry_sector = COALESCE(EXCLUDED.industry_sector, companies.industry_sector),
                        latest_analysis_id = EXCLUDED.latest_analysis_id,
                        updated_at = now()
                "#,
            )
            .bind(name)
            .bind(industry_sector)
            .bind(latest_analysis_id)
            .execute(&self.pool)
            .await
            .map(|_| ())
        })
        .await
    }

    /// Median scores across the sector's analyses, or globally when no
    /// sector is given. `None` fields mean no data.
    pub async fn aggregate_benchmark(
        &self,
        sector: Option<&str>,
    ) -> Result<ScoreBaseline, AppError> {
        self.run(|| async {
            sqlx::query_as::<_, ScoreBaseline>(
                r#"
                SELECT
                    percentile_cont(0.5) WITHIN GROUP (ORDER BY environmental) AS environmental,
                    percentile_cont(0.5) WITHIN GROUP (ORDER BY social) AS social,
                    percentile_cont(0.5) WITHIN GROUP (ORDER BY governance) AS governance,
                    percentile_cont(0.5) WITHIN GROUP (ORDER BY overall) AS overall
                FROM analyses
                WHERE $1::text IS NULL OR lower(industry_sector) = lower($1)
                "#,
            )
            .bind(sector)
            .fetch_one(&self.pool)
            .await
        })
        .await
    }

    // ── Activity ────────────────────────────────────────────────────────

    /// Append an activity record. Activity is advisory: failures are
    /// logged, never propagated to the caller.
    pub async fn record_activity(
        &self,
        user_id: &str,
        event: ActivityEvent,
        payload: serde_json::Value,
    ) {
        let result = self
            .run(|| async {
                sqlx::query("INSERT INTO activity (user_id, event, payload) VALUES ($1, $2, $3)")
                    .bind(user_id)
                    .bind(event.as_str())
                    .bind(&payload)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
            })
            .await;
        if let Err(e) = result {
            warn!(user_id, event = event.as_str(), error = %e, "Activity write failed");
        }
    }

    /// Credits consumed by this user since the start of the current month.
    pub async fn monthly_credits_used(&self, user_id: &str) -> Result<i64, AppError> {
        self.run(|| async {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM((payload->>'credits_used')::bigint), 0)
                FROM activity
                WHERE user_id = $1
                  AND event = 'analyze'
                  AND created_at >= date_trunc('month', now())
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
        })
        .await
    }

    /// Liveness probe for health reporting.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // ── Execution helpers ───────────────────────────────────────────────

    /// Run an operation under the persistence timeout with bounded retries
    /// on transient errors.
    async fn run<T, F, Fut>(&self, op: F) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let attempt_all = async {
            let mut last_err = None;
            for (attempt, delay_ms) in std::iter::once(&0u64)
                .chain(RETRY_DELAYS_MS.iter())
                .enumerate()
            {
                if *delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                }
                match op().await {
                    Ok(value) => return Ok(value),
                    Err(e) if is_transient(&e) && attempt < RETRY_DELAYS_MS.len() => {
                        warn!(attempt, error = %e, "Transient persistence error; retrying");
                        last_err = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(last_err.unwrap_or(sqlx::Error::PoolTimedOut))
        };

        match tokio::time::timeout(OP_TIMEOUT, attempt_all).await {
            Ok(result) => result.map_err(AppError::Database),
            Err(_) => Err(AppError::Database(sqlx::Error::PoolTimedOut)),
        }
    }
}

/// Transient errors are worth retrying; constraint violations and the like
/// are not.
fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_retry_schedule_shape() {
        assert_eq!(RETRY_DELAYS_MS, [100, 500, 1500]);
        assert_eq!(OP_TIMEOUT, Duration::from_secs(5));
    }
}
