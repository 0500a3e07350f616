//! Row types for the persistence store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Anonymous,
    Free,
    Starter,
    Growth,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Anonymous => "anonymous",
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Growth => "growth",
            Tier::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s {
            "anonymous" => Some(Tier::Anonymous),
            "free" => Some(Tier::Free),
            "starter" => Some(Tier::Starter),
            "growth" => Some(Tier::Growth),
            "enterprise" => Some(Tier::Enterprise),
            _ => None,
        }
    }

    /// Monthly credit allowance granted on subscription.
    pub fn credit_allowance(&self) -> i64 {
        match self {
            Tier::Anonymous => 0,
            Tier::Free => 100,
            Tier::Starter => 1000,
            Tier::Growth => 5000,
            Tier::Enterprise => 50_000,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub tier: String,
    pub credits: i64,
    pub payment_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl UserRow {
    pub fn tier(&self) -> Tier {
        Tier::parse(&self.tier).unwrap_or(Tier::Free)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: String,
    pub source: String,
    pub company_name: Option<String>,
    pub analysis_kind: String,
    pub industry_sector: Option<String>,
    pub reporting_period: Option<String>,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
    /// Full result graph as returned to the client.
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Activity log entry. Append-only.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Event kinds recorded to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Register,
    Analyze,
    Compare,
    Export,
    Subscribe,
    RateLimitHit,
    CreditDenied,
    CreditRefund,
}

impl ActivityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityEvent::Register => "register",
            ActivityEvent::Analyze => "analyze",
            ActivityEvent::Compare => "compare",
            ActivityEvent::Export => "export",
            ActivityEvent::Subscribe => "subscribe",
            ActivityEvent::RateLimitHit => "rate_limit_hit",
            ActivityEvent::CreditDenied => "credit_denied",
            ActivityEvent::CreditRefund => "credit_refund",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CompanyRow {
    pub name: String,
    pub industry_sector: Option<String>,
    pub latest_analysis_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Sector (or global) score baseline used by compare and benchmark.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ScoreBaseline {
    pub environmental: Option<f64>,
    pub social: Option<f64>,
    pub governance: Option<f64>,
    pub overall: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_roundtrip_and_order() {
        for tier in [
            Tier::Anonymous,
            Tier::Free,
            Tier::Starter,
            Tier::Growth,
            Tier::Enterprise,
        ] {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert!(Tier::Enterprise > Tier::Free);
        assert_eq!(Tier::parse("platinum"), None);
    }

    #[test]
    fn test_credit_allowances() {
        assert_eq!(Tier::Free.credit_allowance(), 100);
        assert_eq!(Tier::Starter.credit_allowance(), 1000);
        assert_eq!(Tier::Growth.credit_allowance(), 5000);
        assert_eq!(Tier::Enterprise.credit_allowance(), 50_000);
        assert_eq!(Tier::Anonymous.credit_allowance(), 0);
    }

    #[test]
    fn test_activity_event_names() {
        assert_eq!(ActivityEvent::RateLimitHit.as_str(), "rate_limit_hit");
        assert_eq!(ActivityEvent::CreditRefund.as_str(), "credit_refund");
    }
}
