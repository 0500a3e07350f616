use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::acquire::Fetcher;
use crate::billing::PaymentProcessor;
use crate::cache::{AnalysisCache, SingleFlight};
use crate::config::Config;
use crate::governor::Governor;
use crate::scoring::SentimentProvider;
use crate::store::PgStore;
use crate::telemetry::ApiMetrics;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub cache: AnalysisCache,
    pub single_flight: Arc<SingleFlight>,
    pub fetcher: Arc<Fetcher>,
    pub governor: Arc<Governor>,
    /// Optional external collaborator; the default counts polarity keywords.
    pub sentiment: Arc<dyn SentimentProvider>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub metrics: Arc<ApiMetrics>,
    pub config: Arc<Config>,
    pub start_time: DateTime<Utc>,
}
