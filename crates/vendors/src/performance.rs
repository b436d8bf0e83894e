use chrono::{DateTime, Utc};
use serde::Serialize;

use vendorhub_core::{DomainResult, PerformanceRecordId, VendorId};

use crate::metrics::PerformanceMetrics;

/// Point-in-time observation of a vendor's metrics.
///
/// Append-only: created by an explicit snapshot action, never mutated, and
/// only removed together with its vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPerformance {
    id: PerformanceRecordId,
    vendor_id: VendorId,
    date: DateTime<Utc>,
    #[serde(flatten)]
    metrics: PerformanceMetrics,
}

impl HistoricalPerformance {
    pub fn record(
        id: PerformanceRecordId,
        vendor_id: VendorId,
        date: DateTime<Utc>,
        metrics: PerformanceMetrics,
    ) -> DomainResult<Self> {
        metrics.validate()?;
        Ok(Self {
            id,
            vendor_id,
            date,
            metrics,
        })
    }

    pub fn id(&self) -> PerformanceRecordId {
        self.id
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }
}

impl core::fmt::Display for HistoricalPerformance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} - {}", self.vendor_id, self.date.format("%Y-%m-%d"))
    }
}
