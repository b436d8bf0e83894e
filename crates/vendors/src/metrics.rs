//! Vendor performance metrics.
//!
//! Every metric is a pure function over a read-only slice of one vendor's
//! purchase orders. Nothing is cached: callers re-derive metrics from current
//! order data on every query. A ratio over an empty denominator is `0.0`, so
//! results are always finite.

use serde::{Deserialize, Serialize};

use vendorhub_core::{DomainError, DomainResult, ValueObject};

use crate::order::PurchaseOrder;

/// The four derived metrics of a vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Percent of completed orders delivered on or before the order date.
    pub on_time_delivery_rate: f64,
    /// Mean quality rating of rated, completed orders.
    pub quality_rating_avg: f64,
    /// Mean seconds between issue and acknowledgment.
    pub average_response_time: f64,
    /// Percent of all orders that are completed.
    pub fulfillment_rate: f64,
}

impl ValueObject for PerformanceMetrics {}

impl PerformanceMetrics {
    /// Check values supplied from outside the calculator (e.g. a manually
    /// recorded snapshot).
    pub fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("on_time_delivery_rate", self.on_time_delivery_rate, true),
            ("quality_rating_avg", self.quality_rating_avg, false),
            ("average_response_time", self.average_response_time, false),
            ("fulfillment_rate", self.fulfillment_rate, true),
        ];
        for (name, value, is_rate) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "{name} must be a finite, non-negative number"
                )));
            }
            if is_rate && value > 100.0 {
                return Err(DomainError::validation(format!(
                    "{name} is a percentage and cannot exceed 100"
                )));
            }
        }
        Ok(())
    }
}

/// Compute all four metrics for one vendor's orders.
pub fn compute(orders: &[PurchaseOrder]) -> PerformanceMetrics {
    PerformanceMetrics {
        on_time_delivery_rate: on_time_delivery_rate(orders),
        quality_rating_avg: quality_rating_avg(orders),
        average_response_time: average_response_time(orders),
        fulfillment_rate: fulfillment_rate(orders),
    }
}

pub fn on_time_delivery_rate(orders: &[PurchaseOrder]) -> f64 {
    let completed = orders.iter().filter(|o| o.is_completed());
    let (total, on_time) = completed.fold((0usize, 0usize), |(total, on_time), o| {
        (total + 1, on_time + usize::from(o.is_on_time()))
    });
    percentage(on_time, total)
}

pub fn quality_rating_avg(orders: &[PurchaseOrder]) -> f64 {
    mean(
        orders
            .iter()
            .filter(|o| o.is_completed())
            .filter_map(|o| o.quality_rating()),
    )
}

/// Includes acknowledged orders of any status, not only completed ones.
pub fn average_response_time(orders: &[PurchaseOrder]) -> f64 {
    mean(
        orders
            .iter()
            .filter_map(|o| o.response_time())
            .map(|d| d.num_milliseconds() as f64 / 1000.0),
    )
}

pub fn fulfillment_rate(orders: &[PurchaseOrder]) -> f64 {
    let completed = orders.iter().filter(|o| o.is_completed()).count();
    percentage(completed, orders.len())
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}
