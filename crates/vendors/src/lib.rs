//! Vendor domain module (vendors, purchase orders, performance metrics).
//!
//! This crate contains business rules for vendor performance tracking,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod metrics;
pub mod order;
pub mod performance;
pub mod vendor;

pub use metrics::PerformanceMetrics;
pub use order::{
    IssuePurchaseOrder, PurchaseOrder, PurchaseOrderRecord, PurchaseOrderStatus,
};
pub use performance::HistoricalPerformance;
pub use vendor::{RegisterVendor, UpdateVendorDetails, Vendor};
