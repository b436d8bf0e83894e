//! Vendor / purchase-order record store boundary.
//!
//! This module defines the storage collaborator used by [`crate::service`]:
//! vendor CRUD, purchase-order queries by vendor and status, an append-only
//! performance history, and a transactional read-modify-write primitive for
//! single purchase orders.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryVendorRepository;
pub use postgres::PostgresVendorRepository;

use async_trait::async_trait;
use thiserror::Error;

use vendorhub_core::{DomainError, DomainResult, PurchaseOrderId, VendorId};
use vendorhub_vendors::{HistoricalPerformance, PurchaseOrder, PurchaseOrderStatus, Vendor};

/// Change applied to one vendor inside a store transaction.
///
/// The vendor code is immutable: a mutation that changes it is rejected with
/// `Validation`.
pub type VendorMutation = Box<dyn FnOnce(&mut Vendor) -> DomainResult<()> + Send>;

/// Change applied to one purchase order inside a store transaction.
///
/// The closure sees the current persisted state. Returning an error aborts
/// the transaction and leaves the record untouched.
pub type PurchaseOrderMutation = Box<dyn FnOnce(&mut PurchaseOrder) -> DomainResult<()> + Send>;

/// Repository operation error.
///
/// `NotFound`, `Conflict` and `Validation` are deterministic outcomes of the
/// requested operation; `Storage` covers backend failures (connection loss,
/// corrupted rows, poisoned locks).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => RepositoryError::NotFound,
            DomainError::Conflict(msg) => RepositoryError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                RepositoryError::Validation(msg)
            }
        }
    }
}

/// Reject a vendor mutation that changed identity or code.
pub(crate) fn ensure_same_vendor(before: &Vendor, after: &Vendor) -> Result<(), RepositoryError> {
    if before.id_typed() != after.id_typed() {
        return Err(RepositoryError::Validation("vendor id cannot be changed".to_string()));
    }
    if before.vendor_code() != after.vendor_code() {
        return Err(RepositoryError::Validation(
            "vendor_code cannot be changed".to_string(),
        ));
    }
    Ok(())
}

/// Persistent store for vendors, their purchase orders and performance history.
///
/// ## Implementation Requirements
///
/// - `vendor_code` and `po_number` are unique store-wide (`Conflict` otherwise).
/// - Inserting an order or snapshot for an unknown vendor fails with `NotFound`.
/// - Deleting a vendor removes its orders and performance history.
/// - `modify_vendor` / `modify_purchase_order` serialize concurrent calls on
///   the same record: each mutation observes the state committed by the
///   previous one.
/// - Purchase orders are returned ordered by `issue_date`, snapshots by `date`.
#[async_trait]
pub trait VendorRepository: Send + Sync {
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), RepositoryError>;

    async fn get_vendor(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError>;

    async fn get_vendor_by_code(&self, vendor_code: &str)
    -> Result<Option<Vendor>, RepositoryError>;

    async fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError>;

    /// Atomically load, mutate and persist a single vendor.
    async fn modify_vendor(
        &self,
        id: VendorId,
        mutation: VendorMutation,
    ) -> Result<Vendor, RepositoryError>;

    /// Delete a vendor together with its orders and snapshots.
    async fn delete_vendor(&self, id: VendorId) -> Result<(), RepositoryError>;

    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> Result<(), RepositoryError>;

    async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError>;

    async fn get_purchase_order_by_number(
        &self,
        po_number: &str,
    ) -> Result<Option<PurchaseOrder>, RepositoryError>;

    /// Orders of one vendor, optionally restricted to a status.
    async fn list_purchase_orders(
        &self,
        vendor_id: VendorId,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError>;

    async fn delete_purchase_order(&self, id: PurchaseOrderId) -> Result<(), RepositoryError>;

    /// Atomically load, mutate and persist a single purchase order.
    async fn modify_purchase_order(
        &self,
        id: PurchaseOrderId,
        mutation: PurchaseOrderMutation,
    ) -> Result<PurchaseOrder, RepositoryError>;

    async fn append_performance(
        &self,
        record: &HistoricalPerformance,
    ) -> Result<(), RepositoryError>;

    async fn list_performance(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<HistoricalPerformance>, RepositoryError>;
}
