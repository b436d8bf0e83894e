//! Vendor application service.
//!
//! `VendorService` composes a [`VendorRepository`] and a [`Clock`]. Domain
//! rules live in `vendorhub-vendors`; this layer loads records, applies the
//! rules, persists the result and maps failures into [`ServiceError`].
//!
//! Record mutations (vendor details; purchase-order schedule, delivery,
//! status, rating and acknowledgment) go through
//! [`VendorRepository::modify_vendor`] and
//! [`VendorRepository::modify_purchase_order`], so the check and the write
//! happen inside one store transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use vendorhub_core::{DomainError, PerformanceRecordId, PurchaseOrderId, VendorId};
use vendorhub_vendors::{
    HistoricalPerformance, IssuePurchaseOrder, PerformanceMetrics, PurchaseOrder,
    PurchaseOrderStatus, RegisterVendor, UpdateVendorDetails, Vendor, metrics,
};

use crate::clock::{Clock, SystemClock};
use crate::repository::{PurchaseOrderMutation, RepositoryError, VendorRepository};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(msg),
            RepositoryError::Storage(msg) => ServiceError::Storage(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct VendorService {
    repo: Arc<dyn VendorRepository>,
    clock: Arc<dyn Clock>,
}

impl VendorService {
    pub fn new(repo: Arc<dyn VendorRepository>) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Arc<dyn VendorRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    // Vendors

    #[instrument(skip(self, cmd), fields(vendor_code = %cmd.vendor_code), err)]
    pub async fn register_vendor(&self, cmd: RegisterVendor) -> ServiceResult<Vendor> {
        let vendor = Vendor::register(VendorId::new(), cmd)?;
        self.repo.insert_vendor(&vendor).await?;
        tracing::info!(vendor_id = %vendor.id_typed(), "vendor registered");
        Ok(vendor)
    }

    #[instrument(skip(self, update), fields(vendor_id = %id), err)]
    pub async fn update_vendor_details(
        &self,
        id: VendorId,
        update: UpdateVendorDetails,
    ) -> ServiceResult<Vendor> {
        let vendor = self
            .repo
            .modify_vendor(id, Box::new(move |v: &mut Vendor| v.update_details(update)))
            .await?;
        tracing::info!("vendor details updated");
        Ok(vendor)
    }

    pub async fn get_vendor(&self, id: VendorId) -> ServiceResult<Vendor> {
        self.require_vendor(id).await
    }

    pub async fn list_vendors(&self) -> ServiceResult<Vec<Vendor>> {
        Ok(self.repo.list_vendors().await?)
    }

    /// Delete a vendor with all of its purchase orders and snapshots.
    #[instrument(skip(self), fields(vendor_id = %id), err)]
    pub async fn delete_vendor(&self, id: VendorId) -> ServiceResult<()> {
        self.repo.delete_vendor(id).await?;
        tracing::info!("vendor deleted");
        Ok(())
    }

    // Purchase orders

    /// Issue a new purchase order, stamping `issue_date` from the clock.
    #[instrument(
        skip(self, cmd),
        fields(vendor_id = %cmd.vendor_id, po_number = %cmd.po_number),
        err
    )]
    pub async fn issue_purchase_order(
        &self,
        cmd: IssuePurchaseOrder,
    ) -> ServiceResult<PurchaseOrder> {
        self.require_vendor(cmd.vendor_id).await?;

        let order = PurchaseOrder::issue(PurchaseOrderId::new(), cmd, self.clock.now())
            .inspect_err(|e| tracing::debug!(error = %e, "purchase order rejected"))?;
        self.repo.insert_purchase_order(&order).await?;
        tracing::info!(purchase_order_id = %order.id_typed(), "purchase order issued");
        Ok(order)
    }

    pub async fn get_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.repo
            .get_purchase_order(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Orders of one vendor, optionally filtered by status.
    pub async fn list_purchase_orders(
        &self,
        vendor_id: VendorId,
        status: Option<PurchaseOrderStatus>,
    ) -> ServiceResult<Vec<PurchaseOrder>> {
        self.require_vendor(vendor_id).await?;
        Ok(self.repo.list_purchase_orders(vendor_id, status).await?)
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn delete_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<()> {
        self.repo.delete_purchase_order(id).await?;
        tracing::info!("purchase order deleted");
        Ok(())
    }

    /// Move the expected schedule of a pending order.
    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn reschedule_purchase_order(
        &self,
        id: PurchaseOrderId,
        order_date: DateTime<Utc>,
        delivery_date: DateTime<Utc>,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify(
            id,
            "rescheduled",
            Box::new(move |o: &mut PurchaseOrder| o.reschedule(order_date, delivery_date)),
        )
        .await
    }

    /// Replace the expected delivery date with the actual one.
    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn record_delivery(
        &self,
        id: PurchaseOrderId,
        delivered_at: DateTime<Utc>,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify(
            id,
            "updated",
            Box::new(move |o: &mut PurchaseOrder| o.record_delivery(delivered_at)),
        )
        .await
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn complete_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify(id, "completed", Box::new(|o: &mut PurchaseOrder| o.complete()))
            .await
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn cancel_purchase_order(&self, id: PurchaseOrderId) -> ServiceResult<PurchaseOrder> {
        self.modify(id, "canceled", Box::new(|o: &mut PurchaseOrder| o.cancel()))
            .await
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn rate_purchase_order(
        &self,
        id: PurchaseOrderId,
        rating: f64,
    ) -> ServiceResult<PurchaseOrder> {
        self.modify(
            id,
            "rated",
            Box::new(move |o: &mut PurchaseOrder| o.rate(rating)),
        )
        .await
    }

    /// Record that the vendor acknowledged the order at the clock's current time.
    ///
    /// A clock reading earlier than the order's `issue_date` is stored as
    /// `issue_date`, so response times are never negative.
    ///
    /// Fails with `NotFound` for an unknown order and `Conflict` when the order
    /// is already acknowledged; in both cases nothing is written. Concurrent
    /// calls on one order yield exactly one success.
    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    pub async fn acknowledge_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> ServiceResult<PurchaseOrder> {
        let now = self.clock.now();
        self.modify(
            id,
            "acknowledged",
            Box::new(move |o: &mut PurchaseOrder| o.acknowledge(now).map(|_| ())),
        )
        .await
    }

    async fn modify(
        &self,
        id: PurchaseOrderId,
        action: &'static str,
        mutation: PurchaseOrderMutation,
    ) -> ServiceResult<PurchaseOrder> {
        match self.repo.modify_purchase_order(id, mutation).await {
            Ok(order) => {
                tracing::info!(status = %order.status(), "purchase order {action}");
                Ok(order)
            }
            Err(RepositoryError::Conflict(msg)) => {
                tracing::warn!(reason = %msg, "purchase order not {action}");
                Err(ServiceError::Conflict(msg))
            }
            Err(RepositoryError::Validation(msg)) => {
                tracing::debug!(reason = %msg, "purchase order not {action}");
                Err(ServiceError::Validation(msg))
            }
            Err(other) => Err(other.into()),
        }
    }

    // Performance

    /// Current performance metrics over the vendor's full order history.
    #[instrument(skip(self), fields(vendor_id = %vendor_id), err)]
    pub async fn compute_metrics(&self, vendor_id: VendorId) -> ServiceResult<PerformanceMetrics> {
        self.require_vendor(vendor_id).await?;
        let orders = self.repo.list_purchase_orders(vendor_id, None).await?;
        let metrics = metrics::compute(&orders);
        tracing::debug!(order_count = orders.len(), ?metrics, "metrics computed");
        Ok(metrics)
    }

    /// Store a snapshot with caller-supplied values.
    #[instrument(skip(self, metrics), fields(vendor_id = %vendor_id), err)]
    pub async fn record_performance(
        &self,
        vendor_id: VendorId,
        date: DateTime<Utc>,
        metrics: PerformanceMetrics,
    ) -> ServiceResult<HistoricalPerformance> {
        let record =
            HistoricalPerformance::record(PerformanceRecordId::new(), vendor_id, date, metrics)?;
        self.repo.append_performance(&record).await?;
        tracing::info!(record_id = %record.id(), "performance snapshot recorded");
        Ok(record)
    }

    /// Snapshot the vendor's current metrics, dated now.
    #[instrument(skip(self), fields(vendor_id = %vendor_id), err)]
    pub async fn capture_performance(
        &self,
        vendor_id: VendorId,
    ) -> ServiceResult<HistoricalPerformance> {
        let metrics = self.compute_metrics(vendor_id).await?;
        self.record_performance(vendor_id, self.clock.now(), metrics)
            .await
    }

    pub async fn performance_history(
        &self,
        vendor_id: VendorId,
    ) -> ServiceResult<Vec<HistoricalPerformance>> {
        self.require_vendor(vendor_id).await?;
        Ok(self.repo.list_performance(vendor_id).await?)
    }

    async fn require_vendor(&self, id: VendorId) -> ServiceResult<Vendor> {
        self.repo.get_vendor(id).await?.ok_or(ServiceError::NotFound)
    }
}
