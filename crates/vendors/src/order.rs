use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use vendorhub_core::{DomainError, DomainResult, Entity, PurchaseOrderId, VendorId};

/// Purchase order status lifecycle.
///
/// `Pending` is the only non-terminal state; an order either completes or is
/// canceled, and never moves again afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Completed,
    Canceled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Completed => "completed",
            PurchaseOrderStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PurchaseOrderStatus::Pending)
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PurchaseOrderStatus::Pending),
            "completed" => Ok(PurchaseOrderStatus::Completed),
            "canceled" => Ok(PurchaseOrderStatus::Canceled),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status '{other}' (expected pending, completed or canceled)"
            ))),
        }
    }
}

/// Command: issue a new purchase order to a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePurchaseOrder {
    pub po_number: String,
    pub vendor_id: VendorId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    /// Opaque key-value manifest (must be a JSON object).
    pub items: JsonValue,
    pub quantity: i64,
}

/// Flat representation of a persisted purchase order.
///
/// Storage adapters read rows into this shape and go through
/// [`PurchaseOrder::from_record`], which re-checks the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderRecord {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub vendor_id: VendorId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub items: JsonValue,
    pub quantity: i64,
    pub status: PurchaseOrderStatus,
    pub quality_rating: Option<f64>,
    pub issue_date: DateTime<Utc>,
    pub acknowledgment_date: Option<DateTime<Utc>>,
}

/// Entity: PurchaseOrder.
///
/// Manifest and quantity are fixed at issue time. `delivery_date` holds the
/// expected delivery date until [`record_delivery`](Self::record_delivery)
/// replaces it with the actual one. Every change to the dates re-checks
/// `delivery_date >= order_date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    po_number: String,
    vendor_id: VendorId,
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    items: JsonValue,
    quantity: i64,
    status: PurchaseOrderStatus,
    quality_rating: Option<f64>,
    issue_date: DateTime<Utc>,
    acknowledgment_date: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    /// Issue a new, pending, unacknowledged order stamped with `issue_date`.
    pub fn issue(
        id: PurchaseOrderId,
        cmd: IssuePurchaseOrder,
        issue_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let po_number = cmd.po_number.trim().to_string();
        if po_number.is_empty() {
            return Err(DomainError::validation("po_number cannot be blank"));
        }
        ensure_schedule(cmd.order_date, cmd.delivery_date)?;
        ensure_manifest(&cmd.items, cmd.quantity)?;

        Ok(Self {
            id,
            po_number,
            vendor_id: cmd.vendor_id,
            order_date: cmd.order_date,
            delivery_date: cmd.delivery_date,
            items: cmd.items,
            quantity: cmd.quantity,
            status: PurchaseOrderStatus::Pending,
            quality_rating: None,
            issue_date,
            acknowledgment_date: None,
        })
    }

    /// Rebuild an order from storage, rejecting rows that break invariants.
    pub fn from_record(record: PurchaseOrderRecord) -> DomainResult<Self> {
        if record.po_number.trim().is_empty() {
            return Err(DomainError::validation("po_number cannot be blank"));
        }
        ensure_schedule(record.order_date, record.delivery_date)?;
        ensure_manifest(&record.items, record.quantity)?;
        if let Some(rating) = record.quality_rating {
            if record.status != PurchaseOrderStatus::Completed {
                return Err(DomainError::validation(
                    "quality_rating is only allowed on completed purchase orders",
                ));
            }
            ensure_rating(rating)?;
        }

        Ok(Self {
            id: record.id,
            po_number: record.po_number,
            vendor_id: record.vendor_id,
            order_date: record.order_date,
            delivery_date: record.delivery_date,
            items: record.items,
            quantity: record.quantity,
            status: record.status,
            quality_rating: record.quality_rating,
            issue_date: record.issue_date,
            acknowledgment_date: record.acknowledgment_date,
        })
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn po_number(&self) -> &str {
        &self.po_number
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn delivery_date(&self) -> DateTime<Utc> {
        self.delivery_date
    }

    pub fn items(&self) -> &JsonValue {
        &self.items
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn quality_rating(&self) -> Option<f64> {
        self.quality_rating
    }

    pub fn issue_date(&self) -> DateTime<Utc> {
        self.issue_date
    }

    pub fn acknowledgment_date(&self) -> Option<DateTime<Utc>> {
        self.acknowledgment_date
    }

    pub fn is_completed(&self) -> bool {
        self.status == PurchaseOrderStatus::Completed
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledgment_date.is_some()
    }

    /// Delivered on or before the order date.
    pub fn is_on_time(&self) -> bool {
        self.delivery_date <= self.order_date
    }

    /// Time between issue and acknowledgment, if acknowledged.
    pub fn response_time(&self) -> Option<Duration> {
        self.acknowledgment_date.map(|ack| ack - self.issue_date)
    }

    pub fn complete(&mut self) -> DomainResult<()> {
        self.advance(PurchaseOrderStatus::Completed)
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.advance(PurchaseOrderStatus::Canceled)
    }

    fn advance(&mut self, to: PurchaseOrderStatus) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "purchase order {} is already {}",
                self.po_number, self.status
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Record (or overwrite) the quality rating of a completed order.
    pub fn rate(&mut self, rating: f64) -> DomainResult<()> {
        if !self.is_completed() {
            return Err(DomainError::validation(
                "quality_rating is only allowed on completed purchase orders",
            ));
        }
        ensure_rating(rating)?;
        self.quality_rating = Some(rating);
        Ok(())
    }

    /// Move the expected schedule of a pending order.
    pub fn reschedule(
        &mut self,
        order_date: DateTime<Utc>,
        delivery_date: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(format!(
                "purchase order {} is {} and can no longer be rescheduled",
                self.po_number, self.status
            )));
        }
        ensure_schedule(order_date, delivery_date)?;
        self.order_date = order_date;
        self.delivery_date = delivery_date;
        Ok(())
    }

    /// Record the actual delivery date. Canceled orders were never delivered.
    pub fn record_delivery(&mut self, delivered_at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == PurchaseOrderStatus::Canceled {
            return Err(DomainError::conflict(format!(
                "purchase order {} is canceled",
                self.po_number
            )));
        }
        ensure_schedule(self.order_date, delivered_at)?;
        self.delivery_date = delivered_at;
        Ok(())
    }

    /// Unacknowledged -> acknowledged.
    ///
    /// Fails with `Conflict` (leaving the existing date untouched) when the
    /// order was already acknowledged. The stored instant never precedes
    /// `issue_date`.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) -> DomainResult<DateTime<Utc>> {
        if let Some(existing) = self.acknowledgment_date {
            return Err(DomainError::conflict(format!(
                "purchase order {} already acknowledged at {}",
                self.po_number,
                existing.to_rfc3339()
            )));
        }
        let at = at.max(self.issue_date);
        self.acknowledgment_date = Some(at);
        Ok(at)
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn business_key(&self) -> &str {
        &self.po_number
    }
}

fn ensure_schedule(order_date: DateTime<Utc>, delivery_date: DateTime<Utc>) -> DomainResult<()> {
    if delivery_date < order_date {
        return Err(DomainError::validation(
            "delivery date cannot be earlier than the order date",
        ));
    }
    Ok(())
}

fn ensure_manifest(items: &JsonValue, quantity: i64) -> DomainResult<()> {
    if !items.is_object() {
        return Err(DomainError::validation("items must be a JSON object"));
    }
    if quantity < 0 {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    Ok(())
}

fn ensure_rating(rating: f64) -> DomainResult<()> {
    if !rating.is_finite() || rating < 0.0 {
        return Err(DomainError::validation(
            "quality_rating must be a finite, non-negative number",
        ));
    }
    Ok(())
}
