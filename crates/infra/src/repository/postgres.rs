//! Postgres-backed vendor repository.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | RepositoryError | Scenario |
//! |----------------------|-----------------|----------|
//! | `23505` (unique violation) | `Conflict` | duplicate `vendor_code` / `po_number` / id |
//! | `23503` (foreign key violation) | `NotFound` | order or snapshot for an unknown vendor |
//! | `23514` (check violation) | `Validation` | e.g. `delivery_date < order_date` |
//! | any other / pool / network | `Storage` | |
//!
//! ## Acknowledgment atomicity
//!
//! `modify_vendor` and `modify_purchase_order` lock the row with
//! `SELECT ... FOR UPDATE` inside a transaction, so concurrent mutations of
//! one record are serialized. The
//! write-back uses `COALESCE(acknowledgment_date, $n)`, so a stored
//! acknowledgment date can never be replaced.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use vendorhub_core::{PerformanceRecordId, PurchaseOrderId, VendorId};
use vendorhub_vendors::{
    HistoricalPerformance, PerformanceMetrics, PurchaseOrder, PurchaseOrderRecord,
    PurchaseOrderStatus, Vendor,
};

use super::{
    PurchaseOrderMutation, RepositoryError, VendorMutation, VendorRepository, ensure_same_vendor,
};

const SCHEMA: &str = include_str!("schema.sql");

const PURCHASE_ORDER_COLUMNS: &str = r#"
    id,
    po_number,
    vendor_id,
    order_date,
    delivery_date,
    items,
    quantity,
    status,
    quality_rating,
    issue_date,
    acknowledgment_date
"#;

/// Postgres-backed vendor repository.
///
/// Uses the SQLx connection pool, which is `Send + Sync`. Cascade deletes are
/// enforced by `ON DELETE CASCADE` foreign keys; the delivery-date invariant
/// is additionally enforced by a CHECK constraint.
#[derive(Debug, Clone)]
pub struct PostgresVendorRepository {
    pool: Arc<PgPool>,
}

impl PostgresVendorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch_purchase_orders(
        &self,
        operation: &str,
        sql: &str,
        vendor_id: VendorId,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let mut query = sqlx::query(sql).bind(vendor_id.as_uuid());
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.iter().map(purchase_order_from_row).collect()
    }
}

#[async_trait]
impl VendorRepository for PostgresVendorRepository {
    #[instrument(skip(self, vendor), fields(vendor_id = %vendor.id_typed()), err)]
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO vendors (id, vendor_code, name, contact_details, address)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(vendor.id_typed().as_uuid())
        .bind(vendor.vendor_code())
        .bind(vendor.name())
        .bind(vendor.contact_details())
        .bind(vendor.address())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_vendor", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(vendor_id = %id), err)]
    async fn get_vendor(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, vendor_code, name, contact_details, address
            FROM vendors
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_vendor", e))?;

        row.as_ref().map(vendor_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_vendor_by_code(
        &self,
        vendor_code: &str,
    ) -> Result<Option<Vendor>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, vendor_code, name, contact_details, address
            FROM vendors
            WHERE vendor_code = $1
            "#,
        )
        .bind(vendor_code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_vendor_by_code", e))?;

        row.as_ref().map(vendor_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, vendor_code, name, contact_details, address
            FROM vendors
            ORDER BY vendor_code ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_vendors", e))?;

        rows.iter().map(vendor_from_row).collect()
    }

    #[instrument(skip(self, mutation), fields(vendor_id = %id), err)]
    async fn modify_vendor(
        &self,
        id: VendorId,
        mutation: VendorMutation,
    ) -> Result<Vendor, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT id, vendor_code, name, contact_details, address
            FROM vendors
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_vendor", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RepositoryError::NotFound);
        };

        let stored = vendor_from_row(&row)?;
        let mut vendor = stored.clone();
        let applied = mutation(&mut vendor)
            .map_err(RepositoryError::from)
            .and_then(|()| ensure_same_vendor(&stored, &vendor));
        if let Err(e) = applied {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(e);
        }

        sqlx::query(
            r#"
            UPDATE vendors
            SET name = $2, contact_details = $3, address = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(vendor.name())
        .bind(vendor.contact_details())
        .bind(vendor.address())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_vendor", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(vendor)
    }

    #[instrument(skip(self), fields(vendor_id = %id), err)]
    async fn delete_vendor(&self, id: VendorId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_vendor", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(
        skip(self, order),
        fields(purchase_order_id = %order.id_typed(), vendor_id = %order.vendor_id()),
        err
    )]
    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id,
                po_number,
                vendor_id,
                order_date,
                delivery_date,
                items,
                quantity,
                status,
                quality_rating,
                issue_date,
                acknowledgment_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.po_number())
        .bind(order.vendor_id().as_uuid())
        .bind(order.order_date())
        .bind(order.delivery_date())
        .bind(order.items())
        .bind(order.quantity())
        .bind(order.status().as_str())
        .bind(order.quality_rating())
        .bind(order.issue_date())
        .bind(order.acknowledgment_date())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        let sql = format!("SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_purchase_order", e))?;

        row.as_ref().map(purchase_order_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_purchase_order_by_number(
        &self,
        po_number: &str,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        let sql =
            format!("SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE po_number = $1");
        let row = sqlx::query(&sql)
            .bind(po_number)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_purchase_order_by_number", e))?;

        row.as_ref().map(purchase_order_from_row).transpose()
    }

    #[instrument(skip(self), fields(vendor_id = %vendor_id, status = ?status), err)]
    async fn list_purchase_orders(
        &self,
        vendor_id: VendorId,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let sql = match status {
            Some(_) => format!(
                "SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders \
                 WHERE vendor_id = $1 AND status = $2 ORDER BY issue_date ASC, id ASC"
            ),
            None => format!(
                "SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders \
                 WHERE vendor_id = $1 ORDER BY issue_date ASC, id ASC"
            ),
        };
        self.fetch_purchase_orders("list_purchase_orders", &sql, vendor_id, status)
            .await
    }

    #[instrument(skip(self), fields(purchase_order_id = %id), err)]
    async fn delete_purchase_order(&self, id: PurchaseOrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_purchase_order", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, mutation), fields(purchase_order_id = %id), err)]
    async fn modify_purchase_order(
        &self,
        id: PurchaseOrderId,
        mutation: PurchaseOrderMutation,
    ) -> Result<PurchaseOrder, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sql = format!(
            "SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_purchase_order", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RepositoryError::NotFound);
        };

        let mut order = purchase_order_from_row(&row)?;
        if let Err(e) = mutation(&mut order) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(e.into());
        }

        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET
                order_date = $2,
                delivery_date = $3,
                status = $4,
                quality_rating = $5,
                acknowledgment_date = COALESCE(acknowledgment_date, $6)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(order.order_date())
        .bind(order.delivery_date())
        .bind(order.status().as_str())
        .bind(order.quality_rating())
        .bind(order.acknowledgment_date())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_purchase_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(order)
    }

    #[instrument(
        skip(self, record),
        fields(record_id = %record.id(), vendor_id = %record.vendor_id()),
        err
    )]
    async fn append_performance(
        &self,
        record: &HistoricalPerformance,
    ) -> Result<(), RepositoryError> {
        let metrics = record.metrics();
        sqlx::query(
            r#"
            INSERT INTO historical_performance (
                id,
                vendor_id,
                date,
                on_time_delivery_rate,
                quality_rating_avg,
                average_response_time,
                fulfillment_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.vendor_id().as_uuid())
        .bind(record.date())
        .bind(metrics.on_time_delivery_rate)
        .bind(metrics.quality_rating_avg)
        .bind(metrics.average_response_time)
        .bind(metrics.fulfillment_rate)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_performance", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(vendor_id = %vendor_id), err)]
    async fn list_performance(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<HistoricalPerformance>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                vendor_id,
                date,
                on_time_delivery_rate,
                quality_rating_avg,
                average_response_time,
                fulfillment_rate
            FROM historical_performance
            WHERE vendor_id = $1
            ORDER BY date ASC, id ASC
            "#,
        )
        .bind(vendor_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_performance", e))?;

        rows.iter()
            .map(|row| {
                let row = PerformanceRow::from_row(row).map_err(corrupt_row)?;
                row.try_into()
            })
            .collect()
    }
}

/// Map SQLx errors to RepositoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                Some("23503") => RepositoryError::NotFound,
                Some("23514") => RepositoryError::Validation(msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn corrupt_row(err: impl core::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(format!("failed to decode row: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct VendorRow {
    id: uuid::Uuid,
    vendor_code: String,
    name: String,
    contact_details: String,
    address: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for VendorRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(VendorRow {
            id: row.try_get("id")?,
            vendor_code: row.try_get("vendor_code")?,
            name: row.try_get("name")?,
            contact_details: row.try_get("contact_details")?,
            address: row.try_get("address")?,
        })
    }
}

fn vendor_from_row(row: &sqlx::postgres::PgRow) -> Result<Vendor, RepositoryError> {
    let row = VendorRow::from_row(row).map_err(corrupt_row)?;
    Vendor::rehydrate(
        VendorId::from_uuid(row.id),
        row.vendor_code,
        row.name,
        row.contact_details,
        row.address,
    )
    .map_err(corrupt_row)
}

#[derive(Debug)]
struct PurchaseOrderRow {
    id: uuid::Uuid,
    po_number: String,
    vendor_id: uuid::Uuid,
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    items: serde_json::Value,
    quantity: i64,
    status: String,
    quality_rating: Option<f64>,
    issue_date: DateTime<Utc>,
    acknowledgment_date: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PurchaseOrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseOrderRow {
            id: row.try_get("id")?,
            po_number: row.try_get("po_number")?,
            vendor_id: row.try_get("vendor_id")?,
            order_date: row.try_get("order_date")?,
            delivery_date: row.try_get("delivery_date")?,
            items: row.try_get("items")?,
            quantity: row.try_get("quantity")?,
            status: row.try_get("status")?,
            quality_rating: row.try_get("quality_rating")?,
            issue_date: row.try_get("issue_date")?,
            acknowledgment_date: row.try_get("acknowledgment_date")?,
        })
    }
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = RepositoryError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        let status: PurchaseOrderStatus = row.status.parse().map_err(corrupt_row)?;
        PurchaseOrder::from_record(PurchaseOrderRecord {
            id: PurchaseOrderId::from_uuid(row.id),
            po_number: row.po_number,
            vendor_id: VendorId::from_uuid(row.vendor_id),
            order_date: row.order_date,
            delivery_date: row.delivery_date,
            items: row.items,
            quantity: row.quantity,
            status,
            quality_rating: row.quality_rating,
            issue_date: row.issue_date,
            acknowledgment_date: row.acknowledgment_date,
        })
        .map_err(corrupt_row)
    }
}

fn purchase_order_from_row(row: &sqlx::postgres::PgRow) -> Result<PurchaseOrder, RepositoryError> {
    PurchaseOrderRow::from_row(row).map_err(corrupt_row)?.try_into()
}

#[derive(Debug)]
struct PerformanceRow {
    id: uuid::Uuid,
    vendor_id: uuid::Uuid,
    date: DateTime<Utc>,
    on_time_delivery_rate: f64,
    quality_rating_avg: f64,
    average_response_time: f64,
    fulfillment_rate: f64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PerformanceRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PerformanceRow {
            id: row.try_get("id")?,
            vendor_id: row.try_get("vendor_id")?,
            date: row.try_get("date")?,
            on_time_delivery_rate: row.try_get("on_time_delivery_rate")?,
            quality_rating_avg: row.try_get("quality_rating_avg")?,
            average_response_time: row.try_get("average_response_time")?,
            fulfillment_rate: row.try_get("fulfillment_rate")?,
        })
    }
}

impl TryFrom<PerformanceRow> for HistoricalPerformance {
    type Error = RepositoryError;

    fn try_from(row: PerformanceRow) -> Result<Self, Self::Error> {
        HistoricalPerformance::record(
            PerformanceRecordId::from_uuid(row.id),
            VendorId::from_uuid(row.vendor_id),
            row.date,
            PerformanceMetrics {
                on_time_delivery_rate: row.on_time_delivery_rate,
                quality_rating_avg: row.quality_rating_avg,
                average_response_time: row.average_response_time,
                fulfillment_rate: row.fulfillment_rate,
            },
        )
        .map_err(corrupt_row)
    }
}
