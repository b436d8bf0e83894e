use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use vendorhub_core::{PurchaseOrderId, VendorId};
use vendorhub_vendors::{HistoricalPerformance, PurchaseOrder, PurchaseOrderStatus, Vendor};

use super::{PurchaseOrderMutation, RepositoryError, VendorMutation, VendorRepository};

#[derive(Debug, Default)]
struct State {
    vendors: HashMap<VendorId, Vendor>,
    orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    performance: Vec<HistoricalPerformance>,
}

/// In-memory vendor repository.
///
/// Intended for tests/dev. A single lock guards all records, so every
/// read-modify-write runs under one write guard.
#[derive(Debug, Default)]
pub struct InMemoryVendorRepository {
    state: RwLock<State>,
}

impl InMemoryVendorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }
}

#[async_trait]
impl VendorRepository for InMemoryVendorRepository {
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.vendors.contains_key(&vendor.id_typed()) {
            return Err(RepositoryError::Conflict(format!(
                "vendor {} already exists",
                vendor.id_typed()
            )));
        }
        if state
            .vendors
            .values()
            .any(|v| v.vendor_code() == vendor.vendor_code())
        {
            return Err(RepositoryError::Conflict(format!(
                "vendor_code '{}' is already in use",
                vendor.vendor_code()
            )));
        }
        state.vendors.insert(vendor.id_typed(), vendor.clone());
        Ok(())
    }

    async fn get_vendor(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        Ok(self.read()?.vendors.get(&id).cloned())
    }

    async fn get_vendor_by_code(
        &self,
        vendor_code: &str,
    ) -> Result<Option<Vendor>, RepositoryError> {
        Ok(self
            .read()?
            .vendors
            .values()
            .find(|v| v.vendor_code() == vendor_code)
            .cloned())
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let mut vendors: Vec<Vendor> = self.read()?.vendors.values().cloned().collect();
        vendors.sort_by(|a, b| a.vendor_code().cmp(b.vendor_code()));
        Ok(vendors)
    }

    async fn modify_vendor(
        &self,
        id: VendorId,
        mutation: VendorMutation,
    ) -> Result<Vendor, RepositoryError> {
        let mut state = self.write()?;
        let stored = state.vendors.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        let mut updated = stored.clone();
        mutation(&mut updated)?;
        super::ensure_same_vendor(stored, &updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete_vendor(&self, id: VendorId) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.vendors.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.orders.retain(|_, o| o.vendor_id() != id);
        state.performance.retain(|p| p.vendor_id() != id);
        Ok(())
    }

    async fn insert_purchase_order(&self, order: &PurchaseOrder) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.vendors.contains_key(&order.vendor_id()) {
            return Err(RepositoryError::NotFound);
        }
        if state.orders.contains_key(&order.id_typed()) {
            return Err(RepositoryError::Conflict(format!(
                "purchase order {} already exists",
                order.id_typed()
            )));
        }
        if state
            .orders
            .values()
            .any(|o| o.po_number() == order.po_number())
        {
            return Err(RepositoryError::Conflict(format!(
                "po_number '{}' is already in use",
                order.po_number()
            )));
        }
        state.orders.insert(order.id_typed(), order.clone());
        Ok(())
    }

    async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn get_purchase_order_by_number(
        &self,
        po_number: &str,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        Ok(self
            .read()?
            .orders
            .values()
            .find(|o| o.po_number() == po_number)
            .cloned())
    }

    async fn list_purchase_orders(
        &self,
        vendor_id: VendorId,
        status: Option<PurchaseOrderStatus>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let state = self.read()?;
        let mut orders: Vec<PurchaseOrder> = state
            .orders
            .values()
            .filter(|o| o.vendor_id() == vendor_id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.issue_date(), o.id_typed()));
        Ok(orders)
    }

    async fn delete_purchase_order(&self, id: PurchaseOrderId) -> Result<(), RepositoryError> {
        self.write()?
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn modify_purchase_order(
        &self,
        id: PurchaseOrderId,
        mutation: PurchaseOrderMutation,
    ) -> Result<PurchaseOrder, RepositoryError> {
        let mut state = self.write()?;
        let stored = state.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        // Mutate a copy so a rejected change leaves the stored record intact.
        let mut updated = stored.clone();
        mutation(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn append_performance(
        &self,
        record: &HistoricalPerformance,
    ) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if !state.vendors.contains_key(&record.vendor_id()) {
            return Err(RepositoryError::NotFound);
        }
        if state.performance.iter().any(|p| p.id() == record.id()) {
            return Err(RepositoryError::Conflict(format!(
                "performance record {} already exists",
                record.id()
            )));
        }
        state.performance.push(record.clone());
        Ok(())
    }

    async fn list_performance(
        &self,
        vendor_id: VendorId,
    ) -> Result<Vec<HistoricalPerformance>, RepositoryError> {
        let mut records: Vec<HistoricalPerformance> = self
            .read()?
            .performance
            .iter()
            .filter(|p| p.vendor_id() == vendor_id)
            .cloned()
            .collect();
        records.sort_by_key(|p| (p.date(), p.id()));
        Ok(records)
    }
}
