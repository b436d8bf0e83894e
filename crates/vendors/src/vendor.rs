use serde::{Deserialize, Serialize};

use vendorhub_core::{DomainError, DomainResult, Entity, VendorId};

/// Command: RegisterVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterVendor {
    pub vendor_code: String,
    pub name: String,
    pub contact_details: String,
    pub address: String,
}

/// Command: UpdateVendorDetails.
///
/// `None` keeps the existing value. The vendor code is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVendorDetails {
    pub name: Option<String>,
    pub contact_details: Option<String>,
    pub address: Option<String>,
}

/// Entity: Vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    id: VendorId,
    vendor_code: String,
    name: String,
    contact_details: String,
    address: String,
}

impl Vendor {
    pub fn register(id: VendorId, cmd: RegisterVendor) -> DomainResult<Self> {
        Self::rehydrate(id, cmd.vendor_code, cmd.name, cmd.contact_details, cmd.address)
    }

    /// Rebuild a vendor from stored fields.
    pub fn rehydrate(
        id: VendorId,
        vendor_code: String,
        name: String,
        contact_details: String,
        address: String,
    ) -> DomainResult<Self> {
        let vendor_code = vendor_code.trim().to_string();
        if vendor_code.is_empty() {
            return Err(DomainError::validation("vendor_code cannot be blank"));
        }
        let name = ensure_name(name)?;

        Ok(Self {
            id,
            vendor_code,
            name,
            contact_details,
            address,
        })
    }

    pub fn id_typed(&self) -> VendorId {
        self.id
    }

    pub fn vendor_code(&self) -> &str {
        &self.vendor_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact_details(&self) -> &str {
        &self.contact_details
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn update_details(&mut self, update: UpdateVendorDetails) -> DomainResult<()> {
        if let Some(name) = update.name {
            self.name = ensure_name(name)?;
        }
        if let Some(contact_details) = update.contact_details {
            self.contact_details = contact_details;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        Ok(())
    }
}

impl Entity for Vendor {
    type Id = VendorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn business_key(&self) -> &str {
        &self.vendor_code
    }
}

impl core::fmt::Display for Vendor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

fn ensure_name(name: String) -> DomainResult<String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("vendor name cannot be blank"));
    }
    Ok(name)
}
