//! Infrastructure layer: record stores, store configuration, clock and the
//! vendor application service.

pub mod clock;
pub mod config;
pub mod repository;
pub mod service;

mod integration_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{StoreBackend, StoreConfig};
pub use repository::{
    InMemoryVendorRepository, PostgresVendorRepository, PurchaseOrderMutation, RepositoryError,
    VendorMutation, VendorRepository,
};
pub use service::{ServiceError, ServiceResult, VendorService};
