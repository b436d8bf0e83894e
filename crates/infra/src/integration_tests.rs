//! Integration tests for the vendor service over the in-memory store.
//!
//! Verifies:
//! - Acknowledgment is a one-shot transition, atomic under concurrency
//! - Metrics are computed from the stored order history
//! - Validation failures and conflicts leave the store unchanged
//! - Schedule and delivery updates re-check the delivery-date rule
//! - Vendor deletion cascades to orders and snapshots

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use vendorhub_core::{PurchaseOrderId, VendorId};
    use vendorhub_vendors::{
        IssuePurchaseOrder, PerformanceMetrics, PurchaseOrderStatus, RegisterVendor,
        UpdateVendorDetails, Vendor,
    };

    use crate::clock::FixedClock;
    use crate::repository::{InMemoryVendorRepository, VendorRepository};
    use crate::service::{ServiceError, VendorService};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (VendorService, Arc<InMemoryVendorRepository>, Arc<FixedClock>) {
        vendorhub_observability::init();
        let repo = Arc::new(InMemoryVendorRepository::new());
        let clock = Arc::new(FixedClock::new(start()));
        let service = VendorService::with_clock(repo.clone(), clock.clone());
        (service, repo, clock)
    }

    async fn register(service: &VendorService, code: &str) -> Vendor {
        service
            .register_vendor(RegisterVendor {
                vendor_code: code.to_string(),
                name: "Test Vendor".to_string(),
                contact_details: "1234567890".to_string(),
                address: "123 Test St".to_string(),
            })
            .await
            .unwrap()
    }

    fn po(vendor_id: VendorId, po_number: &str, lateness: Duration) -> IssuePurchaseOrder {
        IssuePurchaseOrder {
            po_number: po_number.to_string(),
            vendor_id,
            order_date: start(),
            delivery_date: start() + lateness,
            items: json!({"item1": 10}),
            quantity: 10,
        }
    }

    #[tokio::test]
    async fn acknowledge_twice_conflicts_and_keeps_first_date() {
        let (service, _, clock) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();

        clock.advance(Duration::minutes(30));
        let acked = service
            .acknowledge_purchase_order(order.id_typed())
            .await
            .unwrap();
        let first = acked.acknowledgment_date().unwrap();
        assert_eq!(first, start() + Duration::minutes(30));

        clock.advance(Duration::hours(1));
        let err = service
            .acknowledge_purchase_order(order.id_typed())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let stored = service.get_purchase_order(order.id_typed()).await.unwrap();
        assert_eq!(stored.acknowledgment_date(), Some(first));
    }

    #[tokio::test]
    async fn acknowledge_unknown_order_is_not_found() {
        let (service, repo, _) = setup();
        let vendor = register(&service, "V001").await;

        let err = service
            .acknowledge_purchase_order(PurchaseOrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
        assert!(
            repo.list_purchase_orders(vendor.id_typed(), None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acknowledges_have_exactly_one_winner() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                let id = order.id_typed();
                tokio::spawn(async move { service.acknowledge_purchase_order(id).await })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn acknowledgment_feeds_average_response_time() {
        let (service, _, clock) = setup();
        let vendor = register(&service, "V001").await;
        let first = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        let second = service
            .issue_purchase_order(po(vendor.id_typed(), "PO2", Duration::zero()))
            .await
            .unwrap();
        service
            .issue_purchase_order(po(vendor.id_typed(), "PO3", Duration::zero()))
            .await
            .unwrap();

        clock.advance(Duration::seconds(60));
        service
            .acknowledge_purchase_order(first.id_typed())
            .await
            .unwrap();
        clock.advance(Duration::seconds(60));
        service
            .acknowledge_purchase_order(second.id_typed())
            .await
            .unwrap();

        // Unacknowledged orders do not count.
        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert!((metrics.average_response_time - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn metrics_for_vendor_without_orders_are_zero() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert_eq!(metrics, PerformanceMetrics::default());
    }

    #[tokio::test]
    async fn metrics_for_unknown_vendor_is_not_found() {
        let (service, _, _) = setup();
        let err = service.compute_metrics(VendorId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn on_time_delivery_counts_completed_orders_only() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let on_time = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        let late = service
            .issue_purchase_order(po(vendor.id_typed(), "PO2", Duration::hours(1)))
            .await
            .unwrap();
        // Pending orders never affect on-time delivery.
        service
            .issue_purchase_order(po(vendor.id_typed(), "PO3", Duration::hours(5)))
            .await
            .unwrap();

        service
            .complete_purchase_order(on_time.id_typed())
            .await
            .unwrap();
        service
            .complete_purchase_order(late.id_typed())
            .await
            .unwrap();

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert!((metrics.on_time_delivery_rate - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn quality_and_fulfillment_follow_order_lifecycle() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let done = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        service
            .issue_purchase_order(po(vendor.id_typed(), "PO2", Duration::zero()))
            .await
            .unwrap();

        service
            .complete_purchase_order(done.id_typed())
            .await
            .unwrap();
        service
            .rate_purchase_order(done.id_typed(), 5.0)
            .await
            .unwrap();

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert!((metrics.quality_rating_avg - 5.0).abs() < 1e-9);
        assert!((metrics.fulfillment_rate - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rating_a_pending_order_is_rejected() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();

        let err = service
            .rate_purchase_order(order.id_typed(), 4.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = service.get_purchase_order(order.id_typed()).await.unwrap();
        assert_eq!(stored.quality_rating(), None);
    }

    #[tokio::test]
    async fn canceled_order_cannot_be_completed() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();

        service
            .cancel_purchase_order(order.id_typed())
            .await
            .unwrap();
        let err = service
            .complete_purchase_order(order.id_typed())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let canceled = service
            .list_purchase_orders(vendor.id_typed(), Some(PurchaseOrderStatus::Canceled))
            .await
            .unwrap();
        assert_eq!(canceled.len(), 1);
    }

    #[tokio::test]
    async fn delivery_before_order_date_is_rejected_and_not_stored() {
        let (service, repo, _) = setup();
        let vendor = register(&service, "V001").await;

        let err = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", -Duration::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(
            repo.get_purchase_order_by_number("PO1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn order_for_unknown_vendor_is_not_found() {
        let (service, _, _) = setup();
        let err = service
            .issue_purchase_order(po(VendorId::new(), "PO1", Duration::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_codes_and_numbers_conflict() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;

        let err = service
            .register_vendor(RegisterVendor {
                vendor_code: "V001".to_string(),
                name: "Other".to_string(),
                contact_details: String::new(),
                address: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        let err = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_vendor_details_keeps_code() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;

        let updated = service
            .update_vendor_details(
                vendor.id_typed(),
                UpdateVendorDetails {
                    name: Some("Renamed Vendor".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name(), "Renamed Vendor");
        assert_eq!(updated.vendor_code(), "V001");

        let stored = service.get_vendor(vendor.id_typed()).await.unwrap();
        assert_eq!(stored.name(), "Renamed Vendor");
        assert_eq!(service.list_vendors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn capture_and_record_performance_history() {
        let (service, _, clock) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        service
            .complete_purchase_order(order.id_typed())
            .await
            .unwrap();

        clock.advance(Duration::days(1));
        let captured = service
            .capture_performance(vendor.id_typed())
            .await
            .unwrap();
        assert_eq!(captured.date(), start() + Duration::days(1));
        assert!((captured.metrics().fulfillment_rate - 100.0).abs() < 1e-9);

        // An earlier, caller-supplied snapshot sorts first.
        service
            .record_performance(
                vendor.id_typed(),
                start(),
                PerformanceMetrics {
                    on_time_delivery_rate: 80.0,
                    quality_rating_avg: 4.5,
                    average_response_time: 120.0,
                    fulfillment_rate: 90.0,
                },
            )
            .await
            .unwrap();

        let err = service
            .record_performance(
                vendor.id_typed(),
                start(),
                PerformanceMetrics {
                    fulfillment_rate: 150.0,
                    ..PerformanceMetrics::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let history = service
            .performance_history(vendor.id_typed())
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date(), start());
        assert_eq!(history[1].id(), captured.id());
    }

    #[tokio::test]
    async fn deleting_vendor_removes_orders_and_history() {
        let (service, repo, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        service
            .capture_performance(vendor.id_typed())
            .await
            .unwrap();

        service.delete_vendor(vendor.id_typed()).await.unwrap();

        assert!(matches!(
            service.get_vendor(vendor.id_typed()).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            service.get_purchase_order(order.id_typed()).await,
            Err(ServiceError::NotFound)
        ));
        assert!(repo.list_performance(vendor.id_typed()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recorded_delivery_moves_on_time_rate() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::days(7)))
            .await
            .unwrap();
        service
            .complete_purchase_order(order.id_typed())
            .await
            .unwrap();

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert_eq!(metrics.on_time_delivery_rate, 0.0);

        let delivered = service
            .record_delivery(order.id_typed(), start())
            .await
            .unwrap();
        assert_eq!(delivered.delivery_date(), start());

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert!((metrics.on_time_delivery_rate - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn delivery_before_order_date_is_rejected_on_update() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::days(2)))
            .await
            .unwrap();

        let err = service
            .record_delivery(order.id_typed(), start() - Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .reschedule_purchase_order(order.id_typed(), start(), start() - Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = service.get_purchase_order(order.id_typed()).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn reschedule_moves_pending_order() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::days(2)))
            .await
            .unwrap();

        let new_order_date = start() + Duration::days(1);
        let moved = service
            .reschedule_purchase_order(
                order.id_typed(),
                new_order_date,
                new_order_date + Duration::days(3),
            )
            .await
            .unwrap();
        assert_eq!(moved.order_date(), new_order_date);
        assert_eq!(moved.delivery_date(), new_order_date + Duration::days(3));
        assert_eq!(
            service.get_purchase_order(order.id_typed()).await.unwrap(),
            moved
        );
    }

    #[tokio::test]
    async fn delete_purchase_order_removes_it_from_metrics() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;
        let done = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();
        let pending = service
            .issue_purchase_order(po(vendor.id_typed(), "PO2", Duration::zero()))
            .await
            .unwrap();
        service
            .complete_purchase_order(done.id_typed())
            .await
            .unwrap();

        service
            .delete_purchase_order(pending.id_typed())
            .await
            .unwrap();

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert!((metrics.fulfillment_rate - 100.0).abs() < 1e-9);
        assert!(matches!(
            service.delete_purchase_order(pending.id_typed()).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn acknowledge_with_clock_behind_issue_date_stores_issue_date() {
        let (service, _, clock) = setup();
        let vendor = register(&service, "V001").await;
        let order = service
            .issue_purchase_order(po(vendor.id_typed(), "PO1", Duration::zero()))
            .await
            .unwrap();

        clock.set(start() - Duration::seconds(30));
        let acked = service
            .acknowledge_purchase_order(order.id_typed())
            .await
            .unwrap();
        assert_eq!(acked.acknowledgment_date(), Some(order.issue_date()));

        let metrics = service.compute_metrics(vendor.id_typed()).await.unwrap();
        assert_eq!(metrics.average_response_time, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_vendor_updates_keep_every_field() {
        let (service, _, _) = setup();
        let vendor = register(&service, "V001").await;

        let rename = {
            let service = service.clone();
            let id = vendor.id_typed();
            tokio::spawn(async move {
                service
                    .update_vendor_details(
                        id,
                        UpdateVendorDetails {
                            name: Some("Renamed Vendor".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        let relocate = {
            let service = service.clone();
            let id = vendor.id_typed();
            tokio::spawn(async move {
                service
                    .update_vendor_details(
                        id,
                        UpdateVendorDetails {
                            address: Some("1 New Rd".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            })
        };
        rename.await.unwrap().unwrap();
        relocate.await.unwrap().unwrap();

        let stored = service.get_vendor(vendor.id_typed()).await.unwrap();
        assert_eq!(stored.name(), "Renamed Vendor");
        assert_eq!(stored.address(), "1 New Rd");
        assert_eq!(stored.contact_details(), "1234567890");
    }

    #[tokio::test]
    async fn update_unknown_vendor_is_not_found() {
        let (service, _, _) = setup();
        let err = service
            .update_vendor_details(VendorId::new(), UpdateVendorDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }
}
