use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use serde_json::json;
use vendorhub_core::{PurchaseOrderId, VendorId};
use vendorhub_vendors::metrics;
use vendorhub_vendors::{IssuePurchaseOrder, PurchaseOrder};

/// Mixed order history: a third completed (half of those rated), a third
/// canceled, every other order acknowledged.
fn order_history(count: usize) -> Vec<PurchaseOrder> {
    let vendor_id = VendorId::new();
    let now = Utc::now();

    (0..count)
        .map(|i| {
            let order_date = now - Duration::hours(i as i64);
            let mut order = PurchaseOrder::issue(
                PurchaseOrderId::new(),
                IssuePurchaseOrder {
                    po_number: format!("PO{i:06}"),
                    vendor_id,
                    order_date,
                    delivery_date: order_date + Duration::minutes((i % 3) as i64 * 30),
                    items: json!({"sku": i}),
                    quantity: 10,
                },
                order_date,
            )
            .unwrap();

            if i % 2 == 0 {
                order.acknowledge(order_date + Duration::seconds(i as i64)).unwrap();
            }
            match i % 3 {
                0 => {
                    order.complete().unwrap();
                    if i % 2 == 0 {
                        order.rate((i % 5) as f64).unwrap();
                    }
                }
                1 => order.cancel().unwrap(),
                _ => {}
            }
            order
        })
        .collect()
}

fn bench_compute_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_metrics");

    for size in [10usize, 1_000, 100_000] {
        let orders = order_history(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &orders, |b, orders| {
            b.iter(|| metrics::compute(black_box(orders)));
        });
    }

    group.finish();
}

fn bench_single_metric(c: &mut Criterion) {
    let orders = order_history(10_000);
    let mut group = c.benchmark_group("single_metric_10k");

    group.bench_function("on_time_delivery_rate", |b| {
        b.iter(|| metrics::on_time_delivery_rate(black_box(&orders)));
    });
    group.bench_function("average_response_time", |b| {
        b.iter(|| metrics::average_response_time(black_box(&orders)));
    });

    group.finish();
}

criterion_group!(benches, bench_compute_metrics, bench_single_metric);
criterion_main!(benches);
