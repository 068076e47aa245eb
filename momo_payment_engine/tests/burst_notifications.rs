use std::time::Duration;

use log::*;
use momo_payment_engine::{
    db_types::OrderStatusType,
    order_objects::OrderQueryFilter,
    payment_objects::IngestStatus,
    ReconciliationConfig,
};
use support::*;
use tokio::runtime::Runtime;

mod support;

const NUM_ORDERS: u64 = 20;
const RATE: u64 = 100; // notifications per second

#[test]
fn burst_notifications() {
    info!("🚀️ Starting notification injection test");

    let sys = Runtime::new().unwrap();

    let delay = Duration::from_millis(1000 / RATE);

    sys.block_on(async move {
        let system = System::new(ReconciliationConfig::default()).await;
        info!("🚀️ Creating {NUM_ORDERS} orders");
        for i in 0..NUM_ORDERS {
            let phone = format!("23767700{i:04}");
            #[allow(clippy::cast_possible_wrap)]
            let total = 1_000 * (i + 1) as i64;
            if let Err(e) = system.orders.create_order(order_request(&phone, total)).await {
                panic!("Error creating order {i}: {e}");
            }
        }

        let mut timer = tokio::time::interval(delay);
        info!("🚀️ Injecting {NUM_ORDERS} payment notifications, each delivered twice");
        for i in 0..NUM_ORDERS {
            timer.tick().await;
            let sms = payment_sms(&format!("{}", 1_000 * (i + 1)), &format!("67700{i:04}"), Some(&format!("BURST-{i}")));
            for expected in [IngestStatus::Matched, IngestStatus::Duplicate] {
                match system.payments.ingest_payment_notification(&sms, Some("AirtelMoney"), OBSERVED_AT).await {
                    Ok(result) => assert_eq!(result.status, expected, "notification {i}"),
                    Err(e) => panic!("Error ingesting notification {i}: {e}"),
                }
            }
        }

        let paid = system
            .orders
            .search_orders(OrderQueryFilter::default().with_status(OrderStatusType::Paid))
            .await
            .expect("Error searching orders");
        assert_eq!(paid.len() as u64, NUM_ORDERS);
        system.tear_down().await;
    });
    info!("🚀️ test complete");
}
