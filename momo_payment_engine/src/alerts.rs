//! Operator alerts for payments that could not be reconciled.
//!
//! Alerts are best-effort. Delivery failures are logged and never retried, and they never affect the ingest call that
//! raised the alert: the [`ReconciliationApi`](crate::ReconciliationApi) hands the event over with a bounded wait, and
//! the handlers here run on the event handler's own tasks.
use std::{sync::Arc, time::Duration};

use log::*;
use momo_common::Secret;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::{
    config::ReconciliationConfig,
    events::{EventHooks, PaymentUnmatchedEvent},
};

/// Installs the operator alert handler described by `config`: a webhook when a URL is configured, the log otherwise.
pub fn install_alert_hook(hooks: &mut EventHooks, config: &ReconciliationConfig) -> Result<(), reqwest::Error> {
    match &config.alert_webhook_url {
        Some(url) => webhook_alert_hook(hooks, url.clone(), config.alert_timeout),
        None => {
            log_alert_hook(hooks);
            Ok(())
        },
    }
}

pub fn log_alert_hook(hooks: &mut EventHooks) {
    hooks.on_payment_unmatched(|ev: PaymentUnmatchedEvent| {
        Box::pin(async move {
            warn!("🚨️ {}", ev.alert_message());
        })
    });
}

/// POSTs the alert message as plain text to `url`. Each request is abandoned after `timeout`.
pub fn webhook_alert_hook(hooks: &mut EventHooks, url: Secret<String>, timeout: Duration) -> Result<(), reqwest::Error> {
    let client = Client::builder().timeout(timeout).build()?;
    let client = Arc::new(client);
    let url = Arc::new(url);
    hooks.on_payment_unmatched(move |ev: PaymentUnmatchedEvent| {
        let client = Arc::clone(&client);
        let url = Arc::clone(&url);
        Box::pin(async move {
            let message = ev.alert_message();
            let result = client
                .post(url.reveal().as_str())
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(message.clone())
                .send()
                .await
                .and_then(|res| res.error_for_status());
            match result {
                Ok(_) => debug!("🚨️ Operator alert sent for payment log #{}", ev.log_id),
                Err(e) => error!("🚨️ Could not deliver the operator alert \"{message}\". {e}"),
            }
        })
    });
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use momo_common::Fcfa;

    use super::*;

    fn event() -> PaymentUnmatchedEvent {
        PaymentUnmatchedEvent {
            log_id: 1,
            amount: Fcfa::from(5_000),
            payer_phone: "677123456".into(),
            transaction_id: "ABC-123".into(),
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unreachable_webhooks_do_not_hang() {
        let mut hooks = EventHooks::default();
        let url = Secret::new("http://127.0.0.1:9/alerts".to_string());
        webhook_alert_hook(&mut hooks, url, Duration::from_millis(250)).unwrap();
        let handler = hooks.on_payment_unmatched.unwrap();
        let done = tokio::time::timeout(Duration::from_secs(5), (handler)(event())).await;
        assert!(done.is_ok());
    }

    #[test]
    fn log_hook_is_the_fallback() {
        let mut hooks = EventHooks::default();
        install_alert_hook(&mut hooks, &ReconciliationConfig::default()).unwrap();
        assert!(hooks.on_payment_unmatched.is_some());
        assert!(hooks.on_order_paid.is_none());
    }
}
