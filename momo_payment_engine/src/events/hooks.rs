use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderPaidEvent, PaymentUnmatchedEvent, TopupConfirmedEvent};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub payment_unmatched_producer: Vec<EventProducer<PaymentUnmatchedEvent>>,
    pub topup_confirmed_producer: Vec<EventProducer<TopupConfirmedEvent>>,
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_payment_unmatched: Option<EventHandler<PaymentUnmatchedEvent>>,
    pub on_topup_confirmed: Option<EventHandler<TopupConfirmedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_unmatched = hooks.on_payment_unmatched.map(|f| EventHandler::new(buffer_size, f));
        let on_topup_confirmed = hooks.on_topup_confirmed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_payment_unmatched, on_topup_confirmed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_unmatched {
            result.payment_unmatched_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_topup_confirmed {
            result.topup_confirmed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured handler. Each one ends once all of its producers have been dropped; the returned
    /// join handles let callers wait for in-flight events to be handled.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_order_paid {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_payment_unmatched {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_topup_confirmed {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payment_unmatched: Option<Handler<PaymentUnmatchedEvent>>,
    pub on_topup_confirmed: Option<Handler<TopupConfirmedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    /// The operator alert channel.
    pub fn on_payment_unmatched<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentUnmatchedEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_payment_unmatched = Some(Arc::new(f));
        self
    }

    pub fn on_topup_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TopupConfirmedEvent) -> BoxedFuture) + Send + Sync + 'static {
        self.on_topup_confirmed = Some(Arc::new(f));
        self
    }
}
