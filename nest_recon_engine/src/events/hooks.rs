use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{DecisionRecordedEvent, EventHandler, EventProducer, Handler, InvoicePaidEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub decision_recorded_producer: Vec<EventProducer<DecisionRecordedEvent>>,
    pub invoice_paid_producer: Vec<EventProducer<InvoicePaidEvent>>,
}

pub struct EventHandlers {
    pub on_decision_recorded: Option<EventHandler<DecisionRecordedEvent>>,
    pub on_invoice_paid: Option<EventHandler<InvoicePaidEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_decision_recorded = hooks.on_decision_recorded.map(|f| EventHandler::new(buffer_size, f));
        let on_invoice_paid = hooks.on_invoice_paid.map(|f| EventHandler::new(buffer_size, f));
        Self { on_decision_recorded, on_invoice_paid }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_decision_recorded {
            result.decision_recorded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_invoice_paid {
            result.invoice_paid_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_decision_recorded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_invoice_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

/// The hook points an embedding application can attach to. The decision hook is where the audit
/// sink lives; the invoice-paid hook is where receipting lives. Both are optional.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_decision_recorded: Option<Handler<DecisionRecordedEvent>>,
    pub on_invoice_paid: Option<Handler<InvoicePaidEvent>>,
}

impl EventHooks {
    pub fn on_decision_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DecisionRecordedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_decision_recorded = Some(Arc::new(f));
        self
    }

    pub fn on_invoice_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(InvoicePaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_invoice_paid = Some(Arc::new(f));
        self
    }
}
