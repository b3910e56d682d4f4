//! Shared application state injected into every handler.

use std::sync::Arc;

use relay_delivery::PriorityQueue;
use relay_store::DeliveryStore;
use relay_templates::TemplateService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DeliveryStore>,
    pub queue: Arc<PriorityQueue>,
    pub templates: Arc<TemplateService>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        queue: Arc<PriorityQueue>,
        templates: Arc<TemplateService>,
    ) -> Self {
        Self {
            store,
            queue,
            templates,
        }
    }
}
