use crate::config::Config;
use crate::events::EventBus;
use crate::store::Store;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: Addr<EventBus>,
    pub config: Config,
}
