pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod lobby;

use std::sync::Arc;

use arena_engine::SessionRegistry;

use crate::dispatcher::Dispatcher;

/// Everything a connection task needs to serve one client.
#[derive(Clone)]
pub struct Gateway {
    pub dispatcher: Dispatcher,
    pub registry: Arc<SessionRegistry>,
}

impl Gateway {
    pub fn new(dispatcher: Dispatcher, registry: Arc<SessionRegistry>) -> Self {
        Self { dispatcher, registry }
    }
}
