//! Compile-time protocol registry.
//!
//! Handlers are constructed and registered at startup; protocol selection is
//! a name lookup, never configuration-driven code loading.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::{
    HttpConfig, HttpHandler, ProtocolHandler, ProtocolStatsSnapshot, TransportError,
    WebSocketConfig, WebSocketHandler,
};

/// Name-indexed set of protocol handlers.
#[derive(Default)]
pub struct ProtocolRegistry {
    handlers: HashMap<String, Arc<dyn ProtocolHandler>>,
}

impl ProtocolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in HTTP and WebSocket handlers.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_defaults(
        http_config: HttpConfig,
        websocket_config: WebSocketConfig,
    ) -> Result<Self, TransportError> {
        let mut registry = Self::new();
        registry.register(Arc::new(HttpHandler::new(http_config)?));
        registry.register(Arc::new(WebSocketHandler::new(websocket_config)));
        Ok(registry)
    }

    /// Register a handler under its protocol name.
    ///
    /// Re-registering a name replaces the previous handler.
    pub fn register(&mut self, handler: Arc<dyn ProtocolHandler>) {
        let name = handler.name().to_string();
        info!(protocol = %name, "registered protocol handler");
        self.handlers.insert(name, handler);
    }

    /// Look up a handler by protocol name.
    #[must_use]
    pub fn get(&self, protocol: &str) -> Option<Arc<dyn ProtocolHandler>> {
        self.handlers.get(protocol).cloned()
    }

    /// Registered protocol names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Snapshot stats for every registered handler.
    #[must_use]
    pub fn stats(&self) -> HashMap<String, ProtocolStatsSnapshot> {
        self.handlers
            .iter()
            .map(|(name, handler)| (name.clone(), handler.stats()))
            .collect()
    }
}
