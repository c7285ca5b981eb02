//! Adaptor selection by model name

use crate::adaptor::{WsunAdaptor, WsunConfig};
use crate::udp::{UdpAdaptor, UdpSettings};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor of an adaptor from its connection parameters
pub type AdaptorFactory = Box<dyn Fn(&WsunConfig) -> Arc<dyn WsunAdaptor> + Send + Sync>;

/// Table of adaptor constructors keyed by model name
pub struct AdaptorRegistry {
    factories: HashMap<String, AdaptorFactory>,
}

impl AdaptorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an adaptor model, replacing any previous one of the same name
    pub fn register(&mut self, model: impl Into<String>, factory: AdaptorFactory) {
        self.factories.insert(model.into(), factory);
    }

    /// Create an adaptor of the given model
    ///
    /// # Returns
    /// `None` if the model is not registered
    pub fn create(&self, model: &str, config: &WsunConfig) -> Option<Arc<dyn WsunAdaptor>> {
        let factory = self.factories.get(model)?;
        Some(factory(config))
    }
}

impl Default for AdaptorRegistry {
    /// A registry knowing the plain UDP adaptor
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(
            UdpAdaptor::MODEL,
            Box::new(|config: &WsunConfig| {
                Arc::new(UdpAdaptor::new(UdpSettings::from_config(config))) as Arc<dyn WsunAdaptor>
            }),
        );
        registry
    }
}
