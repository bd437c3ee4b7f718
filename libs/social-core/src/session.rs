use std::sync::{Arc, Mutex};

use remote_store::Store;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::sync::Poller;

/// Scoped context for one signed-in user: identity, store handle, config
/// and the set of live pollers. Created at app start after authentication
/// (which is external) and passed explicitly to every workflow service;
/// there is no ambient global state.
pub struct Session {
    user_id: Uuid,
    username: String,
    store: Arc<dyn Store>,
    config: ClientConfig,
    pollers: Mutex<Vec<Poller>>,
}

impl Session {
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        store: Arc<dyn Store>,
        config: ClientConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            user_id,
            username: username.into(),
            store,
            config,
            pollers: Mutex::new(Vec::new()),
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session-scoped pollers are torn down on sign-out. Screen-scoped
    /// pollers should instead be held (and dropped) by the owning screen.
    pub fn register_poller(&self, poller: Poller) {
        let mut pollers = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pollers.push(poller);
    }

    pub fn sign_out(&self) {
        let drained: Vec<Poller> = {
            let mut pollers = self
                .pollers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pollers.drain(..).collect()
        };

        tracing::info!(
            component = "session",
            user_id = %self.user_id,
            pollers = drained.len(),
            "session torn down"
        );

        for poller in drained {
            poller.shutdown();
        }
    }
}
