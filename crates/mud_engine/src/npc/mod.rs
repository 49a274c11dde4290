//! NPC interaction sub-dispatch.
//!
//! While a player targets an NPC, their commands are offered to the handler
//! registered for that NPC's interaction code instead of the free-roam verb
//! table. Handlers are registered by code, so new NPC behaviors plug in
//! without touching the dispatcher.

pub mod scrapbot;

use crate::error::StoreError;
use crate::message::OutboundText;
use crate::session::Session;
use crate::store::PlayerStore;
use crate::world::NpcInstance;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of offering a command to an NPC handler.
#[derive(Debug, PartialEq, Eq)]
pub enum NpcReply {
    /// The handler consumed the command; deliver these lines to the actor.
    Handled(Vec<OutboundText>),
    /// The handler does not know this verb.
    Unhandled,
}

/// Behavior behind one NPC interaction code.
#[async_trait]
pub trait NpcHandler: Send + Sync {
    async fn handle(
        &self,
        verb: &str,
        arg: &str,
        session: &mut Session,
        npc: &NpcInstance,
        store: &dyn PlayerStore,
    ) -> Result<NpcReply, StoreError>;
}

/// Maps NPC interaction codes to their handlers.
pub struct NpcRegistry {
    handlers: HashMap<u32, Arc<dyn NpcHandler>>,
}

impl NpcRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry with the built-in handlers installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(scrapbot::CODE, Arc::new(scrapbot::Scrapbot));
        registry
    }

    pub fn register(&mut self, code: u32, handler: Arc<dyn NpcHandler>) {
        debug!("Registered NPC handler for code {}", code);
        self.handlers.insert(code, handler);
    }

    pub fn get(&self, code: u32) -> Option<Arc<dyn NpcHandler>> {
        self.handlers.get(&code).cloned()
    }
}

impl Default for NpcRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
