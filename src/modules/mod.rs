//! Explicit module registry.
//!
//! Modules are compiled in and registered at startup with a declared set
//! of handled event categories. The dispatch loop fans every gateway event
//! out to the modules whose capability set contains its kind; a module
//! error is logged and contained so the rest keep getting events.

pub mod soundboard;

use crate::audio::AudioHandle;
use crate::event::{Event, EventBus, EventKind, GatewayEvent};
use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;
use std::sync::Arc;

/// Collaborators handed to every module.
#[derive(Clone)]
pub struct ModuleContext {
    pub audio: AudioHandle,
}

#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Gateway event categories this module wants to receive.
    fn capabilities(&self) -> &'static [EventKind];

    async fn handle_event(&self, event: &GatewayEvent, ctx: &ModuleContext) -> Result<()>;
}

/// Registers the module list and starts the dispatch loop.
pub fn init(bus: &EventBus, ctx: ModuleContext, modules: Vec<Arc<dyn Module>>) {
    info!(
        "Registered modules: {}",
        modules.iter().map(|m| m.name()).join(", ")
    );

    start_dispatch_loop(bus.clone(), ctx, modules);
}

fn start_dispatch_loop(bus: EventBus, ctx: ModuleContext, modules: Vec<Arc<dyn Module>>) {
    tokio::spawn(async move {
        let mut subscriber = bus.subscribe();

        loop {
            let Event::Gateway(event) = subscriber.recv().await;
            let kind = event.kind();

            for module in &modules {
                if !module.capabilities().contains(&kind) {
                    continue;
                }

                if let Err(e) = module.handle_event(&event, &ctx).await {
                    error!("Module {} failed on {kind:?}: {e:#}", module.name());
                }
            }
        }
    });
}
