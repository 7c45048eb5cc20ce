use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{self, Receiver, Sender};

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(100);
        Self { tx }
    }

    pub fn send(&self, event: Event) {
        let result = self.tx.send(event);

        if let Err(e) = result {
            error!("Error while sending event: {:?}", e);
        }
    }

    pub fn subscribe(&self) -> Subscriber {
        Subscriber::new(self.tx.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscriber {
    rx: Receiver<Event>,
}

impl Subscriber {
    pub fn new(rx: Receiver<Event>) -> Self {
        Self { rx }
    }

    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.rx.try_recv()
    }

    pub async fn recv(&mut self) -> Event {
        loop {
            let event = self.rx.recv().await;

            match event {
                Ok(event) => break event,
                Err(RecvError::Closed) => {
                    panic!("Tried to read recv from EventBus with all sender halves dropped, this should never happen")
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "EventBus::Subscriber lagging behind senders, skipping {skipped} messages"
                    );
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Gateway(GatewayEvent),
}

/// Events arriving from the chat gateway, reduced to the categories the
/// module registry dispatches on.
#[derive(Clone, Debug)]
pub enum GatewayEvent {
    MessageReceived {
        channel: u64,
        author: String,
        text: String,
    },
    MessageUpdated {
        channel: u64,
        message_id: u64,
        text: String,
    },
    MessageDeleted {
        channel: u64,
        message_id: u64,
    },
    ReactionAdded {
        channel: u64,
        message_id: u64,
        user: String,
        emoji: String,
    },
    ReactionRemoved {
        channel: u64,
        message_id: u64,
        user: String,
        emoji: String,
    },
}

/// Capability flags: modules declare the event categories they handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageReceived,
    MessageUpdated,
    MessageDeleted,
    ReactionAdded,
    ReactionRemoved,
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::MessageReceived { .. } => EventKind::MessageReceived,
            GatewayEvent::MessageUpdated { .. } => EventKind::MessageUpdated,
            GatewayEvent::MessageDeleted { .. } => EventKind::MessageDeleted,
            GatewayEvent::ReactionAdded { .. } => EventKind::ReactionAdded,
            GatewayEvent::ReactionRemoved { .. } => EventKind::ReactionRemoved,
        }
    }
}

pub fn debug(bus: &EventBus) {
    let bus = bus.clone();
    tokio::spawn(async move {
        let mut bus = bus.subscribe();
        loop {
            let event = bus.recv().await;
            debug!("Received event: {:?}", event);
        }
    });
}
