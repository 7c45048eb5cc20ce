//! Console gateway: stdin lines become gateway message events, handy for
//! driving the modules without a chat platform attached.

use crate::event::{Event, EventBus, GatewayEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn start(bus: &EventBus, channel: u64) {
    let bus = bus.clone();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }

                    bus.send(Event::Gateway(GatewayEvent::MessageReceived {
                        channel,
                        author: "console".to_string(),
                        text,
                    }));
                }
                Ok(None) => {
                    debug!("Console input closed");
                    break;
                }
                Err(e) => {
                    warn!("Error reading console input: {e}");
                    break;
                }
            }
        }
    });
}
