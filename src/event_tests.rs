//! Unit tests for the event bus

#[cfg(test)]
mod tests {
    use crate::event::{Event, EventBus, EventKind, GatewayEvent};

    fn message(text: &str) -> GatewayEvent {
        GatewayEvent::MessageReceived {
            channel: 1,
            author: "tester".to_string(),
            text: text.to_string(),
        }
    }

    fn text_of(event: Event) -> String {
        let Event::Gateway(GatewayEvent::MessageReceived { text, .. }) = event else {
            panic!("expected MessageReceived, got something else");
        };
        text
    }

    #[test]
    fn test_gateway_event_kinds() {
        assert_eq!(message("hi").kind(), EventKind::MessageReceived);

        let deleted = GatewayEvent::MessageDeleted {
            channel: 1,
            message_id: 2,
        };
        assert_eq!(deleted.kind(), EventKind::MessageDeleted);

        let reaction = GatewayEvent::ReactionAdded {
            channel: 1,
            message_id: 2,
            user: "tester".to_string(),
            emoji: "horn".to_string(),
        };
        assert_eq!(reaction.kind(), EventKind::ReactionAdded);
    }

    #[tokio::test]
    async fn test_subscriber_receives_sent_event() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.send(Event::Gateway(message("hello")));

        assert_eq!(text_of(subscriber.try_recv().unwrap()), "hello");
    }

    #[tokio::test]
    async fn test_events_fan_out_to_all_subscribers() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.send(Event::Gateway(message("fanout")));

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
    }

    #[test]
    fn test_recv_returns_next_event() {
        tokio_test::block_on(async {
            let bus = EventBus::new();
            let mut subscriber = bus.subscribe();

            bus.send(Event::Gateway(message("awaited")));

            assert_eq!(text_of(subscriber.recv().await), "awaited");
        });
    }

    #[tokio::test]
    async fn test_subscriber_sees_events_in_order() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        for i in 0..5 {
            bus.send(Event::Gateway(message(&format!("msg-{i}"))));
        }

        for i in 0..5 {
            assert_eq!(text_of(subscriber.try_recv().unwrap()), format!("msg-{i}"));
        }
    }
}
