//! Topic store tests

#[cfg(test)]
mod tests {
    use crate::broker::api::{BrokerError, EntityKind, Message, TopicStore};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_duplicate_create_fails_and_keeps_original() {
        let store = TopicStore::new();
        let original = store.create_topic("orders").unwrap();
        original.enqueue(Message::new("p1", "orders", "a")).unwrap();

        let err = store.create_topic("orders").unwrap_err();
        assert_eq!(
            err,
            BrokerError::AlreadyExists {
                kind: EntityKind::Topic,
                name: "orders".to_string()
            }
        );

        let current = store.get_topic("orders").unwrap();
        assert!(Arc::ptr_eq(&original, &current));
        assert_eq!(current.message_count().unwrap(), 1);
    }

    #[test]
    fn test_dequeue_preserves_fifo_order() {
        let store = TopicStore::new();
        store.create_topic("orders").unwrap();

        let published: Vec<Message> = (1..=5)
            .map(|i| Message::new("p1", "orders", format!("m{}", i)))
            .collect();
        for message in &published {
            store.enqueue("orders", message.clone()).unwrap();
        }

        for expected in &published {
            assert_eq!(store.try_dequeue("orders").unwrap().as_ref(), Some(expected));
        }
        assert_eq!(store.try_dequeue("orders").unwrap(), None);
        assert!(!store.has_messages("orders").unwrap());
    }

    #[test]
    fn test_delete_topic_drops_messages() {
        let store = TopicStore::new();
        store.create_topic("orders").unwrap();
        store
            .enqueue("orders", Message::new("p1", "orders", "a"))
            .unwrap();

        assert!(store.delete_topic("orders").unwrap());
        assert!(!store.delete_topic("orders").unwrap());
        assert!(store.get_topic("orders").is_none());
        assert!(matches!(
            store.message_count("orders"),
            Err(BrokerError::NotFound {
                kind: EntityKind::Topic,
                ..
            })
        ));

        // A recreated topic starts empty
        store.create_topic("orders").unwrap();
        assert_eq!(store.message_count("orders").unwrap(), 0);
    }

    #[test]
    fn test_list_topics() {
        let store = TopicStore::new();
        store.create_topic("orders").unwrap();
        store.create_topic("audit").unwrap();

        let mut names: Vec<String> = store
            .list_topics()
            .iter()
            .map(|topic| topic.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["audit", "orders"]);
    }

    #[test]
    fn test_concurrent_enqueue_and_dequeue_lose_nothing() {
        let store = Arc::new(TopicStore::new());
        store.create_topic("orders").unwrap();

        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..250 {
                        let message =
                            Message::new(format!("p{}", producer), "orders", i.to_string());
                        store.enqueue("orders", message).unwrap();
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }
        assert_eq!(store.message_count("orders").unwrap(), 1000);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    while let Some(message) = store.try_dequeue("orders").unwrap() {
                        ids.push(message.id().to_string());
                    }
                    ids
                })
            })
            .collect();

        let mut all_ids: Vec<String> = consumers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let total = all_ids.len();
        all_ids.sort();
        all_ids.dedup();
        assert_eq!(total, 1000);
        assert_eq!(all_ids.len(), 1000, "a message was dequeued twice");
    }
}
