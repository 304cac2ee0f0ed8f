//! Integration tests for events

#[cfg(test)]
mod tests {
    use repofetch_errors::{FetchError, TransferFailure, TransportError};
    use repofetch_events::*;
    use repofetch_types::{Metadata, Resource};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::EnvFilter;

    fn resource() -> TransferResource {
        let key = Resource::from(Metadata::artifact("org.example", "lib")).key();
        TransferResource::new(key, "file:///srv/repo", "org/example/lib/maven-metadata.xml")
    }

    #[tokio::test]
    async fn test_sender_is_a_listener() {
        let (tx, mut rx) = channel();

        tx.on_event(TransferEvent::initiated(resource()));
        tx.on_event(TransferEvent::succeeded(resource()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, TransferEventKind::Initiated);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, TransferEventKind::Succeeded);
        assert_eq!(first.key(), second.key());
        assert_ne!(first.event_id, second.event_id);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.on_event(TransferEvent::initiated(resource()));
    }

    #[test]
    fn test_shared_listener() {
        let listener: Arc<dyn TransferListener> = Arc::new(TracingListener);
        listener.on_event(TransferEvent::initiated(resource()));
    }

    #[test]
    fn test_event_serialization() {
        let error = FetchError::Transfer {
            resource: "metadata org.example:lib/maven-metadata.xml".into(),
            repository: "local (file:///srv/repo)".into(),
            failure: TransferFailure::Transport(TransportError::ConnectionLost("reset".into())),
        };
        let event = TransferEvent::failed(resource(), error);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"failed""#));

        let back: TransferEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, TransferEventKind::Failed);
        assert!(back.error.is_some_and(|e| e.is_transfer_error()));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_listener_output() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("repofetch=info"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let error = FetchError::NotFound {
            resource: "metadata org.example:lib/maven-metadata.xml".into(),
            repository: "local (file:///srv/repo)".into(),
        };
        tracing::subscriber::with_default(subscriber, || {
            TracingListener.on_event(TransferEvent::initiated(resource()));
            TracingListener.on_event(TransferEvent::failed(resource(), error));
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(!output.contains("Transfer initiated"));
        assert!(output.contains("Transfer failed"));
        assert!(output.contains("fetch.not_found"));
        assert!(output.contains("file:///srv/repo/org/example/lib/maven-metadata.xml"));
    }
}
