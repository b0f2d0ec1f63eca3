/// Seam to the external real-time delivery service.
///
/// Delivery is best-effort and fire-and-forget from the relay's perspective:
/// implementations must not block the caller, and a failed send to one
/// connection never surfaces back into broadcast handling. Retry policy, if
/// any, belongs to the transport itself.
pub trait Transport: Send + Sync {
    fn send_to_connection(&self, connection_id: &str, payload: Vec<u8>);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::Transport;

    /// Test transport capturing every send for assertions.
    #[derive(Default)]
    pub struct RecordingTransport {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RecordingTransport {
        pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_to(&self, connection_id: &str) -> Vec<Vec<u8>> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(conn, _)| conn == connection_id)
                .map(|(_, payload)| payload.clone())
                .collect()
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    impl Transport for RecordingTransport {
        fn send_to_connection(&self, connection_id: &str, payload: Vec<u8>) {
            self.sent
                .lock()
                .unwrap()
                .push((connection_id.to_string(), payload));
        }
    }
}
