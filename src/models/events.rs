use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Connection-opened event. The group binding is resolved by the transport
/// from the roles baked into the client access token at negotiation time.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub connection_id: String,
    pub user: String,
    pub group: String,
}

/// Connection-closed event.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedEvent {
    pub connection_id: String,
}

/// Data event carrying one opaque protocol message from a client.
#[serde_as]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DataEvent {
    pub connection_id: String,
    #[serde_as(as = "Base64")]
    pub data: Vec<u8>,
}

/// Inbound transport event delivered on the event webhook.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum TransportEvent {
    #[serde(rename = "connected")]
    Connected(ConnectedEvent),
    #[serde(rename = "disconnected")]
    Disconnected(DisconnectedEvent),
    #[serde(rename = "message")]
    Message(DataEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_event_decodes_base64_payload() {
        let json = r#"{"type":"message","connectionId":"c1","data":"AAEC"}"#;
        let event: TransportEvent = serde_json::from_str(json).unwrap();
        match event {
            TransportEvent::Message(data) => {
                assert_eq!(data.connection_id, "c1");
                assert_eq!(data.data, vec![0u8, 1, 2]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn connected_event_roundtrip() {
        let json = r#"{"type":"connected","connectionId":"c1","user":"alice","group":"standup"}"#;
        let event: TransportEvent = serde_json::from_str(json).unwrap();
        match event {
            TransportEvent::Connected(connected) => {
                assert_eq!(connected.user, "alice");
                assert_eq!(connected.group, "standup");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
