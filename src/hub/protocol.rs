use std::fmt;

use yrs::encoding::read::{Cursor, Read};
use yrs::encoding::write::Write;
use yrs::updates::decoder::{Decode, DecoderV1};
use yrs::updates::encoder::{Encode, Encoder, EncoderV1};
use yrs::StateVector;

/// Leading envelope tag for sync-protocol messages.
pub const MSG_SYNC: u64 = 0;
/// Leading envelope tag for awareness messages.
pub const MSG_AWARENESS: u64 = 1;

const SYNC_STEP_1: u64 = 0;
const SYNC_STEP_2: u64 = 1;
const SYNC_UPDATE: u64 = 2;

/// JSON literal carried by an awareness entry that clears a client's state.
pub const AWARENESS_NULL_STATE: &str = "null";

/// A decoded message envelope: an unsigned-varint type tag followed by a
/// type-specific payload. The encoding is lib0-compatible so clients speaking
/// the standard sync/awareness wire format interoperate bit-exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Sync(SyncMessage),
    Awareness(AwarenessUpdate),
}

/// Sync sub-protocol payload. Step 1 carries the requesting replica's state
/// vector, step 2 and update both carry raw document updates produced by the
/// CRDT engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    SyncStep1(StateVector),
    SyncStep2(Vec<u8>),
    Update(Vec<u8>),
}

/// A set of per-client awareness deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwarenessUpdate {
    pub clients: Vec<AwarenessEntry>,
}

/// One client's awareness delta: a last-writer-wins clock plus the JSON state
/// payload ("null" encodes removal).
#[derive(Debug, Clone, PartialEq)]
pub struct AwarenessEntry {
    pub client_id: u64,
    pub clock: u32,
    pub state: String,
}

impl AwarenessEntry {
    pub fn is_removal(&self) -> bool {
        self.state == AWARENESS_NULL_STATE
    }
}

impl HubMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut encoder = EncoderV1::new();
        match self {
            HubMessage::Sync(msg) => {
                encoder.write_var(MSG_SYNC);
                msg.encode_into(&mut encoder);
            }
            HubMessage::Awareness(update) => {
                encoder.write_var(MSG_AWARENESS);
                encoder.write_buf(update.encode());
            }
        }
        encoder.to_vec()
    }

    /// Decode a single envelope. Unknown type tags yield `Ok(None)`; the
    /// dispatcher ignores them rather than treating them as an error.
    pub fn decode(data: &[u8]) -> Result<Option<HubMessage>, ProtocolError> {
        let mut decoder = DecoderV1::new(Cursor::new(data));
        let tag: u64 = decoder.read_var()?;
        match tag {
            MSG_SYNC => Ok(Some(HubMessage::Sync(SyncMessage::decode_from(
                &mut decoder,
            )?))),
            MSG_AWARENESS => {
                let buf = decoder.read_buf()?.to_vec();
                Ok(Some(HubMessage::Awareness(AwarenessUpdate::decode(&buf)?)))
            }
            _ => Ok(None),
        }
    }
}

impl SyncMessage {
    fn encode_into(&self, encoder: &mut EncoderV1) {
        match self {
            SyncMessage::SyncStep1(sv) => {
                encoder.write_var(SYNC_STEP_1);
                encoder.write_buf(sv.encode_v1());
            }
            SyncMessage::SyncStep2(update) => {
                encoder.write_var(SYNC_STEP_2);
                encoder.write_buf(update);
            }
            SyncMessage::Update(update) => {
                encoder.write_var(SYNC_UPDATE);
                encoder.write_buf(update);
            }
        }
    }

    fn decode_from(decoder: &mut DecoderV1) -> Result<SyncMessage, ProtocolError> {
        let tag: u64 = decoder.read_var()?;
        match tag {
            SYNC_STEP_1 => {
                let buf = decoder.read_buf()?;
                let sv = StateVector::decode_v1(buf)?;
                Ok(SyncMessage::SyncStep1(sv))
            }
            SYNC_STEP_2 => Ok(SyncMessage::SyncStep2(decoder.read_buf()?.to_vec())),
            SYNC_UPDATE => Ok(SyncMessage::Update(decoder.read_buf()?.to_vec())),
            other => Err(ProtocolError::UnexpectedTag(other)),
        }
    }
}

impl AwarenessUpdate {
    pub fn encode(&self) -> Vec<u8> {
        let mut encoder = EncoderV1::new();
        encoder.write_var(self.clients.len());
        for entry in &self.clients {
            encoder.write_var(entry.client_id);
            encoder.write_var(entry.clock);
            encoder.write_string(&entry.state);
        }
        encoder.to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<AwarenessUpdate, ProtocolError> {
        let mut decoder = DecoderV1::new(Cursor::new(data));
        let len: usize = decoder.read_var()?;
        let mut clients = Vec::new();
        for _ in 0..len {
            let client_id: u64 = decoder.read_var()?;
            let clock: u32 = decoder.read_var()?;
            let state = decoder.read_string()?.to_string();
            clients.push(AwarenessEntry {
                client_id,
                clock,
                state,
            });
        }
        Ok(AwarenessUpdate { clients })
    }
}

/// Errors raised while decoding or applying protocol messages. Never fatal:
/// the dispatcher logs them and keeps serving other connections.
#[derive(Debug)]
pub enum ProtocolError {
    Decode(yrs::encoding::read::Error),
    UnexpectedTag(u64),
    Apply(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Decode(e) => write!(f, "Failed to decode message: {}", e),
            ProtocolError::UnexpectedTag(tag) => write!(f, "Unexpected sync message tag: {}", tag),
            ProtocolError::Apply(e) => write!(f, "Failed to apply document update: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<yrs::encoding::read::Error> for ProtocolError {
    fn from(e: yrs::encoding::read::Error) -> Self {
        ProtocolError::Decode(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yrs::updates::encoder::Encode;
    use yrs::{Doc, ReadTxn, Transact};

    #[test]
    fn sync_step1_roundtrip() {
        let doc = Doc::new();
        let sv = doc.transact().state_vector();
        let encoded = HubMessage::Sync(SyncMessage::SyncStep1(sv.clone())).encode();

        match HubMessage::decode(&encoded).unwrap() {
            Some(HubMessage::Sync(SyncMessage::SyncStep1(decoded))) => {
                assert_eq!(decoded.encode_v1(), sv.encode_v1());
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn sync_update_roundtrip() {
        let update = vec![1u8, 2, 3, 4];
        let encoded = HubMessage::Sync(SyncMessage::Update(update.clone())).encode();

        assert_eq!(
            HubMessage::decode(&encoded).unwrap(),
            Some(HubMessage::Sync(SyncMessage::Update(update)))
        );
    }

    #[test]
    fn awareness_roundtrip() {
        let update = AwarenessUpdate {
            clients: vec![
                AwarenessEntry {
                    client_id: 42,
                    clock: 3,
                    state: r#"{"cursor":7}"#.to_string(),
                },
                AwarenessEntry {
                    client_id: 7,
                    clock: 1,
                    state: AWARENESS_NULL_STATE.to_string(),
                },
            ],
        };
        let encoded = HubMessage::Awareness(update.clone()).encode();

        assert_eq!(
            HubMessage::decode(&encoded).unwrap(),
            Some(HubMessage::Awareness(update))
        );
    }

    #[test]
    fn unknown_tag_is_ignored() {
        // Tag 7 is not a known message type; the envelope must decode to None
        // rather than an error.
        let mut data = vec![7u8];
        data.extend_from_slice(b"whatever");
        assert_eq!(HubMessage::decode(&data).unwrap(), None);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let encoded = HubMessage::Sync(SyncMessage::Update(vec![1, 2, 3])).encode();
        assert!(HubMessage::decode(&encoded[..2]).is_err());
    }
}
