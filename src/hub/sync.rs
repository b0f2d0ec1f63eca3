use yrs::updates::decoder::Decode;
use yrs::{ReadTxn, Transact, Update};

use super::protocol::{HubMessage, ProtocolError, SyncMessage};
use super::session::DocumentSession;

/// Explicit result of applying one inbound sync message: an optional reply
/// for the originating connection and an optional broadcast for every
/// attached connection. The dispatcher drains both after the apply completes,
/// so the apply-fully-then-broadcast ordering is preserved without any
/// listener callbacks.
pub struct SyncOutcome {
    pub reply: Option<Vec<u8>>,
    pub broadcast: Option<Vec<u8>>,
}

impl DocumentSession {
    /// Register a connection and build the messages that bring it up to date:
    /// a sync handshake step 1 carrying this session's state vector, plus a
    /// full awareness snapshot when any presence state exists. Both go to the
    /// new connection only.
    pub fn attach(&self, connection_id: &str) -> Vec<Vec<u8>> {
        let mut inner = self.lock();
        inner.conns.insert(connection_id.to_string());

        let state_vector = inner.doc.transact().state_vector();
        let mut initial = vec![HubMessage::Sync(SyncMessage::SyncStep1(state_vector)).encode()];
        if !inner.awareness.is_empty() {
            initial.push(HubMessage::Awareness(inner.awareness.snapshot()).encode());
        }
        initial
    }

    /// Remove a connection from the attached set. Document state is untouched.
    pub fn detach(&self, connection_id: &str) {
        self.lock().conns.remove(connection_id);
    }

    /// Apply one inbound sync message against the session document.
    ///
    /// A handshake step 1 answers with step 2 (the deltas the requester is
    /// missing) to the originator only. Step 2 and update messages merge into
    /// the document and rebroadcast the update bytes to every attached
    /// connection, the sender included; clients treat the no-op re-application
    /// of their own update as such.
    pub fn apply_sync(&self, message: SyncMessage) -> Result<SyncOutcome, ProtocolError> {
        let inner = self.lock();
        match message {
            SyncMessage::SyncStep1(state_vector) => {
                let missing = inner.doc.transact().encode_state_as_update_v1(&state_vector);
                Ok(SyncOutcome {
                    reply: Some(HubMessage::Sync(SyncMessage::SyncStep2(missing)).encode()),
                    broadcast: None,
                })
            }
            SyncMessage::SyncStep2(bytes) | SyncMessage::Update(bytes) => {
                let update = Update::decode_v1(&bytes)?;
                let mut txn = inner.doc.transact_mut();
                txn.apply_update(update)
                    .map_err(|e| ProtocolError::Apply(e.to_string()))?;
                drop(txn);
                Ok(SyncOutcome {
                    reply: None,
                    broadcast: Some(HubMessage::Sync(SyncMessage::Update(bytes)).encode()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::protocol::HubMessage;
    use yrs::{Doc, GetString, StateVector, Text, Transact};

    fn update_with_text(text: &str) -> Vec<u8> {
        let doc = Doc::new();
        let content = doc.get_or_insert_text("content");
        let mut txn = doc.transact_mut();
        content.insert(&mut txn, 0, text);
        drop(txn);
        let update = doc
            .transact()
            .encode_state_as_update_v1(&StateVector::default());
        update
    }

    #[test]
    fn attach_sends_sync_step1() {
        let session = DocumentSession::new("room");
        let initial = session.attach("conn-a");

        assert_eq!(initial.len(), 1);
        match HubMessage::decode(&initial[0]).unwrap() {
            Some(HubMessage::Sync(SyncMessage::SyncStep1(_))) => {}
            other => panic!("expected sync step 1, got {:?}", other),
        }
        assert_eq!(session.connection_count(), 1);
    }

    #[test]
    fn update_merges_and_rebroadcasts() {
        let session = DocumentSession::new("room");
        let update = update_with_text("hello");

        let outcome = session
            .apply_sync(SyncMessage::Update(update.clone()))
            .unwrap();
        assert!(outcome.reply.is_none());

        let broadcast = outcome.broadcast.expect("update must broadcast");
        assert_eq!(
            HubMessage::decode(&broadcast).unwrap(),
            Some(HubMessage::Sync(SyncMessage::Update(update)))
        );
    }

    #[test]
    fn step1_answers_with_missing_deltas() {
        let session = DocumentSession::new("room");
        session
            .apply_sync(SyncMessage::Update(update_with_text("hello")))
            .unwrap();

        // A fresh replica announces an empty state vector and must receive
        // the full document back.
        let outcome = session
            .apply_sync(SyncMessage::SyncStep1(StateVector::default()))
            .unwrap();
        assert!(outcome.broadcast.is_none());

        let reply = outcome.reply.expect("step 1 must be answered");
        let missing = match HubMessage::decode(&reply).unwrap() {
            Some(HubMessage::Sync(SyncMessage::SyncStep2(update))) => update,
            other => panic!("expected sync step 2, got {:?}", other),
        };

        let replica = Doc::new();
        let content = replica.get_or_insert_text("content");
        let mut txn = replica.transact_mut();
        txn.apply_update(Update::decode_v1(&missing).unwrap()).unwrap();
        drop(txn);
        assert_eq!(content.get_string(&replica.transact()), "hello");
    }

    #[test]
    fn malformed_update_does_not_poison_the_session() {
        let session = DocumentSession::new("room");
        assert!(session
            .apply_sync(SyncMessage::Update(vec![0xff, 0xff, 0xff]))
            .is_err());

        // The session keeps operating after a decode failure.
        let outcome = session
            .apply_sync(SyncMessage::Update(update_with_text("still alive")))
            .unwrap();
        assert!(outcome.broadcast.is_some());
    }
}
