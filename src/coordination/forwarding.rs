//! Follower→leader request tunnel: a follower that
//! receives a write wraps it as `{forward_type, body_len, body}` and sends it
//! to the leader over a persistent connection, then drains the leader's
//! response back to the originating client.

use std::collections::{HashMap, VecDeque};

use crate::error::{EngineError, EngineResult, ErrorCode};

/// A writable-socket callback drains at most this many bytes of queued
/// responses per invocation.
pub const SENT_BUFFER_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardType {
    Handshake,
    Sessions,
    GetSession,
    UpdateSession,
    Op,
}

#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    pub forward_type: ForwardType,
    pub body: Vec<u8>,
}

impl ForwardedMessage {
    pub fn encode(&self) -> Vec<u8> {
        let tag = match self.forward_type {
            ForwardType::Handshake => 0u8,
            ForwardType::Sessions => 1,
            ForwardType::GetSession => 2,
            ForwardType::UpdateSession => 3,
            ForwardType::Op => 4,
        };
        let mut out = Vec::with_capacity(1 + 4 + self.body.len());
        out.push(tag);
        out.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(bytes: &[u8]) -> EngineResult<Self> {
        if bytes.len() < 5 {
            return Err(EngineError::new(ErrorCode::NetworkError, "forwarded message truncated"));
        }
        let forward_type = match bytes[0] {
            0 => ForwardType::Handshake,
            1 => ForwardType::Sessions,
            2 => ForwardType::GetSession,
            3 => ForwardType::UpdateSession,
            4 => ForwardType::Op,
            other => return Err(EngineError::new(ErrorCode::NetworkError, format!("unknown forward type {other}"))),
        };
        let body_len = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
        let body = bytes.get(5..5 + body_len).ok_or_else(|| EngineError::new(ErrorCode::NetworkError, "forwarded body truncated"))?;
        Ok(Self { forward_type, body: body.to_vec() })
    }
}

pub type ClientKey = (u64, u64); // (server_id, client_id)

/// One FIFO response queue per `(server_id, client_id)` pair, drained by the
/// reactor thread on writable-socket events.
#[derive(Default)]
pub struct ForwardingHandler {
    queues: HashMap<ClientKey, VecDeque<Vec<u8>>>,
}

impl ForwardingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_response(&mut self, key: ClientKey, body: Vec<u8>) {
        self.queues.entry(key).or_default().push_back(body);
    }

    /// Synthesizes an error response when the leader fails so the client is
    /// never left waiting (spec: `SYSTEM_ERROR`/`TIMEOUT_EXCEEDED`).
    pub fn synthesize_error(&mut self, key: ClientKey, code: ErrorCode) {
        self.enqueue_response(key, vec![error_tag(code)]);
    }

    /// Drains queued responses for `key` until `SENT_BUFFER_SIZE` bytes have
    /// been emitted or the queue is empty.
    pub fn drain(&mut self, key: ClientKey) -> Vec<Vec<u8>> {
        let queue = match self.queues.get_mut(&key) {
            Some(q) => q,
            None => return Vec::new(),
        };
        let mut drained = Vec::new();
        let mut budget = SENT_BUFFER_SIZE;
        while let Some(front) = queue.front() {
            if !drained.is_empty() && front.len() > budget {
                break;
            }
            let msg = queue.pop_front().unwrap();
            budget = budget.saturating_sub(msg.len());
            drained.push(msg);
        }
        drained
    }

    pub fn pending_count(&self, key: ClientKey) -> usize {
        self.queues.get(&key).map(|q| q.len()).unwrap_or(0)
    }
}

fn error_tag(code: ErrorCode) -> u8 {
    match code {
        ErrorCode::SystemError => 1,
        ErrorCode::TimeoutExceeded => 2,
        _ => 0,
    }
}
