// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Fixed-size message record carried by every transport
//!
//! The lane is not part of the record; transports carry it as their routing
//! discriminator (System V `mtype`) next to the body.
//!
//! ```text
//! [message_type: i32 le]
//! [correlation_id: i32 le]
//! [payload_len: u32 le]      <= 128
//! [payload: 128 bytes]       zero-padded
//! [sender: 32 bytes]         NUL-padded UTF-8
//! [recipient: 32 bytes]      NUL-padded UTF-8
//! ```

use crate::error::WireError;
use crate::lane::Lane;
use crate::message::{MailboxName, Message, Payload, MAX_NAME_LEN, MAX_PAYLOAD_LEN};

const TYPE_OFFSET: usize = 0;
const ID_OFFSET: usize = 4;
const LEN_OFFSET: usize = 8;
const PAYLOAD_OFFSET: usize = 12;
const SENDER_OFFSET: usize = PAYLOAD_OFFSET + MAX_PAYLOAD_LEN;
const RECIPIENT_OFFSET: usize = SENDER_OFFSET + MAX_NAME_LEN;

/// Size of an encoded record body.
pub const RECORD_LEN: usize = RECIPIENT_OFFSET + MAX_NAME_LEN;

/// Encoded record body.
pub type Record = [u8; RECORD_LEN];

/// Encodes `message` into a fixed-size record.
pub fn encode(message: &Message) -> Record {
    let mut record = [0u8; RECORD_LEN];
    record[TYPE_OFFSET..ID_OFFSET].copy_from_slice(&message.message_type().to_le_bytes());
    record[ID_OFFSET..LEN_OFFSET].copy_from_slice(&message.correlation_id().to_le_bytes());
    let payload = message.payload_buffer();
    record[LEN_OFFSET..PAYLOAD_OFFSET].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    record[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload.len()].copy_from_slice(payload.as_bytes());
    put_name(&mut record[SENDER_OFFSET..RECIPIENT_OFFSET], message.sender());
    put_name(&mut record[RECIPIENT_OFFSET..RECORD_LEN], message.recipient());
    record
}

/// Decodes a record body received on `lane`.
pub fn decode(lane: Lane, bytes: &[u8]) -> Result<Message, WireError> {
    if bytes.len() != RECORD_LEN {
        return Err(WireError::Truncated { len: bytes.len(), expected: RECORD_LEN });
    }
    let message_type = i32::from_le_bytes(word(bytes, TYPE_OFFSET));
    let correlation_id = i32::from_le_bytes(word(bytes, ID_OFFSET));
    let payload_len = u32::from_le_bytes(word(bytes, LEN_OFFSET));
    if payload_len as usize > MAX_PAYLOAD_LEN {
        return Err(WireError::BadLength(payload_len));
    }
    let end = PAYLOAD_OFFSET + payload_len as usize;
    let payload = Payload::new(&bytes[PAYLOAD_OFFSET..end]).map_err(|_| WireError::BadLength(payload_len))?;
    let sender = take_name(&bytes[SENDER_OFFSET..RECIPIENT_OFFSET])?;
    let recipient = take_name(&bytes[RECIPIENT_OFFSET..RECORD_LEN])?;
    Ok(Message::from_parts(lane, message_type, correlation_id, payload, sender, recipient))
}

fn word(bytes: &[u8], offset: usize) -> [u8; 4] {
    [bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]
}

fn put_name(field: &mut [u8], name: &MailboxName) {
    let raw = name.as_bytes();
    field[..raw.len()].copy_from_slice(raw);
}

fn take_name(field: &[u8]) -> Result<MailboxName, WireError> {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    let text = core::str::from_utf8(&field[..end]).map_err(|_| WireError::BadName)?;
    MailboxName::new(text).map_err(|_| WireError::BadName)
}
