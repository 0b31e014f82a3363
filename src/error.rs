// Copyright 2017 the fix44 project developers. See the COPYRIGHT file
// at the top-level directory of this distribution.
//
// Licensed under:
//   the MIT license
//     <LICENSE-MIT or https://opensource.org/licenses/MIT>
//   or the Apache License, Version 2.0
//     <LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0>,
// at your option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;

use thiserror::Error;

use crate::field_tag::FieldTag;
use crate::journal::Direction;

/// Every failure the engine can surface to a caller.
///
/// Most variants are recoverable from the caller's point of view: the
/// offending message is rejected and the session continues. The exception is
/// [`FixError::DuplicateSeqNo`] which indicates the journal no longer agrees
/// with the session counters and the session must be torn down.
#[derive(Debug, Error)]
pub enum FixError {
    /// Malformed in-memory message construction, such as setting a duplicate
    /// tag without asking for a replace.
    #[error("message error: {0}")]
    Message(String),

    /// Illegal operation for the current connection state, a comp id
    /// mismatch, or a missed TestRequest response.
    #[error("connection error: {0}")]
    Connection(String),

    /// Journal integrity violation. Unrecoverable; the session terminates.
    #[error("duplicate sequence number {seq_num} for session {session} ({direction})")]
    DuplicateSeqNo {
        session: String,
        direction: Direction,
        seq_num: u32,
    },

    /// Framing or sequence number policy violation while encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Malformed frame, bad checksum, or an unparseable body during a strict
    /// decode.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A tag was read that is not present on the message and no default was
    /// supplied.
    #[error("tag {0} not found")]
    TagNotFound(FieldTag),

    /// A scalar read hit a tag that decoded more than once outside of any
    /// repeating group. This almost always means a group the protocol
    /// profile does not know about.
    #[error("tag {0} repeats; read it through the group accessor")]
    RepeatingTag(FieldTag),

    /// A repeating group appeared in a message type the protocol profile
    /// does not declare it for. Decoding cannot proceed past this point.
    #[error("group tag {0} is not mapped for message type {1}")]
    UnmappedGroup(FieldTag, String),

    /// Required/value/enum violation found by the schema validator.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl FixError {
    /// True for errors that must terminate the session rather than merely
    /// reject a message.
    pub fn is_critical(&self) -> bool {
        matches!(self, FixError::DuplicateSeqNo { .. })
    }
}
