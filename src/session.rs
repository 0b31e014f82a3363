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

use serde::{Deserialize, Serialize};

use crate::dictionary::fields;
use crate::error::FixError;
use crate::message::FixMessage;

/// Outcome of checking an inbound MsgSeqNum against the expected one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeqNumStatus {
    /// Exactly the expected number; the counter advanced.
    InOrder(u32),
    /// Below the expected number. Either a duplicate or an expected resend;
    /// the caller decides which.
    Duplicate(u32),
    /// Above the expected number. A gap; the caller requests a resend.
    Gap(u32),
}

/// One FIX session: the comp id identity pair and the two monotonic
/// sequence counters. Both counters start at 1. FIX 4.4, Volume 2, page 4.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    sender_comp_id: String,
    target_comp_id: String,
    next_num_out: u32,
    next_num_in: u32,
}

impl Session {
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>) -> Self {
        Session::with_seq_nums(sender_comp_id, target_comp_id, 1, 1)
    }

    pub fn with_seq_nums(
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
        next_num_out: u32,
        next_num_in: u32,
    ) -> Self {
        Session {
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            next_num_out,
            next_num_in,
        }
    }

    pub fn sender_comp_id(&self) -> &str {
        &self.sender_comp_id
    }

    pub fn target_comp_id(&self) -> &str {
        &self.target_comp_id
    }

    /// Session identity, used as the journal key.
    pub fn key(&self) -> String {
        format!("{}->{}", self.sender_comp_id, self.target_comp_id)
    }

    pub fn next_num_out(&self) -> u32 {
        self.next_num_out
    }

    pub fn next_num_in(&self) -> u32 {
        self.next_num_in
    }

    /// Hands out the next outbound sequence number and advances the counter.
    pub fn allocate_next_num_out(&mut self) -> u32 {
        let seq_num = self.next_num_out;
        self.next_num_out += 1;
        seq_num
    }

    /// Checks the MsgSeqNum of an inbound message against the expected
    /// inbound counter, advancing it only on an exact match.
    pub fn set_next_num_in(&mut self, msg: &FixMessage) -> Result<SeqNumStatus, FixError> {
        let seq_num = msg.get_int(fields::MSG_SEQ_NUM)?;
        let seq_num = u32::try_from(seq_num)
            .map_err(|_| FixError::Message(format!("MsgSeqNum {} out of range", seq_num)))?;

        if seq_num == self.next_num_in {
            self.next_num_in += 1;
            Ok(SeqNumStatus::InOrder(seq_num))
        } else if seq_num < self.next_num_in {
            Ok(SeqNumStatus::Duplicate(seq_num))
        } else {
            Ok(SeqNumStatus::Gap(seq_num))
        }
    }

    /// Overrides the inbound counter. SequenceReset is the only caller.
    pub fn force_next_num_in(&mut self, next_num_in: u32) {
        self.next_num_in = next_num_in;
    }

    pub fn set_seq_nums(&mut self, next_num_out: u32, next_num_in: u32) {
        self.next_num_out = next_num_out;
        self.next_num_in = next_num_in;
    }

    /// Both counters back to 1, the ResetSeqNumFlag case.
    pub fn reset(&mut self) {
        self.set_seq_nums(1, 1);
    }

    /// Validates the comp ids of an inbound message: the peer's
    /// SenderCompID must be our target and their TargetCompID our sender.
    pub fn validate_comp_ids(&self, sender_comp_id: &str, target_comp_id: &str) -> bool {
        sender_comp_id == self.target_comp_id && target_comp_id == self.sender_comp_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FixMessage;

    fn msg_with_seq_num(seq_num: u32) -> FixMessage {
        let mut msg = FixMessage::new("0");
        msg.set_msg_seq_num(seq_num);
        msg
    }

    #[test]
    fn allocation_is_monotonic() {
        let mut session = Session::new("ME", "YOU");
        assert_eq!(session.allocate_next_num_out(), 1);
        assert_eq!(session.allocate_next_num_out(), 2);
        assert_eq!(session.next_num_out(), 3);
    }

    #[test]
    fn inbound_gate() {
        let mut session = Session::with_seq_nums("ME", "YOU", 1, 5);

        assert_eq!(
            session.set_next_num_in(&msg_with_seq_num(5)).unwrap(),
            SeqNumStatus::InOrder(5)
        );
        assert_eq!(session.next_num_in(), 6);

        assert_eq!(
            session.set_next_num_in(&msg_with_seq_num(3)).unwrap(),
            SeqNumStatus::Duplicate(3)
        );
        assert_eq!(session.next_num_in(), 6);

        assert_eq!(
            session.set_next_num_in(&msg_with_seq_num(9)).unwrap(),
            SeqNumStatus::Gap(9)
        );
        assert_eq!(session.next_num_in(), 6);
    }

    #[test]
    fn comp_id_symmetry() {
        let session = Session::new("ME", "YOU");
        assert!(session.validate_comp_ids("YOU", "ME"));
        assert!(!session.validate_comp_ids("ME", "YOU"));
        assert!(!session.validate_comp_ids("YOU", "OTHER"));
    }
}
