// Copyright 2016 the fix44 project developers. See the COPYRIGHT file
// at the top-level directory of this distribution.
//
// Licensed under:
//   the MIT license
//     <LICENSE-MIT or https://opensource.org/licenses/MIT>
//   or the Apache License, Version 2.0
//     <LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0>,
// at your option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Constructors for the administrative message family. Application messages
//! are built by their owners; the order family lives in [`crate::order`].

use crate::dictionary::{fields, msg_type};
use crate::message::FixMessage;

fn set(msg: &mut FixMessage, tag: crate::field_tag::FieldTag, value: impl Into<String>) {
    msg.set(tag, value).expect("fresh tag on a new message");
}

pub fn logon(heart_bt_int: u32, reset_seq_num: bool) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::LOGON);
    //EncryptMethod 0: no encryption at this layer.
    set(&mut msg, fields::ENCRYPT_METHOD, "0");
    set(&mut msg, fields::HEART_BT_INT, heart_bt_int.to_string());
    if reset_seq_num {
        set(&mut msg, fields::RESET_SEQ_NUM_FLAG, "Y");
    }
    msg
}

pub fn logout(text: Option<&str>) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::LOGOUT);
    if let Some(text) = text {
        set(&mut msg, fields::TEXT, text);
    }
    msg
}

pub fn heartbeat(test_req_id: Option<&str>) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::HEARTBEAT);
    if let Some(test_req_id) = test_req_id {
        set(&mut msg, fields::TEST_REQ_ID, test_req_id);
    }
    msg
}

pub fn test_request(test_req_id: &str) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::TEST_REQUEST);
    set(&mut msg, fields::TEST_REQ_ID, test_req_id);
    msg
}

/// EndSeqNo 0 asks for everything through the peer's last sent message.
pub fn resend_request(begin_seq_no: u32, end_seq_no: u32) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::RESEND_REQUEST);
    set(&mut msg, fields::BEGIN_SEQ_NO, begin_seq_no.to_string());
    set(&mut msg, fields::END_SEQ_NO, end_seq_no.to_string());
    msg
}

pub fn sequence_reset(new_seq_no: u32, gap_fill: bool) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::SEQUENCE_RESET);
    set(&mut msg, fields::NEW_SEQ_NO, new_seq_no.to_string());
    if gap_fill {
        set(&mut msg, fields::GAP_FILL_FLAG, "Y");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::fields;

    #[test]
    fn logon_fields() {
        let msg = logon(30, true);
        assert_eq!(msg.msg_type(), "A");
        assert_eq!(msg.get(fields::ENCRYPT_METHOD).unwrap(), "0");
        assert_eq!(msg.get(fields::HEART_BT_INT).unwrap(), "30");
        assert!(msg.get_bool(fields::RESET_SEQ_NUM_FLAG).unwrap());

        let plain = logon(30, false);
        assert!(!plain.contains(fields::RESET_SEQ_NUM_FLAG));
    }

    #[test]
    fn resend_request_range() {
        let msg = resend_request(5, 0);
        assert_eq!(msg.get_int(fields::BEGIN_SEQ_NO).unwrap(), 5);
        assert_eq!(msg.get_int(fields::END_SEQ_NO).unwrap(), 0);
    }

    #[test]
    fn gap_fill_reset() {
        let msg = sequence_reset(10, true);
        assert_eq!(msg.get_int(fields::NEW_SEQ_NO).unwrap(), 10);
        assert!(msg.get_bool(fields::GAP_FILL_FLAG).unwrap());
    }
}
