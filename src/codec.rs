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

//! Encoding and decoding between byte frames and [`FixMessage`] containers.
//!
//! A frame is `8=FIX.4.4|9=<len>|<body>|10=<sum>|` with SOH separators.
//! BodyLength counts the bytes from right after the SOH terminating the
//! BodyLength field up to and including the SOH before the checksum field.
//! The checksum is the sum of every preceding byte modulo 256, rendered as
//! exactly three digits. FIX 4.4, Volume 2, page 9.

use chrono::Utc;
use tracing::warn;

use crate::constant::{
    CHECKSUM_FIELD_LEN, FRAME_PREFIX, SENDING_TIME_FORMAT, TAG_END, VALUE_END,
};
use crate::dictionary::{fields, msg_type};
use crate::error::FixError;
use crate::field_tag::FieldTag;
use crate::message::{is_reserved_tag, FieldMap, FieldValue, FixMessage};
use crate::profile::{Fix44Profile, GroupDef};
use crate::session::Session;

//Frames this long are garbled no matter what BodyLength claims.
const MAX_BODY_LENGTH: usize = 1 << 20;

//The only message types whose MsgSeqNum the caller may pin. Narrower than
//the administrative set: Reject (3) is administrative but never rides on a
//raw sequence number.
fn allows_raw_seq_num(value: &str) -> bool {
    matches!(
        value,
        msg_type::LOGON
            | msg_type::LOGOUT
            | msg_type::RESEND_REQUEST
            | msg_type::SEQUENCE_RESET
            | msg_type::HEARTBEAT
            | msg_type::TEST_REQUEST
    )
}

/// A fully decoded frame plus its consumption bookkeeping.
#[derive(Debug)]
pub struct DecodedFrame {
    pub message: FixMessage,
    /// Bytes consumed from the input, leading garbage included.
    pub consumed: usize,
    /// The exact frame bytes, garbage excluded.
    pub raw: Vec<u8>,
}

/// Outcome of one strict decode call.
#[derive(Debug)]
pub enum Decoded {
    Frame(DecodedFrame),
    /// The buffer holds less than one complete frame. Nothing was consumed.
    NeedMore,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Codec {
    profile: Fix44Profile,
}

impl Codec {
    pub fn new() -> Self {
        Codec {
            profile: Fix44Profile::new(),
        }
    }

    pub fn profile(&self) -> &Fix44Profile {
        &self.profile
    }

    /// Serializes a message, injecting the standard header and trailer.
    ///
    /// The sequence number policy depends on the message class. Session
    /// messages (Logon, Logout, ResendRequest, SequenceReset, Heartbeat,
    /// TestRequest) may carry their own MsgSeqNum when `raw_seq_num` is set;
    /// everything else must leave `raw_seq_num` false and gets the next
    /// outbound number allocated from `session`.
    pub fn encode(
        &self,
        msg: &FixMessage,
        session: &mut Session,
        raw_seq_num: bool,
    ) -> Result<Vec<u8>, FixError> {
        if raw_seq_num && !allows_raw_seq_num(msg.msg_type()) {
            return Err(FixError::Encoding(format!(
                "raw sequence numbers are only honored for session control messages, not {}",
                msg.msg_type()
            )));
        }

        let preset_seq_num = match msg.field_map().get_opt(fields::MSG_SEQ_NUM) {
            Ok(value) => value.map(str::to_string),
            Err(err) => return Err(FixError::Encoding(err.to_string())),
        };

        let seq_num = if raw_seq_num {
            match preset_seq_num {
                Some(value) => value,
                None => {
                    return Err(FixError::Encoding(
                        "raw sequence number requested but MsgSeqNum is not set".to_string(),
                    ))
                }
            }
        } else {
            if preset_seq_num.is_some() {
                return Err(FixError::Encoding(format!(
                    "MsgSeqNum must not be pre-set on {} without raw_seq_num",
                    msg.msg_type()
                )));
            }
            session.allocate_next_num_out().to_string()
        };

        let mut body = Vec::with_capacity(256);
        write_field(&mut body, fields::MSG_TYPE, msg.msg_type().as_bytes());
        write_field(
            &mut body,
            fields::SENDER_COMP_ID,
            session.sender_comp_id().as_bytes(),
        );
        write_field(
            &mut body,
            fields::TARGET_COMP_ID,
            session.target_comp_id().as_bytes(),
        );
        write_field(&mut body, fields::MSG_SEQ_NUM, seq_num.as_bytes());
        write_field(
            &mut body,
            fields::SENDING_TIME,
            sending_time_now().as_bytes(),
        );
        write_user_fields(&mut body, msg.field_map());

        Ok(frame_body(&body))
    }

    /// Strict decode of at most one frame from the front of `buf`.
    ///
    /// Garbage before a frame prefix is skipped and counted into `consumed`.
    /// Malformed frames raise [`FixError::Decoding`]; use
    /// [`Codec::decode_silent`] when the error tuple shape is wanted.
    pub fn decode(&self, buf: &[u8]) -> Result<Decoded, FixError> {
        self.decode_inner(buf).map_err(|(_, err)| err)
    }

    /// Decode that never raises: returns the message (if any), the bytes to
    /// consume, and the raw frame (if any). Errors are reduced to a skip
    /// count that steps past the offending bytes.
    pub fn decode_silent(&self, buf: &[u8]) -> (Option<FixMessage>, usize, Option<Vec<u8>>) {
        match self.decode_inner(buf) {
            Ok(Decoded::Frame(frame)) => (Some(frame.message), frame.consumed, Some(frame.raw)),
            Ok(Decoded::NeedMore) => (None, 0, None),
            Err((skip, err)) => {
                warn!(error = %err, skip, "dropping undecodable bytes");
                (None, skip, None)
            }
        }
    }

    //On error, the usize is how far a silent caller should skip forward.
    fn decode_inner(&self, buf: &[u8]) -> Result<Decoded, (usize, FixError)> {
        //Scan for the frame prefix, skipping any garbage in front of it.
        let start = match find_frame_prefix(buf) {
            Some(start) => start,
            None => {
                //Hold on to a tail that might still grow into a prefix; the
                //rest is garbage and can go.
                let garbage = garbage_len(buf);
                if garbage == 0 {
                    return Ok(Decoded::NeedMore);
                }
                return Err((
                    garbage,
                    FixError::Decoding("no frame prefix in input".to_string()),
                ));
            }
        };

        //BodyLength must immediately follow the prefix.
        let after_prefix = start + FRAME_PREFIX.len();
        let mut at = after_prefix;
        if buf.len() < at + 2 {
            return Ok(Decoded::NeedMore);
        }
        if &buf[at..at + 2] != b"9=" {
            return Err((
                after_prefix,
                FixError::Decoding("BodyLength is not the second field".to_string()),
            ));
        }
        at += 2;

        let mut body_length: usize = 0;
        loop {
            match buf.get(at) {
                None => return Ok(Decoded::NeedMore),
                Some(&VALUE_END) => {
                    at += 1;
                    break;
                }
                Some(byte) if byte.is_ascii_digit() => {
                    body_length = body_length * 10 + usize::from(byte - b'0');
                    if body_length > MAX_BODY_LENGTH {
                        return Err((
                            after_prefix,
                            FixError::Decoding(format!("BodyLength {} is absurd", body_length)),
                        ));
                    }
                    at += 1;
                }
                Some(_) => {
                    return Err((
                        after_prefix,
                        FixError::Decoding("BodyLength is not a number".to_string()),
                    ))
                }
            }
        }

        let body_start = at;
        let checksum_start = body_start + body_length;
        let frame_end = checksum_start + CHECKSUM_FIELD_LEN;
        if buf.len() < frame_end {
            return Ok(Decoded::NeedMore);
        }

        //Checksum field must be exactly "10=ddd" followed by SOH.
        let checksum_field = &buf[checksum_start..frame_end];
        if &checksum_field[..3] != b"10="
            || checksum_field[6] != VALUE_END
            || !checksum_field[3..6].iter().all(u8::is_ascii_digit)
        {
            return Err((
                frame_end,
                FixError::Decoding("checksum field is malformed".to_string()),
            ));
        }

        let stated: u32 = std::str::from_utf8(&checksum_field[3..6])
            .expect("three ascii digits")
            .parse()
            .expect("three ascii digits");
        let computed = checksum(&buf[start..checksum_start]);
        if u32::from(computed) != stated {
            return Err((
                frame_end,
                FixError::Decoding(format!(
                    "checksum mismatch: computed {:03}, stated {:03}",
                    computed, stated
                )),
            ));
        }

        let mut message = self
            .parse_body(&buf[body_start..checksum_start], body_length)
            .map_err(|err| (frame_end, err))?;
        message.insert_decoded(
            fields::CHECK_SUM,
            String::from_utf8_lossy(&checksum_field[3..6]).into_owned(),
        );

        Ok(Decoded::Frame(DecodedFrame {
            message,
            consumed: frame_end,
            raw: buf[start..frame_end].to_vec(),
        }))
    }

    fn parse_body(&self, body: &[u8], body_length: usize) -> Result<FixMessage, FixError> {
        let pairs = split_pairs(body)?;
        if pairs.is_empty() || pairs[0].0 != fields::MSG_TYPE {
            return Err(FixError::Decoding(
                "first tag of the body must be MsgType".to_string(),
            ));
        }

        let msg_type = String::from_utf8_lossy(pairs[0].1).into_owned();
        let mut map = FieldMap::new();
        map.insert_decoded(fields::BEGIN_STRING, "FIX.4.4".to_string());
        map.insert_decoded(fields::BODY_LENGTH, body_length.to_string());
        map.insert_decoded(fields::MSG_TYPE, msg_type.clone());

        let mut at = 1;
        while at < pairs.len() {
            let (tag, value) = pairs[at];
            if let Some(def) = self.profile.group(&msg_type, tag) {
                let count = parse_group_count(tag, value)?;
                at += 1;
                let entries = self.parse_group_entries(&pairs, &mut at, def, &msg_type, count)?;
                map.insert_decoded_group(tag, entries);
            } else if self.profile.is_group_count_tag(tag) {
                return Err(FixError::UnmappedGroup(tag, msg_type));
            } else {
                map.insert_decoded(tag, String::from_utf8_lossy(value).into_owned());
                at += 1;
            }
        }

        Ok(FixMessage::from_decoded(msg_type, map))
    }

    //Entries open on each occurrence of the delimiter, which is whatever tag
    //immediately follows the count, and close on a tag outside the member
    //set. FIX 4.4, Volume 1, page 15.
    fn parse_group_entries(
        &self,
        pairs: &[(FieldTag, &[u8])],
        at: &mut usize,
        def: &GroupDef,
        msg_type: &str,
        count: usize,
    ) -> Result<Vec<FieldMap>, FixError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let delimiter = match pairs.get(*at) {
            Some(&(tag, _)) if def.is_member(tag) => tag,
            _ => {
                return Err(FixError::Decoding(format!(
                    "group {} is not followed by one of its member tags",
                    def.count_tag
                )))
            }
        };

        let mut entries: Vec<FieldMap> = Vec::with_capacity(count);
        let mut current: Option<FieldMap> = None;
        while let Some(&(tag, value)) = pairs.get(*at) {
            if tag == delimiter {
                if let Some(done) = current.take() {
                    entries.push(done);
                }
                if entries.len() == count {
                    //All stated entries seen; this delimiter belongs to
                    //something else.
                    current = None;
                    break;
                }
                let mut entry = FieldMap::new();
                entry.insert_decoded(tag, String::from_utf8_lossy(value).into_owned());
                current = Some(entry);
                *at += 1;
            } else if def.is_member(tag) {
                let entry = current.as_mut().ok_or_else(|| {
                    FixError::Decoding(format!(
                        "group member {} before the first delimiter of group {}",
                        tag, def.count_tag
                    ))
                })?;
                if let Some(nested_def) = self.profile.group(msg_type, tag) {
                    let nested_count = parse_group_count(tag, value)?;
                    *at += 1;
                    let nested =
                        self.parse_group_entries(pairs, at, nested_def, msg_type, nested_count)?;
                    entry.insert_decoded_group(tag, nested);
                } else {
                    entry.insert_decoded(tag, String::from_utf8_lossy(value).into_owned());
                    *at += 1;
                }
            } else {
                break;
            }
        }
        if let Some(done) = current.take() {
            entries.push(done);
        }

        if entries.len() != count {
            return Err(FixError::Decoding(format!(
                "group {} declared {} entries but {} were present",
                def.count_tag,
                count,
                entries.len()
            )));
        }

        Ok(entries)
    }
}

/// Rewrites a journaled frame for retransmission: PossDupFlag becomes "Y",
/// OrigSendingTime takes the original SendingTime, SendingTime is refreshed,
/// and MsgSeqNum stays untouched. BodyLength and CheckSum are recomputed.
pub fn transform_for_replay(frame: &[u8]) -> Result<Vec<u8>, FixError> {
    let body_start = FRAME_PREFIX.len();
    if frame.len() < body_start || &frame[..body_start] != FRAME_PREFIX {
        return Err(FixError::Encoding(
            "replay source is not a FIX 4.4 frame".to_string(),
        ));
    }
    //Step past the BodyLength field; it gets recomputed below.
    let after_length = frame[body_start..]
        .iter()
        .position(|&byte| byte == VALUE_END)
        .map(|at| body_start + at + 1)
        .ok_or_else(|| FixError::Encoding("replay source has no BodyLength".to_string()))?;
    let checksum_start = frame
        .len()
        .checked_sub(CHECKSUM_FIELD_LEN)
        .filter(|&at| frame[at..].starts_with(b"10="))
        .ok_or_else(|| FixError::Encoding("replay source has no checksum".to_string()))?;

    let pairs = split_pairs(&frame[after_length..checksum_start])?;
    let mut body = Vec::with_capacity(frame.len() + 32);
    for &(tag, value) in &pairs {
        match tag {
            //Stale duplicate markers from an earlier replay are dropped and
            //rewritten below.
            fields::POSS_DUP_FLAG | fields::ORIG_SENDING_TIME => {}
            fields::SENDING_TIME => {
                write_field(&mut body, fields::SENDING_TIME, sending_time_now().as_bytes());
                write_field(&mut body, fields::ORIG_SENDING_TIME, value);
                write_field(&mut body, fields::POSS_DUP_FLAG, b"Y");
            }
            _ => write_field(&mut body, tag, value),
        }
    }

    Ok(frame_body(&body))
}

pub fn checksum(bytes: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for &byte in bytes {
        sum = sum.wrapping_add(byte);
    }
    sum
}

pub(crate) fn sending_time_now() -> String {
    Utc::now().format(SENDING_TIME_FORMAT).to_string()
}

fn frame_body(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 32);
    frame.extend_from_slice(FRAME_PREFIX);
    frame.extend_from_slice(b"9=");
    frame.extend_from_slice(body.len().to_string().as_bytes());
    frame.push(VALUE_END);
    frame.extend_from_slice(body);

    let sum = checksum(&frame);
    frame.extend_from_slice(b"10=");
    frame.extend_from_slice(format!("{:03}", sum).as_bytes());
    frame.push(VALUE_END);
    frame
}

fn write_field(buf: &mut Vec<u8>, tag: FieldTag, value: &[u8]) {
    buf.extend_from_slice(tag.to_bytes().as_slice());
    buf.push(TAG_END);
    buf.extend_from_slice(value);
    buf.push(VALUE_END);
}

fn write_user_fields(buf: &mut Vec<u8>, map: &FieldMap) {
    for (tag, value) in map.iter() {
        if is_reserved_tag(tag) {
            //Already written by the header path, or recomputed framing.
            continue;
        }
        match value {
            FieldValue::Scalar(scalar) => write_field(buf, tag, scalar.as_bytes()),
            FieldValue::Group(entries) => {
                write_field(buf, tag, entries.len().to_string().as_bytes());
                for entry in entries {
                    write_user_fields(buf, entry);
                }
            }
            FieldValue::Repeating(values) => {
                for repeat in values {
                    write_field(buf, tag, repeat.as_bytes());
                }
            }
        }
    }
}

fn find_frame_prefix(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_PREFIX.len())
        .position(|window| window == FRAME_PREFIX)
}

//Bytes at the front that can never become part of a frame prefix.
fn garbage_len(buf: &[u8]) -> usize {
    let max_keep = FRAME_PREFIX.len().min(buf.len());
    for keep in (1..=max_keep).rev() {
        if FRAME_PREFIX.starts_with(&buf[buf.len() - keep..]) {
            return buf.len() - keep;
        }
    }
    buf.len()
}

fn split_pairs(body: &[u8]) -> Result<Vec<(FieldTag, &[u8])>, FixError> {
    let mut pairs = Vec::with_capacity(16);
    for field in body.split(|&byte| byte == VALUE_END) {
        if field.is_empty() {
            continue;
        }
        let eq = field
            .iter()
            .position(|&byte| byte == TAG_END)
            .ok_or_else(|| {
                FixError::Decoding(format!(
                    "field {:?} has no tag separator",
                    String::from_utf8_lossy(field)
                ))
            })?;
        let tag = FieldTag::parse(&field[..eq]).ok_or_else(|| {
            FixError::Decoding(format!(
                "tag {:?} is not a number",
                String::from_utf8_lossy(&field[..eq])
            ))
        })?;
        let value = &field[eq + 1..];
        if value.is_empty() {
            return Err(FixError::Decoding(format!("no value after tag {}", tag)));
        }
        pairs.push((tag, value));
    }
    Ok(pairs)
}

fn parse_group_count(tag: FieldTag, value: &[u8]) -> Result<usize, FixError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            FixError::Decoding(format!(
                "group count {} value {:?} is not a number",
                tag,
                String::from_utf8_lossy(value)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::fields::*;
    use crate::message::FixMessage;
    use crate::session::Session;

    fn decode_one(codec: &Codec, bytes: &[u8]) -> DecodedFrame {
        match codec.decode(bytes).unwrap() {
            Decoded::Frame(frame) => frame,
            Decoded::NeedMore => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn encode_injects_header_and_trailer() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let mut msg = FixMessage::new("D");
        msg.set(CL_ORD_ID, "C1").unwrap();

        let bytes = codec.encode(&msg, &mut session, false).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("8=FIX.4.4\x019="));
        assert!(text.contains("\x0135=D\x0149=ME\x0156=YOU\x0134=1\x0152="));
        assert!(text.contains("\x0111=C1\x01"));
        assert_eq!(session.next_num_out(), 2);

        //Sum of everything before "10=" matches the stated checksum.
        let checksum_at = bytes.len() - CHECKSUM_FIELD_LEN;
        let stated: u32 = String::from_utf8_lossy(&bytes[checksum_at + 3..checksum_at + 6])
            .parse()
            .unwrap();
        assert_eq!(u32::from(checksum(&bytes[..checksum_at])), stated);
    }

    #[test]
    fn body_length_counts_to_checksum_soh() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let msg = FixMessage::new("0");
        let bytes = codec.encode(&msg, &mut session, false).unwrap();

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let length_start = text.find("9=").unwrap() + 2;
        let length_end = text[length_start..].find('\x01').unwrap() + length_start;
        let stated: usize = text[length_start..length_end].parse().unwrap();
        let body = &bytes[length_end + 1..bytes.len() - CHECKSUM_FIELD_LEN];
        assert_eq!(stated, body.len());
    }

    #[test]
    fn raw_seq_num_policy() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");

        //Raw on an application message is rejected.
        let mut order = FixMessage::new("D");
        order.set_msg_seq_num(7);
        assert!(codec.encode(&order, &mut session, true).is_err());
        //And a pre-set MsgSeqNum without raw is rejected too.
        assert!(codec.encode(&order, &mut session, false).is_err());

        //Reject is administrative but still outside the raw-eligible set.
        let mut reject = FixMessage::new("3");
        reject.set(REF_SEQ_NUM, "7").unwrap();
        reject.set_msg_seq_num(7);
        assert!(codec.encode(&reject, &mut session, true).is_err());

        //Session message with raw keeps its number and leaves the counter
        //alone.
        let mut reset = FixMessage::new("4");
        reset.set(NEW_SEQ_NO, "10").unwrap();
        reset.set(GAP_FILL_FLAG, "Y").unwrap();
        reset.set_msg_seq_num(3);
        let bytes = codec.encode(&reset, &mut session, true).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("\x0134=3\x01"));
        assert_eq!(session.next_num_out(), 1);

        //Raw without a pinned number is an error.
        let heartbeat = FixMessage::new("0");
        assert!(codec.encode(&heartbeat, &mut session, true).is_err());
    }

    #[test]
    fn decode_round_trip_with_group() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");

        let mut msg = FixMessage::new("D");
        msg.set(CL_ORD_ID, "C1").unwrap();
        let mut alloc_a = FieldMap::new();
        alloc_a.set(ALLOC_ID, "A").unwrap();
        alloc_a.set(ALLOC_AVG_PX, "1").unwrap();
        let mut alloc_b = FieldMap::new();
        alloc_b.set(ALLOC_ID, "B").unwrap();
        alloc_b.set(ALLOC_AVG_PX, "2").unwrap();
        msg.set_group(NO_ALLOCS, vec![alloc_a, alloc_b]).unwrap();

        let bytes = codec.encode(&msg, &mut session, false).unwrap();
        assert!(String::from_utf8_lossy(&bytes)
            .contains("78=2\x0170=A\x01153=1\x0170=B\x01153=2\x01"));

        let frame = decode_one(&codec, &bytes);
        assert_eq!(frame.consumed, bytes.len());
        assert_eq!(frame.raw, bytes);
        let decoded = frame.message;
        assert_eq!(decoded.msg_type(), "D");
        assert_eq!(decoded.get(CL_ORD_ID).unwrap(), "C1");
        let allocs = decoded.get_group_list(NO_ALLOCS).unwrap();
        assert_eq!(allocs.len(), 2);
        assert_eq!(allocs[0].get(ALLOC_ID).unwrap(), "A");
        assert_eq!(allocs[1].get(ALLOC_AVG_PX).unwrap(), "2");
    }

    #[test]
    fn decode_skips_leading_garbage() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let bytes = codec
            .encode(&FixMessage::new("0"), &mut session, false)
            .unwrap();

        let mut stream = b"junk before".to_vec();
        stream.extend_from_slice(&bytes);
        let frame = decode_one(&codec, &stream);
        assert_eq!(frame.consumed, stream.len());
        assert_eq!(frame.raw, bytes);
    }

    #[test]
    fn decode_needs_more_on_partial_frame() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let bytes = codec
            .encode(&FixMessage::new("0"), &mut session, false)
            .unwrap();

        for cut in [1, 5, 12, bytes.len() - 1] {
            match codec.decode(&bytes[..cut]).unwrap() {
                Decoded::NeedMore => {}
                Decoded::Frame(_) => panic!("frame decoded from {} bytes", cut),
            }
        }
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let mut bytes = codec
            .encode(&FixMessage::new("0"), &mut session, false)
            .unwrap();
        let at = bytes.len() - 3;
        bytes[at] = if bytes[at] == b'9' { b'8' } else { b'9' };

        assert!(codec.decode(&bytes).is_err());
        let (msg, skip, raw) = codec.decode_silent(&bytes);
        assert!(msg.is_none());
        assert!(raw.is_none());
        assert_eq!(skip, bytes.len());
    }

    #[test]
    fn decode_rejects_unmapped_group() {
        let codec = Codec::new();
        //NoLegs is a known FIX 4.4 count tag but NewOrderSingle does not
        //declare it.
        let body = b"35=D\x0149=ME\x0156=YOU\x0134=1\x0152=20240102-10:00:00.000\x01555=1\x01600=A\x01";
        let frame = frame_body(body);
        match codec.decode(&frame) {
            Err(FixError::UnmappedGroup(tag, msg_type)) => {
                assert_eq!(tag, NO_LEGS);
                assert_eq!(msg_type, "D");
            }
            other => panic!("expected unmapped group, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_wrong_group_count() {
        let codec = Codec::new();
        let body =
            b"35=D\x0149=ME\x0156=YOU\x0134=1\x0152=20240102-10:00:00.000\x0178=3\x0170=A\x0170=B\x01";
        let frame = frame_body(body);
        assert!(matches!(codec.decode(&frame), Err(FixError::Decoding(_))));
    }

    #[test]
    fn transform_for_replay_marks_poss_dup() {
        let codec = Codec::new();
        let mut session = Session::new("ME", "YOU");
        let mut msg = FixMessage::new("D");
        msg.set(CL_ORD_ID, "C1").unwrap();
        let original = codec.encode(&msg, &mut session, false).unwrap();

        let replayed = transform_for_replay(&original).unwrap();
        let frame = decode_one(&codec, &replayed);
        let replay = frame.message;
        assert_eq!(replay.get(POSS_DUP_FLAG).unwrap(), "Y");
        assert_eq!(replay.get(MSG_SEQ_NUM).unwrap(), "1");
        assert_eq!(replay.get(CL_ORD_ID).unwrap(), "C1");

        let original_sending_time = {
            let frame = decode_one(&codec, &original);
            frame.message.get(SENDING_TIME).unwrap().to_string()
        };
        assert_eq!(
            replay.get(ORIG_SENDING_TIME).unwrap(),
            original_sending_time
        );
    }
}
