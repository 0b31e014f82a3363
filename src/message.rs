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

//! In-memory FIX message containers.
//!
//! A [`FieldMap`] is an ordered sequence of tag/value entries. Values are
//! either a scalar string, an ordered list of sub-containers (a repeating
//! group), or a list of raw repeats for a tag that decoded more than once
//! outside any known group. All wire values stay strings; the typed getters
//! parse on demand and never lose the original text.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::dictionary::fields;
use crate::error::FixError;
use crate::field_tag::FieldTag;

//Tags owned by the encoder. Setting them by hand on an outbound message is
//rejected; the decoder writes them through the unchecked path.
const RESERVED_TAGS: &[FieldTag] = &[
    fields::BEGIN_STRING,
    fields::BODY_LENGTH,
    fields::CHECK_SUM,
    fields::MSG_TYPE,
    fields::MSG_SEQ_NUM,
    fields::SENDING_TIME,
    fields::SENDER_COMP_ID,
    fields::TARGET_COMP_ID,
];

pub fn is_reserved_tag(tag: FieldTag) -> bool {
    RESERVED_TAGS.contains(&tag)
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    Group(Vec<FieldMap>),
    //A non-group tag that appeared more than once during decoding. Kept so
    //the raw data survives, but any scalar read of it fails.
    Repeating(Vec<String>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(FieldTag, FieldValue)>,
    index: HashMap<FieldTag, usize>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tag: FieldTag) -> bool {
        self.index.contains_key(&tag)
    }

    /// Iterates entries in insertion order, which is also wire order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldTag, &FieldValue)> {
        self.entries.iter().map(|(tag, value)| (*tag, value))
    }

    /// Sets a scalar tag. Fails if the tag is already present; use
    /// [`FieldMap::replace`] to overwrite.
    pub fn set(&mut self, tag: FieldTag, value: impl Into<String>) -> Result<(), FixError> {
        if is_reserved_tag(tag) {
            return Err(FixError::Message(format!(
                "tag {} belongs to the standard header and is set by the encoder",
                tag
            )));
        }
        if self.contains(tag) {
            return Err(FixError::Message(format!(
                "tag {} already set; pass replace to overwrite",
                tag
            )));
        }

        self.push_entry(tag, FieldValue::Scalar(value.into()));
        Ok(())
    }

    /// Overwrites a scalar tag, inserting it if absent. Refuses to clobber a
    /// repeating group.
    pub fn replace(&mut self, tag: FieldTag, value: impl Into<String>) -> Result<(), FixError> {
        if is_reserved_tag(tag) {
            return Err(FixError::Message(format!(
                "tag {} belongs to the standard header and is set by the encoder",
                tag
            )));
        }

        match self.index.get(&tag) {
            Some(&at) => match self.entries[at].1 {
                FieldValue::Group(_) => Err(FixError::Message(format!(
                    "tag {} holds a repeating group and cannot be replaced by a scalar",
                    tag
                ))),
                _ => {
                    self.entries[at].1 = FieldValue::Scalar(value.into());
                    Ok(())
                }
            },
            None => {
                self.push_entry(tag, FieldValue::Scalar(value.into()));
                Ok(())
            }
        }
    }

    /// Reads a scalar tag. Fails with [`FixError::TagNotFound`] when absent,
    /// and refuses group and repeating tags so a mishandled group cannot leak
    /// through as a plain value.
    pub fn get(&self, tag: FieldTag) -> Result<&str, FixError> {
        match self.get_opt(tag)? {
            Some(value) => Ok(value),
            None => Err(FixError::TagNotFound(tag)),
        }
    }

    /// Like [`FieldMap::get`] but absent tags become `Ok(None)`.
    pub fn get_opt(&self, tag: FieldTag) -> Result<Option<&str>, FixError> {
        match self.index.get(&tag) {
            None => Ok(None),
            Some(&at) => match &self.entries[at].1 {
                FieldValue::Scalar(value) => Ok(Some(value)),
                FieldValue::Group(_) => Err(FixError::Message(format!(
                    "tag {} is a repeating group; use the group accessor",
                    tag
                ))),
                FieldValue::Repeating(_) => Err(FixError::RepeatingTag(tag)),
            },
        }
    }

    pub fn get_int(&self, tag: FieldTag) -> Result<i64, FixError> {
        let raw = self.get(tag)?;
        raw.parse()
            .map_err(|_| FixError::Message(format!("tag {} value {:?} is not an integer", tag, raw)))
    }

    pub fn get_float(&self, tag: FieldTag) -> Result<f64, FixError> {
        let raw = self.get(tag)?;
        raw.parse()
            .map_err(|_| FixError::Message(format!("tag {} value {:?} is not a number", tag, raw)))
    }

    /// Reads a FIX boolean, which is only ever "Y" or "N".
    pub fn get_bool(&self, tag: FieldTag) -> Result<bool, FixError> {
        match self.get(tag)? {
            "Y" => Ok(true),
            "N" => Ok(false),
            other => Err(FixError::Message(format!(
                "tag {} value {:?} is not a FIX boolean",
                tag, other
            ))),
        }
    }

    /// Installs a repeating group, replacing any previous list under the same
    /// tag. The numeric wire value of `tag` is always the entry count.
    pub fn set_group(&mut self, tag: FieldTag, entries: Vec<FieldMap>) -> Result<(), FixError> {
        if is_reserved_tag(tag) {
            return Err(FixError::Message(format!(
                "tag {} belongs to the standard header and cannot hold a group",
                tag
            )));
        }

        match self.index.get(&tag) {
            Some(&at) => match self.entries[at].1 {
                FieldValue::Group(_) => {
                    self.entries[at].1 = FieldValue::Group(entries);
                    Ok(())
                }
                _ => Err(FixError::Message(format!(
                    "tag {} already holds a scalar value",
                    tag
                ))),
            },
            None => {
                self.push_entry(tag, FieldValue::Group(entries));
                Ok(())
            }
        }
    }

    /// Appends one entry to a repeating group, creating the group if needed.
    pub fn add_group_entry(&mut self, tag: FieldTag, entry: FieldMap) -> Result<(), FixError> {
        match self.index.get(&tag) {
            Some(&at) => match &mut self.entries[at].1 {
                FieldValue::Group(existing) => {
                    existing.push(entry);
                    Ok(())
                }
                _ => Err(FixError::Message(format!(
                    "tag {} already holds a scalar value",
                    tag
                ))),
            },
            None => self.set_group(tag, vec![entry]),
        }
    }

    pub fn get_group_list(&self, tag: FieldTag) -> Result<&[FieldMap], FixError> {
        match self.index.get(&tag) {
            None => Err(FixError::TagNotFound(tag)),
            Some(&at) => match &self.entries[at].1 {
                FieldValue::Group(entries) => Ok(entries),
                _ => Err(FixError::Message(format!(
                    "tag {} does not hold a repeating group",
                    tag
                ))),
            },
        }
    }

    /// True when the tag is present and holds a repeating group.
    pub fn is_group(&self, tag: FieldTag) -> bool {
        matches!(
            self.index.get(&tag).map(|&at| &self.entries[at].1),
            Some(FieldValue::Group(_))
        )
    }

    fn push_entry(&mut self, tag: FieldTag, value: FieldValue) {
        self.index.insert(tag, self.entries.len());
        self.entries.push((tag, value));
    }

    //Decoder path. Framing tags are allowed through and repeats of a scalar
    //tag degrade the entry to FieldValue::Repeating instead of failing.
    pub(crate) fn insert_decoded(&mut self, tag: FieldTag, value: String) {
        match self.index.get(&tag) {
            None => self.push_entry(tag, FieldValue::Scalar(value)),
            Some(&at) => match &mut self.entries[at].1 {
                FieldValue::Scalar(existing) => {
                    let first = std::mem::take(existing);
                    self.entries[at].1 = FieldValue::Repeating(vec![first, value]);
                }
                FieldValue::Repeating(values) => values.push(value),
                FieldValue::Group(_) => {
                    //A group count tag showing up again as a scalar. Keep the
                    //group and record the stray value as repeating data.
                    self.push_entry(tag, FieldValue::Repeating(vec![value]));
                }
            },
        }
    }

    pub(crate) fn insert_decoded_group(&mut self, tag: FieldTag, entries: Vec<FieldMap>) {
        self.push_entry(tag, FieldValue::Group(entries));
    }
}

/// A [`FieldMap`] with its MsgType (tag 35) fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct FixMessage {
    msg_type: String,
    fields: FieldMap,
}

impl FixMessage {
    pub fn new(msg_type: impl Into<String>) -> Self {
        FixMessage {
            msg_type: msg_type.into(),
            fields: FieldMap::new(),
        }
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.fields
    }

    /// Pins the MsgSeqNum (tag 34) that a raw-sequence encode will use.
    ///
    /// The encoder only honors this for session messages encoded with
    /// `raw_seq_num` set; anywhere else a pre-set sequence number is an
    /// encoding error. Replay and gap fill are the only callers.
    pub fn set_msg_seq_num(&mut self, seq_num: u32) {
        self.fields
            .insert_decoded(fields::MSG_SEQ_NUM, seq_num.to_string());
    }

    pub(crate) fn from_decoded(msg_type: String, fields: FieldMap) -> Self {
        FixMessage { msg_type, fields }
    }
}

impl Deref for FixMessage {
    type Target = FieldMap;

    fn deref(&self) -> &FieldMap {
        &self.fields
    }
}

impl DerefMut for FixMessage {
    fn deref_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }
}

impl fmt::Display for FixMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "35={}", self.msg_type)?;
        for (tag, value) in self.fields.iter() {
            if tag == fields::MSG_TYPE {
                continue;
            }
            match value {
                FieldValue::Scalar(scalar) => write!(f, "|{}={}", tag, scalar)?,
                FieldValue::Group(entries) => {
                    write!(f, "|{}={}[..]", tag, entries.len())?;
                }
                FieldValue::Repeating(values) => {
                    for repeat in values {
                        write!(f, "|{}={}", tag, repeat)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::fields::*;

    #[test]
    fn set_rejects_duplicate_without_replace() {
        let mut map = FieldMap::new();
        map.set(CL_ORD_ID, "C1").unwrap();
        assert!(map.set(CL_ORD_ID, "C2").is_err());
        assert_eq!(map.get(CL_ORD_ID).unwrap(), "C1");

        map.replace(CL_ORD_ID, "C2").unwrap();
        assert_eq!(map.get(CL_ORD_ID).unwrap(), "C2");
    }

    #[test]
    fn reserved_tags_are_rejected() {
        let mut map = FieldMap::new();
        for tag in [
            BEGIN_STRING,
            BODY_LENGTH,
            CHECK_SUM,
            MSG_TYPE,
            MSG_SEQ_NUM,
            SENDING_TIME,
            SENDER_COMP_ID,
            TARGET_COMP_ID,
        ] {
            assert!(map.set(tag, "x").is_err());
            assert!(map.replace(tag, "x").is_err());
        }
    }

    #[test]
    fn scalar_read_of_group_tag_fails() {
        let mut map = FieldMap::new();
        let mut entry = FieldMap::new();
        entry.set(ALLOC_ACCOUNT, "ACCT").unwrap();
        map.set_group(NO_ALLOCS, vec![entry]).unwrap();

        let err = map.get(NO_ALLOCS).unwrap_err();
        assert!(err.to_string().contains("group accessor"));
        assert_eq!(map.get_group_list(NO_ALLOCS).unwrap().len(), 1);
    }

    #[test]
    fn decoded_repeats_poison_scalar_reads() {
        let mut map = FieldMap::new();
        map.insert_decoded(PARTY_ID, "A".to_string());
        map.insert_decoded(PARTY_ID, "B".to_string());

        match map.get(PARTY_ID) {
            Err(FixError::RepeatingTag(tag)) => assert_eq!(tag, PARTY_ID),
            other => panic!("expected repeating tag error, got {:?}", other),
        }
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut map = FieldMap::new();
        map.set(SYMBOL, "AAPL").unwrap();
        map.set(SIDE, "1").unwrap();
        map.set(ORDER_QTY, "10").unwrap();

        let tags: Vec<FieldTag> = map.iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec![SYMBOL, SIDE, ORDER_QTY]);
    }

    #[test]
    fn typed_getters() {
        let mut map = FieldMap::new();
        map.set(ORDER_QTY, "10").unwrap();
        map.set(PRICE, "100.5").unwrap();
        map.set(GAP_FILL_FLAG, "Y").unwrap();

        assert_eq!(map.get_int(ORDER_QTY).unwrap(), 10);
        assert_eq!(map.get_float(PRICE).unwrap(), 100.5);
        assert!(map.get_bool(GAP_FILL_FLAG).unwrap());
        assert!(map.get_bool(PRICE).is_err());
        assert!(map.get_int(PRICE).is_err());
    }

    #[test]
    fn msg_type_is_immutable_and_separate() {
        let msg = FixMessage::new("D");
        assert_eq!(msg.msg_type(), "D");
        assert!(msg.field_map().is_empty());
    }
}
