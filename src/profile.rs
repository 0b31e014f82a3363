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

//! FIX 4.4 protocol profile.
//!
//! The decoder cannot tell from a frame alone which `No*` tags open a
//! repeating group; that depends on the message type. The profile answers
//! exactly that question, plus which message types belong to the session
//! layer. The delimiter of a group is not fixed here: per FIX 4.4 the first
//! tag following the count is the delimiter and every later occurrence of it
//! opens a new entry.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::dictionary::is_admin_msg_type;
use crate::field_tag::FieldTag;

/// One repeating group as known for a specific message type.
#[derive(Debug)]
pub struct GroupDef {
    pub count_tag: FieldTag,
    /// Tags that may appear inside an entry, nested count tags included.
    pub members: &'static [u32],
}

impl GroupDef {
    pub fn is_member(&self, tag: FieldTag) -> bool {
        self.members.contains(&tag.0)
    }
}

//Every NUMINGROUP tag of FIX 4.4 the engine has ever heard of. A count tag
//showing up in a message type that does not declare it is an unmapped group
//and decoding cannot proceed.
static KNOWN_COUNT_TAGS: phf::Set<u32> = phf::phf_set! {
    73u32,  //NoOrders
    78u32,  //NoAllocs
    146u32, //NoRelatedSym
    268u32, //NoMDEntries
    382u32, //NoContraBrokers
    384u32, //NoMsgTypes
    386u32, //NoTradingSessions
    453u32, //NoPartyIDs
    552u32, //NoSides
    555u32, //NoLegs
    802u32, //NoPartySubIDs
};

const PARTY_IDS_MEMBERS: &[u32] = &[448, 447, 452, 802];
const PARTY_SUB_IDS_MEMBERS: &[u32] = &[523, 803];
const ALLOCS_MEMBERS: &[u32] = &[79, 70, 80, 153, 661];
const TRADING_SESSIONS_MEMBERS: &[u32] = &[336, 625];
const CONTRA_BROKERS_MEMBERS: &[u32] = &[375, 337, 437, 438, 655];
const MSG_TYPES_MEMBERS: &[u32] = &[372, 385];

static GROUPS: LazyLock<HashMap<&'static str, HashMap<u32, GroupDef>>> = LazyLock::new(|| {
    let mut groups: HashMap<&'static str, HashMap<u32, GroupDef>> = HashMap::new();
    let mut add = |msg_type: &'static str, count_tag: u32, members: &'static [u32]| {
        groups.entry(msg_type).or_default().insert(
            count_tag,
            GroupDef {
                count_tag: FieldTag(count_tag),
                members,
            },
        );
    };

    //Logon.
    add("A", 384, MSG_TYPES_MEMBERS);

    //NewOrderSingle.
    add("D", 453, PARTY_IDS_MEMBERS);
    add("D", 802, PARTY_SUB_IDS_MEMBERS);
    add("D", 78, ALLOCS_MEMBERS);
    add("D", 386, TRADING_SESSIONS_MEMBERS);

    //OrderCancelRequest.
    add("F", 453, PARTY_IDS_MEMBERS);
    add("F", 802, PARTY_SUB_IDS_MEMBERS);

    //OrderCancelReplaceRequest.
    add("G", 453, PARTY_IDS_MEMBERS);
    add("G", 802, PARTY_SUB_IDS_MEMBERS);
    add("G", 78, ALLOCS_MEMBERS);
    add("G", 386, TRADING_SESSIONS_MEMBERS);

    //ExecutionReport.
    add("8", 453, PARTY_IDS_MEMBERS);
    add("8", 802, PARTY_SUB_IDS_MEMBERS);
    add("8", 382, CONTRA_BROKERS_MEMBERS);

    groups
});

/// The FIX 4.4 profile the codec and engine consult. Stateless; one value
/// can serve any number of sessions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Fix44Profile;

impl Fix44Profile {
    pub fn new() -> Self {
        Fix44Profile
    }

    /// The group definition for `count_tag` within `msg_type`, if that
    /// message type declares one.
    pub fn group(&self, msg_type: &str, count_tag: FieldTag) -> Option<&'static GroupDef> {
        GROUPS.get(msg_type).and_then(|m| m.get(&count_tag.0))
    }

    /// True when the tag is a NUMINGROUP tag somewhere in FIX 4.4, whether
    /// or not the current message type declares it.
    pub fn is_group_count_tag(&self, tag: FieldTag) -> bool {
        KNOWN_COUNT_TAGS.contains(&tag.0)
    }

    /// Session-layer message types (Heartbeat through Logon).
    pub fn is_session_message(&self, msg_type: &str) -> bool {
        is_admin_msg_type(msg_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::fields;

    #[test]
    fn allocs_known_for_orders_only() {
        let profile = Fix44Profile::new();
        assert!(profile.group("D", fields::NO_ALLOCS).is_some());
        assert!(profile.group("G", fields::NO_ALLOCS).is_some());
        assert!(profile.group("8", fields::NO_ALLOCS).is_none());
        assert!(profile.group("0", fields::NO_ALLOCS).is_none());
    }

    #[test]
    fn count_tags_recognized_globally() {
        let profile = Fix44Profile::new();
        assert!(profile.is_group_count_tag(fields::NO_LEGS));
        assert!(profile.is_group_count_tag(fields::NO_ALLOCS));
        assert!(!profile.is_group_count_tag(fields::SYMBOL));
    }

    #[test]
    fn session_messages() {
        let profile = Fix44Profile::new();
        for msg_type in ["0", "1", "2", "3", "4", "5", "A"] {
            assert!(profile.is_session_message(msg_type));
        }
        assert!(!profile.is_session_message("D"));
    }
}
