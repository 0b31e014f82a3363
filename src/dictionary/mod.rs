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

//! Process-wide FIX 4.4 constants: tag numbers, message types, and the
//! enumerated field values the engine needs to reason about. Schema-derived
//! enumerations are per-schema instances and live in [`crate::schema`].

pub mod field_types;
pub mod fields;
pub mod messages;

use crate::field_tag::FieldTag;

pub mod msg_type {
    pub const HEARTBEAT: &str = "0";
    pub const TEST_REQUEST: &str = "1";
    pub const RESEND_REQUEST: &str = "2";
    pub const REJECT: &str = "3";
    pub const SEQUENCE_RESET: &str = "4";
    pub const LOGOUT: &str = "5";
    pub const EXECUTION_REPORT: &str = "8";
    pub const ORDER_CANCEL_REJECT: &str = "9";
    pub const LOGON: &str = "A";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    pub const ORDER_CANCEL_REPLACE_REQUEST: &str = "G";
}

//Administrative message types manage the session itself. List taken from
//FIX 4.4, Volume 1, page 12.
static ADMIN_MSG_TYPES: phf::Set<&'static str> = phf::phf_set! {
    "0", "1", "2", "3", "4", "5", "A",
};

pub fn is_admin_msg_type(msg_type: &str) -> bool {
    ADMIN_MSG_TYPES.contains(msg_type)
}

static MSG_TYPE_NAMES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "0" => "Heartbeat",
    "1" => "TestRequest",
    "2" => "ResendRequest",
    "3" => "Reject",
    "4" => "SequenceReset",
    "5" => "Logout",
    "8" => "ExecutionReport",
    "9" => "OrderCancelReject",
    "A" => "Logon",
    "D" => "NewOrderSingle",
    "F" => "OrderCancelRequest",
    "G" => "OrderCancelReplaceRequest",
};

/// Canonical name of a message type, or the raw type when unknown.
pub fn msg_type_name(msg_type: &str) -> &str {
    MSG_TYPE_NAMES.get(msg_type).copied().unwrap_or(msg_type)
}

static TAG_NAMES: phf::Map<u32, &'static str> = phf::phf_map! {
    1u32 => "Account",
    6u32 => "AvgPx",
    7u32 => "BeginSeqNo",
    8u32 => "BeginString",
    9u32 => "BodyLength",
    10u32 => "CheckSum",
    11u32 => "ClOrdID",
    14u32 => "CumQty",
    16u32 => "EndSeqNo",
    17u32 => "ExecID",
    31u32 => "LastPx",
    32u32 => "LastQty",
    34u32 => "MsgSeqNum",
    35u32 => "MsgType",
    36u32 => "NewSeqNo",
    37u32 => "OrderID",
    38u32 => "OrderQty",
    39u32 => "OrdStatus",
    40u32 => "OrdType",
    41u32 => "OrigClOrdID",
    43u32 => "PossDupFlag",
    44u32 => "Price",
    45u32 => "RefSeqNum",
    49u32 => "SenderCompID",
    52u32 => "SendingTime",
    54u32 => "Side",
    55u32 => "Symbol",
    56u32 => "TargetCompID",
    58u32 => "Text",
    59u32 => "TimeInForce",
    60u32 => "TransactTime",
    70u32 => "AllocID",
    73u32 => "NoOrders",
    78u32 => "NoAllocs",
    79u32 => "AllocAccount",
    80u32 => "AllocQty",
    97u32 => "PossResend",
    98u32 => "EncryptMethod",
    102u32 => "CxlRejReason",
    108u32 => "HeartBtInt",
    112u32 => "TestReqID",
    122u32 => "OrigSendingTime",
    123u32 => "GapFillFlag",
    141u32 => "ResetSeqNumFlag",
    146u32 => "NoRelatedSym",
    150u32 => "ExecType",
    151u32 => "LeavesQty",
    153u32 => "AllocAvgPx",
    268u32 => "NoMDEntries",
    336u32 => "TradingSessionID",
    337u32 => "ContraTrader",
    371u32 => "RefTagID",
    372u32 => "RefMsgType",
    373u32 => "SessionRejectReason",
    375u32 => "ContraBroker",
    382u32 => "NoContraBrokers",
    384u32 => "NoMsgTypes",
    385u32 => "MsgDirection",
    386u32 => "NoTradingSessions",
    434u32 => "CxlRejResponseTo",
    437u32 => "ContraTradeQty",
    438u32 => "ContraTradeTime",
    447u32 => "PartyIDSource",
    448u32 => "PartyID",
    452u32 => "PartyRole",
    453u32 => "NoPartyIDs",
    523u32 => "PartySubID",
    552u32 => "NoSides",
    555u32 => "NoLegs",
    625u32 => "TradingSessionSubID",
    655u32 => "ContraLegRefID",
    802u32 => "NoPartySubIDs",
    803u32 => "PartySubIDType",
};

/// Canonical name of a tag number, or `None` for tags outside the catalog.
pub fn tag_name(tag: FieldTag) -> Option<&'static str> {
    TAG_NAMES.get(&tag.0).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_set_matches_session_family() {
        for msg_type in ["0", "1", "2", "3", "4", "5", "A"] {
            assert!(is_admin_msg_type(msg_type));
        }
        assert!(!is_admin_msg_type("D"));
        assert!(!is_admin_msg_type("8"));
    }

    #[test]
    fn names_resolve() {
        assert_eq!(msg_type_name("D"), "NewOrderSingle");
        assert_eq!(msg_type_name("ZZ"), "ZZ");
        assert_eq!(tag_name(FieldTag(11)), Some("ClOrdID"));
        assert_eq!(tag_name(FieldTag(9999)), None);
    }
}
