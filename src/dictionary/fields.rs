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

//! Tag number constants for every field the engine itself touches.

use crate::field_tag::FieldTag;

//Framing and standard header.
pub const BEGIN_STRING: FieldTag = FieldTag(8);
pub const BODY_LENGTH: FieldTag = FieldTag(9);
pub const CHECK_SUM: FieldTag = FieldTag(10);
pub const MSG_SEQ_NUM: FieldTag = FieldTag(34);
pub const MSG_TYPE: FieldTag = FieldTag(35);
pub const POSS_DUP_FLAG: FieldTag = FieldTag(43);
pub const SENDER_COMP_ID: FieldTag = FieldTag(49);
pub const SENDING_TIME: FieldTag = FieldTag(52);
pub const TARGET_COMP_ID: FieldTag = FieldTag(56);
pub const POSS_RESEND: FieldTag = FieldTag(97);
pub const ORIG_SENDING_TIME: FieldTag = FieldTag(122);

//Session administration.
pub const BEGIN_SEQ_NO: FieldTag = FieldTag(7);
pub const END_SEQ_NO: FieldTag = FieldTag(16);
pub const NEW_SEQ_NO: FieldTag = FieldTag(36);
pub const REF_SEQ_NUM: FieldTag = FieldTag(45);
pub const TEXT: FieldTag = FieldTag(58);
pub const ENCRYPT_METHOD: FieldTag = FieldTag(98);
pub const HEART_BT_INT: FieldTag = FieldTag(108);
pub const TEST_REQ_ID: FieldTag = FieldTag(112);
pub const GAP_FILL_FLAG: FieldTag = FieldTag(123);
pub const RESET_SEQ_NUM_FLAG: FieldTag = FieldTag(141);
pub const REF_TAG_ID: FieldTag = FieldTag(371);
pub const REF_MSG_TYPE: FieldTag = FieldTag(372);
pub const SESSION_REJECT_REASON: FieldTag = FieldTag(373);

//Single order management.
pub const ACCOUNT: FieldTag = FieldTag(1);
pub const AVG_PX: FieldTag = FieldTag(6);
pub const CL_ORD_ID: FieldTag = FieldTag(11);
pub const CUM_QTY: FieldTag = FieldTag(14);
pub const EXEC_ID: FieldTag = FieldTag(17);
pub const LAST_PX: FieldTag = FieldTag(31);
pub const LAST_QTY: FieldTag = FieldTag(32);
pub const ORDER_ID: FieldTag = FieldTag(37);
pub const ORDER_QTY: FieldTag = FieldTag(38);
pub const ORD_STATUS: FieldTag = FieldTag(39);
pub const ORD_TYPE: FieldTag = FieldTag(40);
pub const ORIG_CL_ORD_ID: FieldTag = FieldTag(41);
pub const PRICE: FieldTag = FieldTag(44);
pub const SIDE: FieldTag = FieldTag(54);
pub const SYMBOL: FieldTag = FieldTag(55);
pub const TIME_IN_FORCE: FieldTag = FieldTag(59);
pub const TRANSACT_TIME: FieldTag = FieldTag(60);
pub const CXL_REJ_REASON: FieldTag = FieldTag(102);
pub const EXEC_TYPE: FieldTag = FieldTag(150);
pub const LEAVES_QTY: FieldTag = FieldTag(151);
pub const CXL_REJ_RESPONSE_TO: FieldTag = FieldTag(434);

//Repeating groups.
pub const ALLOC_ID: FieldTag = FieldTag(70);
pub const NO_ORDERS: FieldTag = FieldTag(73);
pub const NO_ALLOCS: FieldTag = FieldTag(78);
pub const ALLOC_ACCOUNT: FieldTag = FieldTag(79);
pub const ALLOC_QTY: FieldTag = FieldTag(80);
pub const NO_RELATED_SYM: FieldTag = FieldTag(146);
pub const ALLOC_AVG_PX: FieldTag = FieldTag(153);
pub const NO_MD_ENTRIES: FieldTag = FieldTag(268);
pub const TRADING_SESSION_ID: FieldTag = FieldTag(336);
pub const CONTRA_TRADER: FieldTag = FieldTag(337);
pub const CONTRA_BROKER: FieldTag = FieldTag(375);
pub const NO_CONTRA_BROKERS: FieldTag = FieldTag(382);
pub const NO_MSG_TYPES: FieldTag = FieldTag(384);
pub const MSG_DIRECTION: FieldTag = FieldTag(385);
pub const NO_TRADING_SESSIONS: FieldTag = FieldTag(386);
pub const CONTRA_TRADE_QTY: FieldTag = FieldTag(437);
pub const CONTRA_TRADE_TIME: FieldTag = FieldTag(438);
pub const PARTY_ID_SOURCE: FieldTag = FieldTag(447);
pub const PARTY_ID: FieldTag = FieldTag(448);
pub const PARTY_ROLE: FieldTag = FieldTag(452);
pub const NO_PARTY_IDS: FieldTag = FieldTag(453);
pub const PARTY_SUB_ID: FieldTag = FieldTag(523);
pub const NO_SIDES: FieldTag = FieldTag(552);
pub const NO_LEGS: FieldTag = FieldTag(555);
pub const TRADING_SESSION_SUB_ID: FieldTag = FieldTag(625);
pub const CONTRA_LEG_REF_ID: FieldTag = FieldTag(655);
pub const NO_PARTY_SUB_IDS: FieldTag = FieldTag(802);
pub const PARTY_SUB_ID_TYPE: FieldTag = FieldTag(803);
