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

//! Enumerated field values used by the order state machine and the session
//! layer. All wire values are strings; these enums only exist for the values
//! the engine itself branches on.

use std::fmt;

/// Side (tag 54).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    Buy,
    Sell,
    SellShort,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "1",
            Side::Sell => "2",
            Side::SellShort => "5",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "1" => Some(Side::Buy),
            "2" => Some(Side::Sell),
            "5" => Some(Side::SellShort),
            _ => None,
        }
    }
}

/// OrdType (tag 40).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OrdType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrdType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrdType::Market => "1",
            OrdType::Limit => "2",
            OrdType::Stop => "3",
            OrdType::StopLimit => "4",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "1" => Some(OrdType::Market),
            "2" => Some(OrdType::Limit),
            "3" => Some(OrdType::Stop),
            "4" => Some(OrdType::StopLimit),
            _ => None,
        }
    }
}

/// TimeInForce (tag 59).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TimeInForce {
    Day,
    GoodTillCancel,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Day => "0",
            TimeInForce::GoodTillCancel => "1",
            TimeInForce::ImmediateOrCancel => "3",
            TimeInForce::FillOrKill => "4",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "0" => Some(TimeInForce::Day),
            "1" => Some(TimeInForce::GoodTillCancel),
            "3" => Some(TimeInForce::ImmediateOrCancel),
            "4" => Some(TimeInForce::FillOrKill),
            _ => None,
        }
    }
}

/// OrdStatus (tag 39) plus the local `Created` state an order holds between
/// construction and the first NewOrderSingle going out. `Created` never
/// appears on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OrdStatus {
    Created,
    New,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    PendingCancel,
    Stopped,
    Rejected,
    Suspended,
    PendingNew,
    Expired,
    PendingReplace,
}

impl OrdStatus {
    pub fn wire_code(self) -> Option<&'static str> {
        match self {
            OrdStatus::Created => None,
            OrdStatus::New => Some("0"),
            OrdStatus::PartiallyFilled => Some("1"),
            OrdStatus::Filled => Some("2"),
            OrdStatus::DoneForDay => Some("3"),
            OrdStatus::Canceled => Some("4"),
            OrdStatus::PendingCancel => Some("6"),
            OrdStatus::Stopped => Some("7"),
            OrdStatus::Rejected => Some("8"),
            OrdStatus::Suspended => Some("9"),
            OrdStatus::PendingNew => Some("A"),
            OrdStatus::Expired => Some("C"),
            OrdStatus::PendingReplace => Some("E"),
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "0" => Some(OrdStatus::New),
            "1" => Some(OrdStatus::PartiallyFilled),
            "2" => Some(OrdStatus::Filled),
            "3" => Some(OrdStatus::DoneForDay),
            "4" => Some(OrdStatus::Canceled),
            "6" => Some(OrdStatus::PendingCancel),
            "7" => Some(OrdStatus::Stopped),
            "8" => Some(OrdStatus::Rejected),
            "9" => Some(OrdStatus::Suspended),
            "A" => Some(OrdStatus::PendingNew),
            "C" => Some(OrdStatus::Expired),
            "E" => Some(OrdStatus::PendingReplace),
            _ => None,
        }
    }

    /// Terminal statuses. No transition leads out of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrdStatus::Filled | OrdStatus::Canceled | OrdStatus::Rejected | OrdStatus::Expired
        )
    }

    pub fn is_pending(self) -> bool {
        matches!(
            self,
            OrdStatus::PendingNew | OrdStatus::PendingCancel | OrdStatus::PendingReplace
        )
    }
}

impl fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// ExecType (tag 150).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExecType {
    New,
    DoneForDay,
    Canceled,
    Replaced,
    PendingCancel,
    Stopped,
    Rejected,
    Suspended,
    PendingNew,
    Expired,
    Restated,
    PendingReplace,
    Trade,
    TradeCorrect,
    TradeCancel,
    OrderStatus,
}

impl ExecType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecType::New => "0",
            ExecType::DoneForDay => "3",
            ExecType::Canceled => "4",
            ExecType::Replaced => "5",
            ExecType::PendingCancel => "6",
            ExecType::Stopped => "7",
            ExecType::Rejected => "8",
            ExecType::Suspended => "9",
            ExecType::PendingNew => "A",
            ExecType::Expired => "C",
            ExecType::Restated => "D",
            ExecType::PendingReplace => "E",
            ExecType::Trade => "F",
            ExecType::TradeCorrect => "G",
            ExecType::TradeCancel => "H",
            ExecType::OrderStatus => "I",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "0" => Some(ExecType::New),
            "3" => Some(ExecType::DoneForDay),
            "4" => Some(ExecType::Canceled),
            "5" => Some(ExecType::Replaced),
            "6" => Some(ExecType::PendingCancel),
            "7" => Some(ExecType::Stopped),
            "8" => Some(ExecType::Rejected),
            "9" => Some(ExecType::Suspended),
            "A" => Some(ExecType::PendingNew),
            "C" => Some(ExecType::Expired),
            "D" => Some(ExecType::Restated),
            "E" => Some(ExecType::PendingReplace),
            "F" => Some(ExecType::Trade),
            "G" => Some(ExecType::TradeCorrect),
            "H" => Some(ExecType::TradeCancel),
            "I" => Some(ExecType::OrderStatus),
            _ => None,
        }
    }
}

/// CxlRejResponseTo (tag 434).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CxlRejResponseTo {
    OrderCancelRequest,
    OrderCancelReplaceRequest,
}

impl CxlRejResponseTo {
    pub fn as_str(self) -> &'static str {
        match self {
            CxlRejResponseTo::OrderCancelRequest => "1",
            CxlRejResponseTo::OrderCancelReplaceRequest => "2",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "1" => Some(CxlRejResponseTo::OrderCancelRequest),
            "2" => Some(CxlRejResponseTo::OrderCancelReplaceRequest),
            _ => None,
        }
    }
}
