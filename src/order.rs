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

//! Client-side lifecycle of one single order.
//!
//! An [`OrderSingle`] produces the outbound NewOrderSingle, OrderCancelRequest
//! and OrderCancelReplaceRequest messages and digests the ExecutionReport and
//! OrderCancelReject traffic that comes back. Status moves strictly along the
//! transition table in [`OrderSingle::change_status`]; an illegal report
//! leaves the order untouched.
//!
//! ClOrdID values are derived as `root--counter` with the counter advancing
//! on every new/cancel/replace request, so the chain of ids stays traceable
//! to one order.

use tracing::warn;

use crate::codec::sending_time_now;
use crate::dictionary::field_types::{ExecType, OrdStatus, OrdType, Side};
use crate::dictionary::{fields, msg_type};
use crate::error::FixError;
use crate::message::FixMessage;

#[derive(Clone, Debug)]
pub struct OrderSingle {
    clord_id_root: String,
    cl_ticker: String,
    side: Side,
    price: f64,
    qty: f64,
    ord_type: OrdType,
    account: Option<String>,
    status: OrdStatus,
    leaves_qty: f64,
    cum_qty: f64,
    avg_px: f64,
    order_id: Option<String>,
    orig_clord_id: Option<String>,
    target_price: Option<f64>,
    clord_id_counter: u32,
}

impl OrderSingle {
    pub fn new(
        clord_id_root: impl Into<String>,
        cl_ticker: impl Into<String>,
        side: Side,
        price: f64,
        qty: f64,
        ord_type: OrdType,
    ) -> Self {
        OrderSingle {
            clord_id_root: clord_id_root.into(),
            cl_ticker: cl_ticker.into(),
            side,
            price,
            qty,
            ord_type,
            account: None,
            status: OrdStatus::Created,
            leaves_qty: qty,
            cum_qty: 0.0,
            avg_px: 0.0,
            order_id: None,
            orig_clord_id: None,
            target_price: None,
            clord_id_counter: 0,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn status(&self) -> OrdStatus {
        self.status
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn qty(&self) -> f64 {
        self.qty
    }

    pub fn leaves_qty(&self) -> f64 {
        self.leaves_qty
    }

    pub fn cum_qty(&self) -> f64 {
        self.cum_qty
    }

    pub fn avg_px(&self) -> f64 {
        self.avg_px
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn orig_clord_id(&self) -> Option<&str> {
        self.orig_clord_id.as_deref()
    }

    /// The ClOrdID of the most recent request, `root--counter`.
    pub fn current_clord_id(&self) -> String {
        format!("{}--{}", self.clord_id_root, self.clord_id_counter)
    }

    fn next_clord_id(&mut self) -> String {
        self.clord_id_counter += 1;
        self.current_clord_id()
    }

    pub fn can_cancel(&self) -> bool {
        matches!(
            self.status,
            OrdStatus::New | OrdStatus::PartiallyFilled | OrdStatus::Suspended
        )
    }

    pub fn can_replace(&self) -> bool {
        self.can_cancel()
    }

    /// True in FILLED, CANCELED, REJECTED, and EXPIRED. The order object
    /// itself stays alive; destroying it is the application's call.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Builds the NewOrderSingle for this order and moves it to PENDING_NEW.
    pub fn new_req(&mut self) -> Result<FixMessage, FixError> {
        if self.status != OrdStatus::Created {
            return Err(FixError::Message(format!(
                "new order request is only valid from Created, not {}",
                self.status
            )));
        }

        let clord_id = self.next_clord_id();
        let mut msg = FixMessage::new(msg_type::NEW_ORDER_SINGLE);
        msg.set(fields::CL_ORD_ID, clord_id)?;
        if let Some(account) = &self.account {
            msg.set(fields::ACCOUNT, account.clone())?;
        }
        msg.set(fields::SYMBOL, self.cl_ticker.clone())?;
        msg.set(fields::SIDE, self.side.as_str())?;
        msg.set(fields::TRANSACT_TIME, sending_time_now())?;
        msg.set(fields::ORDER_QTY, format_qty(self.qty))?;
        msg.set(fields::ORD_TYPE, self.ord_type.as_str())?;
        if self.ord_type != OrdType::Market {
            msg.set(fields::PRICE, format_qty(self.price))?;
        }

        self.status = OrdStatus::PendingNew;
        Ok(msg)
    }

    /// Builds an OrderCancelRequest and moves the order to PENDING_CANCEL.
    pub fn cancel_req(&mut self) -> Result<FixMessage, FixError> {
        if !self.can_cancel() {
            return Err(FixError::Message(format!(
                "order in {} cannot be canceled",
                self.status
            )));
        }

        let orig_clord_id = self.current_clord_id();
        let clord_id = self.next_clord_id();
        let mut msg = FixMessage::new(msg_type::ORDER_CANCEL_REQUEST);
        msg.set(fields::ORIG_CL_ORD_ID, orig_clord_id.clone())?;
        msg.set(fields::CL_ORD_ID, clord_id)?;
        msg.set(fields::SYMBOL, self.cl_ticker.clone())?;
        msg.set(fields::SIDE, self.side.as_str())?;
        msg.set(fields::TRANSACT_TIME, sending_time_now())?;
        msg.set(fields::ORDER_QTY, format_qty(self.qty))?;

        self.orig_clord_id = Some(orig_clord_id);
        self.status = OrdStatus::PendingCancel;
        Ok(msg)
    }

    /// Builds an OrderCancelReplaceRequest carrying the changed price and/or
    /// quantity and moves the order to PENDING_REPLACE. At least one of the
    /// two must actually change.
    pub fn replace_req(
        &mut self,
        price: Option<f64>,
        qty: Option<f64>,
    ) -> Result<FixMessage, FixError> {
        if !self.can_replace() {
            return Err(FixError::Message(format!(
                "order in {} cannot be replaced",
                self.status
            )));
        }
        let new_price = price.unwrap_or(self.price);
        let new_qty = qty.unwrap_or(self.qty);
        if new_price == self.price && new_qty == self.qty {
            return Err(FixError::Message(
                "replace request changes neither price nor quantity".to_string(),
            ));
        }

        let orig_clord_id = self.current_clord_id();
        let clord_id = self.next_clord_id();
        let mut msg = FixMessage::new(msg_type::ORDER_CANCEL_REPLACE_REQUEST);
        msg.set(fields::ORIG_CL_ORD_ID, orig_clord_id.clone())?;
        msg.set(fields::CL_ORD_ID, clord_id)?;
        msg.set(fields::SYMBOL, self.cl_ticker.clone())?;
        msg.set(fields::SIDE, self.side.as_str())?;
        msg.set(fields::TRANSACT_TIME, sending_time_now())?;
        msg.set(fields::ORD_TYPE, self.ord_type.as_str())?;
        msg.set(fields::ORDER_QTY, format_qty(new_qty))?;
        if self.ord_type != OrdType::Market {
            msg.set(fields::PRICE, format_qty(new_price))?;
        }

        self.orig_clord_id = Some(orig_clord_id);
        self.target_price = price;
        self.status = OrdStatus::PendingReplace;
        Ok(msg)
    }

    /// The transition table, as a pure function.
    ///
    /// `Ok(Some(status))` is a real transition, `Ok(None)` means the report
    /// changes nothing (duplicate ack, or a non-matching report while a
    /// cancel/replace is pending and the order waits for its ack). An
    /// illegal combination is an error and must not mutate anything.
    /// `exec_type` is `None` for OrderCancelReject, which carries no
    /// ExecType.
    pub fn change_status(
        current: OrdStatus,
        incoming_msg_type: &str,
        exec_type: Option<ExecType>,
        new_status: OrdStatus,
    ) -> Result<Option<OrdStatus>, FixError> {
        use OrdStatus::*;

        if incoming_msg_type == msg_type::ORDER_CANCEL_REJECT {
            //The reject reverts a pending cancel/replace to whatever status
            //the counterparty reports the order is really in.
            return match current {
                PendingCancel | PendingReplace => {
                    Ok(if new_status == current { None } else { Some(new_status) })
                }
                _ => Err(illegal(current, exec_type, new_status)),
            };
        }
        if incoming_msg_type != msg_type::EXECUTION_REPORT {
            return Err(FixError::Message(format!(
                "status changes are driven by ExecutionReport and OrderCancelReject, not {}",
                incoming_msg_type
            )));
        }
        let exec_type = exec_type.ok_or_else(|| {
            FixError::Message("execution report without ExecType".to_string())
        })?;

        if current.is_terminal() {
            //A duplicate report of the terminal state is harmless. Anything
            //trying to pull the order back out of a terminal state is not.
            return if new_status == current {
                Ok(None)
            } else {
                Err(illegal(current, Some(exec_type), new_status))
            };
        }

        match exec_type {
            ExecType::PendingNew => match current {
                Created => Ok(Some(PendingNew)),
                PendingNew => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            ExecType::New => match current {
                Created | PendingNew => Ok(Some(New)),
                New => Ok(None),
                PendingCancel | PendingReplace => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            ExecType::Trade | ExecType::TradeCorrect => match current {
                PendingNew | New | PartiallyFilled => Ok(Some(new_status)),
                PendingCancel | PendingReplace => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            //Cancellation is accepted from any live status; an unsolicited
            //cancel outranks a pending replace.
            ExecType::Canceled => Ok(Some(Canceled)),
            ExecType::Rejected => Ok(Some(Rejected)),
            ExecType::Expired => Ok(Some(Expired)),
            ExecType::Suspended => match current {
                New | PartiallyFilled => Ok(Some(Suspended)),
                Suspended => Ok(None),
                PendingCancel | PendingReplace => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            ExecType::Replaced => match current {
                //The replace ack reports the status the order continues in,
                //NEW or PARTIALLY_FILLED depending on prior fills.
                PendingReplace => Ok(Some(new_status)),
                PendingCancel => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            ExecType::PendingCancel => match current {
                New | PartiallyFilled | Suspended => Ok(Some(PendingCancel)),
                PendingCancel => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            ExecType::PendingReplace => match current {
                New | PartiallyFilled | Suspended => Ok(Some(PendingReplace)),
                PendingReplace => Ok(None),
                _ => Err(illegal(current, Some(exec_type), new_status)),
            },
            //Status-only traffic with no lifecycle effect.
            ExecType::DoneForDay
            | ExecType::Stopped
            | ExecType::Restated
            | ExecType::TradeCancel
            | ExecType::OrderStatus => Ok(None),
        }
    }

    /// Digests an ExecutionReport addressed to this order.
    ///
    /// Returns 1 when the report moved the status, 0 when it was a no-op or
    /// referenced an unknown ClOrdID, and -1 when the transition was
    /// semantically illegal (the order is left untouched).
    pub fn process_execution_report(&mut self, msg: &FixMessage) -> Result<i32, FixError> {
        if msg.msg_type() != msg_type::EXECUTION_REPORT {
            return Err(FixError::Message(format!(
                "expected ExecutionReport, got {}",
                msg.msg_type()
            )));
        }

        let clord_id = msg.get(fields::CL_ORD_ID)?;
        if !self.owns_clord_id(clord_id) {
            return Ok(0);
        }

        let exec_type = parse_exec_type(msg)?;
        let new_status = parse_ord_status(msg)?;

        match Self::change_status(self.status, msg.msg_type(), Some(exec_type), new_status) {
            Ok(Some(next)) => {
                self.status = next;
                self.apply_exec_fields(msg)?;
                if exec_type == ExecType::Replaced {
                    self.adopt_replace(msg)?;
                }
                if next.is_terminal() {
                    self.orig_clord_id = None;
                    self.target_price = None;
                }
                Ok(1)
            }
            Ok(None) => {
                //Fills can still arrive while a cancel or replace is
                //pending; the quantities stay current even though the
                //status holds.
                self.apply_exec_fields(msg)?;
                Ok(0)
            }
            Err(err) => {
                warn!(
                    clord_id = %self.current_clord_id(),
                    status = %self.status,
                    error = %err,
                    "rejecting execution report"
                );
                Ok(-1)
            }
        }
    }

    /// Digests an OrderCancelReject (35=9), reverting a pending cancel or
    /// replace to the status the reject reports. Same return convention as
    /// [`OrderSingle::process_execution_report`].
    pub fn process_cancel_reject(&mut self, msg: &FixMessage) -> Result<i32, FixError> {
        if msg.msg_type() != msg_type::ORDER_CANCEL_REJECT {
            return Err(FixError::Message(format!(
                "expected OrderCancelReject, got {}",
                msg.msg_type()
            )));
        }

        let clord_id = msg.get(fields::CL_ORD_ID)?;
        if !self.owns_clord_id(clord_id) {
            return Ok(0);
        }

        let new_status = parse_ord_status(msg)?;
        match Self::change_status(self.status, msg.msg_type(), None, new_status) {
            Ok(Some(next)) => {
                self.status = next;
                self.orig_clord_id = None;
                self.target_price = None;
                Ok(1)
            }
            Ok(None) => Ok(0),
            Err(err) => {
                warn!(
                    clord_id = %self.current_clord_id(),
                    status = %self.status,
                    error = %err,
                    "rejecting cancel reject"
                );
                Ok(-1)
            }
        }
    }

    fn owns_clord_id(&self, clord_id: &str) -> bool {
        clord_id == self.current_clord_id() || self.orig_clord_id.as_deref() == Some(clord_id)
    }

    fn apply_exec_fields(&mut self, msg: &FixMessage) -> Result<(), FixError> {
        if let Some(order_id) = msg.get_opt(fields::ORDER_ID)? {
            self.order_id = Some(order_id.to_string());
        }
        if msg.contains(fields::LEAVES_QTY) {
            self.leaves_qty = msg.get_float(fields::LEAVES_QTY)?;
        }
        if msg.contains(fields::CUM_QTY) {
            self.cum_qty = msg.get_float(fields::CUM_QTY)?;
        }
        if msg.contains(fields::AVG_PX) {
            self.avg_px = msg.get_float(fields::AVG_PX)?;
        }
        Ok(())
    }

    //The replace ack carries the order's new economics.
    fn adopt_replace(&mut self, msg: &FixMessage) -> Result<(), FixError> {
        if msg.contains(fields::PRICE) {
            self.price = msg.get_float(fields::PRICE)?;
        } else if let Some(target_price) = self.target_price {
            self.price = target_price;
        }
        if msg.contains(fields::ORDER_QTY) {
            self.qty = msg.get_float(fields::ORDER_QTY)?;
        }
        self.orig_clord_id = None;
        self.target_price = None;
        Ok(())
    }
}

fn illegal(
    current: OrdStatus,
    exec_type: Option<ExecType>,
    new_status: OrdStatus,
) -> FixError {
    FixError::Message(format!(
        "illegal order transition: {} + {:?} -> {}",
        current, exec_type, new_status
    ))
}

fn parse_exec_type(msg: &FixMessage) -> Result<ExecType, FixError> {
    let raw = msg.get(fields::EXEC_TYPE)?;
    ExecType::from_wire(raw)
        .ok_or_else(|| FixError::Message(format!("unknown ExecType {:?}", raw)))
}

fn parse_ord_status(msg: &FixMessage) -> Result<OrdStatus, FixError> {
    let raw = msg.get(fields::ORD_STATUS)?;
    OrdStatus::from_wire(raw)
        .ok_or_else(|| FixError::Message(format!("unknown OrdStatus {:?}", raw)))
}

//Trim a float rendered as a tag value: whole quantities print without the
//trailing ".0" the way counterparties expect them.
fn format_qty(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
