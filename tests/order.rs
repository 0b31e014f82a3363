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

//! Order lifecycle scenarios: the ack chain, fills, cancel, cancel-reject,
//! and replace.

use fix44::dictionary::field_types::{OrdStatus, OrdType, Side};
use fix44::dictionary::fields::*;
use fix44::message::FixMessage;
use fix44::order::OrderSingle;

fn order() -> OrderSingle {
    OrderSingle::new("ORD1", "AAPL", Side::Buy, 100.5, 10.0, OrdType::Limit)
}

fn exec_report(clord_id: &str, exec_type: &str, ord_status: &str) -> FixMessage {
    let mut msg = FixMessage::new("8");
    msg.set(ORDER_ID, "X123").unwrap();
    msg.set(CL_ORD_ID, clord_id).unwrap();
    msg.set(EXEC_TYPE, exec_type).unwrap();
    msg.set(ORD_STATUS, ord_status).unwrap();
    msg
}

fn cancel_reject(clord_id: &str, ord_status: &str) -> FixMessage {
    let mut msg = FixMessage::new("9");
    msg.set(CL_ORD_ID, clord_id).unwrap();
    msg.set(ORD_STATUS, ord_status).unwrap();
    msg
}

#[test]
fn happy_path_to_filled() {
    let mut order = order();
    order.new_req().unwrap();
    assert_eq!(order.status(), OrdStatus::PendingNew);

    //Pending ack changes nothing.
    let report = exec_report("ORD1--1", "A", "A");
    assert_eq!(order.process_execution_report(&report).unwrap(), 0);
    assert_eq!(order.status(), OrdStatus::PendingNew);

    //Accepted.
    let report = exec_report("ORD1--1", "0", "0");
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::New);
    assert_eq!(order.order_id(), Some("X123"));

    //Partial fill.
    let mut report = exec_report("ORD1--1", "F", "1");
    report.set(CUM_QTY, "5").unwrap();
    report.set(LEAVES_QTY, "5").unwrap();
    report.set(AVG_PX, "100.5").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::PartiallyFilled);
    assert_eq!(order.cum_qty(), 5.0);
    assert_eq!(order.leaves_qty(), 5.0);
    assert_eq!(order.avg_px(), 100.5);
    assert!(!order.is_finished());

    //Full fill, terminal.
    let mut report = exec_report("ORD1--1", "F", "2");
    report.set(CUM_QTY, "10").unwrap();
    report.set(LEAVES_QTY, "0").unwrap();
    report.set(AVG_PX, "100.6").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Filled);
    assert_eq!(order.cum_qty(), 10.0);
    assert!(order.is_finished());

    //Nothing leads out of FILLED.
    let report = exec_report("ORD1--1", "0", "0");
    assert_eq!(order.process_execution_report(&report).unwrap(), -1);
    assert_eq!(order.status(), OrdStatus::Filled);
}

fn order_in_new() -> OrderSingle {
    let mut order = order();
    order.new_req().unwrap();
    order
        .process_execution_report(&exec_report("ORD1--1", "0", "0"))
        .unwrap();
    assert_eq!(order.status(), OrdStatus::New);
    order
}

#[test]
fn cancel_reject_reverts_and_terminal_reject_sticks() {
    let mut order = order_in_new();

    order.cancel_req().unwrap();
    assert_eq!(order.status(), OrdStatus::PendingCancel);

    //Reject reporting the order still live puts it back to NEW.
    let reject = cancel_reject("ORD1--2", "0");
    assert_eq!(order.process_cancel_reject(&reject).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::New);
    assert!(order.orig_clord_id().is_none());

    //Second attempt; this time the reject reports the order rejected.
    order.cancel_req().unwrap();
    assert_eq!(order.status(), OrdStatus::PendingCancel);
    let reject = cancel_reject("ORD1--3", "8");
    assert_eq!(order.process_cancel_reject(&reject).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Rejected);
    assert!(order.is_finished());
}

#[test]
fn cancel_acknowledged() {
    let mut order = order_in_new();

    let msg = order.cancel_req().unwrap();
    assert_eq!(msg.get(ORIG_CL_ORD_ID).unwrap(), "ORD1--1");
    assert_eq!(msg.get(CL_ORD_ID).unwrap(), "ORD1--2");

    //A fill racing the cancel keeps the order pending but updates the
    //quantities.
    let mut report = exec_report("ORD1--1", "F", "1");
    report.set(CUM_QTY, "3").unwrap();
    report.set(LEAVES_QTY, "7").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 0);
    assert_eq!(order.status(), OrdStatus::PendingCancel);
    assert_eq!(order.cum_qty(), 3.0);

    //Cancel ack lands, terminal.
    let report = exec_report("ORD1--2", "4", "4");
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Canceled);
    assert!(order.is_finished());
}

#[test]
fn replace_adopts_new_price() {
    let mut order = order_in_new();

    let msg = order.replace_req(Some(101.0), None).unwrap();
    assert_eq!(msg.msg_type(), "G");
    assert_eq!(msg.get(CL_ORD_ID).unwrap(), "ORD1--2");
    assert_eq!(order.status(), OrdStatus::PendingReplace);

    let mut report = exec_report("ORD1--2", "5", "0");
    report.set(PRICE, "101").unwrap();
    report.set(ORDER_QTY, "10").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::New);
    assert_eq!(order.price(), 101.0);
    assert!(order.orig_clord_id().is_none());

    //The replaced order keeps working under the new ClOrdID.
    let mut report = exec_report("ORD1--2", "F", "2");
    report.set(CUM_QTY, "10").unwrap();
    report.set(LEAVES_QTY, "0").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Filled);
}

#[test]
fn replace_after_partial_fill_resolves_to_partially_filled() {
    let mut order = order_in_new();
    let mut report = exec_report("ORD1--1", "F", "1");
    report.set(CUM_QTY, "4").unwrap();
    report.set(LEAVES_QTY, "6").unwrap();
    order.process_execution_report(&report).unwrap();
    assert_eq!(order.status(), OrdStatus::PartiallyFilled);

    order.replace_req(None, Some(20.0)).unwrap();
    let mut report = exec_report("ORD1--2", "5", "1");
    report.set(ORDER_QTY, "20").unwrap();
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::PartiallyFilled);
    assert_eq!(order.qty(), 20.0);
}

#[test]
fn unsolicited_cancel_and_expiry() {
    let mut order = order_in_new();
    let report = exec_report("ORD1--1", "4", "4");
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Canceled);

    let mut order = order_in_new();
    let report = exec_report("ORD1--1", "C", "C");
    assert_eq!(order.process_execution_report(&report).unwrap(), 1);
    assert_eq!(order.status(), OrdStatus::Expired);
    assert!(order.is_finished());
}

#[test]
fn reports_for_other_orders_are_ignored() {
    let mut order = order_in_new();
    let report = exec_report("OTHER--1", "F", "2");
    assert_eq!(order.process_execution_report(&report).unwrap(), 0);
    assert_eq!(order.status(), OrdStatus::New);

    let reject = cancel_reject("OTHER--2", "0");
    assert_eq!(order.process_cancel_reject(&reject).unwrap(), 0);
    assert_eq!(order.status(), OrdStatus::New);
}
