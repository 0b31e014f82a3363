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

//! Connection engine: the state machine between a byte transport and the
//! application, enforcing the FIX 4.4 session rules.

pub mod application;
pub mod connection;

pub use application::Application;
pub use connection::FixConnection;

use std::fmt;
use std::time::Duration;

/// Connection lifecycle states. Transitions are driven by transport events,
/// decoded inbound messages, heartbeat timer ticks, and send requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    Unknown,
    /// Initiator that has not connected yet today.
    DisconnectedNoConnToday,
    /// Disconnected cleanly after a session earlier today.
    DisconnectedWConnToday,
    /// The connection dropped without a clean logout.
    DisconnectedBrokenConn,
    NetworkConnInitiated,
    NetworkConnEstablished,
    /// Initiator sent its Logon and awaits the response.
    LogonInitialSent,
    /// Acceptor received the initial Logon.
    LogonInitialRecv,
    /// Logon accepted, response in flight.
    LogonResponse,
    /// An inbound gap was detected; a ResendRequest is outstanding.
    ResendReqAwaiting,
    Active,
    /// A TestRequest went unanswered; the peer is presumed gone.
    AwaitingConnectionRestore,
    /// We sent a Logout and await the peer's confirmation.
    LogoutPending,
}

impl ConnectionState {
    pub fn is_disconnected(self) -> bool {
        matches!(
            self,
            ConnectionState::DisconnectedNoConnToday
                | ConnectionState::DisconnectedWConnToday
                | ConnectionState::DisconnectedBrokenConn
        )
    }

    /// States in which the session layer exchanges messages at all.
    pub fn can_send_session_msg(self) -> bool {
        matches!(
            self,
            ConnectionState::Active
                | ConnectionState::LogonInitialSent
                | ConnectionState::LogonInitialRecv
                | ConnectionState::LogonResponse
                | ConnectionState::ResendReqAwaiting
                | ConnectionState::LogoutPending
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which side of the Logon handshake this connection plays.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionRole {
    /// Sends the Logon first.
    Initiator,
    /// Waits for the peer's Logon and mirrors it.
    Acceptor,
}

/// Static per-session settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub sender_comp_id: String,
    pub target_comp_id: String,
    /// HeartBtInt proposed on Logon; the peer's Logon may override it.
    pub heartbeat_period: Duration,
    /// Send ResetSeqNumFlag=Y on the initial Logon.
    pub reset_seq_nums: bool,
    /// How long the Logon exchange may take before the connection is
    /// considered dead.
    pub logon_timeout: Duration,
}

impl SessionConfig {
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>) -> Self {
        SessionConfig {
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            heartbeat_period: Duration::from_secs(30),
            reset_seq_nums: false,
            logon_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    pub fn with_reset_seq_nums(mut self, reset: bool) -> Self {
        self.reset_seq_nums = reset;
        self
    }
}
