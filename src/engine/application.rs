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

use async_trait::async_trait;

use crate::engine::ConnectionState;
use crate::message::FixMessage;

/// Hooks the engine calls back into. Every method runs inline on the
/// connection's reader task, after the triggering message has been
/// journaled, so a callback may call [`FixConnection::send_msg`] but should
/// not block for long.
///
/// All hooks default to doing nothing; implement the ones you care about.
///
/// [`FixConnection::send_msg`]: crate::engine::FixConnection::send_msg
#[async_trait]
pub trait Application: Send + 'static {
    async fn on_connect(&mut self) {}

    async fn on_disconnect(&mut self) {}

    async fn on_state_change(&mut self, _state: ConnectionState) {}

    /// Fired once the Logon exchange completes. `is_healthy` is false when
    /// the session went straight into resend recovery instead of ACTIVE.
    async fn on_logon(&mut self, _is_healthy: bool) {}

    async fn on_logout(&mut self, _msg: &FixMessage) {}

    /// Every in-order application message lands here.
    async fn on_message(&mut self, _msg: FixMessage) {}

    /// Asked once per journaled application message when the peer requests a
    /// resend. Returning false turns the message into a SequenceReset gap
    /// fill instead of a retransmission. Session messages are never offered.
    fn should_replay(&self, _msg: &FixMessage) -> bool {
        true
    }
}
