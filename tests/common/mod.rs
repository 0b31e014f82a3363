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

//! In-process counterparty used by the engine tests: one end of a duplex
//! pipe plus a codec and its own session counters, scripted byte for byte.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use fix44::codec::{Codec, Decoded};
use fix44::engine::{Application, ConnectionState};
use fix44::message::FixMessage;
use fix44::session::Session;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(30);

/// The remote side of the connection under test. It speaks real FIX 4.4
/// through the same codec but with its own sequence counters, so tests can
/// jump them around to provoke gaps and duplicates.
pub struct TestPeer {
    io: DuplexStream,
    codec: Codec,
    pub session: Session,
    buf: Vec<u8>,
}

impl TestPeer {
    pub fn new(io: DuplexStream, sender_comp_id: &str, target_comp_id: &str) -> Self {
        TestPeer {
            io,
            codec: Codec::new(),
            session: Session::new(sender_comp_id, target_comp_id),
            buf: Vec::new(),
        }
    }

    /// Encodes and writes one message, returning the frame bytes so a test
    /// can replay them later.
    pub async fn send(&mut self, msg: FixMessage) -> Vec<u8> {
        let bytes = self
            .codec
            .encode(&msg, &mut self.session, false)
            .expect("peer encode");
        self.io.write_all(&bytes).await.expect("peer write");
        self.io.flush().await.expect("peer flush");
        bytes
    }

    /// Sends a session message that carries its own MsgSeqNum.
    pub async fn send_with_seq_num(&mut self, mut msg: FixMessage, seq_num: u32) {
        msg.set_msg_seq_num(seq_num);
        let bytes = self
            .codec
            .encode(&msg, &mut self.session, true)
            .expect("peer raw encode");
        self.io.write_all(&bytes).await.expect("peer write");
        self.io.flush().await.expect("peer flush");
    }

    pub async fn send_raw_bytes(&mut self, bytes: &[u8]) {
        self.io.write_all(bytes).await.expect("peer write");
        self.io.flush().await.expect("peer flush");
    }

    /// Reads until one complete frame decodes, or panics on timeout/EOF.
    pub async fn recv(&mut self) -> FixMessage {
        tokio::time::timeout(RECV_TIMEOUT, self.recv_inner())
            .await
            .expect("timed out waiting for a frame from the engine")
    }

    async fn recv_inner(&mut self) -> FixMessage {
        loop {
            match self.codec.decode(&self.buf).expect("peer decode") {
                Decoded::Frame(frame) => {
                    self.buf.drain(..frame.consumed);
                    return frame.message;
                }
                Decoded::NeedMore => {}
            }

            let mut chunk = [0u8; 4096];
            let n = self.io.read(&mut chunk).await.expect("peer read");
            assert!(n > 0, "engine closed the connection mid-recv");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// True once the engine shuts its end of the pipe.
    pub async fn recv_eof(&mut self) -> bool {
        let deadline = tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                let mut chunk = [0u8; 4096];
                match self.io.read(&mut chunk).await {
                    Ok(0) => return true,
                    Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                    Err(_) => return true,
                }
            }
        });
        deadline.await.unwrap_or(false)
    }
}

/// What the engine told the application, in order.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Connect,
    Disconnect,
    Logon(bool),
    Logout,
    Message(FixMessage),
    StateChange(ConnectionState),
}

/// Application that just records every callback.
pub struct RecordingApp {
    tx: mpsc::UnboundedSender<AppEvent>,
    pub replay_app_msgs: bool,
}

impl RecordingApp {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            RecordingApp {
                tx,
                replay_app_msgs: true,
            },
            rx,
        )
    }

    fn record(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl Application for RecordingApp {
    async fn on_connect(&mut self) {
        self.record(AppEvent::Connect);
    }

    async fn on_disconnect(&mut self) {
        self.record(AppEvent::Disconnect);
    }

    async fn on_state_change(&mut self, state: ConnectionState) {
        self.record(AppEvent::StateChange(state));
    }

    async fn on_logon(&mut self, is_healthy: bool) {
        self.record(AppEvent::Logon(is_healthy));
    }

    async fn on_logout(&mut self, _msg: &FixMessage) {
        self.record(AppEvent::Logout);
    }

    async fn on_message(&mut self, msg: FixMessage) {
        self.record(AppEvent::Message(msg));
    }

    fn should_replay(&self, _msg: &FixMessage) -> bool {
        self.replay_app_msgs
    }
}

/// Next recorded event, failing the test if none shows up in time.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an application event")
        .expect("event channel closed")
}

/// Skips forward to the next event the predicate accepts.
pub async fn wait_for_event<F>(rx: &mut mpsc::UnboundedReceiver<AppEvent>, mut accept: F) -> AppEvent
where
    F: FnMut(&AppEvent) -> bool,
{
    loop {
        let event = next_event(rx).await;
        if accept(&event) {
            return event;
        }
    }
}

/// Skips forward until the engine reports the wanted state.
pub async fn wait_for_state(rx: &mut mpsc::UnboundedReceiver<AppEvent>, state: ConnectionState) {
    wait_for_event(rx, |event| {
        matches!(event, AppEvent::StateChange(seen) if *seen == state)
    })
    .await;
}
