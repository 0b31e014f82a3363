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

//! One FIX connection over one byte stream.
//!
//! The connection runs two logical tasks on one cooperative scheduler: the
//! reader (driven by byte arrival) and the heartbeat timer (driven by
//! interval ticks). Everything mutable sits behind one async mutex, the send
//! lock, so encode+persist+transmit is atomic and two concurrent
//! [`FixConnection::send_msg`] calls come out with contiguous sequence
//! numbers. Application callbacks never run while that lock is held; they
//! are queued and flushed afterwards so a callback may itself send.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::codec::{transform_for_replay, Codec};
use crate::dictionary::messages as admin;
use crate::dictionary::{fields, msg_type};
use crate::engine::{Application, ConnectionRole, ConnectionState, SessionConfig};
use crate::error::FixError;
use crate::journal::{Direction, Journal, JournalStore};
use crate::message::FixMessage;
use crate::session::{SeqNumStatus, Session};

const TIMER_TICK: Duration = Duration::from_millis(250);

//Extra slack on top of the heartbeat period before a TestRequest goes out.
//FIX 4.4, Volume 2, page 12 calls this the reasonable transmission time.
fn test_request_due(heartbeat_period: Duration) -> Duration {
    heartbeat_period + heartbeat_period / 5
}

enum AppEvent {
    Connect,
    Disconnect,
    Logon(bool),
    Logout(FixMessage),
    Message(FixMessage),
    StateChange(ConnectionState),
}

struct Inner<S: JournalStore> {
    state: ConnectionState,
    state_since: Instant,
    session: Session,
    journal: Journal<S>,
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    heartbeat_period: Duration,
    last_outbound: Instant,
    last_inbound: Instant,
    pending_test_req_id: Option<String>,
    test_req_sent_at: Option<Instant>,
    //Out-of-order frames parked until the resend closes the gap, keyed by
    //their MsgSeqNum.
    gap_buffer: BTreeMap<u32, (FixMessage, Vec<u8>)>,
    //Highest sequence number seen past the gap; once next_num_in passes it
    //the session is caught up.
    resend_target: Option<u32>,
    //Set when this side already reset the counters for the current logon
    //exchange; the peer mirroring ResetSeqNumFlag must not reset them twice.
    seq_nums_reset_this_logon: bool,
    events: Vec<AppEvent>,
}

struct Shared<A, S: JournalStore> {
    config: SessionConfig,
    role: ConnectionRole,
    codec: Codec,
    inner: Mutex<Inner<S>>,
    app: Mutex<A>,
}

/// Handle to one connection. Clones share the same connection; keep one for
/// the `run` loop and hand others to whatever needs to send.
pub struct FixConnection<A: Application, S: JournalStore> {
    shared: Arc<Shared<A, S>>,
}

impl<A: Application, S: JournalStore> Clone for FixConnection<A, S> {
    fn clone(&self) -> Self {
        FixConnection {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, S> FixConnection<A, S>
where
    A: Application,
    S: JournalStore + 'static,
{
    pub fn initiator(config: SessionConfig, app: A, store: S) -> Result<Self, FixError> {
        Self::new(config, ConnectionRole::Initiator, app, store)
    }

    pub fn acceptor(config: SessionConfig, app: A, store: S) -> Result<Self, FixError> {
        Self::new(config, ConnectionRole::Acceptor, app, store)
    }

    pub fn new(
        config: SessionConfig,
        role: ConnectionRole,
        app: A,
        store: S,
    ) -> Result<Self, FixError> {
        let mut journal = Journal::open(store)?;
        let session = journal.create_or_load(&config.target_comp_id, &config.sender_comp_id)?;

        let state = match role {
            ConnectionRole::Initiator => ConnectionState::DisconnectedNoConnToday,
            ConnectionRole::Acceptor => ConnectionState::Unknown,
        };
        let now = Instant::now();
        let heartbeat_period = config.heartbeat_period;

        Ok(FixConnection {
            shared: Arc::new(Shared {
                config,
                role,
                codec: Codec::new(),
                inner: Mutex::new(Inner {
                    state,
                    state_since: now,
                    session,
                    journal,
                    writer: None,
                    heartbeat_period,
                    last_outbound: now,
                    last_inbound: now,
                    pending_test_req_id: None,
                    test_req_sent_at: None,
                    gap_buffer: BTreeMap::new(),
                    resend_target: None,
                    seq_nums_reset_this_logon: false,
                    events: Vec::new(),
                }),
                app: Mutex::new(app),
            }),
        })
    }

    pub fn role(&self) -> ConnectionRole {
        self.shared.role
    }

    pub async fn state(&self) -> ConnectionState {
        self.shared.inner.lock().await.state
    }

    /// Snapshot of the session counters.
    pub async fn session(&self) -> Session {
        self.shared.inner.lock().await.session.clone()
    }

    /// Drives the connection over `transport` until it disconnects. The
    /// initiator sends its Logon immediately; the acceptor waits for one.
    pub async fn run<T>(&self, transport: T) -> Result<(), FixError>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut reader, writer) = tokio::io::split(transport);

        {
            let mut inner = self.shared.inner.lock().await;
            inner.writer = Some(Box::new(writer));
            inner.last_inbound = Instant::now();
            inner.last_outbound = Instant::now();
            inner.set_state(ConnectionState::NetworkConnInitiated);
            inner.set_state(ConnectionState::NetworkConnEstablished);
            inner.events.push(AppEvent::Connect);

            if self.shared.role == ConnectionRole::Initiator {
                let heartbeat_secs = self.shared.config.heartbeat_period.as_secs() as u32;
                let logon = admin::logon(heartbeat_secs, self.shared.config.reset_seq_nums);
                if self.shared.config.reset_seq_nums {
                    inner.session.reset();
                    let session = inner.session.clone();
                    inner.journal.set_seq_num(&session, Some(1), Some(1))?;
                    inner.seq_nums_reset_this_logon = true;
                }
                inner.send_now(&self.shared.codec, logon, false).await?;
                inner.set_state(ConnectionState::LogonInitialSent);
            }
        }
        self.flush_events().await;

        let mut buf = BytesMut::with_capacity(8192);
        let mut ticker = interval(TIMER_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                read = reader.read_buf(&mut buf) => match read {
                    Ok(0) => {
                        self.on_transport_closed().await;
                        break Ok(());
                    }
                    Ok(_) => {
                        if let Err(err) = self.drain_frames(&mut buf).await {
                            self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                                .await;
                            break Err(err);
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "transport read failed");
                        self.on_transport_closed().await;
                        break Ok(());
                    }
                },
                _ = ticker.tick() => {
                    if let Err(err) = self.on_timer_tick().await {
                        self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                            .await;
                        break Err(err);
                    }
                }
            }

            self.flush_events().await;
            if self.state().await.is_disconnected() {
                break Ok(());
            }
        };

        self.flush_events().await;
        result
    }

    /// Encodes, journals, and transmits one message, in that order, under
    /// the send lock. Returns the allocated MsgSeqNum.
    ///
    /// Only the ACTIVE state accepts application messages; session messages
    /// are also accepted during logon, resend recovery, and logout.
    pub async fn send_msg(&self, msg: FixMessage) -> Result<u32, FixError> {
        let mut inner = self.shared.inner.lock().await;

        let is_session_msg = self.shared.codec.profile().is_session_message(msg.msg_type());
        let allowed = match inner.state {
            ConnectionState::Active => true,
            state => is_session_msg && state.can_send_session_msg(),
        };
        if !allowed {
            return Err(FixError::Connection(format!(
                "cannot send {} while {}",
                msg.msg_type(),
                inner.state
            )));
        }

        let is_logout = msg.msg_type() == msg_type::LOGOUT;
        let seq_num = inner.send_now(&self.shared.codec, msg, false).await?;
        if is_logout {
            inner.set_state(ConnectionState::LogoutPending);
        }
        Ok(seq_num)
    }

    /// Sends a TestRequest with a fresh TestReqID. Fails while a previous
    /// one is still unanswered.
    pub async fn send_test_req(&self) -> Result<(), FixError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.pending_test_req_id.is_some() {
            return Err(FixError::Connection(
                "a TestRequest is already pending".to_string(),
            ));
        }

        let test_req_id = chrono::Utc::now().timestamp_millis().to_string();
        inner
            .send_now(&self.shared.codec, admin::test_request(&test_req_id), false)
            .await?;
        inner.pending_test_req_id = Some(test_req_id);
        inner.test_req_sent_at = Some(Instant::now());
        Ok(())
    }

    /// Tears the connection down: optionally sends a Logout carrying
    /// `logout_text`, closes the transport, and lands in `target_state`.
    pub async fn disconnect(&self, target_state: ConnectionState, logout_text: Option<&str>) {
        {
            let mut inner = self.shared.inner.lock().await;
            inner
                .disconnect(&self.shared.codec, target_state, logout_text)
                .await;
        }
        self.flush_events().await;
    }

    async fn on_transport_closed(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            if !inner.state.is_disconnected() {
                warn!("transport closed unexpectedly");
                inner
                    .disconnect(&self.shared.codec, ConnectionState::DisconnectedBrokenConn, None)
                    .await;
            }
        }
        self.flush_events().await;
    }

    async fn drain_frames(&self, buf: &mut BytesMut) -> Result<(), FixError> {
        loop {
            let (msg, consumed, raw) = self.shared.codec.decode_silent(&buf[..]);
            if consumed == 0 {
                break;
            }
            let _ = buf.split_to(consumed);

            if let (Some(msg), Some(raw)) = (msg, raw) {
                self.process_frame(msg, raw).await?;
            }
            if self.state().await.is_disconnected() {
                break;
            }
        }
        Ok(())
    }

    async fn process_frame(&self, msg: FixMessage, raw: Vec<u8>) -> Result<(), FixError> {
        let mut inner = self.shared.inner.lock().await;
        inner.last_inbound = Instant::now();

        let mut queue = VecDeque::new();
        queue.push_back((msg, raw));
        while let Some((msg, raw)) = queue.pop_front() {
            self.handle_frame(&mut inner, msg, raw).await?;
            if inner.state.is_disconnected() {
                return Ok(());
            }

            //Drop parked frames the peer's replay already covered, then
            //release the next one that is now in order.
            let next_num_in = inner.session.next_num_in();
            inner.gap_buffer.retain(|&seq_num, _| seq_num >= next_num_in);
            if let Some(parked) = inner.gap_buffer.remove(&next_num_in) {
                queue.push_back(parked);
            }
        }

        //Once the counter has moved past everything seen beyond the gap, the
        //resend is complete.
        if inner.state == ConnectionState::ResendReqAwaiting
            && inner.gap_buffer.is_empty()
            && inner
                .resend_target
                .map_or(true, |target| inner.session.next_num_in() > target)
        {
            inner.resend_target = None;
            inner.set_state(ConnectionState::Active);
        }

        Ok(())
    }

    async fn handle_frame(
        &self,
        inner: &mut Inner<S>,
        msg: FixMessage,
        raw: Vec<u8>,
    ) -> Result<(), FixError> {
        let codec = &self.shared.codec;

        //Identity first: a frame from the wrong counterparty never gets a
        //sequence number check.
        let comp_ids_valid = match (
            msg.get_opt(fields::SENDER_COMP_ID),
            msg.get_opt(fields::TARGET_COMP_ID),
        ) {
            (Ok(Some(sender)), Ok(Some(target))) => {
                inner.session.validate_comp_ids(sender, target)
            }
            _ => false,
        };
        if !comp_ids_valid {
            warn!(msg = %msg, "comp id mismatch");
            inner
                .disconnect(
                    codec,
                    ConnectionState::DisconnectedBrokenConn,
                    Some("CompID problem"),
                )
                .await;
            return Ok(());
        }

        //Both sides require the first inbound message to be a Logon.
        let awaiting_first_msg = matches!(
            inner.state,
            ConnectionState::LogonInitialSent | ConnectionState::NetworkConnEstablished
        );
        if awaiting_first_msg && msg.msg_type() != msg_type::LOGON {
            inner
                .disconnect(
                    codec,
                    ConnectionState::DisconnectedBrokenConn,
                    Some("first message is not a logon"),
                )
                .await;
            return Ok(());
        }

        if msg.msg_type() == msg_type::LOGON {
            return self.handle_logon(inner, msg, raw).await;
        }

        //SequenceReset in reset mode overrides the inbound counter without
        //consulting it, even backwards.
        if msg.msg_type() == msg_type::SEQUENCE_RESET && !gap_fill_flag(&msg) {
            let new_seq_no = read_seq_num(&msg, fields::NEW_SEQ_NO)?;
            info!(new_seq_no, "sequence reset (reset mode)");
            inner.session.force_next_num_in(new_seq_no);
            let session = inner.session.clone();
            inner.journal.set_seq_num(&session, None, Some(new_seq_no))?;
            return Ok(());
        }

        match inner.session.set_next_num_in(&msg)? {
            SeqNumStatus::Gap(seq_num) => {
                debug!(
                    seq_num,
                    expected = inner.session.next_num_in(),
                    "inbound sequence gap"
                );
                inner.park_and_request_resend(codec, seq_num, Some((msg, raw))).await?;
            }
            SeqNumStatus::Duplicate(seq_num) => {
                if poss_dup_flag(&msg) {
                    debug!(seq_num, "ignoring possible duplicate");
                } else {
                    inner
                        .disconnect(
                            codec,
                            ConnectionState::DisconnectedBrokenConn,
                            Some("MsgSeqNum too low"),
                        )
                        .await;
                }
            }
            SeqNumStatus::InOrder(_) => {
                let session = inner.session.clone();
                inner.journal.persist_msg(&raw, &session, Direction::Inbound)?;
                self.dispatch(inner, msg).await?;
            }
        }
        Ok(())
    }

    //In-order, journaled traffic ends up here.
    async fn dispatch(&self, inner: &mut Inner<S>, msg: FixMessage) -> Result<(), FixError> {
        let codec = &self.shared.codec;
        match msg.msg_type() {
            msg_type::HEARTBEAT => {
                if let Ok(Some(test_req_id)) = msg.get_opt(fields::TEST_REQ_ID) {
                    if inner.pending_test_req_id.as_deref() == Some(test_req_id) {
                        inner.pending_test_req_id = None;
                        inner.test_req_sent_at = None;
                    }
                }
            }
            msg_type::TEST_REQUEST => {
                let test_req_id = msg.get(fields::TEST_REQ_ID)?.to_string();
                inner
                    .send_now(codec, admin::heartbeat(Some(&test_req_id)), false)
                    .await?;
            }
            msg_type::RESEND_REQUEST => {
                let begin_seq_no = read_seq_num(&msg, fields::BEGIN_SEQ_NO)?;
                let end_seq_no = read_seq_num(&msg, fields::END_SEQ_NO)?;
                self.replay_range(inner, begin_seq_no, end_seq_no).await?;
            }
            msg_type::SEQUENCE_RESET => {
                //Gap fill mode; reset mode never reaches dispatch.
                let new_seq_no = read_seq_num(&msg, fields::NEW_SEQ_NO)?;
                if new_seq_no < inner.session.next_num_in() {
                    warn!(
                        new_seq_no,
                        next_num_in = inner.session.next_num_in(),
                        "ignoring backwards gap fill"
                    );
                } else {
                    inner.session.force_next_num_in(new_seq_no);
                    let session = inner.session.clone();
                    inner.journal.set_seq_num(&session, None, Some(new_seq_no))?;
                }
            }
            msg_type::LOGOUT => {
                let we_initiated = inner.state == ConnectionState::LogoutPending;
                inner.events.push(AppEvent::Logout(msg.clone()));
                if !we_initiated {
                    //Respond in kind before hanging up.
                    let _ = inner.send_now(codec, admin::logout(None), false).await;
                }
                inner
                    .disconnect(codec, ConnectionState::DisconnectedWConnToday, None)
                    .await;
            }
            msg_type::REJECT => {
                warn!(msg = %msg, "session level reject received");
                inner.events.push(AppEvent::Message(msg));
            }
            _ => {
                inner.events.push(AppEvent::Message(msg));
            }
        }
        Ok(())
    }

    async fn handle_logon(
        &self,
        inner: &mut Inner<S>,
        msg: FixMessage,
        raw: Vec<u8>,
    ) -> Result<(), FixError> {
        let codec = &self.shared.codec;

        //Only the logon states may see a Logon.
        let expected = matches!(
            inner.state,
            ConnectionState::LogonInitialSent
                | ConnectionState::NetworkConnEstablished
                | ConnectionState::LogonInitialRecv
        );
        if !expected {
            inner
                .disconnect(
                    codec,
                    ConnectionState::DisconnectedBrokenConn,
                    Some("unexpected Logon"),
                )
                .await;
            return Ok(());
        }

        if self.shared.role == ConnectionRole::Acceptor {
            inner.set_state(ConnectionState::LogonInitialRecv);
        }

        //Adopt the peer's heartbeat interval.
        let mut heartbeat_secs = self.shared.config.heartbeat_period.as_secs() as u32;
        if let Some(interval) = msg.get_opt(fields::HEART_BT_INT)? {
            heartbeat_secs = interval.parse().map_err(|_| {
                FixError::Message(format!("HeartBtInt {:?} is not a number", interval))
            })?;
            inner.heartbeat_period = Duration::from_secs(u64::from(heartbeat_secs));
        }

        //ResetSeqNumFlag=Y resets both sides to 1 and wipes the log, unless
        //this side already did so for this very exchange.
        let reset = matches!(msg.get_opt(fields::RESET_SEQ_NUM_FLAG)?, Some("Y"));
        if reset && !inner.seq_nums_reset_this_logon {
            info!("logon requests sequence number reset");
            inner.session.reset();
            let session = inner.session.clone();
            inner.journal.set_seq_num(&session, Some(1), Some(1))?;
        }
        inner.seq_nums_reset_this_logon = false;

        match inner.session.set_next_num_in(&msg)? {
            SeqNumStatus::InOrder(_) => {
                let session = inner.session.clone();
                inner.journal.persist_msg(&raw, &session, Direction::Inbound)?;

                inner.set_state(ConnectionState::LogonResponse);
                if self.shared.role == ConnectionRole::Acceptor {
                    inner
                        .send_now(codec, admin::logon(heartbeat_secs, reset), false)
                        .await?;
                }
                inner.set_state(ConnectionState::Active);
                inner.events.push(AppEvent::Logon(true));
            }
            SeqNumStatus::Gap(seq_num) => {
                //The logon content is consumed as-is; the missing range gets
                //requested right after the response goes out.
                inner.set_state(ConnectionState::LogonResponse);
                if self.shared.role == ConnectionRole::Acceptor {
                    inner
                        .send_now(codec, admin::logon(heartbeat_secs, reset), false)
                        .await?;
                }
                inner.park_and_request_resend(codec, seq_num, None).await?;
                inner.events.push(AppEvent::Logon(false));
            }
            SeqNumStatus::Duplicate(_) => {
                inner
                    .disconnect(
                        codec,
                        ConnectionState::DisconnectedBrokenConn,
                        Some("MsgSeqNum too low on Logon"),
                    )
                    .await;
            }
        }
        Ok(())
    }

    //Answers an inbound ResendRequest from the outbound journal. Messages
    //the application declines to replay, session messages, and holes in the
    //journal coalesce into one gap fill per run.
    async fn replay_range(
        &self,
        inner: &mut Inner<S>,
        begin_seq_no: u32,
        end_seq_no: u32,
    ) -> Result<(), FixError> {
        let codec = &self.shared.codec;
        let session = inner.session.clone();
        let last_sent = inner.journal.last_seq_num(&session, Direction::Outbound);
        let end_seq_no = if end_seq_no == 0 {
            last_sent
        } else {
            end_seq_no.min(last_sent)
        };
        info!(begin_seq_no, end_seq_no, "answering resend request");

        let mut gap_run_start: Option<u32> = None;
        for seq_num in begin_seq_no..=end_seq_no {
            let frame = inner.journal.recover_msg(&session, Direction::Outbound, seq_num);
            let replay = match &frame {
                None => false,
                Some(frame) => match codec.decode(frame) {
                    Ok(crate::codec::Decoded::Frame(decoded)) => {
                        if codec.profile().is_session_message(decoded.message.msg_type()) {
                            false
                        } else {
                            self.shared.app.lock().await.should_replay(&decoded.message)
                        }
                    }
                    _ => false,
                },
            };

            if replay {
                if let Some(start) = gap_run_start.take() {
                    inner.send_gap_fill(codec, start, seq_num).await?;
                }
                let bytes = transform_for_replay(frame.as_deref().unwrap_or_default())?;
                inner.write_bytes(&bytes).await?;
            } else {
                gap_run_start.get_or_insert(seq_num);
            }
        }
        if let Some(start) = gap_run_start {
            inner.send_gap_fill(codec, start, end_seq_no + 1).await?;
        }
        Ok(())
    }

    async fn on_timer_tick(&self) -> Result<(), FixError> {
        let mut inner = self.shared.inner.lock().await;
        let codec = &self.shared.codec;
        let now = Instant::now();

        match inner.state {
            //The logon exchange must complete within its deadline.
            ConnectionState::LogonInitialSent
            | ConnectionState::LogonInitialRecv
            | ConnectionState::NetworkConnEstablished => {
                if now.duration_since(inner.state_since) > self.shared.config.logon_timeout {
                    warn!("logon did not complete in time");
                    inner
                        .disconnect(codec, ConnectionState::DisconnectedBrokenConn, None)
                        .await;
                }
                return Ok(());
            }
            ConnectionState::LogoutPending => {
                if now.duration_since(inner.state_since) > inner.heartbeat_period * 2 {
                    inner
                        .disconnect(codec, ConnectionState::DisconnectedWConnToday, None)
                        .await;
                }
                return Ok(());
            }
            ConnectionState::Active | ConnectionState::ResendReqAwaiting => {}
            _ => return Ok(()),
        }

        //Keep our side warm.
        if now.duration_since(inner.last_outbound) >= inner.heartbeat_period {
            inner.send_now(codec, admin::heartbeat(None), false).await?;
        }

        //Probe a quiet peer, then give up on it.
        let quiet_for = now.duration_since(inner.last_inbound);
        match (inner.pending_test_req_id.clone(), inner.test_req_sent_at) {
            (None, _) => {
                if quiet_for >= test_request_due(inner.heartbeat_period) {
                    let test_req_id = chrono::Utc::now().timestamp_millis().to_string();
                    debug!(%test_req_id, "peer is quiet, sending TestRequest");
                    inner
                        .send_now(codec, admin::test_request(&test_req_id), false)
                        .await?;
                    inner.pending_test_req_id = Some(test_req_id);
                    inner.test_req_sent_at = Some(now);
                }
            }
            (Some(_), Some(sent_at)) => {
                if now.duration_since(sent_at) >= inner.heartbeat_period {
                    warn!("TestRequest went unanswered");
                    inner.set_state(ConnectionState::AwaitingConnectionRestore);
                    inner
                        .disconnect(
                            codec,
                            ConnectionState::DisconnectedBrokenConn,
                            Some("TestRequest timeout"),
                        )
                        .await;
                }
            }
            (Some(_), None) => unreachable!("pending TestRequest without a send time"),
        }

        Ok(())
    }

    async fn flush_events(&self) {
        let events = {
            let mut inner = self.shared.inner.lock().await;
            std::mem::take(&mut inner.events)
        };
        if events.is_empty() {
            return;
        }

        let mut app = self.shared.app.lock().await;
        for event in events {
            match event {
                AppEvent::Connect => app.on_connect().await,
                AppEvent::Disconnect => app.on_disconnect().await,
                AppEvent::Logon(is_healthy) => app.on_logon(is_healthy).await,
                AppEvent::Logout(msg) => app.on_logout(&msg).await,
                AppEvent::Message(msg) => app.on_message(msg).await,
                AppEvent::StateChange(state) => app.on_state_change(state).await,
            }
        }
    }
}

impl<S: JournalStore> Inner<S> {
    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!(from = %self.state, to = %state, "connection state change");
        self.state = state;
        self.state_since = Instant::now();
        self.events.push(AppEvent::StateChange(state));
    }

    //encode + journal + transmit, in that order. The caller holds the send
    //lock by construction.
    async fn send_now(
        &mut self,
        codec: &Codec,
        msg: FixMessage,
        raw_seq_num: bool,
    ) -> Result<u32, FixError> {
        let bytes = codec.encode(&msg, &mut self.session, raw_seq_num)?;
        let session = self.session.clone();
        let seq_num = self.journal.persist_msg(&bytes, &session, Direction::Outbound)?;
        self.write_bytes(&bytes).await?;
        debug!(seq_num, msg_type = msg.msg_type(), "sent");
        Ok(seq_num)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), FixError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| FixError::Connection("transport is not open".to_string()))?;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        self.last_outbound = Instant::now();
        Ok(())
    }

    //Replay traffic rides on original sequence numbers and is never
    //journaled again.
    async fn send_gap_fill(
        &mut self,
        codec: &Codec,
        seq_num: u32,
        new_seq_no: u32,
    ) -> Result<(), FixError> {
        let mut gap_fill = admin::sequence_reset(new_seq_no, true);
        gap_fill.set_msg_seq_num(seq_num);
        gap_fill
            .replace(fields::POSS_DUP_FLAG, "Y")
            .expect("PossDupFlag is a plain tag");
        let bytes = codec.encode(&gap_fill, &mut self.session, true)?;
        self.write_bytes(&bytes).await
    }

    //Parks an out-of-order frame (when there is one to park) and makes sure
    //exactly one ResendRequest is outstanding.
    async fn park_and_request_resend(
        &mut self,
        codec: &Codec,
        seq_num: u32,
        frame: Option<(FixMessage, Vec<u8>)>,
    ) -> Result<(), FixError> {
        if let Some(frame) = frame {
            self.gap_buffer.insert(seq_num, frame);
        }
        self.resend_target = Some(self.resend_target.map_or(seq_num, |target| target.max(seq_num)));

        if self.state != ConnectionState::ResendReqAwaiting {
            let begin_seq_no = self.session.next_num_in();
            self.send_now(codec, admin::resend_request(begin_seq_no, 0), false)
                .await?;
            self.set_state(ConnectionState::ResendReqAwaiting);
        }
        Ok(())
    }

    async fn disconnect(
        &mut self,
        codec: &Codec,
        target_state: ConnectionState,
        logout_text: Option<&str>,
    ) {
        if let Some(text) = logout_text {
            if self.writer.is_some() {
                //Best effort; the peer may already be gone.
                let _ = self.send_now(codec, admin::logout(Some(text)), false).await;
            }
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }

        self.gap_buffer.clear();
        self.resend_target = None;
        self.pending_test_req_id = None;
        self.test_req_sent_at = None;

        let session = self.session.clone();
        if let Err(err) = self.journal.set_seq_num(
            &session,
            Some(session.next_num_out()),
            Some(session.next_num_in()),
        ) {
            warn!(error = %err, "failed to persist sequence numbers on disconnect");
        }

        self.set_state(target_state);
        self.events.push(AppEvent::Disconnect);
    }
}

fn gap_fill_flag(msg: &FixMessage) -> bool {
    matches!(msg.get_opt(fields::GAP_FILL_FLAG), Ok(Some("Y")))
}

fn poss_dup_flag(msg: &FixMessage) -> bool {
    matches!(msg.get_opt(fields::POSS_DUP_FLAG), Ok(Some("Y")))
}

fn read_seq_num(msg: &FixMessage, tag: crate::field_tag::FieldTag) -> Result<u32, FixError> {
    let value = msg.get_int(tag)?;
    u32::try_from(value)
        .map_err(|_| FixError::Message(format!("tag {} value {} out of range", tag, value)))
}
