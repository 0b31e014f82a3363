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

//! Persisted message log keyed by (session, direction, sequence number).
//!
//! Every transmitted and received frame lands here before it reaches the
//! transport or the application, so a resend request can always be answered
//! from disk. The backing store is an append-only record log replayed at
//! open; [`MemoryStore`] keeps the records in a Vec for tests and ephemeral
//! sessions, [`FileStore`] appends length-prefixed bincode records to a
//! single file and fsyncs each write.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::FixError;
use crate::session::Session;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// One append-only record. The in-memory state of a [`Journal`] is exactly
/// the left fold of these.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum JournalRecord {
    SessionCreated {
        sender_comp_id: String,
        target_comp_id: String,
    },
    SeqNumsSet {
        sender_comp_id: String,
        target_comp_id: String,
        next_num_out: u32,
        next_num_in: u32,
    },
    /// The message log for a session was destroyed by a sequence reset.
    SessionWiped {
        sender_comp_id: String,
        target_comp_id: String,
    },
    MsgPersisted {
        sender_comp_id: String,
        target_comp_id: String,
        direction: Direction,
        seq_num: u32,
        frame: Vec<u8>,
    },
}

pub trait JournalStore: Send {
    fn append(&mut self, record: &JournalRecord) -> Result<(), FixError>;
    fn replay(&mut self) -> Result<Vec<JournalRecord>, FixError>;
}

/// Record log held entirely in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<JournalRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl JournalStore for MemoryStore {
    fn append(&mut self, record: &JournalRecord) -> Result<(), FixError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn replay(&mut self) -> Result<Vec<JournalRecord>, FixError> {
        Ok(self.records.clone())
    }
}

/// Record log in a single append-only file: a little-endian u32 length
/// prefix followed by the bincode encoding of the record. Each append is
/// flushed and synced before the caller proceeds.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: PathBuf,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FixError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        Ok(FileStore { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalStore for FileStore {
    fn append(&mut self, record: &JournalRecord) -> Result<(), FixError> {
        let encoded = bincode::serialize(record)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let len = u32::try_from(encoded.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "record too large"))?;

        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&encoded)?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn replay(&mut self) -> Result<Vec<JournalRecord>, FixError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&self.file);
        let mut records = Vec::new();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            let mut data = vec![0u8; len];
            reader.read_exact(&mut data)?;

            let record: JournalRecord = bincode::deserialize(&data)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            records.push(record);
        }

        self.file.seek(SeekFrom::End(0))?;
        Ok(records)
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    inbound: BTreeMap<u32, Vec<u8>>,
    outbound: BTreeMap<u32, Vec<u8>>,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        SessionEntry {
            session,
            inbound: BTreeMap::new(),
            outbound: BTreeMap::new(),
        }
    }

    fn log(&self, direction: Direction) -> &BTreeMap<u32, Vec<u8>> {
        match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        }
    }

    fn log_mut(&mut self, direction: Direction) -> &mut BTreeMap<u32, Vec<u8>> {
        match direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        }
    }
}

/// The journal proper: session registry plus the per-direction message logs,
/// kept consistent with whatever [`JournalStore`] backs it.
pub struct Journal<S: JournalStore> {
    store: S,
    //Keyed by (target_comp_id, sender_comp_id).
    sessions: HashMap<(String, String), SessionEntry>,
}

impl<S: JournalStore> Journal<S> {
    /// Replays the store and rebuilds every session with its last seen
    /// sequence numbers.
    pub fn open(mut store: S) -> Result<Self, FixError> {
        let records = store.replay()?;
        let mut sessions: HashMap<(String, String), SessionEntry> = HashMap::new();

        for record in records {
            match record {
                JournalRecord::SessionCreated {
                    sender_comp_id,
                    target_comp_id,
                } => {
                    sessions
                        .entry((target_comp_id.clone(), sender_comp_id.clone()))
                        .or_insert_with(|| {
                            SessionEntry::new(Session::new(sender_comp_id, target_comp_id))
                        });
                }
                JournalRecord::SeqNumsSet {
                    sender_comp_id,
                    target_comp_id,
                    next_num_out,
                    next_num_in,
                } => {
                    let entry = sessions
                        .entry((target_comp_id.clone(), sender_comp_id.clone()))
                        .or_insert_with(|| {
                            SessionEntry::new(Session::new(sender_comp_id, target_comp_id))
                        });
                    entry.session.set_seq_nums(next_num_out, next_num_in);
                }
                JournalRecord::SessionWiped {
                    sender_comp_id,
                    target_comp_id,
                } => {
                    if let Some(entry) = sessions.get_mut(&(target_comp_id, sender_comp_id)) {
                        entry.inbound.clear();
                        entry.outbound.clear();
                    }
                }
                JournalRecord::MsgPersisted {
                    sender_comp_id,
                    target_comp_id,
                    direction,
                    seq_num,
                    frame,
                } => {
                    let entry = sessions
                        .entry((target_comp_id.clone(), sender_comp_id.clone()))
                        .or_insert_with(|| {
                            SessionEntry::new(Session::new(sender_comp_id, target_comp_id))
                        });
                    entry.log_mut(direction).insert(seq_num, frame);

                    //A persisted message implies the counter passed it, even
                    //if no explicit counter record was written afterwards.
                    let session = &mut entry.session;
                    match direction {
                        Direction::Outbound if session.next_num_out() <= seq_num => {
                            session.set_seq_nums(seq_num + 1, session.next_num_in());
                        }
                        Direction::Inbound if session.next_num_in() <= seq_num => {
                            session.set_seq_nums(session.next_num_out(), seq_num + 1);
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(Journal { store, sessions })
    }

    /// Every known session keyed by (target, sender).
    pub fn sessions(&self) -> HashMap<(String, String), Session> {
        self.sessions
            .iter()
            .map(|(key, entry)| (key.clone(), entry.session.clone()))
            .collect()
    }

    pub fn create_or_load(
        &mut self,
        target_comp_id: &str,
        sender_comp_id: &str,
    ) -> Result<Session, FixError> {
        let key = (target_comp_id.to_string(), sender_comp_id.to_string());
        if let Some(entry) = self.sessions.get(&key) {
            return Ok(entry.session.clone());
        }

        self.store.append(&JournalRecord::SessionCreated {
            sender_comp_id: sender_comp_id.to_string(),
            target_comp_id: target_comp_id.to_string(),
        })?;
        let session = Session::new(sender_comp_id, target_comp_id);
        self.sessions.insert(key, SessionEntry::new(session.clone()));
        Ok(session)
    }

    /// Updates the persisted sequence counters. Resetting both counters to 1
    /// destroys the session's message log; there is no way to answer resend
    /// requests across a sequence reset.
    pub fn set_seq_num(
        &mut self,
        session: &Session,
        next_num_out: Option<u32>,
        next_num_in: Option<u32>,
    ) -> Result<(), FixError> {
        let entry = self.entry_mut(session)?;
        let next_num_out = next_num_out.unwrap_or_else(|| entry.session.next_num_out());
        let next_num_in = next_num_in.unwrap_or_else(|| entry.session.next_num_in());
        entry.session.set_seq_nums(next_num_out, next_num_in);

        let wiped = next_num_out == 1 && next_num_in == 1;
        if wiped {
            entry.inbound.clear();
            entry.outbound.clear();
        }

        self.store.append(&JournalRecord::SeqNumsSet {
            sender_comp_id: session.sender_comp_id().to_string(),
            target_comp_id: session.target_comp_id().to_string(),
            next_num_out,
            next_num_in,
        })?;
        if wiped {
            self.store.append(&JournalRecord::SessionWiped {
                sender_comp_id: session.sender_comp_id().to_string(),
                target_comp_id: session.target_comp_id().to_string(),
            })?;
        }
        Ok(())
    }

    /// Writes one encoded frame under (session, direction, seq). The
    /// sequence number is parsed out of the frame itself. A key collision is
    /// a journal integrity violation and unrecoverable.
    pub fn persist_msg(
        &mut self,
        frame: &[u8],
        session: &Session,
        direction: Direction,
    ) -> Result<u32, FixError> {
        let seq_num = find_seq_no(frame)?;
        let entry = self.entry_mut(session)?;
        if entry.log(direction).contains_key(&seq_num) {
            error!(
                session = %session.key(),
                %direction,
                seq_num,
                "journal already holds this sequence number"
            );
            return Err(FixError::DuplicateSeqNo {
                session: session.key(),
                direction,
                seq_num,
            });
        }

        entry.log_mut(direction).insert(seq_num, frame.to_vec());
        self.store.append(&JournalRecord::MsgPersisted {
            sender_comp_id: session.sender_comp_id().to_string(),
            target_comp_id: session.target_comp_id().to_string(),
            direction,
            seq_num,
            frame: frame.to_vec(),
        })?;
        Ok(seq_num)
    }

    pub fn recover_msg(
        &self,
        session: &Session,
        direction: Direction,
        seq_num: u32,
    ) -> Option<Vec<u8>> {
        self.entry(session)
            .and_then(|entry| entry.log(direction).get(&seq_num).cloned())
    }

    /// Encoded frames for `start..=end` in sequence order. An `end` of 0
    /// means through the highest persisted number.
    pub fn recover_messages(
        &self,
        session: &Session,
        direction: Direction,
        start: u32,
        end: u32,
    ) -> Vec<Vec<u8>> {
        let Some(entry) = self.entry(session) else {
            return Vec::new();
        };
        let log = entry.log(direction);
        let end = if end == 0 {
            log.keys().next_back().copied().unwrap_or(0)
        } else {
            end
        };

        log.range(start..=end).map(|(_, frame)| frame.clone()).collect()
    }

    /// Highest persisted sequence number for the direction, 0 when empty.
    pub fn last_seq_num(&self, session: &Session, direction: Direction) -> u32 {
        self.entry(session)
            .and_then(|entry| entry.log(direction).keys().next_back().copied())
            .unwrap_or(0)
    }

    fn entry(&self, session: &Session) -> Option<&SessionEntry> {
        self.sessions.get(&(
            session.target_comp_id().to_string(),
            session.sender_comp_id().to_string(),
        ))
    }

    fn entry_mut(&mut self, session: &Session) -> Result<&mut SessionEntry, FixError> {
        self.sessions
            .get_mut(&(
                session.target_comp_id().to_string(),
                session.sender_comp_id().to_string(),
            ))
            .ok_or_else(|| {
                FixError::Message(format!("session {} is not journaled", session.key()))
            })
    }
}

/// Parses `34=<n>` out of an encoded frame without a full decode.
pub fn find_seq_no(frame: &[u8]) -> Result<u32, FixError> {
    let marker = b"\x0134=";
    let at = frame
        .windows(marker.len())
        .position(|window| window == marker)
        .ok_or_else(|| FixError::Message("frame has no MsgSeqNum".to_string()))?;

    let digits_start = at + marker.len();
    let digits_end = frame[digits_start..]
        .iter()
        .position(|&byte| byte == b'\x01')
        .map(|len| digits_start + len)
        .ok_or_else(|| FixError::Message("MsgSeqNum is not terminated".to_string()))?;

    std::str::from_utf8(&frame[digits_start..digits_end])
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| FixError::Message("MsgSeqNum is not a number".to_string()))
}
