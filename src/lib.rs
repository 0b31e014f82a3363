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

//! A FIX 4.4 client/server engine.
//!
//! The crate splits into four layers. [`message`] and [`codec`] hold the
//! tag/value containers and the wire framing. [`schema`] validates messages
//! against a QuickFIX-dialect dictionary. [`engine`] runs the session state
//! machine (logon, heartbeats, resend recovery, logout) over any async byte
//! stream, journaling every frame through [`journal`]. [`order`] tracks the
//! client-side lifecycle of single orders on top of all that.
//!
//! The transport is deliberately not part of the crate: anything that
//! implements `AsyncRead + AsyncWrite` can carry a session, a plain
//! `tokio::net::TcpStream` being the usual choice.

pub mod codec;
pub mod constant;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod field_tag;
pub mod journal;
pub mod message;
pub mod order;
pub mod profile;
pub mod schema;
pub mod session;

pub use codec::{Codec, Decoded, DecodedFrame};
pub use engine::{Application, ConnectionRole, ConnectionState, FixConnection, SessionConfig};
pub use error::FixError;
pub use field_tag::FieldTag;
pub use journal::{Direction, FileStore, Journal, MemoryStore};
pub use message::{FieldMap, FieldValue, FixMessage};
pub use order::OrderSingle;
pub use profile::Fix44Profile;
pub use schema::{FixSchema, XmlElem};
pub use session::{SeqNumStatus, Session};
