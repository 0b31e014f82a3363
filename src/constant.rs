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

#![doc(hidden)]

pub const TAG_END: u8 = b'=';
pub const VALUE_END: u8 = b'\x01'; //SOH

pub const FIX_4_4_BEGIN_STRING: &[u8] = b"FIX.4.4";

//"8=FIX.4.4\x01" that every well formed frame must start with.
pub const FRAME_PREFIX: &[u8] = b"8=FIX.4.4\x01";

//"10=" plus exactly three digits plus SOH. FIX 4.4, Volume 2, page 9.
pub const CHECKSUM_FIELD_LEN: usize = 7;

pub const SENDING_TIME_FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";
pub const SENDING_TIME_FORMAT_NO_MILLIS: &str = "%Y%m%d-%H:%M:%S";
