use crate::msg::Routing;
use crate::{CourierError, CourierResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

const SZ_FIELD_SIZE: usize = 4;
const API_KEY_FIELD_SIZE: usize = 2;
const API_VERSION_FIELD_SIZE: usize = 2;
const FLAGS_FIELD_SIZE: usize = 2;
const PARTITION_KEY_FIELD_SIZE: usize = 4;
const TOPIC_SZ_FIELD_SIZE: usize = 1;
const TS_FIELD_SIZE: usize = 8;
const KEY_SZ_FIELD_SIZE: usize = 4;
const VALUE_SZ_FIELD_SIZE: usize = 4;

// Everything except the three payloads and the optional partition key.
const FIXED_OVERHEAD: usize = SZ_FIELD_SIZE
    + API_KEY_FIELD_SIZE
    + API_VERSION_FIELD_SIZE
    + FLAGS_FIELD_SIZE
    + TOPIC_SZ_FIELD_SIZE
    + TS_FIELD_SIZE
    + KEY_SZ_FIELD_SIZE
    + VALUE_SZ_FIELD_SIZE;

/// API key of datagrams that let the daemon pick the partition.
pub const API_KEY_ANY_PARTITION: i16 = 256;
/// API key of datagrams that pin the partition through a client-chosen key.
pub const API_KEY_PARTITION_KEY: i16 = 257;
/// The only supported version of the submission layout.
pub const API_VERSION: i16 = 0;

/// Maximum topic length; the topic length travels in a single unsigned byte.
pub const MAX_TOPIC_SIZE: usize = u8::MAX as usize;
/// Maximum key length such that the key fits a datagram whose total size
/// field is a signed 32-bit integer.
pub const MAX_KEY_SIZE: usize = i32::MAX as usize - FIXED_OVERHEAD;
/// Maximum value length, same bound as for keys.
pub const MAX_VALUE_SIZE: usize = i32::MAX as usize - FIXED_OVERHEAD;

/// Reasons for rejecting an input datagram.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The buffer ends before the fixed header is complete.
    #[error("Datagram is shorter than its fixed header")]
    Truncated,

    /// The size field does not match the number of bytes received.
    #[error("Size field says {declared} but the datagram has {actual} bytes")]
    SizeMismatch {
        /// Value of the size field.
        declared: i32,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// The API key names no supported datagram kind.
    #[error("Unsupported API key {}", _0)]
    BadApiKey(i16),

    /// The API version is not the one this decoder speaks.
    #[error("Unsupported API version {}", _0)]
    BadApiVersion(i16),

    /// The key length field is negative.
    #[error("Key length {} is negative", _0)]
    NegativeKeyLength(i32),

    /// The value length field is negative.
    #[error("Value length {} is negative", _0)]
    NegativeValueLength(i32),

    /// The declared field lengths do not add up to the declared total size.
    #[error("Declared field lengths are inconsistent with the datagram size")]
    LengthMismatch,
}

/// One producer-submitted message in its wire form.
///
/// All payloads are borrowed: [`Submission::parse`] returns a view into the
/// received buffer, and [`Submission::emit`] writes the identical byte
/// layout, so a round trip is bit-exact. All multi-byte integers are
/// big-endian; the total-size field includes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission<'a> {
    /// How the daemon should choose the partition.
    pub routing: Routing,
    /// Client-supplied creation timestamp; opaque to the daemon.
    pub timestamp: i64,
    /// Topic the message is addressed to; at most [`MAX_TOPIC_SIZE`] bytes.
    pub topic: &'a [u8],
    /// Message key; may be empty.
    pub key: &'a [u8],
    /// Message value; may be empty.
    pub value: &'a [u8],
}

impl<'a> Submission<'a> {
    /// Verifies that all payloads fit their wire fields and that the whole
    /// datagram fits the signed 32-bit size field.
    ///
    /// `emit` and `wire_size` clamp instead of failing; callers that want an
    /// explicit error for oversized input check here first.
    pub fn check_sizes(&self) -> CourierResult<()> {
        if self.topic.len() > MAX_TOPIC_SIZE {
            return Err(CourierError::OversizedInput {
                field: "topic",
                len: self.topic.len(),
                max: MAX_TOPIC_SIZE,
            });
        }
        if self.key.len() > MAX_KEY_SIZE {
            return Err(CourierError::OversizedInput {
                field: "key",
                len: self.key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        if self.value.len() > MAX_VALUE_SIZE {
            return Err(CourierError::OversizedInput {
                field: "value",
                len: self.value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        let total = fixed_overhead(self.routing)
            + self.topic.len()
            + self.key.len()
            + self.value.len();
        if total > i32::MAX as usize {
            return Err(CourierError::OversizedInput {
                field: "datagram",
                len: total,
                max: i32::MAX as usize,
            });
        }
        Ok(())
    }

    /// Exact number of bytes `emit` will write.
    ///
    /// Oversized payloads are counted at their clamped length.
    pub fn wire_size(&self) -> usize {
        fixed_overhead(self.routing)
            + clamp_len(self.topic.len(), MAX_TOPIC_SIZE, "topic")
            + clamp_len(self.key.len(), MAX_KEY_SIZE, "key")
            + clamp_len(self.value.len(), MAX_VALUE_SIZE, "value")
    }

    /// Writes the datagram and returns the number of bytes written, which
    /// equals [`Submission::wire_size`].
    ///
    /// Payloads beyond their field maximum are truncated to the maximum, so
    /// the emitted bytes are always self-consistent. Empty key and value are
    /// legal and occupy only their length fields.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_possible_wrap)]
    pub fn emit(&self, w: &mut dyn std::io::Write) -> CourierResult<usize> {
        let topic = &self.topic[..clamp_len(self.topic.len(), MAX_TOPIC_SIZE, "topic")];
        let key = &self.key[..clamp_len(self.key.len(), MAX_KEY_SIZE, "key")];
        let value = &self.value[..clamp_len(self.value.len(), MAX_VALUE_SIZE, "value")];
        let dg_size = fixed_overhead(self.routing) + topic.len() + key.len() + value.len();

        w.write_i32::<BigEndian>(dg_size as i32)?; // I4, includes itself
        match self.routing {
            Routing::AnyPartition => {
                w.write_i16::<BigEndian>(API_KEY_ANY_PARTITION)?; // I2
                w.write_i16::<BigEndian>(API_VERSION)?; // I2
                w.write_i16::<BigEndian>(0)?; // I2 flags
            }
            Routing::PartitionKey(partition_key) => {
                w.write_i16::<BigEndian>(API_KEY_PARTITION_KEY)?; // I2
                w.write_i16::<BigEndian>(API_VERSION)?; // I2
                w.write_i16::<BigEndian>(0)?; // I2 flags
                w.write_i32::<BigEndian>(partition_key)?; // I4
            }
        }
        w.write_u8(topic.len() as u8)?; // I1
        w.write_all(topic)?;
        w.write_i64::<BigEndian>(self.timestamp)?; // I8
        w.write_i32::<BigEndian>(key.len() as i32)?; // I4
        w.write_all(key)?;
        w.write_i32::<BigEndian>(value.len() as i32)?; // I4
        w.write_all(value)?;
        Ok(dg_size)
    }

    /// Decodes exactly one datagram that starts at the beginning of `buf`
    /// and spans all of it.
    ///
    /// The returned payloads borrow from `buf`; nothing is copied.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn parse(buf: &'a [u8]) -> Result<Submission<'a>, DecodeError> {
        let mut rdr = std::io::Cursor::new(buf);
        let declared = rdr
            .read_i32::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        if declared < 0 || declared as usize != buf.len() {
            return Err(DecodeError::SizeMismatch {
                declared,
                actual: buf.len(),
            });
        }
        let api_key = rdr
            .read_i16::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        let keyed_routing = match api_key {
            API_KEY_ANY_PARTITION => false,
            API_KEY_PARTITION_KEY => true,
            other => return Err(DecodeError::BadApiKey(other)),
        };
        let api_version = rdr
            .read_i16::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        if api_version != API_VERSION {
            return Err(DecodeError::BadApiVersion(api_version));
        }
        let _flags = rdr
            .read_i16::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        let routing = if keyed_routing {
            Routing::PartitionKey(
                rdr.read_i32::<BigEndian>()
                    .map_err(|_| DecodeError::Truncated)?,
            )
        } else {
            Routing::AnyPartition
        };

        let topic_size = rdr.read_u8().map_err(|_| DecodeError::Truncated)? as usize;
        let topic = take_payload(buf, &mut rdr, topic_size)?;
        let timestamp = rdr
            .read_i64::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        let key_size = rdr
            .read_i32::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        if key_size < 0 {
            return Err(DecodeError::NegativeKeyLength(key_size));
        }
        let key = take_payload(buf, &mut rdr, key_size as usize)?;
        let value_size = rdr
            .read_i32::<BigEndian>()
            .map_err(|_| DecodeError::Truncated)?;
        if value_size < 0 {
            return Err(DecodeError::NegativeValueLength(value_size));
        }
        let value = take_payload(buf, &mut rdr, value_size as usize)?;

        // Everything after the fixed header was length-prefixed; the declared
        // lengths must consume the buffer exactly.
        if rdr.position() as usize != buf.len() {
            return Err(DecodeError::LengthMismatch);
        }
        Ok(Submission {
            routing,
            timestamp,
            topic,
            key,
            value,
        })
    }
}

/// Exact on-wire size of an any-partition datagram with the given payload
/// sizes.
///
/// Sizes exceeding the wire maxima are clamped to the maximum; debug builds
/// treat such a call as a programmer error and assert.
pub fn predict_size(topic_size: usize, key_size: usize, value_size: usize) -> usize {
    FIXED_OVERHEAD
        + clamp_len(topic_size, MAX_TOPIC_SIZE, "topic")
        + clamp_len(key_size, MAX_KEY_SIZE, "key")
        + clamp_len(value_size, MAX_VALUE_SIZE, "value")
}

/// Exact on-wire size of a partition-key datagram with the given payload
/// sizes, with the same clamping behavior as [`predict_size`].
pub fn predict_size_partition_key(topic_size: usize, key_size: usize, value_size: usize) -> usize {
    predict_size(topic_size, key_size, value_size) + PARTITION_KEY_FIELD_SIZE
}

fn fixed_overhead(routing: Routing) -> usize {
    match routing {
        Routing::AnyPartition => FIXED_OVERHEAD,
        Routing::PartitionKey(_) => FIXED_OVERHEAD + PARTITION_KEY_FIELD_SIZE,
    }
}

fn clamp_len(len: usize, max: usize, what: &'static str) -> usize {
    debug_assert!(len <= max, "{what} length {len} exceeds wire maximum {max}");
    len.min(max)
}

#[allow(clippy::cast_possible_truncation)]
fn take_payload<'a>(
    buf: &'a [u8],
    rdr: &mut std::io::Cursor<&'a [u8]>,
    len: usize,
) -> Result<&'a [u8], DecodeError> {
    let start = rdr.position() as usize;
    let end = start.checked_add(len).ok_or(DecodeError::LengthMismatch)?;
    if end > buf.len() {
        return Err(DecodeError::LengthMismatch);
    }
    rdr.set_position(end as u64);
    Ok(&buf[start..end])
}
