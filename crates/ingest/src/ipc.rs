//! Arrow IPC buffer decoding.
//!
//! Both framings are decoded with [`StreamDecoder`] over one shared
//! [`Buffer`]: message and body lengths declared in the buffer are sliced
//! from the bytes that are present, never allocated up front. A file is read
//! through the stream section between its leading magic and its footer.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use arrow::buffer::Buffer;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::ipc::reader::{read_footer_length, StreamDecoder};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use forecast_core::{Error, Result};

/// Leading magic of the Arrow IPC file format.
pub const ARROW_FILE_MAGIC: &[u8; 6] = b"ARROW1";

/// Magic plus padding before the first message of a file.
const FILE_HEADER_LEN: usize = 8;

/// Footer length plus trailing magic at the end of a file.
const TRAILER_LEN: usize = 10;

/// IPC framing detected from the buffer header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcFormat {
    /// Random-access file format (`ARROW1` magic, footer).
    File,
    /// Streaming format (schema message followed by batches).
    Stream,
}

impl IpcFormat {
    pub fn detect(buffer: &[u8]) -> Self {
        if buffer.starts_with(ARROW_FILE_MAGIC) {
            Self::File
        } else {
            Self::Stream
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Stream => "stream",
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

/// Run one decode step, turning a panic inside the IPC reader into an error.
fn guarded<T>(step: impl FnOnce() -> std::result::Result<T, ArrowError>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result.map_err(Error::decode),
        Err(payload) => Err(Error::decode(format!(
            "malformed IPC message: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Record batches decoded lazily from an in-memory IPC buffer.
///
/// The schema message is read eagerly by [`open`]; batches follow on
/// iteration. The first error ends the iteration.
pub struct IpcBatches {
    decoder: StreamDecoder,
    remaining: Buffer,
    schema: SchemaRef,
    format: IpcFormat,
    pending: Option<RecordBatch>,
    done: bool,
}

impl IpcBatches {
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn format(&self) -> IpcFormat {
        self.format
    }
}

/// Decode the next batch, or `None` at end of stream.
fn decode_step(decoder: &mut StreamDecoder, remaining: &mut Buffer) -> Result<Option<RecordBatch>> {
    if let Some(batch) = guarded(|| decoder.decode(remaining))? {
        return Ok(Some(batch));
    }
    // The stream ended, or the buffer ran out part-way through a message.
    guarded(|| decoder.finish())?;
    Ok(None)
}

impl Iterator for IpcBatches {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(batch) = self.pending.take() {
            return Some(Ok(batch));
        }
        if self.done {
            return None;
        }

        match decode_step(&mut self.decoder, &mut self.remaining) {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Bytes of a file's stream section, between the leading magic and the
/// footer.
fn file_messages(buffer: &Bytes) -> Result<Bytes> {
    let too_short = || Error::decode("buffer too short for an Arrow IPC file");

    let trailer_at = buffer.len().checked_sub(TRAILER_LEN).ok_or_else(too_short)?;
    let trailer: [u8; TRAILER_LEN] = buffer[trailer_at..]
        .try_into()
        .map_err(|_| too_short())?;
    let footer_len = read_footer_length(trailer).map_err(Error::decode)?;

    let end = trailer_at
        .checked_sub(footer_len)
        .filter(|end| *end >= FILE_HEADER_LEN)
        .ok_or_else(|| {
            Error::decode(format!(
                "file footer declares {footer_len} bytes, buffer holds {}",
                buffer.len()
            ))
        })?;
    Ok(buffer.slice(FILE_HEADER_LEN..end))
}

/// Open an in-memory IPC buffer and read its schema.
///
/// The buffer is shared, not copied.
pub fn open(buffer: &Bytes) -> Result<IpcBatches> {
    let format = IpcFormat::detect(buffer);
    let messages = match format {
        IpcFormat::File => file_messages(buffer)?,
        IpcFormat::Stream => buffer.clone(),
    };

    let mut decoder = StreamDecoder::new();
    let mut remaining = Buffer::from(messages);
    let pending = decode_step(&mut decoder, &mut remaining)?;
    let schema = decoder
        .schema()
        .ok_or_else(|| Error::decode(format!("Arrow IPC {} holds no schema", format.as_str())))?;

    Ok(IpcBatches {
        done: pending.is_none(),
        decoder,
        remaining,
        schema,
        format,
        pending,
    })
}
