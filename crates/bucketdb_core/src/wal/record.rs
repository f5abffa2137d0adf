//! Log record types and serialization.

use crate::bucket::BucketName;
use crate::error::{CoreError, CoreResult};
use crate::types::{BucketId, SequenceNumber, TransactionId};

/// Magic bytes opening every record.
pub(crate) const WAL_MAGIC: [u8; 4] = *b"BKVL";

/// Current record format version.
pub(crate) const WAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub(crate) const HEADER_SIZE: usize = 11;

/// Trailing checksum.
pub(crate) const CRC_SIZE: usize = 4;

/// Type byte of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum WalRecordType {
    Begin = 1,
    CreateBucket = 2,
    DeleteBucket = 3,
    Put = 4,
    Delete = 5,
    Commit = 6,
    Checkpoint = 7,
}

impl WalRecordType {
    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::CreateBucket),
            3 => Some(Self::DeleteBucket),
            4 => Some(Self::Put),
            5 => Some(Self::Delete),
            6 => Some(Self::Commit),
            7 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    pub(crate) const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One entry in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WalRecord {
    Begin {
        txid: TransactionId,
    },
    CreateBucket {
        txid: TransactionId,
        bucket_id: BucketId,
        name: BucketName,
    },
    DeleteBucket {
        txid: TransactionId,
        name: BucketName,
    },
    Put {
        txid: TransactionId,
        bucket: BucketName,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        txid: TransactionId,
        bucket: BucketName,
        key: Vec<u8>,
    },
    Commit {
        txid: TransactionId,
        sequence: SequenceNumber,
    },
    /// Counters that must survive compaction.
    Checkpoint {
        sequence: SequenceNumber,
        next_bucket_id: u64,
        next_txid: u64,
    },
}

impl WalRecord {
    pub(crate) fn record_type(&self) -> WalRecordType {
        match self {
            Self::Begin { .. } => WalRecordType::Begin,
            Self::CreateBucket { .. } => WalRecordType::CreateBucket,
            Self::DeleteBucket { .. } => WalRecordType::DeleteBucket,
            Self::Put { .. } => WalRecordType::Put,
            Self::Delete { .. } => WalRecordType::Delete,
            Self::Commit { .. } => WalRecordType::Commit,
            Self::Checkpoint { .. } => WalRecordType::Checkpoint,
        }
    }

    pub(crate) fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Begin { txid }
            | Self::CreateBucket { txid, .. }
            | Self::DeleteBucket { txid, .. }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => Some(*txid),
            Self::Checkpoint { .. } => None,
        }
    }

    pub(crate) fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut w = PayloadWriter::default();
        match self {
            Self::Begin { txid } => w.u64(txid.as_u64()),
            Self::CreateBucket {
                txid,
                bucket_id,
                name,
            } => {
                w.u64(txid.as_u64());
                w.u64(bucket_id.as_u64());
                w.bytes(name.as_bytes())?;
            }
            Self::DeleteBucket { txid, name } => {
                w.u64(txid.as_u64());
                w.bytes(name.as_bytes())?;
            }
            Self::Put {
                txid,
                bucket,
                key,
                value,
            } => {
                w.u64(txid.as_u64());
                w.bytes(bucket.as_bytes())?;
                w.bytes(key)?;
                w.bytes(value)?;
            }
            Self::Delete { txid, bucket, key } => {
                w.u64(txid.as_u64());
                w.bytes(bucket.as_bytes())?;
                w.bytes(key)?;
            }
            Self::Commit { txid, sequence } => {
                w.u64(txid.as_u64());
                w.u64(sequence.as_u64());
            }
            Self::Checkpoint {
                sequence,
                next_bucket_id,
                next_txid,
            } => {
                w.u64(sequence.as_u64());
                w.u64(*next_bucket_id);
                w.u64(*next_txid);
            }
        }
        Ok(w.finish())
    }

    /// Parses a payload. `offset` is only used for error reporting.
    pub(crate) fn decode_payload(
        record_type: WalRecordType,
        payload: &[u8],
        offset: u64,
    ) -> CoreResult<Self> {
        let mut r = PayloadReader::new(payload, offset);
        let record = match record_type {
            WalRecordType::Begin => Self::Begin {
                txid: TransactionId::new(r.u64()?),
            },
            WalRecordType::CreateBucket => Self::CreateBucket {
                txid: TransactionId::new(r.u64()?),
                bucket_id: BucketId::new(r.u64()?),
                name: r.bucket_name()?,
            },
            WalRecordType::DeleteBucket => Self::DeleteBucket {
                txid: TransactionId::new(r.u64()?),
                name: r.bucket_name()?,
            },
            WalRecordType::Put => Self::Put {
                txid: TransactionId::new(r.u64()?),
                bucket: r.bucket_name()?,
                key: r.bytes()?.to_vec(),
                value: r.bytes()?.to_vec(),
            },
            WalRecordType::Delete => Self::Delete {
                txid: TransactionId::new(r.u64()?),
                bucket: r.bucket_name()?,
                key: r.bytes()?.to_vec(),
            },
            WalRecordType::Commit => Self::Commit {
                txid: TransactionId::new(r.u64()?),
                sequence: SequenceNumber::new(r.u64()?),
            },
            WalRecordType::Checkpoint => Self::Checkpoint {
                sequence: SequenceNumber::new(r.u64()?),
                next_bucket_id: r.u64()?,
                next_txid: r.u64()?,
            },
        };
        r.finish(record_type)?;
        Ok(record)
    }

    /// Wraps the payload in the record envelope.
    pub(crate) fn encode_frame(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len()).map_err(|_| CoreError::ValueTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&WAL_MAGIC);
        frame.extend_from_slice(&WAL_VERSION.to_le_bytes());
        frame.push(self.record_type().as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

/// Frames a batch of records into one contiguous buffer.
pub(crate) fn encode_records(records: &[WalRecord]) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    for record in records {
        buf.extend_from_slice(&record.encode_frame()?);
    }
    Ok(buf)
}

#[derive(Default)]
struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, data: &[u8]) -> CoreResult<()> {
        let len = u32::try_from(data.len()).map_err(|_| CoreError::ValueTooLarge {
            len: data.len(),
            max: u32::MAX as usize,
        })?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

struct PayloadReader<'a> {
    payload: &'a [u8],
    cursor: usize,
    offset: u64,
}

impl<'a> PayloadReader<'a> {
    fn new(payload: &'a [u8], offset: u64) -> Self {
        Self {
            payload,
            cursor: 0,
            offset,
        }
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(n)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| CoreError::log_corruption(self.offset, "unexpected end of payload"))?;
        let slice = &self.payload[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn bytes(&mut self) -> CoreResult<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn bucket_name(&mut self) -> CoreResult<BucketName> {
        let offset = self.offset;
        let raw = std::str::from_utf8(self.bytes()?)
            .map_err(|_| CoreError::log_corruption(offset, "bucket name is not UTF-8"))?;
        BucketName::parse(raw)
            .map_err(|_| CoreError::log_corruption(offset, "blank bucket name"))
    }

    fn finish(self, record_type: WalRecordType) -> CoreResult<()> {
        if self.cursor != self.payload.len() {
            return Err(CoreError::log_corruption(
                self.offset,
                format!(
                    "trailing bytes in {record_type:?} record: expected {} bytes, got {}",
                    self.cursor,
                    self.payload.len()
                ),
            ));
        }
        Ok(())
    }
}
