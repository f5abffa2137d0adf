//! Rebuilding committed state from the log.

use crate::bucket::BucketDirectory;
use crate::error::{CoreError, CoreResult};
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::record::WalRecord;
use crate::wal::writer::WalManager;
use tracing::{debug, warn};

/// What replaying the log produced.
#[derive(Debug)]
pub(crate) struct RecoveredState {
    pub(crate) directory: BucketDirectory,
    pub(crate) sequence: SequenceNumber,
    pub(crate) next_txid: u64,
    pub(crate) transactions: u64,
    /// Bytes cut from the end of the log.
    pub(crate) discarded_bytes: u64,
}

struct PendingTxn {
    txid: TransactionId,
    ops: Vec<(u64, WalRecord)>,
}

/// Replays committed transactions and cuts off any incomplete tail.
pub(crate) fn recover(wal: &WalManager) -> CoreResult<RecoveredState> {
    let mut directory = BucketDirectory::new();
    let mut sequence = SequenceNumber::default();
    let mut next_txid = 1u64;
    let mut transactions = 0u64;
    let mut pending: Option<PendingTxn> = None;
    let mut committed_end = 0u64;

    let mut iter = wal.iter()?;
    while let Some(item) = iter.next() {
        let (offset, record) = item?;
        if let Some(txid) = record.txid() {
            next_txid = next_txid.max(txid.as_u64() + 1);
        }

        match record {
            WalRecord::Begin { txid } => {
                if let Some(abandoned) = pending.take() {
                    warn!(txid = %abandoned.txid, offset, "discarding transaction without commit");
                }
                pending = Some(PendingTxn {
                    txid,
                    ops: Vec::new(),
                });
            }
            WalRecord::Commit {
                txid,
                sequence: committed,
            } => {
                let txn = pending
                    .take()
                    .filter(|p| p.txid == txid)
                    .ok_or_else(|| {
                        CoreError::log_corruption(offset, format!("commit for unknown {txid}"))
                    })?;
                if committed < sequence {
                    return Err(CoreError::log_corruption(
                        offset,
                        format!("{committed} goes back from {sequence}"),
                    ));
                }
                for (op_offset, op) in txn.ops {
                    apply(&mut directory, op_offset, op)?;
                }
                sequence = committed;
                transactions += 1;
                committed_end = iter.position();
            }
            WalRecord::Checkpoint {
                sequence: checkpoint,
                next_bucket_id,
                next_txid: checkpoint_txid,
            } => {
                if pending.is_some() {
                    return Err(CoreError::log_corruption(
                        offset,
                        "checkpoint inside a transaction",
                    ));
                }
                directory.reserve_bucket_ids(next_bucket_id);
                next_txid = next_txid.max(checkpoint_txid);
                sequence = sequence.max(checkpoint);
                committed_end = iter.position();
            }
            op => match pending.as_mut() {
                Some(txn) if op.txid() == Some(txn.txid) => txn.ops.push((offset, op)),
                _ => {
                    return Err(CoreError::log_corruption(
                        offset,
                        "mutation outside its transaction",
                    ))
                }
            },
        }
    }

    let total_size = iter.total_size();
    let torn = iter.torn_tail();
    drop(iter);

    let discarded_bytes = total_size - committed_end;
    if discarded_bytes > 0 {
        warn!(
            offset = committed_end,
            discarded_bytes,
            torn,
            "truncating incomplete tail of the log"
        );
        wal.truncate(committed_end)?;
    }

    debug!(transactions, %sequence, buckets = directory.len(), "log replayed");
    Ok(RecoveredState {
        directory,
        sequence,
        next_txid,
        transactions,
        discarded_bytes,
    })
}

fn apply(directory: &mut BucketDirectory, offset: u64, op: WalRecord) -> CoreResult<()> {
    let result = match op {
        WalRecord::CreateBucket {
            bucket_id, name, ..
        } => directory.create_with_id(name, bucket_id),
        WalRecord::DeleteBucket { name, .. } => directory.delete(&name),
        WalRecord::Put {
            bucket, key, value, ..
        } => directory.put(&bucket, key, value),
        WalRecord::Delete { bucket, key, .. } => directory.delete_key(&bucket, &key),
        other => {
            return Err(CoreError::log_corruption(
                offset,
                format!("unexpected {:?} record", other.record_type()),
            ))
        }
    };
    result.map_err(|e| CoreError::log_corruption(offset, format!("replay failed: {e}")))
}
