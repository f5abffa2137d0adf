//! Log compaction.
//!
//! Compaction replaces the log with the shortest log that replays to the
//! same state: one transaction that recreates every bucket with its original
//! id and every item, committed under the current sequence number, followed
//! by a checkpoint carrying the id counters.

use crate::transaction::Snapshot;
use crate::types::TransactionId;
use crate::wal::WalRecord;

/// Builds the records of a compacted log for `snapshot`.
pub(crate) fn compaction_records(snapshot: &Snapshot, txid: TransactionId) -> Vec<WalRecord> {
    let directory = &snapshot.directory;
    let mut records = Vec::with_capacity(directory.len() + directory.item_count() + 3);
    records.push(WalRecord::Begin { txid });

    for (name, bucket) in directory.iter() {
        records.push(WalRecord::CreateBucket {
            txid,
            bucket_id: bucket.id(),
            name: name.clone(),
        });
        for (key, value) in bucket.items() {
            records.push(WalRecord::Put {
                txid,
                bucket: name.clone(),
                key: key.to_vec(),
                value: value.to_vec(),
            });
        }
    }

    records.push(WalRecord::Commit {
        txid,
        sequence: snapshot.sequence,
    });
    records.push(WalRecord::Checkpoint {
        sequence: snapshot.sequence,
        next_bucket_id: directory.next_bucket_id(),
        next_txid: txid.as_u64() + 1,
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{BucketDirectory, BucketName};
    use crate::types::SequenceNumber;

    #[test]
    fn records_recreate_every_bucket_and_item() {
        let mut directory = BucketDirectory::new();
        let a = BucketName::parse("a").unwrap();
        let b = BucketName::parse("b").unwrap();
        directory.create(a.clone()).unwrap();
        directory.create(b.clone()).unwrap();
        directory.put(&a, b"k1".to_vec(), b"1".to_vec()).unwrap();
        directory.put(&a, b"k2".to_vec(), b"2".to_vec()).unwrap();
        directory.delete(&b).unwrap();

        let snapshot = Snapshot {
            sequence: SequenceNumber::new(12),
            directory,
        };
        let records = compaction_records(&snapshot, TransactionId::new(30));

        assert_eq!(records.len(), 6);
        assert!(matches!(
            records[1],
            WalRecord::CreateBucket { ref name, .. } if name.as_str() == "a"
        ));
        assert_eq!(
            records[5],
            WalRecord::Checkpoint {
                sequence: SequenceNumber::new(12),
                next_bucket_id: 2,
                next_txid: 31,
            }
        );
    }
}
