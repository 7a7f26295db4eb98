//! Artifact kinds and date-partitioned export paths.
//!
//! Every artifact a step publishes is addressed by its kind and the logical
//! date of the run. The layout `export/<kind>/block_date=<YYYY-MM-DD>/` is
//! the wire contract between steps: a consumer locates an upstream artifact
//! by resolving the same path its producer resolved, with no shared state in
//! between. Re-running a date resolves the identical path, which is what
//! makes backfills safe overwrites.

use chrono::NaiveDate;
use std::fmt;

/// A class of export artifact.
///
/// Each kind is produced by exactly one pipeline step and stored under its
/// own partition per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    BlocksMeta,
    Blocks,
    Transactions,
    Receipts,
    Logs,
    Contracts,
    Tokens,
    TokenTransfers,
    Traces,
}

impl ArtifactKind {
    /// All known artifact kinds.
    pub const ALL: [ArtifactKind; 9] = [
        ArtifactKind::BlocksMeta,
        ArtifactKind::Blocks,
        ArtifactKind::Transactions,
        ArtifactKind::Receipts,
        ArtifactKind::Logs,
        ArtifactKind::Contracts,
        ArtifactKind::Tokens,
        ArtifactKind::TokenTransfers,
        ArtifactKind::Traces,
    ];

    /// Directory segment under `export/`.
    pub fn dir(self) -> &'static str {
        match self {
            ArtifactKind::BlocksMeta => "blocks_meta",
            ArtifactKind::Blocks => "blocks",
            ArtifactKind::Transactions => "transactions",
            ArtifactKind::Receipts => "receipts",
            ArtifactKind::Logs => "logs",
            ArtifactKind::Contracts => "contracts",
            ArtifactKind::Tokens => "tokens",
            ArtifactKind::TokenTransfers => "token_transfers",
            ArtifactKind::Traces => "traces",
        }
    }

    /// Canonical file name exchanged between steps for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::BlocksMeta => "blocks_meta.txt",
            ArtifactKind::Blocks => "blocks.csv",
            ArtifactKind::Transactions => "transactions.csv",
            ArtifactKind::Receipts => "receipts.csv",
            ArtifactKind::Logs => "logs.json",
            ArtifactKind::Contracts => "contracts.json",
            ArtifactKind::Tokens => "tokens.csv",
            ArtifactKind::TokenTransfers => "token_transfers.csv",
            ArtifactKind::Traces => "traces.csv",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Resolve the partition prefix for one (kind, date) pair.
///
/// Pure and total: identical inputs always yield the identical prefix, and
/// distinct inputs never collide.
pub fn partition_path(kind: ArtifactKind, date: NaiveDate) -> String {
    format!("export/{}/block_date={}/", kind.dir(), date.format("%Y-%m-%d"))
}

/// Full object path for a kind's canonical file in its partition.
pub fn object_path(kind: ArtifactKind, date: NaiveDate) -> String {
    format!("{}{}", partition_path(kind, date), kind.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn partition_path_layout() {
        assert_eq!(
            partition_path(ArtifactKind::Blocks, date(2021, 3, 1)),
            "export/blocks/block_date=2021-03-01/"
        );
        assert_eq!(
            object_path(ArtifactKind::Transactions, date(2021, 3, 1)),
            "export/transactions/block_date=2021-03-01/transactions.csv"
        );
    }

    #[test]
    fn partition_path_is_deterministic() {
        for kind in ArtifactKind::ALL {
            let d = date(2018, 11, 30);
            assert_eq!(partition_path(kind, d), partition_path(kind, d));
        }
    }

    #[test]
    fn partition_path_is_injective() {
        let dates = [date(2015, 7, 30), date(2021, 3, 1), date(2021, 3, 2)];
        let mut seen = HashSet::new();
        for kind in ArtifactKind::ALL {
            for d in dates {
                assert!(
                    seen.insert(partition_path(kind, d)),
                    "colliding partition path for {kind} {d}"
                );
            }
        }
        assert_eq!(seen.len(), ArtifactKind::ALL.len() * dates.len());
    }

    #[test]
    fn single_digit_fields_are_zero_padded() {
        assert_eq!(
            partition_path(ArtifactKind::Traces, date(2016, 1, 9)),
            "export/traces/block_date=2016-01-09/"
        );
    }
}
