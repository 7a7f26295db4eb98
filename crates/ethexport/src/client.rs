//! Unit-of-work interface to the blockchain extraction backend.
//!
//! The pipeline invokes extraction as in-process async calls against this
//! trait. Implementations own every RPC detail; the contract is only that
//! each call produces its declared output files at the given local paths or
//! fails with [`ExtractionError`].

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::prelude::*;
use std::fmt;
use std::path::Path;

use crate::error::{ExtractionError, MalformedSnafu};

/// Inclusive block range covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    /// Parse the `start,end` form written to the blocks_meta file.
    pub fn parse(text: &str) -> Result<Self, ExtractionError> {
        let trimmed = text.trim();
        let Some((start, end)) = trimmed.split_once(',') else {
            return MalformedSnafu {
                message: format!("block range '{trimmed}' is not 'start,end'"),
            }
            .fail();
        };
        let parse = |part: &str| {
            part.trim().parse::<u64>().ok().context(MalformedSnafu {
                message: format!("block number '{part}' is not an integer"),
            })
        };
        Ok(Self {
            start: parse(start)?,
            end: parse(end)?,
        })
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

/// Parameters for the blocks/transactions extraction.
#[derive(Debug)]
pub struct ExportBlocksAndTransactions<'a> {
    pub start_block: u64,
    pub end_block: u64,
    pub batch_size: usize,
    pub max_workers: usize,
    pub provider_uri: &'a str,
    pub blocks_output: &'a Path,
    pub transactions_output: &'a Path,
}

/// Parameters for the receipts/logs extraction.
#[derive(Debug)]
pub struct ExportReceiptsAndLogs<'a> {
    pub batch_size: usize,
    pub max_workers: usize,
    pub provider_uri: &'a str,
    pub transaction_hashes: &'a Path,
    pub receipts_output: &'a Path,
    pub logs_output: &'a Path,
}

/// Parameters for the contracts extraction.
#[derive(Debug)]
pub struct ExportContracts<'a> {
    pub batch_size: usize,
    pub max_workers: usize,
    pub provider_uri: &'a str,
    pub contract_addresses: &'a Path,
    pub output: &'a Path,
}

/// Parameters for the tokens extraction.
#[derive(Debug)]
pub struct ExportTokens<'a> {
    pub max_workers: usize,
    pub provider_uri: &'a str,
    pub token_addresses: &'a Path,
    pub output: &'a Path,
}

/// Parameters for token-transfer extraction from logs.
#[derive(Debug)]
pub struct ExtractTokenTransfers<'a> {
    pub batch_size: usize,
    pub max_workers: usize,
    pub logs: &'a Path,
    pub output: &'a Path,
}

/// Parameters for the traces extraction.
#[derive(Debug)]
pub struct ExportTraces<'a> {
    pub start_block: u64,
    pub end_block: u64,
    pub batch_size: usize,
    pub max_workers: usize,
    pub provider_uri: &'a str,
    /// Include synthetic genesis traces.
    pub genesis_traces: bool,
    /// Include synthetic DAO-fork traces.
    pub daofork_traces: bool,
    pub output: &'a Path,
}

/// The extraction backend the pipeline steps call into.
#[async_trait]
pub trait ExportClient: Send + Sync {
    /// Resolve the block range for `date` and write it to `output` in the
    /// `start,end` form.
    async fn block_range_for_date(
        &self,
        provider_uri: &str,
        date: NaiveDate,
        output: &Path,
    ) -> Result<(), ExtractionError>;

    async fn export_blocks_and_transactions(
        &self,
        request: ExportBlocksAndTransactions<'_>,
    ) -> Result<(), ExtractionError>;

    async fn export_receipts_and_logs(
        &self,
        request: ExportReceiptsAndLogs<'_>,
    ) -> Result<(), ExtractionError>;

    async fn export_contracts(
        &self,
        request: ExportContracts<'_>,
    ) -> Result<(), ExtractionError>;

    async fn export_tokens(&self, request: ExportTokens<'_>) -> Result<(), ExtractionError>;

    async fn extract_token_transfers(
        &self,
        request: ExtractTokenTransfers<'_>,
    ) -> Result<(), ExtractionError>;

    async fn export_traces(&self, request: ExportTraces<'_>) -> Result<(), ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_range_parses_start_end() {
        let range = BlockRange::parse("11916000,11922717\n").unwrap();
        assert_eq!(range.start, 11916000);
        assert_eq!(range.end, 11922717);
        assert_eq!(range.to_string(), "11916000,11922717");
    }

    #[test]
    fn block_range_rejects_missing_separator() {
        let err = BlockRange::parse("11916000").unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }

    #[test]
    fn block_range_rejects_non_numeric_parts() {
        let err = BlockRange::parse("start,end").unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }));
    }
}
