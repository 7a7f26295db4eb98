//! Step bodies.
//!
//! Each body is the sub-operation sequence for one step: fetch upstream
//! artifacts into the workspace, transform and extract against local paths,
//! then publish. Publishing is last; any earlier failure leaves the
//! partition untouched.

use chrono::NaiveDate;
use snafu::prelude::*;

use ethexport_core::StagingWorkspace;
use ethexport_core::partition::ArtifactKind;

use crate::client::{
    BlockRange, ExportBlocksAndTransactions, ExportContracts, ExportReceiptsAndLogs,
    ExportTokens, ExportTraces, ExtractTokenTransfers,
};
use crate::error::{BlockRangeReadSnafu, StepError};
use crate::steps::StepContext;
use crate::transform;

/// Resolve the day's block range into the workspace and parse it back.
async fn resolve_block_range(
    ctx: &StepContext,
    workspace: &StagingWorkspace,
    provider_uri: &str,
    date: NaiveDate,
) -> Result<BlockRange, StepError> {
    let meta = workspace.file(ArtifactKind::BlocksMeta.file_name());
    ctx.client
        .block_range_for_date(provider_uri, date, &meta)
        .await?;
    let text = tokio::fs::read_to_string(&meta)
        .await
        .context(BlockRangeReadSnafu)?;
    Ok(BlockRange::parse(&text)?)
}

pub(super) async fn blocks_and_transactions(
    ctx: &StepContext,
    date: NaiveDate,
) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;
    let range = resolve_block_range(ctx, &workspace, &ctx.settings.provider_uri, date).await?;

    let blocks = workspace.file(ArtifactKind::Blocks.file_name());
    let transactions = workspace.file(ArtifactKind::Transactions.file_name());
    ctx.client
        .export_blocks_and_transactions(ExportBlocksAndTransactions {
            start_block: range.start,
            end_block: range.end,
            batch_size: ctx.settings.batch_size,
            max_workers: ctx.settings.max_workers,
            provider_uri: &ctx.settings.provider_uri,
            blocks_output: &blocks,
            transactions_output: &transactions,
        })
        .await?;

    let meta = workspace.file(ArtifactKind::BlocksMeta.file_name());
    ctx.transfer
        .publish(&meta, ArtifactKind::BlocksMeta, date)
        .await?;
    ctx.transfer
        .publish(&blocks, ArtifactKind::Blocks, date)
        .await?;
    ctx.transfer
        .publish(&transactions, ArtifactKind::Transactions, date)
        .await?;
    Ok(())
}

pub(super) async fn receipts_and_logs(ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;

    let transactions = workspace.file(ArtifactKind::Transactions.file_name());
    ctx.transfer
        .fetch(ArtifactKind::Transactions, date, &transactions)
        .await?;

    let hashes = workspace.file("transaction_hashes.txt");
    transform::extract_csv_column(&transactions, &hashes, "hash")?;

    let receipts = workspace.file(ArtifactKind::Receipts.file_name());
    let logs = workspace.file(ArtifactKind::Logs.file_name());
    ctx.client
        .export_receipts_and_logs(ExportReceiptsAndLogs {
            batch_size: ctx.settings.batch_size,
            max_workers: ctx.settings.max_workers,
            provider_uri: &ctx.settings.provider_uri,
            transaction_hashes: &hashes,
            receipts_output: &receipts,
            logs_output: &logs,
        })
        .await?;

    ctx.transfer
        .publish(&receipts, ArtifactKind::Receipts, date)
        .await?;
    ctx.transfer.publish(&logs, ArtifactKind::Logs, date).await?;
    Ok(())
}

pub(super) async fn contracts(ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;

    let receipts = workspace.file(ArtifactKind::Receipts.file_name());
    ctx.transfer
        .fetch(ArtifactKind::Receipts, date, &receipts)
        .await?;

    let addresses = workspace.file("contract_addresses.txt");
    transform::extract_csv_column(&receipts, &addresses, "contract_address")?;

    let contracts = workspace.file(ArtifactKind::Contracts.file_name());
    ctx.client
        .export_contracts(ExportContracts {
            batch_size: ctx.settings.batch_size,
            max_workers: ctx.settings.max_workers,
            provider_uri: &ctx.settings.provider_uri,
            contract_addresses: &addresses,
            output: &contracts,
        })
        .await?;

    ctx.transfer
        .publish(&contracts, ArtifactKind::Contracts, date)
        .await?;
    Ok(())
}

pub(super) async fn tokens(ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;

    let contracts = workspace.file(ArtifactKind::Contracts.file_name());
    ctx.transfer
        .fetch(ArtifactKind::Contracts, date, &contracts)
        .await?;

    let token_contracts = workspace.file("token_contracts.json");
    transform::filter_json_lines(&contracts, &token_contracts, transform::is_token_contract)?;

    let addresses = workspace.file("token_addresses.txt");
    transform::extract_json_field(&token_contracts, &addresses, "address")?;

    let tokens = workspace.file(ArtifactKind::Tokens.file_name());
    ctx.client
        .export_tokens(ExportTokens {
            max_workers: ctx.settings.max_workers,
            provider_uri: &ctx.settings.provider_uri,
            token_addresses: &addresses,
            output: &tokens,
        })
        .await?;

    ctx.transfer
        .publish(&tokens, ArtifactKind::Tokens, date)
        .await?;
    Ok(())
}

pub(super) async fn token_transfers(ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;

    let logs = workspace.file(ArtifactKind::Logs.file_name());
    ctx.transfer.fetch(ArtifactKind::Logs, date, &logs).await?;

    let transfers = workspace.file(ArtifactKind::TokenTransfers.file_name());
    ctx.client
        .extract_token_transfers(ExtractTokenTransfers {
            batch_size: ctx.settings.batch_size,
            max_workers: ctx.settings.max_workers,
            logs: &logs,
            output: &transfers,
        })
        .await?;

    ctx.transfer
        .publish(&transfers, ArtifactKind::TokenTransfers, date)
        .await?;
    Ok(())
}

pub(super) async fn traces(ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    let workspace = ctx.acquire_workspace()?;
    // Traces resolve their own range against the archival endpoint and do
    // not publish blocks_meta; that belongs to the blocks step.
    let range =
        resolve_block_range(ctx, &workspace, &ctx.settings.provider_uri_archival, date).await?;

    let traces = workspace.file(ArtifactKind::Traces.file_name());
    ctx.client
        .export_traces(ExportTraces {
            start_block: range.start,
            end_block: range.end,
            batch_size: ctx.settings.batch_size,
            max_workers: ctx.settings.max_workers,
            provider_uri: &ctx.settings.provider_uri_archival,
            genesis_traces: ctx.settings.genesis_traces,
            daofork_traces: ctx.settings.daofork_traces,
            output: &traces,
        })
        .await?;

    ctx.transfer
        .publish(&traces, ArtifactKind::Traces, date)
        .await?;
    Ok(())
}
