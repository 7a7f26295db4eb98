//! The canonical pipeline steps and their executor.
//!
//! Each step declares the artifact kinds it reads and writes; the task
//! graph is derived from those declarations. Execution always follows the
//! same shape: acquire a staging workspace, fetch declared inputs, run the
//! step's sub-operations in sequence, publish declared outputs. A failure
//! anywhere aborts before anything is published, and the workspace is
//! removed on every exit path.

mod export;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use snafu::prelude::*;
use tracing::{error, info};

use ethexport_core::partition::ArtifactKind;
use ethexport_core::{ArtifactTransfer, Settings, StagingWorkspace, StepToggles};

use crate::client::ExportClient;
use crate::error::{StepError, WorkspaceSnafu};

/// Default per-step execution timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(15 * 60 * 60);

/// Identifier of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    ExportBlocksAndTransactions,
    ExportReceiptsAndLogs,
    ExportContracts,
    ExportTokens,
    ExtractTokenTransfers,
    ExportTraces,
}

impl StepId {
    /// All steps in canonical declaration order.
    pub const ALL: [StepId; 6] = [
        StepId::ExportBlocksAndTransactions,
        StepId::ExportReceiptsAndLogs,
        StepId::ExportContracts,
        StepId::ExportTokens,
        StepId::ExtractTokenTransfers,
        StepId::ExportTraces,
    ];

    /// Stable task identifier.
    pub fn id(self) -> &'static str {
        match self {
            StepId::ExportBlocksAndTransactions => "export_blocks_and_transactions",
            StepId::ExportReceiptsAndLogs => "export_receipts_and_logs",
            StepId::ExportContracts => "export_contracts",
            StepId::ExportTokens => "export_tokens",
            StepId::ExtractTokenTransfers => "extract_token_transfers",
            StepId::ExportTraces => "export_traces",
        }
    }

    /// Whether this step's toggle is enabled.
    pub fn enabled(self, toggles: &StepToggles) -> bool {
        match self {
            StepId::ExportBlocksAndTransactions => toggles.blocks_and_transactions,
            StepId::ExportReceiptsAndLogs => toggles.receipts_and_logs,
            StepId::ExportContracts => toggles.contracts,
            StepId::ExportTokens => toggles.tokens,
            StepId::ExtractTokenTransfers => toggles.token_transfers,
            StepId::ExportTraces => toggles.traces,
        }
    }

    /// The step's static descriptor.
    pub fn node(self) -> &'static StepNode {
        match self {
            StepId::ExportBlocksAndTransactions => &STEPS[0],
            StepId::ExportReceiptsAndLogs => &STEPS[1],
            StepId::ExportContracts => &STEPS[2],
            StepId::ExportTokens => &STEPS[3],
            StepId::ExtractTokenTransfers => &STEPS[4],
            StepId::ExportTraces => &STEPS[5],
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Static descriptor of one pipeline step.
///
/// Created once, immutable thereafter. Dependencies are not declared here;
/// the graph derives edges by matching `writes` against `reads`. An empty
/// `reads` slice is the explicit no-predecessor marker.
#[derive(Debug)]
pub struct StepNode {
    pub id: StepId,
    /// Upstream artifact kinds this step fetches before running.
    pub reads: &'static [ArtifactKind],
    /// Artifact kinds this step publishes on success.
    pub writes: &'static [ArtifactKind],
    /// Execution timeout for one invocation.
    pub timeout: Duration,
}

/// The canonical step list.
pub static STEPS: [StepNode; 6] = [
    StepNode {
        id: StepId::ExportBlocksAndTransactions,
        reads: &[],
        writes: &[
            ArtifactKind::BlocksMeta,
            ArtifactKind::Blocks,
            ArtifactKind::Transactions,
        ],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
    StepNode {
        id: StepId::ExportReceiptsAndLogs,
        reads: &[ArtifactKind::Transactions],
        writes: &[ArtifactKind::Receipts, ArtifactKind::Logs],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
    StepNode {
        id: StepId::ExportContracts,
        reads: &[ArtifactKind::Receipts],
        writes: &[ArtifactKind::Contracts],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
    StepNode {
        id: StepId::ExportTokens,
        reads: &[ArtifactKind::Contracts],
        writes: &[ArtifactKind::Tokens],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
    StepNode {
        id: StepId::ExtractTokenTransfers,
        reads: &[ArtifactKind::Logs],
        writes: &[ArtifactKind::TokenTransfers],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
    StepNode {
        id: StepId::ExportTraces,
        reads: &[],
        writes: &[ArtifactKind::Traces],
        timeout: DEFAULT_STEP_TIMEOUT,
    },
];

/// Shared resources handed to every step invocation.
#[derive(Clone)]
pub struct StepContext {
    pub settings: Arc<Settings>,
    pub client: Arc<dyn ExportClient>,
    pub transfer: ArtifactTransfer,
    /// Root directory for staging workspaces; system default when unset.
    pub staging_root: Option<PathBuf>,
}

impl StepContext {
    /// Create a context with the default staging location.
    pub fn new(
        settings: Arc<Settings>,
        client: Arc<dyn ExportClient>,
        transfer: ArtifactTransfer,
    ) -> Self {
        Self {
            settings,
            client,
            transfer,
            staging_root: None,
        }
    }

    /// Place staging workspaces under `root` instead of the system default.
    pub fn with_staging_root(mut self, root: PathBuf) -> Self {
        self.staging_root = Some(root);
        self
    }

    fn acquire_workspace(&self) -> Result<StagingWorkspace, StepError> {
        match &self.staging_root {
            Some(root) => StagingWorkspace::acquire_in(root).context(WorkspaceSnafu),
            None => StagingWorkspace::acquire().context(WorkspaceSnafu),
        }
    }
}

/// Run one step for one logical date.
///
/// Safe to re-run: outputs overwrite the same partition paths.
pub async fn run_step(id: StepId, ctx: &StepContext, date: NaiveDate) -> Result<(), StepError> {
    info!(step = %id, %date, "Step starting");
    let result = match id {
        StepId::ExportBlocksAndTransactions => export::blocks_and_transactions(ctx, date).await,
        StepId::ExportReceiptsAndLogs => export::receipts_and_logs(ctx, date).await,
        StepId::ExportContracts => export::contracts(ctx, date).await,
        StepId::ExportTokens => export::tokens(ctx, date).await,
        StepId::ExtractTokenTransfers => export::token_transfers(ctx, date).await,
        StepId::ExportTraces => export::traces(ctx, date).await,
    };
    match &result {
        Ok(()) => info!(step = %id, %date, "Step complete"),
        Err(e) => error!(step = %id, %date, error = %e, "Step failed"),
    }
    result
}
