//! Toggle-conditional task graph construction.
//!
//! The graph is derived, not declared: an edge producer→consumer exists
//! when the producer writes an artifact kind the consumer reads. Disabling
//! a step removes its node and every edge touching it; nothing is rerouted.

use std::collections::HashSet;

use ethexport_core::StepToggles;

use crate::steps::{STEPS, StepId};

/// The acyclic set of enabled steps and their producer→consumer edges for
/// one toggle configuration.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<StepId>,
    edges: Vec<(StepId, StepId)>,
}

impl TaskGraph {
    /// Build the graph for the given toggles.
    ///
    /// A node exists only if its toggle is enabled. Edges into or out of a
    /// disabled node are elided entirely, so a consumer whose producer is
    /// disabled simply has no declared predecessor; it keeps its input
    /// contract and fails at fetch time if the artifact is absent. An
    /// all-false toggle set yields the empty graph, a valid no-op run.
    pub fn build(toggles: &StepToggles) -> Self {
        let nodes: Vec<StepId> = STEPS
            .iter()
            .map(|node| node.id)
            .filter(|id| id.enabled(toggles))
            .collect();

        let mut edges = Vec::new();
        for producer in &STEPS {
            if !producer.id.enabled(toggles) {
                continue;
            }
            for consumer in &STEPS {
                if consumer.id == producer.id || !consumer.id.enabled(toggles) {
                    continue;
                }
                if consumer
                    .reads
                    .iter()
                    .any(|kind| producer.writes.contains(kind))
                {
                    edges.push((producer.id, consumer.id));
                }
            }
        }

        Self { nodes, edges }
    }

    /// Enabled steps, in canonical declaration order.
    pub fn nodes(&self) -> &[StepId] {
        &self.nodes
    }

    /// Producer→consumer edges between enabled steps.
    pub fn edges(&self) -> &[(StepId, StepId)] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Enabled steps `step` directly depends on.
    pub fn predecessors(&self, step: StepId) -> impl Iterator<Item = StepId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, consumer)| *consumer == step)
            .map(|(producer, _)| *producer)
    }

    /// Enabled steps that directly depend on `step`.
    pub fn dependents(&self, step: StepId) -> impl Iterator<Item = StepId> + '_ {
        self.edges
            .iter()
            .filter(move |(producer, _)| *producer == step)
            .map(|(_, consumer)| *consumer)
    }

    /// All enabled steps that transitively depend on `step`.
    pub fn transitive_dependents(&self, step: StepId) -> HashSet<StepId> {
        let mut dependents = HashSet::new();
        let mut stack = vec![step];
        while let Some(current) = stack.pop() {
            for dependent in self.dependents(current) {
                if dependents.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        dependents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_set(graph: &TaskGraph) -> HashSet<(StepId, StepId)> {
        graph.edges().iter().copied().collect()
    }

    #[test]
    fn all_enabled_yields_six_nodes_and_four_edges() {
        let graph = TaskGraph::build(&StepToggles::all(true));

        assert_eq!(graph.nodes().len(), 6);
        assert_eq!(
            edge_set(&graph),
            HashSet::from([
                (
                    StepId::ExportBlocksAndTransactions,
                    StepId::ExportReceiptsAndLogs
                ),
                (StepId::ExportReceiptsAndLogs, StepId::ExportContracts),
                (StepId::ExportContracts, StepId::ExportTokens),
                (StepId::ExportReceiptsAndLogs, StepId::ExtractTokenTransfers),
            ])
        );
    }

    #[test]
    fn all_disabled_yields_empty_graph() {
        let graph = TaskGraph::build(&StepToggles::all(false));
        assert!(graph.is_empty());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn traces_is_independent() {
        let graph = TaskGraph::build(&StepToggles::all(true));
        assert_eq!(graph.predecessors(StepId::ExportTraces).count(), 0);
        assert_eq!(graph.dependents(StepId::ExportTraces).count(), 0);
    }

    #[test]
    fn disabling_a_producer_elides_its_edges() {
        let mut toggles = StepToggles::all(true);
        toggles.contracts = false;
        let graph = TaskGraph::build(&toggles);

        assert_eq!(graph.nodes().len(), 5);
        assert!(!graph.nodes().contains(&StepId::ExportContracts));
        // Tokens stays enabled but has no declared predecessor; it will
        // fail at fetch time if the contracts artifact is absent.
        assert!(graph.nodes().contains(&StepId::ExportTokens));
        assert_eq!(graph.predecessors(StepId::ExportTokens).count(), 0);
        assert!(
            edge_set(&graph)
                .iter()
                .all(|(p, c)| *p != StepId::ExportContracts && *c != StepId::ExportContracts)
        );
    }

    #[test]
    fn disabling_a_leaf_keeps_the_rest_intact() {
        let mut toggles = StepToggles::all(true);
        toggles.token_transfers = false;
        let graph = TaskGraph::build(&toggles);

        assert_eq!(graph.nodes().len(), 5);
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.dependents(StepId::ExportReceiptsAndLogs).count(), 1);
    }

    #[test]
    fn transitive_dependents_follow_the_chain() {
        let graph = TaskGraph::build(&StepToggles::all(true));
        let downstream = graph.transitive_dependents(StepId::ExportBlocksAndTransactions);

        assert_eq!(
            downstream,
            HashSet::from([
                StepId::ExportReceiptsAndLogs,
                StepId::ExportContracts,
                StepId::ExportTokens,
                StepId::ExtractTokenTransfers,
            ])
        );
    }

    #[test]
    fn graph_is_acyclic() {
        // Every edge goes from an earlier declaration index to a later one,
        // which rules out cycles.
        let graph = TaskGraph::build(&StepToggles::all(true));
        let position = |id: StepId| StepId::ALL.iter().position(|s| *s == id).unwrap();
        for (producer, consumer) in graph.edges() {
            assert!(position(*producer) < position(*consumer));
        }
    }
}
