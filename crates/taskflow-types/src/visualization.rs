//! Serializable graph views for external consumers (UIs, exports).

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// A task as drawn in a graph view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: String,
}

/// A dependency edge: `source` must succeed before `target` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Point-in-time snapshot of the task graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Graph snapshot plus derived scheduling analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowVisualization {
    #[serde(flatten)]
    pub graph: GraphView,
    /// Longest timeout-weighted path, first task first.
    pub critical_path: Vec<String>,
    /// Topological levels.
    pub execution_order: Vec<Vec<String>>,
}
