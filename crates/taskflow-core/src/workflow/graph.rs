//! Task graph: dependency storage, cycle detection, leveling, and critical path.
//!
//! Tasks live in an arena (`Vec<Task>`) addressed by slot, with `index`
//! mapping task IDs to slots. Edges live in a `petgraph` `DiGraph` whose node
//! `i` is slot `i`, pointing from dependency to dependent.
//!
//! The graph owns every `Task`. Only the graph executor mutates task status;
//! everything else reads snapshots.

use std::collections::{HashMap, HashSet};

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, Reversed};
use taskflow_types::execution::ExecutionResult;
use taskflow_types::task::{Task, TaskConfig, TaskStatus};
use taskflow_types::visualization::{GraphEdge, GraphNode, GraphView};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Construction and validation errors. All of them abort a run before any
/// task is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate task ID: '{0}'")]
    DuplicateTask(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("cycle detected involving task '{0}'")]
    CyclicGraph(String),

    #[error("task not found: '{0}'")]
    TaskNotFound(String),
}

// ---------------------------------------------------------------------------
// TaskGraph
// ---------------------------------------------------------------------------

/// Directed acyclic graph of tasks keyed by task ID.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    /// Edge `dependency -> dependent`, at most one per pair.
    dag: DiGraph<(), ()>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Every dependency must already be in the graph.
    pub fn add_task(&mut self, mut config: TaskConfig) -> Result<(), GraphError> {
        if self.index.contains_key(&config.task_id) {
            return Err(GraphError::DuplicateTask(config.task_id));
        }

        let mut deps = Vec::with_capacity(config.dependencies.len());
        for dep in &config.dependencies {
            let slot = self
                .index
                .get(dep)
                .copied()
                .ok_or_else(|| GraphError::UnknownDependency {
                    task: config.task_id.clone(),
                    dependency: dep.clone(),
                })?;
            if !deps.contains(&slot) {
                deps.push(slot);
            }
        }
        config.dependencies = deps.iter().map(|&d| self.tasks[d].id().to_string()).collect();

        let node = self.dag.add_node(());
        for &d in &deps {
            self.dag.add_edge(NodeIndex::new(d), node, ());
        }
        self.index.insert(config.task_id.clone(), node.index());
        self.tasks.push(Task::new(config));
        Ok(())
    }

    /// Add an edge between two existing tasks: `task_id` will depend on
    /// `depends_on`. No cycle check happens here; call [`validate`](Self::validate).
    pub fn add_dependency(&mut self, task_id: &str, depends_on: &str) -> Result<(), GraphError> {
        let task = NodeIndex::new(self.slot(task_id)?);
        let dep = NodeIndex::new(self.slot(depends_on)?);
        if self.dag.contains_edge(dep, task) {
            return Ok(());
        }
        self.dag.add_edge(dep, task, ());
        self.tasks[task.index()]
            .config
            .dependencies
            .push(depends_on.to_string());
        Ok(())
    }

    /// Check that the graph is acyclic.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.levels().map(|_| ())
    }

    /// Topological levels: each level holds tasks whose dependencies all lie
    /// in earlier levels. Within a level, tasks keep insertion order.
    pub fn execution_order(&self) -> Result<Vec<Vec<String>>, GraphError> {
        Ok(self
            .levels()?
            .into_iter()
            .map(|level| level.into_iter().map(|i| self.tasks[i].id().to_string()).collect())
            .collect())
    }

    /// Pending tasks whose dependencies are all in `completed`, ordered by
    /// priority (highest first) and then insertion order.
    pub fn ready_tasks(&self, completed: &HashSet<String>) -> Vec<&Task> {
        let mut ready: Vec<(usize, &Task)> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.status == TaskStatus::Pending)
            .filter(|(i, _)| {
                self.upstream(*i)
                    .all(|d| completed.contains(self.tasks[d].id()))
            })
            .collect();
        ready.sort_by(|(ia, a), (ib, b)| {
            b.config
                .priority
                .cmp(&a.config.priority)
                .then_with(|| ia.cmp(ib))
        });
        ready.into_iter().map(|(_, task)| task).collect()
    }

    /// Longest path through the graph weighted by each task's
    /// `timeout_seconds`, first task first. Empty for an empty graph.
    pub fn critical_path(&self) -> Result<Vec<String>, GraphError> {
        let order: Vec<usize> = self.levels()?.into_iter().flatten().collect();
        if order.is_empty() {
            return Ok(Vec::new());
        }

        let n = self.tasks.len();
        let mut longest = vec![0u64; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];

        for &v in &order {
            let best = self.upstream(v).max_by_key(|&u| (longest[u], std::cmp::Reverse(u)));
            let base = best.map_or(0, |b| longest[b]);
            longest[v] = base.saturating_add(self.weight(v));
            parent[v] = best;
        }

        let mut end = order[0];
        for &v in &order {
            if longest[v] > longest[end] {
                end = v;
            }
        }

        let mut path = vec![end];
        let mut cursor = end;
        while let Some(p) = parent[cursor] {
            path.push(p);
            cursor = p;
        }
        path.reverse();
        Ok(path
            .into_iter()
            .map(|i| self.tasks[i].id().to_string())
            .collect())
    }

    /// Sum of the weights of the given tasks. Unknown IDs weigh nothing.
    pub fn path_weight(&self, path: &[String]) -> u64 {
        path.iter()
            .filter_map(|id| self.index.get(id))
            .map(|&i| self.weight(i))
            .sum()
    }

    /// Snapshot of nodes and edges for rendering.
    pub fn visualize(&self) -> GraphView {
        let nodes = self
            .tasks
            .iter()
            .map(|task| GraphNode {
                id: task.id().to_string(),
                name: task.config.display_name().to_string(),
                status: task.status,
                task_type: task.config.task_type.clone(),
            })
            .collect();

        let edges = self
            .dag
            .edge_references()
            .map(|edge| GraphEdge {
                source: self.tasks[edge.source().index()].id().to_string(),
                target: self.tasks[edge.target().index()].id().to_string(),
            })
            .collect();

        GraphView { nodes, edges }
    }

    // -- Lookups --

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.index.get(task_id).map(|&i| &self.tasks[i])
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Task IDs in insertion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(Task::id)
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> Vec<&str> {
        (0..self.tasks.len())
            .filter(|&i| self.upstream(i).next().is_none())
            .map(|i| self.tasks[i].id())
            .collect()
    }

    /// Direct dependents of a task, in insertion order.
    pub fn dependents(&self, task_id: &str) -> Vec<&str> {
        let Some(&slot) = self.index.get(task_id) else {
            return Vec::new();
        };
        let mut slots: Vec<usize> = self
            .dag
            .neighbors_directed(NodeIndex::new(slot), Outgoing)
            .map(NodeIndex::index)
            .collect();
        slots.sort_unstable();
        slots.into_iter().map(|i| self.tasks[i].id()).collect()
    }

    /// Transitive closure of a task's dependencies, in insertion order.
    /// Empty for unknown IDs.
    pub fn transitive_dependencies(&self, task_id: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(task_id) else {
            return Vec::new();
        };

        let upstream = Reversed(&self.dag);
        let mut dfs = Dfs::new(upstream, NodeIndex::new(start));
        let mut slots = Vec::new();
        while let Some(node) = dfs.next(upstream) {
            if node.index() != start {
                slots.push(node.index());
            }
        }
        slots.sort_unstable();
        slots.into_iter().map(|i| self.tasks[i].id()).collect()
    }

    // -- Mutation (executor only) --

    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) -> Result<(), GraphError> {
        let slot = self.slot(task_id)?;
        self.tasks[slot].status = status;
        Ok(())
    }

    /// Store a task's final result and adopt its status.
    pub fn record_result(&mut self, result: ExecutionResult) -> Result<(), GraphError> {
        let slot = self.slot(&result.task_id)?;
        let task = &mut self.tasks[slot];
        task.status = result.status;
        task.result = Some(result);
        Ok(())
    }

    // -- Internals --

    fn slot(&self, task_id: &str) -> Result<usize, GraphError> {
        self.index
            .get(task_id)
            .copied()
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))
    }

    fn weight(&self, slot: usize) -> u64 {
        self.tasks[slot].config.resources.timeout_seconds
    }

    /// Slots `slot` depends on directly.
    fn upstream(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        self.dag
            .neighbors_directed(NodeIndex::new(slot), Incoming)
            .map(NodeIndex::index)
    }

    /// Kahn's algorithm, level by level.
    fn levels(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let n = self.tasks.len();
        let mut in_degree: Vec<usize> = (0..n).map(|i| self.upstream(i).count()).collect();
        let mut current: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut levels = Vec::new();
        let mut visited = 0;

        while !current.is_empty() {
            visited += current.len();
            let mut next = Vec::new();
            for &i in &current {
                for d in self.dag.neighbors_directed(NodeIndex::new(i), Outgoing) {
                    let d = d.index();
                    in_degree[d] -= 1;
                    if in_degree[d] == 0 {
                        next.push(d);
                    }
                }
            }
            next.sort_unstable();
            levels.push(current);
            current = next;
        }

        if visited < n {
            let offender = self.node_on_cycle(&in_degree);
            return Err(GraphError::CyclicGraph(self.tasks[offender].id().to_string()));
        }
        Ok(levels)
    }

    /// Pick a task that actually lies on a cycle.
    ///
    /// Every task left with a positive in-degree after Kahn's pass has at
    /// least one dependency that is also left, so walking dependencies `n`
    /// times from any such task must end inside a cycle.
    fn node_on_cycle(&self, in_degree: &[usize]) -> usize {
        let mut cursor = match in_degree.iter().position(|&d| d > 0) {
            Some(i) => i,
            None => return 0,
        };
        for _ in 0..self.tasks.len() {
            match self.upstream(cursor).find(|&d| in_degree[d] > 0) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        cursor
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_types::task::Priority;

    fn task(id: &str, deps: &[&str]) -> TaskConfig {
        TaskConfig::new(id, "echo").with_dependencies(deps.iter().copied())
    }

    fn weighted(id: &str, deps: &[&str], secs: u64) -> TaskConfig {
        task(id, deps).with_timeout_secs(secs)
    }

    fn graph(tasks: Vec<TaskConfig>) -> TaskGraph {
        let mut g = TaskGraph::new();
        for t in tasks {
            g.add_task(t).unwrap();
        }
        g
    }

    fn completed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_duplicate_task_rejected() {
        let mut g = graph(vec![task("a", &[])]);
        let err = g.add_task(task("a", &[])).unwrap_err();
        assert_eq!(err, GraphError::DuplicateTask("a".into()));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut g = TaskGraph::new();
        let err = g.add_task(task("b", &["a"])).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownDependency {
                task: "b".into(),
                dependency: "a".into()
            }
        );
        assert!(g.is_empty());
    }

    #[test]
    fn test_duplicate_dependencies_collapsed() {
        let g = graph(vec![task("a", &[]), task("b", &["a", "a"])]);
        assert_eq!(g.get("b").unwrap().dependencies(), ["a"]);
        assert_eq!(g.visualize().edges.len(), 1);
    }

    #[test]
    fn test_add_dependency_requires_known_tasks() {
        let mut g = graph(vec![task("a", &[])]);
        let err = g.add_dependency("a", "ghost").unwrap_err();
        assert_eq!(err, GraphError::TaskNotFound("ghost".into()));
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_two_node_cycle_detected() {
        let mut g = graph(vec![task("a", &[]), task("b", &["a"])]);
        g.add_dependency("a", "b").unwrap();
        let err = g.validate().unwrap_err();
        assert!(matches!(err, GraphError::CyclicGraph(ref id) if id == "a" || id == "b"));
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn test_cycle_offender_is_on_cycle() {
        // root -> x -> y -> z -> x, plus tail hanging off z
        let mut g = graph(vec![
            task("root", &[]),
            task("x", &["root"]),
            task("y", &["x"]),
            task("z", &["y"]),
            task("tail", &["z"]),
        ]);
        g.add_dependency("x", "z").unwrap();
        match g.validate().unwrap_err() {
            GraphError::CyclicGraph(id) => assert!(["x", "y", "z"].contains(&id.as_str())),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let mut g = graph(vec![task("a", &[])]);
        g.add_dependency("a", "a").unwrap();
        assert_eq!(g.validate().unwrap_err(), GraphError::CyclicGraph("a".into()));
    }

    #[test]
    fn test_acyclic_graph_validates() {
        let g = graph(vec![task("a", &[]), task("b", &["a"]), task("c", &["a", "b"])]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_empty_graph_validates() {
        let g = TaskGraph::new();
        assert!(g.validate().is_ok());
        assert!(g.execution_order().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Leveling
    // -----------------------------------------------------------------------

    #[test]
    fn test_diamond_levels() {
        // A -> {B, C} -> D
        let g = graph(vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ]);
        let order = g.execution_order().unwrap();
        assert_eq!(order, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_independent_tasks_single_level() {
        let g = graph(vec![task("a", &[]), task("b", &[]), task("c", &[])]);
        assert_eq!(g.execution_order().unwrap(), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_uneven_branches_level_by_longest_chain() {
        //   a -> b -> c
        //   a ------> d(c)
        let g = graph(vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["b"]),
            task("d", &["a", "c"]),
        ]);
        assert_eq!(
            g.execution_order().unwrap(),
            vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]
        );
    }

    // -----------------------------------------------------------------------
    // Ready set
    // -----------------------------------------------------------------------

    #[test]
    fn test_ready_tasks_respect_dependencies() {
        let g = graph(vec![task("a", &[]), task("b", &["a"]), task("c", &[])]);
        let ready: Vec<&str> = g.ready_tasks(&completed(&[])).iter().map(|t| t.id()).collect();
        assert_eq!(ready, vec!["a", "c"]);
    }

    #[test]
    fn test_ready_tasks_skip_non_pending() {
        let mut g = graph(vec![task("a", &[]), task("b", &["a"])]);
        g.set_status("a", TaskStatus::Success).unwrap();
        let ready: Vec<&str> = g.ready_tasks(&completed(&["a"])).iter().map(|t| t.id()).collect();
        assert_eq!(ready, vec!["b"]);
    }

    #[test]
    fn test_ready_tasks_ordered_by_priority() {
        let g = graph(vec![
            task("low", &[]).with_priority(Priority::Low),
            task("mid", &[]),
            task("crit", &[]).with_priority(Priority::Critical),
            task("high", &[]).with_priority(Priority::High),
        ]);
        let ready: Vec<&str> = g.ready_tasks(&completed(&[])).iter().map(|t| t.id()).collect();
        assert_eq!(ready, vec!["crit", "high", "mid", "low"]);
    }

    // -----------------------------------------------------------------------
    // Critical path
    // -----------------------------------------------------------------------

    #[test]
    fn test_critical_path_empty_graph() {
        assert!(TaskGraph::new().critical_path().unwrap().is_empty());
    }

    #[test]
    fn test_critical_path_picks_heaviest_branch() {
        //     a(1)
        //    /    \
        //  b(10)  c(2)
        //    \    /
        //     d(1)
        let g = graph(vec![
            weighted("a", &[], 1),
            weighted("b", &["a"], 10),
            weighted("c", &["a"], 2),
            weighted("d", &["b", "c"], 1),
        ]);
        let path = g.critical_path().unwrap();
        assert_eq!(path, vec!["a", "b", "d"]);
        assert_eq!(g.path_weight(&path), 12);
    }

    #[test]
    fn test_critical_path_weight_beats_length() {
        // Long chain of light tasks vs one heavy task.
        let g = graph(vec![
            weighted("x", &[], 1),
            weighted("y", &["x"], 1),
            weighted("z", &["y"], 1),
            weighted("heavy", &[], 100),
        ]);
        assert_eq!(g.critical_path().unwrap(), vec!["heavy"]);
    }

    #[test]
    fn test_critical_path_on_cycle_errors() {
        let mut g = graph(vec![task("a", &[]), task("b", &["a"])]);
        g.add_dependency("a", "b").unwrap();
        assert!(matches!(g.critical_path(), Err(GraphError::CyclicGraph(_))));
    }

    // -----------------------------------------------------------------------
    // Views and lookups
    // -----------------------------------------------------------------------

    #[test]
    fn test_visualize_snapshot() {
        let mut g = graph(vec![task("a", &[]).with_name("Extract"), task("b", &["a"])]);
        g.set_status("a", TaskStatus::Running).unwrap();
        let view = g.visualize();
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.nodes[0].name, "Extract");
        assert_eq!(view.nodes[0].status, TaskStatus::Running);
        assert_eq!(view.nodes[1].name, "b");
        assert_eq!(view.edges, vec![GraphEdge { source: "a".into(), target: "b".into() }]);
    }

    #[test]
    fn test_transitive_dependencies() {
        let g = graph(vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["b"]),
            task("d", &["c"]),
        ]);
        assert_eq!(g.transitive_dependencies("d"), vec!["a", "b", "c"]);
        assert!(g.transitive_dependencies("a").is_empty());
        assert!(g.transitive_dependencies("ghost").is_empty());
    }

    #[test]
    fn test_roots_and_dependents() {
        let g = graph(vec![task("a", &[]), task("b", &["a"]), task("c", &["a"]), task("e", &[])]);
        assert_eq!(g.roots(), vec!["a", "e"]);
        assert_eq!(g.dependents("a"), vec!["b", "c"]);
        assert!(g.dependents("ghost").is_empty());
    }

    #[test]
    fn test_record_result_sets_status() {
        let mut g = graph(vec![task("a", &[])]);
        let now = chrono::Utc::now();
        g.record_result(ExecutionResult::failure("a", "boom", now, now, 1)).unwrap();
        let a = g.get("a").unwrap();
        assert_eq!(a.status, TaskStatus::Failed);
        assert_eq!(a.result.as_ref().unwrap().retry_count, 1);
    }
}
