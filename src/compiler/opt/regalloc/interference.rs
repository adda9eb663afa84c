//! Interference Graph
//!
//! Undirected graph over a method's local variables, with an edge between any
//! two variables that are live at the same time and so cannot share a
//! register. Colored with the simplify/select heuristic.

use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::compiler::ir::Method;
use crate::compiler::opt::liveness::LiveSets;

/// Interference graph. Variables are addressed by a stable index; the
/// adjacency is symmetric and has no self-edges.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    vars: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<BTreeSet<usize>>,
}

impl InterferenceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph of `method`'s local variables from converged liveness.
    ///
    /// For every instruction, all variables live on entry interfere pairwise,
    /// as do all variables in its definitions and live-out set. The receiver
    /// and parameters have fixed slots and are not nodes.
    #[must_use]
    pub fn build(method: &Method, live: &LiveSets) -> Self {
        let mut graph = Self::new();

        for var in method.locals() {
            graph.add_node(var);
        }

        for i in 0..live.len() {
            graph.connect_all(live.live_in(i).iter().map(String::as_str));
            graph.connect_all(
                live.def(i)
                    .iter()
                    .chain(live.live_out(i))
                    .map(String::as_str),
            );
        }

        graph
    }

    /// Adds a node for `var`, returning its index. Adding an existing variable
    /// returns the index it already has.
    pub fn add_node(&mut self, var: &str) -> usize {
        if let Some(&idx) = self.index.get(var) {
            return idx;
        }

        let idx = self.vars.len();
        self.vars.push(var.to_string());
        self.index.insert(var.to_string(), idx);
        self.adjacency.push(BTreeSet::new());
        idx
    }

    /// Connects `a` and `b`. Returns `false`, adding nothing, if they are the
    /// same variable or either is not a node.
    pub fn add_edge(&mut self, a: &str, b: &str) -> bool {
        match (self.index.get(a).copied(), self.index.get(b).copied()) {
            (Some(x), Some(y)) if x != y => {
                self.adjacency[x].insert(y);
                self.adjacency[y].insert(x);
                true
            }
            _ => false,
        }
    }

    /// Connects every pair of nodes among `vars`; names that are not nodes are
    /// skipped.
    pub fn connect_all<'a>(&mut self, vars: impl IntoIterator<Item = &'a str>) {
        let nodes: Vec<usize> = vars
            .into_iter()
            .filter_map(|v| self.index.get(v).copied())
            .collect();

        for (i, &x) in nodes.iter().enumerate() {
            for &y in &nodes[i + 1..] {
                if x != y {
                    self.adjacency[x].insert(y);
                    self.adjacency[y].insert(x);
                }
            }
        }
    }

    #[must_use]
    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&x), Some(&y)) => self.adjacency[x].contains(&y),
            _ => false,
        }
    }

    #[must_use]
    pub fn contains_node(&self, var: &str) -> bool {
        self.index.contains_key(var)
    }

    /// Returns the neighbors of `var`, empty if it is not a node.
    pub fn neighbors(&self, var: &str) -> impl Iterator<Item = &str> {
        self.index
            .get(var)
            .into_iter()
            .flat_map(|&idx| self.adjacency[idx].iter())
            .map(|&n| self.vars[n].as_str())
    }

    /// Returns the variables, in insertion order.
    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(String::as_str)
    }

    /// Returns the number of nodes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Attempts to color the graph with colors `0..k` using simplify/select.
    ///
    /// Returns `None` if simplification gets stuck: every remaining node has
    /// `k` or more remaining neighbors. No spilling is attempted.
    #[must_use]
    pub fn color(&self, k: usize) -> Option<Coloring> {
        let stack = Simplify::new(self).run(k)?;

        let mut colors: Vec<Option<usize>> = vec![None; self.len()];

        for &node in stack.iter().rev() {
            let taken: BTreeSet<usize> = self.adjacency[node]
                .iter()
                .filter_map(|&n| colors[n])
                .collect();

            // Smallest free color. One always exists: at removal `node` had
            // fewer than `k` neighbors left, and only those are colored yet.
            let color = (0..k).find(|c| !taken.contains(c))?;
            colors[node] = Some(color);
        }

        let colors = self
            .vars
            .iter()
            .zip(colors)
            .filter_map(|(var, color)| color.map(|c| (var.clone(), c)))
            .collect();

        Some(Coloring { k, colors })
    }

    /// Colors the graph with as few colors as simplify/select manages, trying
    /// `k = 1, 2, ...` in turn.
    ///
    /// Always succeeds: with `k` equal to the number of nodes every node can
    /// be simplified. An empty graph needs zero colors.
    #[must_use]
    pub fn color_minimal(&self) -> Coloring {
        for k in 1..=self.len() {
            if let Some(coloring) = self.color(k) {
                return coloring;
            }
            trace!("{k} colors are not enough for {} variables", self.len());
        }

        Coloring {
            k: 0,
            colors: HashMap::default(),
        }
    }
}

/// Working view over a graph for the simplify phase: nodes are removed by
/// flag, and degrees shrink as neighbors go, while the adjacency itself stays
/// untouched for select.
struct Simplify<'g> {
    graph: &'g InterferenceGraph,
    removed: Vec<bool>,
    degree: Vec<usize>,
}

impl<'g> Simplify<'g> {
    fn new(graph: &'g InterferenceGraph) -> Self {
        Self {
            graph,
            removed: vec![false; graph.len()],
            degree: graph.adjacency.iter().map(BTreeSet::len).collect(),
        }
    }

    /// Removes nodes of degree less than `k` until none remain, returning them
    /// in removal order, or `None` if no removable node is left.
    fn run(mut self, k: usize) -> Option<Vec<usize>> {
        let mut stack = Vec::with_capacity(self.graph.len());

        while stack.len() < self.graph.len() {
            let node = (0..self.graph.len()).find(|&n| !self.removed[n] && self.degree[n] < k)?;

            self.removed[node] = true;
            for &n in &self.graph.adjacency[node] {
                self.degree[n] -= 1;
            }

            stack.push(node);
        }

        Some(stack)
    }
}

/// Assignment of colors `0..k` to variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    k: usize,
    colors: HashMap<String, usize>,
}

impl Coloring {
    /// Number of colors the coloring was computed for.
    #[inline]
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Number of distinct registers the coloring occupies: one past the
    /// highest color assigned, or `0` when nothing is colored.
    #[must_use]
    pub fn colors_used(&self) -> usize {
        self.colors.values().max().map_or(0, |&c| c + 1)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, var: &str) -> Option<usize> {
        self.colors.get(var).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.colors.iter().map(|(var, &c)| (var.as_str(), c))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns `true` if every node of `graph` has a color below `k` that
    /// differs from all of its neighbors' colors.
    #[must_use]
    pub fn is_valid_for(&self, graph: &InterferenceGraph) -> bool {
        graph.vars().all(|var| {
            self.get(var).is_some_and(|c| {
                c < self.k && graph.neighbors(var).all(|n| self.get(n) != Some(c))
            })
        })
    }
}
