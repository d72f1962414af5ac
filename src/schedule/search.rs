//! Graph searches over an [`Adjacency`] index. Every search keeps its own
//! explicit stack, so graph depth is never bounded by the call stack.

use crate::pipeline::NodeId;
use ahash::AHashMap;

/// Successor and predecessor lists over dense node indices.
///
/// Node indices follow the order nodes were given in. Parallel edges between
/// the same pair of nodes are collapsed, and edges naming unknown nodes are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    ids: Vec<NodeId>,
    index: AHashMap<NodeId, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn new<'a, N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = &'a NodeId>,
        E: IntoIterator<Item = (&'a NodeId, &'a NodeId)>,
    {
        let ids: Vec<NodeId> = nodes.into_iter().cloned().collect();
        let index: AHashMap<NodeId, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let mut successors = vec![Vec::new(); ids.len()];
        let mut predecessors = vec![Vec::new(); ids.len()];

        for (source, target) in edges {
            let (Some(&s), Some(&t)) = (index.get(source), index.get(target)) else {
                continue;
            };
            if !successors[s].contains(&t) {
                successors[s].push(t);
                predecessors[t].push(s);
            }
        }

        Self {
            ids,
            index,
            successors,
            predecessors,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> &NodeId {
        &self.ids[index]
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    /// Nodes without predecessors, in index order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| self.predecessors[i].is_empty())
    }

    pub fn ids_of(&self, indices: impl IntoIterator<Item = usize>) -> Vec<NodeId> {
        indices.into_iter().map(|i| self.ids[i].clone()).collect()
    }
}

/// Depth-first post-order over predecessors: every node is yielded after all
/// of its ancestors, which makes the sequence a topological order.
pub struct PostOrder<'a> {
    adjacency: &'a Adjacency,
    // Reversed so the next start is popped from the end.
    starts: Vec<usize>,
    visited: Vec<bool>,
    stack: Vec<(usize, usize)>,
}

impl<'a> PostOrder<'a> {
    /// Covers every node, starting components in index order.
    pub fn new(adjacency: &'a Adjacency) -> Self {
        Self::with_starts(adjacency, (0..adjacency.len()).rev().collect())
    }

    /// Covers `start` and its ancestors only; `start` is yielded last.
    pub fn ancestors_of(adjacency: &'a Adjacency, start: usize) -> Self {
        Self::with_starts(adjacency, vec![start])
    }

    fn with_starts(adjacency: &'a Adjacency, starts: Vec<usize>) -> Self {
        Self {
            adjacency,
            starts,
            visited: vec![false; adjacency.len()],
            stack: Vec::new(),
        }
    }
}

impl Iterator for PostOrder<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if let Some(top) = self.stack.last_mut() {
                let (node, next) = *top;
                let predecessors = self.adjacency.predecessors(node);
                if next < predecessors.len() {
                    top.1 += 1;
                    let predecessor = predecessors[next];
                    if !self.visited[predecessor] {
                        self.visited[predecessor] = true;
                        self.stack.push((predecessor, 0));
                    }
                    continue;
                }
                self.stack.pop();
                return Some(node);
            }

            let start = self.starts.pop()?;
            if !self.visited[start] {
                self.visited[start] = true;
                self.stack.push((start, 0));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Every node reachable from a start node (the start included), depth-first.
pub struct Reachable<'a> {
    adjacency: &'a Adjacency,
    direction: Direction,
    stack: Vec<usize>,
    visited: Vec<bool>,
}

impl<'a> Reachable<'a> {
    pub fn new(adjacency: &'a Adjacency, start: usize, direction: Direction) -> Self {
        let mut visited = vec![false; adjacency.len()];
        visited[start] = true;
        Self {
            adjacency,
            direction,
            stack: vec![start],
            visited,
        }
    }

    pub fn forward(adjacency: &'a Adjacency, start: usize) -> Self {
        Self::new(adjacency, start, Direction::Forward)
    }

    pub fn backward(adjacency: &'a Adjacency, start: usize) -> Self {
        Self::new(adjacency, start, Direction::Backward)
    }
}

impl Iterator for Reachable<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let node = self.stack.pop()?;
        let neighbours = match self.direction {
            Direction::Forward => self.adjacency.successors(node),
            Direction::Backward => self.adjacency.predecessors(node),
        };
        for &neighbour in neighbours.iter().rev() {
            if !self.visited[neighbour] {
                self.visited[neighbour] = true;
                self.stack.push(neighbour);
            }
        }
        Some(node)
    }
}

/// Every path from a root (no predecessors) to a sink (no successors).
///
/// The number of paths can grow exponentially with the graph; consume lazily.
pub struct PathEnumerator<'a> {
    adjacency: &'a Adjacency,
    roots: Vec<usize>,
    stack: Vec<(usize, usize)>,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(adjacency: &'a Adjacency) -> Self {
        let mut roots: Vec<usize> = adjacency.roots().collect();
        roots.reverse();
        Self {
            adjacency,
            roots,
            stack: Vec::new(),
        }
    }
}

impl Iterator for PathEnumerator<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            if let Some(top) = self.stack.last_mut() {
                let (node, next) = *top;
                let successors = self.adjacency.successors(node);
                if successors.is_empty() && next == 0 {
                    top.1 = 1;
                    return Some(self.stack.iter().map(|(n, _)| *n).collect());
                }
                if next < successors.len() {
                    top.1 += 1;
                    let successor = successors[next];
                    // Never re-enter a node already on the path.
                    if !self.stack.iter().any(|(n, _)| *n == successor) {
                        self.stack.push((successor, 0));
                    }
                    continue;
                }
                self.stack.pop();
                continue;
            }

            let root = self.roots.pop()?;
            self.stack.push((root, 0));
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// Finds a directed cycle, returned as the nodes along it in edge order.
pub fn find_cycle(adjacency: &Adjacency) -> Option<Vec<usize>> {
    let mut colour = vec![Colour::White; adjacency.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..adjacency.len() {
        if colour[start] != Colour::White {
            continue;
        }
        colour[start] = Colour::Grey;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let successors = adjacency.successors(node);
            if next == successors.len() {
                colour[node] = Colour::Black;
                stack.pop();
                continue;
            }
            top.1 += 1;
            let successor = successors[next];
            match colour[successor] {
                Colour::White => {
                    colour[successor] = Colour::Grey;
                    stack.push((successor, 0));
                }
                Colour::Grey => {
                    let from = stack.iter().position(|(n, _)| *n == successor)?;
                    return Some(stack[from..].iter().map(|(n, _)| *n).collect());
                }
                Colour::Black => {}
            }
        }
    }
    None
}
