//! Construction graph and peeling
//!
//! Rows are vertices, items are edges `(x, y)`. A row touched by exactly one
//! unresolved edge can absorb that item's constraint, so the edge is removed
//! and the row recorded. When every edge has been removed, rows are assigned
//! in reverse order:
//!
//! ```text
//! T[row] = target ^ pad ^ T[other]
//! ```
//!
//! Each assignment only reads rows that are final by then, because the other
//! endpoint of a later-peeled edge is never written again.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::indexer::Evaluation;
use crate::table::{xor_into, Table};

/// Peeling could not resolve every edge
///
/// The graph has a 2-core; a different salt yields a different graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeelError {
    #[error("peeling stuck with {remaining} of {total} items unresolved")]
    Stuck { remaining: usize, total: usize },
}

/// One resolved item and the row that absorbs it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeelStep {
    pub item: usize,
    pub row: u32,
}

/// Multigraph over rows `[0, table_length)` with one edge per item
#[derive(Debug, Clone)]
pub struct ConstructionGraph {
    table_length: u32,
    edges: Vec<(u32, u32)>,
}

impl ConstructionGraph {
    pub fn new(table_length: u32) -> Self {
        Self {
            table_length,
            edges: Vec::new(),
        }
    }

    pub fn with_capacity(table_length: u32, items: usize) -> Self {
        Self {
            table_length,
            edges: Vec::with_capacity(items),
        }
    }

    /// Add an edge and return its item index
    pub fn add_edge(&mut self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.table_length && y < self.table_length);
        self.edges.push((x, y));
        self.edges.len() - 1
    }

    pub fn edge(&self, item: usize) -> (u32, u32) {
        self.edges[item]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Remove degree-one rows, lowest index first, until no edge is left
    ///
    /// Returns the peel order. Deterministic for a given edge list.
    pub fn peel(&self) -> Result<Vec<PeelStep>, PeelError> {
        let n = self.edges.len();
        let rows = self.table_length as usize;

        // XOR of incident item indices: once a row's degree drops to one,
        // it holds exactly the remaining item.
        let mut degree = vec![0u32; rows];
        let mut incident = vec![0usize; rows];
        for (item, &(x, y)) in self.edges.iter().enumerate() {
            for row in [x, y] {
                degree[row as usize] += 1;
                incident[row as usize] ^= item;
            }
        }

        let mut ready: BinaryHeap<Reverse<u32>> = degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 1)
            .map(|(row, _)| Reverse(row as u32))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(row)) = ready.pop() {
            if degree[row as usize] != 1 {
                continue;
            }
            let item = incident[row as usize];
            order.push(PeelStep { item, row });

            let (x, y) = self.edges[item];
            for end in [x, y] {
                let end = end as usize;
                degree[end] -= 1;
                incident[end] ^= item;
                if degree[end] == 1 {
                    ready.push(Reverse(end as u32));
                }
            }
        }

        if order.len() != n {
            return Err(PeelError::Stuck {
                remaining: n - order.len(),
                total: n,
            });
        }
        Ok(order)
    }
}

/// Fill a table from a peel order
///
/// `targets[i]` is the encoded row item `i` must decode to, `evals[i]` its
/// indexer output. Untouched rows stay zero.
pub fn assign(
    order: &[PeelStep],
    evals: &[Evaluation],
    targets: &[Vec<u8>],
    table_length: u32,
    row_bytes: usize,
) -> Table {
    let mut table = Table::zeroed(table_length, row_bytes);
    let mut value = vec![0u8; row_bytes];

    for step in order.iter().rev() {
        let eval = &evals[step.item];
        let other = if eval.x == step.row { eval.y } else { eval.x };

        value.copy_from_slice(&targets[step.item]);
        xor_into(&mut value, &eval.pad);
        xor_into(&mut value, table.row(other));
        table.row_mut(step.row).copy_from_slice(&value);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peel_path() {
        // 0 - 1 - 2 - 3
        let mut graph = ConstructionGraph::new(4);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);

        let order = graph.peel().unwrap();
        assert_eq!(
            order,
            vec![
                PeelStep { item: 0, row: 0 },
                PeelStep { item: 1, row: 1 },
                PeelStep { item: 2, row: 2 },
            ]
        );
    }

    #[test]
    fn test_peel_lowest_row_first() {
        let mut graph = ConstructionGraph::new(6);
        graph.add_edge(4, 5);
        graph.add_edge(2, 3);
        let order = graph.peel().unwrap();
        assert_eq!(order[0], PeelStep { item: 1, row: 2 });
        assert_eq!(order[1], PeelStep { item: 0, row: 4 });
    }

    #[test]
    fn test_cycle_is_stuck() {
        let mut graph = ConstructionGraph::new(5);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.add_edge(2, 0);
        graph.add_edge(3, 4);
        assert_eq!(
            graph.peel(),
            Err(PeelError::Stuck {
                remaining: 3,
                total: 4
            })
        );
    }

    #[test]
    fn test_parallel_edges_are_stuck() {
        let mut graph = ConstructionGraph::new(3);
        graph.add_edge(0, 1);
        graph.add_edge(1, 0);
        assert!(graph.peel().is_err());
    }

    #[test]
    fn test_assign_satisfies_every_edge() {
        let evals = vec![
            Evaluation { x: 0, y: 1, pad: vec![0xaa, 0x01] },
            Evaluation { x: 2, y: 1, pad: vec![0x55, 0x02] },
            Evaluation { x: 2, y: 3, pad: vec![0x0f, 0x03] },
            Evaluation { x: 4, y: 0, pad: vec![0xf0, 0x04] },
        ];
        let targets = vec![
            vec![1u8, 0],
            vec![2u8, 0],
            vec![3u8, 0],
            vec![4u8, 0],
        ];

        let mut graph = ConstructionGraph::new(5);
        for eval in &evals {
            graph.add_edge(eval.x, eval.y);
        }
        let order = graph.peel().unwrap();
        let table = assign(&order, &evals, &targets, 5, 2);

        for (eval, target) in evals.iter().zip(&targets) {
            let mut row = table.row(eval.x).to_vec();
            xor_into(&mut row, table.row(eval.y));
            xor_into(&mut row, &eval.pad);
            assert_eq!(&row, target);
        }
    }
}
