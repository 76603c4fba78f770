use super::error::SchemaError;
use super::FieldDef;
use crate::shared::FieldId;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Field dependency graph, indexed by declaration position and computed once
/// per schema.
///
/// `order` is a topological order that prefers declaration order among
/// independent fields. `closures[i]` lists every field that transitively
/// depends on field `i`, sorted by topological rank, so a cascade never sees
/// a stale upstream value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyIndex {
    upstream: Vec<Vec<usize>>,
    downstream: Vec<Vec<usize>>,
    order: Vec<usize>,
    rank: Vec<usize>,
    closures: Vec<Vec<usize>>,
}

impl DependencyIndex {
    pub(crate) fn build(fields: &[FieldDef]) -> Result<Self, SchemaError> {
        let positions: HashMap<&FieldId, usize> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (&field.id, idx))
            .collect();

        let mut upstream = vec![Vec::new(); fields.len()];
        let mut downstream = vec![Vec::new(); fields.len()];
        for (idx, field) in fields.iter().enumerate() {
            for dependency in field.dependencies() {
                let Some(&dep_idx) = positions.get(dependency) else {
                    return Err(SchemaError::UnknownDependency {
                        field: field.id.to_string(),
                        dependency: dependency.to_string(),
                    });
                };
                if !upstream[idx].contains(&dep_idx) {
                    upstream[idx].push(dep_idx);
                    downstream[dep_idx].push(idx);
                }
            }
        }

        if let Some(cycle) = find_cycle(&upstream) {
            return Err(SchemaError::DependencyCycle {
                path: cycle
                    .into_iter()
                    .map(|idx| fields[idx].id.to_string())
                    .collect(),
            });
        }

        let order = topological_order(&upstream, &downstream);
        let mut rank = vec![0usize; fields.len()];
        for (position, &idx) in order.iter().enumerate() {
            rank[idx] = position;
        }

        let closures = (0..fields.len())
            .map(|idx| {
                let mut reached = dependents_of(idx, &downstream);
                reached.sort_by_key(|&dependent| rank[dependent]);
                reached
            })
            .collect();

        Ok(Self {
            upstream,
            downstream,
            order,
            rank,
            closures,
        })
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn rank(&self, field: usize) -> Option<usize> {
        self.rank.get(field).copied()
    }

    pub fn upstream(&self, field: usize) -> &[usize] {
        self.upstream.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn downstream(&self, field: usize) -> &[usize] {
        self.downstream.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn closure(&self, field: usize) -> &[usize] {
        self.closures.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn find_cycle(upstream: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; upstream.len()];
    let mut stack = Vec::new();
    for start in 0..upstream.len() {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(start, upstream, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: usize,
    upstream: &[Vec<usize>],
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::InProgress;
    stack.push(node);
    for &next in &upstream[node] {
        match marks[next] {
            Mark::InProgress => {
                let start = stack.iter().position(|&entry| entry == next).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, upstream, marks, stack) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }
    stack.pop();
    marks[node] = Mark::Done;
    None
}

fn topological_order(upstream: &[Vec<usize>], downstream: &[Vec<usize>]) -> Vec<usize> {
    let mut remaining: Vec<usize> = upstream.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut order = Vec::with_capacity(upstream.len());
    while let Some(idx) = ready.pop_first() {
        order.push(idx);
        for &dependent in &downstream[idx] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }
    order
}

fn dependents_of(field: usize, downstream: &[Vec<usize>]) -> Vec<usize> {
    let mut seen = vec![false; downstream.len()];
    let mut reached = Vec::new();
    let mut pending = downstream[field].clone();
    while let Some(next) = pending.pop() {
        if seen[next] {
            continue;
        }
        seen[next] = true;
        reached.push(next);
        pending.extend(downstream[next].iter().copied());
    }
    reached
}
