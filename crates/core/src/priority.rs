// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler priority weights derived from the job dependency graph.
//!
//! Jobs that others depend on run first: every root of the graph gets
//! [`MAX_PRIORITY_WEIGHT`] and each level below loses
//! [`PRIORITY_WEIGHT_GAP`]. A job reachable along several paths takes the
//! weight of its deepest level.

use crate::dag::MultiRootDag;
use crate::job::JobWithDetails;
use crate::{Entity, Error, Result};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};

/// Floor for weights; matches the scheduler's default priority
pub const MIN_PRIORITY_WEIGHT: i32 = 1;
pub const MAX_PRIORITY_WEIGHT: i32 = 10000;
pub const PRIORITY_WEIGHT_GAP: i32 = 10;

/// Assigns `priority` to every job of one tenant.
pub trait PriorityResolver: Send + Sync {
    fn resolve(&self, jobs: &mut [JobWithDetails]) -> Result<()>;
}

/// Breadth-first weighting over the multi-root dependency tree
#[derive(Debug, Clone, Copy, Default)]
pub struct TreePriorityResolver;

impl PriorityResolver for TreePriorityResolver {
    fn resolve(&self, jobs: &mut [JobWithDetails]) -> Result<()> {
        resolve_tree(jobs).map_err(|e| {
            Error::internal(
                Entity::PriorityResolver,
                format!("error occurred while resolving priority: {e}"),
            )
        })
    }
}

fn resolve_tree(jobs: &mut [JobWithDetails]) -> std::result::Result<(), String> {
    let dag = build_dependency_tree(jobs)?;
    let weights = assign_weights(&dag);

    for job in jobs.iter_mut() {
        let weight = weights
            .get(job.get_name())
            .ok_or_else(|| format!("{}: priority weight not found", job.name))?;
        job.priority = *weight;
    }
    Ok(())
}

/// One node per job plus a placeholder for every upstream outside the set.
///
/// Edges point from upstream to dependent, so the roots are jobs without
/// resolved upstreams and the placeholders.
fn build_dependency_tree(jobs: &[JobWithDetails]) -> std::result::Result<MultiRootDag<()>, String> {
    let mut dag = MultiRootDag::new();
    for job in jobs {
        dag.add_node_if_not_exist(job.get_name(), ());
    }
    for job in jobs {
        for upstream in job.upstreams.resolved_job_names() {
            dag.add_node_if_not_exist(upstream, ());
            dag.connect(upstream, job.get_name())
                .map_err(|e| e.to_string())?;
        }
    }
    dag.is_cyclic().map_err(|e| e.to_string())?;
    Ok(dag)
}

fn assign_weights(dag: &MultiRootDag<()>) -> HashMap<String, i32> {
    let mut weights = HashMap::with_capacity(dag.len());
    let mut layer: IndexSet<&str> = dag.root_nodes().into_iter().collect();
    let mut weight = MAX_PRIORITY_WEIGHT;

    while !layer.is_empty() {
        let mut next = IndexSet::new();
        for name in &layer {
            weights.insert(name.to_string(), weight.max(MIN_PRIORITY_WEIGHT));
            next.extend(dag.children(name));
        }
        layer = next;
        weight -= PRIORITY_WEIGHT_GAP;
    }
    weights
}

/// Weight from the number of same-tenant upstreams, ignoring depth
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePriorityResolver;

impl PriorityResolver for SimplePriorityResolver {
    fn resolve(&self, jobs: &mut [JobWithDetails]) -> Result<()> {
        let names: HashSet<String> = jobs.iter().map(|j| j.get_name().to_string()).collect();
        for job in jobs.iter_mut() {
            let tenant = job.tenant().clone();
            let count = job
                .upstreams
                .resolved()
                .filter(|u| u.tenant == tenant && names.contains(&u.job_name))
                .count();
            let count = i32::try_from(count).unwrap_or(i32::MAX);
            job.priority = MAX_PRIORITY_WEIGHT
                .saturating_sub(PRIORITY_WEIGHT_GAP.saturating_mul(count))
                .max(MIN_PRIORITY_WEIGHT);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod tests;
