// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skein_core::test_support::job_with_details;
use skein_core::ErrorKind;

#[test]
fn upsert_and_get_job() {
    let mut state = MaterializedState::default();
    state.upsert_job(job_with_details("job-a"), now());
    let job = state.get_job("proj", "job-a").unwrap();
    assert_eq!(job.get_name(), "job-a");
    assert!(state.jobs.contains_key("proj/job-a"));
}

#[test]
fn upsert_replaces_existing_job() {
    let mut state = MaterializedState::default();
    state.upsert_job(job_with_details("job-a"), now());
    let mut updated = job_with_details("job-a");
    updated.priority = 42;
    state.upsert_job(updated, at("2023-01-02T00:00:00Z"));

    assert_eq!(state.jobs.len(), 1);
    assert_eq!(state.get_job("proj", "job-a").unwrap().priority, 42);
    assert_eq!(state.jobs["proj/job-a"].created_at, now());
}

#[test]
fn missing_job_is_not_found() {
    let state = MaterializedState::default();
    let err = state.get_job("proj", "ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "job ghost not found in project proj");
}

#[test]
fn jobs_for_project_does_not_leak_prefix_matches() {
    let mut state = MaterializedState::default();
    state.upsert_job(job_with_details("job-a"), now());
    state.upsert_job(job_with_details("job-b"), now());
    let mut other = job_with_details("job-c");
    other.job.tenant = Tenant::new("proj-2", "ns").unwrap();
    state.upsert_job(other, now());

    let names: Vec<String> = state
        .jobs_for_project("proj")
        .iter()
        .map(|j| j.get_name().to_string())
        .collect();
    assert_eq!(names, vec!["job-a", "job-b"]);
    assert_eq!(state.jobs_for_project("proj-2").len(), 1);
}

#[test]
fn jobs_by_names_skips_unknown() {
    let mut state = MaterializedState::default();
    state.upsert_job(job_with_details("job-a"), now());
    let jobs = state.jobs_by_names("proj", &["job-a".to_string(), "ghost".to_string()]);
    assert_eq!(jobs.len(), 1);
}

#[test]
fn delete_job() {
    let mut state = MaterializedState::default();
    state.upsert_job(job_with_details("job-a"), now());
    assert_eq!(state.delete_job("proj", "job-a").unwrap().get_name(), "job-a");
    assert!(state.get_job("proj", "job-a").is_err());
    assert!(state.delete_job("proj", "job-a").is_err());
}
