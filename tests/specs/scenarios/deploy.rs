//! Deployment scenarios
//!
//! Drive the engine over a fake scheduler the way the daemon does for
//! `UploadToScheduler` and `UploadJobs`.

use skein_adapters::SchedulerCall;
use skein_core::test_support::{job_with_details, resolved_upstream, tenant};
use skein_core::{PriorityResolver, Tenant, TreePriorityResolver};
use skein_engine::test_helpers::setup;
use tokio_util::sync::CancellationToken;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn upload_reconciles_scheduler_with_project_jobs() {
    let ctx = setup();
    ctx.add_job(job_with_details("j1"));
    ctx.add_job(job_with_details("j3"));
    ctx.scheduler.set_jobs(&tenant(), &["j1", "j2", "j4"]);

    ctx.engine
        .upload_to_scheduler(&CancellationToken::new(), "proj")
        .await
        .unwrap();

    let calls = ctx.scheduler.calls();
    assert!(calls.contains(&SchedulerCall::DeployJobs {
        tenant: tenant(),
        jobs: names(&["j1", "j3"]),
    }));
    assert!(calls.contains(&SchedulerCall::DeleteJobs {
        tenant: tenant(),
        jobs: names(&["j2", "j4"]),
    }));
    assert_eq!(ctx.scheduler.deployed(&tenant()), names(&["j1", "j3"]));
}

#[tokio::test]
async fn second_upload_leaves_the_scheduler_unchanged() {
    let ctx = setup();
    ctx.add_job(job_with_details("j1"));
    ctx.add_job(job_with_details("j3"));
    let cancel = CancellationToken::new();

    ctx.engine.upload_to_scheduler(&cancel, "proj").await.unwrap();
    let first = ctx.scheduler.deployed(&tenant());
    ctx.engine.upload_to_scheduler(&cancel, "proj").await.unwrap();

    assert_eq!(ctx.scheduler.deployed(&tenant()), first);
}

#[tokio::test]
async fn upload_leaves_other_projects_alone() {
    let ctx = setup();
    let other = Tenant::new("other", "ns").unwrap();
    ctx.scheduler.set_jobs(&other, &["foreign"]);
    ctx.add_job(job_with_details("j1"));

    ctx.engine
        .upload_to_scheduler(&CancellationToken::new(), "proj")
        .await
        .unwrap();

    assert_eq!(ctx.scheduler.deployed(&other), names(&["foreign"]));
}

#[test]
fn priorities_decay_by_depth_from_each_root() {
    let job = |name: &str, upstreams: &[&str]| {
        let mut jwd = job_with_details(name);
        jwd.upstreams.upstream_jobs = upstreams
            .iter()
            .map(|u| resolved_upstream(u, tenant()))
            .collect();
        jwd
    };
    let mut jobs = vec![
        job("A", &[]),
        job("B", &["A"]),
        job("C", &["B"]),
        job("D", &[]),
        job("E", &["D"]),
        job("F", &["E"]),
    ];

    TreePriorityResolver.resolve(&mut jobs).unwrap();

    let priority = |name: &str| {
        jobs.iter()
            .find(|j| j.get_name() == name)
            .map(|j| j.priority)
            .unwrap()
    };
    assert_eq!(priority("A"), 10000);
    assert_eq!(priority("D"), 10000);
    assert_eq!(priority("B"), 9990);
    assert_eq!(priority("E"), 9990);
    assert_eq!(priority("C"), 9980);
    assert_eq!(priority("F"), 9980);
}
