// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `skein deploy` - push compiled DAGs to the scheduler

use anyhow::Result;
use clap::Args;

use crate::args::TenantArgs;
use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub tenant: TenantArgs,

    /// Jobs to deploy; with none, every job of the project is deployed
    #[arg(long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,

    /// Jobs to remove from the scheduler (needs --namespace)
    #[arg(long = "delete", value_name = "NAME")]
    pub delete: Vec<String>,
}

impl DeployArgs {
    /// Named jobs go through the per-namespace upload.
    pub fn is_selective(&self) -> bool {
        !self.jobs.is_empty() || !self.delete.is_empty()
    }
}

pub async fn handle(args: DeployArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let project = args.tenant.project()?;

    if !args.is_selective() {
        client.upload_to_scheduler(&project).await?;
        return match format {
            OutputFormat::Text => {
                println!("Deploy of project {} accepted", project);
                Ok(())
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "project": project,
                "accepted": true,
            })),
        };
    }

    let namespace = args.tenant.namespace()?;
    let deployed = args.jobs.len();
    let deleted = args.delete.len();
    client
        .upload_jobs(&project, &namespace, args.jobs, args.delete)
        .await?;

    match format {
        OutputFormat::Text => {
            println!(
                "Deployed {} job(s), deleted {} job(s) in {}/{}",
                deployed, deleted, project, namespace
            );
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "project": project,
            "namespace": namespace,
            "deployed": deployed,
            "deleted": deleted,
        })),
    }
}
