//! `release`: promote a repository closed by an earlier `deploy`.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::{ReleaseArgs, RuntimeConfig};
use crate::error::Result;
use crate::staging::{StagedRepository, StagingWorkflow};

/// Execute the release command
pub async fn release(
    args: &ReleaseArgs,
    runtime_config: &RuntimeConfig,
    cancel: CancellationToken,
) -> Result<i32> {
    let config = super::service_config(&args.service)
        .description(args.description.clone())
        .build()?;
    let client = super::http_client(&args.service)?;

    let mut workflow =
        StagingWorkflow::for_release(config, Arc::new(client)).with_cancellation(cancel);

    let staged = StagedRepository {
        profile_id: args.profile_id.clone(),
        repository_id: args.repository_id.clone(),
    };

    runtime_config.progress(&format!("Checking repository {}...", staged.repository_id))?;
    workflow.attach(staged.clone()).await?;
    runtime_config.verbose_println(&format!("Repository {} is closed", staged.repository_id))?;

    runtime_config.progress("Releasing repository...")?;
    workflow.promote(&staged).await?;
    runtime_config.success_println(&format!("Repository {} released", staged.repository_id))?;

    Ok(0)
}
