//! `deploy`: stage, close and optionally release one artifact set.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::{DeployArgs, RuntimeConfig};
use crate::error::{Result, StagingError};
use crate::metadata::{self, PomMetadata};
use crate::staging::{Artifact, GpgSigner, StagingWorkflow, discover_artifacts};

/// Resolved Maven coordinates for the run
#[derive(Debug)]
struct Coordinates {
    group_id: String,
    artifact_id: String,
    version: String,
    packaging: String,
}

/// Execute the deploy command
pub async fn deploy(
    args: &DeployArgs,
    runtime_config: &RuntimeConfig,
    cancel: CancellationToken,
) -> Result<i32> {
    let coordinates = resolve_coordinates(args)?;
    runtime_config.section(&format!(
        "Staging {}:{}:{}",
        coordinates.group_id, coordinates.artifact_id, coordinates.version
    ))?;

    let artifacts = collect_artifacts(args, &coordinates)?;
    for artifact in &artifacts {
        runtime_config.indent(&artifact.local_path().display().to_string())?;
    }

    let profile_name = args
        .profile_name
        .clone()
        .unwrap_or_else(|| coordinates.group_id.clone());

    let mut builder = super::service_config(&args.service)
        .profile_name(profile_name)
        .poll(args.poll_settings())
        .deadline(args.deadline());
    if let Some(description) = &args.description {
        builder = builder.description(description.clone());
    }
    let config = builder.build()?;

    let client = super::http_client(&args.service)?;
    let signer = GpgSigner::detect(args.passphrase.clone())?.with_key_id(args.key_id.clone());

    let mut workflow = StagingWorkflow::new(config, Arc::new(client), Arc::new(signer))
        .with_cancellation(cancel);

    runtime_config.progress("Uploading artifacts and closing the staging repository...")?;
    let staged = match workflow.run(&artifacts).await {
        Ok(staged) => staged,
        Err(e) => {
            report_leftover(&workflow, runtime_config)?;
            return Err(e);
        }
    };

    runtime_config.success_println(&format!(
        "Repository {} closed (profile {})",
        staged.repository_id, staged.profile_id
    ))?;

    if !args.release {
        runtime_config.indent(&format!(
            "Release it with: release --profile-id {} --repository-id {}",
            staged.profile_id, staged.repository_id
        ))?;
        return Ok(0);
    }

    runtime_config.progress("Releasing repository...")?;
    if let Err(e) = workflow.promote(&staged).await {
        report_leftover(&workflow, runtime_config)?;
        return Err(e);
    }
    runtime_config.success_println(&format!("Repository {} released", staged.repository_id))?;

    Ok(0)
}

/// Fills coordinates missing from the arguments from the POM.
fn resolve_coordinates(args: &DeployArgs) -> Result<Coordinates> {
    if let (Some(group_id), Some(artifact_id), Some(version)) =
        (&args.group_id, &args.artifact_id, &args.version)
    {
        return Ok(Coordinates {
            group_id: group_id.clone(),
            artifact_id: artifact_id.clone(),
            version: version.clone(),
            packaging: "jar".to_string(),
        });
    }

    let pom_path = metadata::find_pom(
        &args.artifact_dir,
        args.artifact_id.as_deref(),
        args.version.as_deref(),
    )?;
    let PomMetadata {
        group_id,
        artifact_id,
        version,
        packaging,
    } = metadata::load_pom(&pom_path)?;

    Ok(Coordinates {
        group_id: args.group_id.clone().unwrap_or(group_id),
        artifact_id: args.artifact_id.clone().unwrap_or(artifact_id),
        version: args.version.clone().unwrap_or(version),
        packaging,
    })
}

/// Explicit `--file` arguments in order, or the conventional file set.
fn collect_artifacts(args: &DeployArgs, coordinates: &Coordinates) -> Result<Vec<Artifact>> {
    if args.files.is_empty() {
        return discover_artifacts(
            &args.artifact_dir,
            &coordinates.group_id,
            &coordinates.artifact_id,
            &coordinates.version,
            &coordinates.packaging,
        );
    }

    args.files
        .iter()
        .map(|file| {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                args.artifact_dir.join(file)
            };
            if !path.is_file() {
                return Err(StagingError::InvalidArtifact {
                    path,
                    reason: "file not found".to_string(),
                });
            }
            Artifact::from_file(&coordinates.group_id, &coordinates.version, path)
        })
        .collect()
}

fn report_leftover(workflow: &StagingWorkflow, runtime_config: &RuntimeConfig) -> Result<()> {
    if let Some(staged) = workflow.opened_repository() {
        runtime_config.warn(&format!(
            "Staging repository {} is still present on the service; drop or release it manually",
            staged.repository_id
        ))?;
    }
    Ok(())
}
