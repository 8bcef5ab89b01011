//! Coordinates discovery from a Maven POM

use crate::error::{CliError, Result, StagingError};
use roxmltree::Node;
use std::path::{Path, PathBuf};

/// Project coordinates extracted from a `.pom` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomMetadata {
    /// `groupId`, falling back to the parent's
    pub group_id: String,

    /// `artifactId`
    pub artifact_id: String,

    /// `version`, falling back to the parent's
    pub version: String,

    /// `packaging`, `jar` when absent
    pub packaging: String,
}

/// Load coordinates from a POM file (single read + parse)
///
/// Elements are matched by local name, so both namespaced
/// (`http://maven.apache.org/POM/4.0.0`) and bare POMs are accepted.
pub fn load_pom(pom_path: &Path) -> Result<PomMetadata> {
    // Step 1: Read file once
    let contents = std::fs::read_to_string(pom_path).map_err(|e| {
        StagingError::Cli(CliError::ExecutionFailed {
            command: "read_pom".to_string(),
            reason: format!("Failed to read {}: {}", pom_path.display(), e),
        })
    })?;

    // Step 2: Parse XML once
    let doc = roxmltree::Document::parse(&contents).map_err(|e| {
        StagingError::Cli(CliError::ExecutionFailed {
            command: "parse_pom".to_string(),
            reason: format!("Failed to parse {}: {}", pom_path.display(), e),
        })
    })?;

    let project = doc.root_element();
    if !project.has_tag_name("project") {
        return Err(invalid(pom_path, "root element is not <project>"));
    }
    let parent = child(project, "parent");

    // Step 3: Extract coordinates from parsed XML (no additional I/O)
    let group_id = child_text(project, "groupId")
        .or_else(|| parent.and_then(|p| child_text(p, "groupId")))
        .ok_or_else(|| invalid(pom_path, "missing <groupId>"))?;

    let artifact_id =
        child_text(project, "artifactId").ok_or_else(|| invalid(pom_path, "missing <artifactId>"))?;

    let version = child_text(project, "version")
        .or_else(|| parent.and_then(|p| child_text(p, "version")))
        .ok_or_else(|| invalid(pom_path, "missing <version>"))?;

    let packaging = child_text(project, "packaging").unwrap_or_else(|| "jar".to_string());

    log::debug!(
        "POM {}: {}:{}:{} ({})",
        pom_path.display(),
        group_id,
        artifact_id,
        version,
        packaging
    );

    Ok(PomMetadata {
        group_id,
        artifact_id,
        version,
        packaging,
    })
}

/// Find the POM to read coordinates from.
///
/// With a known artifact id and version the conventional
/// `<artifactId>-<version>.pom` is used; otherwise the directory must hold
/// exactly one `.pom` file.
pub fn find_pom(dir: &Path, artifact_id: Option<&str>, version: Option<&str>) -> Result<PathBuf> {
    if let (Some(artifact_id), Some(version)) = (artifact_id, version) {
        let path = dir.join(format!("{}-{}.pom", artifact_id, version));
        return if path.is_file() {
            Ok(path)
        } else {
            Err(invalid(&path, "POM not found"))
        };
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        StagingError::Cli(CliError::InvalidArguments {
            reason: format!("Cannot read artifact directory {}: {}", dir.display(), e),
        })
    })?;

    let mut poms: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "pom"))
        .filter(|path| {
            version.is_none_or(|v| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.contains(v))
            })
        })
        .collect();
    poms.sort();

    match poms.len() {
        1 => Ok(poms.remove(0)),
        0 => Err(StagingError::Cli(CliError::InvalidArguments {
            reason: format!("No .pom file found in {}", dir.display()),
        })),
        n => Err(StagingError::Cli(CliError::InvalidArguments {
            reason: format!(
                "Found {} .pom files in {}; pass --artifact-id and --version",
                n,
                dir.display()
            ),
        })),
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

fn invalid(path: &Path, reason: &str) -> StagingError {
    StagingError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
