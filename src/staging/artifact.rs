//! Artifact coordinates resolved once, before the run starts.

use crate::error::{Result, StagingError};
use std::path::{Path, PathBuf};

/// A file to stage together with its Maven coordinates.
///
/// Coordinates are fixed at construction; upload URLs and companion files are
/// derived from this record rather than re-parsed from file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    group_path: Vec<String>,
    artifact_id: String,
    version: String,
    local_path: PathBuf,
    file_name: String,
}

impl Artifact {
    /// Creates an artifact from explicit coordinates.
    pub fn new(
        group_id: &str,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        local_path: PathBuf,
    ) -> Result<Self> {
        let artifact_id = artifact_id.into();
        let version = version.into();

        let group_path: Vec<String> = group_id.split('.').map(str::to_string).collect();
        if group_path.iter().any(|segment| segment.trim().is_empty()) {
            return Err(invalid(&local_path, format!("malformed group id '{}'", group_id)));
        }
        if artifact_id.is_empty() || version.is_empty() {
            return Err(invalid(&local_path, "artifact id and version must be set"));
        }

        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid(&local_path, "path has no UTF-8 file name"))?
            .to_string();

        Ok(Self {
            group_path,
            artifact_id,
            version,
            local_path,
            file_name,
        })
    }

    /// Creates an artifact from a Maven-style file name
    /// (`{artifactId}-{version}[-{classifier}].{ext}`) for a known version.
    pub fn from_file(group_id: &str, version: &str, local_path: PathBuf) -> Result<Self> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid(&local_path, "path has no UTF-8 file name"))?;

        let marker = format!("-{}", version);
        let artifact_id = file_name
            .match_indices(&marker)
            .find(|(idx, _)| {
                let rest = &file_name[idx + marker.len()..];
                rest.starts_with('.') || rest.starts_with('-')
            })
            .map(|(idx, _)| &file_name[..idx])
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                invalid(
                    &local_path,
                    format!("file name does not follow <artifactId>-{}<suffix>", version),
                )
            })?
            .to_string();

        Self::new(group_id, artifact_id, version, local_path)
    }

    /// Companion file (`.asc`, `.md5`, `.sha1`) written at `local_path`,
    /// uploaded under the same coordinates as `<file>.<extension>`.
    pub fn sidecar(&self, extension: &str, local_path: PathBuf) -> Self {
        Self {
            group_path: self.group_path.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            local_path,
            file_name: format!("{}.{}", self.file_name, extension),
        }
    }

    pub fn group_path(&self) -> &[String] {
        &self.group_path
    }

    pub fn group_id(&self) -> String {
        self.group_path.join(".")
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Extension of the main artifact for a POM `<packaging>`, `None` for
/// POM-only projects.
pub fn main_extension(packaging: &str) -> Option<&'static str> {
    match packaging.trim() {
        "pom" => None,
        "war" => Some("war"),
        "ear" => Some("ear"),
        "aar" => Some("aar"),
        "rar" => Some("rar"),
        // jar, bundle, maven-plugin, ejb ...
        _ => Some("jar"),
    }
}

/// Discovers the standard Maven Central file set in upload order.
///
/// The POM comes first, then the main artifact for `packaging`, then
/// sources and javadoc jars when present. POM and main artifact are required.
pub fn discover_artifacts(
    dir: &Path,
    group_id: &str,
    artifact_id: &str,
    version: &str,
    packaging: &str,
) -> Result<Vec<Artifact>> {
    let base = format!("{}-{}", artifact_id, version);
    let mut candidates = vec![(format!("{}.pom", base), true)];
    if let Some(extension) = main_extension(packaging) {
        candidates.push((format!("{}.{}", base, extension), true));
        candidates.push((format!("{}-sources.jar", base), false));
        candidates.push((format!("{}-javadoc.jar", base), false));
    }

    let mut artifacts = Vec::new();
    for (file_name, required) in candidates {
        let path = dir.join(&file_name);
        if path.is_file() {
            log::debug!("Found artifact: {}", path.display());
            artifacts.push(Artifact::new(group_id, artifact_id, version, path)?);
        } else if required {
            return Err(invalid(&path, "required artifact is missing"));
        } else {
            log::warn!("Optional artifact not found: {}", path.display());
        }
    }

    Ok(artifacts)
}

fn invalid(path: &Path, reason: impl Into<String>) -> StagingError {
    StagingError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_file_keeps_dotted_artifact_ids() {
        let artifact = Artifact::from_file(
            "com.cloudblue",
            "18.0",
            PathBuf::from("_build/java/connect.sdk-18.0-sources.jar"),
        )
        .unwrap();
        assert_eq!(artifact.artifact_id(), "connect.sdk");
        assert_eq!(artifact.version(), "18.0");
        assert_eq!(artifact.group_path(), ["com", "cloudblue"]);
        assert_eq!(artifact.file_name(), "connect.sdk-18.0-sources.jar");
    }

    #[test]
    fn from_file_rejects_mismatched_version() {
        let err = Artifact::from_file("com.example", "2.0.0", PathBuf::from("lib-1.0.0.jar"));
        assert!(matches!(err, Err(StagingError::InvalidArtifact { .. })));
    }

    #[test]
    fn sidecar_keeps_coordinates_and_appends_extension() {
        let artifact =
            Artifact::from_file("com.example", "1.0.0", PathBuf::from("/out/lib-1.0.0.pom"))
                .unwrap();
        let sig = artifact.sidecar("asc", PathBuf::from("/tmp/sig/lib-1.0.0.pom.asc"));
        assert_eq!(sig.file_name(), "lib-1.0.0.pom.asc");
        assert_eq!(sig.local_path(), Path::new("/tmp/sig/lib-1.0.0.pom.asc"));
        assert_eq!(sig.artifact_id(), "lib");
        assert_eq!(sig.group_path(), ["com", "example"]);
    }

    #[test]
    fn discovery_orders_pom_first_and_skips_optional() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["lib-1.0.0.jar", "lib-1.0.0.pom", "lib-1.0.0-javadoc.jar"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let artifacts =
            discover_artifacts(dir.path(), "com.example", "lib", "1.0.0", "jar").unwrap();
        let names: Vec<_> = artifacts.iter().map(Artifact::file_name).collect();
        assert_eq!(names, ["lib-1.0.0.pom", "lib-1.0.0.jar", "lib-1.0.0-javadoc.jar"]);
    }

    #[test]
    fn discovery_follows_packaging() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["app-2.0.pom", "app-2.0.war", "app-2.0.jar"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let war = discover_artifacts(dir.path(), "com.example", "app", "2.0", "war").unwrap();
        let names: Vec<_> = war.iter().map(Artifact::file_name).collect();
        assert_eq!(names, ["app-2.0.pom", "app-2.0.war"]);

        let pom_only = discover_artifacts(dir.path(), "com.example", "app", "2.0", "pom").unwrap();
        let names: Vec<_> = pom_only.iter().map(Artifact::file_name).collect();
        assert_eq!(names, ["app-2.0.pom"]);
    }

    #[test]
    fn discovery_requires_main_jar() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib-1.0.0.pom"), b"x").unwrap();
        assert!(discover_artifacts(dir.path(), "com.example", "lib", "1.0.0", "jar").is_err());
    }
}
