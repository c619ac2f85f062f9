//! Locating the terraform executable and checking its version.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, TerraformError};

/// Fallback install locations checked when `terraform` is not on `PATH`.
pub const FALLBACK_LOCATIONS: &[&str] = &["/usr/local/bin/terraform", "/opt/homebrew/bin/terraform"];

/// Oldest supported release, as `(major, minor)`.
pub const MINIMUM_VERSION: (u32, u32) = (0, 12);

/// Finds the terraform binary.
///
/// An explicit path wins; otherwise `PATH` is searched, then the
/// [`FALLBACK_LOCATIONS`].
///
/// # Errors
///
/// Returns [`TerraformError::BinaryNotFound`] if nothing is found.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        debug!("Using configured terraform binary: {}", path.display());
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = which::which("terraform") {
        debug!("Found terraform in PATH: {}", path.display());
        return Ok(path);
    }

    FALLBACK_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .ok_or_else(|| TerraformError::BinaryNotFound.into())
}

/// A parsed `terraform version` number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TerraformVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version, 0 if absent.
    pub patch: u32,
}

impl TerraformVersion {
    /// Parses the first line of `terraform version` output, e.g.
    /// `Terraform v1.11.2`.
    ///
    /// # Errors
    ///
    /// Returns [`TerraformError::UnparseableVersion`] if no version is found.
    pub fn parse(output: &str) -> Result<Self> {
        let unparseable = || TerraformError::UnparseableVersion {
            output: output.trim().to_string(),
        };

        let rest = output
            .split_once("Terraform v")
            .map(|(_, rest)| rest)
            .ok_or_else(unparseable)?;
        let number = rest.split_whitespace().next().ok_or_else(unparseable)?;
        // Drop pre-release suffixes such as `1.6.0-beta1`.
        let number = number.split('-').next().unwrap_or(number);

        let mut parts = number.split('.').map(str::parse::<u32>);
        let major = parts.next().and_then(|p| p.ok()).ok_or_else(unparseable)?;
        let minor = parts.next().and_then(|p| p.ok()).ok_or_else(unparseable)?;
        let patch = parts.next().and_then(|p| p.ok()).unwrap_or(0);

        Ok(Self { major, minor, patch })
    }

    /// Returns true if this release is recent enough.
    #[must_use]
    pub fn is_supported(self) -> bool {
        (self.major, self.minor) >= MINIMUM_VERSION
    }

    /// Fails unless this release is recent enough.
    ///
    /// # Errors
    ///
    /// Returns [`TerraformError::UnsupportedVersion`] for releases before 0.12.
    pub fn ensure_supported(self) -> Result<Self> {
        if self.is_supported() {
            info!("Using Terraform v{self}");
            Ok(self)
        } else {
            Err(TerraformError::UnsupportedVersion {
                version: self.to_string(),
            }
            .into())
        }
    }
}

impl fmt::Display for TerraformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;

    #[test]
    fn test_explicit_binary_wins() {
        let path = locate(Some(Path::new("/custom/terraform"))).unwrap();
        assert_eq!(path, PathBuf::from("/custom/terraform"));
    }

    #[test]
    fn test_parse_modern_version() {
        let output = "Terraform v1.11.2\non linux_amd64\n+ provider registry.terraform.io/hashicorp/aws v5.0.0\n";
        let version = TerraformVersion::parse(output).unwrap();
        assert_eq!(
            version,
            TerraformVersion {
                major: 1,
                minor: 11,
                patch: 2
            }
        );
        assert!(version.is_supported());
    }

    #[test]
    fn test_parse_prerelease_and_short_versions() {
        let version = TerraformVersion::parse("Terraform v1.6.0-beta1").unwrap();
        assert_eq!((version.major, version.minor), (1, 6));

        let version = TerraformVersion::parse("Terraform v0.12").unwrap();
        assert_eq!(version.patch, 0);
        assert!(version.is_supported());
    }

    #[test]
    fn test_old_versions_rejected() {
        let version = TerraformVersion::parse("Terraform v0.11.14").unwrap();
        assert!(!version.is_supported());
        assert!(matches!(
            version.ensure_supported(),
            Err(StepError::Terraform(TerraformError::UnsupportedVersion { .. }))
        ));
    }

    #[test]
    fn test_unparseable_output() {
        for output in ["OpenTofu v1.6.0", "Terraform vX.Y", ""] {
            assert!(matches!(
                TerraformVersion::parse(output),
                Err(StepError::Terraform(TerraformError::UnparseableVersion { .. }))
            ));
        }
    }
}
