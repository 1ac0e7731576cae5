use serde::{Deserialize, Serialize};
use std::fmt;

/// FHIR specification release a generated model was built from.
///
/// # Supported Versions
///
/// - **R4**: FHIR 4.0.x (normative)
/// - **R4B**: FHIR 4.3.x
/// - **R5**: FHIR 5.0.x
/// - **R6**: FHIR 6.x (draft)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FhirVersion {
    R4,
    R4B,
    R5,
    R6,
}

impl FhirVersion {
    /// Maps a full version string such as `4.0.1-9346c8cc45` onto a release.
    ///
    /// Returns `None` for versions that are not one of the known releases.
    pub fn from_version_string(version: &str) -> Option<Self> {
        let version = version.trim();
        let mut parts = version.split(['.', '-']);
        let major = parts.next()?;
        let minor = parts.next().unwrap_or("0");
        match (major, minor) {
            ("4", "0") => Some(FhirVersion::R4),
            ("4", "3") => Some(FhirVersion::R4B),
            ("5", _) => Some(FhirVersion::R5),
            ("6", _) => Some(FhirVersion::R6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "R4",
            FhirVersion::R4B => "R4B",
            FhirVersion::R5 => "R5",
            FhirVersion::R6 => "R6",
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
