use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::pbxproj::{PatchError, Region};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("Xcode project not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Anchor for {0} not found in the manifest: {1:?}")]
    AnchorMissing(Region, String),

    #[error("{resource} is already registered in the manifest")]
    AlreadyRegistered { resource: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Written manifest at {} does not match the patched content", path.display())]
    Verification { path: PathBuf },

    #[error("Invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Patch(PatchError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::NotFound { .. }
            | Error::AnchorMissing(..)
            | Error::Config { .. }
            | Error::Patch(_) => 1,
            Error::Io { .. } | Error::Verification { .. } => 2,
            Error::AlreadyRegistered { .. } => 3,
        }
    }
}

impl From<PatchError> for Error {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::AnchorMissing { region, anchor } => Error::AnchorMissing(region, anchor),
            PatchError::AlreadyRegistered { resource } => Error::AlreadyRegistered { resource },
            other => Error::Patch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let missing = Error::from(PatchError::AnchorMissing {
            region: Region::GroupChildren,
            anchor: "x".to_string(),
        });
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(
            Error::NotFound {
                path: "a".into()
            }
            .exit_code(),
            1
        );
        let io = Error::io("a", std::io::Error::other("disk full"));
        assert_eq!(io.exit_code(), 2);
        let dup = Error::from(PatchError::AlreadyRegistered {
            resource: "a.plist".to_string(),
        });
        assert_eq!(dup.exit_code(), 3);
    }

    #[test]
    fn anchor_missing_message_names_region() {
        let e = Error::from(PatchError::AnchorMissing {
            region: Region::ResourcesBuildPhase,
            anchor: "abc,".to_string(),
        });
        let message = e.to_string();
        assert!(message.contains("resources build phase"), "{message}");
        assert!(message.contains("abc,"), "{message}");
    }
}
