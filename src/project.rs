use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifier::IdentifierGenerator;
use crate::pbxproj::{count_references, Patcher, Registration, ResourceEntry};
use crate::utils::*;

pub const MANIFEST_FILE_NAME: &str = "project.pbxproj";

/// An Xcode project descriptor loaded into memory.
#[derive(Debug)]
pub struct XcodeProject {
    pub manifest_path: PathBuf,
    pub manifest: String,
}

impl XcodeProject {
    /// Accepts the `project.pbxproj` file itself, an `.xcodeproj` bundle, or a
    /// directory that contains exactly one `.xcodeproj` bundle.
    pub fn locate(path: &Path) -> Result<PathBuf> {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        if !path.is_dir() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }

        let bundle = if path.extension().is_some_and(|e| e == "xcodeproj") {
            path.to_path_buf()
        } else {
            let bundles = path
                .dirs_with_extension("xcodeproj")
                .map_err(|e| Error::io(path, e))?;
            match bundles.as_slice() {
                [only] => only.clone(),
                _ => {
                    debug!("Found {} xcodeproj bundles in {}", bundles.len(), path.display());
                    return Err(Error::NotFound {
                        path: path.join(format!("*.xcodeproj/{}", MANIFEST_FILE_NAME)),
                    });
                }
            }
        };

        let manifest_path = bundle.join(MANIFEST_FILE_NAME);
        if manifest_path.is_file() {
            Ok(manifest_path)
        } else {
            Err(Error::NotFound {
                path: manifest_path,
            })
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let manifest_path = Self::locate(path)?;
        let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound {
                path: manifest_path.clone(),
            },
            _ => Error::io(&manifest_path, e),
        })?;
        debug!(
            "Read {} bytes from {}",
            manifest.len(),
            manifest_path.display()
        );
        Ok(Self {
            manifest_path,
            manifest,
        })
    }

    /// Patches the in-memory manifest. Nothing is written.
    pub fn register<G>(
        &mut self,
        patcher: &Patcher,
        resource: &ResourceEntry,
        ids: &mut G,
    ) -> Result<Registration>
    where
        G: IdentifierGenerator + ?Sized,
    {
        let registration = patcher.register(&self.manifest, resource, ids)?;
        self.manifest.clone_from(&registration.manifest);
        Ok(registration)
    }

    /// Writes the manifest back and re-reads it to make sure the file holds
    /// exactly the patched text.
    pub fn save(&self) -> Result<()> {
        fs::write_atomically(&self.manifest_path, self.manifest.as_bytes())?;
        info!("Wrote {}", self.manifest_path.display());

        let written = std::fs::read(&self.manifest_path)
            .map_err(|e| Error::io(&self.manifest_path, e))?;
        if written != self.manifest.as_bytes() {
            return Err(Error::Verification {
                path: self.manifest_path.clone(),
            });
        }
        Ok(())
    }

    pub fn count_references(&self, name: &str) -> usize {
        count_references(&self.manifest, name)
    }

    /// Runs `plutil -lint` on the manifest file.
    pub fn lint(&self) -> anyhow::Result<()> {
        Command::new("plutil")
            .arg("-lint")
            .arg(&self.manifest_path)
            .checked_output()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xcodeproj(root: &Path, name: &str) -> PathBuf {
        let bundle = root.join(name);
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(MANIFEST_FILE_NAME), "{}\n").unwrap();
        bundle.join(MANIFEST_FILE_NAME)
    }

    #[test]
    fn locates_manifest_from_file_bundle_or_parent() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = xcodeproj(dir.path(), "App.xcodeproj");

        assert_eq!(XcodeProject::locate(&manifest).unwrap(), manifest);
        assert_eq!(
            XcodeProject::locate(&dir.path().join("App.xcodeproj")).unwrap(),
            manifest
        );
        assert_eq!(XcodeProject::locate(dir.path()).unwrap(), manifest);
    }

    #[test]
    fn ambiguous_parent_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        xcodeproj(dir.path(), "App.xcodeproj");
        xcodeproj(dir.path(), "Other.xcodeproj");

        let err = XcodeProject::locate(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = XcodeProject::open(&dir.path().join("nope.pbxproj")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn bundle_without_manifest_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("App.xcodeproj")).unwrap();
        let err = XcodeProject::locate(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
