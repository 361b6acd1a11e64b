use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result};

pub(crate) trait ExecuteCommand {
    fn checked_output(&mut self) -> Result<Output>;
}

impl ExecuteCommand for Command {
    /// Runs the command and fails with the tool's own diagnostics when it
    /// exits unsuccessfully. `plutil` reports lint errors on stdout, so stdout
    /// is used when stderr is empty.
    fn checked_output(&mut self) -> Result<Output> {
        let program = self.get_program().to_string_lossy().into_owned();
        let output = self
            .output()
            .with_context(|| format!("Could not run `{}`. Is it installed?", program))?;
        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout)
        } else {
            stderr
        };
        anyhow::bail!(
            "`{}` exited with {}: {}",
            program,
            output.status,
            detail.trim()
        )
    }
}

pub(crate) trait FileSystemExtensions {
    fn dirs_with_extension(&self, ext: &str) -> std::io::Result<Vec<PathBuf>>;
}

impl FileSystemExtensions for Path {
    fn dirs_with_extension(&self, ext: &str) -> std::io::Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(self)?
            .filter_map(|f| f.ok())
            .map(|f| f.path())
            .filter(|p| p.is_dir() && p.extension().is_some_and(|e| e == ext))
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

pub(crate) mod fs {
    use std::io::Write;

    use super::*;
    use crate::error::Error;

    /// Replaces `path` with `content` through a temporary file in the same
    /// directory, so readers see either the old or the new file.
    pub fn write_atomically(path: &Path, content: &[u8]) -> Result<(), Error> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tempfile =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tempfile
            .write_all(content)
            .and_then(|_| tempfile.as_file().sync_all())
            .map_err(|e| Error::io(tempfile.path(), e))?;

        if let Ok(metadata) = std::fs::metadata(path) {
            std::fs::set_permissions(tempfile.path(), metadata.permissions())
                .map_err(|e| Error::io(tempfile.path(), e))?;
        }

        tempfile
            .persist(path)
            .map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_an_error() {
        let err = Command::new("definitely-not-a-real-program-xyz")
            .checked_output()
            .unwrap_err();
        assert!(err.to_string().contains("Is it installed?"));
    }

    #[test]
    fn finds_only_matching_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("App.xcodeproj")).unwrap();
        std::fs::create_dir(dir.path().join("App.xcworkspace")).unwrap();
        std::fs::write(dir.path().join("Other.xcodeproj"), "").unwrap();

        let found = dir.path().dirs_with_extension("xcodeproj").unwrap();
        assert_eq!(found, vec![dir.path().join("App.xcodeproj")]);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        std::fs::write(&path, "old").unwrap();

        fs::write_atomically(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_command_reports_its_output() {
        let err = Command::new("sh")
            .args(["-c", "echo 'project.pbxproj: Unexpected character' ; exit 3"])
            .checked_output()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("`sh` exited with"), "{message}");
        assert!(message.ends_with("project.pbxproj: Unexpected character"), "{message}");
    }
}
