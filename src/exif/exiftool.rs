use std::path::Path;

use super::MetadataCopier;
use crate::error::{Error, Result};

/// Metadata copy through a persistent `exiftool -stay_open` process.
///
/// The process is started once and reused for every copy. It is shut down by
/// [`ExifTool::close`] or, failing that, when the value is dropped.
pub struct ExifTool {
    process: Option<::exiftool::ExifTool>,
}

impl ExifTool {
    /// Launch `exiftool` from `PATH`.
    pub fn new() -> Result<Self> {
        Self::with_executable(Path::new("exiftool"))
    }

    /// Launch `exiftool` from a specific path.
    pub fn with_executable(executable: &Path) -> Result<Self> {
        let process = ::exiftool::ExifTool::with_executable(executable).map_err(|e| {
            Error::MetadataCopy(format!("cannot start {}: {e}", executable.display()))
        })?;
        log::debug!("Started {} in stay-open mode", executable.display());
        Ok(Self {
            process: Some(process),
        })
    }

    /// Leave stay-open mode and reap the process. Copies after this fail.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };
        let result = process
            .close()
            .map_err(|e| Error::MetadataCopy(format!("closing exiftool: {e}")));
        // Dropping kills whatever is left of the process and waits for it.
        drop(process);
        log::debug!("exiftool closed");
        result
    }
}

/// Turn a path into one `-@ -` argument line.
///
/// Arguments travel one per line, so a line break would split the path into
/// extra options, and a leading dash would be read as an option.
fn path_arg(path: &Path) -> Result<&str> {
    let arg = path.to_str().ok_or_else(|| {
        Error::MetadataCopy(format!("{} is not valid UTF-8", path.display()))
    })?;
    if arg.contains(['\n', '\r']) {
        return Err(Error::MetadataCopy(format!("{arg:?} contains a line break")));
    }
    if arg.starts_with('-') {
        return Err(Error::MetadataCopy(format!(
            "{arg:?} would be read as an exiftool option"
        )));
    }
    Ok(arg)
}

/// exiftool reports a copy it could not write as a summary line, not always on stderr.
fn check_copy(stdout: &[String]) -> Result<()> {
    if stdout
        .iter()
        .any(|l| l.contains("weren't updated") || l.trim() == "0 image files updated")
    {
        return Err(Error::MetadataCopy(stdout.join("; ")));
    }
    Ok(())
}

impl MetadataCopier for ExifTool {
    fn name(&self) -> &str {
        "exiftool"
    }

    fn copy_all_metadata(&mut self, source: &Path, destination: &Path) -> Result<()> {
        let source = path_arg(source)?;
        let destination = path_arg(destination)?;
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| Error::MetadataCopy("exiftool already closed".into()))?;

        let stdout = process
            .execute_lines(&[
                "-tagsFromFile",
                source,
                "-all:all",
                "-overwrite_original",
                destination,
            ])
            .map_err(|e| Error::MetadataCopy(e.to_string()))?;
        check_copy(&stdout)
    }

    fn close(&mut self) -> Result<()> {
        ExifTool::close(self)
    }
}
