//! Metadata carry-over from the original photo onto the generated result.
//!
//! Two backends implement [`MetadataCopier`]:
//!
//! - [`ExifTool`] - a long-lived `exiftool -stay_open` process, started once per run
//! - [`NativeCopier`] - copies the EXIF and ICC segments between JPEG files in-process
//!
//! Use [`open_copier`] to build the configured backend. Copy failures are meant to be
//! logged by the caller, never to abort a job.

mod exiftool;
mod native;

pub use self::exiftool::ExifTool;
pub use self::native::NativeCopier;

use std::path::Path;

use crate::config::{MetadataBackend, MetadataConfig};
use crate::error::Result;

/// Copies every metadata tag from one image file onto another.
pub trait MetadataCopier {
    /// The display name of this backend.
    fn name(&self) -> &str;

    /// Copy all tags from `source` onto `destination`, rewriting `destination` in place.
    fn copy_all_metadata(&mut self, source: &Path, destination: &Path) -> Result<()>;

    /// Release any external resource held by the backend.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the configured metadata backend.
///
/// If `exiftool` cannot be started, falls back to [`NativeCopier`] with a warning.
pub fn open_copier(config: &MetadataConfig) -> Box<dyn MetadataCopier> {
    match config.backend {
        MetadataBackend::Native => Box::new(NativeCopier),
        MetadataBackend::Exiftool => match ExifTool::with_executable(&config.exiftool_path) {
            Ok(tool) => Box::new(tool),
            Err(e) => {
                log::warn!("{e}; falling back to native EXIF copy");
                Box::new(NativeCopier)
            }
        },
    }
}
