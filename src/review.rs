//! The per-file review loop: generate, save, ask, and either stop or go again.

use serde::Serialize;
use std::fmt;

use crate::ai::EditService;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::exif::MetadataCopier;
use crate::pipeline::{self, Job};
use crate::prompt::{MenuChoice, Prompter};

/// Where the working image and prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    /// Original input bytes with the base prompt.
    Original,
    /// Last generated image with the accumulated comments.
    Continuation,
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("from original"),
            Self::Continuation => f.write_str("refining last result"),
        }
    }
}

/// The (image, MIME type, prompt) sent with the next edit request.
///
/// Only constructible through [`WorkingContext::fresh`] and
/// [`WorkingContext::continue_from`], so image and prompt always share a lineage.
#[derive(Debug, Clone)]
pub struct WorkingContext {
    image: Vec<u8>,
    mime_type: String,
    prompt: String,
    lineage: Lineage,
}

impl WorkingContext {
    /// Start (or restart) from the job's original bytes and the base prompt.
    pub fn fresh(job: &Job, base_prompt: &str) -> Self {
        Self {
            image: job.original.clone(),
            mime_type: job.original_mime.to_string(),
            prompt: base_prompt.to_string(),
            lineage: Lineage::Original,
        }
    }

    /// Continue from the image the service just returned, appending `comment`.
    ///
    /// The MIME type is sniffed from the returned bytes.
    pub fn continue_from(self, last_image: Vec<u8>, comment: &str) -> Self {
        Self {
            mime_type: pipeline::classify(&last_image).mime_type().to_string(),
            prompt: format!("{}\n{}", self.prompt, comment),
            image: last_image,
            lineage: Lineage::Continuation,
        }
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn lineage(&self) -> Lineage {
        self.lineage
    }
}

/// How a job's review loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Operator kept the output.
    Accepted,
    /// Operator discarded the output and deleted the original.
    Skipped,
    /// The edit service answered without an image.
    NoImage,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Skipped => f.write_str("skipped"),
            Self::NoImage => f.write_str("no image returned"),
        }
    }
}

/// Result of one completed review loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review {
    pub outcome: JobOutcome,
    /// Number of images the service returned for this job.
    pub generations: usize,
}

/// A job that ended in an error, with the number of images generated before it.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ReviewFailed {
    pub generations: usize,
    #[source]
    pub source: Error,
}

impl From<Error> for ReviewFailed {
    fn from(source: Error) -> Self {
        Self {
            generations: 0,
            source,
        }
    }
}

/// Drive one job through the review loop until the operator accepts or skips,
/// or the service stops returning images.
///
/// Errors from the edit service, the filesystem, re-encoding or the prompter end
/// the job and are returned. Metadata copy failures are logged and ignored.
pub async fn review_job(
    job: &Job,
    config: &Config,
    service: &dyn EditService,
    copier: &mut dyn MetadataCopier,
    prompter: &mut dyn Prompter,
) -> std::result::Result<Review, ReviewFailed> {
    let mut generations = 0;
    match drive(job, config, service, copier, prompter, &mut generations).await {
        Ok(outcome) => Ok(Review {
            outcome,
            generations,
        }),
        Err(source) => Err(ReviewFailed {
            generations,
            source,
        }),
    }
}

async fn drive(
    job: &Job,
    config: &Config,
    service: &dyn EditService,
    copier: &mut dyn MetadataCopier,
    prompter: &mut dyn Prompter,
    generations: &mut usize,
) -> Result<JobOutcome> {
    let base_prompt = config.edit.base_prompt.as_str();
    let mut context = WorkingContext::fresh(job, base_prompt);

    loop {
        log::info!(
            "  Generating with {} ({})...",
            service.name(),
            context.lineage()
        );

        let edited = service
            .request_edit(context.prompt(), context.image(), context.mime_type())
            .await?;
        let Some(edited) = edited else {
            log::warn!("  {} returned no image for {}", service.name(), job.file_name);
            return Ok(JobOutcome::NoImage);
        };
        *generations += 1;

        save_result(job, &edited, config.output.jpeg_quality, copier)?;

        match prompter.choose(&job.file_name)? {
            MenuChoice::Accept => return Ok(JobOutcome::Accepted),
            MenuChoice::Comment => {
                let comment = prompter.comment()?;
                context = context.continue_from(edited, &comment);
            }
            MenuChoice::Retry => {
                context = WorkingContext::fresh(job, base_prompt);
            }
            MenuChoice::Skip => {
                discard(job)?;
                return Ok(JobOutcome::Skipped);
            }
        }
    }
}

/// Re-encode, write over any previous attempt, then carry metadata over.
fn save_result(
    job: &Job,
    edited: &[u8],
    quality: u8,
    copier: &mut dyn MetadataCopier,
) -> Result<()> {
    let jpeg = pipeline::reencode_to_jpeg(edited, quality)?;
    std::fs::write(&job.output_path, &jpeg).map_err(|e| Error::fs(&job.output_path, e))?;
    log::info!("  Saved {} ({} bytes)", job.output_path.display(), jpeg.len());

    if let Err(e) = copier.copy_all_metadata(&job.input_path, &job.output_path) {
        log::warn!("  Metadata not copied ({}): {e}", copier.name());
    }
    Ok(())
}

/// Remove the output (if any) and the original input.
fn discard(job: &Job) -> Result<()> {
    match std::fs::remove_file(&job.output_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::fs(&job.output_path, e)),
    }
    std::fs::remove_file(&job.input_path).map_err(|e| Error::fs(&job.input_path, e))?;
    log::info!("  Deleted {} and its output", job.input_path.display());
    Ok(())
}
