//! # dewatermark
//!
//! Interactive batch watermark remover. Every JPEG in an input directory is sent to a
//! generative image-edit service (Google Gemini) with a removal prompt; the result is
//! re-encoded as JPEG, gets the original's metadata copied onto it, and is shown to an
//! operator who can accept it, refine it with a comment, retry from the original, or
//! skip the file altogether.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dewatermark::ai::GeminiEditService;
//! use dewatermark::batch::BatchDriver;
//! use dewatermark::config::Config;
//! use dewatermark::exif::open_copier;
//! use dewatermark::prompt::ConsolePrompter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let service = GeminiEditService::new(Config::api_key_from_env()?, config.edit.model.clone());
//!
//!     // exiftool is started once here and stopped after the batch
//!     let mut copier = open_copier(&config.metadata);
//!     let mut prompter = ConsolePrompter::stdio();
//!
//!     let result = BatchDriver::new(&config, &service, copier.as_mut(), &mut prompter)
//!         .run()
//!         .await;
//!     copier.close()?;
//!
//!     for report in result? {
//!         println!("{}: {:?}", report.file, report.outcome);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Review Loop
//!
//! | Choice | Next request |
//! |--------|--------------|
//! | `accept` | none, output kept |
//! | `comment` | last result + prompt with the comment appended |
//! | `retry` | original input + base prompt |
//! | `skip` | none, output and original deleted |
//!
//! ## Modules
//!
//! - [`ai`] - Edit service trait, Gemini client and response model
//! - [`batch`] - Batch driver and per-file reports
//! - [`config`] - Configuration types and loading/saving
//! - [`error`] - Error type
//! - [`exif`] - Metadata copy backends (exiftool, native)
//! - [`pipeline`] - Format sniffing, inventory, jobs and JPEG re-encoding
//! - [`prompt`] - Operator menu
//! - [`review`] - Per-file review loop

pub mod ai;
pub mod batch;
pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod prompt;
pub mod review;

#[cfg(test)]
mod test_support;
