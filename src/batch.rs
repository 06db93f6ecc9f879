use serde::Serialize;

use crate::ai::EditService;
use crate::config::Config;
use crate::error::Result;
use crate::exif::MetadataCopier;
use crate::pipeline::{self, Job};
use crate::prompt::Prompter;
use crate::review::{self, JobOutcome, Review, ReviewFailed};

/// Result of one job as seen by the batch.
///
/// Exactly one of `outcome` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub file: String,
    pub outcome: Option<JobOutcome>,
    pub generations: usize,
    pub error: Option<String>,
}

impl JobReport {
    fn finished(file: &str, review: Review) -> Self {
        Self {
            file: file.to_string(),
            outcome: Some(review.outcome),
            generations: review.generations,
            error: None,
        }
    }

    fn failed(file: &str, failure: &ReviewFailed) -> Self {
        Self {
            file: file.to_string(),
            outcome: None,
            generations: failure.generations,
            error: Some(failure.to_string()),
        }
    }
}

/// Runs the review loop over every JPEG in the input directory, one at a time.
///
/// A failing job is logged and recorded; the next job still runs.
///
/// # Example
///
/// ```rust,no_run
/// use dewatermark::ai::GeminiEditService;
/// use dewatermark::batch::BatchDriver;
/// use dewatermark::config::Config;
/// use dewatermark::exif::NativeCopier;
/// use dewatermark::prompt::AutoAccept;
///
/// # async fn example() -> dewatermark::error::Result<()> {
/// let config = Config::default();
/// let service = GeminiEditService::new(Config::api_key_from_env()?, config.edit.model.clone());
/// let mut copier = NativeCopier;
/// let mut prompter = AutoAccept;
///
/// let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
///     .run()
///     .await?;
/// println!("{} files handled", reports.len());
/// # Ok(())
/// # }
/// ```
pub struct BatchDriver<'a> {
    config: &'a Config,
    service: &'a dyn EditService,
    copier: &'a mut dyn MetadataCopier,
    prompter: &'a mut dyn Prompter,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        config: &'a Config,
        service: &'a dyn EditService,
        copier: &'a mut dyn MetadataCopier,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            config,
            service,
            copier,
            prompter,
        }
    }

    /// Process the whole inventory.
    ///
    /// Fails only if the output directory cannot be created or the input
    /// directory cannot be listed.
    pub async fn run(&mut self) -> Result<Vec<JobReport>> {
        pipeline::ensure_output_dir(self.config)?;
        let names = pipeline::list_jobs(&self.config.paths.input_dir)?;

        let total = names.len();
        log::info!(
            "Found {total} JPEG(s) in {}",
            self.config.paths.input_dir.display()
        );

        let mut reports = Vec::with_capacity(total);
        for (i, name) in names.iter().enumerate() {
            log::info!("[{}/{}] Processing: {name}", i + 1, total);

            let report = match self.process(name).await {
                Ok(review) => {
                    log::info!(
                        "  {name}: {} after {} generation(s)",
                        review.outcome,
                        review.generations
                    );
                    JobReport::finished(name, review)
                }
                Err(failure) => {
                    log::error!("  {name}: {failure}");
                    JobReport::failed(name, &failure)
                }
            };
            reports.push(report);
        }

        log_summary(&reports);
        Ok(reports)
    }

    /// Process the inventory, then close the metadata backend whatever the outcome.
    pub async fn run_and_close(mut self) -> Result<Vec<JobReport>> {
        let result = self.run().await;
        if let Err(e) = self.copier.close() {
            log::warn!("Failed to close {}: {e}", self.copier.name());
        }
        result
    }

    async fn process(&mut self, name: &str) -> std::result::Result<Review, ReviewFailed> {
        let job = Job::load(self.config, name)?;
        review::review_job(
            &job,
            self.config,
            self.service,
            &mut *self.copier,
            &mut *self.prompter,
        )
        .await
    }
}

fn log_summary(reports: &[JobReport]) {
    let count = |outcome: JobOutcome| {
        reports
            .iter()
            .filter(|r| r.outcome == Some(outcome))
            .count()
    };
    let failed = reports.iter().filter(|r| r.error.is_some()).count();

    log::info!(
        "Done: {} accepted, {} skipped, {} without image, {failed} failed out of {} file(s)",
        count(JobOutcome::Accepted),
        count(JobOutcome::Skipped),
        count(JobOutcome::NoImage),
        reports.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::MenuChoice;
    use crate::test_support::{
        RecordingCopier, Reply, ScriptedPrompter, StubEditService, jpeg, png,
    };
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, Vec<u8>)]) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.input_dir = dir.path().join("input");
        config.paths.output_dir = dir.path().join("output");
        fs::create_dir(&config.paths.input_dir).unwrap();
        for (name, bytes) in files {
            fs::write(config.paths.input_dir.join(name), bytes).unwrap();
        }
        (dir, config)
    }

    fn report<'r>(reports: &'r [JobReport], file: &str) -> &'r JobReport {
        reports.iter().find(|r| r.file == file).unwrap()
    }

    #[tokio::test]
    async fn processes_every_jpeg_and_creates_output_dir() {
        let (_dir, config) = setup(&[
            ("a.jpg", jpeg(1)),
            ("b.JPEG", jpeg(2)),
            ("notes.txt", b"hello".to_vec()),
        ]);
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome == Some(JobOutcome::Accepted)));
        assert!(config.paths.output_dir.join("a.jpg").exists());
        assert!(config.paths.output_dir.join("b.JPEG").exists());
        assert!(!config.paths.output_dir.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn failed_job_does_not_stop_batch() {
        let bad = jpeg(1);
        let (_dir, config) = setup(&[("bad.jpg", bad.clone()), ("good.jpg", jpeg(2))]);
        let service = StubEditService::returning(png(9)).failing_for(bad);
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        let bad = report(&reports, "bad.jpg");
        assert!(bad.outcome.is_none());
        assert!(bad.error.as_deref().unwrap().contains("scripted failure"));
        assert!(!config.paths.output_dir.join("bad.jpg").exists());

        assert_eq!(bad.generations, 0);

        let good = report(&reports, "good.jpg");
        assert_eq!(good.outcome, Some(JobOutcome::Accepted));
        assert!(config.paths.output_dir.join("good.jpg").exists());
    }

    #[tokio::test]
    async fn failed_report_counts_generations() {
        let (_dir, config) = setup(&[("a.jpg", jpeg(1))]);
        let service = StubEditService::new(
            vec![Reply::Image(png(9)), Reply::Image(png(8))],
            Reply::Fail("HTTP 500".into()),
        );
        let mut copier = RecordingCopier::default();
        let mut prompter =
            ScriptedPrompter::new(&[MenuChoice::Comment, MenuChoice::Retry], &["brighter"]);

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        assert_eq!(reports[0].generations, 2);
        assert!(reports[0].outcome.is_none());
        let json = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(json["generations"], 2);
        assert!(json["error"].as_str().unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn metadata_failure_does_not_stop_batch() {
        let (_dir, config) = setup(&[("a.jpg", jpeg(1)), ("b.jpg", jpeg(2))]);
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::failing();
        let mut prompter = ScriptedPrompter::accept_all();

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        assert_eq!(copier.copies.len(), 2);
        assert!(reports.iter().all(|r| r.error.is_none()));
        assert!(config.paths.output_dir.join("a.jpg").exists());
        assert!(config.paths.output_dir.join("b.jpg").exists());
    }

    #[tokio::test]
    async fn no_image_is_reported_not_failed() {
        let (_dir, config) = setup(&[("a.jpg", jpeg(1))]);
        let service = StubEditService::new(Vec::new(), Reply::NoImage);
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        assert_eq!(reports[0].outcome, Some(JobOutcome::NoImage));
        assert!(reports[0].error.is_none());
        assert_eq!(prompter.asked, 0);
    }

    #[tokio::test]
    async fn skip_deletes_input() {
        let (_dir, config) = setup(&[("a.jpg", jpeg(1))]);
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::new(&[MenuChoice::Skip], &[]);

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await
            .unwrap();

        assert_eq!(reports[0].outcome, Some(JobOutcome::Skipped));
        assert!(!config.paths.input_dir.join("a.jpg").exists());
        assert!(!config.paths.output_dir.join("a.jpg").exists());
    }

    #[tokio::test]
    async fn missing_input_dir_fails_run() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.input_dir = dir.path().join("nope");
        config.paths.output_dir = dir.path().join("output");
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let result = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run()
            .await;
        assert!(result.is_err());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn copier_closed_after_failed_run() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.input_dir = dir.path().join("nope");
        config.paths.output_dir = dir.path().join("output");
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let result = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run_and_close()
            .await;
        assert!(result.is_err());
        assert_eq!(copier.closes, 1);
    }

    #[tokio::test]
    async fn copier_closed_after_successful_run() {
        let (_dir, config) = setup(&[("a.jpg", jpeg(1))]);
        let service = StubEditService::returning(png(9));
        let mut copier = RecordingCopier::default();
        let mut prompter = ScriptedPrompter::accept_all();

        let reports = BatchDriver::new(&config, &service, &mut copier, &mut prompter)
            .run_and_close()
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(copier.copies.len(), 1);
        assert_eq!(copier.closes, 1);
    }

    #[test]
    fn report_serializes_outcome() {
        let report = JobReport::finished(
            "a.jpg",
            Review {
                outcome: JobOutcome::NoImage,
                generations: 0,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "no_image");
        assert!(json["error"].is_null());
    }
}
