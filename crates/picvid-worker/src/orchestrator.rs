//! Slideshow job orchestration.
//!
//! `submit` registers a job and returns immediately; the pipeline runs in
//! the background on a bounded pool:
//!
//! 1. normalize every image into a frame on the blocking pool
//! 2. encode the frames into one video, bridging encoder progress
//! 3. record the outcome and hand the job to the cleanup scheduler

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};

use picvid_jobs::{JobRegistry, ProgressChannel, ProgressSender};
use picvid_media::fs_utils::{ensure_dir, remove_file_if_exists};
use picvid_media::{
    probe_video, write_frame, EncoderEvent, FfmpegSlideshowEncoder, FrameProducer,
    LetterboxNormalizer, ProgressBridge, SlideshowClip, SlideshowEncoder, STAGE_OUTPUT_TIME,
};
use picvid_models::{JobId, JobRecord, JobUpdate, SlideshowRequest, ValidationError};

use crate::cleanup::CleanupScheduler;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

const OPERATION: &str = "slideshow";

/// Encoded duration may drift from the requested one by this much.
const DURATION_TOLERANCE_SECS: f64 = 0.5;

/// Accepts slideshow jobs and runs their pipelines.
pub struct SlideshowOrchestrator {
    config: WorkerConfig,
    registry: Arc<dyn JobRegistry>,
    producer: Arc<dyn FrameProducer>,
    encoder: Arc<dyn SlideshowEncoder>,
    cleanup: CleanupScheduler,
    job_semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
}

impl SlideshowOrchestrator {
    /// Create an orchestrator with the letterbox normalizer and the FFmpeg encoder.
    pub fn new(config: WorkerConfig, registry: Arc<dyn JobRegistry>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);
        let cleanup = CleanupScheduler::new(
            Arc::clone(&registry),
            config.work_dir.clone(),
            config.retention,
        );
        let encoder = Arc::new(FfmpegSlideshowEncoder::new(config.encoding.clone()));

        Self {
            config,
            registry,
            producer: Arc::new(LetterboxNormalizer::new()),
            encoder,
            cleanup,
            job_semaphore,
            in_flight: Arc::new(AtomicUsize::new(0)),
            shutdown,
        }
    }

    /// Replace the frame producer.
    pub fn with_producer(mut self, producer: Arc<dyn FrameProducer>) -> Self {
        self.producer = producer;
        self
    }

    /// Replace the encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn SlideshowEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn JobRegistry> {
        &self.registry
    }

    /// Jobs accepted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Register a job and start its pipeline in the background.
    ///
    /// Only registry failures and shutdown are reported here; pipeline
    /// failures end up on the job record.
    pub async fn submit(&self, request: SlideshowRequest) -> WorkerResult<JobId> {
        if self.is_shutting_down() {
            return Err(WorkerError::ShuttingDown);
        }
        if request.image_count() == 0 {
            return Err(ValidationError::NoImages.into());
        }

        let record = JobRecord::new(request.output_filename());
        let job_id = self.registry.create(record).await?;
        metrics::record_job_submitted(request.resolution().as_str());

        let logger = JobLogger::new(&job_id, OPERATION);
        logger.log_start(
            request.image_count(),
            request.resolution().as_str(),
            request.duration_secs(),
        );

        let pipeline = Arc::new(Pipeline {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            producer: Arc::clone(&self.producer),
            encoder: Arc::clone(&self.encoder),
        });
        let cleanup = self.cleanup.clone();
        let semaphore = Arc::clone(&self.job_semaphore);
        let mut shutdown_rx = self.shutdown.subscribe();
        let guard = InFlightGuard::new(Arc::clone(&self.in_flight));
        let span = logger.create_span();
        let id = job_id.clone();

        tokio::spawn(
            async move {
                let _guard = guard;

                let permit = tokio::select! {
                    biased;
                    permit = semaphore.acquire_owned() => permit.ok(),
                    Ok(_) = shutdown_rx.wait_for(|stop| *stop) => None,
                };

                let output = pipeline.config.output_path(&id);
                match permit {
                    Some(_permit) => {
                        metrics::record_job_started();
                        // a panic stays inside the inner task; the job still gets a terminal state
                        let run = tokio::spawn(
                            Arc::clone(&pipeline)
                                .execute(id.clone(), request, output.clone(), logger.clone())
                                .in_current_span(),
                        );
                        if let Err(e) = run.await {
                            let reason = if e.is_panic() {
                                "pipeline task panicked"
                            } else {
                                "pipeline task was cancelled"
                            };
                            let failure = Err(WorkerError::processing_failed(reason));
                            pipeline.finish(&id, failure, &output, &logger).await;
                        }
                        metrics::record_job_finished();
                    }
                    None => {
                        pipeline
                            .finish(&id, Err(WorkerError::ShuttingDown), &output, &logger)
                            .await
                    }
                }

                cleanup.schedule(id, Some(output));
            }
            .instrument(span),
        );

        Ok(job_id)
    }

    /// Stop accepting jobs. Jobs still waiting for a slot are failed.
    pub fn shutdown(&self) {
        info!("Slideshow orchestrator shutting down");
        let _ = self.shutdown.send(true);
    }

    /// Wait until every accepted job has finished. Returns `false` on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_for_jobs())
            .await
            .is_ok()
    }

    async fn wait_for_jobs(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Decrements the in-flight counter however the job task ends.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything one job's pipeline needs.
struct Pipeline {
    config: WorkerConfig,
    registry: Arc<dyn JobRegistry>,
    producer: Arc<dyn FrameProducer>,
    encoder: Arc<dyn SlideshowEncoder>,
}

impl Pipeline {
    async fn execute(
        self: Arc<Self>,
        job_id: JobId,
        request: SlideshowRequest,
        output: PathBuf,
        logger: JobLogger,
    ) {
        let (progress, channel) = ProgressChannel::spawn(Arc::clone(&self.registry), job_id.clone());
        let result = self.run(&job_id, request, &output, &progress, &logger).await;
        // the record must see every progress update before the terminal one
        drop(progress);
        channel.finish().await;

        self.finish(&job_id, result, &output, &logger).await;
    }

    async fn run(
        &self,
        job_id: &JobId,
        request: SlideshowRequest,
        output: &Path,
        progress: &ProgressSender,
        logger: &JobLogger,
    ) -> WorkerResult<PathBuf> {
        let plan = self.config.progress;
        let job_dir = self.config.job_dir(job_id);
        ensure_dir(&job_dir).await?;

        let duration_secs = self.config.encoding.clip_duration_secs(request.duration_secs());
        let expected_secs = duration_secs * request.image_count() as f64;

        logger.log_stage("preprocessing");
        progress.progress(plan.preprocess_floor, "preprocessing images");
        let clips = self
            .normalize_frames(&job_dir, request, duration_secs, progress)
            .await?;

        logger.log_stage("encoding");
        progress.progress(plan.encode_start, "rendering video");
        let encoded = self.encode(&clips, output, progress).await;
        discard_frames(&clips).await;
        encoded?;

        if self.config.verify_output {
            verify_duration(output, expected_secs, logger).await;
        }

        Ok(output.to_path_buf())
    }

    /// Stage A: decode, letterbox and persist every image as a frame.
    async fn normalize_frames(
        &self,
        job_dir: &Path,
        request: SlideshowRequest,
        duration_secs: f64,
        progress: &ProgressSender,
    ) -> WorkerResult<Vec<SlideshowClip>> {
        let plan = self.config.progress;
        let target = request.resolution().frame_size();
        let images = request.into_images();
        let total = images.len();
        let mut clips = Vec::with_capacity(total);

        for (idx, raw) in images.into_iter().enumerate() {
            let producer = Arc::clone(&self.producer);
            let frame_path = job_dir.join(format!("frame_{:04}.png", idx));
            let path = frame_path.clone();

            tokio::task::spawn_blocking(move || {
                let frame = producer.produce(&raw, target)?;
                write_frame(&frame, &path)
            })
            .await
            .map_err(|e| WorkerError::processing_failed(format!("frame task failed: {}", e)))?
            .map_err(|source| WorkerError::Image {
                index: idx + 1,
                source,
            })?;

            metrics::record_image_normalized();
            clips.push(SlideshowClip::new(frame_path, duration_secs));
            progress.percent(plan.preprocess_percent(idx + 1, total));
        }

        debug!(frames = clips.len(), target = %target, "Frames normalized");
        Ok(clips)
    }

    /// Stage B: run the encoder and bridge its progress into the job.
    async fn encode(
        &self,
        clips: &[SlideshowClip],
        output: &Path,
        progress: &ProgressSender,
    ) -> WorkerResult<()> {
        let plan = self.config.progress;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut bridge = ProgressBridge::new(plan.encode_start, plan.encode_end)
            .only_stage(STAGE_OUTPUT_TIME)
            .with_progress_message("encoding frames");

        let forward_to = progress.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                // encoder output names scratch paths; it goes to the log, not the record
                if let EncoderEvent::Log(line) = &event {
                    debug!(encoder_output = %line.trim(), "Encoder output");
                    continue;
                }
                if let Some(update) = bridge.bridge(event) {
                    forward_to.send(update);
                }
            }
        });

        debug!(encoder = self.encoder.name(), clips = clips.len(), "Encoding");
        let result = self.encoder.encode(clips, output, events_tx).await;

        if let Err(e) = forwarder.await {
            warn!("Progress forwarder aborted: {}", e);
        }

        result.map_err(WorkerError::from)
    }

    /// Write the terminal state of a job.
    async fn finish(&self, job_id: &JobId, result: WorkerResult<PathBuf>, output: &Path, logger: &JobLogger) {
        let elapsed = logger.elapsed().as_secs_f64();

        let update = match result {
            Ok(path) => {
                logger.log_completion(&path.display().to_string());
                metrics::record_job_completed(elapsed);
                JobUpdate::Complete { result_path: path }
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                metrics::record_job_failed(elapsed);
                if let Err(io) = remove_file_if_exists(output).await {
                    warn!(job_id = %job_id, "Failed to remove partial output: {}", io);
                }
                JobUpdate::Fail {
                    error: e.user_message(),
                }
            }
        };

        if let Err(e) = self.registry.update(job_id, update).await {
            error!(job_id = %job_id, error = %e, "Failed to record job outcome");
        }
    }
}

/// Frames are only needed by the encoder.
async fn discard_frames(clips: &[SlideshowClip]) {
    for clip in clips {
        if let Err(e) = remove_file_if_exists(&clip.frame_path).await {
            debug!("Failed to remove {}: {}", clip.frame_path.display(), e);
        }
    }
}

async fn verify_duration(output: &Path, expected_secs: f64, logger: &JobLogger) {
    match probe_video(output).await {
        Ok(info) => {
            debug!(
                duration = info.duration,
                width = info.width,
                height = info.height,
                size = info.size,
                "Encoded video probed"
            );
            if (info.duration - expected_secs).abs() > DURATION_TOLERANCE_SECS {
                logger.log_warning(&format!(
                    "encoded duration {:.2}s differs from expected {:.2}s",
                    info.duration, expected_secs
                ));
            }
        }
        Err(e) => debug!("Skipping output verification: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picvid_jobs::InMemoryJobRegistry;
    use picvid_models::JobStatus;

    #[tokio::test]
    async fn test_submit_rejected_after_shutdown() {
        let registry = Arc::new(InMemoryJobRegistry::new());
        let orchestrator = SlideshowOrchestrator::new(WorkerConfig::default(), registry.clone());
        orchestrator.shutdown();

        let request = SlideshowRequest::new(vec![vec![1, 2, 3]], 1.0, "square", "t").unwrap();
        let err = orchestrator.submit(request).await.unwrap_err();
        assert!(matches!(err, WorkerError::ShuttingDown));
        assert!(registry.is_empty().await);
        assert!(orchestrator.wait_idle(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_garbage_image_fails_job() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = Arc::new(InMemoryJobRegistry::new());
        let config = WorkerConfig {
            work_dir: dir.path().to_path_buf(),
            verify_output: false,
            ..Default::default()
        };
        let orchestrator = SlideshowOrchestrator::new(config, registry.clone());

        let request = SlideshowRequest::new(vec![b"not an image".to_vec()], 1.0, "square", "t").unwrap();
        let id = orchestrator.submit(request).await.unwrap();
        assert!(orchestrator.wait_idle(Duration::from_secs(10)).await);

        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error_detail.unwrap().contains("Image 1"));
        assert!(!orchestrator.config().output_path(&id).exists());
    }
}
