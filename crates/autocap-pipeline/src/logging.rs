//! Structured render job logging.
//!
//! Every line carries `job_id`, `upload_id` and `operation` so a job can be
//! followed across request logs, worker callbacks and export bursts.

use tracing::{error, info, warn, Span};

use autocap_models::JobId;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    upload_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, upload_id: &str, operation: &'static str) -> Self {
        Self::from_string(job_id.as_str(), upload_id, operation)
    }

    pub fn from_string(job_id: &str, upload_id: &str, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            upload_id: upload_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation,
            "Render job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation,
            "Render job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation,
            "Render job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation,
            "Render job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation,
            "Render job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render_job",
            job_id = %self.job_id,
            upload_id = %self.upload_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let job_id = JobId::from_string("job-1");
        let logger = JobLogger::new(&job_id, "up-1", "render");
        assert_eq!(logger.job_id(), "job-1");
        assert_eq!(logger.operation(), "render");

        // Logging without a subscriber must be a no-op.
        logger.log_start("queued");
        logger.log_warning("slow");
        let _span = logger.create_span();
    }
}
