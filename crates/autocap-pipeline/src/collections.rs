//! Document collections and object storage layout.

pub const UPLOADS: &str = "uploads";
pub const TRANSCRIPTS: &str = "transcripts";
pub const TRANSLATIONS: &str = "translations";
/// Render jobs dispatched to the worker.
pub const JOBS: &str = "jobs";
/// Portal export rows.
pub const RENDER_JOBS: &str = "render_jobs";
/// Single-flight markers, keyed by upload id.
pub const RENDER_LOCKS: &str = "render_locks";
pub const INTEGRATION_VIDEOS: &str = "integration_videos";
pub const CAPTION_SETS: &str = "integration_captions";

pub const CAPTIONS_PREFIX: &str = "captions";
pub const RENDERS_PREFIX: &str = "renders";
pub const INTEGRATION_UPLOADS_PREFIX: &str = "uploads/integration";

/// `captions/{user}/{upload}/{job}.{ext}`
pub fn caption_path(user_id: &str, upload_id: &str, job_id: &str, extension: &str) -> String {
    format!("{CAPTIONS_PREFIX}/{user_id}/{upload_id}/{job_id}.{extension}")
}

/// `renders/{user}/{job}/rendered.mp4`
pub fn render_output_path(user_id: &str, job_id: &str) -> String {
    format!("{RENDERS_PREFIX}/{user_id}/{job_id}/rendered.mp4")
}

/// `uploads/integration/{video}/{millis}-{name}`
pub fn mirror_path(external_video_id: &str, epoch_millis: i64, safe_name: &str) -> String {
    format!("{INTEGRATION_UPLOADS_PREFIX}/{external_video_id}/{epoch_millis}-{safe_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(caption_path("u1", "up1", "j1", "ass"), "captions/u1/up1/j1.ass");
        assert_eq!(render_output_path("u1", "j1"), "renders/u1/j1/rendered.mp4");
        assert_eq!(
            mirror_path("ext-9", 1700000000000, "clip.mp4"),
            "uploads/integration/ext-9/1700000000000-clip.mp4"
        );
    }
}
