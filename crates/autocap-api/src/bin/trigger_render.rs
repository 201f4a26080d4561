//! Render an upload from its latest transcript with the karaoke template at 1080p.
//!
//! Usage: `trigger-render <upload-id> [user-id]`

use anyhow::Context;

use autocap_api::build_pipeline;
use autocap_models::{CaptionTemplate, Resolution};
use autocap_pipeline::{CaptionSourceSpec, PipelineConfig, RenderRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autocap=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let upload_id = args
        .next()
        .context("usage: trigger-render <upload-id> [user-id]")?;
    let user_id = args.next();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("trigger-render: rustls crypto provider already installed");
    }

    let pipeline = build_pipeline(PipelineConfig::from_env()).await?;

    let mut request = RenderRequest::new(upload_id.as_str(), CaptionSourceSpec::LatestTranscript);
    request.user_id = user_id;
    request.template = CaptionTemplate::Karaoke;
    request.resolution = Resolution::FullHd;

    println!("trigger-render: rendering upload {upload_id}");
    let outcome = pipeline
        .start_render(request)
        .await
        .with_context(|| format!("render of upload {upload_id} failed"))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.skipped {
        println!("trigger-render: captions unchanged, reused {}", outcome.output_path);
    } else {
        println!("trigger-render: job {} {}", outcome.job_id, outcome.status.as_str());
    }
    Ok(())
}
