use std::error::Error;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ai_agent_service::config::AgentConfig;
use mr_commenter::publish::PublishConfig;
use mr_commenter::{FileReviewOutcome, ReviewConfig, run_review};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file, if one exists.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,mr_commenter=debug"))
        .unwrap();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mr_url = std::env::var("GITLAB_MR_URL")
        .map_err(|_| "GITLAB_MR_URL is required (merge request web url)")?;
    let token =
        std::env::var("GITLAB_TOKEN").map_err(|_| "GITLAB_TOKEN is required (PRIVATE-TOKEN)")?;

    let agent_cfg = AgentConfig::from_env()?;

    let mut cfg = ReviewConfig::new(token);
    cfg.publish = PublishConfig::from_env()?;
    if let Ok(ctx) = std::env::var("REVIEW_CONTEXT") {
        cfg.context = ctx;
    }
    if let Ok(lang) = std::env::var("REVIEW_LANGUAGE") {
        cfg.language = lang;
    }
    if let Ok(tpl) = std::env::var("REVIEW_PROMPT_TEMPLATE") {
        cfg.template = Some(tpl);
    }
    if let Ok(pat) = std::env::var("REVIEW_TARGET_FILTER") {
        cfg.target = Some(regex::Regex::new(&pat)?);
    }

    let results = run_review(&mr_url, agent_cfg, &cfg).await?;

    let mut commented = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for r in &results {
        match &r.outcome {
            FileReviewOutcome::Commented { .. } => commented += 1,
            FileReviewOutcome::Skipped { .. } => skipped += 1,
            FileReviewOutcome::Failed { error } => {
                failed += 1;
                tracing::error!("{}: {error}", r.path);
            }
        }
    }
    tracing::info!(
        "review summary: files={} commented={} skipped={} failed={}",
        results.len(),
        commented,
        skipped,
        failed
    );

    Ok(())
}
