//! Command-line front end: reads transcript lines from stdin, runs the
//! detection pipeline on each, and prints detections as JSON lines.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use lectern::classifier::HttpClassifier;
use lectern::verses::{HttpVerseLookup, NoVerseLookup, VerseLookup};
use lectern::{
    ClassifierSettings, DetectOptions, DetectionEngine, DetectionSettings, VerseLookupSettings,
};

#[derive(Debug, Parser)]
#[command(name = "lectern", about = "Detect scripture references in transcript text")]
struct Args {
    /// Disable the LLM fallback stage.
    #[arg(long)]
    skip_fallback: bool,

    /// Fetch verse text for each detection (requires --verses-url).
    #[arg(long)]
    fetch_verses: bool,

    /// Seconds a surfaced reference stays suppressed.
    #[arg(long, default_value_t = 60)]
    cooldown_secs: u64,

    /// OpenAI-compatible base URL for the fallback classifier.
    #[arg(long)]
    classifier_url: Option<String>,

    /// Model name for the fallback classifier.
    #[arg(long)]
    classifier_model: Option<String>,

    /// API key for the fallback classifier.
    #[arg(long, env = "LECTERN_CLASSIFIER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the verse text API.
    #[arg(long)]
    verses_url: Option<String>,

    /// Bible translation for verse text.
    #[arg(long, default_value = "KJV")]
    translation: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut classifier_settings = ClassifierSettings::default();
    if let Some(url) = &args.classifier_url {
        classifier_settings.base_url = url.clone();
    }
    if let Some(model) = &args.classifier_model {
        classifier_settings.model = model.clone();
    }
    if let Some(key) = &args.api_key {
        classifier_settings.api_key = key.clone();
    }

    let verses: Arc<dyn VerseLookup> = match &args.verses_url {
        Some(url) => Arc::new(HttpVerseLookup::new(VerseLookupSettings {
            base_url: url.clone(),
            translation: args.translation.clone(),
        })),
        None => Arc::new(NoVerseLookup),
    };

    let engine = DetectionEngine::new(
        DetectionSettings {
            cooldown_secs: args.cooldown_secs,
            ..DetectionSettings::default()
        },
        Arc::new(HttpClassifier::new(classifier_settings)),
        verses,
    );

    let options = DetectOptions {
        context: None,
        skip_fallback: args.skip_fallback,
        fetch_verse_text: args.fetch_verses && args.verses_url.is_some(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        for detection in engine.detect(&line, &options).await {
            println!("{}", serde_json::to_string(&detection)?);
        }
    }

    Ok(())
}
