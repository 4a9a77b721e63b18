mod config;
mod extractor;
mod llm_client;
mod prompt;
mod schema;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extractor::{default_examples, TasteExtractor};
use crate::llm_client::AnthropicClient;
use crate::prompt::FewShotPrompt;
use crate::schema::MusicTasteRecord;

/// Query used only to demonstrate the rendered prompt, not sent to the model.
const DEMO_QUERY: &str = "My favorite band is The Beatles";
/// Query run end-to-end when no CLI argument is given.
const DEFAULT_QUERY: &str = "I love pop music from the 80s, especially Madonna";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting muso v{} (model: {})",
        env!("CARGO_PKG_VERSION"),
        llm_client::MODEL
    );

    let examples = default_examples()?;
    println!("{}", examples[0].render());
    println!("\n#######\n");

    let prompt = FewShotPrompt::new(examples, &MusicTasteRecord::format_instructions());
    println!("{}", prompt.build(DEMO_QUERY)?);

    let backend = AnthropicClient::new(config.anthropic_api_key.clone());
    let extractor = TasteExtractor::new(Box::new(backend), prompt);

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());
    info!("extracting taste from query: {query:?}");

    match extractor.run(&query).await {
        Ok(record) => {
            println!("{}", interpret(&record));
            Ok(())
        }
        Err(e) => {
            // Human-readable failure goes to stdout; the exit code carries it
            println!("{e}");
            std::process::exit(1);
        }
    }
}

/// Human-readable interpretation of a validated record.
fn interpret(record: &MusicTasteRecord) -> String {
    let year_range = match record.year_range.as_deref() {
        Some([start, end]) => format!("{start} - {end}"),
        _ => "Not specified".to_string(),
    };
    format!(
        "Genres: {}\nBands: {}\nAlbums: {}\nYear Range: {}",
        join_or_unspecified(&record.genres),
        join_or_unspecified(&record.bands),
        join_or_unspecified(&record.albums),
        year_range,
    )
}

fn join_or_unspecified(items: &Option<Vec<String>>) -> String {
    match items {
        Some(items) => items.join(", "),
        None => "Not specified".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_full_record() {
        let record = MusicTasteRecord {
            genres: Some(vec!["pop".into()]),
            bands: Some(vec!["Madonna".into()]),
            albums: None,
            year_range: Some(vec![1980, 1989]),
        };
        let text = interpret(&record);
        assert!(text.contains("Genres: pop"));
        assert!(text.contains("Bands: Madonna"));
        assert!(text.contains("Albums: Not specified"));
        assert!(text.contains("Year Range: 1980 - 1989"));
    }

    #[test]
    fn test_interpret_empty_record() {
        let text = interpret(&MusicTasteRecord::default());
        assert_eq!(
            text,
            "Genres: Not specified\nBands: Not specified\nAlbums: Not specified\nYear Range: Not specified"
        );
    }

    #[test]
    fn test_interpret_joins_multiple_entries() {
        let record = MusicTasteRecord {
            bands: Some(vec!["Rolling Stones".into(), "The Ramones".into()]),
            ..Default::default()
        };
        assert!(interpret(&record).contains("Bands: Rolling Stones, The Ramones"));
    }
}
