//! End-to-end extraction pipeline.
//!
//! Flow: build_prompt → complete → validate_and_parse, each stage
//! short-circuiting on failure of the previous. Stateless across runs: no
//! session, cache, or cross-call ordering.

use thiserror::Error;
use tracing::{debug, info};

use crate::llm_client::{CompletionBackend, CompletionError};
use crate::prompt::{FewShotExample, FewShotPrompt, TemplateError};
use crate::schema::{MusicTasteRecord, SchemaError};

/// Pipeline failure, keeping the service/parse taxonomy distinguishable at
/// the caller. No variant is retried or repaired internally.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("prompt template error: {0}")]
    Template(#[from] TemplateError),

    #[error("completion service error: {0}")]
    Completion(#[from] CompletionError),

    #[error("schema validation error: {0}")]
    Schema(#[from] SchemaError),
}

/// The extraction pipeline: a completion backend plus the fixed few-shot
/// prompt. Constructed once at startup and reused for each query.
pub struct TasteExtractor {
    backend: Box<dyn CompletionBackend>,
    prompt: FewShotPrompt,
}

impl TasteExtractor {
    pub fn new(backend: Box<dyn CompletionBackend>, prompt: FewShotPrompt) -> Self {
        Self { backend, prompt }
    }

    /// Runs one query through the full pipeline. On parse failure the caller
    /// gets a descriptive error, never a partial record.
    pub async fn run(&self, query: &str) -> Result<MusicTasteRecord, ExtractError> {
        let prompt = self.prompt.build(query)?;
        debug!("prompt built: {} bytes", prompt.len());

        let raw = self.backend.complete(&prompt).await?;
        debug!("raw completion: {raw}");

        let record = MusicTasteRecord::validate_and_parse(&raw)?;
        info!("extraction succeeded");
        Ok(record)
    }
}

/// The fixed worked examples that steer the model. Defined once at process
/// start, immutable, never persisted.
pub fn default_examples() -> Result<Vec<FewShotExample>, SchemaError> {
    let clash = MusicTasteRecord {
        genres: Some(vec!["rock".into()]),
        bands: Some(vec![
            "Rolling Stones".into(),
            "The Ramones".into(),
            "The Clash".into(),
        ]),
        albums: Some(vec!["London Calling".into()]),
        year_range: None,
    };
    let zeppelin = MusicTasteRecord {
        genres: Some(vec!["rock".into()]),
        bands: Some(vec!["Led Zeppelin".into()]),
        albums: None,
        year_range: Some(vec![1970, 1979]),
    };

    Ok(vec![
        FewShotExample::new(
            "I like rock such as Rolling Stones or The Ramones, or the album London Calling from the clash",
            &clash,
        )?,
        FewShotExample::new("I enjoy rock music from the 70s like Led Zeppelin", &zeppelin)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Canned backend: returns a fixed completion (or error) without I/O.
    struct CannedBackend {
        reply: Result<String, fn() -> CompletionError>,
    }

    impl CannedBackend {
        fn text(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
            }
        }

        fn failing(make: fn() -> CompletionError) -> Self {
            Self { reply: Err(make) }
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn extractor_with(backend: CannedBackend) -> TasteExtractor {
        let prompt = FewShotPrompt::new(
            default_examples().unwrap(),
            &MusicTasteRecord::format_instructions(),
        );
        TasteExtractor::new(Box::new(backend), prompt)
    }

    #[tokio::test]
    async fn test_run_parses_valid_completion() {
        let backend = CannedBackend::text(
            r#"{"genres": ["rock"], "bands": ["Rolling Stones", "The Ramones", "The Clash"], "albums": ["London Calling"]}"#,
        );
        let record = extractor_with(backend).run("I like rock").await.unwrap();
        assert_eq!(record.genres, Some(vec!["rock".to_string()]));
        assert!(record.year_range.is_none());
    }

    #[tokio::test]
    async fn test_run_surfaces_schema_failure() {
        let backend = CannedBackend::text(r#"{"genres": "rock"}"#);
        let err = extractor_with(backend).run("I like rock").await.unwrap_err();
        assert!(matches!(err, ExtractError::Schema(_)));
    }

    #[tokio::test]
    async fn test_run_surfaces_cardinality_failure() {
        let backend = CannedBackend::text(r#"{"year_range": [1980]}"#);
        let err = extractor_with(backend).run("80s pop").await.unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Schema(SchemaError::Cardinality { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_surfaces_completion_failure() {
        let backend = CannedBackend::failing(|| CompletionError::EmptyContent);
        let err = extractor_with(backend).run("I like rock").await.unwrap_err();
        assert!(matches!(err, ExtractError::Completion(_)));
    }

    #[tokio::test]
    async fn test_completion_and_schema_errors_stay_distinct() {
        let service_err = extractor_with(CannedBackend::failing(|| CompletionError::Api {
            status: 429,
            message: "rate limited".into(),
        }))
        .run("q")
        .await
        .unwrap_err();
        let parse_err = extractor_with(CannedBackend::text("not json"))
            .run("q")
            .await
            .unwrap_err();

        assert!(matches!(service_err, ExtractError::Completion(_)));
        assert!(matches!(parse_err, ExtractError::Schema(_)));
    }

    #[test]
    fn test_default_examples_shape() {
        let examples = default_examples().unwrap();
        assert_eq!(examples.len(), 2);
        assert!(examples[0].render().contains("London Calling"));
        assert!(examples[1].render().contains("Led Zeppelin"));
    }
}
