//! Process-wide recognizer and anonymizer handles
//!
//! Building a recognizer can be expensive (compiling pattern tables,
//! loading a model), so `PrivacyEngines` builds each engine at most once,
//! on first use, and hands out shared `Arc`s afterwards. Concurrent first
//! callers wait on the same initialisation instead of racing to build
//! their own.

use super::anonymizer::{Anonymizer, ReplaceAnonymizer};
use super::patterns::{PatternRecognizer, PATTERN_MODEL_ID};
use super::recognizer::EntityRecognizer;
use crate::config::NerConfig;
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Builds the recognizer on first use
pub type RecognizerFactory = Box<dyn Fn() -> Result<Arc<dyn EntityRecognizer>> + Send + Sync>;

/// Builds the anonymizer on first use
pub type AnonymizerFactory = Box<dyn Fn() -> Result<Arc<dyn Anonymizer>> + Send + Sync>;

/// Lazily-initialised, shared NER and anonymization engines
pub struct PrivacyEngines {
    recognizer: OnceCell<Arc<dyn EntityRecognizer>>,
    anonymizer: OnceCell<Arc<dyn Anonymizer>>,
    recognizer_factory: RecognizerFactory,
    anonymizer_factory: AnonymizerFactory,
}

impl PrivacyEngines {
    /// Engines selected by the NER configuration
    pub fn from_config(config: &NerConfig) -> Self {
        let model = config.model.clone();
        Self::with_factories(
            Box::new(move || build_recognizer(&model)),
            Box::new(default_anonymizer),
        )
    }

    /// Engines built by custom factories
    pub fn with_factories(
        recognizer_factory: RecognizerFactory,
        anonymizer_factory: AnonymizerFactory,
    ) -> Self {
        Self {
            recognizer: OnceCell::new(),
            anonymizer: OnceCell::new(),
            recognizer_factory,
            anonymizer_factory,
        }
    }

    /// Engines wrapping already-built instances
    pub fn from_instances(
        recognizer: Arc<dyn EntityRecognizer>,
        anonymizer: Arc<dyn Anonymizer>,
    ) -> Self {
        Self::with_factories(
            Box::new(move || -> Result<Arc<dyn EntityRecognizer>> { Ok(recognizer.clone()) }),
            Box::new(move || -> Result<Arc<dyn Anonymizer>> { Ok(anonymizer.clone()) }),
        )
    }

    /// The shared recognizer, built on first call
    pub async fn recognizer(&self) -> Result<Arc<dyn EntityRecognizer>> {
        self.recognizer
            .get_or_try_init(|| async {
                let recognizer = (self.recognizer_factory)()?;
                tracing::info!(recognizer = recognizer.name(), "Entity recognizer initialized");
                Ok::<_, Error>(recognizer)
            })
            .await
            .cloned()
    }

    /// The shared anonymizer, built on first call
    pub async fn anonymizer(&self) -> Result<Arc<dyn Anonymizer>> {
        self.anonymizer
            .get_or_try_init(|| async {
                let anonymizer = (self.anonymizer_factory)()?;
                tracing::info!(anonymizer = anonymizer.name(), "Anonymizer initialized");
                Ok::<_, Error>(anonymizer)
            })
            .await
            .cloned()
    }

    /// Build both engines now rather than on the first request
    pub async fn warm_up(&self) -> Result<()> {
        self.recognizer().await?;
        self.anonymizer().await?;
        Ok(())
    }
}

fn default_anonymizer() -> Result<Arc<dyn Anonymizer>> {
    Ok(Arc::new(ReplaceAnonymizer::new()))
}

/// Resolve a recognizer by model id
pub fn build_recognizer(model: &str) -> Result<Arc<dyn EntityRecognizer>> {
    match model {
        PATTERN_MODEL_ID | "pattern" => Ok(Arc::new(PatternRecognizer::new()?)),
        other => Err(Error::Config(format!(
            "unknown NER model '{}' (available: {})",
            other, PATTERN_MODEL_ID
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_from_config_default_model() {
        let engines = PrivacyEngines::from_config(&NerConfig::default());
        let recognizer = engines.recognizer().await.unwrap();
        assert_eq!(recognizer.name(), PATTERN_MODEL_ID);
        assert_eq!(engines.anonymizer().await.unwrap().name(), "replace");
    }

    #[tokio::test]
    async fn test_unknown_model_is_config_error() {
        let engines = PrivacyEngines::from_config(&NerConfig {
            model: "en_core_web_trf".to_string(),
        });
        let err = engines.recognizer().await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_returns_same_instance() {
        let engines = PrivacyEngines::from_config(&NerConfig::default());
        let a = engines.recognizer().await.unwrap();
        let b = engines.recognizer().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let engines = Arc::new(PrivacyEngines::with_factories(
            Box::new(move || -> Result<Arc<dyn EntityRecognizer>> {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Arc::new(PatternRecognizer::new()?))
            }),
            Box::new(default_anonymizer),
        ));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let engines = engines.clone();
                tokio::spawn(async move { engines.recognizer().await.map(|_| ()) })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_can_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let engines = PrivacyEngines::with_factories(
            Box::new(move || -> Result<Arc<dyn EntityRecognizer>> {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Recognizer("model not ready".to_string()))
                } else {
                    Ok(Arc::new(PatternRecognizer::new()?))
                }
            }),
            Box::new(default_anonymizer),
        );

        assert!(engines.recognizer().await.is_err());
        assert!(engines.recognizer().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
