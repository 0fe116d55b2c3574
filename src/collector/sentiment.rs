//! Sentiment collector
//!
//! Polls external sentiment/news sources on a slower cadence than market
//! data and caches one aggregate score per symbol.

use super::types::{NewsItem, SentimentData};
use crate::config::SentimentConfig;
use crate::error::DataFetchError;
use crate::events::{publish, EngineEvent};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};

/// Trait for sentiment source implementations
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Fetch aggregate sentiment for the given symbols
    async fn fetch_sentiment(
        &self,
        symbols: &[String],
    ) -> Result<Vec<SentimentData>, DataFetchError>;

    /// Fetch recent news items for the given symbols
    async fn fetch_news(&self, _symbols: &[String]) -> Result<Vec<NewsItem>, DataFetchError> {
        Ok(vec![])
    }
}

/// HTTP sentiment aggregation source
pub struct HttpSentimentSource {
    endpoint: String,
    client: Client,
}

impl HttpSentimentSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl SentimentProvider for HttpSentimentSource {
    async fn fetch_sentiment(
        &self,
        symbols: &[String],
    ) -> Result<Vec<SentimentData>, DataFetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("symbols", symbols.join(","))])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DataFetchError::ExchangeRejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))
    }

    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<NewsItem>, DataFetchError> {
        let response = self
            .client
            .get(format!("{}/news", self.endpoint.trim_end_matches('/')))
            .query(&[("symbols", symbols.join(","))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(vec![]);
        }

        response
            .json()
            .await
            .map_err(|e| DataFetchError::MalformedResponse(e.to_string()))
    }
}

/// Source used when no sentiment endpoint is configured
///
/// Reports nothing; strategies treat missing sentiment as neutral.
pub struct NullSentimentSource;

#[async_trait]
impl SentimentProvider for NullSentimentSource {
    async fn fetch_sentiment(
        &self,
        _symbols: &[String],
    ) -> Result<Vec<SentimentData>, DataFetchError> {
        Ok(vec![])
    }
}

/// Polls sentiment sources and caches the latest score per symbol
pub struct SentimentCollector {
    provider: Arc<dyn SentimentProvider>,
    symbols: Vec<String>,
    interval: Duration,
    min_mentions: u64,
    cache: Arc<RwLock<HashMap<String, SentimentData>>>,
    news: Arc<RwLock<Vec<NewsItem>>>,
    events: broadcast::Sender<EngineEvent>,
    shutdown: watch::Sender<bool>,
}

impl SentimentCollector {
    pub fn new(
        provider: Arc<dyn SentimentProvider>,
        symbols: Vec<String>,
        interval: Duration,
        config: &SentimentConfig,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            provider,
            symbols,
            interval,
            min_mentions: config.min_mentions,
            cache: Arc::new(RwLock::new(HashMap::new())),
            news: Arc::new(RwLock::new(vec![])),
            events,
            shutdown,
        }
    }

    /// Fetch once, then poll on the interval
    pub async fn start(&self) {
        Self::fetch_cycle(
            &self.provider,
            &self.symbols,
            self.min_mentions,
            &self.cache,
            &self.news,
            &self.events,
        )
        .await;

        let provider = Arc::clone(&self.provider);
        let symbols = self.symbols.clone();
        let min_mentions = self.min_mentions;
        let cache = Arc::clone(&self.cache);
        let news = Arc::clone(&self.news);
        let events = self.events.clone();
        let interval = self.interval;
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::fetch_cycle(&provider, &symbols, min_mentions, &cache, &news, &events).await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::debug!("Sentiment collector stopping");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the recurring fetch schedule
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn fetch_cycle(
        provider: &Arc<dyn SentimentProvider>,
        symbols: &[String],
        min_mentions: u64,
        cache: &Arc<RwLock<HashMap<String, SentimentData>>>,
        news: &Arc<RwLock<Vec<NewsItem>>>,
        events: &broadcast::Sender<EngineEvent>,
    ) {
        match provider.fetch_sentiment(symbols).await {
            Ok(scores) => {
                let mut guard = cache.write().await;
                for data in scores {
                    // Thin coverage reads as noise, not signal
                    if data.mentions < min_mentions {
                        continue;
                    }
                    guard.insert(data.symbol.clone(), data.clone());
                    publish(
                        events,
                        EngineEvent::SentimentUpdate {
                            data,
                            timestamp: Utc::now(),
                        },
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sentiment fetch failed");
            }
        }

        match provider.fetch_news(symbols).await {
            Ok(items) => {
                if !items.is_empty() {
                    *news.write().await = items;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "News fetch failed");
            }
        }
    }

    /// Most recent cached sentiment for a symbol
    pub async fn latest(&self, symbol: &str) -> Option<SentimentData> {
        self.cache.read().await.get(symbol).cloned()
    }

    /// Latest news batch
    pub async fn latest_news(&self) -> Vec<NewsItem> {
        self.news.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProvider {
        fail: AtomicBool,
    }

    #[async_trait]
    impl SentimentProvider for FakeProvider {
        async fn fetch_sentiment(
            &self,
            symbols: &[String],
        ) -> Result<Vec<SentimentData>, DataFetchError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DataFetchError::MalformedResponse("down".to_string()));
            }
            Ok(symbols
                .iter()
                .map(|s| SentimentData {
                    symbol: s.clone(),
                    score: dec!(0.6),
                    sources: vec![],
                    mentions: 50,
                    timestamp: Utc::now(),
                })
                .collect())
        }
    }

    fn collector(provider: Arc<FakeProvider>) -> SentimentCollector {
        SentimentCollector::new(
            provider,
            vec!["BTC/USDT".to_string()],
            Duration::from_secs(3600),
            &SentimentConfig::default(),
            event_channel(),
        )
    }

    #[tokio::test]
    async fn test_start_fetches_immediately() {
        let provider = Arc::new(FakeProvider {
            fail: AtomicBool::new(false),
        });
        let c = collector(provider);
        c.start().await;
        let data = c.latest("BTC/USDT").await.unwrap();
        assert_eq!(data.score, dec!(0.6));
        c.stop();
    }

    #[tokio::test]
    async fn test_failure_keeps_cache_and_does_not_panic() {
        let provider = Arc::new(FakeProvider {
            fail: AtomicBool::new(false),
        });
        let c = collector(Arc::clone(&provider));
        c.start().await;

        provider.fail.store(true, Ordering::SeqCst);
        SentimentCollector::fetch_cycle(
            &c.provider,
            &c.symbols,
            c.min_mentions,
            &c.cache,
            &c.news,
            &c.events,
        )
        .await;

        assert!(c.latest("BTC/USDT").await.is_some());
        c.stop();
    }

    #[tokio::test]
    async fn test_low_mention_scores_filtered() {
        struct ThinProvider;

        #[async_trait]
        impl SentimentProvider for ThinProvider {
            async fn fetch_sentiment(
                &self,
                symbols: &[String],
            ) -> Result<Vec<SentimentData>, DataFetchError> {
                Ok(symbols
                    .iter()
                    .map(|s| SentimentData {
                        symbol: s.clone(),
                        score: dec!(0.9),
                        sources: vec![],
                        mentions: 2,
                        timestamp: Utc::now(),
                    })
                    .collect())
            }
        }

        let c = SentimentCollector::new(
            Arc::new(ThinProvider),
            vec!["BTC/USDT".to_string()],
            Duration::from_secs(3600),
            &SentimentConfig::default(),
            event_channel(),
        );
        c.start().await;
        assert!(c.latest("BTC/USDT").await.is_none());
        c.stop();
    }
}
