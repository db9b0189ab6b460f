//! # Fetcher
//!
//! The byte-stream HTTP seam. The engine only ever talks to the network
//! through the [`Fetcher`] trait, so tests (and alternative transports)
//! can inject their own byte sources.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Proxy};
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::request::RequestSpec;

/// A boxed stream of response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// An open response body: the advertised length (if any) and its chunks.
pub struct FetchBody {
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

/// A source of resource bytes, keyed by request.
///
/// Implementations must resolve the request to a successful response and
/// hand back the body as a chunk stream; non-2xx statuses are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, spec: &RequestSpec) -> Result<FetchBody, FetchError>;
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &CacheConfig) -> Result<Client, FetchError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5) // Allow multiple connections to same host
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if let Some(proxy_url) = &config.proxy {
        let proxy = Proxy::all(proxy_url).map_err(|e| FetchError::Proxy(e.to_string()))?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_url, "Using configured proxy for downloads");
    }

    client_builder.build().map_err(FetchError::from)
}

/// The production [`Fetcher`]: streamed GET requests over one shared
/// reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CacheConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Wrap an existing client instead of building one.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, spec: &RequestSpec) -> Result<FetchBody, FetchError> {
        let mut request = self.client.get(&spec.url);
        if !spec.headers.is_empty() {
            request = request.headers(spec.headers.clone());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(FetchError::StatusCode(response.status()));
        }

        let content_length = response.content_length();
        if content_length.is_none() {
            debug!(url = %spec.url, "Content length not available");
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(FetchError::from))
            .boxed();

        Ok(FetchBody {
            content_length,
            stream,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fetchers for exercising the engine without a network.

    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    use super::*;

    #[derive(Debug, Clone)]
    pub(crate) enum MockChunk {
        Data(Bytes),
        Error,
    }

    /// One scripted response: advertised length plus the chunks to yield.
    #[derive(Debug, Clone)]
    pub(crate) struct MockScript {
        pub content_length: Option<u64>,
        pub chunks: Vec<MockChunk>,
    }

    impl MockScript {
        /// Evenly-sized filler chunks advertising their true total length.
        pub fn filler(total: usize, chunk_size: usize) -> Self {
            let data = vec![0xabu8; total];
            Self::from_bytes(&data, chunk_size)
        }

        /// Chunks carved out of real content.
        pub fn from_bytes(data: &[u8], chunk_size: usize) -> Self {
            let chunks = data
                .chunks(chunk_size.max(1))
                .map(|c| MockChunk::Data(Bytes::copy_from_slice(c)))
                .collect();
            Self {
                content_length: Some(data.len() as u64),
                chunks,
            }
        }

        /// Yield `good` filler chunks, then fail the stream.
        pub fn failing_after(good: usize, chunk_size: usize) -> Self {
            let mut chunks: Vec<MockChunk> = (0..good)
                .map(|_| MockChunk::Data(Bytes::from(vec![0xabu8; chunk_size])))
                .collect();
            chunks.push(MockChunk::Error);
            Self {
                content_length: Some(((good + 1) * chunk_size) as u64),
                chunks,
            }
        }

        /// Drop the advertised content length.
        pub fn without_length(mut self) -> Self {
            self.content_length = None;
            self
        }
    }

    /// A [`Fetcher`] that replays scripted responses.
    ///
    /// Responses are taken from the queue in order; once it runs dry the
    /// first script is replayed. An optional gate semaphore must yield one
    /// permit per chunk, which makes chunk arrival fully deterministic.
    pub(crate) struct MockFetcher {
        fallback: MockScript,
        queue: Mutex<VecDeque<MockScript>>,
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<RequestSpec>>,
    }

    impl MockFetcher {
        pub fn new(script: MockScript) -> Self {
            Self {
                fallback: script,
                queue: Mutex::new(VecDeque::new()),
                gate: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Queue differing responses for successive calls.
        pub fn with_scripts(mut self, scripts: Vec<MockScript>) -> Self {
            self.queue = Mutex::new(scripts.into());
            self
        }

        /// Gate chunk delivery on permits from `gate`.
        pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        /// How many times `fetch` has been called.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Every request seen so far, in order.
        pub fn requests(&self) -> Vec<RequestSpec> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, spec: &RequestSpec) -> Result<FetchBody, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(spec.clone());

            let script = self
                .queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());

            let gate = self.gate.clone();
            let stream = futures::stream::iter(script.chunks)
                .then(move |chunk| {
                    let gate = gate.clone();
                    async move {
                        if let Some(gate) = gate {
                            if let Ok(permit) = gate.acquire_owned().await {
                                permit.forget();
                            }
                        }
                        match chunk {
                            MockChunk::Data(bytes) => Ok(bytes),
                            MockChunk::Error => Err(FetchError::Io(std::io::Error::other(
                                "simulated stream failure",
                            ))),
                        }
                    }
                })
                .boxed();

            Ok(FetchBody {
                content_length: script.content_length,
                stream,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_config() {
        assert!(create_client(&CacheConfig::default()).is_ok());
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let config = CacheConfig::builder().with_proxy("::not a proxy::").build();
        assert!(matches!(create_client(&config), Err(FetchError::Proxy(_))));
    }
}
