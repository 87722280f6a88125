use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{header, Client, StatusCode};
use tokio::sync::Semaphore;

use crate::{config::SETTINGS, logging};

pub mod user_agent;

/// 限制並發請求數，避免被目標網站封禁。
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(5));

/// HTTP 請求失敗時的最大重試次數。
const MAX_RETRIES: usize = 2;

/// A fetched page: the response status plus the raw markup body.
///
/// A non-success status is a normal value here, not an error. Callers decide
/// what a non-200 means for their extraction phase.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The page-fetcher collaborator.
///
/// An explicit dependency rather than a process-wide client singleton, so
/// tests can substitute a deterministic fake. Implementations return `Err`
/// only for transport failures; status codes travel inside [`FetchedPage`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedPage>;
}

/// [`PageFetcher`] backed by a reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        ensure_rustls_crypto_provider();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(SETTINGS.system.connect_timeout_seconds))
            .timeout(Duration::from_secs(SETTINGS.system.request_timeout_seconds))
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== HTTP/2 優化 =====
            .http2_keep_alive_interval(Duration::from_secs(30))
            .http2_keep_alive_timeout(Duration::from_secs(10))
            .http2_keep_alive_while_idle(true)
            // ===== 連接池 =====
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            // ===== Cookie 和重定向 =====
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            // ===== Headers =====
            .referer(true)
            .default_headers(headers)
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))?;

        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Sends a GET request with bounded retries on transport failure.
    ///
    /// Each attempt holds a semaphore permit and is followed by a short pause;
    /// failed attempts back off exponentially. After the last attempt the last
    /// underlying error is returned.
    async fn get(&self, url: &str) -> Result<FetchedPage> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            let msg = format!("Attempt {} to send GET:{}", attempt, url);
            let permit = SEMAPHORE.acquire().await;
            let start = Instant::now();
            let res = self.client.get(url).send().await;
            let elapsed = start.elapsed().as_millis();

            // 請求延遲，避免被目標網站封禁
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(permit);

            match res {
                Ok(response) => {
                    logging::info_file_async(format!("{} {} ms", msg, elapsed));
                    let status = response.status();
                    let body = response.text().await.map_err(|e| {
                        anyhow!("Error reading response text from {}: {:?}", url, e)
                    })?;

                    return Ok(FetchedPage { status, body });
                }
                Err(why) => {
                    last_error = format!("{:?}", why);
                    logging::error_file_async(format!(
                        "{} failed because {:?}. {} ms",
                        msg, why, elapsed
                    ));
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt as u32))).await;

                        continue;
                    }
                }
            }
        }

        Err(anyhow!(
            "Failed to send request to {} after {} attempts; last error: {}",
            url,
            MAX_RETRIES,
            last_error
        ))
    }
}

/// Installs the ring CryptoProvider when no process default exists yet.
fn ensure_rustls_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
