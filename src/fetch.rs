use tracing::{debug, error, warn};
use ureq::tls::TlsConfig;
use ureq::Agent;

pub const METADATA_ACCEPT: &str = "application/xml, text/xml";
const MAX_METADATA_BYTES: u64 = 64 * 1024 * 1024;

/// Downloads remote metadata documents.
pub trait MetadataFetcher {
    /// Response body, or `None` on any transport or HTTP failure.
    fn get(&self, url: &str, accept: &str) -> Option<Vec<u8>>;

    /// True when a HEAD request answers 200.
    fn exists(&self, url: &str) -> bool;
}

pub struct HttpFetcher {
    agent: Agent,
    accept_invalid_certs: bool,
}

impl HttpFetcher {
    pub fn new(accept_invalid_certs: bool) -> Self {
        let config = Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(accept_invalid_certs)
                    .build(),
            )
            .build();
        Self {
            agent: config.into(),
            accept_invalid_certs,
        }
    }

    fn warn_if_insecure(&self, url: &str) {
        if self.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for {}", url);
        }
    }
}

impl MetadataFetcher for HttpFetcher {
    fn get(&self, url: &str, accept: &str) -> Option<Vec<u8>> {
        if url.trim().is_empty() {
            return None;
        }
        self.warn_if_insecure(url);

        let response = match self.agent.get(url).header("Accept", accept).call() {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to fetch metadata from {}: {}", url, e);
                return None;
            }
        };
        match response
            .into_body()
            .with_config()
            .limit(MAX_METADATA_BYTES)
            .read_to_vec()
        {
            Ok(body) if !body.is_empty() => {
                debug!(url, bytes = body.len(), "downloaded metadata");
                Some(body)
            }
            Ok(_) => {
                warn!("Metadata download from {} returned an empty body", url);
                None
            }
            Err(e) => {
                error!("Failed to read metadata from {}: {}", url, e);
                None
            }
        }
    }

    fn exists(&self, url: &str) -> bool {
        if url.trim().is_empty() {
            return false;
        }
        self.warn_if_insecure(url);
        match self.agent.head(url).call() {
            Ok(response) => response.status() == 200,
            Err(e) => {
                debug!(url, "HEAD request failed: {}", e);
                false
            }
        }
    }
}
