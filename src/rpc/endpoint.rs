//! Single-endpoint JSON-RPC backend.
//!
//! # Responsibilities
//! - Bind one URL and chain ID to an alloy provider over HTTP
//! - Map transport failures into [`RpcError`] with the URL attached
//!
//! # Design Decisions
//! - No batching layer is installed: every call leaves as its own JSON-RPC
//!   POST the moment it is awaited
//! - The request timeout lives on the reqwest client, so probes and reads share
//!   one deadline knob

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::{reqwest, Http};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::observability::metrics;
use crate::rpc::backend::ReadBackend;
use crate::rpc::types::{ChainId, RpcError, RpcResult};

/// Build the HTTP client used by endpoint transports.
///
/// `pooled = false` disables keep-alive reuse, which is what probes want: the
/// connection is torn down with the client.
pub fn http_client(request_timeout: Duration, pooled: bool) -> RpcResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(request_timeout);
    if !pooled {
        builder = builder.pool_max_idle_per_host(0);
    }
    builder.build().map_err(|e| RpcError::Client(e.to_string()))
}

/// Parse a candidate URL, accepting only http(s) schemes.
pub fn parse_rpc_url(raw: &str) -> RpcResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| RpcError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RpcError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// A provider bound to exactly one JSON-RPC URL.
#[derive(Clone)]
pub struct HttpEndpoint {
    url: Url,
    chain_id: ChainId,
    provider: RootProvider,
}

impl HttpEndpoint {
    /// Bind `url` for `chain_id` using the given HTTP client.
    pub fn connect(url: Url, chain_id: ChainId, client: reqwest::Client) -> Self {
        let transport = Http::with_client(client, url.clone());
        // `false`: not a local node. No batch layer, so every call is its own POST.
        let rpc = RpcClient::new(transport, false);
        Self {
            url,
            chain_id,
            provider: RootProvider::new(rpc),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The chain this endpoint was bound for (not re-verified).
    pub fn expected_chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn map_err(&self, method: &'static str, err: TransportError) -> RpcError {
        metrics::record_rpc_call(method, false);
        RpcError::Transport {
            url: self.url.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ReadBackend for HttpEndpoint {
    fn endpoints(&self) -> Vec<Url> {
        vec![self.url.clone()]
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        let id = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| self.map_err("eth_chainId", e))?;
        metrics::record_rpc_call("eth_chainId", true);
        Ok(id)
    }

    async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        let balance = self
            .provider
            .get_balance(address)
            .await
            .map_err(|e| self.map_err("eth_getBalance", e))?;
        metrics::record_rpc_call("eth_getBalance", true);
        Ok(balance)
    }

    async fn call(&self, tx: TransactionRequest) -> RpcResult<Bytes> {
        let output = self
            .provider
            .call(tx)
            .await
            .map_err(|e| self.map_err("eth_call", e))?;
        metrics::record_rpc_call("eth_call", true);
        Ok(output)
    }

    async fn get_block_number(&self) -> RpcResult<u64> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| self.map_err("eth_blockNumber", e))?;
        metrics::record_rpc_call("eth_blockNumber", true);
        Ok(number)
    }
}

impl fmt::Debug for HttpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEndpoint")
            .field("url", &self.url.as_str())
            .field("chain_id", &self.chain_id.0)
            .finish()
    }
}
