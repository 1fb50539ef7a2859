//! API handlers.
//!
//! Each chain read follows the same sequence: look up the chain, probe its
//! candidate URLs, build a provider from the survivors, perform one read and
//! shape JSON. The provider is dropped with the request.

use alloy::primitives::utils::format_ether;
use alloy::primitives::Address;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::rpc::{ChainId, ProbeReport, ReadBackend, RpcSelector, SelectorOptions};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub chain_id: u64,
    pub address: Address,
    /// Balance in wei as a decimal string.
    pub wei: String,
    /// Balance in ether as a decimal string.
    pub ether: String,
    /// Number of endpoints that passed the probe.
    pub endpoints: usize,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub chain_id: u64,
    pub working: usize,
    pub endpoints: Vec<ProbeReport>,
}

#[derive(Debug, Deserialize)]
pub struct FaucetQuery {
    /// Kept raw so a malformed value is reported as `INVALID_REQUEST`.
    pub chain_id: Option<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn list_chains(State(state): State<AppState>) -> Json<Vec<ChainSummary>> {
    let config = state.config();
    Json(
        config
            .chains
            .iter()
            .map(|c| ChainSummary {
                chain_id: c.chain_id,
                name: c.name.clone(),
                rpc_url_count: c.rpc_urls.len(),
            })
            .collect(),
    )
}

/// Probe every configured URL for a chain and report the outcome of each.
pub async fn probe_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Result<Json<ProbeResponse>, ApiError> {
    let chain_id = parse_chain_id(&chain_id)?;
    let config = state.config();
    let urls = candidate_urls(&config, chain_id)?;

    let reports = selector(&config).probe_rpc_urls(chain_id, urls).await;
    let working = reports.iter().filter(|r| r.outcome.is_working()).count();

    Ok(Json(ProbeResponse {
        chain_id: chain_id.0,
        working,
        endpoints: reports,
    }))
}

pub async fn address_balance(
    State(state): State<AppState>,
    Path((chain_id, address)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let chain_id = parse_chain_id(&chain_id)?;
    let address: Address = address
        .parse()
        .map_err(|_| ApiError::InvalidAddress(address.clone()))?;
    let config = state.config();
    read_balance(&config, chain_id, address).await.map(Json)
}

/// Gas balance of the faucet wallet.
pub async fn faucet_balance(
    State(state): State<AppState>,
    Query(query): Query<FaucetQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let requested = query.chain_id.as_deref().map(parse_chain_id).transpose()?;
    let config = state.config();
    let address = config.faucet.address.ok_or(ApiError::FaucetNotConfigured)?;
    let chain_id = requested
        .or(config.faucet.default_chain_id.map(ChainId))
        .ok_or_else(|| ApiError::InvalidRequest("chain_id is required".to_string()))?;

    read_balance(&config, chain_id, address).await.map(Json)
}

fn parse_chain_id(raw: &str) -> Result<ChainId, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map(ChainId)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid chain id '{}'", raw)))
}

fn selector(config: &GatewayConfig) -> RpcSelector {
    RpcSelector::new(SelectorOptions::from_config(config))
}

fn candidate_urls(config: &GatewayConfig, chain_id: ChainId) -> Result<&[String], ApiError> {
    let chain = config
        .chain(chain_id)
        .ok_or(ApiError::UnsupportedChain(chain_id))?;
    if chain.rpc_urls.is_empty() {
        return Err(ApiError::RpcNotConfigured(chain_id));
    }
    Ok(&chain.rpc_urls)
}

async fn read_balance(
    config: &GatewayConfig,
    chain_id: ChainId,
    address: Address,
) -> Result<BalanceResponse, ApiError> {
    let urls = candidate_urls(config, chain_id)?;
    let selector = selector(config);

    let working = selector.filter_working_rpc_urls(chain_id, urls).await;
    if working.is_empty() {
        tracing::warn!(chain_id = chain_id.0, candidates = urls.len(), "No RPC endpoint passed the probe");
        return Err(ApiError::NoHealthyRpc(chain_id));
    }

    let provider = selector.build_provider(chain_id, &working)?;
    let balance = provider.get_balance(address).await?;

    tracing::info!(
        chain_id = chain_id.0,
        address = %address,
        endpoints = working.len(),
        "Balance read"
    );

    Ok(BalanceResponse {
        chain_id: chain_id.0,
        address,
        wei: balance.to_string(),
        ether: format_ether(balance),
        endpoints: working.len(),
    })
}
