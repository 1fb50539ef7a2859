//! The read contract shared by single endpoints and aggregators.

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::fmt;
use url::Url;

use crate::rpc::types::RpcResult;

/// A read-capable handle onto one or more JSON-RPC endpoints.
///
/// Implemented by [`HttpEndpoint`](crate::rpc::HttpEndpoint) for a single URL
/// and by [`FallbackProvider`](crate::rpc::FallbackProvider) for a set of them,
/// so aggregators can be nested or swapped without touching call sites.
#[async_trait]
pub trait ReadBackend: Send + Sync + fmt::Debug {
    /// URLs this backend may send requests to, in fallback order.
    fn endpoints(&self) -> Vec<Url>;

    /// `eth_chainId`.
    async fn chain_id(&self) -> RpcResult<u64>;

    /// `eth_getBalance` at the latest block.
    async fn get_balance(&self, address: Address) -> RpcResult<U256>;

    /// `eth_call` at the latest block.
    async fn call(&self, tx: TransactionRequest) -> RpcResult<Bytes>;

    /// `eth_blockNumber`.
    async fn get_block_number(&self) -> RpcResult<u64>;
}
