use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use types::network::{
    Addresses, GetBlocksRequest, GetBlocksResponse, GetDataRequest, GetDataResponse,
    VersionRequest,
};
use types::{Block, Transaction};

/// Deadline for a single outbound call. Calls are best-effort: callers log
/// failures and move on, gossip redundancy covers the loss.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(2);

/// Outbound RPC client, one method per wire call. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder().timeout(RPC_TIMEOUT).build()?;
        Ok(Self { http })
    }

    async fn post<Req, Resp>(&self, addr: &str, method: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("http://{}/{}", addr, method);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn version(&self, addr: &str, request: &VersionRequest) -> Result<()> {
        self.post(addr, "version", request).await
    }

    pub async fn get_blocks(
        &self,
        addr: &str,
        request: &GetBlocksRequest,
    ) -> Result<GetBlocksResponse> {
        self.post(addr, "get_blocks", request).await
    }

    pub async fn get_data(&self, addr: &str, request: &GetDataRequest) -> Result<GetDataResponse> {
        self.post(addr, "get_data", request).await
    }

    pub async fn send_addresses(&self, addr: &str, addresses: &Addresses) -> Result<()> {
        self.post(addr, "send_addresses", addresses).await
    }

    pub async fn get_addresses(&self, addr: &str) -> Result<Addresses> {
        self.post(addr, "get_addresses", &()).await
    }

    pub async fn forward_transaction(&self, addr: &str, tx: &Transaction) -> Result<()> {
        self.post(addr, "forward_transaction", tx).await
    }

    pub async fn forward_block(&self, addr: &str, block: &Block) -> Result<()> {
        self.post(addr, "forward_block", block).await
    }
}
