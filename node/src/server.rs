use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use types::network::{
    Addresses, GetBlocksRequest, GetBlocksResponse, GetDataRequest, GetDataResponse,
    VersionRequest,
};
use types::{Block, Transaction};

use crate::node::Node;

/// One POST route per RPC method; every handler is a thin shim over the
/// node. Rejections surface as a bare 400, nothing more specific crosses
/// the wire.
pub(crate) fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/version", post(version))
        .route("/get_blocks", post(get_blocks))
        .route("/get_data", post(get_data))
        .route("/send_addresses", post(send_addresses))
        .route("/get_addresses", post(get_addresses))
        .route("/forward_transaction", post(forward_transaction))
        .route("/forward_block", post(forward_block))
        .with_state(node)
}

async fn version(State(node): State<Arc<Node>>, Json(request): Json<VersionRequest>) -> Json<()> {
    node.handle_version(request).await;
    Json(())
}

async fn get_blocks(
    State(node): State<Arc<Node>>,
    Json(request): Json<GetBlocksRequest>,
) -> Json<GetBlocksResponse> {
    Json(node.handle_get_blocks(request))
}

async fn get_data(
    State(node): State<Arc<Node>>,
    Json(request): Json<GetDataRequest>,
) -> Json<GetDataResponse> {
    Json(node.handle_get_data(request))
}

async fn send_addresses(
    State(node): State<Arc<Node>>,
    Json(batch): Json<Addresses>,
) -> Json<()> {
    node.handle_send_addresses(batch).await;
    Json(())
}

async fn get_addresses(State(node): State<Arc<Node>>) -> Json<Addresses> {
    Json(node.handle_get_addresses())
}

async fn forward_transaction(
    State(node): State<Arc<Node>>,
    Json(tx): Json<Transaction>,
) -> Result<Json<()>, StatusCode> {
    if node.handle_forward_transaction(tx).await {
        Ok(Json(()))
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}

async fn forward_block(
    State(node): State<Arc<Node>>,
    Json(block): Json<Block>,
) -> Result<Json<()>, StatusCode> {
    if node.handle_forward_block(block).await {
        Ok(Json(()))
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}
