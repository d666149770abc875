//! # HTTP Adapters
//!
//! The axum surface of the ink miner: the peer RPC other miners call and
//! the token-gated art-node API, plus the outbound reqwest client the
//! gossip dispatcher uses. Handlers are thin — they deserialize, call
//! into `blockart-protocol`, dispatch whatever gossip the engine hands
//! back, and serialize the result.
//!
//! ## Endpoints
//!
//! | Method | Path                       | Description                       |
//! |--------|----------------------------|-----------------------------------|
//! | GET    | `/health`                  | Liveness probe                    |
//! | GET    | `/peer/ping`               | Peer liveness probe               |
//! | POST   | `/peer/send_block`         | Deliver a mined block             |
//! | POST   | `/peer/send_op`            | Deliver a signed operation        |
//! | GET    | `/peer/blockchain`         | Canonical chain snapshot          |
//! | POST   | `/peer/bidirectional_setup`| Register the dialing peer         |
//! | GET    | `/art/hello`               | Auth handshake: get a nonce       |
//! | POST   | `/art/token`               | Auth handshake: redeem the nonce  |
//! | POST   | `/art/shape`               | Add a shape                       |
//! | POST   | `/art/shape/delete`        | Delete a shape                    |
//! | POST   | `/art/svg`                 | SVG string for a validated shape  |
//! | POST   | `/art/ink`                 | Ink balance                       |
//! | POST   | `/art/genesis`             | Genesis block hash                |
//! | POST   | `/art/shapes`              | Shape hashes in a block           |
//! | POST   | `/art/children`            | Child hashes of a block           |
//! | POST   | `/art/op_validated`        | Operation confirmation status     |

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, warn};

use blockart_protocol::error::MinerError;
use blockart_protocol::miner::{Miner, Outbound};
use blockart_protocol::net::gossip::GossipEngine;
use blockart_protocol::net::rpc::{
    AddShapeRequest, BidirectionalSetupRequest, BlockHashRequest, DeleteShapeRequest, ErrorBody,
    GenesisBlockResponse, GetBlockChainResponse, GetTokenRequest, GetTokenResponse,
    HashListResponse, HelloResponse, InkResponse, OpResponse, OpValidatedResponse, PingResponse,
    SendBlockRequest, SendOpRequest, ShapeHashRequest, SvgStringResponse, TokenOnlyRequest,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone — everything is an Arc
/// or already handle-like.
#[derive(Clone)]
pub struct AppState {
    pub miner: Arc<Miner>,
    pub gossip: Arc<GossipEngine>,
    pub http: reqwest::Client,
    pub metrics: SharedMetrics,
    /// Base URL this node advertises to peers.
    pub public_addr: String,
}

impl AppState {
    /// Refreshes the gauges that mirror miner state.
    fn update_gauges(&self) {
        self.miner.with_state(|s| {
            let height = s.blocks.tip_block().map(|b| b.block_no).unwrap_or(0);
            self.metrics.chain_height.set(height as i64);
            self.metrics.ops_pending.set(s.ops.unmined.len() as i64);
            self.metrics
                .ink_balance
                .set(s.ledger.balance(self.miner.public_key_string()) as i64);
        });
        self.metrics.connected_peers.set(self.gossip.peer_count() as i64);
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the axum router for the RPC port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/peer/ping", get(ping_handler))
        .route("/peer/send_block", post(send_block_handler))
        .route("/peer/send_op", post(send_op_handler))
        .route("/peer/blockchain", get(blockchain_handler))
        .route("/peer/bidirectional_setup", post(bidirectional_setup_handler))
        .route("/art/hello", get(hello_handler))
        .route("/art/token", post(token_handler))
        .route("/art/shape", post(add_shape_handler))
        .route("/art/shape/delete", post(delete_shape_handler))
        .route("/art/svg", post(svg_handler))
        .route("/art/ink", post(ink_handler))
        .route("/art/genesis", post(genesis_handler))
        .route("/art/shapes", post(shapes_handler))
        .route("/art/children", post(children_handler))
        .route("/art/op_validated", post(op_validated_handler))
        .with_state(state)
}

/// Maps protocol errors to HTTP status codes.
fn error_response(error: MinerError) -> Response {
    let status = match &error {
        MinerError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        MinerError::InvalidShapeHash(_)
        | MinerError::InvalidBlockHash(_)
        | MinerError::ShapeOwner(_) => StatusCode::NOT_FOUND,
        MinerError::InvalidSignature | MinerError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(ErrorBody { error })).into_response()
}

// ---------------------------------------------------------------------------
// Gossip dispatch
// ---------------------------------------------------------------------------

/// Plans and fires dissemination for engine output. Sends run as
/// detached tasks; a peer that fails to answer is dropped from the peer
/// set, exactly as a failed ping would drop it.
pub fn dispatch(state: &AppState, outbound: Vec<Outbound>, exclude: Option<&str>) {
    for planned in state.gossip.plan(outbound, exclude) {
        for target in planned.targets {
            let state = state.clone();
            let message = planned.message.clone();
            tokio::spawn(async move {
                let result = match &message {
                    Outbound::Block { block, hash } => {
                        send_block_to(&state, &target, block.clone(), hash.clone()).await
                    }
                    Outbound::Op(record) => send_op_to(&state, &target, record.clone()).await,
                };
                if let Err(err) = result {
                    warn!(peer = %target, error = %err, "gossip send failed, dropping peer");
                    state.gossip.remove_peer(&target);
                } else {
                    state.gossip.mark_alive(&target);
                }
            });
        }
    }
}

async fn send_block_to(
    state: &AppState,
    target: &str,
    block: blockart_protocol::chain::Block,
    hash: String,
) -> Result<(), reqwest::Error> {
    state
        .http
        .post(format!("{target}/peer/send_block"))
        .json(&SendBlockRequest { block, hash, from: Some(state.public_addr.clone()) })
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn send_op_to(
    state: &AppState,
    target: &str,
    record: blockart_protocol::chain::OperationRecord,
) -> Result<(), reqwest::Error> {
    state
        .http
        .post(format!("{target}/peer/send_op"))
        .json(&SendOpRequest { record, from: Some(state.public_addr.clone()) })
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Fetches a peer's chain snapshot, for startup synchronization.
pub async fn fetch_blockchain(
    state: &AppState,
    target: &str,
) -> Result<GetBlockChainResponse, reqwest::Error> {
    state
        .http
        .get(format!("{target}/peer/blockchain"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Probes a peer's liveness.
pub async fn ping_peer(state: &AppState, target: &str) -> bool {
    match state.http.get(format!("{target}/peer/ping")).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Announces this node to a peer so the connection is bidirectional.
pub async fn announce_to(state: &AppState, target: &str) -> Result<(), reqwest::Error> {
    state
        .http
        .post(format!("{target}/peer/bidirectional_setup"))
        .json(&BidirectionalSetupRequest { address: state.public_addr.clone() })
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Peer handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> &'static str {
    "ok"
}

async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse { alive: true })
}

async fn send_block_handler(
    State(state): State<AppState>,
    Json(req): Json<SendBlockRequest>,
) -> Response {
    debug!(hash = %req.hash, "peer delivered block");
    match state.miner.handle_send_block(req.block, &req.hash) {
        Ok(outbound) => {
            if !outbound.is_empty() {
                state.metrics.blocks_received_total.inc();
            }
            dispatch(&state, outbound, req.from.as_deref());
            state.update_gauges();
            StatusCode::OK.into_response()
        }
        Err(error) => {
            // Invalid peer blocks are logged and discarded; no ban list.
            warn!(hash = %req.hash, error = %error, "rejected peer block");
            error_response(error)
        }
    }
}

async fn send_op_handler(
    State(state): State<AppState>,
    Json(req): Json<SendOpRequest>,
) -> Response {
    match state.miner.handle_send_op(req.record) {
        Ok(outbound) => {
            dispatch(&state, outbound, req.from.as_deref());
            state.update_gauges();
            StatusCode::OK.into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn blockchain_handler(State(state): State<AppState>) -> Json<GetBlockChainResponse> {
    let (tip_hash, chain) = state.miner.chain_snapshot();
    Json(GetBlockChainResponse { tip_hash, chain })
}

async fn bidirectional_setup_handler(
    State(state): State<AppState>,
    Json(req): Json<BidirectionalSetupRequest>,
) -> StatusCode {
    state.gossip.add_peer(&req.address);
    state.metrics.connected_peers.set(state.gossip.peer_count() as i64);
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Art-node handlers
// ---------------------------------------------------------------------------

async fn hello_handler(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(HelloResponse { nonce: state.miner.hello() })
}

async fn token_handler(
    State(state): State<AppState>,
    Json(req): Json<GetTokenRequest>,
) -> Response {
    match state.miner.get_token(&req.nonce, &req.r, &req.s) {
        Ok((token, canvas_x_max, canvas_y_max)) => {
            Json(GetTokenResponse { token, canvas_x_max, canvas_y_max }).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn add_shape_handler(
    State(state): State<AppState>,
    Json(req): Json<AddShapeRequest>,
) -> Response {
    match state.miner.add_shape(
        &req.token,
        req.validate_num,
        req.shape_type,
        &req.svg,
        &req.fill,
        &req.stroke,
    ) {
        Ok(submission) => {
            dispatch(&state, submission.outbound, None);
            state.update_gauges();
            Json(OpResponse {
                op_sig: submission.op_sig,
                ink_remaining: submission.ink_remaining,
            })
            .into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn delete_shape_handler(
    State(state): State<AppState>,
    Json(req): Json<DeleteShapeRequest>,
) -> Response {
    match state
        .miner
        .delete_shape(&req.token, &req.shape_hash, req.validate_num)
    {
        Ok(submission) => {
            dispatch(&state, submission.outbound, None);
            state.update_gauges();
            Json(OpResponse {
                op_sig: submission.op_sig,
                ink_remaining: submission.ink_remaining,
            })
            .into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn svg_handler(
    State(state): State<AppState>,
    Json(req): Json<ShapeHashRequest>,
) -> Response {
    match state.miner.get_svg_string(&req.token, &req.shape_hash) {
        Ok(svg) => Json(SvgStringResponse { svg }).into_response(),
        Err(error) => error_response(error),
    }
}

async fn ink_handler(State(state): State<AppState>, Json(req): Json<TokenOnlyRequest>) -> Response {
    match state.miner.get_ink(&req.token) {
        Ok(ink_remaining) => Json(InkResponse { ink_remaining }).into_response(),
        Err(error) => error_response(error),
    }
}

async fn genesis_handler(
    State(state): State<AppState>,
    Json(req): Json<TokenOnlyRequest>,
) -> Response {
    match state.miner.get_genesis_block(&req.token) {
        Ok(block_hash) => Json(GenesisBlockResponse { block_hash }).into_response(),
        Err(error) => error_response(error),
    }
}

async fn shapes_handler(
    State(state): State<AppState>,
    Json(req): Json<BlockHashRequest>,
) -> Response {
    match state.miner.get_shapes(&req.token, &req.block_hash) {
        Ok(hashes) => Json(HashListResponse { hashes }).into_response(),
        Err(error) => error_response(error),
    }
}

async fn children_handler(
    State(state): State<AppState>,
    Json(req): Json<BlockHashRequest>,
) -> Response {
    match state.miner.get_children(&req.token, &req.block_hash) {
        Ok(hashes) => Json(HashListResponse { hashes }).into_response(),
        Err(error) => error_response(error),
    }
}

async fn op_validated_handler(
    State(state): State<AppState>,
    Json(req): Json<ShapeHashRequest>,
) -> Response {
    match state.miner.op_validated(&req.token, &req.shape_hash) {
        Ok((validated, block_hash)) => {
            Json(OpValidatedResponse { validated, block_hash }).into_response()
        }
        Err(error) => error_response(error),
    }
}
