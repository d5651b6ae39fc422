// rpc.rs - Stateless remote stepping service and its HTTP client
//
// A caller sends a world snapshot, a turn count and the band it wants to own;
// the service runs that many full-grid steps on the snapshot and sends the
// result back. Nothing survives between calls.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::{GolError, Result};
use crate::world::{World, WorldSnapshot};

pub const CALCULATE_PATH: &str = "/rpc/calculate";

pub const STATUS_OK: i32 = 0;
pub const STATUS_INVALID_REQUEST: i32 = 1;
pub const STATUS_STEP_FAILED: i32 = 2;

// Snapshots travel as JSON; a 512x512 grid is well past axum's 2 MiB default.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RpcRequest {
    pub world: WorldSnapshot,
    /// Number of successive generations to compute.
    pub turn: u64,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RpcResponse {
    pub rpc_status: i32,
    pub world: Option<WorldSnapshot>,
    pub turn: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    fn failure(status: i32, turn: u64, err: &GolError) -> Self {
        Self { rpc_status: status, world: None, turn, error: Some(err.to_string()) }
    }
}

/// Runs `request.turn` full-grid steps on the request's snapshot.
///
/// The band only states which rows the caller is responsible for; it must fit
/// the grid but does not restrict the computation.
pub fn calculate(request: RpcRequest) -> Result<RpcResponse> {
    let RpcRequest { world, turn, start_index, end_index } = request;
    if start_index >= end_index || end_index > world.height {
        return Err(GolError::InvalidRequest(format!(
            "band {start_index}..{end_index} does not fit a grid of height {}",
            world.height
        )));
    }

    let mut world = World::try_from(world)?;
    for _ in 0..turn {
        world.step()?;
    }

    Ok(RpcResponse {
        rpc_status: STATUS_OK,
        world: Some(world.snapshot()),
        turn,
        error: None,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route(CALCULATE_PATH, post(calculate_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// Undecodable bodies get the same status-1 reply as requests that fail validation.
async fn calculate_handler(
    payload: std::result::Result<Json<RpcRequest>, JsonRejection>,
) -> (StatusCode, Json<RpcResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = GolError::InvalidRequest(rejection.body_text());
            warn!(%err, "undecodable calculate request");
            return (StatusCode::BAD_REQUEST, Json(RpcResponse::failure(STATUS_INVALID_REQUEST, 0, &err)));
        }
    };
    let turn = request.turn;
    info!(
        turn,
        start = request.start_index,
        end = request.end_index,
        "calculate on {}x{}",
        request.world.height,
        request.world.width
    );

    match tokio::task::spawn_blocking(move || calculate(request)).await {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)),
        Ok(Err(err @ GolError::InvalidRequest(_))) => {
            warn!(%err, "rejected calculate request");
            (StatusCode::BAD_REQUEST, Json(RpcResponse::failure(STATUS_INVALID_REQUEST, turn, &err)))
        }
        Ok(Err(err)) => {
            warn!(%err, "calculate failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcResponse::failure(STATUS_STEP_FAILED, turn, &err)),
            )
        }
        Err(join_err) => {
            let err = GolError::StepFailed(join_err.to_string());
            warn!(%err, "calculate worker died");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcResponse::failure(STATUS_STEP_FAILED, turn, &err)),
            )
        }
    }
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await.map_err(|source| GolError::Io {
        path: PathBuf::from(addr.to_string()),
        source,
    })
}

/// Serves the RPC router on `listener` until the server fails or the future is dropped.
pub async fn serve(listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr().map_err(|source| GolError::Io {
        path: PathBuf::from("rpc listener"),
        source,
    })?;
    info!("rpc server listening on http://{addr}");
    axum::serve(listener, router()).await.map_err(|source| GolError::Io {
        path: PathBuf::from(addr.to_string()),
        source,
    })
}

/// Client side of the service. Failures are handed straight back; nothing is retried.
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:8888`.
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{CALCULATE_PATH}", base.trim_end_matches('/')),
        }
    }

    pub async fn calculate(&self, request: &RpcRequest) -> Result<RpcResponse> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| GolError::Transport(err.to_string()))?;
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| GolError::Transport(err.to_string()))?;

        if body.rpc_status == STATUS_OK {
            return Ok(body);
        }
        let message = body.error.unwrap_or_default();
        match body.rpc_status {
            STATUS_INVALID_REQUEST => Err(GolError::InvalidRequest(message)),
            status => Err(GolError::StepFailed(format!("remote status {status}: {message}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::patterns;

    fn request(grid: Grid, turn: u64, start_index: usize, end_index: usize) -> RpcRequest {
        let world = World::with_grid(grid, 2).unwrap();
        RpcRequest { world: world.snapshot(), turn, start_index, end_index }
    }

    #[test]
    fn matches_local_stepping() {
        let mut grid = Grid::new(12, 9);
        patterns::apply_pattern(&mut grid, &patterns::R_PENTOMINO, 3, 4);
        let mut local = World::with_grid(grid.clone(), 3).unwrap();
        for _ in 0..7 {
            local.step().unwrap();
        }

        let response = calculate(request(grid, 7, 0, 9)).unwrap();
        assert_eq!(response.rpc_status, STATUS_OK);
        assert_eq!(response.turn, 7);
        assert_eq!(&response.world.unwrap().grid, local.current());
    }

    #[test]
    fn band_does_not_limit_the_computation() {
        let mut grid = Grid::new(5, 5);
        patterns::apply_pattern(&mut grid, &patterns::BLINKER, 0, 0);
        let whole = calculate(request(grid.clone(), 1, 0, 5)).unwrap();
        let part = calculate(request(grid, 1, 2, 3)).unwrap();
        assert_eq!(whole.world, part.world);
    }

    #[test]
    fn zero_turns_echo_the_snapshot() {
        let mut grid = Grid::new(4, 4);
        patterns::apply_pattern(&mut grid, &patterns::BLOCK, 0, 0);
        let response = calculate(request(grid.clone(), 0, 0, 4)).unwrap();
        assert_eq!(response.world.unwrap().grid, grid);
    }

    #[test]
    fn rejects_inconsistent_bands() {
        for (start, end) in [(0, 5), (3, 3), (4, 2)] {
            let result = calculate(request(Grid::new(4, 4), 1, start, end));
            assert!(matches!(result, Err(GolError::InvalidRequest(_))), "{start}..{end}");
        }
    }

    #[test]
    fn rejects_snapshot_with_wrong_dimensions() {
        let mut req = request(Grid::new(4, 4), 1, 0, 4);
        req.world.width = 5;
        assert!(matches!(calculate(req), Err(GolError::InvalidRequest(_))));
    }

    #[test]
    fn rejects_dimensions_that_overflow() {
        let world: WorldSnapshot = serde_json::from_value(serde_json::json!({
            "Width": usize::MAX,
            "Height": 2,
            "Threads": 1,
            "Grid": { "width": usize::MAX, "height": 2, "cells": [] },
        }))
        .unwrap();
        let req = RpcRequest { world, turn: 1, start_index: 0, end_index: 1 };
        assert!(matches!(calculate(req), Err(GolError::InvalidRequest(_))));
    }

    #[test]
    fn wire_names_follow_the_contract() {
        let value = serde_json::to_value(request(Grid::new(2, 2), 3, 0, 2)).unwrap();
        for key in ["World", "Turn", "StartIndex", "EndIndex"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["World"].get("Threads").is_some());
    }
}
