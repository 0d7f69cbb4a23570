//! Bet endpoints: placement, listings, detail, manual settlement and statistics

use super::{ApiError, ApiState};
use crate::auth::Claims;
use crate::ledger::{
    self,
    bets::{BetListStatus, BetPage, PlaceBet},
    math::UserProfitStats,
    settlement::SettledBet,
};
use crate::models::Bet;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BetListQuery {
    #[serde(default)]
    pub status: BetListStatus,
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub outcome: String,
}

/// POST /bets
pub async fn place_bet(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<PlaceBet>,
) -> Result<(StatusCode, Json<Bet>), ApiError> {
    let bet = ledger::place_bet(state.store.as_ref(), &claims.sub, &request, Utc::now())?;
    Ok((StatusCode::CREATED, Json(bet)))
}

/// GET /bets?status=all|placed|settled&limit&page
pub async fn list_bets(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<BetListQuery>,
) -> Result<Json<BetPage>, ApiError> {
    let page = ledger::list_user_bets(
        state.store.as_ref(),
        &claims.sub,
        query.status,
        query.limit,
        query.page,
    )?;
    Ok(Json(page))
}

/// GET /bets/active
pub async fn active_bets(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<Json<BetPage>, ApiError> {
    let page = ledger::list_user_bets(
        state.store.as_ref(),
        &claims.sub,
        BetListStatus::Placed,
        query.limit,
        query.page,
    )?;
    Ok(Json(page))
}

/// GET /bets/history
pub async fn bet_history(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<Json<BetPage>, ApiError> {
    let page = ledger::list_user_bets(
        state.store.as_ref(),
        &claims.sub,
        BetListStatus::Settled,
        query.limit,
        query.page,
    )?;
    Ok(Json(page))
}

/// GET /bets/stats
pub async fn bet_stats(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfitStats>, ApiError> {
    Ok(Json(ledger::user_stats(state.store.as_ref(), &claims.sub)?))
}

/// GET /bets/:id
pub async fn get_bet(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(bet_id): Path<String>,
) -> Result<Json<Bet>, ApiError> {
    Ok(Json(ledger::get_user_bet(
        state.store.as_ref(),
        &claims.sub,
        &bet_id,
    )?))
}

/// POST /bets/:id/settle
pub async fn settle_bet(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
    Path(bet_id): Path<String>,
    Json(request): Json<SettleRequest>,
) -> Result<Json<SettledBet>, ApiError> {
    let settled = ledger::settle_bet(
        state.store.as_ref(),
        &claims.sub,
        &bet_id,
        &request.outcome,
    )?;
    Ok(Json(settled))
}

#[cfg(test)]
mod tests {
    use super::super::create_router;
    use super::*;
    use crate::auth::{AuthState, JwtHandler};
    use crate::ledger::SimulationRunner;
    use crate::models::{BetStatus, Event, EventStatus, Market, Selection};
    use crate::store::{LedgerStore, SqliteLedgerStore};
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store = SqliteLedgerStore::in_memory().unwrap();
        store
            .insert_event(&Event {
                id: "tennis".to_string(),
                name: "Nadal vs Djokovic".to_string(),
                sport_type: "tennis".to_string(),
                competition: "ATP Masters".to_string(),
                start_time: Utc::now() + chrono::Duration::days(1),
                status: EventStatus::Upcoming,
                markets: vec![Market {
                    id: "winner".to_string(),
                    name: "Match Winner".to_string(),
                    selections: vec![
                        Selection::new("nadal", "Nadal", 2.5),
                        Selection::new("djokovic", "Djokovic", 1.7),
                    ],
                }],
            })
            .unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);
        let runner = Arc::new(SimulationRunner::new(store.clone(), Some(7)));
        let jwt = Arc::new(JwtHandler::new("test-secret".to_string(), 24));
        create_router(ApiState::new(runner), AuthState::new(store, jwt))
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router, username: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_bets_require_token() {
        let app = test_app();
        let (status, _) = send(&app, "GET", "/bets", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_place_list_and_settle_bet() {
        let app = test_app();
        let token = login(&app, "alice").await;

        let (status, bet) = send(
            &app,
            "POST",
            "/bets",
            Some(&token),
            Some(json!({ "selection_id": "nadal", "stake_amount": 100.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bet["potential_return"], 250.0);
        assert_eq!(bet["currency"], "USDC");
        let bet_id = bet["id"].as_str().unwrap().to_string();

        let (status, page) = send(&app, "GET", "/bets/active", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_count"], 1);
        assert_eq!(page["page"], 1);

        let (status, settled) = send(
            &app,
            "POST",
            &format!("/bets/{bet_id}/settle"),
            Some(&token),
            Some(json!({ "outcome": "half_win" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(settled["bet"]["status"], BetStatus::Settled.as_str());
        assert_eq!(settled["payout"]["returned"], 175.0);

        let (_, history) = send(&app, "GET", "/bets?status=settled", Some(&token), None).await;
        assert_eq!(history["total_count"], 1);

        let (status, stats) = send(&app, "GET", "/bets/stats", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_profit"], 75.0);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = test_app();
        let alice = login(&app, "alice").await;
        let bob = login(&app, "bob").await;

        let (status, _) = send(
            &app,
            "POST",
            "/bets",
            Some(&alice),
            Some(json!({ "selection_id": "nadal", "stake_amount": 0.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/bets",
            Some(&alice),
            Some(json!({ "selection_id": "federer", "stake_amount": 10.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, bet) = send(
            &app,
            "POST",
            "/bets",
            Some(&alice),
            Some(json!({ "selection_id": "djokovic", "stake_amount": 10.0 })),
        )
        .await;
        let uri = format!("/bets/{}", bet["id"].as_str().unwrap());

        let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            "POST",
            &format!("{uri}/settle"),
            Some(&alice),
            Some(json!({ "outcome": "push" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("push"));
    }
}
