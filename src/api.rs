use axum::{
    extract::{rejection::JsonRejection, Query, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::balance::fetch_balance;
use crate::config::Config;
use crate::error::ProxyError;
use crate::history::{apply_filter, fetch_history, EmptyReason};
use crate::identity::{require_email, resolve_customer};
use crate::models::{Account, Balance, HistoryFilter, Transaction};
use crate::redeem::{self, RedeemBody};
use crate::signature::{ProxyContext, SignatureValidator};
use crate::source::StoreCreditSource;
use crate::stats::StatisticsSummary;

/// Process-wide, read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<dyn StoreCreditSource>,
    pub validator: SignatureValidator,
}

impl AppState {
    pub fn new(config: Arc<Config>, source: Arc<dyn StoreCreditSource>) -> Self {
        let validator =
            SignatureValidator::new(config.api_secret.as_deref(), config.timestamp_tolerance_secs);
        Self {
            config,
            source,
            validator,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub customer_email: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    #[serde(flatten)]
    pub balance: Balance,
    pub customer: Account,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub filter: HistoryFilter,
    pub history: Vec<Transaction>,
    /// Totals over the unfiltered history.
    pub summary: StatisticsSummary,
    pub empty: Option<EmptyReason>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // signature check runs before any handler on these routes
    let proxy = Router::new()
        .route("/balance", get(balance))
        .route("/history", get(history))
        .route("/redeem", post(redeem))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_signature));

    let prefix = state.config.proxy_prefix();

    Router::new()
        .route("/", get(|| async { "BaziCash proxy running" }))
        .route("/health", get(health))
        .nest("/proxy", proxy.clone())
        .nest(&prefix, proxy)
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState) -> eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let prefix = state.config.proxy_prefix();
    let app = router(state);

    info!("API listening on http://{}", addr);
    info!("  GET  /proxy/balance?customer_email=<email>  (also {}/balance)", prefix);
    info!("  GET  /proxy/history?customer_email=<email>  (also {}/history)", prefix);
    info!("  POST /proxy/redeem                          (also {}/redeem)", prefix);
    info!("  GET  /health");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ---------- middleware ----------

async fn log_request(request: Request, next: Next) -> Response {
    info!("{} {}", request.method(), request.uri().path());
    next.run(request).await
}

async fn verify_signature(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let params = match Query::<Vec<(String, String)>>::try_from_uri(request.uri()) {
        Ok(Query(params)) => params,
        Err(e) => {
            warn!("❌ Unparseable app proxy query on {}: {}", request.uri().path(), e);
            return ProxyError::Auth.into_response();
        }
    };

    if let Err(reason) = state.validator.check(&params, Utc::now()) {
        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        warn!(
            "❌ Invalid app proxy signature on {} ({}); params: {:?}",
            request.uri().path(),
            reason,
            names
        );
        return ProxyError::Auth.into_response();
    }

    let ctx = ProxyContext::from_params(&params);
    debug!(
        "✅ App proxy signature valid (shop={:?}, customer={:?}, prefix={:?})",
        ctx.shop, ctx.logged_in_customer_id, ctx.path_prefix
    );
    next.run(request).await
}

// ---------- handlers ----------

pub async fn balance(
    State(state): State<AppState>,
    Query(q): Query<CustomerQuery>,
) -> Result<Json<BalanceResponse>, ProxyError> {
    let email = require_email(q.customer_email.as_deref())?;
    let source = state.source.as_ref();

    let customer = resolve_customer(source, email, "Erro ao buscar saldo").await?;
    let balance = fetch_balance(source, &customer.id, &state.config.default_currency).await?;

    info!("💰 Balance for {}: {} {}", customer.id, balance.amount, balance.currency);

    Ok(Json(BalanceResponse {
        success: true,
        balance,
        customer,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    Query(q): Query<CustomerQuery>,
) -> Result<Json<HistoryResponse>, ProxyError> {
    let email = require_email(q.customer_email.as_deref())?;
    let filter = match q.filter.as_deref() {
        Some(raw) => raw.parse::<HistoryFilter>().map_err(ProxyError::validation)?,
        None => HistoryFilter::All,
    };
    let source = state.source.as_ref();

    let customer = resolve_customer(source, email, "Erro ao buscar histórico").await?;
    let full = fetch_history(source, &customer.id).await?;
    let summary = StatisticsSummary::from_history(&full);
    let view = apply_filter(&full, filter);

    info!("📜 History for {}: {} of {} ({})", customer.id, view.transactions().len(), full.len(), filter);

    Ok(Json(HistoryResponse {
        success: true,
        filter,
        history: view.transactions().to_vec(),
        summary,
        empty: view.empty_reason(),
    }))
}

pub async fn redeem(payload: Result<Json<RedeemBody>, JsonRejection>) -> Result<Json<Value>, ProxyError> {
    let Json(body) = payload.map_err(|e| {
        warn!("Rejected redeem body: {}", e);
        ProxyError::validation("Email e valor são obrigatórios")
    })?;

    let request = redeem::validate(&body)?;
    redeem::apply(&request)?;

    Ok(Json(json!({
        "success": true,
        "message": "Resgate realizado com sucesso!"
    })))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "shopify": {
            "store": state.config.store_domain,
            "apiVersion": state.config.api_version,
        },
        "dataSource": state.config.data_source,
    }))
}
