use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::GlobalKeyExtractor,
    GovernorLayer,
};
use tracing::{debug, error, info, warn};

use crate::auth::authenticate;
use crate::db::DbError;
use crate::models::{ItemModel, StoreModel, UserModel};

use super::auth::ensure_authorized;
use super::error::ApiError;
use super::payload::{Credentials, ItemPayload, JsonOrForm, UserPayload};
use super::responses::{
    build_store_response, HealthResponse, ItemListResponse, ItemResponse, MessageResponse,
    StoreListResponse, StoreResponse, TokenResponse,
};
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/auth", post(login))
        .route("/register", post(register))
        .route(
            "/item/{name}",
            get(get_item)
                .post(create_item)
                .put(put_item)
                .delete(delete_item),
        )
        .route("/items", get(list_items))
        .route(
            "/store/{name}",
            get(get_store).post(create_store).delete(delete_store),
        )
        .route("/stores", get(list_stores));

    let governor_conf = GovernorConfigBuilder::default()
        .period(state.rate_limit.replenish_interval())
        .burst_size(state.rate_limit.burst)
        .key_extractor(GlobalKeyExtractor)
        .finish();
    let app = match governor_conf {
        Some(conf) => app.layer(GovernorLayer::new(Arc::new(conf))),
        None => {
            warn!(
                requests_per_second = state.rate_limit.requests_per_second,
                burst = state.rate_limit.burst,
                "invalid rate limit; serving without one"
            );
            app
        }
    };

    app.layer(
        tower_http::request_id::SetRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
            tower_http::request_id::MakeRequestUuid::default(),
        ),
    )
    .layer(tower_http::request_id::PropagateRequestIdLayer::new(
        axum::http::header::HeaderName::from_static("x-request-id"),
    ))
    .layer(tower_http::trace::TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(credentials) = payload.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "malformed login request");
        ApiError::MalformedCredentials
    })?;

    let Some(user) = authenticate(&state.db, &credentials.username, &credentials.password)? else {
        warn!(username = %credentials.username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };
    let identity = user.id.ok_or(ApiError::UnknownIdentity)?;

    let access_token = state.tokens.issue(identity).map_err(|err| {
        error!(error = %err, "failed to issue access token");
        ApiError::TokenIssue
    })?;
    info!(username = %user.username, "access token issued");

    Ok(Json(TokenResponse { access_token }))
}

async fn register(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<UserPayload>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let (username, password) = payload.validate()?;

    let mut user = UserModel::new(username, password);
    user.insert(&state.db).map_err(|err| match err {
        DbError::UniqueViolation => ApiError::UserExists,
        other => ApiError::Database(other),
    })?;
    info!(username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully.",
        }),
    ))
}

async fn get_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ItemResponse>, ApiError> {
    ensure_authorized(&state, &headers)?;

    let item = ItemModel::find_by_name(&state.db, &name)?.ok_or(ApiError::ItemNotFound)?;
    debug!(item = %item.name, "item requested");
    Ok(Json(item.into()))
}

async fn create_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    JsonOrForm(payload): JsonOrForm<ItemPayload>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    if ItemModel::find_by_name(&state.db, &name)?.is_some() {
        return Err(ApiError::ItemExists(name));
    }
    let fields = payload.validate()?;

    let mut item = ItemModel::new(name, fields.price, fields.store_id);
    item.save(&state.db)
        .map_err(|err| item_write_error(err, &item.name, item.store_id))?;
    debug!(item = %item.name, store_id = item.store_id, "item created");

    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn put_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    JsonOrForm(payload): JsonOrForm<ItemPayload>,
) -> Result<Json<ItemResponse>, ApiError> {
    let fields = payload.validate()?;

    let item = ItemModel::put(&state.db, &name, fields.price, fields.store_id)
        .map_err(|err| item_write_error(err, &name, fields.store_id))?;
    debug!(item = %item.name, price = item.price, "item stored");

    Ok(Json(item.into()))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = ItemModel::delete_by_name(&state.db, &name)?;
    debug!(item = %name, removed, "item delete requested");
    Ok(Json(MessageResponse {
        message: "Item deleted",
    }))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<ItemListResponse>, ApiError> {
    let items: Vec<ItemResponse> = ItemModel::all(&state.db)?
        .into_iter()
        .map(ItemResponse::from)
        .collect();
    debug!(items = items.len(), "item list requested");
    Ok(Json(ItemListResponse { items }))
}

async fn get_store(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StoreResponse>, ApiError> {
    let store = StoreModel::find_by_name(&state.db, &name)?.ok_or(ApiError::StoreNotFound)?;
    let response = build_store_response(&state.db, store)?;
    debug!(store = %response.name, items = response.items.len(), "store requested");
    Ok(Json(response))
}

async fn create_store(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    if StoreModel::find_by_name(&state.db, &name)?.is_some() {
        return Err(ApiError::StoreExists(name));
    }

    let mut store = StoreModel::new(name);
    store.insert(&state.db).map_err(|err| match err {
        DbError::UniqueViolation => ApiError::StoreExists(store.name.clone()),
        other => ApiError::Database(other),
    })?;
    debug!(store = %store.name, id = ?store.id, "store created");

    let response = build_store_response(&state.db, store)?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn delete_store(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = StoreModel::delete_by_name(&state.db, &name)?;
    debug!(store = %name, removed, "store delete requested");
    Ok(Json(MessageResponse {
        message: "Store deleted",
    }))
}

async fn list_stores(State(state): State<AppState>) -> Result<Json<StoreListResponse>, ApiError> {
    let stores = StoreModel::all(&state.db)?
        .into_iter()
        .map(|store| build_store_response(&state.db, store))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(stores = stores.len(), "store list requested");
    Ok(Json(StoreListResponse { stores }))
}

fn item_write_error(err: DbError, name: &str, store_id: i64) -> ApiError {
    match err {
        DbError::UniqueViolation => ApiError::ItemExists(name.to_string()),
        DbError::ForeignKeyViolation => ApiError::UnknownStore(store_id),
        other => ApiError::Database(other),
    }
}
