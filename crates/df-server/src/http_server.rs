//! HTTP/REST services using Axum
//!
//! Two routers share one [`AppState`]: the update service owns entity
//! lifecycle, the query service answers time-aware reads. Handlers call the
//! synchronous store directly; every call is a short local read or write.

use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use chrono::Utc;
use df_graph::{Database, EntityStore};
use df_protocol::http::endpoints;
use df_protocol::{
    AttributeResponse, EntityPayload, EntityView, HealthResponse, IncomingRelationshipDto,
    RelationshipDto, RelationshipFilterDto, SearchRequest, SearchResponse,
};
use df_query::QueryEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: EntityStore,
    pub engine: QueryEngine,
    pub start_time: Instant,
    pub backend: &'static str,
    pub query_base_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(database: &Database, config: &ServerConfig) -> Self {
        let store = database.store();
        Self {
            engine: QueryEngine::new(store.clone()),
            store,
            start_time: Instant::now(),
            backend: database.backend_name(),
            query_base_url: config.query_base_url.as_deref().map(Arc::from),
        }
    }

    fn health(&self, service: &str) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            backend: self.backend.to_string(),
            base_url: self.query_base_url.as_deref().map(str::to_string),
        }
    }
}

/// Create the update service router
pub fn update_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(update_health))
        .route(endpoints::ENTITIES, post(create_entity))
        .route(
            endpoints::ENTITY,
            get(read_entity).put(update_entity).delete(delete_entity),
        )
        .route(endpoints::ENTITY_RELATIONSHIP, delete(delete_relationship))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the query service router
pub fn query_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(query_health))
        .route(endpoints::METADATA, get(get_metadata))
        .route(endpoints::ATTRIBUTE, get(get_attribute))
        .route(
            endpoints::RELATIONS,
            post(filter_relations).get(all_relations),
        )
        .route(endpoints::INCOMING_RELATIONS, get(incoming_relations))
        .route(endpoints::RELATIONSHIP, get(get_relationship))
        .route(endpoints::SEARCH, post(search_entities))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Health Check ====================

async fn update_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.health("update"))
}

async fn query_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.health("query"))
}

// ==================== Update Service ====================

async fn create_entity(
    State(state): State<AppState>,
    payload: Result<Json<EntityPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<EntityView>), ApiError> {
    let Json(payload) = payload?;
    let outcome = state.store.create(payload.into_entity()?)?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    info!("Stored entity {} ({})", outcome.entity().id, status);
    Ok((status, Json(EntityView::from(outcome.entity()))))
}

async fn read_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EntityView>, ApiError> {
    let entity = state.store.read(&id)?;
    Ok(Json(EntityView::from(&entity)))
}

async fn update_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EntityPayload>, JsonRejection>,
) -> Result<Json<EntityView>, ApiError> {
    let Json(payload) = payload?;
    payload.check_id(&id)?;

    let now = Utc::now();
    let entity = state.store.update(&id, payload.into_patch(now)?)?;
    Ok(Json(EntityView::at(&entity, now)))
}

async fn delete_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&id)?;
    info!("Deleted entity {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_relationship(
    State(state): State<AppState>,
    Path((id, rel_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_relationship(&id, &rel_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Query Service ====================

async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.engine.metadata(&id)?))
}

async fn get_attribute(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
) -> Result<Json<AttributeResponse>, ApiError> {
    let attr = state.engine.attribute_value(&id, &key, Utc::now())?;
    Ok(Json(attr.into()))
}

async fn filter_relations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RelationshipFilterDto>, JsonRejection>,
) -> Result<Json<Vec<RelationshipDto>>, ApiError> {
    let Json(payload) = payload?;
    let relations = state.engine.relations(&id, &payload.into_filter()?)?;
    debug!("{} relationships of {} matched", relations.len(), id);
    Ok(Json(relations.iter().map(RelationshipDto::from).collect()))
}

async fn all_relations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RelationshipDto>>, ApiError> {
    let relations = state.engine.all_relations(&id)?;
    Ok(Json(relations.iter().map(RelationshipDto::from).collect()))
}

async fn get_relationship(
    State(state): State<AppState>,
    Path((id, rel_id)): Path<(String, String)>,
) -> Result<Json<RelationshipDto>, ApiError> {
    let rel = state.engine.relationship(&id, &rel_id)?;
    Ok(Json(RelationshipDto::from(&rel)))
}

async fn incoming_relations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<IncomingRelationshipDto>>, ApiError> {
    let edges = state.engine.incoming_relations(&id)?;
    Ok(Json(edges.iter().map(IncomingRelationshipDto::from).collect()))
}

async fn search_entities(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(payload) = payload?;
    let now = Utc::now();
    let body = state
        .engine
        .search(&payload.into_criteria()?)?
        .iter()
        .map(|entity| EntityView::at(entity, now))
        .collect();
    Ok(Json(SearchResponse { body }))
}
