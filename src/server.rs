use crate::config::AppConfig;
use crate::format::Locale;
use crate::layers::{LegendEntry, ThematicLayer};
use crate::panel::InfoPanel;
use crate::render::{self, MapFrame, Theme};
use crate::renderer::ChoroplethRenderer;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

/// Shared, read-only server state. Layer and hover come with each request.
pub struct AppState {
    pub renderer: ChoroplethRenderer,
    pub theme: Theme,
    pub locale: Locale,
    pub default_layer: ThematicLayer,
}

#[derive(Deserialize)]
pub struct MapParams {
    layer: Option<ThematicLayer>,
    theme: Option<Theme>,
    hover: Option<String>,
}

#[derive(Deserialize)]
pub struct LayerParams {
    layer: Option<ThematicLayer>,
}

#[derive(Deserialize)]
pub struct HoverParams {
    x: f64,
    y: f64,
    layer: Option<ThematicLayer>,
}

#[derive(Serialize)]
pub struct LayerInfo {
    id: &'static str,
    label: &'static str,
    title: Option<&'static str>,
    legend: Vec<LegendEntry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/map.svg", get(svg_handler))
        .route("/api/frame", get(frame_handler))
        .route("/api/layers", get(layers_handler))
        .route("/api/regions/:code", get(region_handler))
        .route("/api/hover", get(hover_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, renderer: ChoroplethRenderer) -> Result<()> {
    let state = Arc::new(AppState {
        renderer,
        theme: config.render.theme,
        locale: config.render.locale,
        default_layer: config.render.layer,
    });

    let mut app = router(state);
    if let Some(dir) = &config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

impl AppState {
    fn frame(&self, params: &MapParams) -> Result<MapFrame, StatusCode> {
        let map = self
            .renderer
            .map()
            .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
        let hover = match &params.hover {
            Some(code) => Some(map.feature_by_code(code).ok_or(StatusCode::NOT_FOUND)?),
            None => None,
        };
        Ok(map.frame(
            self.renderer.tables(),
            params.layer.unwrap_or(self.default_layer),
            hover,
            params.theme.unwrap_or(self.theme),
            self.locale,
        ))
    }
}

async fn svg_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let frame = state.frame(&params)?;
    let svg = render::to_svg(&frame);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

async fn frame_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<Json<MapFrame>, StatusCode> {
    state.frame(&params).map(Json)
}

async fn layers_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LayerInfo>> {
    let layers: Vec<LayerInfo> = ThematicLayer::ALL
        .into_iter()
        .map(|layer| LayerInfo {
            id: layer.id(),
            label: layer.label(),
            title: layer.legend_title(),
            legend: layer
                .scale()
                .map(|s| s.legend(state.locale))
                .unwrap_or_default(),
        })
        .collect();
    Json(layers)
}

async fn region_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<LayerParams>,
) -> Result<Json<InfoPanel>, StatusCode> {
    let map = state
        .renderer
        .map()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let feature = map.feature_by_code(&code).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(InfoPanel::build(
        map.features().get(feature),
        params.layer.unwrap_or(state.default_layer),
        state.renderer.tables(),
        state.locale,
    )))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverParams>,
) -> Result<Json<Option<InfoPanel>>, StatusCode> {
    let map = state
        .renderer
        .map()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let panel = map.feature_at(params.x, params.y).map(|feature| {
        InfoPanel::build(
            map.features().get(feature),
            params.layer.unwrap_or(state.default_layer),
            state.renderer.tables(),
            state.locale,
        )
    });
    Ok(Json(panel))
}
