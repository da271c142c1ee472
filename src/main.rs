use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rj_choropleth::config::AppConfig;
use rj_choropleth::data::GeometrySource;
use rj_choropleth::layers::ThematicLayer;
use rj_choropleth::render::{self, Theme};
use rj_choropleth::renderer::ChoroplethRenderer;
use rj_choropleth::server;
use rj_choropleth::stats::{StatisticTables, TableSources};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the map to an SVG file
    Render {
        /// Thematic layer driving the fill color
        #[arg(short, long)]
        layer: Option<ThematicLayer>,
        #[arg(short, long)]
        theme: Option<Theme>,
        /// Administrative code of the region to show in the info panel
        #[arg(long, value_name = "CODE")]
        hover: Option<String>,
        #[arg(short, long, value_name = "FILE", default_value = "map.svg")]
        output: PathBuf,
    },
    /// Serve the map and the hover API over HTTP
    Serve,
    /// List the available thematic layers
    Layers,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layers => {
            for layer in ThematicLayer::ALL {
                println!("{:<28} {}", layer.id(), layer.label());
            }
        }
        Commands::Render { layer, theme, hover, output } => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let mut renderer = load_renderer(&config).await?;

            renderer.select_layer(layer.unwrap_or(config.render.layer))?;
            if let Some(code) = &hover {
                renderer.hover_enter_code(code)?;
            }

            let theme = theme.unwrap_or(config.render.theme);
            let frame = renderer.frame(theme, config.render.locale)?;
            write_svg(&output, &render::to_svg(&frame))?;
            println!("{}", frame.panel);
        }
        Commands::Serve => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let renderer = load_renderer(&config).await?;
            server::start_server(config, renderer).await?;
        }
    }

    Ok(())
}

async fn load_renderer(config: &AppConfig) -> Result<ChoroplethRenderer> {
    let tables = StatisticTables::load(&TableSources::from_config(&config.input))
        .context("Failed to load statistic tables")?;
    if tables.unresolved_rows() > 0 {
        tracing::warn!(rows = tables.unresolved_rows(), "some statistic rows could not be matched to a municipality");
    }

    let mut renderer = ChoroplethRenderer::new(
        Arc::new(tables),
        config.render.width,
        config.render.height,
    );
    let source: GeometrySource = config
        .input
        .geometry
        .parse()
        .context("Invalid geometry source")?;
    let client = reqwest::Client::new();
    renderer
        .load(&source, &client)
        .await
        .with_context(|| format!("Failed to load feature collection from {}", source))?;
    Ok(renderer)
}

fn write_svg(path: &Path, svg: &str) -> Result<()> {
    std::fs::write(path, svg).with_context(|| format!("Failed to write SVG to {:?}", path))?;
    tracing::info!(?path, bytes = svg.len(), "map written");
    Ok(())
}
