//! Taskroute binary
//!
//! Serves the routing API over HTTP, routes a single prompt from the command
//! line, or prints a configuration template.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use taskroute::cli::{Cli, Command, generate_config_template};
use taskroute::config::Config;
use taskroute::handlers::{self, AppState};
use taskroute::router::{RouteRequest, resolve_model};
use taskroute::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        return write_template(output.as_deref());
    }

    let config = Arc::new(Config::from_file(&cli.config)?);
    telemetry::init(&config.observability.log_level);

    match cli.command {
        Some(Command::Route {
            prompt,
            images,
            override_model,
            providers,
        }) => {
            let mut request = RouteRequest::new(prompt)
                .with_images(images)
                .with_allowed_providers(providers);
            request.override_model = override_model;
            route_once(config, request).await
        }
        Some(Command::Serve) | None => serve(config).await,
        Some(Command::Config { .. }) => Ok(()),
    }
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            eprintln!("Wrote configuration template to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

async fn route_once(
    config: Arc<Config>,
    request: RouteRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(config)?;
    let selection = resolve_model(state.router(), &request, None).await;
    println!("{}", serde_json::to_string_pretty(&selection)?);
    Ok(())
}

async fn serve(config: Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting Taskroute server on {}:{}",
        config.server.host,
        config.server.port
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::new(config)?;
    state.start_health_probes().await;
    let app = handlers::app(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Routing endpoint available at http://{}/route", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
