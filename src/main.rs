use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay::api::publish::PublishRequest;
use relay::cli::{self, AuthArgs};
use relay::models::credential::Credential;
use relay::models::container::ContainerState;
use relay::proxy::upstream::ThreadsClient;
use relay::{config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let cfg = config::load()?;

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
        Some(command) => {
            let client = ThreadsClient::new(cfg.threads_api_base.clone())?;
            handle_operator_command(&client, command).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Console logging filtered by RUST_LOG, JSON lines when RELAY_LOG_FORMAT=json,
/// and OTLP export when OTEL_EXPORTER_OTLP_ENDPOINT is set.
fn init_tracing() {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "threads-relay"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
        {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                eprintln!("OpenTelemetry exporter disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let json_logs = std::env::var("RELAY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (plain, json) = if json_logs {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "relay=debug,tower_http=debug".into()),
        ))
        .with(plain)
        .with(json)
        .with(telemetry_layer)
        .init();
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Forwarding to {}", cfg.threads_api_base);
    let state = Arc::new(AppState::new(cfg)?);
    let app = relay::build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("threads-relay listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn credential(auth: AuthArgs) -> anyhow::Result<Credential> {
    Credential::new(auth.token)
        .map(|c| c.with_account_id(auth.user_id))
        .ok_or_else(|| anyhow::anyhow!("access token is empty"))
}

async fn handle_operator_command(client: &ThreadsClient, cmd: cli::Commands) -> anyhow::Result<()> {
    match cmd {
        cli::Commands::Serve { .. } => anyhow::bail!("serve is not an operator command"),
        cli::Commands::Test { auth } => {
            let cred = credential(auth)?;
            let me = client.whoami(&cred).await?;
            println!(
                "Connected:\n  User ID:  {}\n  Username: {}",
                me.id,
                me.username.as_deref().unwrap_or("-")
            );
        }
        cli::Commands::Posts { auth } => {
            let cred = credential(auth)?;
            let user_id = client.resolve_user_id(&cred).await?;
            let page = client.list_posts(&cred, &user_id).await?;
            if page.data.is_empty() {
                println!("No posts found.");
            } else {
                println!("{:<20} {:<10} {:<8} TEXT", "ID", "TYPE", "LIKES");
                for p in page.data {
                    let text = p.text.unwrap_or_default().replace('\n', " ");
                    let text_display = if text.chars().count() > 40 {
                        format!("{}...", text.chars().take(37).collect::<String>())
                    } else {
                        text
                    };
                    println!(
                        "{:<20} {:<10} {:<8} {}",
                        p.id,
                        p.media_type.as_deref().unwrap_or("-"),
                        p.like_count.unwrap_or(0),
                        text_display
                    );
                }
            }
        }
        cli::Commands::Publish {
            auth,
            text,
            image_url,
            video_url,
            image_urls,
        } => {
            let cred = credential(auth)?;
            let request = PublishRequest {
                text,
                image_url,
                video_url,
                image_urls: image_urls.unwrap_or_default(),
                media_type: None,
            };
            let container = request.into_container()?;
            let user_id = client.resolve_user_id(&cred).await?;
            let published = client.publish(&cred, &user_id, &container).await?;
            println!(
                "Published:\n  Post ID:      {}\n  Container ID: {}",
                published.post_id, published.container_id
            );
        }
        cli::Commands::Limits { auth } => {
            let cred = credential(auth)?;
            let quota = client.fetch_quota(&cred).await?;
            println!("{}", serde_json::to_string_pretty(&quota)?);
        }
        cli::Commands::Status { auth, container_id } => {
            let cred = credential(auth)?;
            let status = client.container_status(&cred, &container_id).await?;
            let state = status
                .get("status")
                .cloned()
                .and_then(|v| serde_json::from_value::<ContainerState>(v).ok());
            match state {
                Some(state) => println!("Container {}: {:?}", container_id, state),
                None => println!("Container {}: unknown status", container_id),
            }
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        cli::Commands::Analytics { auth } => {
            let cred = credential(auth)?;
            let report = client.collect_analytics(&cred).await?;
            let s = &report.summary;
            println!("{:<10} {:>10} {:>10}", "METRIC", "TOTAL", "AVERAGE");
            println!("{:<10} {:>10} {:>10}", "views", s.totals.views, s.averages.views);
            println!("{:<10} {:>10} {:>10}", "likes", s.totals.likes, s.averages.likes);
            println!("{:<10} {:>10} {:>10}", "comments", s.totals.comments, s.averages.comments);
            println!("{:<10} {:>10} {:>10}", "quotes", s.totals.quotes, s.averages.quotes);
            println!("({} posts)", s.posts);
        }
    }
    Ok(())
}
