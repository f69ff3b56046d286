use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use instafy::{
    background,
    config::{Config, RemoverConfig},
    gateway::{server, EditGateway},
    logger::{self, LoggerConfig},
    models::ImagePayload,
    pipeline::{EditService, HttpEditService, Pipeline},
    presentation,
};

#[derive(Parser, Debug)]
#[command(name = "instafy", version, about = "Re-pose the subject of a photo with Gemini")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the edit gateway HTTP service.
    Serve(ServeArgs),
    /// Run the four-step pipeline on one photo.
    Run(RunArgs),
    /// List the available poses.
    Poses,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to bind (defaults to HOST or 127.0.0.1).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (defaults to PORT or 8080).
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Photo to edit.
    #[arg(long)]
    image: PathBuf,

    /// Pose id, see `instafy poses`.
    #[arg(long)]
    pose: String,

    /// Directory receiving the result images (defaults to INSTAFY_OUTPUT_DIR
    /// or ./instafy-out).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Gateway endpoint (defaults to INSTAFY_GATEWAY_URL).
    #[arg(long, conflicts_with = "in_process")]
    gateway_url: Option<String>,

    /// Call Gemini directly instead of going through a running gateway.
    #[arg(long)]
    in_process: bool,

    /// Background remover backend: `command` or `imgly`.
    #[arg(long)]
    remover: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using process environment");
    }

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.cmd {
        Command::Serve(args) => serve(config, args).await,
        Command::Run(args) => run(config, args).await,
        Command::Poses => {
            println!("{}", presentation::render_pose_catalog());
            Ok(())
        }
    }
}

async fn serve(mut config: Config, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.host_or_default(),
        config.port_or_default(),
    );
    logger::log_config_info(&config);

    let gateway = EditGateway::from_config(&config)?;
    server::run_server(&config, gateway).await?;
    Ok(())
}

async fn run(config: Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut remover_config = config.remover.clone().unwrap_or_else(RemoverConfig::from_env);
    if let Some(backend) = args.remover {
        remover_config = remover_config.with_backend(backend);
    }
    let remover = background::from_config(&remover_config)?;
    background::preload(remover.as_ref()).await;

    let service: Arc<dyn EditService> = if args.in_process {
        log::info!("Using in-process gateway");
        Arc::new(EditGateway::from_config(&config)?)
    } else {
        let url = args
            .gateway_url
            .unwrap_or_else(|| config.gateway_url_or_default());
        log::info!("Using gateway at {}", url);
        Arc::new(HttpEditService::new(url))
    };

    let bytes = tokio::fs::read(&args.image).await?;
    let image = ImagePayload::sniffed(bytes)?;

    let mut pipeline =
        Pipeline::new(remover, service).with_observer(presentation::progress_printer());
    pipeline.select_image(image);
    pipeline.select_pose(&args.pose)?;

    let outcome = pipeline.run().await.map(|_| ());

    let out_dir = args
        .out
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("instafy-out"));
    let saved = presentation::save_artifacts(pipeline.artifacts(), &out_dir).await?;
    for path in &saved {
        println!("{}", path.display());
    }

    outcome?;
    Ok(())
}
