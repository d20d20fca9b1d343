//! RxLens: prescription image extraction and result archive server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rxlens_core::StoragePayload;
use rxlens_extract::ImagePayload;
use rxlens_server::{media, routes, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("RXLENS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn load_state() -> anyhow::Result<AppState> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = rxlens_core::RxLensConfig::from_env(&data_dir)?;
    AppState::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage: {}", e))
}

/// Run one extraction from the command line and print the result.
async fn run_extract(image_path: &Path, save: bool) -> anyhow::Result<()> {
    let state = load_state()?;
    let extractor = state
        .extractor
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;

    let filename = image_path.to_string_lossy();
    let mime = media::mime_from_filename(&filename)
        .ok_or_else(|| anyhow::anyhow!("Not a supported image file: {}", filename))?;
    let bytes = std::fs::read(image_path)?;

    let result = extractor
        .extract(&ImagePayload::Bytes(bytes), mime)
        .await
        .map_err(|e| anyhow::anyhow!("Extraction failed ({}): {}", e.kind(), e))?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if save {
        let payload = StoragePayload::from(result);
        let saved = state.archive.save(&payload)?;
        let record = state.store.append(payload)?;
        eprintln!("Saved {} (record {})", saved.filepath, record.id);
    }
    Ok(())
}

fn print_results() -> anyhow::Result<()> {
    let state = load_state()?;
    for name in state.archive.list()? {
        println!("{}", name);
    }
    Ok(())
}

fn print_help() {
    println!("RxLens: prescription extraction server");
    println!();
    println!("Usage: rxlens [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  extract <image> [--save] Extract one image and print the result");
    println!("  results                  List archived result files");
    println!("  help                     Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "extract" => {
                if args.len() < 3 {
                    eprintln!("Usage: rxlens extract <image> [--save]");
                    std::process::exit(1);
                }
                let save = args[3..].iter().any(|a| a == "--save");
                return run_extract(Path::new(&args[2]), save).await;
            }
            "results" => return print_results(),
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'rxlens help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let state = Arc::new(load_state()?);
    let port = state.config.port;

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RxLens server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
