use async_trait::async_trait;
use clap::Parser;
use lumo_runtime::memory::{MemoryHistory, MemoryPreferences, MemorySurface};
use lumo_runtime::{
    BackgroundHandle, BundledProviders, CanvasHandle, ClickDisposition, FileFetcher, Host,
    NavigationController, ProviderFactory, ProviderLoader, ProviderOptions, ProviderRegistry,
    RenderOutcome, RuntimeConfig, RuntimeError, RuntimeResult,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(
    name = "lumo-headless",
    about = "Render a ZTMF site into an in-memory surface and print what it shows"
)]
struct Cli {
    /// Site directory (its start document is loaded) or a single .ztmf file
    path: PathBuf,
    /// Runtime configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Follow these link hrefs in order after the first render
    #[arg(long = "click")]
    clicks: Vec<String>,
    /// Background providers to treat as available
    #[arg(long = "provider")]
    providers: Vec<String>,
}

/// Stand-in effect for canvases rendered without a display.
struct HeadlessEffect {
    canvas: CanvasHandle,
}

#[async_trait]
impl BackgroundHandle for HeadlessEffect {
    async fn destroy(&mut self) -> RuntimeResult<()> {
        info!(provider = %self.canvas.provider, "headless background destroyed");
        Ok(())
    }
}

fn headless_provider() -> ProviderFactory {
    Arc::new(
        |canvas: CanvasHandle, options: ProviderOptions| -> RuntimeResult<Box<dyn BackgroundHandle>> {
            info!(
                provider = %canvas.provider,
                width = canvas.width,
                height = canvas.height,
                base = %options.base_url,
                "headless background created"
            );
            Ok(Box::new(HeadlessEffect { canvas }))
        },
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> RuntimeResult<()> {
    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path).await?,
        None => RuntimeConfig::default(),
    };
    let location = location_for(&cli.path, &config)?;

    let source = cli
        .providers
        .iter()
        .fold(BundledProviders::new(), |source, name| {
            source.with(name, headless_provider())
        });
    let providers = ProviderLoader::new(
        Arc::new(ProviderRegistry::new()),
        Arc::new(source),
        config.provider_timeout(),
    );

    let surface = Arc::new(MemorySurface::new());
    let host = Host {
        surface: surface.clone(),
        fetcher: Arc::new(FileFetcher),
        history: Arc::new(MemoryHistory::new(location.clone())),
        preferences: Arc::new(MemoryPreferences::new()),
    };
    let controller = NavigationController::new(config, host, providers);

    let mut outcomes = vec![describe(&controller.start(&location).await?)];
    for href in &cli.clicks {
        match controller.on_link_click(href).await? {
            ClickDisposition::Intercepted => outcomes.push(format!("clicked {}", href)),
            ClickDisposition::PassThrough => outcomes.push(format!("passed through {}", href)),
        }
    }

    let report = serde_json::json!({
        "outcomes": outcomes,
        "session": controller.session_summary().await,
        "surface": surface.snapshot(),
    });
    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| RuntimeError::Config(format!("report serialization: {}", e)))?;
    println!("{}", text);
    Ok(())
}

/// The page location the runtime pretends to run at.
fn location_for(path: &Path, config: &RuntimeConfig) -> RuntimeResult<Url> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|e| RuntimeError::Config(format!("{}: {}", path.display(), e)))?;
    let invalid = || RuntimeError::Config(format!("not a local path: {}", absolute.display()));

    if absolute.is_dir() {
        let dir = Url::from_directory_path(&absolute).map_err(|_| invalid())?;
        dir.join(&config.entry_page)
            .map_err(|source| RuntimeError::InvalidUrl {
                input: config.entry_page.clone(),
                source,
            })
    } else {
        Url::from_file_path(&absolute).map_err(|_| invalid())
    }
}

fn describe(outcome: &RenderOutcome) -> String {
    match outcome {
        RenderOutcome::Rendered { document_url } => format!("rendered {}", document_url),
        RenderOutcome::Redirected { target } => format!("redirected to {}", target),
    }
}
