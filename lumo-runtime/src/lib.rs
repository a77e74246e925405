//! # Lumo runtime
//!
//! Renders parsed ZTMF documents into a host surface, keeps the page's
//! components alive across navigations and intercepts links to other ZTMF
//! documents.
//!
//! The environment is abstracted behind [`host::Host`]; [`memory`] provides
//! an in-memory implementation used by the headless binary and tests.
//!
//! ```ignore
//! use lumo_runtime::{memory::MemoryHost, NavigationController, RuntimeConfig};
//!
//! let config = RuntimeConfig::default();
//! let memory = MemoryHost::new(location.clone(), fetcher);
//! let providers = ProviderLoader::new(registry, source, config.provider_timeout());
//! let controller = NavigationController::new(config, memory.host(), providers);
//! controller.start(&location).await?;
//! controller.on_link_click("guide.ztmf").await?;
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod host;
pub mod memory;
pub mod navigation;
pub mod providers;
pub mod session;
pub mod widgets;

pub use config::RuntimeConfig;
pub use error::{FetchError, RuntimeError, RuntimeResult};
pub use fetch::FileFetcher;
pub use host::{
    CanvasHandle, ElementId, ElementSpec, Fetcher, History, HistoryState, Host, LinkListener,
    PreferenceStore, Region, Surface,
};
pub use navigation::{
    base_url_of, is_ztmf_link, ClickDisposition, HistoryMode, NavigationController, RenderOutcome,
};
pub use providers::{
    BackgroundHandle, BackgroundProvider, BundledProviders, ProviderFactory, ProviderLoader,
    ProviderOptions, ProviderRegistry, ProviderSource,
};
pub use session::{RenderSession, SessionPhase, SessionSummary};
pub use widgets::{ComponentAction, ComponentKind, MountedComponent};
