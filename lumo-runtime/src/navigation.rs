//! Navigation controller: fetch → parse → render, one navigation at a time.
//!
//! The controller owns the current [`RenderSession`] behind an async mutex.
//! Every navigation holds that lock from fetch to the end of mounting, so
//! teardown of one render always finishes before the next one mounts, and
//! queued navigations run in arrival order.
//!
//! Link clicks are routed through [`NavigationController::on_link_click`];
//! the host installs a single document-wide listener per render, described
//! by the [`LinkListener`] passed to [`Surface::set_link_listener`].

use lumo_ztmf::ZtmfDocument;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{ElementId, HistoryState, Host, LinkListener, Surface};
use crate::providers::ProviderLoader;
use crate::session::{RenderSession, SessionSummary};
use crate::widgets::{ComponentAction, MountContext};

/// Id of the `<style>` element holding a document's inline stylesheet.
pub const INLINE_STYLE_ID: &str = "lumo-inline-style";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// Record the navigation as a new history entry.
    Push,
    /// Leave history alone (start-up, back/forward).
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { document_url: Url },
    /// A `type=html` document sent the host elsewhere; nothing was rendered.
    Redirected { target: Url },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    /// The click was a ZTMF link and has been handled.
    Intercepted,
    /// Let the host follow the link normally.
    PassThrough,
}

pub struct NavigationController {
    config: RuntimeConfig,
    host: Host,
    providers: ProviderLoader,
    session: tokio::sync::Mutex<RenderSession>,
    link_base: Mutex<Option<Url>>,
    generation: AtomicU64,
    context_menu_disabled: AtomicBool,
}

impl NavigationController {
    pub fn new(config: RuntimeConfig, host: Host, providers: ProviderLoader) -> Arc<Self> {
        Arc::new(Self {
            config,
            host,
            providers,
            session: tokio::sync::Mutex::new(RenderSession::default()),
            link_base: Mutex::new(None),
            generation: AtomicU64::new(0),
            context_menu_disabled: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Base URL relative links are resolved against, once something rendered.
    pub fn link_base(&self) -> Option<Url> {
        self.link_base.lock().clone()
    }

    pub async fn session_summary(&self) -> SessionSummary {
        self.session.lock().await.summary()
    }

    fn surface(&self) -> &dyn Surface {
        self.host.surface.as_ref()
    }

    fn status(&self, message: &str) {
        self.surface()
            .show_status(message, self.config.status_timeout());
    }

    /// Fetch, parse and render `url`, replacing the current render.
    pub async fn navigate(&self, url: Url, mode: HistoryMode) -> RuntimeResult<RenderOutcome> {
        let mut session = self.session.lock().await;

        self.status(&format!("Loading {}", url));
        let text = match self.host.fetcher.fetch(&url).await {
            Ok(text) => text,
            Err(source) => {
                self.status(&format!("Network error: {}", source));
                return Err(RuntimeError::Fetch {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let doc = lumo_ztmf::parse_document(&text);
        let base_url = base_url_of(&url);

        if doc.meta.page_type().as_deref() == Some("html") {
            match doc.meta.redirect_target() {
                Some(target) => {
                    let target = resolve(&base_url, target)?;
                    info!(from = %url, to = %target, "document redirects");
                    self.surface().redirect(&target);
                    return Ok(RenderOutcome::Redirected { target });
                }
                None => warn!(url = %url, "type=html without href/url/link, rendering as usual"),
            }
        }

        self.apply_head(&doc, &base_url);

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut previous = std::mem::replace(
            &mut *session,
            RenderSession::new(id, url.clone(), base_url.clone()),
        );
        previous.teardown(self.surface()).await;

        self.surface().set_app_html(&doc.to_html());

        let ctx = MountContext {
            surface: self.surface(),
            preferences: self.host.preferences.as_ref(),
            providers: &self.providers,
            config: &self.config,
            base_url: &base_url,
            meta: &doc.meta,
        };
        session.mount(&doc.components(), &ctx).await;

        *self.link_base.lock() = Some(base_url.clone());
        self.surface().set_link_listener(Some(LinkListener {
            base_url,
            generation: id,
        }));

        if mode == HistoryMode::Push {
            let entry = entry_url_for(&url, &self.host.history.location(), &self.config)?;
            self.host.history.push(
                HistoryState {
                    document_url: url.clone(),
                },
                doc.title().unwrap_or_default(),
                &entry,
            );
        }

        let label = doc.title().map(str::to_string).unwrap_or_else(|| url.to_string());
        self.status(&format!("Loaded: {}", label));
        info!(url = %url, session = id, "document rendered");

        Ok(RenderOutcome::Rendered { document_url: url })
    }

    fn apply_head(&self, doc: &ZtmfDocument, base_url: &Url) {
        let surface = self.surface();
        if let Some(title) = doc.meta.title() {
            surface.set_title(title);
        }
        if let Some(icon) = doc.meta.icon() {
            match base_url.join(icon) {
                Ok(href) => surface.set_favicon(&href),
                Err(e) => warn!(icon, error = %e, "invalid favicon URL"),
            }
        }
        for sheet in doc.meta.stylesheets() {
            match base_url.join(sheet) {
                Ok(href) => {
                    if !surface.load_stylesheet(&href) {
                        debug!(href = %href, "stylesheet already loaded");
                    }
                }
                Err(e) => warn!(stylesheet = sheet, error = %e, "invalid stylesheet URL"),
            }
        }
        if let Some(css) = &doc.inline_style {
            surface.set_inline_style(INLINE_STYLE_ID, css);
        }
        if doc.meta.context_menu_disabled() && !self.context_menu_disabled.swap(true, Ordering::SeqCst)
        {
            surface.disable_context_menu();
        }
    }

    /// The document a clicked `href` should load, if it is ours to handle.
    pub fn intercept_link(&self, href: &str) -> Option<Url> {
        if !is_ztmf_link(href, &self.config.ztmf_extension) {
            return None;
        }
        let base = self.link_base()?;
        match base.join(href.trim()) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(href, error = %e, "unresolvable link");
                None
            }
        }
    }

    pub async fn on_link_click(&self, href: &str) -> RuntimeResult<ClickDisposition> {
        let Some(url) = self.intercept_link(href) else {
            return Ok(ClickDisposition::PassThrough);
        };
        debug!(href, url = %url, "link intercepted");
        self.navigate(url, HistoryMode::Push).await?;
        Ok(ClickDisposition::Intercepted)
    }

    /// Click on a component root. A back action that leaves the runtime
    /// goes through [`Surface::redirect`]; `HistoryBack` only moves the host
    /// history, whose `popstate` comes back through [`Self::on_popstate`].
    pub async fn activate_element(&self, element: ElementId) -> RuntimeResult<Option<ComponentAction>> {
        let action = {
            let mut session = self.session.lock().await;
            session.activate(
                element,
                self.surface(),
                self.host.preferences.as_ref(),
                self.host.history.as_ref(),
            )
        };

        match &action {
            Some(ComponentAction::HistoryBack) => self.host.history.back(),
            Some(ComponentAction::Navigate(target)) => {
                if is_ztmf_link(target.as_str(), &self.config.ztmf_extension) {
                    self.navigate(target.clone(), HistoryMode::Push).await?;
                } else {
                    self.surface().redirect(target);
                }
            }
            None => {}
        }
        Ok(action)
    }

    /// Back/forward: the stored document, else the one named in the
    /// location's query, else the start document.
    pub async fn on_popstate(&self, state: Option<HistoryState>) -> RuntimeResult<RenderOutcome> {
        let location = self.host.history.location();
        let url = match state {
            Some(state) => state.document_url,
            None => match document_from_location(&location, &self.config) {
                Some(url) => url,
                None => self.start_document(&location)?,
            },
        };
        self.navigate(url, HistoryMode::Keep).await
    }

    /// First render for the page at `location`. A named document that fails
    /// to load falls back to the start document.
    pub async fn start(&self, location: &Url) -> RuntimeResult<RenderOutcome> {
        let start = self.start_document(location)?;
        let Some(requested) = document_from_location(location, &self.config) else {
            return self.navigate(start, HistoryMode::Keep).await;
        };

        match self.navigate(requested.clone(), HistoryMode::Keep).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if requested != start => {
                warn!(url = %requested, error = %e, "initial load failed, loading start document");
                self.navigate(start, HistoryMode::Keep).await
            }
            Err(e) => Err(e),
        }
    }

    fn start_document(&self, location: &Url) -> RuntimeResult<Url> {
        resolve(location, &self.config.start_document)
    }
}

fn resolve(base: &Url, input: &str) -> RuntimeResult<Url> {
    base.join(input).map_err(|source| RuntimeError::InvalidUrl {
        input: input.to_string(),
        source,
    })
}

/// `href` names a ZTMF document: extension match with query and fragment
/// ignored; never for fragments or `mailto:`/`tel:`/`javascript:`.
pub fn is_ztmf_link(href: &str, extension: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    if ["mailto:", "tel:", "javascript:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return false;
    }
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(&format!(".{}", extension.to_ascii_lowercase()))
}

/// `url` with its last path segment, query and fragment removed.
pub fn base_url_of(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if let Ok(mut segments) = base.path_segments_mut() {
        segments.pop().push("");
    }
    base
}

/// Reload-safe address of a document: the entry page next to the current
/// location, naming the document in a query parameter.
pub fn entry_url_for(document_url: &Url, location: &Url, config: &RuntimeConfig) -> RuntimeResult<Url> {
    let entry_dir = base_url_of(location);
    let mut entry = resolve(&entry_dir, &config.entry_page)?;

    let same_origin = document_url.origin() == entry_dir.origin();
    let file = match document_url.path().strip_prefix(entry_dir.path()) {
        Some(relative) if same_origin && !relative.is_empty() => {
            let mut file = relative.to_string();
            if let Some(query) = document_url.query() {
                file.push('?');
                file.push_str(query);
            }
            file
        }
        _ => document_url.to_string(),
    };

    entry
        .query_pairs_mut()
        .clear()
        .append_pair(&config.file_param, &file);
    Ok(entry)
}

/// The document a location names, through the file parameter or by being
/// a ZTMF document itself.
pub fn document_from_location(location: &Url, config: &RuntimeConfig) -> Option<Url> {
    let file = location
        .query_pairs()
        .find(|(key, _)| key == config.file_param.as_str())
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty());

    if let Some(file) = file {
        return base_url_of(location).join(file.trim()).ok();
    }
    if is_ztmf_link(location.path(), &config.ztmf_extension) {
        let mut document = location.clone();
        document.set_fragment(None);
        return Some(document);
    }
    None
}
