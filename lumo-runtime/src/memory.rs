//! In-memory host: a [`Surface`] that records what it is told, plus history,
//! preferences and a map-backed fetcher. Backs the headless binary and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::host::{
    CanvasHandle, ElementId, ElementSpec, Fetcher, History, HistoryState, Host, LinkListener,
    PreferenceStore, Region, Surface,
};

pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedElement {
    pub id: ElementId,
    pub region: Region,
    pub element: ElementSpec,
}

#[derive(Debug, Default)]
struct SurfaceState {
    next_id: ElementId,
    title: Option<String>,
    favicon: Option<Url>,
    stylesheets: Vec<Url>,
    inline_styles: BTreeMap<String, String>,
    app_html: String,
    elements: BTreeMap<ElementId, (Region, ElementSpec)>,
    canvas_sizes: HashMap<(ElementId, usize), (u32, u32)>,
    root_properties: BTreeMap<String, String>,
    root_classes: BTreeSet<String>,
    body_attributes: BTreeMap<String, String>,
    body_styles: BTreeMap<String, String>,
    statuses: Vec<String>,
    context_menu_disabled: usize,
    redirects: Vec<Url>,
    link_listener: Option<LinkListener>,
    listener_installs: usize,
}

/// Everything a [`MemorySurface`] currently shows.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSnapshot {
    pub title: Option<String>,
    pub favicon: Option<String>,
    pub stylesheets: Vec<String>,
    pub inline_styles: BTreeMap<String, String>,
    pub app_html: String,
    pub elements: Vec<MountedElement>,
    pub root_properties: BTreeMap<String, String>,
    pub root_classes: Vec<String>,
    pub body_attributes: BTreeMap<String, String>,
    pub body_styles: BTreeMap<String, String>,
    pub statuses: Vec<String>,
    pub redirects: Vec<String>,
    pub link_base: Option<String>,
}

pub struct MemorySurface {
    state: Mutex<SurfaceState>,
    viewport: (u32, u32),
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::with_viewport(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1)
    }

    pub fn with_viewport(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                next_id: 1,
                ..Default::default()
            }),
            viewport: (width, height),
        }
    }

    pub fn title(&self) -> Option<String> {
        self.state.lock().title.clone()
    }

    pub fn favicon(&self) -> Option<Url> {
        self.state.lock().favicon.clone()
    }

    pub fn stylesheets(&self) -> Vec<Url> {
        self.state.lock().stylesheets.clone()
    }

    pub fn inline_style(&self, id: &str) -> Option<String> {
        self.state.lock().inline_styles.get(id).cloned()
    }

    pub fn app_html(&self) -> String {
        self.state.lock().app_html.clone()
    }

    pub fn element(&self, id: ElementId) -> Option<ElementSpec> {
        self.state.lock().elements.get(&id).map(|(_, e)| e.clone())
    }

    pub fn elements(&self) -> Vec<MountedElement> {
        self.state
            .lock()
            .elements
            .iter()
            .map(|(id, (region, element))| MountedElement {
                id: *id,
                region: *region,
                element: element.clone(),
            })
            .collect()
    }

    pub fn find_by_class(&self, class: &str) -> Option<ElementId> {
        self.state
            .lock()
            .elements
            .iter()
            .find(|(_, (_, e))| e.has_class(class))
            .map(|(id, _)| *id)
    }

    pub fn count_with_class(&self, class: &str) -> usize {
        self.state
            .lock()
            .elements
            .values()
            .filter(|(_, e)| e.has_class(class))
            .count()
    }

    pub fn root_property(&self, name: &str) -> Option<String> {
        self.state.lock().root_properties.get(name).cloned()
    }

    pub fn has_root_class(&self, class: &str) -> bool {
        self.state.lock().root_classes.contains(class)
    }

    pub fn body_attribute(&self, name: &str) -> Option<String> {
        self.state.lock().body_attributes.get(name).cloned()
    }

    pub fn body_style(&self, name: &str) -> Option<String> {
        self.state.lock().body_styles.get(name).cloned()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.state.lock().statuses.clone()
    }

    pub fn redirects(&self) -> Vec<Url> {
        self.state.lock().redirects.clone()
    }

    pub fn link_listener(&self) -> Option<LinkListener> {
        self.state.lock().link_listener.clone()
    }

    /// How many times a link listener has been installed in total.
    pub fn listener_installs(&self) -> usize {
        self.state.lock().listener_installs
    }

    pub fn context_menu_disabled(&self) -> usize {
        self.state.lock().context_menu_disabled
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        let state = self.state.lock();
        SurfaceSnapshot {
            title: state.title.clone(),
            favicon: state.favicon.as_ref().map(Url::to_string),
            stylesheets: state.stylesheets.iter().map(Url::to_string).collect(),
            inline_styles: state.inline_styles.clone(),
            app_html: state.app_html.clone(),
            elements: state
                .elements
                .iter()
                .map(|(id, (region, element))| MountedElement {
                    id: *id,
                    region: *region,
                    element: element.clone(),
                })
                .collect(),
            root_properties: state.root_properties.clone(),
            root_classes: state.root_classes.iter().cloned().collect(),
            body_attributes: state.body_attributes.clone(),
            body_styles: state.body_styles.clone(),
            statuses: state.statuses.clone(),
            redirects: state.redirects.iter().map(Url::to_string).collect(),
            link_base: state.link_listener.as_ref().map(|l| l.base_url.to_string()),
        }
    }
}

impl Surface for MemorySurface {
    fn set_title(&self, title: &str) {
        self.state.lock().title = Some(title.to_string());
    }

    fn set_favicon(&self, href: &Url) {
        self.state.lock().favicon = Some(href.clone());
    }

    fn load_stylesheet(&self, href: &Url) -> bool {
        let mut state = self.state.lock();
        if state.stylesheets.contains(href) {
            return false;
        }
        state.stylesheets.push(href.clone());
        true
    }

    fn set_inline_style(&self, id: &str, css: &str) {
        self.state
            .lock()
            .inline_styles
            .insert(id.to_string(), css.to_string());
    }

    fn set_app_html(&self, html: &str) {
        let mut state = self.state.lock();
        state.app_html = html.to_string();
        state.elements.retain(|_, (region, _)| *region != Region::App);
    }

    fn append(&self, region: Region, element: ElementSpec) -> ElementId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.elements.insert(id, (region, element));
        id
    }

    fn update(&self, id: ElementId, element: ElementSpec) {
        if let Some(slot) = self.state.lock().elements.get_mut(&id) {
            slot.1 = element;
        }
    }

    fn remove(&self, id: ElementId) -> bool {
        let mut state = self.state.lock();
        state.canvas_sizes.retain(|(layer, _), _| *layer != id);
        state.elements.remove(&id).is_some()
    }

    fn canvases(&self, layer: ElementId) -> Vec<CanvasHandle> {
        let state = self.state.lock();
        let Some(html) = state.elements.get(&layer).and_then(|(_, e)| e.html.as_deref()) else {
            return Vec::new();
        };
        lumo_ztmf::scan_canvases(html)
            .into_iter()
            .map(|tag| {
                let (width, height) = state
                    .canvas_sizes
                    .get(&(layer, tag.index))
                    .copied()
                    .unwrap_or((tag.width.unwrap_or(0), tag.height.unwrap_or(0)));
                CanvasHandle {
                    layer,
                    index: tag.index,
                    provider: tag.provider,
                    width,
                    height,
                }
            })
            .collect()
    }

    fn resize_canvas(&self, canvas: &CanvasHandle, width: u32, height: u32) {
        self.state
            .lock()
            .canvas_sizes
            .insert((canvas.layer, canvas.index), (width, height));
    }

    fn set_root_property(&self, name: &str, value: &str) {
        self.state
            .lock()
            .root_properties
            .insert(name.to_string(), value.to_string());
    }

    fn set_root_class(&self, class: &str, enabled: bool) {
        let mut state = self.state.lock();
        if enabled {
            state.root_classes.insert(class.to_string());
        } else {
            state.root_classes.remove(class);
        }
    }

    fn set_body_attribute(&self, name: &str, value: &str) {
        self.state
            .lock()
            .body_attributes
            .insert(name.to_string(), value.to_string());
    }

    fn set_body_style(&self, name: &str, value: &str) {
        let mut state = self.state.lock();
        if value.is_empty() {
            state.body_styles.remove(name);
        } else {
            state.body_styles.insert(name.to_string(), value.to_string());
        }
    }

    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn show_status(&self, message: &str, duration: Duration) {
        debug!(duration_ms = duration.as_millis() as u64, "status: {}", message);
        self.state.lock().statuses.push(message.to_string());
    }

    fn disable_context_menu(&self) {
        self.state.lock().context_menu_disabled += 1;
    }

    fn redirect(&self, url: &Url) {
        self.state.lock().redirects.push(url.clone());
    }

    fn set_link_listener(&self, listener: Option<LinkListener>) {
        let mut state = self.state.lock();
        if listener.is_some() {
            state.listener_installs += 1;
        }
        state.link_listener = listener;
    }
}

#[derive(Debug)]
struct HistoryEntries {
    entries: Vec<(Url, Option<HistoryState>)>,
    index: usize,
}

/// Linear history with a cursor, like a browser tab's session history.
pub struct MemoryHistory {
    inner: Mutex<HistoryEntries>,
}

impl MemoryHistory {
    pub fn new(location: Url) -> Self {
        Self {
            inner: Mutex::new(HistoryEntries {
                entries: vec![(location, None)],
                index: 0,
            }),
        }
    }

    /// State of the current entry, as a `popstate` event would carry it.
    pub fn state(&self) -> Option<HistoryState> {
        let inner = self.inner.lock();
        inner.entries[inner.index].1.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl History for MemoryHistory {
    fn push(&self, state: HistoryState, _title: &str, url: &Url) {
        let mut inner = self.inner.lock();
        let keep = inner.index + 1;
        inner.entries.truncate(keep);
        inner.entries.push((url.clone(), Some(state)));
        inner.index = keep;
    }

    fn back(&self) {
        let mut inner = self.inner.lock();
        inner.index = inner.index.saturating_sub(1);
    }

    fn location(&self) -> Url {
        let inner = self.inner.lock();
        inner.entries[inner.index].0.clone()
    }

    fn previous(&self) -> Option<Url> {
        let inner = self.inner.lock();
        inner
            .index
            .checked_sub(1)
            .map(|i| inner.entries[i].0.clone())
    }
}

#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

/// Serves documents from a map; anything else is `NotFound`.
#[derive(Default)]
pub struct MemoryFetcher {
    documents: Mutex<HashMap<String, Result<String, FetchError>>>,
    requests: Mutex<Vec<Url>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, text: &str) -> Self {
        self.insert(url, text);
        self
    }

    pub fn insert(&self, url: &str, text: &str) {
        self.documents
            .lock()
            .insert(url.to_string(), Ok(text.to_string()));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.documents.lock().insert(url.to_string(), Err(error));
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.lock().push(url.clone());
        self.documents
            .lock()
            .get(url.as_str())
            .cloned()
            .unwrap_or(Err(FetchError::NotFound))
    }
}

/// The in-memory parts, kept typed so callers can inspect them.
pub struct MemoryHost {
    pub surface: Arc<MemorySurface>,
    pub fetcher: Arc<MemoryFetcher>,
    pub history: Arc<MemoryHistory>,
    pub preferences: Arc<MemoryPreferences>,
}

impl MemoryHost {
    pub fn new(location: Url, fetcher: MemoryFetcher) -> Self {
        Self {
            surface: Arc::new(MemorySurface::new()),
            fetcher: Arc::new(fetcher),
            history: Arc::new(MemoryHistory::new(location)),
            preferences: Arc::new(MemoryPreferences::new()),
        }
    }

    pub fn host(&self) -> Host {
        Host {
            surface: self.surface.clone(),
            fetcher: self.fetcher.clone(),
            history: self.history.clone(),
            preferences: self.preferences.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_history_push_truncates_forward_entries() {
        let history = MemoryHistory::new(url("https://a.test/index.html"));
        assert_eq!(history.previous(), None);

        let state = |s: &str| HistoryState {
            document_url: url(s),
        };
        history.push(state("https://a.test/a.ztmf"), "", &url("https://a.test/index.html?file=a.ztmf"));
        history.push(state("https://a.test/b.ztmf"), "", &url("https://a.test/index.html?file=b.ztmf"));
        history.back();
        assert_eq!(history.state(), Some(state("https://a.test/a.ztmf")));

        history.push(state("https://a.test/c.ztmf"), "", &url("https://a.test/index.html?file=c.ztmf"));
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.previous(),
            Some(url("https://a.test/index.html?file=a.ztmf"))
        );
    }

    #[test]
    fn test_surface_app_html_drops_app_elements() {
        let surface = MemorySurface::new();
        let body = surface.append(Region::Body, ElementSpec::new("button").class("x"));
        surface.append(Region::App, ElementSpec::new("div").class("y"));
        surface.set_app_html("<p>new</p>");
        assert!(surface.element(body).is_some());
        assert_eq!(surface.count_with_class("y"), 0);
        assert!(surface.load_stylesheet(&url("https://a.test/s.css")));
        assert!(!surface.load_stylesheet(&url("https://a.test/s.css")));
    }

    #[test]
    fn test_canvases_report_resized_dimensions() {
        let surface = MemorySurface::with_viewport(800, 600);
        let layer = surface.append(
            Region::Body,
            ElementSpec::new("div").html("<canvas bg=\"blob\"></canvas><canvas bg=\"cubic\" width=\"10\" height=\"20\">"),
        );
        let canvases = surface.canvases(layer);
        assert_eq!(canvases.len(), 2);
        assert_eq!((canvases[1].width, canvases[1].height), (10, 20));

        surface.resize_canvas(&canvases[0], 800, 600);
        assert_eq!(surface.canvases(layer)[0].width, 800);
    }
}
