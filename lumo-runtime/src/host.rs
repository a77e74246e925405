//! What the runtime needs from the environment it renders into.
//!
//! A browser binding implements these over the DOM, `fetch`, `history` and
//! `localStorage`; [`crate::memory`] implements them in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// Handle of an element created through a [`Surface`].
pub type ElementId = u64;

/// Where a new element is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Region {
    /// Directly under the document body (floating controls, background layers).
    Body,
    /// Inside the main content area.
    App,
}

/// Description of an element to create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementSpec {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn style(mut self, name: &str, value: impl Into<String>) -> Self {
        self.styles.push((name.to_string(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A canvas inside a background layer that asks for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanvasHandle {
    pub layer: ElementId,
    pub index: usize,
    pub provider: String,
    pub width: u32,
    pub height: u32,
}

/// The single document-wide click listener, scoped to one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkListener {
    pub base_url: Url,
    /// Increases with every render; a stale listener never survives a newer one.
    pub generation: u64,
}

/// The live document.
pub trait Surface: Send + Sync {
    fn set_title(&self, title: &str);
    fn set_favicon(&self, href: &Url);
    /// Returns false when the stylesheet was already present.
    fn load_stylesheet(&self, href: &Url) -> bool;
    /// Create or replace the `<style>` element with the given id.
    fn set_inline_style(&self, id: &str, css: &str);
    /// Replace the content area; elements appended to it earlier go with it.
    fn set_app_html(&self, html: &str);
    fn append(&self, region: Region, element: ElementSpec) -> ElementId;
    fn update(&self, id: ElementId, element: ElementSpec);
    /// Returns false when the element no longer exists.
    fn remove(&self, id: ElementId) -> bool;
    /// Tagged canvases inside an element, in document order, as authored.
    fn canvases(&self, layer: ElementId) -> Vec<CanvasHandle>;
    fn resize_canvas(&self, canvas: &CanvasHandle, width: u32, height: u32);
    fn set_root_property(&self, name: &str, value: &str);
    fn set_root_class(&self, class: &str, enabled: bool);
    fn set_body_attribute(&self, name: &str, value: &str);
    /// An empty value clears the property.
    fn set_body_style(&self, name: &str, value: &str);
    fn viewport(&self) -> (u32, u32);
    fn show_status(&self, message: &str, duration: Duration);
    fn disable_context_menu(&self);
    /// Leave the runtime for a page it does not render.
    fn redirect(&self, url: &Url);
    /// Install `listener`, dropping the previous one; `None` detaches.
    fn set_link_listener(&self, listener: Option<LinkListener>);
}

/// Raw document transport.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// State stored with a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub document_url: Url,
}

pub trait History: Send + Sync {
    fn push(&self, state: HistoryState, title: &str, url: &Url);
    fn back(&self);
    fn location(&self) -> Url;
    /// The page visited before the current one, if known.
    fn previous(&self) -> Option<Url>;
}

/// Small persisted key/value store (theme preference).
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Everything the runtime talks to, bundled.
#[derive(Clone)]
pub struct Host {
    pub surface: Arc<dyn Surface>,
    pub fetcher: Arc<dyn Fetcher>,
    pub history: Arc<dyn History>,
    pub preferences: Arc<dyn PreferenceStore>,
}
