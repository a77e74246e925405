use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::{Component, MountContext};
use crate::error::RuntimeResult;
use crate::host::{ElementId, ElementSpec, Region, Surface};
use crate::providers::{BackgroundHandle, ProviderOptions};

/// Payload of a `bg{...}` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSpec {
    /// Markup placed in a fixed layer behind the page; tagged canvases get providers.
    Markup(String),
    /// Flat `key: value` list applied to the body directly.
    Effects(Vec<BackgroundEffect>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundEffect {
    Color(String),
    Image(String),
}

impl BackgroundEffect {
    fn body_style(&self) -> (&'static str, String) {
        match self {
            BackgroundEffect::Color(color) => ("background-color", color.clone()),
            BackgroundEffect::Image(image) => ("background-image", css_image(image)),
        }
    }
}

impl BackgroundSpec {
    pub fn from_payload(payload: &str) -> Self {
        if lumo_ztmf::is_markup(payload) {
            return BackgroundSpec::Markup(payload.trim().to_string());
        }
        BackgroundSpec::Effects(split_effects(payload).filter_map(parse_effect).collect())
    }
}

/// Top-level `,`/`;` split; separators inside `(...)` belong to the value.
fn split_effects(payload: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in payload.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | ';' if depth == 0 => {
                parts.push(&payload[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&payload[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty())
}

fn parse_effect(part: &str) -> Option<BackgroundEffect> {
    let (key, value) = match part.find([':', '=']) {
        Some(at) if is_key(part[..at].trim()) => (Some(part[..at].trim()), part[at + 1..].trim()),
        _ => (None, part),
    };
    let value = unquote(value);
    if value.is_empty() {
        return None;
    }

    match key.map(|k| k.to_ascii_lowercase()).as_deref() {
        None if is_image_value(value) => Some(BackgroundEffect::Image(value.to_string())),
        None | Some("color" | "background" | "bg" | "background-color") => {
            Some(BackgroundEffect::Color(value.to_string()))
        }
        Some("image" | "background-image") => Some(BackgroundEffect::Image(value.to_string())),
        Some(other) => {
            debug!(key = other, "ignoring unknown background effect");
            None
        }
    }
}

fn is_key(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner.trim();
        }
    }
    v
}

fn is_image_value(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("url(") || lower.contains("gradient(")
}

fn css_image(value: &str) -> String {
    if is_image_value(value) {
        value.to_string()
    } else {
        format!("url(\"{}\")", value)
    }
}

/// A provider handle created for one canvas.
pub struct BackgroundInstance {
    pub provider: String,
    pub handle: Box<dyn BackgroundHandle>,
    /// Layer the canvas lives in.
    pub root: Option<ElementId>,
}

impl BackgroundInstance {
    pub async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()> {
        let result = self.handle.destroy().await;
        if let Some(root) = self.root.take() {
            surface.remove(root);
        }
        result
    }
}

pub struct BackgroundLayer {
    wrapper: Option<ElementId>,
    instances: Vec<BackgroundInstance>,
    body_styles: Vec<&'static str>,
}

impl BackgroundLayer {
    /// Hand the provider instances over to the caller, which then owns their teardown.
    pub fn take_instances(&mut self) -> Vec<BackgroundInstance> {
        std::mem::take(&mut self.instances)
    }

    async fn mount_markup(&mut self, markup: String, ctx: &MountContext<'_>) {
        let wrapper = ctx.surface.append(
            Region::Body,
            ElementSpec::new("div")
                .class("lumo-bg-wrapper")
                .style("position", "fixed")
                .style("inset", "0")
                .style("z-index", "-1")
                .style("pointer-events", "none")
                .html(markup),
        );
        self.wrapper = Some(wrapper);

        let (view_width, view_height) = ctx.surface.viewport();
        for mut canvas in ctx.surface.canvases(wrapper) {
            if canvas.width == 0 || canvas.height == 0 {
                let width = if canvas.width == 0 { view_width } else { canvas.width };
                let height = if canvas.height == 0 { view_height } else { canvas.height };
                ctx.surface.resize_canvas(&canvas, width, height);
                canvas.width = width;
                canvas.height = height;
            }

            let name = canvas.provider.clone();
            let Some(factory) = ctx.providers.resolve(&name, ctx.base_url).await else {
                warn!(provider = %name, "background provider not found after load");
                continue;
            };

            let options = ProviderOptions {
                base_url: ctx.base_url.clone(),
                meta: ctx.meta.clone(),
            };
            match factory.create(canvas, options) {
                Ok(handle) => self.instances.push(BackgroundInstance {
                    provider: name,
                    handle,
                    root: Some(wrapper),
                }),
                Err(e) => error!(provider = %name, error = %e, "background init error"),
            }
        }
    }

    fn apply_effects(&mut self, effects: &[BackgroundEffect], surface: &dyn Surface) {
        for effect in effects {
            let (property, value) = effect.body_style();
            surface.set_body_style(property, &value);
            if !self.body_styles.contains(&property) {
                self.body_styles.push(property);
            }
        }
    }
}

#[async_trait]
impl Component for BackgroundLayer {
    type Spec = BackgroundSpec;

    async fn mount(spec: BackgroundSpec, ctx: &MountContext<'_>) -> RuntimeResult<Self> {
        let mut layer = BackgroundLayer {
            wrapper: None,
            instances: Vec::new(),
            body_styles: Vec::new(),
        };
        match spec {
            BackgroundSpec::Markup(markup) => layer.mount_markup(markup, ctx).await,
            BackgroundSpec::Effects(effects) => layer.apply_effects(&effects, ctx.surface),
        }
        Ok(layer)
    }

    fn root(&self) -> Option<ElementId> {
        self.wrapper
    }

    async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()> {
        for mut instance in self.take_instances() {
            if let Err(e) = instance.destroy(surface).await {
                error!(provider = %instance.provider, error = %e, "background destroy failed");
            }
        }
        for property in self.body_styles.drain(..) {
            surface.set_body_style(property, "");
        }
        if let Some(wrapper) = self.wrapper.take() {
            surface.remove(wrapper);
        }
        Ok(())
    }
}
