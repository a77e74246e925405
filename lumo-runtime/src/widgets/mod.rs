//! The closed set of page components a document can declare.
//!
//! | declaration | component |
//! |---|---|
//! | `theme{position}` | [`ThemeSwitch`] |
//! | `back{position, target}` | [`BackButton`] |
//! | `bg{markup}` / `bg{key: value, ...}` | [`BackgroundLayer`] |
//! | `name{html}` | [`Fragment`] |

mod back;
mod background;
mod fragment;
mod theme;

pub use back::{BackButton, BackSpec, ComponentAction, DEFAULT_BACK_TARGET};
pub use background::{BackgroundEffect, BackgroundInstance, BackgroundLayer, BackgroundSpec};
pub use fragment::{Fragment, FragmentSpec};
pub use theme::{ThemeMode, ThemeSwitch};

use async_trait::async_trait;
use lumo_ztmf::{ComponentDeclaration, Meta};
use url::Url;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{ElementId, PreferenceStore, Surface};
use crate::providers::ProviderLoader;

/// Default corner for floating controls.
pub const DEFAULT_POSITION: &str = "bottom-right";

/// Everything a component may touch while mounting.
pub struct MountContext<'a> {
    pub surface: &'a dyn Surface,
    pub preferences: &'a dyn PreferenceStore,
    pub providers: &'a ProviderLoader,
    pub config: &'a RuntimeConfig,
    pub base_url: &'a Url,
    pub meta: &'a Meta,
}

/// Shared lifecycle of every component kind.
#[async_trait]
pub trait Component: Sized + Send + Sync {
    type Spec: Send + 'static;

    async fn mount(spec: Self::Spec, ctx: &MountContext<'_>) -> RuntimeResult<Self>;

    /// The element removed on teardown, if any.
    fn root(&self) -> Option<ElementId>;

    async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()>;
}

/// A declaration classified into one of the component kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Theme { position: String },
    Back(BackSpec),
    Background(BackgroundSpec),
    Generic(FragmentSpec),
}

impl ComponentKind {
    /// `None` for declarations that mount nothing (`bg` or an unknown name
    /// without payload).
    pub fn from_declaration(decl: &ComponentDeclaration) -> Option<Self> {
        match decl.name.as_str() {
            "theme" => Some(ComponentKind::Theme {
                position: decl
                    .inner
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .unwrap_or(DEFAULT_POSITION)
                    .to_string(),
            }),
            "back" => Some(ComponentKind::Back(BackSpec::from_args(&decl.args()))),
            "bg" => decl
                .inner
                .as_deref()
                .map(|inner| ComponentKind::Background(BackgroundSpec::from_payload(inner))),
            name => decl.inner.as_ref().map(|html| {
                ComponentKind::Generic(FragmentSpec {
                    name: name.to_string(),
                    html: html.clone(),
                })
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ComponentKind::Theme { .. } => "theme",
            ComponentKind::Back(_) => "back",
            ComponentKind::Background(_) => "bg",
            ComponentKind::Generic(spec) => &spec.name,
        }
    }
}

/// A live component owned by a render session.
pub enum MountedComponent {
    Theme(ThemeSwitch),
    Back(BackButton),
    Background(BackgroundLayer),
    Generic(Fragment),
}

impl MountedComponent {
    /// Mount `kind`. Failures come back as [`RuntimeError::Component`] naming it.
    pub async fn mount(kind: ComponentKind, ctx: &MountContext<'_>) -> RuntimeResult<Self> {
        let name = kind.name().to_string();
        let mounted = match kind {
            ComponentKind::Theme { position } => ThemeSwitch::mount(position, ctx)
                .await
                .map(MountedComponent::Theme),
            ComponentKind::Back(spec) => BackButton::mount(spec, ctx)
                .await
                .map(MountedComponent::Back),
            ComponentKind::Background(spec) => BackgroundLayer::mount(spec, ctx)
                .await
                .map(MountedComponent::Background),
            ComponentKind::Generic(spec) => Fragment::mount(spec, ctx)
                .await
                .map(MountedComponent::Generic),
        };
        mounted.map_err(|e| match e {
            RuntimeError::Component { .. } => e,
            other => RuntimeError::component(&name, other.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            MountedComponent::Theme(_) => "theme",
            MountedComponent::Back(_) => "back",
            MountedComponent::Background(_) => "bg",
            MountedComponent::Generic(fragment) => fragment.name(),
        }
    }

    pub fn root(&self) -> Option<ElementId> {
        match self {
            MountedComponent::Theme(c) => c.root(),
            MountedComponent::Back(c) => c.root(),
            MountedComponent::Background(c) => c.root(),
            MountedComponent::Generic(c) => c.root(),
        }
    }

    pub async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()> {
        match self {
            MountedComponent::Theme(c) => c.destroy(surface).await,
            MountedComponent::Back(c) => c.destroy(surface).await,
            MountedComponent::Background(c) => c.destroy(surface).await,
            MountedComponent::Generic(c) => c.destroy(surface).await,
        }
    }
}

/// `lumo-theme-pos-bottom-right` style class for a position argument.
pub(crate) fn position_class(position: &str) -> String {
    let slug = position
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    format!("lumo-theme-pos-{}", slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_dispatch() {
        let theme = ComponentKind::from_declaration(&ComponentDeclaration::new("theme", None));
        assert_eq!(
            theme,
            Some(ComponentKind::Theme {
                position: "bottom-right".to_string()
            })
        );

        let bg = ComponentKind::from_declaration(&ComponentDeclaration::new("bg", None));
        assert_eq!(bg, None);

        let footer = ComponentKind::from_declaration(&ComponentDeclaration::new("footer", None));
        assert_eq!(footer, None);

        let notice =
            ComponentKind::from_declaration(&ComponentDeclaration::new("notice", Some("<p>x</p>")))
                .unwrap();
        assert_eq!(notice.name(), "notice");
    }

    #[test]
    fn test_position_class() {
        assert_eq!(position_class("Bottom Left"), "lumo-theme-pos-bottom-left");
        assert_eq!(position_class("top-right"), "lumo-theme-pos-top-right");
    }
}
