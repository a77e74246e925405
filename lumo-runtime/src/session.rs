//! One render's worth of live components.
//!
//! A [`RenderSession`] is created per navigation, filled by [`RenderSession::mount`]
//! and emptied by [`RenderSession::teardown`] before the next one takes its place.

use lumo_ztmf::ComponentDeclaration;
use serde::Serialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::host::{ElementId, History, PreferenceStore, Surface};
use crate::widgets::{
    BackgroundInstance, ComponentAction, ComponentKind, MountContext, MountedComponent,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    TearingDown,
    Mounting,
}

#[derive(Default)]
pub struct RenderSession {
    id: u64,
    document_url: Option<Url>,
    base_url: Option<Url>,
    phase: SessionPhase,
    components: Vec<MountedComponent>,
    backgrounds: Vec<BackgroundInstance>,
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: u64,
    pub document_url: Option<String>,
    pub phase: SessionPhase,
    pub components: Vec<String>,
    pub backgrounds: Vec<String>,
}

impl RenderSession {
    pub fn new(id: u64, document_url: Url, base_url: Url) -> Self {
        Self {
            id,
            document_url: Some(document_url),
            base_url: Some(base_url),
            ..Default::default()
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn document_url(&self) -> Option<&Url> {
        self.document_url.as_ref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn components(&self) -> &[MountedComponent] {
        &self.components
    }

    pub fn background_count(&self) -> usize {
        self.backgrounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.backgrounds.is_empty()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            document_url: self.document_url.as_ref().map(Url::to_string),
            phase: self.phase,
            components: self.components.iter().map(|c| c.name().to_string()).collect(),
            backgrounds: self.backgrounds.iter().map(|b| b.provider.clone()).collect(),
        }
    }

    /// Destroy everything this session mounted. Failures are logged and the
    /// remaining instances are still destroyed; calling it twice is a no-op.
    pub async fn teardown(&mut self, surface: &dyn Surface) {
        if self.is_empty() {
            return;
        }
        self.phase = SessionPhase::TearingDown;

        for mut component in self.components.drain(..) {
            let root = component.root();
            if let Err(e) = component.destroy(surface).await {
                warn!(component = component.name(), error = %e, "component destroy failed");
                if let Some(root) = root {
                    surface.remove(root);
                }
            }
        }

        for mut instance in self.backgrounds.drain(..) {
            if let Err(e) = instance.destroy(surface).await {
                warn!(provider = %instance.provider, error = %e, "background destroy failed");
            }
        }

        debug!(session = self.id, "session torn down");
        self.phase = SessionPhase::Idle;
    }

    /// Mount declarations in order. A declaration that fails to mount is
    /// logged and skipped.
    pub async fn mount(&mut self, declarations: &[ComponentDeclaration], ctx: &MountContext<'_>) {
        self.phase = SessionPhase::Mounting;

        for decl in declarations {
            let Some(kind) = ComponentKind::from_declaration(decl) else {
                debug!(component = %decl.name, "declaration without payload skipped");
                continue;
            };
            let name = kind.name().to_string();

            match MountedComponent::mount(kind, ctx).await {
                Ok(mut component) => {
                    if let MountedComponent::Background(layer) = &mut component {
                        self.backgrounds.extend(layer.take_instances());
                    }
                    debug!(component = %name, "component mounted");
                    self.components.push(component);
                }
                Err(e) => error!(component = %name, error = %e, "component mount failed"),
            }
        }

        self.phase = SessionPhase::Idle;
    }

    /// Route a click on a component root. Theme switches toggle in place;
    /// back buttons return the navigation they ask for.
    pub fn activate(
        &mut self,
        element: ElementId,
        surface: &dyn Surface,
        preferences: &dyn PreferenceStore,
        history: &dyn History,
    ) -> Option<ComponentAction> {
        let component = self
            .components
            .iter_mut()
            .find(|c| c.root() == Some(element))?;

        match component {
            MountedComponent::Theme(theme) => {
                theme.toggle(surface, preferences);
                None
            }
            MountedComponent::Back(back) => Some(back.activate(history)),
            MountedComponent::Background(_) | MountedComponent::Generic(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::error::{RuntimeError, RuntimeResult};
    use crate::host::CanvasHandle;
    use crate::memory::{MemoryHistory, MemoryPreferences, MemorySurface};
    use crate::providers::{
        BackgroundHandle, BundledProviders, ProviderFactory, ProviderLoader, ProviderOptions,
        ProviderRegistry,
    };
    use crate::widgets::ThemeMode;
    use async_trait::async_trait;
    use lumo_ztmf::{parse_component_spec, Meta};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixture {
        surface: MemorySurface,
        preferences: MemoryPreferences,
        providers: ProviderLoader,
        config: RuntimeConfig,
        base_url: Url,
        meta: Meta,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_source(BundledProviders::new())
        }

        fn with_source(source: BundledProviders) -> Self {
            let config = RuntimeConfig::default();
            Self {
                surface: MemorySurface::new(),
                preferences: MemoryPreferences::new(),
                providers: ProviderLoader::new(
                    Arc::new(ProviderRegistry::new()),
                    Arc::new(source),
                    config.provider_timeout(),
                ),
                config,
                base_url: Url::parse("https://site.test/docs/").unwrap(),
                meta: Meta::default(),
            }
        }

        fn ctx(&self) -> MountContext<'_> {
            MountContext {
                surface: &self.surface,
                preferences: &self.preferences,
                providers: &self.providers,
                config: &self.config,
                base_url: &self.base_url,
                meta: &self.meta,
            }
        }
    }

    struct CountingEffect {
        destroyed: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl BackgroundHandle for CountingEffect {
        async fn destroy(&mut self) -> RuntimeResult<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RuntimeError::provider("bad", "context lost"))
            } else {
                Ok(())
            }
        }
    }

    fn counting(destroyed: &Arc<AtomicUsize>, fail: bool) -> ProviderFactory {
        let destroyed = destroyed.clone();
        Arc::new(
            move |_canvas: CanvasHandle,
                  _options: ProviderOptions|
                  -> RuntimeResult<Box<dyn BackgroundHandle>> {
                Ok(Box::new(CountingEffect {
                    destroyed: destroyed.clone(),
                    fail,
                }))
            },
        )
    }

    #[tokio::test]
    async fn test_mount_in_declaration_order() {
        let fx = Fixture::new();
        let mut session = RenderSession::default();
        let decls = parse_component_spec("theme{top-left}, footer, back{bottom-left}, note{<p>x</p>}");
        session.mount(&decls, &fx.ctx()).await;

        assert_eq!(session.summary().components, vec!["theme", "back", "note"]);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(fx.surface.count_with_class("lumo-comp-note"), 1);
    }

    #[tokio::test]
    async fn test_invalid_back_target_is_isolated() {
        let fx = Fixture::new();
        let mut session = RenderSession::default();
        let decls = parse_component_spec("back{bottom-left, http://[::1}, theme");
        session.mount(&decls, &fx.ctx()).await;

        assert_eq!(session.summary().components, vec!["theme"]);
    }

    #[tokio::test]
    async fn test_mount_failure_names_component() {
        let fx = Fixture::new();
        let decls = parse_component_spec("back{bottom-left, http://[::1}");
        let kind = ComponentKind::from_declaration(&decls[0]).unwrap();

        let err = match MountedComponent::mount(kind, &fx.ctx()).await {
            Ok(_) => panic!("mount should fail"),
            Err(e) => e,
        };
        assert!(matches!(&err, RuntimeError::Component { component, .. } if component == "back"));
        assert!(err.to_string().starts_with("Component 'back' failed: Invalid URL"));
    }

    #[tokio::test]
    async fn test_mounted_components_keep_their_settings() {
        let fx = Fixture::new();
        fx.preferences.set("lumo-theme", "dark");
        let mut session = RenderSession::default();
        session
            .mount(
                &parse_component_spec("theme{bottom-right}, back{top-left, ../home.ztmf}"),
                &fx.ctx(),
            )
            .await;

        let [MountedComponent::Theme(theme), MountedComponent::Back(back)] = session.components()
        else {
            panic!("unexpected components: {:?}", session.summary().components);
        };
        assert_eq!(theme.mode(), ThemeMode::Dark);
        assert_eq!(theme.position(), "bottom-right");
        assert_eq!(back.position(), "top-left");
        assert_eq!(back.target().as_str(), "https://site.test/home.ztmf");
    }

    #[tokio::test]
    async fn test_teardown_survives_failing_background_destroy() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let fx = Fixture::with_source(
            BundledProviders::new()
                .with("bad", counting(&destroyed, true))
                .with("good", counting(&destroyed, false)),
        );
        let mut session = RenderSession::default();
        session
            .mount(
                &parse_component_spec(
                    r#"theme, bg{<canvas bg="bad"></canvas><canvas bg="good"></canvas>}"#,
                ),
                &fx.ctx(),
            )
            .await;
        assert_eq!(session.background_count(), 2);
        assert_eq!(fx.surface.count_with_class("lumo-bg-wrapper"), 1);

        session.teardown(&fx.surface).await;

        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(fx.surface.count_with_class("lumo-bg-wrapper"), 0);
        assert_eq!(fx.surface.count_with_class("lumo-theme-switch"), 0);
        assert!(session.is_empty());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let fx = Fixture::new();
        let mut session = RenderSession::default();
        session.teardown(&fx.surface).await;
        session.teardown(&fx.surface).await;
        assert!(session.is_empty());

        session
            .mount(&parse_component_spec("theme, bg{color: #000}"), &fx.ctx())
            .await;
        assert_eq!(fx.surface.count_with_class("lumo-theme-switch"), 1);
        assert_eq!(fx.surface.body_style("background-color").as_deref(), Some("#000"));

        session.teardown(&fx.surface).await;
        session.teardown(&fx.surface).await;
        assert!(session.is_empty());
        assert_eq!(fx.surface.count_with_class("lumo-theme-switch"), 0);
        assert_eq!(fx.surface.body_style("background-color"), None);
    }

    #[tokio::test]
    async fn test_activate_routes_to_owner() {
        let fx = Fixture::new();
        let history = MemoryHistory::new(Url::parse("https://site.test/docs/index.html").unwrap());
        let mut session = RenderSession::default();
        session
            .mount(&parse_component_spec("theme, back{bottom-left, home.ztmf}"), &fx.ctx())
            .await;

        let theme = fx.surface.find_by_class("lumo-theme-switch").unwrap();
        assert_eq!(session.activate(theme, &fx.surface, &fx.preferences, &history), None);
        assert_eq!(fx.preferences.get("lumo-theme").as_deref(), Some("dark"));
        assert!(fx.surface.has_root_class("lumo-dark"));

        let back = fx.surface.find_by_class("lumo-back-button").unwrap();
        assert_eq!(
            session.activate(back, &fx.surface, &fx.preferences, &history),
            Some(ComponentAction::Navigate(
                Url::parse("https://site.test/docs/home.ztmf").unwrap()
            ))
        );

        assert_eq!(session.activate(9999, &fx.surface, &fx.preferences, &history), None);
    }
}
