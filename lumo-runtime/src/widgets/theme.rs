use async_trait::async_trait;
use tracing::debug;

use super::{position_class, Component, MountContext};
use crate::error::RuntimeResult;
use crate::host::{ElementId, ElementSpec, PreferenceStore, Region, Surface};

static LIGHT_PALETTE: [(&str, &str); 3] = [
    ("--bg-color", "#ffffff"),
    ("--text-color", "rgba(18,18,18,1)"),
    ("--header-color", "rgba(133, 133, 133, 1)"),
];

static DARK_PALETTE: [(&str, &str); 3] = [
    ("--bg-color", "rgba(18,18,18,1)"),
    ("--text-color", "rgba(230, 230, 230, 1)"),
    ("--header-color", "rgba(230, 230, 230, 1)"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// Anything but `dark` reads as light.
    pub fn from_preference(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("dark") => ThemeMode::Dark,
            _ => ThemeMode::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn palette(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ThemeMode::Light => &LIGHT_PALETTE,
            ThemeMode::Dark => &DARK_PALETTE,
        }
    }

    fn icon(self) -> &'static str {
        match self {
            ThemeMode::Light => "☀️",
            ThemeMode::Dark => "🌙",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ThemeMode::Light => "Light theme",
            ThemeMode::Dark => "Dark theme",
        }
    }
}

/// Floating light/dark toggle. The choice is persisted and shared by every
/// page through root colour variables.
pub struct ThemeSwitch {
    position: String,
    mode: ThemeMode,
    storage_key: String,
    button: Option<ElementId>,
}

impl ThemeSwitch {
    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    fn button_spec(&self) -> ElementSpec {
        ElementSpec::new("button")
            .class("lumo-theme-switch")
            .class(position_class(&self.position))
            .attr("aria-label", "Toggle theme")
            .attr("title", self.mode.title())
            .text(self.mode.icon())
    }

    fn apply(&self, surface: &dyn Surface) {
        surface.set_body_attribute("data-theme", self.mode.as_str());
        for (name, value) in self.mode.palette() {
            surface.set_root_property(name, value);
        }
        surface.set_root_class("lumo-dark", self.mode == ThemeMode::Dark);
    }

    /// Flip the theme, repaint, persist.
    pub fn toggle(&mut self, surface: &dyn Surface, preferences: &dyn PreferenceStore) {
        self.mode = self.mode.toggled();
        self.apply(surface);
        if let Some(button) = self.button {
            surface.update(button, self.button_spec());
        }
        preferences.set(&self.storage_key, self.mode.as_str());
        debug!(theme = self.mode.as_str(), "theme toggled");
    }
}

#[async_trait]
impl Component for ThemeSwitch {
    type Spec = String;

    async fn mount(position: String, ctx: &MountContext<'_>) -> RuntimeResult<Self> {
        let storage_key = ctx.config.theme_storage_key.clone();
        let mode = ThemeMode::from_preference(ctx.preferences.get(&storage_key).as_deref());

        let mut switch = ThemeSwitch {
            position,
            mode,
            storage_key,
            button: None,
        };
        switch.button = Some(ctx.surface.append(Region::Body, switch.button_spec()));
        switch.apply(ctx.surface);
        Ok(switch)
    }

    fn root(&self) -> Option<ElementId> {
        self.button
    }

    async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()> {
        if let Some(button) = self.button.take() {
            surface.remove(button);
        }
        Ok(())
    }
}
