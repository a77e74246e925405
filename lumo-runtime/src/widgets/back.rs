use async_trait::async_trait;
use url::Url;

use super::{position_class, Component, MountContext, DEFAULT_POSITION};
use crate::error::{RuntimeError, RuntimeResult};
use crate::host::{ElementId, ElementSpec, History, Region, Surface};

/// Where a back button goes when there is no history to return to.
pub const DEFAULT_BACK_TARGET: &str = "index.ztmf";

/// Room left for a theme switch sharing the same corner.
const THEME_OFFSET_PX: u32 = 70;

/// What activating a component asks the runtime to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    HistoryBack,
    Navigate(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackSpec {
    pub position: String,
    pub target: String,
}

impl Default for BackSpec {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION.to_string(),
            target: DEFAULT_BACK_TARGET.to_string(),
        }
    }
}

impl BackSpec {
    /// `back{position, target}`; either may be missing.
    pub fn from_args(args: &[&str]) -> Self {
        let mut spec = BackSpec::default();
        if let Some(position) = args.first() {
            spec.position = position.to_string();
        }
        if let Some(target) = args.get(1) {
            spec.target = target.to_string();
        }
        spec
    }
}

pub struct BackButton {
    spec: BackSpec,
    target: Url,
    button: Option<ElementId>,
}

impl BackButton {
    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn position(&self) -> &str {
        &self.spec.position
    }

    /// Go back when the previous page is a different one, else open the target.
    pub fn activate(&self, history: &dyn History) -> ComponentAction {
        match history.previous() {
            Some(previous) if previous != history.location() => ComponentAction::HistoryBack,
            _ => ComponentAction::Navigate(self.target.clone()),
        }
    }
}

fn offset_style(position: &str) -> Option<(&'static str, String)> {
    let p = position.trim().to_lowercase();
    if p.ends_with("-right") || p == "right" || p.ends_with("-left") || p == "left" {
        Some(("right", format!("{}px", THEME_OFFSET_PX)))
    } else if matches!(p.as_str(), "top" | "bottom" | "center") {
        Some(("left", format!("calc(50% - {}px)", THEME_OFFSET_PX)))
    } else {
        None
    }
}

#[async_trait]
impl Component for BackButton {
    type Spec = BackSpec;

    async fn mount(spec: BackSpec, ctx: &MountContext<'_>) -> RuntimeResult<Self> {
        let target = ctx
            .base_url
            .join(&spec.target)
            .map_err(|source| RuntimeError::InvalidUrl {
                input: spec.target.clone(),
                source,
            })?;

        let mut element = ElementSpec::new("button")
            .class("lumo-back-button")
            .class(position_class(&spec.position))
            .attr("aria-label", "Back")
            .attr("title", "Back")
            .text("⮜");
        if let Some((property, value)) = offset_style(&spec.position) {
            element = element.style(property, value);
        }

        let button = ctx.surface.append(Region::Body, element);
        Ok(BackButton {
            spec,
            target,
            button: Some(button),
        })
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_fill_defaults() {
        assert_eq!(BackSpec::from_args(&[]), BackSpec::default());
        let spec = BackSpec::from_args(&["bottom-left", "docs/start.ztmf"]);
        assert_eq!(spec.position, "bottom-left");
        assert_eq!(spec.target, "docs/start.ztmf");
        assert_eq!(BackSpec::from_args(&["top"]).target, DEFAULT_BACK_TARGET);
    }

    #[test]
    fn test_offset_by_position() {
        assert_eq!(
            offset_style("bottom-right"),
            Some(("right", "70px".to_string()))
        );
        assert_eq!(offset_style("left"), Some(("right", "70px".to_string())));
        assert_eq!(
            offset_style("bottom"),
            Some(("left", "calc(50% - 70px)".to_string()))
        );
        assert_eq!(offset_style("somewhere"), None);
    }
}
