use async_trait::async_trait;

use super::{Component, MountContext};
use crate::error::RuntimeResult;
use crate::host::{ElementId, ElementSpec, Region, Surface};

/// Any other declaration with a payload: its HTML dropped into the content area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSpec {
    pub name: String,
    pub html: String,
}

pub struct Fragment {
    name: String,
    container: Option<ElementId>,
}

impl Fragment {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Component for Fragment {
    type Spec = FragmentSpec;

    async fn mount(spec: FragmentSpec, ctx: &MountContext<'_>) -> RuntimeResult<Self> {
        let container = ctx.surface.append(
            Region::App,
            ElementSpec::new("div")
                .class(format!("lumo-comp-{}", spec.name))
                .html(spec.html),
        );
        Ok(Fragment {
            name: spec.name,
            container: Some(container),
        })
    }

    fn root(&self) -> Option<ElementId> {
        self.container
    }

    async fn destroy(&mut self, surface: &dyn Surface) -> RuntimeResult<()> {
        if let Some(container) = self.container.take() {
            surface.remove(container);
        }
        Ok(())
    }
}
