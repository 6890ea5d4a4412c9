//!
//! The form as rendered by the admin page: selects looked up by element id.
//!
use std::collections::HashMap;

use crate::controller::{CascadeController, Endpoints};
use crate::field::FieldKind;
use crate::source::OptionSource;
use crate::select::Select;

/// Data attribute on the site select holding the areas endpoint
pub const AREAS_URL: &str = "areasUrl";
/// Data attribute on the area select holding the racks endpoint
pub const RACKS_URL: &str = "racksUrl";

/// Selects of a form, by element id
#[derive(Clone, Debug, Default)]
pub struct Document {
    selects: HashMap<String, Select>,
}

impl Document {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a select, replacing any with the same id
    #[must_use]
    pub fn with(mut self, select: Select) -> Self {
        self.insert(select);
        self
    }

    /// Add a select, replacing any with the same id
    pub fn insert(&mut self, select: Select) {
        self.selects.insert(select.id().to_string(), select);
    }

    /// Look up a select
    pub fn get(&self, id: &str) -> Option<&Select> {
        self.selects.get(id)
    }

    /// Bind a controller to the `id_site`, `id_area` and `id_rack` selects.
    /// Returns `None`, binding nothing, if any of them is missing.
    pub fn attach<S: OptionSource>(&self, source: S) -> Option<CascadeController<S>> {
        let [site, area, rack] = FieldKind::ALL.map(|kind| self.get(kind.element_id()));
        let (Some(site), Some(area), Some(rack)) = (site, area, rack) else {
            tracing::debug!("location selects not found, nothing to bind");
            return None;
        };

        let endpoints = Endpoints {
            areas_url: site.data(AREAS_URL).map(str::to_string),
            racks_url: area.data(RACKS_URL).map(str::to_string),
        };
        tracing::debug!("binding location selects, {:?}", endpoints);

        Some(CascadeController::new(
            source,
            site.clone(),
            area.clone(),
            rack.clone(),
            endpoints,
        ))
    }

    /// Copy the controller's selects back into the document
    pub async fn sync<S: OptionSource>(&mut self, controller: &CascadeController<S>) {
        for kind in FieldKind::ALL {
            self.insert(controller.select(kind).await);
        }
    }
}
