//!
//! Keeps the Area and Rack fields consistent with the selected Site and Area.
//!
use tokio::sync::Mutex;

use crate::choice::Choice;
use crate::field::{Applied, Field, FieldKind, FieldState, Transition};
use crate::select::Select;
use crate::source::{FailureKind, OptionSource, OptionsRequest};

/// Endpoints serving the options of the dependent fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endpoints {
    /// Areas of a site, queried with `site=<id>`
    pub areas_url: Option<String>,
    /// Racks of an area, queried with `area=<id>`
    pub racks_url: Option<String>,
}

/// Result of loading the options of one field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No parent value or no endpoint, the field was disabled
    Disabled,
    /// The field now holds `choices` options besides the placeholder
    Populated {
        /// Number of options received
        choices: usize,
        /// Value restored from the retained selection
        selected: Option<String>,
    },
    /// The fetch failed, the field holds only the placeholder
    Failed(FailureKind),
    /// A newer load or reset replaced this one before the response arrived
    Superseded,
}

#[derive(Debug)]
struct Fields {
    site: Field,
    area: Field,
    rack: Field,
}

impl Fields {
    fn get(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Site => &self.site,
            FieldKind::Area => &self.area,
            FieldKind::Rack => &self.rack,
        }
    }

    fn get_mut(&mut self, kind: FieldKind) -> &mut Field {
        match kind {
            FieldKind::Site => &mut self.site,
            FieldKind::Area => &mut self.area,
            FieldKind::Rack => &mut self.rack,
        }
    }

    fn disable(&mut self, kinds: impl IntoIterator<Item = FieldKind>) {
        for kind in kinds {
            self.get_mut(kind).apply(Transition::Disable);
        }
    }
}

/// Drives the Site, Area and Rack selects.
///
/// Every operation takes `&self`; the field models are locked only between
/// network round trips, so loads may overlap. A response is applied only if no
/// newer load or reset of its field happened in the meantime.
pub struct CascadeController<S> {
    source: S,
    fields: Mutex<Fields>,
}

impl<S> std::fmt::Debug for CascadeController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeController")
            .field("fields", &self.fields)
            .finish()
    }
}

impl<S: OptionSource> CascadeController<S> {
    /// Create a controller over the three selects. The retained values are
    /// read from each select's `currentValue` data attribute.
    pub fn new(
        source: S,
        site: Select,
        area: Select,
        rack: Select,
        endpoints: Endpoints,
    ) -> Self {
        let fields = Fields {
            site: Field::new(FieldKind::Site, site, None),
            area: Field::new(FieldKind::Area, area, endpoints.areas_url),
            rack: Field::new(FieldKind::Rack, rack, endpoints.racks_url),
        };
        Self {
            source,
            fields: Mutex::new(fields),
        }
    }

    /// Snapshot of a select
    pub async fn select(&self, kind: FieldKind) -> Select {
        self.fields.lock().await.get(kind).select.clone()
    }

    /// Lifecycle state of a field
    pub async fn state(&self, kind: FieldKind) -> FieldState {
        self.fields.lock().await.get(kind).state
    }

    /// Outcome of the last load of a field that was not superseded. Cleared
    /// when the field is disabled by its parent.
    pub async fn last_outcome(&self, kind: FieldKind) -> Option<LoadOutcome> {
        self.fields.lock().await.get(kind).last_outcome.clone()
    }

    /// Bring the dependent fields in line with the values rendered by the
    /// server. With a site selected, its areas are loaded and the stored area
    /// and rack are restored.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn initialize(&self) {
        let (site, area_retained) = {
            let fields = self.fields.lock().await;
            (
                fields.site.select.value().to_string(),
                fields.area.retained(),
            )
        };

        if site.is_empty() {
            let mut fields = self.fields.lock().await;
            fields.disable([FieldKind::Area, FieldKind::Rack]);
            if let Some(area) = area_retained {
                tracing::debug!("area {} retained without a site", area);
                fields.disable([FieldKind::Rack]);
            }
        } else {
            self.load_options_for(FieldKind::Area, &site, true).await;
        }
    }

    /// The user picked `value` in the site select
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn on_site_changed(&self, value: &str) -> LoadOutcome {
        {
            let mut fields = self.fields.lock().await;
            fields.site.select.set_value(value);
            fields.area.clear_retained();
            fields.rack.clear_retained();
            if value.is_empty() {
                fields.disable([FieldKind::Area, FieldKind::Rack]);
                return LoadOutcome::Disabled;
            }
        }
        self.load_options_for(FieldKind::Area, value, false).await
    }

    /// The user picked `value` in the area select
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn on_area_changed(&self, value: &str) -> LoadOutcome {
        {
            let mut fields = self.fields.lock().await;
            fields.area.select.set_value(value);
            fields.rack.clear_retained();
            if value.is_empty() {
                fields.disable([FieldKind::Rack]);
                return LoadOutcome::Disabled;
            }
        }
        self.load_options_for(FieldKind::Rack, value, false).await
    }

    /// Reload the options of `kind` filtered by its parent's `filter` value.
    ///
    /// Fields below `kind` are reset and disabled. With `retain`, the field's
    /// retained value is selected if the response contains it, and the load
    /// continues one level down for that value. Returns the outcome for `kind`.
    pub async fn load_options_for(
        &self,
        kind: FieldKind,
        filter: &str,
        retain: bool,
    ) -> LoadOutcome {
        let mut next = Some((kind, filter.to_string()));
        let mut first = None;

        while let Some((kind, filter)) = next.take() {
            let cascaded = first.is_some();
            let outcome = self.load_one(kind, &filter, retain, cascaded).await;
            if let (LoadOutcome::Populated { selected: Some(value), .. }, Some(child)) =
                (&outcome, kind.child())
            {
                next = Some((child, value.clone()));
            }
            first.get_or_insert(outcome);
        }

        first.unwrap_or(LoadOutcome::Disabled)
    }

    /// Load one field. A `cascaded` load only proceeds while the parent still
    /// holds `filter`, since the parent may have changed once it was unlocked.
    #[tracing::instrument(level = "debug", skip(self))]
    async fn load_one(
        &self,
        kind: FieldKind,
        filter: &str,
        retain: bool,
        cascaded: bool,
    ) -> LoadOutcome {
        let (Some(param), Some(parent)) = (kind.filter_param(), kind.parent()) else {
            tracing::debug!("{} has no parent to filter by", kind);
            return LoadOutcome::Disabled;
        };

        let (request, target, generation) = {
            let mut fields = self.fields.lock().await;
            if cascaded && fields.get(parent).select.value() != filter {
                tracing::debug!(
                    "{} changed away from {}, not restoring {}",
                    parent,
                    filter,
                    kind
                );
                return LoadOutcome::Superseded;
            }
            fields.disable(kind.descendants());

            let field = fields.get_mut(kind);
            let target = if retain { field.retained() } else { None };

            let url = match &field.url {
                Some(url) if !filter.is_empty() => url.clone(),
                _ => {
                    field.apply(Transition::Disable);
                    field.last_outcome = Some(LoadOutcome::Disabled);
                    return LoadOutcome::Disabled;
                }
            };

            let Applied::Loading(generation) = field.apply(Transition::BeginLoad) else {
                return LoadOutcome::Superseded;
            };

            let request = OptionsRequest {
                url,
                param,
                value: filter.to_string(),
            };
            (request, target, generation)
        };

        let fetched = self.source.fetch(&request).await;

        let mut fields = self.fields.lock().await;
        let field = fields.get_mut(kind);

        let (choices, failure): (Vec<Choice>, _) = match fetched {
            Ok(choices) => (choices, None),
            Err(e) => {
                tracing::warn!(
                    "Failed to load {} options from {}: {}",
                    kind,
                    request.url,
                    e
                );
                (Vec::new(), Some(FailureKind::from(&e)))
            }
        };

        let applied = field.apply(Transition::Resolve {
            generation,
            choices: &choices,
            selected: target.as_deref(),
        });

        let outcome = match (applied, failure) {
            (Applied::Resolved(_), Some(failure)) => LoadOutcome::Failed(failure),
            (Applied::Resolved(selected), None) => LoadOutcome::Populated {
                choices: choices.len(),
                selected,
            },
            _ => return LoadOutcome::Superseded,
        };

        field.last_outcome = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::select::CURRENT_VALUE;
    use crate::{Error, Result};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    const AREAS: &str = "/dcim/areas/?format=json";
    const RACKS: &str = "/dcim/racks/";

    enum Reply {
        Choices(Vec<Choice>),
        Status(u16),
    }

    /// Answers from a fixed table keyed by `param=value`, unknown keys get no options
    #[derive(Default)]
    struct TableSource {
        replies: HashMap<String, Reply>,
        requests: StdMutex<Vec<String>>,
    }

    impl TableSource {
        fn reply(mut self, key: &str, choices: Vec<Choice>) -> Self {
            self.replies.insert(key.to_string(), Reply::Choices(choices));
            self
        }

        fn fail(mut self, key: &str, status: u16) -> Self {
            self.replies.insert(key.to_string(), Reply::Status(status));
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl OptionSource for TableSource {
        async fn fetch(&self, request: &OptionsRequest) -> Result<Vec<Choice>> {
            self.requests.lock().unwrap().push(request.target());
            match self
                .replies
                .get(&format!("{}={}", request.param, request.value))
            {
                Some(Reply::Choices(choices)) => Ok(choices.clone()),
                Some(Reply::Status(status)) => {
                    Err(Error::WebServer(*status, "failed".into()))
                }
                None => Ok(Vec::new()),
            }
        }
    }

    /// Holds each response until the test releases it
    #[derive(Default)]
    struct GatedSource {
        gates: StdMutex<HashMap<String, tokio::sync::oneshot::Receiver<Vec<Choice>>>>,
        requests: StdMutex<Vec<String>>,
    }

    impl GatedSource {
        fn gate(&self, value: &str) -> tokio::sync::oneshot::Sender<Vec<Choice>> {
            let (tx, rx) = tokio::sync::oneshot::channel();
            self.gates.lock().unwrap().insert(value.to_string(), rx);
            tx
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl OptionSource for GatedSource {
        async fn fetch(&self, request: &OptionsRequest) -> Result<Vec<Choice>> {
            self.requests.lock().unwrap().push(request.target());
            let gate = self.gates.lock().unwrap().remove(&request.value);
            match gate {
                Some(rx) => rx.await.map_err(|_| Error::general("gate dropped")),
                None => Ok(Vec::new()),
            }
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn areas() -> Vec<Choice> {
        vec![Choice::new(12, "Area12"), Choice::new(13, "Area13")]
    }

    fn racks() -> Vec<Choice> {
        vec![Choice::new(40, "R40"), Choice::new(41, "R41")]
    }

    fn endpoints() -> Endpoints {
        Endpoints {
            areas_url: Some(AREAS.into()),
            racks_url: Some(RACKS.into()),
        }
    }

    fn controller<S: OptionSource>(
        source: S,
        site: &str,
        area: &str,
        rack: &str,
    ) -> CascadeController<S> {
        CascadeController::new(
            source,
            Select::new("id_site").with_value(site),
            Select::new("id_area").with_data(CURRENT_VALUE, area),
            Select::new("id_rack").with_data(CURRENT_VALUE, rack),
            endpoints(),
        )
    }

    async fn assert_disabled_placeholder<S: OptionSource>(
        c: &CascadeController<S>,
        kind: FieldKind,
    ) {
        let select = c.select(kind).await;
        assert!(select.is_disabled(), "{} should be disabled", kind);
        assert_eq!(
            select.entries().len(),
            1,
            "{} should hold the placeholder only",
            kind
        );
        assert_eq!(select.value(), "");
        assert_eq!(c.state(kind).await, FieldState::Disabled);
    }

    #[tokio::test]
    async fn initialize_restores_hierarchy() {
        init_tracing();
        let source = TableSource::default()
            .reply("site=5", areas())
            .reply("area=12", racks());
        let c = controller(source, "5", "12", "41");

        c.initialize().await;

        assert_eq!(
            c.source.requests(),
            vec![
                "/dcim/areas/?format=json&site=5".to_string(),
                "/dcim/racks/?area=12".to_string()
            ]
        );

        let area = c.select(FieldKind::Area).await;
        assert!(!area.is_disabled());
        assert_eq!(area.value(), "12");
        assert_eq!(area.entries().len(), 3);
        assert_eq!(
            c.last_outcome(FieldKind::Area).await,
            Some(LoadOutcome::Populated {
                choices: 2,
                selected: Some("12".into())
            })
        );

        let rack = c.select(FieldKind::Rack).await;
        assert!(!rack.is_disabled());
        assert_eq!(rack.value(), "41");
        assert_eq!(rack.selected().unwrap().label, "R41");
    }

    #[tokio::test]
    async fn initialize_without_site_disables_dependents() {
        let c = controller(TableSource::default(), "", "12", "");
        c.initialize().await;

        assert!(c.source.requests().is_empty());
        assert_disabled_placeholder(&c, FieldKind::Area).await;
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
    }

    #[tokio::test]
    async fn initialize_with_unknown_retained_area() {
        let source = TableSource::default().reply("site=5", areas());
        let c = controller(source, "5", "99", "40");
        c.initialize().await;

        assert_eq!(c.source.requests().len(), 1);
        let area = c.select(FieldKind::Area).await;
        assert_eq!(area.value(), "");
        assert_eq!(area.entries().len(), 3);
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
    }

    #[tokio::test]
    async fn site_change_does_not_restore() {
        let source = TableSource::default()
            .reply("site=5", areas())
            .reply("area=12", racks());
        let c = controller(source, "", "12", "40");

        let outcome = c.on_site_changed("5").await;
        assert_eq!(
            outcome,
            LoadOutcome::Populated {
                choices: 2,
                selected: None
            }
        );
        let area = c.select(FieldKind::Area).await;
        assert_eq!(area.value(), "");
        assert_eq!(area.current_value(), "");
        assert_eq!(c.select(FieldKind::Rack).await.current_value(), "");
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
    }

    #[tokio::test]
    async fn clearing_site_resets_chain() {
        let source = TableSource::default()
            .reply("site=5", areas())
            .reply("area=12", racks());
        let c = controller(source, "", "", "");

        c.on_site_changed("5").await;
        c.on_area_changed("12").await;
        assert_eq!(c.select(FieldKind::Rack).await.entries().len(), 3);

        assert_eq!(c.on_site_changed("").await, LoadOutcome::Disabled);
        assert_eq!(c.select(FieldKind::Site).await.value(), "");
        assert_disabled_placeholder(&c, FieldKind::Area).await;
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
    }

    #[tokio::test]
    async fn clearing_area_resets_rack() {
        let source = TableSource::default()
            .reply("site=5", areas())
            .reply("area=12", racks());
        let c = controller(source, "5", "12", "40");
        c.initialize().await;

        assert_eq!(c.on_area_changed("").await, LoadOutcome::Disabled);
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
        assert_eq!(c.select(FieldKind::Area).await.entries().len(), 3);
    }

    #[tokio::test]
    async fn rack_failure_leaves_placeholder() {
        let source = TableSource::default()
            .reply("site=5", areas())
            .fail("area=12", 500);
        let c = controller(source, "5", "", "");
        c.initialize().await;

        let outcome = c.on_area_changed("12").await;
        assert_eq!(outcome, LoadOutcome::Failed(FailureKind::Status(500)));

        let rack = c.select(FieldKind::Rack).await;
        assert!(!rack.is_disabled());
        assert_eq!(rack.entries().len(), 1);
        assert!(rack.entries()[0].is_placeholder());
        assert_eq!(c.state(FieldKind::Rack).await, FieldState::Populated);
    }

    #[tokio::test]
    async fn empty_result_is_not_a_failure() {
        let c = controller(TableSource::default(), "", "", "");
        let outcome = c.on_site_changed("8").await;
        assert_eq!(
            outcome,
            LoadOutcome::Populated {
                choices: 0,
                selected: None
            }
        );
        assert!(!c.select(FieldKind::Area).await.is_disabled());
    }

    #[tokio::test]
    async fn empty_filter_disables() {
        let source = TableSource::default().reply("site=5", areas());
        let c = controller(source, "", "", "");
        c.on_site_changed("5").await;

        for kind in [FieldKind::Area, FieldKind::Rack] {
            assert_eq!(
                c.load_options_for(kind, "", false).await,
                LoadOutcome::Disabled
            );
            assert_disabled_placeholder(&c, kind).await;
        }
    }

    #[tokio::test]
    async fn missing_endpoint_disables() {
        let source = TableSource::default().reply("site=5", areas());
        let c = CascadeController::new(
            source,
            Select::new("id_site"),
            Select::new("id_area"),
            Select::new("id_rack"),
            Endpoints {
                areas_url: Some(AREAS.into()),
                racks_url: None,
            },
        );
        c.on_site_changed("5").await;
        assert_eq!(c.on_area_changed("12").await, LoadOutcome::Disabled);
        assert_eq!(
            c.last_outcome(FieldKind::Rack).await,
            Some(LoadOutcome::Disabled)
        );
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
        assert_eq!(c.source.requests().len(), 1);
    }

    #[tokio::test]
    async fn repeated_loads_converge() {
        let source = TableSource::default().reply("site=5", areas());
        let c = controller(source, "", "", "");

        c.load_options_for(FieldKind::Area, "5", false).await;
        let first = c.select(FieldKind::Area).await;
        c.load_options_for(FieldKind::Area, "5", false).await;
        assert_eq!(c.select(FieldKind::Area).await, first);
    }

    #[tokio::test]
    async fn older_response_is_dropped() {
        init_tracing();
        let source = GatedSource::default();
        let gate_1 = source.gate("1");
        let gate_2 = source.gate("2");
        let c = controller(source, "", "", "");

        let first = c.on_site_changed("1");
        let second = async {
            while c.source.request_count() < 1 {
                tokio::task::yield_now().await;
            }
            c.on_site_changed("2").await
        };
        let release = async {
            while c.source.request_count() < 2 {
                tokio::task::yield_now().await;
            }
            gate_2.send(vec![Choice::new(20, "second")]).unwrap();
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            gate_1.send(vec![Choice::new(10, "first")]).unwrap();
        };

        let (first, second, ()) = tokio::join!(first, second, release);
        assert_eq!(first, LoadOutcome::Superseded);
        assert_eq!(
            second,
            LoadOutcome::Populated {
                choices: 1,
                selected: None
            }
        );

        let area = c.select(FieldKind::Area).await;
        assert_eq!(area.entries()[1].label, "second");
        assert_eq!(area.entries().len(), 2);
    }

    #[tokio::test]
    async fn clearing_site_drops_pending_load() {
        let source = GatedSource::default();
        let gate = source.gate("5");
        let c = controller(source, "", "", "");

        let load = c.on_site_changed("5");
        let clear = async {
            while c.state(FieldKind::Area).await == FieldState::Populated {
                tokio::task::yield_now().await;
            }
            let outcome = c.on_site_changed("").await;
            gate.send(areas()).unwrap();
            outcome
        };

        let (load, clear) = tokio::join!(load, clear);
        assert_eq!(load, LoadOutcome::Superseded);
        assert_eq!(clear, LoadOutcome::Disabled);
        assert_disabled_placeholder(&c, FieldKind::Area).await;
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
    }

    #[tokio::test]
    async fn clearing_site_drops_pending_rack_load() {
        init_tracing();
        let source = GatedSource::default();
        let site_gate = source.gate("5");
        let area_gate = source.gate("12");
        let c = controller(source, "5", "12", "");

        let init = c.initialize();
        let clear = async {
            while c.source.request_count() < 1 {
                tokio::task::yield_now().await;
            }
            site_gate.send(areas()).unwrap();
            while c.source.request_count() < 2 {
                tokio::task::yield_now().await;
            }
            let outcome = c.on_site_changed("").await;
            area_gate.send(racks()).unwrap();
            outcome
        };

        let ((), clear) = tokio::join!(init, clear);
        assert_eq!(clear, LoadOutcome::Disabled);
        assert_eq!(
            c.source.requests.lock().unwrap().clone(),
            vec![
                "/dcim/areas/?format=json&site=5".to_string(),
                "/dcim/racks/?area=12".to_string()
            ]
        );
        assert_disabled_placeholder(&c, FieldKind::Area).await;
        assert_disabled_placeholder(&c, FieldKind::Rack).await;
        assert_eq!(c.last_outcome(FieldKind::Rack).await, None);
    }

    #[tokio::test]
    async fn restore_skipped_when_area_moved_on() {
        init_tracing();
        let source = TableSource::default()
            .reply("site=5", areas())
            .reply("area=12", racks())
            .reply("area=13", vec![Choice::new(50, "R50")]);
        let c = controller(source, "5", "", "");
        c.initialize().await;
        c.on_area_changed("13").await;

        // a restore for area 12 that resumes after the user picked area 13
        let outcome = c.load_one(FieldKind::Rack, "12", true, true).await;
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert!(!c
            .source
            .requests()
            .contains(&"/dcim/racks/?area=12".to_string()));

        let rack = c.select(FieldKind::Rack).await;
        assert!(!rack.is_disabled());
        assert_eq!(rack.entries().len(), 2);
        assert_eq!(rack.entries()[1].label, "R50");
    }
}
