//!
//! The three linked fields and their lifecycle.
//!
use crate::choice::Choice;
use crate::controller::LoadOutcome;
use crate::select::{Select, CURRENT_VALUE};

/// Position of a field in the Site, Area, Rack chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Parent field, rendered by the server
    Site,
    /// Middle field, filtered by site
    Area,
    /// Leaf field, filtered by area
    Rack,
}

impl FieldKind {
    /// All fields, parent first
    pub const ALL: [Self; 3] = [Self::Site, Self::Area, Self::Rack];

    /// Id of the select element
    #[must_use]
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::Site => "id_site",
            Self::Area => "id_area",
            Self::Rack => "id_rack",
        }
    }

    /// Field whose options depend on this one
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Site => Some(Self::Area),
            Self::Area => Some(Self::Rack),
            Self::Rack => None,
        }
    }

    /// Field whose value filters this one
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Site => None,
            Self::Area => Some(Self::Site),
            Self::Rack => Some(Self::Area),
        }
    }

    /// Query parameter carrying the parent id when fetching this field's options
    #[must_use]
    pub const fn filter_param(self) -> Option<&'static str> {
        match self {
            Self::Site => None,
            Self::Area => Some("site"),
            Self::Rack => Some("area"),
        }
    }

    /// Fields below this one, nearest first
    pub fn descendants(self) -> impl Iterator<Item = Self> {
        std::iter::successors(self.child(), |k| k.child())
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Site => "site",
            Self::Area => "area",
            Self::Rack => "rack",
        })
    }
}

/// Lifecycle of a dependent field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldState {
    /// Placeholder only, no input accepted
    Disabled,
    /// Enabled, waiting for the response of request `generation`
    Loading {
        /// Generation of the request in flight
        generation: u64,
    },
    /// Enabled with the fetched entries
    Populated,
}

pub(crate) enum Transition<'a> {
    /// Collapse to placeholder only and disable
    Disable,
    /// Collapse to placeholder only, enable, and wait for a new request
    BeginLoad,
    /// Response for request `generation`
    Resolve {
        generation: u64,
        choices: &'a [Choice],
        selected: Option<&'a str>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Disabled,
    Loading(u64),
    /// Populated, carrying the value that got selected
    Resolved(Option<String>),
    /// Response for an older request, dropped
    Stale,
}

#[derive(Debug)]
pub(crate) struct Field {
    pub(crate) kind: FieldKind,
    pub(crate) select: Select,
    pub(crate) url: Option<String>,
    pub(crate) state: FieldState,
    pub(crate) last_outcome: Option<LoadOutcome>,
    generation: u64,
}

impl Field {
    pub(crate) fn new(kind: FieldKind, select: Select, url: Option<String>) -> Self {
        let state = if select.is_disabled() {
            FieldState::Disabled
        } else {
            FieldState::Populated
        };
        Self {
            kind,
            select,
            url: url.filter(|u| !u.is_empty()),
            state,
            last_outcome: None,
            generation: 0,
        }
    }

    pub(crate) fn retained(&self) -> Option<String> {
        Some(self.select.current_value())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub(crate) fn clear_retained(&mut self) {
        self.select.set_data(CURRENT_VALUE, "");
    }

    /// Every state change of the field goes through here.
    pub(crate) fn apply(&mut self, transition: Transition<'_>) -> Applied {
        match transition {
            Transition::Disable => {
                self.generation += 1;
                self.select.reset();
                self.select.set_disabled(true);
                self.state = FieldState::Disabled;
                self.last_outcome = None;
                tracing::debug!("{} disabled", self.kind);
                Applied::Disabled
            }
            Transition::BeginLoad => {
                self.generation += 1;
                self.select.reset();
                self.select.set_disabled(false);
                self.state = FieldState::Loading {
                    generation: self.generation,
                };
                tracing::debug!("{} loading, generation {}", self.kind, self.generation);
                Applied::Loading(self.generation)
            }
            Transition::Resolve {
                generation,
                choices,
                selected,
            } => {
                if self.state != (FieldState::Loading { generation }) {
                    tracing::debug!(
                        "{} dropping response for generation {}, now at {}",
                        self.kind,
                        generation,
                        self.generation
                    );
                    return Applied::Stale;
                }
                let hit = self.select.populate(choices, selected);
                self.select.set_disabled(false);
                self.state = FieldState::Populated;
                Applied::Resolved(hit)
            }
        }
    }
}
