//! Searchable single-select over a list of records
//!
//! The committed value belongs to the caller. The combobox only tracks the
//! search text and whether the list is open, and hands back a [`Commit`]
//! whenever the selection should change.

use thiserror::Error;

use crate::models::{Company, Entity, EntityId, Lead, Person};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub id: EntityId,
    pub label: String,
}

impl SelectOption {
    pub fn new(id: EntityId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComboState {
    #[default]
    Closed,
    /// Focused, showing the committed label. No list open.
    Idle,
    /// List open and following the search text.
    Searching,
}

/// A change the caller should apply to its committed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Set(EntityId),
    Clear,
}

impl Commit {
    pub fn into_id(self) -> Option<EntityId> {
        match self {
            Self::Set(id) => Some(id),
            Self::Clear => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("No match for {query:?}")]
    NoMatch { query: String },
    #[error("{query:?} is ambiguous: {}", candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Combobox {
    options: Vec<SelectOption>,
    search: String,
    has_typed: bool,
    state: ComboState,
}

impl Combobox {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    /// Whether the option list is showing.
    pub fn is_open(&self) -> bool {
        self.state == ComboState::Searching
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Replace the options after a refetch. Search state is kept.
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        self.options = options;
    }

    pub fn focus(&mut self) {
        self.state = ComboState::Searching;
    }

    /// The chevron button.
    pub fn toggle(&mut self) {
        self.state = match self.state {
            ComboState::Searching => ComboState::Idle,
            ComboState::Closed | ComboState::Idle => ComboState::Searching,
        };
    }

    /// Typing filters the list but never commits.
    pub fn input(&mut self, text: &str) {
        self.search = text.to_string();
        self.has_typed = true;
        self.state = ComboState::Searching;
    }

    pub fn filtered(&self) -> Vec<&SelectOption> {
        let needle = self.search.trim().to_lowercase();
        if !self.has_typed || needle.is_empty() {
            return self.options.iter().collect();
        }
        self.options
            .iter()
            .filter(|o| o.label.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn select(&mut self, id: &EntityId) -> Option<Commit> {
        let option = self.options.iter().find(|o| &o.id == id)?;
        let commit = Commit::Set(option.id.clone());
        self.reset_search();
        Some(commit)
    }

    pub fn click_outside(&mut self) {
        self.reset_search();
    }

    pub fn clear(&mut self) -> Commit {
        self.reset_search();
        Commit::Clear
    }

    /// What the input box shows. A dangling id shows as empty.
    pub fn display_text(&self, value: Option<&EntityId>) -> String {
        if self.has_typed {
            return self.search.clone();
        }
        self.selected(value)
            .map(|o| o.label.clone())
            .unwrap_or_default()
    }

    pub fn selected(&self, value: Option<&EntityId>) -> Option<&SelectOption> {
        let value = value?;
        self.options.iter().find(|o| &o.id == value)
    }

    pub fn is_selected(&self, value: Option<&EntityId>, option: &SelectOption) -> bool {
        self.selected(value).is_some_and(|o| o.id == option.id)
    }

    /// Type `query` and commit the result if it is unambiguous: a single
    /// match, or the one label equal to `query` ignoring case.
    pub fn pick(&mut self, query: &str) -> Result<Commit, PickError> {
        self.focus();
        self.input(query);

        let outcome = resolve(&self.filtered(), query.trim());
        match outcome {
            Ok(id) => self.select(&id).ok_or_else(|| PickError::NoMatch {
                query: query.to_string(),
            }),
            Err(candidates) => {
                self.click_outside();
                if candidates.is_empty() {
                    Err(PickError::NoMatch {
                        query: query.to_string(),
                    })
                } else {
                    Err(PickError::Ambiguous {
                        query: query.to_string(),
                        candidates,
                    })
                }
            }
        }
    }

    fn reset_search(&mut self) {
        self.search.clear();
        self.has_typed = false;
        self.state = ComboState::Closed;
    }
}

/// The one id `matches` settles on, or the candidate labels.
fn resolve(matches: &[&SelectOption], query: &str) -> Result<EntityId, Vec<String>> {
    if let [only] = matches {
        return Ok(only.id.clone());
    }
    let exact: Vec<_> = matches
        .iter()
        .filter(|o| o.label.eq_ignore_ascii_case(query))
        .collect();
    match exact.as_slice() {
        [one] => Ok(one.id.clone()),
        _ => Err(matches.iter().map(|o| o.label.clone()).collect()),
    }
}

/// Options for records that have been saved. Unsaved records are skipped.
pub fn options_from<T: Entity>(items: &[T]) -> Vec<SelectOption> {
    items
        .iter()
        .filter_map(|item| Some(SelectOption::new(item.id()?.clone(), item.label())))
        .collect()
}

pub fn company_options(companies: &[Company]) -> Vec<SelectOption> {
    options_from(companies)
}

/// People, narrowed to one company when given.
pub fn person_options(people: &[Person], company: Option<&EntityId>) -> Vec<SelectOption> {
    match company {
        Some(company) => {
            let narrowed: Vec<Person> = people
                .iter()
                .filter(|p| p.belongs_to(company))
                .cloned()
                .collect();
            options_from(&narrowed)
        }
        None => options_from(people),
    }
}

pub fn lead_options(leads: &[Lead]) -> Vec<SelectOption> {
    options_from(leads)
}
