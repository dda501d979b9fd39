// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::CountryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureFlag {
    Selected,
    Excluded,
}

impl FeatureFlag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Excluded => "excluded",
        }
    }
}

/// Per-feature paint state owned by whatever renders the map.
pub trait FeatureStateStore {
    fn set_feature_flag(&mut self, id: &CountryId, flag: FeatureFlag, value: bool);
    fn loaded_feature_ids(&self) -> Vec<CountryId>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_country_id: Option<CountryId>,
    pub excluded_country_id: Option<CountryId>,
}

impl SelectionState {
    fn slot_mut(&mut self, flag: FeatureFlag) -> &mut Option<CountryId> {
        match flag {
            FeatureFlag::Selected => &mut self.selected_country_id,
            FeatureFlag::Excluded => &mut self.excluded_country_id,
        }
    }
}

/// Selection and exclusion are independent; each role holds at most one
/// country. Every transition is a no-op until a store is attached.
#[derive(Debug)]
pub struct CountrySelection<S> {
    store: Option<S>,
    state: SelectionState,
}

impl<S> Default for CountrySelection<S> {
    fn default() -> Self {
        Self {
            store: None,
            state: SelectionState::default(),
        }
    }
}

impl<S: FeatureStateStore> CountrySelection<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, store: S) {
        self.store = Some(store);
        self.state = SelectionState::default();
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_some()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    pub fn select(&mut self, id: CountryId) {
        self.assign(FeatureFlag::Selected, id);
    }

    pub fn exclude(&mut self, id: CountryId) {
        self.assign(FeatureFlag::Excluded, id);
    }

    pub fn clear_selection(&mut self) {
        self.reset(FeatureFlag::Selected);
    }

    pub fn clear_exclusion(&mut self) {
        self.reset(FeatureFlag::Excluded);
    }

    fn assign(&mut self, flag: FeatureFlag, id: CountryId) {
        if self.store.is_none() {
            return;
        }
        self.reset(flag);
        if let Some(store) = self.store.as_mut() {
            store.set_feature_flag(&id, flag, true);
            *self.state.slot_mut(flag) = Some(id);
        }
    }

    // The store keeps flags per feature, so clearing has to visit each one.
    fn reset(&mut self, flag: FeatureFlag) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        for id in store.loaded_feature_ids() {
            store.set_feature_flag(&id, flag, false);
        }
        *self.state.slot_mut(flag) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{CountrySelection, FeatureFlag, FeatureStateStore};
    use crate::CountryId;
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct RecordingStore {
        flags: BTreeMap<(String, FeatureFlag), bool>,
        ids: Vec<CountryId>,
        writes: usize,
    }

    impl RecordingStore {
        fn with_countries(ids: &[&str]) -> Self {
            Self {
                ids: ids.iter().map(|id| CountryId::new(*id)).collect(),
                ..Self::default()
            }
        }

        fn flagged(&self, flag: FeatureFlag) -> Vec<String> {
            self.flags
                .iter()
                .filter(|((_, entry_flag), value)| *entry_flag == flag && **value)
                .map(|((id, _), _)| id.clone())
                .collect()
        }
    }

    impl FeatureStateStore for RecordingStore {
        fn set_feature_flag(&mut self, id: &CountryId, flag: FeatureFlag, value: bool) {
            self.writes += 1;
            self.flags.insert((id.as_str().to_owned(), flag), value);
        }

        fn loaded_feature_ids(&self) -> Vec<CountryId> {
            self.ids.clone()
        }
    }

    fn ready(ids: &[&str]) -> CountrySelection<RecordingStore> {
        let mut selection = CountrySelection::new();
        selection.initialize(RecordingStore::with_countries(ids));
        selection
    }

    #[test]
    fn calls_before_initialization_are_no_ops() {
        let mut selection = CountrySelection::<RecordingStore>::new();
        selection.select(CountryId::new("FR"));
        selection.exclude(CountryId::new("DE"));
        selection.clear_selection();
        assert!(!selection.is_ready());
        assert_eq!(selection.state().selected_country_id, None);
        assert_eq!(selection.state().excluded_country_id, None);
    }

    #[test]
    fn select_moves_the_flag_to_a_single_feature() {
        let mut selection = ready(&["FR", "DE", "ES"]);
        selection.select(CountryId::new("FR"));
        selection.select(CountryId::new("DE"));

        let store = selection.store().expect("store attached");
        assert_eq!(store.flagged(FeatureFlag::Selected), vec!["DE".to_owned()]);
        assert_eq!(
            selection.state().selected_country_id,
            Some(CountryId::new("DE"))
        );
    }

    #[test]
    fn clear_selection_leaves_exclusion_untouched() {
        let mut selection = ready(&["FR", "DE"]);
        selection.select(CountryId::new("FR"));
        selection.exclude(CountryId::new("DE"));

        selection.clear_selection();
        assert_eq!(selection.state().selected_country_id, None);
        assert_eq!(
            selection.state().excluded_country_id,
            Some(CountryId::new("DE"))
        );
        let store = selection.store().expect("store attached");
        assert!(store.flagged(FeatureFlag::Selected).is_empty());
        assert_eq!(store.flagged(FeatureFlag::Excluded), vec!["DE".to_owned()]);
    }

    #[test]
    fn clear_exclusion_leaves_selection_untouched() {
        let mut selection = ready(&["FR", "DE"]);
        selection.select(CountryId::new("FR"));
        selection.exclude(CountryId::new("DE"));

        selection.clear_exclusion();
        assert_eq!(selection.state().excluded_country_id, None);
        assert_eq!(
            selection.state().selected_country_id,
            Some(CountryId::new("FR"))
        );
    }

    #[test]
    fn clearing_visits_every_loaded_feature() {
        let mut selection = ready(&["FR", "DE", "ES", "IT"]);
        let before = selection.store().expect("store attached").writes;
        selection.clear_selection();
        let after = selection.store().expect("store attached").writes;
        assert_eq!(after - before, 4);
    }

    #[test]
    fn one_country_can_hold_both_roles() {
        let mut selection = ready(&["FR"]);
        selection.select(CountryId::new("FR"));
        selection.exclude(CountryId::new("FR"));
        assert_eq!(
            selection.state().selected_country_id,
            selection.state().excluded_country_id
        );
    }
}
