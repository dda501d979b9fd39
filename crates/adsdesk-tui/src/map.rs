// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use adsdesk_app::{CountryId, CountrySelection, FeatureFlag, FeatureStateStore};
use std::collections::{BTreeMap, BTreeSet};

pub const COUNTRIES: [(&str, &str); 24] = [
    ("AR", "Argentina"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("IE", "Ireland"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("SE", "Sweden"),
    ("US", "United States"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
}

/// Country features as drawn in the map panel, with their paint flags.
#[derive(Debug, Clone, Default)]
pub struct CountryMap {
    countries: Vec<Country>,
    flags: BTreeMap<CountryId, BTreeSet<FeatureFlag>>,
}

impl CountryMap {
    pub fn new(countries: Vec<Country>) -> Self {
        Self {
            countries,
            flags: BTreeMap::new(),
        }
    }

    pub fn world() -> Self {
        Self::new(
            COUNTRIES
                .iter()
                .map(|(code, name)| Country {
                    id: CountryId::new(*code),
                    name: (*name).to_owned(),
                })
                .collect(),
        )
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn has_flag(&self, id: &CountryId, flag: FeatureFlag) -> bool {
        self.flags.get(id).is_some_and(|flags| flags.contains(&flag))
    }
}

impl FeatureStateStore for CountryMap {
    fn set_feature_flag(&mut self, id: &CountryId, flag: FeatureFlag, value: bool) {
        if value {
            self.flags.entry(id.clone()).or_default().insert(flag);
        } else if let Some(flags) = self.flags.get_mut(id) {
            flags.remove(&flag);
            if flags.is_empty() {
                self.flags.remove(id);
            }
        }
    }

    fn loaded_feature_ids(&self) -> Vec<CountryId> {
        self.countries.iter().map(|country| country.id.clone()).collect()
    }
}

#[derive(Debug, Default)]
pub struct MapPanel {
    pub selection: CountrySelection<CountryMap>,
    pub cursor: usize,
}

impl MapPanel {
    pub fn load(&mut self, map: CountryMap) {
        self.selection.initialize(map);
        self.cursor = 0;
    }

    pub fn highlighted(&self) -> Option<&Country> {
        self.selection.store()?.countries().get(self.cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let Some(map) = self.selection.store() else {
            return;
        };
        let len = map.countries().len();
        if len == 0 {
            return;
        }
        let next = self.cursor.saturating_add_signed(delta);
        self.cursor = next.min(len - 1);
    }

    pub fn lines(&self) -> Vec<String> {
        let Some(map) = self.selection.store() else {
            return vec!["map loading...".to_owned()];
        };
        map.countries()
            .iter()
            .enumerate()
            .map(|(index, country)| {
                let marker = if map.has_flag(&country.id, FeatureFlag::Selected) {
                    "●"
                } else if map.has_flag(&country.id, FeatureFlag::Excluded) {
                    "✕"
                } else {
                    " "
                };
                let cursor = if index == self.cursor { ">" } else { " " };
                format!("{cursor}{marker} {} {}", country.id, country.name)
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let state = self.selection.state();
        let label = |id: &Option<CountryId>| {
            id.as_ref()
                .map_or_else(|| "none".to_owned(), ToString::to_string)
        };
        format!(
            "target: {} | excluded: {}",
            label(&state.selected_country_id),
            label(&state.excluded_country_id)
        )
    }
}
