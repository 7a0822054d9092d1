/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! selection, name query highlighting and owner filtering. These are independent axes - highlighted
//! records are not selected and a query change never touches the selection

use std::collections::BTreeSet;
use serde::{Serialize,Deserialize};
use tracing::debug;
use crate::catalog::Catalog;

/// how a non-empty owner filter combines with the current selection
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize,Default)]
pub enum OwnerFilterPolicy {
    /// selection becomes exactly the set of records with a matching owner
    #[default]
    Override,
    /// keep only selected records with a matching owner
    Intersect,
    /// add records with a matching owner to the selection
    Union,
}

/// diff of a selection mutation. Added ids need a new orbit path, removed ids lose theirs
#[derive(Debug,Clone,Default,PartialEq,Eq,Serialize,Deserialize)]
pub struct SelectionChange {
    pub added: Vec<u32>,
    pub removed: Vec<u32>,
}

impl SelectionChange {
    pub fn is_empty (&self)->bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    fn added (id: u32)->Self { SelectionChange { added: vec![id], removed: vec![] } }
    fn removed (id: u32)->Self { SelectionChange { added: vec![], removed: vec![id] } }

    fn between (old: &BTreeSet<u32>, new: &BTreeSet<u32>)->Self {
        SelectionChange {
            added: new.difference(old).copied().collect(),
            removed: old.difference(new).copied().collect(),
        }
    }

    pub fn extend (&mut self, other: SelectionChange) {
        self.added.extend( other.added);
        self.removed.extend( other.removed);
    }
}

#[derive(Debug,Default)]
pub struct SelectionManager {
    policy: OwnerFilterPolicy,
    selected: BTreeSet<u32>,
    query: Option<String>,
    highlighted: BTreeSet<u32>,
    owner_filter: BTreeSet<String>,
}

impl SelectionManager {
    pub fn new (policy: OwnerFilterPolicy)->Self {
        SelectionManager { policy, ..Default::default() }
    }

    pub fn policy (&self)->OwnerFilterPolicy { self.policy }
    pub fn selected (&self)->&BTreeSet<u32> { &self.selected }
    pub fn is_selected (&self, id: u32)->bool { self.selected.contains(&id) }
    pub fn query (&self)->Option<&str> { self.query.as_deref() }
    pub fn highlighted (&self)->&BTreeSet<u32> { &self.highlighted }
    pub fn match_count (&self)->usize { self.highlighted.len() }
    pub fn owner_filter (&self)->&BTreeSet<String> { &self.owner_filter }

    //--- explicit selection

    /// selecting an already selected (or unknown) record does nothing
    pub fn select (&mut self, catalog: &Catalog, id: u32)->SelectionChange {
        if !catalog.contains(id) {
            debug!("ignoring selection of unknown record {id}");
            return SelectionChange::default()
        }
        if self.selected.insert(id) { SelectionChange::added(id) } else { SelectionChange::default() }
    }

    pub fn deselect (&mut self, id: u32)->SelectionChange {
        if self.selected.remove(&id) { SelectionChange::removed(id) } else { SelectionChange::default() }
    }

    pub fn toggle (&mut self, catalog: &Catalog, id: u32)->SelectionChange {
        if self.is_selected(id) { self.deselect(id) } else { self.select(catalog, id) }
    }

    pub fn clear_all (&mut self)->SelectionChange {
        let removed: Vec<u32> = std::mem::take( &mut self.selected).into_iter().collect();
        SelectionChange { added: vec![], removed }
    }

    //--- query highlighting

    /// returns the number of matches. None or an empty query clears all highlights
    pub fn set_query (&mut self, catalog: &Catalog, query: Option<&str>)->usize {
        match query {
            Some(q) if !q.is_empty() => {
                self.highlighted = catalog.find_by_name_query(q).into_iter().collect();
                self.query = Some(q.to_string());
            }
            _ => {
                self.highlighted.clear();
                self.query = None;
            }
        }
        self.highlighted.len()
    }

    //--- owner filter

    /// an empty owner set clears the filter without touching the selection
    pub fn set_owner_filter (&mut self, catalog: &Catalog, owners: impl IntoIterator<Item=String>)->SelectionChange {
        self.owner_filter = owners.into_iter().collect();
        if self.owner_filter.is_empty() {
            return SelectionChange::default()
        }

        let matching: BTreeSet<u32> = catalog.ids_with_owner_in( &self.owner_filter).into_iter().collect();
        let new_selection: BTreeSet<u32> = match self.policy {
            OwnerFilterPolicy::Override => matching,
            OwnerFilterPolicy::Intersect => self.selected.intersection(&matching).copied().collect(),
            OwnerFilterPolicy::Union => self.selected.union(&matching).copied().collect(),
        };

        let change = SelectionChange::between( &self.selected, &new_selection);
        self.selected = new_selection;
        change
    }

    //--- catalog replacement

    /// drop selected ids that are no longer in the catalog and re-run the current query
    pub fn reconcile (&mut self, catalog: &Catalog)->SelectionChange {
        let removed: Vec<u32> = self.selected.iter().filter(|id| !catalog.contains(**id)).copied().collect();
        for id in &removed {
            self.selected.remove(id);
        }

        let query = self.query.take();
        self.set_query( catalog, query.as_deref());

        SelectionChange { added: vec![], removed }
    }
}
