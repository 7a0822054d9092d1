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

use odin_orbtrack::{
    catalog::{parse_ownership_json, CatalogStore},
    elements::parse_tle_text,
    selection::{OwnerFilterPolicy, SelectionChange, SelectionManager},
};

const STATIONS: &str = include_str!("data/stations.tle");
const SATCAT: &str = include_str!("data/satcat.json");

const ISS: u32 = 25544;
const NOAA21: u32 = 54234;
const HST: u32 = 20580;
const NOAA20: u32 = 43013;

fn owned_store ()->CatalogStore {
    let mut store = CatalogStore::new();
    store.ingest( &parse_tle_text( STATIONS));
    store.merge_ownership( &parse_ownership_json( SATCAT).unwrap(), None).unwrap();
    store
}

fn selected (sm: &SelectionManager)->Vec<u32> {
    sm.selected().iter().copied().collect()
}

#[test]
fn test_select_idempotence() {
    let store = owned_store();
    let catalog = store.catalog();
    let mut sm = SelectionManager::default();

    let change = sm.select( catalog, ISS);
    assert_eq!( change, SelectionChange { added: vec![ISS], removed: vec![] });

    let change = sm.select( catalog, ISS);
    assert!( change.is_empty());
    assert_eq!( selected(&sm), vec![ISS]);

    // unknown ids are ignored
    assert!( sm.select( catalog, 99999).is_empty());

    let change = sm.toggle( catalog, ISS);
    assert_eq!( change.removed, vec![ISS]);
    assert!( sm.deselect( ISS).is_empty());

    sm.select( catalog, ISS);
    sm.select( catalog, HST);
    let mut change = sm.clear_all();
    change.removed.sort();
    assert_eq!( change.removed, vec![HST, ISS]);
    assert!( sm.selected().is_empty());
}

#[test]
fn test_query_highlight() {
    let store = owned_store();
    let catalog = store.catalog();
    let mut sm = SelectionManager::default();
    sm.select( catalog, HST);

    let n = sm.set_query( catalog, Some("NoAa"));
    println!("{n} matches: {:?}", sm.highlighted());
    assert_eq!( n, 2);
    assert_eq!( sm.match_count(), 2);
    assert!( sm.highlighted().contains(&NOAA21) && sm.highlighted().contains(&NOAA20));
    assert_eq!( sm.query(), Some("NoAa"));

    // highlighting never touches the selection
    assert_eq!( selected(&sm), vec![HST]);

    assert_eq!( sm.set_query( catalog, Some("")), 0);
    assert!( sm.query().is_none());
    assert_eq!( sm.set_query( catalog, None), 0);
    assert!( sm.highlighted().is_empty());
}

#[test]
fn test_owner_filter_override() {
    let store = owned_store();
    let catalog = store.catalog();
    let mut sm = SelectionManager::new( OwnerFilterPolicy::Override);
    sm.select( catalog, ISS);
    sm.select( catalog, HST);

    let change = sm.set_owner_filter( catalog, vec!["US".to_string()]);
    println!("{change:?}");

    assert_eq!( selected(&sm), vec![HST, NOAA20, NOAA21]);
    assert_eq!( change.added, vec![NOAA20, NOAA21]);
    assert_eq!( change.removed, vec![ISS]);
    assert!( sm.owner_filter().contains("US"));
}

#[test]
fn test_owner_filter_policies() {
    let store = owned_store();
    let catalog = store.catalog();

    let mut sm = SelectionManager::new( OwnerFilterPolicy::Intersect);
    sm.select( catalog, ISS);
    sm.select( catalog, HST);
    let change = sm.set_owner_filter( catalog, vec!["US".to_string()]);
    assert_eq!( selected(&sm), vec![HST]);
    assert_eq!( change.removed, vec![ISS]);
    assert!( change.added.is_empty());

    let mut sm = SelectionManager::new( OwnerFilterPolicy::Union);
    sm.select( catalog, ISS);
    let change = sm.set_owner_filter( catalog, vec!["US".to_string()]);
    assert_eq!( selected(&sm), vec![HST, ISS, NOAA20, NOAA21]);
    assert_eq!( change.added, vec![HST, NOAA20, NOAA21]);
    assert!( change.removed.is_empty());
}

#[test]
fn test_empty_owner_filter() {
    let store = owned_store();
    let catalog = store.catalog();
    let mut sm = SelectionManager::default();
    sm.set_owner_filter( catalog, vec!["ISS".to_string()]);
    assert_eq!( selected(&sm), vec![ISS]);

    // clearing the filter leaves the selection alone
    let change = sm.set_owner_filter( catalog, Vec::<String>::new());
    assert!( change.is_empty());
    assert!( sm.owner_filter().is_empty());
    assert_eq!( selected(&sm), vec![ISS]);

    // an owner nobody has selects nothing
    let change = sm.set_owner_filter( catalog, vec!["PRC".to_string()]);
    assert_eq!( change.removed, vec![ISS]);
    assert!( sm.selected().is_empty());
}

#[test]
fn test_reconcile() {
    let mut store = owned_store();
    let mut sm = SelectionManager::default();
    sm.select( store.catalog(), ISS);
    sm.select( store.catalog(), NOAA21);
    sm.set_query( store.catalog(), Some("zarya"));
    assert_eq!( sm.match_count(), 1);

    // re-ingest without the ISS
    let text: String = STATIONS.lines().skip(3).collect::<Vec<_>>().join("\n");
    store.ingest( &parse_tle_text( &text));

    let change = sm.reconcile( store.catalog());
    assert_eq!( change.removed, vec![ISS]);
    assert_eq!( selected(&sm), vec![NOAA21]);
    assert_eq!( sm.query(), Some("zarya"));
    assert_eq!( sm.match_count(), 0);
}
