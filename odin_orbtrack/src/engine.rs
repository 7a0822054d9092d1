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

//! the explicitly owned engine context. All state mutation goes through `OrbitEngine` methods which
//! return what changed, so that drivers can either push these diffs or poll the engine state

use std::sync::Arc;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Serialize,Deserialize};
use tracing::{debug, info, warn};
use crate::{
    cartesian3::Cartesian3,
    catalog::{Catalog, CatalogStore, IngestReport, MergeReport, OwnershipEntry},
    config::{OrbTrackConfig, StartupQuery},
    elements::{RawElementRecord, TimedPosition},
    errors::Result,
    frame::{FrameTransform, ReferenceFrame},
    propagator::Propagator,
    sampler::{OrbitPath, OrbitSampler, SamplingPolicy},
    selection::{OwnerFilterPolicy, SelectionChange, SelectionManager},
    utc_now
};

/// highlight state after a query change (or re-evaluation on catalog replacement)
#[derive(Debug,Clone,Default,PartialEq,Serialize,Deserialize)]
pub struct HighlightUpdate {
    pub query: Option<String>,
    pub ids: Vec<u32>,
    pub count: usize,
}

/// what a single mutating engine call changed
#[derive(Debug,Clone,Default,PartialEq,Serialize,Deserialize)]
pub struct EngineChange {
    pub selection: SelectionChange,
    pub paths_attached: Vec<u32>, // new or regenerated paths
    pub paths_detached: Vec<u32>,
    pub paths_failed: Vec<u32>,   // selected but no renderable path
    pub frame: Option<ReferenceFrame>,
    pub highlight: Option<HighlightUpdate>,
    pub catalog_generation: Option<u64>,
    pub owners_changed: Vec<u32>,
    pub positions: Option<TickUpdate>, // set if the call recomputed all positions
}

impl EngineChange {
    pub fn is_empty (&self)->bool {
        *self == EngineChange::default()
    }

    fn merge (&mut self, other: EngineChange) {
        self.selection.extend( other.selection);
        self.paths_attached.extend( other.paths_attached);
        self.paths_detached.extend( other.paths_detached);
        self.paths_failed.extend( other.paths_failed);
        if other.frame.is_some() { self.frame = other.frame }
        if other.highlight.is_some() { self.highlight = other.highlight }
        if other.catalog_generation.is_some() { self.catalog_generation = other.catalog_generation }
        self.owners_changed.extend( other.owners_changed);
        if other.positions.is_some() { self.positions = other.positions }
    }
}

/// result of a position update for the whole catalog
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct TickUpdate {
    pub time: DateTime<Utc>,
    pub frame: ReferenceFrame,
    pub positions: Vec<(u32,Cartesian3)>, // all records with a current position
    pub n_diverged: usize, // records that kept their previous position
}

pub struct OrbitEngine<P: Propagator> {
    propagator: P,
    transform: FrameTransform,
    frame: ReferenceFrame,
    sampling: SamplingPolicy,
    store: CatalogStore,
    selection: SelectionManager,
    paths: HashMap<u32,OrbitPath>, // only for selected records, always sampled in `frame`
    current_time: DateTime<Utc>,
    startup: Option<StartupQuery>, // applied once to the first non-empty catalog
}

impl<P: Propagator> OrbitEngine<P> {

    pub fn new (propagator: P, config: &OrbTrackConfig)->Self {
        let startup = config.startup_query.as_deref().map( StartupQuery::parse).filter(|q| !q.is_empty());

        OrbitEngine {
            propagator,
            transform: FrameTransform::new( config.earth_radius),
            frame: config.initial_frame,
            sampling: config.sampling,
            store: CatalogStore::new(),
            selection: SelectionManager::new( config.owner_filter_policy),
            paths: HashMap::new(),
            current_time: utc_now(),
            startup,
        }
    }

    //--- accessors

    pub fn catalog (&self)->&Catalog { self.store.catalog() }
    pub fn snapshot (&self)->Arc<Catalog> { self.store.snapshot() }
    pub fn selection (&self)->&SelectionManager { &self.selection }
    pub fn frame (&self)->ReferenceFrame { self.frame }
    pub fn sampling (&self)->SamplingPolicy { self.sampling }
    pub fn current_time (&self)->DateTime<Utc> { self.current_time }
    pub fn transform (&self)->&FrameTransform { &self.transform }
    pub fn propagator (&self)->&P { &self.propagator }
    pub fn owner_filter_policy (&self)->OwnerFilterPolicy { self.selection.policy() }

    /// the orbit path of a selected record. Paths are never stale - they are replaced on every frame switch
    pub fn path (&self, id: u32)->Option<&OrbitPath> {
        self.paths.get(&id).filter(|p| p.is_valid_for( self.frame))
    }

    pub fn paths (&self)->impl Iterator<Item=&OrbitPath> {
        self.paths.values()
    }

    pub fn n_paths (&self)->usize { self.paths.len() }

    //--- catalog

    /// replace the catalog. This prunes selection state of records that went away and applies a pending
    /// startup query to the first non-empty catalog
    pub fn ingest (&mut self, raw_records: &[RawElementRecord])->(IngestReport,EngineChange) {
        let report = self.store.ingest( raw_records);

        let mut change = EngineChange { catalog_generation: Some(report.generation), ..Default::default() };
        let selection_change = self.selection.reconcile( self.store.catalog());
        change.merge( self.apply_selection_change( selection_change));

        // surviving selections get paths for their new element sets
        let ids: Vec<u32> = self.selection.selected().iter().copied().collect();
        change.merge( self.attach_paths( &ids));
        change.highlight = Some( self.highlight_update());

        if report.n_accepted > 0 {
            if let Some(query) = self.startup.take() {
                change.merge( self.apply_startup_query( &query));
            }
        }

        change.positions = Some( self.update_all_positions( self.current_time));
        (report, change)
    }

    /// fails with `StaleMerge` if `expected_generation` is not the current catalog generation
    pub fn merge_ownership (&mut self, entries: &[OwnershipEntry], expected_generation: Option<u64>)->Result<(MergeReport,EngineChange)> {
        let report = self.store.merge_ownership( entries, expected_generation)?;
        let change = EngineChange { owners_changed: report.changed_ids.clone(), ..Default::default() };
        Ok( (report, change) )
    }

    //--- selection

    pub fn select (&mut self, id: u32)->EngineChange {
        let change = self.selection.select( self.store.catalog(), id);
        self.apply_selection_change( change)
    }

    pub fn deselect (&mut self, id: u32)->EngineChange {
        let change = self.selection.deselect( id);
        self.apply_selection_change( change)
    }

    pub fn toggle (&mut self, id: u32)->EngineChange {
        let change = self.selection.toggle( self.store.catalog(), id);
        self.apply_selection_change( change)
    }

    pub fn clear_all (&mut self)->EngineChange {
        let change = self.selection.clear_all();
        self.apply_selection_change( change)
    }

    pub fn set_query (&mut self, query: Option<&str>)->EngineChange {
        self.selection.set_query( self.store.catalog(), query);
        EngineChange { highlight: Some( self.highlight_update()), ..Default::default() }
    }

    pub fn set_owner_filter (&mut self, owners: Vec<String>)->EngineChange {
        let change = self.selection.set_owner_filter( self.store.catalog(), owners);
        self.apply_selection_change( change)
    }

    //--- frame

    /// switching frames invalidates all paths and positions, which are re-computed before we return
    pub fn set_frame (&mut self, frame: ReferenceFrame)->EngineChange {
        if frame == self.frame {
            return EngineChange::default()
        }

        info!("switching reference frame to {}", frame);
        self.frame = frame;
        self.paths.clear();

        let ids: Vec<u32> = self.selection.selected().iter().copied().collect();
        let mut change = self.attach_paths( &ids);
        change.frame = Some(frame);
        change.positions = Some( self.update_all_positions( self.current_time));
        change
    }

    pub fn toggle_frame (&mut self)->EngineChange {
        self.set_frame( self.frame.toggled())
    }

    //--- time

    /// recompute positions of all records for time `t` in the active frame. Records for which propagation
    /// diverges keep their previous position
    pub fn update_all_positions (&mut self, t: DateTime<Utc>)->TickUpdate {
        self.current_time = t;

        let frame = self.frame;
        let transform = self.transform;
        let propagator = &self.propagator;
        let sidereal_angle = propagator.sidereal_angle(t);
        let mut n_diverged = 0;
        let mut positions: Vec<(u32,Cartesian3)> = Vec::with_capacity( self.store.catalog().len());

        self.store.update_records( |rec| {
            match propagator.propagate( rec.elements(), t) {
                Ok(p) => {
                    let position = transform.to_renderable( &p, sidereal_angle, frame);
                    rec.set_last_position( TimedPosition { time: t, frame, position });
                    positions.push( (rec.id(), position) );
                }
                Err(e) => {
                    n_diverged += 1;
                    debug!("keeping previous position of {}: {}", rec.id(), e);
                    if let Some(last) = rec.last_position() {
                        if last.frame == frame { positions.push( (rec.id(), last.position) ) }
                    }
                }
            }
        });

        TickUpdate { time: t, frame, positions, n_diverged }
    }

    /// re-sample all selected paths starting at the current time
    pub fn refresh_paths (&mut self)->EngineChange {
        let ids: Vec<u32> = self.selection.selected().iter().copied().collect();
        self.attach_paths( &ids)
    }

    /// sample a path with a custom policy without attaching it
    pub fn sample_path (&self, id: u32, policy: SamplingPolicy)->Option<Result<OrbitPath>> {
        self.store.catalog().get(id).map( |rec| {
            OrbitSampler::new( &self.propagator, &self.transform).sample_path( rec, self.frame, self.current_time, policy)
        })
    }

    //--- internals

    fn apply_selection_change (&mut self, selection: SelectionChange)->EngineChange {
        let mut change = EngineChange::default();

        for id in &selection.removed {
            if self.paths.remove(id).is_some() {
                change.paths_detached.push(*id);
            }
        }
        change.merge( self.attach_paths( &selection.added));
        change.selection = selection;
        change
    }

    fn attach_paths (&mut self, ids: &[u32])->EngineChange {
        let mut change = EngineChange::default();
        let sampler = OrbitSampler::new( &self.propagator, &self.transform);
        let catalog = self.store.catalog();

        for id in ids {
            if let Some(rec) = catalog.get(*id) {
                match sampler.sample_path( rec, self.frame, self.current_time, self.sampling) {
                    Ok(path) => {
                        self.paths.insert( *id, path);
                        change.paths_attached.push(*id);
                    }
                    Err(e) => {
                        warn!("no orbit path for {}: {}", id, e);
                        self.paths.remove(id);
                        change.paths_failed.push(*id);
                    }
                }
            }
        }
        change
    }

    fn highlight_update (&self)->HighlightUpdate {
        HighlightUpdate {
            query: self.selection.query().map(|q| q.to_string()),
            ids: self.selection.highlighted().iter().copied().collect(),
            count: self.selection.match_count()
        }
    }

    fn apply_startup_query (&mut self, query: &StartupQuery)->EngineChange {
        let mut change = EngineChange::default();
        for id in &query.selected_ids {
            change.merge( self.select(*id));
        }
        if let Some(text) = &query.highlight {
            change.merge( self.set_query( Some(text)));
        }
        info!("applied startup query: {} selected, highlight {:?}", self.selection.selected().len(), query.highlight);
        change
    }
}
