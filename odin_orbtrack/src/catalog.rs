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

use std::{collections::BTreeSet, sync::Arc};
use hashbrown::HashMap;
use serde::{Serialize,Deserialize};
use tracing::{debug, info, warn};
use crate::{
    elements::{OrbitalRecord, RawElementRecord},
    errors::{OrbTrackError, Result}
};

/// one entry of the ownership (SATCAT) feed. We only need the name and owner, other fields are ignored
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct OwnershipEntry {
    #[serde(rename="OBJECT_NAME")]
    pub object_name: String,

    #[serde(rename="OWNER", default)]
    pub owner: Option<String>,
}

impl OwnershipEntry {
    pub fn new (object_name: &str, owner: &str)->Self {
        OwnershipEntry { object_name: object_name.to_string(), owner: Some(owner.to_string()) }
    }
}

/// parse a SATCAT records JSON array. Entries without OWNER are skipped
pub fn parse_ownership_json (text: &str)->Result<Vec<OwnershipEntry>> {
    let entries: Vec<OwnershipEntry> = serde_json::from_str(text)?;
    Ok( entries.into_iter().filter(|e| e.owner.is_some()).collect() )
}

/// a complete, consistent set of records. Catalogs are only replaced as a whole (ingest) or updated
/// copy-on-write, hence readers holding an `Arc<Catalog>` never see partial states
#[derive(Debug,Clone,Default)]
pub struct Catalog {
    generation: u64,
    records: Vec<OrbitalRecord>,
    index: HashMap<u32,usize>, // sat_id -> records index
}

impl Catalog {
    fn from_records (generation: u64, records: Vec<OrbitalRecord>)->Self {
        let index: HashMap<u32,usize> = records.iter().enumerate().map(|(i,r)| (r.id(),i)).collect();
        Catalog { generation, records, index }
    }

    pub fn generation (&self)->u64 { self.generation }
    pub fn len (&self)->usize { self.records.len() }
    pub fn is_empty (&self)->bool { self.records.is_empty() }

    pub fn get (&self, id: u32)->Option<&OrbitalRecord> {
        self.index.get(&id).map(|i| &self.records[*i])
    }

    /// lookup by NORAD catalog number
    pub fn find_by_id (&self, id: u32)->Option<&OrbitalRecord> {
        self.get(id)
    }

    pub fn contains (&self, id: u32)->bool {
        self.index.contains_key(&id)
    }

    pub fn iter (&self)->impl Iterator<Item=&OrbitalRecord> {
        self.records.iter()
    }

    /// sorted unique owners of all records that have one
    pub fn owners (&self)->Vec<String> {
        let owners: BTreeSet<&str> = self.records.iter().filter_map(|r| r.owner()).collect();
        owners.into_iter().map(|s| s.to_string()).collect()
    }

    /// case-insensitive substring match on record names
    pub fn find_by_name_query (&self, query: &str)->Vec<u32> {
        let query = query.to_lowercase();
        self.records.iter().filter(|r| r.name().to_lowercase().contains(&query)).map(|r| r.id()).collect()
    }

    pub fn ids_with_owner_in (&self, owners: &BTreeSet<String>)->Vec<u32> {
        self.records.iter().filter(|r| r.has_owner_in( owners.iter())).map(|r| r.id()).collect()
    }
}

/// outcome of an ingest, which never fails as a whole
#[derive(Debug,Clone,Default)]
pub struct IngestReport {
    pub generation: u64,
    pub n_accepted: usize,
    pub rejected: Vec<(Option<String>,String)>, // (name, reason) of dropped records
    pub n_duplicates: usize,
    pub removed_ids: Vec<u32>, // ids of the previous catalog that are gone now
}

#[derive(Debug,Clone,Default)]
pub struct MergeReport {
    pub generation: u64,
    pub n_matched: usize,
    pub n_unmatched: usize,
    pub changed_ids: Vec<u32>,
}

/// the authoritative record collection
#[derive(Debug,Default)]
pub struct CatalogStore {
    current: Arc<Catalog>,
}

impl CatalogStore {
    pub fn new ()->Self {
        CatalogStore { current: Arc::new( Catalog::default()) }
    }

    /// cheap snapshot for readers - subsequent updates do not affect it
    pub fn snapshot (&self)->Arc<Catalog> {
        self.current.clone()
    }

    pub fn catalog (&self)->&Catalog {
        &self.current
    }

    pub fn generation (&self)->u64 {
        self.current.generation
    }

    /// parse all raw records and replace the current catalog in one step. Records that fail to parse are
    /// logged and dropped, duplicate ids are resolved in favor of the later record
    pub fn ingest (&mut self, raw_records: &[RawElementRecord])->IngestReport {
        let mut records: Vec<OrbitalRecord> = Vec::with_capacity( raw_records.len());
        let mut positions: HashMap<u32,usize> = HashMap::with_capacity( raw_records.len());
        let mut rejected: Vec<(Option<String>,String)> = Vec::new();
        let mut n_duplicates = 0;

        for raw in raw_records {
            match OrbitalRecord::from_raw( raw) {
                Ok(rec) => {
                    if let Some(i) = positions.get( &rec.id()) {
                        debug!("duplicate record {} ({}) replaces previous one", rec.id(), rec.name());
                        records[*i] = rec;
                        n_duplicates += 1;
                    } else {
                        positions.insert( rec.id(), records.len());
                        records.push( rec);
                    }
                }
                Err(e) => {
                    warn!("dropping record {:?}: {}", raw.name, e);
                    rejected.push( (raw.name.clone(), e.to_string()) );
                }
            }
        }

        let generation = self.current.generation + 1;
        let catalog = Catalog::from_records( generation, records);
        let removed_ids: Vec<u32> = self.current.records.iter().map(|r| r.id()).filter(|id| !catalog.contains(*id)).collect();
        let n_accepted = catalog.len();

        self.current = Arc::new( catalog); // the only point where the new catalog becomes visible
        info!("ingested catalog generation {}: {} records, {} rejected", generation, n_accepted, rejected.len());

        IngestReport { generation, n_accepted, rejected, n_duplicates, removed_ids }
    }

    /// set owners of all records whose name exactly matches an OBJECT_NAME. If `expected_generation` is
    /// given and the catalog has been replaced in the meantime the merge is dropped since it targets
    /// records that no longer exist
    pub fn merge_ownership (&mut self, entries: &[OwnershipEntry], expected_generation: Option<u64>)->Result<MergeReport> {
        let current = self.generation();
        if let Some(expected) = expected_generation {
            if expected != current {
                return Err( OrbTrackError::StaleMerge{ expected, current })
            }
        }

        let mut by_name: HashMap<&str,&str> = HashMap::with_capacity( entries.len());
        for e in entries {
            if let Some(owner) = &e.owner {
                by_name.entry( e.object_name.as_str()).or_insert( owner.as_str()); // first entry wins
            }
        }

        let mut changed_ids: Vec<u32> = Vec::new();
        let mut n_matched = 0;
        let catalog = Arc::make_mut( &mut self.current);

        for rec in catalog.records.iter_mut() {
            if let Some(owner) = by_name.get( rec.name()) {
                n_matched += 1;
                if rec.owner() != Some(*owner) {
                    *rec = rec.with_owner( Some(owner.to_string()));
                    changed_ids.push( rec.id());
                }
            }
        }

        let n_unmatched = catalog.records.len() - n_matched;
        info!("merged ownership into generation {}: {} matched, {} without owner", current, n_matched, n_unmatched);

        Ok( MergeReport { generation: current, n_matched, n_unmatched, changed_ids } )
    }

    /// in-place update of all records (copy-on-write if there are outstanding snapshots)
    pub fn update_records<F> (&mut self, mut f: F) where F: FnMut(&mut OrbitalRecord) {
        let catalog = Arc::make_mut( &mut self.current);
        for rec in catalog.records.iter_mut() {
            f( rec)
        }
    }
}
