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

//! catalog feeds. The engine only sees parsed records, where the text comes from is up to the
//! `FeedSource` implementation

use std::path::PathBuf;
use async_trait::async_trait;
use tracing::{info, warn};
use crate::{
    catalog::{parse_ownership_json, IngestReport, MergeReport},
    elements::parse_tle_text,
    errors::{feed_error, OrbTrackError, Result},
    propagator::Propagator,
    scheduler::EngineHandle
};

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// TLE text in 2-line or 3-line format
    async fn fetch_elements (&self)->Result<String>;

    /// SATCAT JSON array. Returning Ok(None) means there is no ownership feed
    async fn fetch_ownership (&self)->Result<Option<String>>;
}

/// feed that reads local files (e.g. previously downloaded CelesTrak data)
#[derive(Debug,Clone)]
pub struct FileFeedSource {
    elements_path: PathBuf,
    ownership_path: Option<PathBuf>,
}

impl FileFeedSource {
    pub fn new (elements_path: impl Into<PathBuf>, ownership_path: Option<PathBuf>)->Self {
        FileFeedSource { elements_path: elements_path.into(), ownership_path }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch_elements (&self)->Result<String> {
        tokio::fs::read_to_string( &self.elements_path).await
            .map_err(|e| feed_error!("cannot read {:?}: {}", self.elements_path, e))
    }

    async fn fetch_ownership (&self)->Result<Option<String>> {
        match &self.ownership_path {
            Some(path) => {
                let text = tokio::fs::read_to_string( path).await.map_err(|e| feed_error!("cannot read {:?}: {}", path, e))?;
                Ok( Some(text) )
            }
            None => Ok(None)
        }
    }
}

#[derive(Debug,Clone,Default)]
pub struct FeedCycleReport {
    pub ingest: IngestReport,
    pub merge: Option<MergeReport>, // None if there was no ownership data or the merge was stale
}

/// fetch elements and then ownership data. An unavailable or empty element feed leaves the catalog
/// untouched. Ownership problems do not fail the cycle - records just stay without owner
pub async fn run_feed_cycle<P: Propagator + 'static> (handle: &EngineHandle<P>, source: &dyn FeedSource)->Result<FeedCycleReport> {
    let text = source.fetch_elements().await.inspect_err(|e| warn!("element feed skipped: {}", e))?;
    let records = parse_tle_text( &text);
    if records.is_empty() {
        warn!("element feed has no element sets, keeping current catalog");
        return Err( feed_error!("no element sets in feed"))
    }

    let ingest = handle.ingest( records).await?;
    let generation = ingest.generation;
    let mut report = FeedCycleReport { ingest, merge: None };

    let entries = match source.fetch_ownership().await {
        Ok(Some(text)) => match parse_ownership_json( &text) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("ignoring malformed ownership feed: {}", e);
                return Ok(report)
            }
        }
        Ok(None) => return Ok(report),
        Err(e) => {
            warn!("ownership feed skipped: {}", e);
            return Ok(report)
        }
    };

    let n_entries = entries.len();
    match handle.merge_ownership( entries, Some(generation)).await {
        Ok(merge) => {
            info!("merged {} ownership entries, {} records matched", n_entries, merge.n_matched);
            report.merge = Some(merge);
        }
        Err(OrbTrackError::StaleMerge{expected,current}) => {
            warn!("dropping ownership data for generation {} (current {})", expected, current);
        }
        Err(e) => return Err(e)
    }

    Ok(report)
}
