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

use std::path::PathBuf;
use async_trait::async_trait;
use tokio;
use odin_orbtrack::{
    config::{load_config, OrbTrackConfig},
    elements::parse_tle_text,
    engine::OrbitEngine,
    feed::{run_feed_cycle, FeedSource, FileFeedSource},
    frame::ReferenceFrame,
    propagator::Sgp4Propagator,
    scheduler::{EngineHandle, EngineService},
    selection::OwnerFilterPolicy,
    OrbTrackError, Result
};

const STATIONS: &str = include_str!("data/stations.tle");
const SATCAT: &str = include_str!("data/satcat.json");

fn data_path (filename: &str)->PathBuf {
    PathBuf::from( env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(filename)
}

/// feed that re-ingests the catalog while the ownership data is being fetched
struct RacingFeedSource {
    handle: EngineHandle<Sgp4Propagator>,
}

#[async_trait]
impl FeedSource for RacingFeedSource {
    async fn fetch_elements (&self)->Result<String> {
        Ok( STATIONS.to_string() )
    }

    async fn fetch_ownership (&self)->Result<Option<String>> {
        self.handle.ingest( parse_tle_text( STATIONS)).await?;
        Ok( Some( SATCAT.to_string()) )
    }
}

fn spawn_service ()->EngineService<Sgp4Propagator> {
    let config = OrbTrackConfig::default();
    EngineService::spawn( OrbitEngine::new( Sgp4Propagator, &config), &config, None)
}

#[tokio::test]
async fn test_file_feed_cycle() {
    let service = spawn_service();
    let handle = service.handle();
    let source = FileFeedSource::new( data_path("stations.tle"), Some( data_path("satcat.json")));

    let report = run_feed_cycle( &handle, &source).await.unwrap();
    println!("{report:?}");
    assert_eq!( report.ingest.n_accepted, 4);
    assert_eq!( report.ingest.rejected.len(), 1);
    assert_eq!( report.merge.as_ref().map(|m| m.n_matched), Some(4));

    let catalog = handle.snapshot().await.unwrap();
    assert_eq!( catalog.get(25544).and_then(|r| r.owner()), Some("ISS"));
    assert_eq!( catalog.owners(), vec!["ISS".to_string(), "US".to_string()]);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_ownership_feed() {
    let service = spawn_service();
    let handle = service.handle();

    // no ownership feed at all
    let source = FileFeedSource::new( data_path("stations.tle"), None);
    let report = run_feed_cycle( &handle, &source).await.unwrap();
    assert!( report.merge.is_none());

    // unreadable ownership feed does not fail the cycle
    let source = FileFeedSource::new( data_path("stations.tle"), Some( data_path("no_such_file.json")));
    let report = run_feed_cycle( &handle, &source).await.unwrap();
    assert_eq!( report.ingest.generation, 2);
    assert!( report.merge.is_none());

    let catalog = handle.snapshot().await.unwrap();
    assert!( catalog.iter().all( |r| r.owner().is_none()));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unavailable_element_feed() {
    let service = spawn_service();
    let handle = service.handle();

    let source = FileFeedSource::new( data_path("stations.tle"), None);
    run_feed_cycle( &handle, &source).await.unwrap();

    let source = FileFeedSource::new( data_path("no_such_file.tle"), None);
    let res = run_feed_cycle( &handle, &source).await;
    println!("{:?}", res.as_ref().err());
    assert!( matches!( res, Err(OrbTrackError::FeedUnavailable(_))));

    // feed without element sets
    let source = FileFeedSource::new( data_path("satcat.json"), None);
    let res = run_feed_cycle( &handle, &source).await;
    assert!( matches!( res, Err(OrbTrackError::FeedUnavailable(_))));

    // catalog is untouched
    let catalog = handle.snapshot().await.unwrap();
    assert_eq!( catalog.generation(), 1);
    assert_eq!( catalog.len(), 4);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_ownership_is_dropped() {
    let service = spawn_service();
    let handle = service.handle();
    let source = RacingFeedSource { handle: handle.clone() };

    let report = run_feed_cycle( &handle, &source).await.unwrap();
    println!("{report:?}");
    assert_eq!( report.ingest.generation, 1);
    assert!( report.merge.is_none());

    let catalog = handle.snapshot().await.unwrap();
    assert_eq!( catalog.generation(), 2);
    assert!( catalog.iter().all( |r| r.owner().is_none()));

    service.shutdown().await.unwrap();
}

#[test]
fn test_load_config() {
    let path = PathBuf::from( env!("CARGO_MANIFEST_DIR")).join("configs").join("orbtrack.ron");
    let config: OrbTrackConfig = load_config( &path).unwrap();
    println!("{config:#?}");

    assert_eq!( config.tick_interval.as_secs(), 1);
    assert_eq!( config.slider_range.as_secs(), 86400);
    assert_eq!( config.initial_frame, ReferenceFrame::Inertial);
    assert_eq!( config.owner_filter_policy, OwnerFilterPolicy::Override);
    assert_eq!( config.startup_query.as_deref(), Some("ss=25544&highlight=noaa"));

    // missing fields get defaults
    let config: OrbTrackConfig = ron::from_str("OrbTrackConfig( initial_frame: EarthFixed )").unwrap();
    assert_eq!( config.initial_frame, ReferenceFrame::EarthFixed);
    assert_eq!( config.sampling.total_minutes, 96.0);

    assert!( load_config::<OrbTrackConfig>( data_path("no_such_config.ron")).is_err());
}
