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

use std::{sync::{Arc, atomic::{AtomicBool, Ordering}}, time::Duration};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::{self, sync::mpsc, time::{sleep, timeout}};
use odin_orbtrack::{
    cartesian3::Cartesian3,
    config::OrbTrackConfig,
    elements::{parse_tle_text, ElementSet},
    engine::OrbitEngine,
    frame::ReferenceFrame,
    propagator::{Propagator, Sgp4Propagator},
    scheduler::{EngineService, EngineUpdate},
    OrbTrackError, Result
};

const STATIONS: &str = include_str!("data/stations.tle");
const NOAA21: u32 = 54234;

/// SGP4 that blocks for `delay` on each call while `slow` is set
struct SlowPropagator {
    delay: Duration,
    slow: Arc<AtomicBool>,
}

impl Propagator for SlowPropagator {
    fn propagate (&self, elements: &ElementSet, t: DateTime<Utc>)->Result<Cartesian3> {
        if self.slow.load( Ordering::Relaxed) {
            std::thread::sleep( self.delay);
        }
        Sgp4Propagator.propagate( elements, t)
    }
}

fn t0 ()->DateTime<Utc> {
    Utc.with_ymd_and_hms( 2025, 3, 17, 22, 0, 0).unwrap()
}

fn test_config ()->OrbTrackConfig {
    OrbTrackConfig { tick_interval: Duration::from_millis(50), ..Default::default() }
}

async fn next_tick (rx: &mut mpsc::Receiver<EngineUpdate>)->Option<odin_orbtrack::engine::TickUpdate> {
    loop {
        match timeout( Duration::from_secs(2), rx.recv()).await {
            Ok(Some(EngineUpdate::Tick(tick))) => return Some(tick),
            Ok(Some(EngineUpdate::Change(_))) => continue,
            _ => return None
        }
    }
}

#[tokio::test]
async fn test_ticks() {
    let config = test_config();
    let (tx,mut rx) = mpsc::channel(64);
    let service = EngineService::spawn( OrbitEngine::new( Sgp4Propagator, &config), &config, Some(tx));
    let handle = service.handle();

    let report = handle.ingest( parse_tle_text( STATIONS)).await.unwrap();
    assert_eq!( report.n_accepted, 4);

    let mut last: Option<DateTime<Utc>> = None;
    for _ in 0..3 {
        let tick = next_tick( &mut rx).await.expect("no tick received");
        println!("tick at {}: {} positions", tick.time, tick.positions.len());
        if let Some(t) = last { assert!( tick.time >= t) } // the ingest tick can share the time of a timer tick
        last = Some(tick.time);
    }

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_published_changes() {
    let config = test_config();
    let (tx,mut rx) = mpsc::channel(64);
    let service = EngineService::spawn( OrbitEngine::new( Sgp4Propagator, &config), &config, Some(tx));
    let handle = service.handle();
    handle.ingest( parse_tle_text( STATIONS)).await.unwrap();

    let change = handle.select( NOAA21).await.unwrap();
    assert_eq!( change.selection.added, vec![NOAA21]);
    assert_eq!( handle.selected().await.unwrap(), vec![NOAA21]);

    // the same change is pushed to the update channel
    let mut found = false;
    while let Ok(Some(update)) = timeout( Duration::from_secs(1), rx.recv()).await {
        if let EngineUpdate::Change(c) = update {
            if c == change { found = true; break }
        }
    }
    assert!( found);

    let change = handle.set_frame( ReferenceFrame::EarthFixed).await.unwrap();
    assert_eq!( change.frame, Some(ReferenceFrame::EarthFixed));
    assert_eq!( handle.frame().await.unwrap(), ReferenceFrame::EarthFixed);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!( snapshot.len(), 4);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_time_override() {
    let config = test_config();
    let mut engine = OrbitEngine::new( Sgp4Propagator, &config);
    engine.update_all_positions( t0()); // slider starts here
    let (tx,mut rx) = mpsc::channel(64);
    let service = EngineService::spawn( engine, &config, Some(tx));
    let handle = service.handle();
    handle.ingest( parse_tle_text( STATIONS)).await.unwrap();

    let t = t0() + TimeDelta::hours(2);
    let applied = handle.set_time_override( Some(t)).await.unwrap();
    assert_eq!( applied, Some(t));
    assert_eq!( handle.current_time().await.unwrap(), t);

    // override is applied immediately
    let mut tick = next_tick( &mut rx).await.unwrap();
    while tick.time != t { tick = next_tick( &mut rx).await.unwrap() }
    assert!( tick.positions.iter().any( |(id,_)| *id == NOAA21));

    // no real-time ticks while the override is active
    sleep( Duration::from_millis(250)).await;
    assert_eq!( handle.current_time().await.unwrap(), t);

    // overrides are clamped to the slider range
    let applied = handle.set_time_override( Some( t0() + TimeDelta::hours(48))).await.unwrap();
    assert_eq!( applied, Some( t0() + TimeDelta::hours(24)));
    let applied = handle.set_time_override( Some( t0() - TimeDelta::hours(1))).await.unwrap();
    assert_eq!( applied, Some( t0()));

    // back to real time
    let applied = handle.set_time_override( None).await.unwrap();
    assert_eq!( applied, None);
    sleep( Duration::from_millis(200)).await;
    let now = handle.current_time().await.unwrap();
    println!("resumed at {now}");
    assert!( now > t0() + TimeDelta::hours(24));

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_positions_pushed_while_time_override() {
    let config = test_config();
    let mut engine = OrbitEngine::new( Sgp4Propagator, &config);
    engine.update_all_positions( t0());
    let (tx,mut rx) = mpsc::channel(64);
    let service = EngineService::spawn( engine, &config, Some(tx));
    let handle = service.handle();
    handle.ingest( parse_tle_text( STATIONS)).await.unwrap();

    let t = t0() + TimeDelta::hours(1);
    handle.set_time_override( Some(t)).await.unwrap();
    sleep( Duration::from_millis(100)).await;
    while rx.try_recv().is_ok() {} // drain

    // no timer ticks while the override is active, positions of the new frame still have to be pushed
    let change = handle.set_frame( ReferenceFrame::EarthFixed).await.unwrap();
    let positions = change.positions.clone().expect("frame switch without positions");
    assert_eq!( positions.frame, ReferenceFrame::EarthFixed);
    assert_eq!( positions.time, t);

    let tick = next_tick( &mut rx).await.expect("no position update after frame switch");
    println!("pushed {} {} positions at {}", tick.positions.len(), tick.frame, tick.time);
    assert_eq!( tick.frame, ReferenceFrame::EarthFixed);
    assert_eq!( tick.time, t);
    assert_eq!( tick, positions);

    // same for a re-ingest
    handle.ingest( parse_tle_text( STATIONS)).await.unwrap();
    let tick = next_tick( &mut rx).await.expect("no position update after re-ingest");
    assert_eq!( tick.frame, ReferenceFrame::EarthFixed);
    assert_eq!( tick.time, t);

    // selection changes don't recompute positions
    let change = handle.select( NOAA21).await.unwrap();
    assert!( change.positions.is_none());

    service.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_ticks_are_skipped() {
    let config = test_config(); // 50ms ticks
    let delay = Duration::from_millis(25);
    let slow = Arc::new( AtomicBool::new(false));
    let propagator = SlowPropagator { delay, slow: slow.clone() };

    let (tx,mut rx) = mpsc::channel(256);
    let service = EngineService::spawn( OrbitEngine::new( propagator, &config), &config, Some(tx));
    let handle = service.handle();
    let report = handle.ingest( parse_tle_text( STATIONS)).await.unwrap();

    // each update now takes at least 4 x 25ms, twice the tick interval
    let update_duration = TimeDelta::from_std( delay * report.n_accepted as u32).unwrap();
    slow.store( true, Ordering::Relaxed);
    while rx.try_recv().is_ok() {}
    next_tick( &mut rx).await.unwrap(); // might have started before we switched

    let mut times: Vec<DateTime<Utc>> = Vec::new();
    for _ in 0..5 {
        times.push( next_tick( &mut rx).await.expect("no tick received").time);
    }
    for w in times.windows(2) {
        let dt = w[1] - w[0];
        println!("slow tick after {} ms", dt.num_milliseconds());
        assert!( dt >= update_duration);
    }

    // missed ticks are not delivered in a burst once updates are fast again
    slow.store( false, Ordering::Relaxed);
    next_tick( &mut rx).await.unwrap();
    next_tick( &mut rx).await.unwrap();

    let mut times: Vec<DateTime<Utc>> = Vec::new();
    for _ in 0..5 {
        times.push( next_tick( &mut rx).await.expect("no tick received").time);
    }
    for w in times.windows(2) {
        let dt = w[1] - w[0];
        println!("fast tick after {} ms", dt.num_milliseconds());
        assert!( dt >= TimeDelta::milliseconds(25));
    }

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown() {
    let config = test_config();
    let service = EngineService::spawn( OrbitEngine::new( Sgp4Propagator, &config), &config, None);
    let handle = service.handle();
    handle.ingest( parse_tle_text( STATIONS)).await.unwrap();
    handle.select( NOAA21).await.unwrap();

    let engine = service.shutdown().await.unwrap();
    assert_eq!( engine.catalog().len(), 4);
    assert!( engine.selection().is_selected( NOAA21));

    let res = handle.select( NOAA21).await;
    assert!( matches!( res, Err(OrbTrackError::ServiceClosed)));
}
