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

//! the task that owns an `OrbitEngine` and serializes timer ticks, user actions and feed completions.
//!
//! There is exactly one tick in flight at any time. If a tick takes longer than the tick interval the
//! missed ticks are skipped, not queued up

use std::{fmt, sync::Arc, time::Duration};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::{sync::{mpsc, oneshot}, task::JoinHandle, time::{self, MissedTickBehavior}};
use tracing::{debug, info, warn};
use crate::{
    catalog::{Catalog, IngestReport, MergeReport, OwnershipEntry},
    config::OrbTrackConfig,
    elements::RawElementRecord,
    engine::{EngineChange, OrbitEngine, TickUpdate},
    errors::{op_failed, OrbTrackError, Result},
    frame::ReferenceFrame,
    propagator::Propagator,
    utc_now
};

/// what the service publishes to the presentation layer
#[derive(Debug,Clone)]
pub enum EngineUpdate {
    Tick(TickUpdate),
    Change(EngineChange),
}

type ExecFn<P> = Box<dyn FnOnce(&mut OrbitEngine<P>) + Send + 'static>;
type ChangeFn<P> = Box<dyn FnOnce(&mut OrbitEngine<P>)->Result<EngineChange> + Send + 'static>;

pub enum EngineCommand<P: Propagator> {
    /// side effect executed from within the service task
    Exec(ExecFn<P>),
    /// engine mutation whose (non-empty) change gets published before it is returned to the sender
    Change(ChangeFn<P>, oneshot::Sender<Result<EngineChange>>),
    /// None resumes real-time ticks. The reply is the (clamped) time that was applied
    SetTimeOverride(Option<DateTime<Utc>>, oneshot::Sender<Option<DateTime<Utc>>>),
    Terminate,
}

impl<P: Propagator> fmt::Debug for EngineCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Exec(_) => write!(f, "Exec(dyn FnOnce)"),
            EngineCommand::Change(..) => write!(f, "Change(dyn FnOnce)"),
            EngineCommand::SetTimeOverride(t,_) => write!(f, "SetTimeOverride({:?})", t),
            EngineCommand::Terminate => write!(f, "Terminate"),
        }
    }
}

/// the date slider. Overrides are clamped to [start..start+range]
#[derive(Debug,Clone,Copy)]
pub struct TimeControl {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    override_time: Option<DateTime<Utc>>,
}

impl TimeControl {
    pub fn new (start: DateTime<Utc>, range: Duration)->Self {
        let end = start + TimeDelta::from_std(range).unwrap_or( TimeDelta::days(1));
        TimeControl { start, end, override_time: None }
    }

    pub fn start (&self)->DateTime<Utc> { self.start }
    pub fn end (&self)->DateTime<Utc> { self.end }
    pub fn override_time (&self)->Option<DateTime<Utc>> { self.override_time }
    pub fn is_real_time (&self)->bool { self.override_time.is_none() }

    pub fn clamp (&self, t: DateTime<Utc>)->DateTime<Utc> {
        t.clamp( self.start, self.end)
    }

    fn set_override (&mut self, t: Option<DateTime<Utc>>)->Option<DateTime<Utc>> {
        self.override_time = t.map(|t| self.clamp(t));
        self.override_time
    }
}

/* #region handle ************************************************************************************/

/// cloneable front end of a running `EngineService`. All methods fail with `ServiceClosed` once
/// the service has been shut down
pub struct EngineHandle<P: Propagator> {
    tx: mpsc::Sender<EngineCommand<P>>,
}

impl<P: Propagator> Clone for EngineHandle<P> {
    fn clone (&self)->Self { EngineHandle { tx: self.tx.clone() } }
}

impl<P: Propagator + 'static> EngineHandle<P> {

    async fn send (&self, cmd: EngineCommand<P>)->Result<()> {
        self.tx.send(cmd).await.map_err(|_| OrbTrackError::ServiceClosed)
    }

    /// run a read-only closure on the engine and return its result
    pub async fn query<R,F> (&self, f: F)->Result<R> where F: FnOnce(&OrbitEngine<P>)->R + Send + 'static, R: Send + 'static {
        let (tx,rx) = oneshot::channel();
        self.send( EngineCommand::Exec( Box::new( move |engine| { let _ = tx.send( f(engine)); }))).await?;
        rx.await.map_err(|_| OrbTrackError::ServiceClosed)
    }

    pub async fn change<F> (&self, f: F)->Result<EngineChange> where F: FnOnce(&mut OrbitEngine<P>)->Result<EngineChange> + Send + 'static {
        let (tx,rx) = oneshot::channel();
        self.send( EngineCommand::Change( Box::new(f), tx)).await?;
        rx.await.map_err(|_| OrbTrackError::ServiceClosed)?
    }

    //--- feed completions

    pub async fn ingest (&self, records: Vec<RawElementRecord>)->Result<IngestReport> {
        let (tx,rx) = oneshot::channel();
        self.change( move |engine| {
            let (report, change) = engine.ingest( &records);
            let _ = tx.send( report);
            Ok(change)
        }).await?;
        rx.await.map_err(|_| OrbTrackError::ServiceClosed)
    }

    pub async fn merge_ownership (&self, entries: Vec<OwnershipEntry>, expected_generation: Option<u64>)->Result<MergeReport> {
        let (tx,rx) = oneshot::channel();
        self.change( move |engine| {
            let (report, change) = engine.merge_ownership( &entries, expected_generation)?;
            let _ = tx.send( report);
            Ok(change)
        }).await?;
        rx.await.map_err(|_| OrbTrackError::ServiceClosed)
    }

    //--- user actions

    pub async fn select (&self, id: u32)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.select(id))).await
    }

    pub async fn deselect (&self, id: u32)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.deselect(id))).await
    }

    pub async fn toggle (&self, id: u32)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.toggle(id))).await
    }

    pub async fn clear_all (&self)->Result<EngineChange> {
        self.change( |engine| Ok( engine.clear_all())).await
    }

    pub async fn set_query (&self, query: Option<String>)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.set_query( query.as_deref()))).await
    }

    pub async fn set_owner_filter (&self, owners: Vec<String>)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.set_owner_filter( owners))).await
    }

    pub async fn set_frame (&self, frame: ReferenceFrame)->Result<EngineChange> {
        self.change( move |engine| Ok( engine.set_frame( frame))).await
    }

    /// Some(t) suspends real-time ticks and immediately updates positions for the clamped time
    pub async fn set_time_override (&self, t: Option<DateTime<Utc>>)->Result<Option<DateTime<Utc>>> {
        let (tx,rx) = oneshot::channel();
        self.send( EngineCommand::SetTimeOverride( t, tx)).await?;
        rx.await.map_err(|_| OrbTrackError::ServiceClosed)
    }

    //--- queries

    pub async fn snapshot (&self)->Result<Arc<Catalog>> {
        self.query( |engine| engine.snapshot()).await
    }

    pub async fn selected (&self)->Result<Vec<u32>> {
        self.query( |engine| engine.selection().selected().iter().copied().collect()).await
    }

    pub async fn current_time (&self)->Result<DateTime<Utc>> {
        self.query( |engine| engine.current_time()).await
    }

    pub async fn frame (&self)->Result<ReferenceFrame> {
        self.query( |engine| engine.frame()).await
    }
}

/* #endregion handle */

/* #region service ***********************************************************************************/

pub struct EngineService<P: Propagator> {
    handle: EngineHandle<P>,
    task: JoinHandle<OrbitEngine<P>>,
}

impl<P: Propagator + 'static> EngineService<P> {

    /// start the service task. The date slider range starts at the current time of the engine.
    /// Updates are published to `updates` (if any) without blocking the engine - if the receiver
    /// falls behind updates are dropped
    pub fn spawn (engine: OrbitEngine<P>, config: &OrbTrackConfig, updates: Option<mpsc::Sender<EngineUpdate>>)->Self {
        let (tx,rx) = mpsc::channel( config.update_queue_len.max(1));
        let time_control = TimeControl::new( engine.current_time(), config.slider_range);
        let task = tokio::spawn( run_service( engine, rx, updates, config.tick_interval, time_control));

        EngineService { handle: EngineHandle { tx }, task }
    }

    pub fn handle (&self)->EngineHandle<P> {
        self.handle.clone()
    }

    /// stop the timer, process pending commands and hand back the engine
    pub async fn shutdown (self)->Result<OrbitEngine<P>> {
        let _ = self.handle.tx.send( EngineCommand::Terminate).await;
        self.task.await.map_err(|e| op_failed!("engine service task failed: {}", e))
    }
}

fn publish (updates: &Option<mpsc::Sender<EngineUpdate>>, update: EngineUpdate) {
    if let Some(tx) = updates {
        if let Err(e) = tx.try_send( update) {
            match e {
                mpsc::error::TrySendError::Full(_) => warn!("update queue full, dropping update"),
                mpsc::error::TrySendError::Closed(_) => debug!("update receiver closed"),
            }
        }
    }
}

async fn run_service<P: Propagator + 'static> (
    mut engine: OrbitEngine<P>,
    mut rx: mpsc::Receiver<EngineCommand<P>>,
    updates: Option<mpsc::Sender<EngineUpdate>>,
    tick_interval: Duration,
    mut time_control: TimeControl
)->OrbitEngine<P> {
    let mut interval = time::interval( tick_interval);
    interval.set_missed_tick_behavior( MissedTickBehavior::Skip);
    info!("engine service started with tick interval {:?}", tick_interval);

    loop {
        tokio::select! {
            biased;

            cmd = rx.recv() => {
                match cmd {
                    Some(EngineCommand::Exec(f)) => f( &mut engine),
                    Some(EngineCommand::Change(f, reply)) => {
                        let res = f( &mut engine);
                        if let Ok(change) = &res {
                            if !change.is_empty() { publish( &updates, EngineUpdate::Change( change.clone())) }
                            if let Some(update) = &change.positions { publish( &updates, EngineUpdate::Tick( update.clone())) }
                        }
                        let _ = reply.send( res);
                    }
                    Some(EngineCommand::SetTimeOverride(t, reply)) => {
                        match time_control.set_override(t) {
                            Some(t) => {
                                debug!("time override {}", t);
                                let update = engine.update_all_positions(t);
                                publish( &updates, EngineUpdate::Tick(update));
                            }
                            None => {
                                debug!("resuming real-time ticks");
                                interval.reset_immediately();
                            }
                        }
                        let _ = reply.send( time_control.override_time());
                    }
                    Some(EngineCommand::Terminate) | None => break
                }
            }

            _ = interval.tick(), if time_control.is_real_time() => {
                let update = engine.update_all_positions( utc_now());
                if update.n_diverged > 0 {
                    debug!("{} records diverged at {}", update.n_diverged, update.time);
                }
                publish( &updates, EngineUpdate::Tick(update));
            }
        }
    }

    info!("engine service terminated");
    engine
}

/* #endregion service */
