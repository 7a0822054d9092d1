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
use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use odin_orbtrack::{
    load_config, run_feed_cycle, EngineService, EngineUpdate, FileFeedSource, OrbTrackConfig, OrbitEngine,
    ReferenceFrame, Sgp4Propagator
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "track positions of a TLE catalog")]
pub struct Args {
    /// RON config file
    #[arg(short,long)]
    pub config: Option<PathBuf>,

    /// TLE file (overrides config)
    #[arg(short,long)]
    pub elements: Option<PathBuf>,

    /// SATCAT JSON file (overrides config)
    #[arg(short,long)]
    pub ownership: Option<PathBuf>,

    /// startup query such as "ss=25544&highlight=noaa" (overrides config)
    #[arg(short,long)]
    pub query: Option<String>,

    /// show positions in the earth-fixed frame
    #[arg(long)]
    pub earth_fixed: bool,

    /// number of ticks to report before exiting
    #[arg(short,long, default_value_t = 5)]
    pub n_ticks: usize,
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .init();

    let args = Args::parse();

    let mut config: OrbTrackConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => OrbTrackConfig::default()
    };
    if args.elements.is_some() { config.elements_file = args.elements.clone() }
    if args.ownership.is_some() { config.ownership_file = args.ownership.clone() }
    if args.query.is_some() { config.startup_query = args.query.clone() }
    if args.earth_fixed { config.initial_frame = ReferenceFrame::EarthFixed }

    let elements_file = config.elements_file.clone().ok_or( anyhow!("no elements file"))?;
    let source = FileFeedSource::new( elements_file, config.ownership_file.clone());

    let (tx,mut rx) = mpsc::channel( config.update_queue_len.max(1));
    let engine = OrbitEngine::new( Sgp4Propagator, &config);
    let service = EngineService::spawn( engine, &config, Some(tx));
    let handle = service.handle();

    let report = run_feed_cycle( &handle, &source).await?;
    println!("catalog generation {}: {} records ({} rejected)", report.ingest.generation, report.ingest.n_accepted, report.ingest.rejected.len());
    if let Some(merge) = &report.merge {
        println!("ownership: {} matched, {} without owner", merge.n_matched, merge.n_unmatched);
    }

    let selected = handle.selected().await?;
    let catalog = handle.snapshot().await?;
    for id in &selected {
        if let Some(rec) = catalog.get(*id) {
            println!("selected: {} {} (owner: {})", id, rec.name(), rec.owner().unwrap_or("?"));
        }
    }

    let mut n_ticks = 0;
    while n_ticks < args.n_ticks {
        match rx.recv().await {
            Some(EngineUpdate::Tick(tick)) => {
                n_ticks += 1;
                println!("--- {} ({}, {} diverged)", tick.time, tick.frame, tick.n_diverged);
                for (id,p) in tick.positions.iter().filter(|(id,_)| selected.is_empty() || selected.contains(id)) {
                    println!("  {:6}: {}", id, p);
                }
            }
            Some(EngineUpdate::Change(change)) => info!("engine change: {:?}", change),
            None => break
        }
    }

    service.shutdown().await?;
    Ok(())
}
