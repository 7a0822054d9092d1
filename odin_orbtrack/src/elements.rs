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

//! orbital records and the two-line element sets they are based on

use std::{fmt, sync::{Arc,LazyLock}};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;
use serde::{Serialize,Deserialize};
use crate::{cartesian3::Cartesian3, frame::ReferenceFrame, errors::{elements_error, OrbTrackError, Result}};

pub const TLE_LINE_LEN: usize = 69;

/// regex to classify TLE lines and extract the NORAD catalog number. Older element sets use leading
/// blanks instead of zeros for the catalog number
pub static TLE_LINE1_RE: LazyLock<Regex> = LazyLock::new(||
    Regex::new( r"^1 ([ \d]{4}\d)[A-Z ] ").unwrap()
);
pub static TLE_LINE2_RE: LazyLock<Regex> = LazyLock::new(||
    Regex::new( r"^2 ([ \d]{4}\d) ").unwrap()
);

/// raw feed input for a single object before it gets parsed
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct RawElementRecord {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

impl RawElementRecord {
    pub fn new (name: Option<&str>, line1: &str, line2: &str)->Self {
        RawElementRecord { name: name.map(|s| s.trim().to_string()), line1: line1.to_string(), line2: line2.to_string() }
    }
}

/// the parsed, immutable two-line element set of one object. Re-ingestion creates a new ElementSet,
/// existing ones are never modified
pub struct ElementSet {
    sat_id: u32,
    line1: String,
    line2: String,
    epoch: DateTime<Utc>,
    mean_motion: f64, // revs per day
    constants: sgp4::Constants,
}

impl ElementSet {

    /// validate line structure and hand the lines to SGP4 initialization. Any error here is
    /// reported as an ElementParse error
    pub fn parse (line1: &str, line2: &str)->Result<Self> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        if !line1.is_ascii() || !line2.is_ascii() { return Err( elements_error!("non-ASCII characters in element set")) }
        if line1.len() != TLE_LINE_LEN { return Err( elements_error!("line 1 has wrong length {}", line1.len())) }
        if line2.len() != TLE_LINE_LEN { return Err( elements_error!("line 2 has wrong length {}", line2.len())) }

        let id1 = TLE_LINE1_RE.captures(line1)
            .ok_or( elements_error!("line 1 does not start with '1 ' and a catalog number: {line1}"))?[1].trim().parse::<u32>()
            .map_err(|e| elements_error!("invalid catalog number in line 1: {e}"))?;
        let id2 = TLE_LINE2_RE.captures(line2)
            .ok_or( elements_error!("line 2 does not start with '2 ' and a catalog number: {line2}"))?[1].trim().parse::<u32>()
            .map_err(|e| elements_error!("invalid catalog number in line 2: {e}"))?;
        if id1 != id2 { return Err( elements_error!("catalog numbers of line 1 and 2 do not match: {id1} != {id2}")) }

        check_checksum( line1)?;
        check_checksum( line2)?;

        let epoch = parse_epoch( &line1[18..32])?;
        let mean_motion: f64 = line2[52..63].trim().parse().map_err(|e| elements_error!("invalid mean motion: {e}"))?;

        let elements = sgp4::Elements::from_tle( None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| elements_error!("SGP4 element import failed for {id1}: {e}"))?;
        let constants = sgp4::Constants::from_elements( &elements)
            .map_err(|e| elements_error!("SGP4 initialization failed for {id1}: {e}"))?;

        Ok( ElementSet { sat_id: id1, line1: line1.to_string(), line2: line2.to_string(), epoch, mean_motion, constants } )
    }

    pub fn sat_id (&self)->u32 { self.sat_id }
    pub fn line1 (&self)->&str { &self.line1 }
    pub fn line2 (&self)->&str { &self.line2 }
    pub fn epoch (&self)->DateTime<Utc> { self.epoch }
    pub fn mean_motion (&self)->f64 { self.mean_motion }

    /// nominal orbit period in minutes derived from the mean motion
    pub fn period_minutes (&self)->f64 {
        if self.mean_motion > 0.0 { 1440.0 / self.mean_motion } else { f64::INFINITY }
    }

    pub fn minutes_since_epoch (&self, t: DateTime<Utc>)->f64 {
        (t - self.epoch).num_microseconds().map( |us| us as f64 / 60_000_000.0)
            .unwrap_or_else( || (t - self.epoch).num_seconds() as f64 / 60.0)
    }

    pub(crate) fn constants (&self)->&sgp4::Constants {
        &self.constants
    }
}

impl fmt::Debug for ElementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementSet( sat_id:{}, epoch:{})", self.sat_id, self.epoch)
    }
}

impl PartialEq for ElementSet {
    fn eq (&self, other: &Self)->bool {
        self.line1 == other.line1 && self.line2 == other.line2
    }
}

/// last computed renderable position of a record
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct TimedPosition {
    pub time: DateTime<Utc>,
    pub frame: ReferenceFrame,
    pub position: Cartesian3,
}

/// one tracked object. Element sets are shared and immutable, ownership is added later through
/// `with_owner` and the last position is the only per-tick state
#[derive(Debug,Clone)]
pub struct OrbitalRecord {
    id: u32,
    name: String,
    elements: Arc<ElementSet>,
    owner: Option<String>,
    last_position: Option<TimedPosition>,
}

impl OrbitalRecord {
    pub fn new (name: impl ToString, elements: ElementSet)->Self {
        OrbitalRecord { id: elements.sat_id, name: name.to_string(), elements: Arc::new(elements), owner: None, last_position: None }
    }

    pub fn from_raw (raw: &RawElementRecord)->Result<Self> {
        let elements = ElementSet::parse( &raw.line1, &raw.line2)?;
        let name = match &raw.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => elements.sat_id.to_string()
        };
        Ok( OrbitalRecord::new( name, elements) )
    }

    /// new record value with the given owner, everything else is shared or copied
    pub fn with_owner (&self, owner: Option<String>)->Self {
        OrbitalRecord { owner, ..self.clone() }
    }

    pub fn id (&self)->u32 { self.id }
    pub fn name (&self)->&str { &self.name }
    pub fn elements (&self)->&Arc<ElementSet> { &self.elements }
    pub fn owner (&self)->Option<&str> { self.owner.as_deref() }
    pub fn last_position (&self)->Option<&TimedPosition> { self.last_position.as_ref() }

    pub fn has_owner_in<'a> (&self, mut owners: impl Iterator<Item=&'a String>)->bool {
        match &self.owner {
            Some(owner) => owners.any( |o| o == owner),
            None => false
        }
    }

    pub(crate) fn set_last_position (&mut self, pos: TimedPosition) {
        self.last_position = Some(pos);
    }
}

/* #region TLE text parsing *****************************************************************************/

/// split a TLE text feed (2-line or 3-line format, possibly mixed) into raw records.
/// Lines that can't be paired are skipped - they surface as missing objects, not as errors
pub fn parse_tle_text (text: &str)->Vec<RawElementRecord> {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end()).filter(|l| !l.is_empty()).collect();
    let mut records: Vec<RawElementRecord> = Vec::with_capacity( lines.len() / 3 + 1);
    let mut name: Option<&str> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("1 ") && i+1 < lines.len() && lines[i+1].starts_with("2 ") {
            records.push( RawElementRecord::new( name.take(), line, lines[i+1]));
            i += 2;
        } else {
            if line.starts_with("1 ") || line.starts_with("2 ") {
                tracing::debug!("skipping unpaired TLE line: {line}");
                name = None;
            } else {
                name = Some( line.strip_prefix("0 ").unwrap_or(line)); // celestrak 3le format prefixes names with "0 "
            }
            i += 1;
        }
    }

    records
}

/// NORAD modulo-10 checksum over the first 68 columns (digits count by value, '-' counts as 1)
pub fn tle_checksum (line: &str)->u32 {
    line.bytes().take(TLE_LINE_LEN-1).fold( 0, |acc,b| {
        match b {
            b'0'..=b'9' => acc + (b - b'0') as u32,
            b'-' => acc + 1,
            _ => acc
        }
    }) % 10
}

fn check_checksum (line: &str)->Result<()> {
    let expected = line.as_bytes()[TLE_LINE_LEN-1];
    if !expected.is_ascii_digit() {
        return Err( elements_error!("non-numeric checksum in '{line}'"))
    }
    let computed = tle_checksum(line);
    if computed != (expected - b'0') as u32 {
        Err( elements_error!("checksum mismatch (computed {computed}) in '{line}'"))
    } else {
        Ok(())
    }
}

/// parse the "YYDDD.DDDDDDDD" epoch field (two digit years 57-99 are 19xx)
fn parse_epoch (s: &str)->Result<DateTime<Utc>> {
    let s = s.trim();
    if s.len() < 5 { return Err( elements_error!("invalid epoch field '{s}'")) }

    let yy: i32 = s[0..2].parse().map_err(|e| elements_error!("invalid epoch year '{s}': {e}"))?;
    let day: f64 = s[2..].parse().map_err(|e| elements_error!("invalid epoch day '{s}': {e}"))?;
    if !(1.0..367.0).contains(&day) { return Err( elements_error!("epoch day out of range '{s}'")) }

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
    let start = Utc.with_ymd_and_hms( year, 1, 1, 0, 0, 0).single().ok_or( elements_error!("invalid epoch year {year}"))?;
    let micros = ((day - 1.0) * 86_400_000_000.0).round() as i64;

    Ok( start + TimeDelta::microseconds(micros) )
}

/* #endregion TLE text parsing */
