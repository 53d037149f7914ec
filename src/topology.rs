//! Valve topology: zone ids to GPIO pins, with optional master relays.
//!
//! Single source of truth for which pin each zone drives.  Resolved once
//! at startup from the raw [`ValveSection`]s and immutable afterwards.
//!
//! ```text
//!   [front] pin 1 ──┐
//!   [back]  pin 2 ──┼── master [main] pin 7
//!   [herbs] pin 3     (no master)
//! ```
//!
//! Resolution runs in two passes:
//!
//! 1. every section referenced as a `master` becomes a master relay;
//! 2. every remaining section becomes a zone, linked to its master.
//!
//! Masters are never zones themselves and never have a master of their
//! own, so the ownership graph is at most one level deep.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ValveSection;
use crate::error::TopologyError;

/// Shared main-line relay that opens before and closes after its zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRelay {
    pub name: String,
    pub pin: u8,
}

/// One enqueueable irrigation zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valve {
    /// Upper-cased zone id.
    pub zone: String,
    pub description: String,
    pub pin: u8,
    pub master: Option<MasterRelay>,
}

impl Valve {
    pub fn master_pin(&self) -> Option<u8> {
        self.master.as_ref().map(|m| m.pin)
    }
}

/// Case-normalize a zone id the way the topology stores it.
pub fn normalize_zone(zone: &str) -> String {
    zone.trim().to_ascii_uppercase()
}

/// Immutable zone map.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    zones: BTreeMap<String, Valve>,
}

impl Topology {
    /// Resolve raw config sections into a topology.
    pub fn resolve(sections: &BTreeMap<String, ValveSection>) -> Result<Self, TopologyError> {
        if sections.is_empty() {
            return Err(TopologyError::Empty);
        }

        // Pass 1: collect master relays.
        let mut masters: BTreeMap<&str, MasterRelay> = BTreeMap::new();
        for (key, section) in sections {
            let Some(master_key) = section.master.as_deref() else {
                continue;
            };
            if master_key == key {
                return Err(TopologyError::SelfMaster(key.clone()));
            }
            let Some(master) = sections.get(master_key) else {
                return Err(TopologyError::UnknownMaster {
                    section: key.clone(),
                    master: master_key.to_string(),
                });
            };
            if let Some(parent) = &master.master {
                return Err(TopologyError::NestedMaster {
                    master: master_key.to_string(),
                    parent: parent.clone(),
                });
            }
            masters.entry(master_key).or_insert_with(|| MasterRelay {
                name: normalize_zone(&master.name),
                pin: master.pin,
            });
        }

        // Pass 2: everything that is not a master is a zone.
        let master_pins: BTreeSet<u8> = masters.values().map(|m| m.pin).collect();
        let mut zones = BTreeMap::new();
        for (key, section) in sections {
            if masters.contains_key(key.as_str()) {
                continue;
            }
            let zone = normalize_zone(&section.name);
            if master_pins.contains(&section.pin) {
                return Err(TopologyError::SharedPin {
                    zone,
                    pin: section.pin,
                });
            }
            let master = section
                .master
                .as_deref()
                .and_then(|m| masters.get(m))
                .cloned();
            let valve = Valve {
                zone: zone.clone(),
                description: section.description.clone(),
                pin: section.pin,
                master,
            };
            if zones.insert(zone.clone(), valve).is_some() {
                return Err(TopologyError::DuplicateZone(zone));
            }
        }

        Ok(Self { zones })
    }

    /// Look up a zone by id (any case).
    pub fn get(&self, zone: &str) -> Option<&Valve> {
        self.zones.get(&normalize_zone(zone))
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.get(zone).is_some()
    }

    /// Zone id → description, sorted by zone id.
    pub fn stations(&self) -> BTreeMap<String, String> {
        self.zones
            .values()
            .map(|v| (v.zone.clone(), v.description.clone()))
            .collect()
    }

    /// Every pin the topology drives, zones and masters alike.
    pub fn pins(&self) -> BTreeSet<u8> {
        self.zones
            .values()
            .flat_map(|v| std::iter::once(v.pin).chain(v.master_pin()))
            .collect()
    }

    pub fn valves(&self) -> impl Iterator<Item = &Valve> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
