//! Static hull table.
//!
//! Names and categories for the ship hulls the scanner knows about, so a
//! scan never needs an API call just to label a type id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::types::{ScanError, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HullCategory {
    T1Battleship,
    BlackOps,
    Marauder,
    FactionBattleship,
    PirateBattleship,
    StrategicCruiser,
    HeavyAssaultCruiser,
    ReconShip,
    CommandShip,
}

impl HullCategory {
    pub fn class(&self) -> ShipClass {
        match self {
            HullCategory::T1Battleship
            | HullCategory::BlackOps
            | HullCategory::Marauder
            | HullCategory::FactionBattleship
            | HullCategory::PirateBattleship => ShipClass::Battleship,
            HullCategory::StrategicCruiser
            | HullCategory::HeavyAssaultCruiser
            | HullCategory::ReconShip => ShipClass::Cruiser,
            HullCategory::CommandShip => ShipClass::CommandShip,
        }
    }
}

impl fmt::Display for HullCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HullCategory::T1Battleship => "T1 Battleship",
            HullCategory::BlackOps => "Black Ops",
            HullCategory::Marauder => "Marauder",
            HullCategory::FactionBattleship => "Faction Battleship",
            HullCategory::PirateBattleship => "Pirate Battleship",
            HullCategory::StrategicCruiser => "Strategic Cruiser",
            HullCategory::HeavyAssaultCruiser => "Heavy Assault Cruiser",
            HullCategory::ReconShip => "Recon Ship",
            HullCategory::CommandShip => "Command Ship",
        };
        write!(f, "{label}")
    }
}

/// Hull groups a scan can target as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipClass {
    #[default]
    Battleship,
    Cruiser,
    CommandShip,
}

impl fmt::Display for ShipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipClass::Battleship => write!(f, "battleship"),
            ShipClass::Cruiser => write!(f, "cruiser"),
            ShipClass::CommandShip => write!(f, "command_ship"),
        }
    }
}

impl std::str::FromStr for ShipClass {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "battleship" | "battleships" => Ok(ShipClass::Battleship),
            "cruiser" | "cruisers" => Ok(ShipClass::Cruiser),
            "command_ship" | "command-ship" | "command_ships" => Ok(ShipClass::CommandShip),
            other => Err(ScanError::MalformedInput(format!("unknown ship type: {other}"))),
        }
    }
}

/// One entry in the hull table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HullInfo {
    pub id: TypeId,
    pub name: &'static str,
    pub category: HullCategory,
}

use HullCategory::*;

const HULLS: &[(TypeId, &str, HullCategory)] = &[
    // T1 battleships
    (24692, "Abaddon", T1Battleship),
    (642, "Apocalypse", T1Battleship),
    (643, "Armageddon", T1Battleship),
    (638, "Raven", T1Battleship),
    (24688, "Rokh", T1Battleship),
    (640, "Scorpion", T1Battleship),
    (645, "Dominix", T1Battleship),
    (24690, "Hyperion", T1Battleship),
    (641, "Megathron", T1Battleship),
    (24694, "Maelstrom", T1Battleship),
    (639, "Tempest", T1Battleship),
    (644, "Typhoon", T1Battleship),
    // Black ops
    (22436, "Widow", BlackOps),
    (22428, "Redeemer", BlackOps),
    (22440, "Panther", BlackOps),
    (22430, "Sin", BlackOps),
    // Marauders
    (28665, "Vargur", Marauder),
    (28710, "Golem", Marauder),
    (28659, "Paladin", Marauder),
    (28661, "Kronos", Marauder),
    // Navy / fleet issue
    (32305, "Armageddon Navy Issue", FactionBattleship),
    (17726, "Apocalypse Navy Issue", FactionBattleship),
    (47466, "Praxis", FactionBattleship),
    (17636, "Raven Navy Issue", FactionBattleship),
    (32309, "Scorpion Navy Issue", FactionBattleship),
    (32307, "Dominix Navy Issue", FactionBattleship),
    (17728, "Megathron Navy Issue", FactionBattleship),
    (32311, "Typhoon Fleet Issue", FactionBattleship),
    (17732, "Tempest Fleet Issue", FactionBattleship),
    // Pirate
    (33820, "Barghest", PirateBattleship),
    (17920, "Bhaalgorn", PirateBattleship),
    (17736, "Nightmare", PirateBattleship),
    (17918, "Rattlesnake", PirateBattleship),
    (17738, "Machariel", PirateBattleship),
    (17740, "Vindicator", PirateBattleship),
    (33472, "Nestor", PirateBattleship),
    // Command ships
    (22448, "Absolution", CommandShip),
    (22474, "Damnation", CommandShip),
    (22470, "Nighthawk", CommandShip),
    (22446, "Vulture", CommandShip),
    (22466, "Astarte", CommandShip),
    (22442, "Eos", CommandShip),
    (22468, "Claymore", CommandShip),
    (22444, "Sleipnir", CommandShip),
    // Strategic cruisers
    (29986, "Legion", StrategicCruiser),
    (29984, "Tengu", StrategicCruiser),
    (29988, "Proteus", StrategicCruiser),
    (29990, "Loki", StrategicCruiser),
    // Heavy assault cruisers
    (12003, "Zealot", HeavyAssaultCruiser),
    (12019, "Sacrilege", HeavyAssaultCruiser),
    (12011, "Eagle", HeavyAssaultCruiser),
    (11993, "Cerberus", HeavyAssaultCruiser),
    (12023, "Deimos", HeavyAssaultCruiser),
    (12005, "Ishtar", HeavyAssaultCruiser),
    (11999, "Vagabond", HeavyAssaultCruiser),
    (12015, "Muninn", HeavyAssaultCruiser),
    // Recons
    (11965, "Pilgrim", ReconShip),
    (20125, "Curse", ReconShip),
    (11957, "Falcon", ReconShip),
    (11959, "Rook", ReconShip),
    (11969, "Arazu", ReconShip),
    (11971, "Lachesis", ReconShip),
    (11961, "Huginn", ReconShip),
    (11963, "Rapier", ReconShip),
];

/// Immutable lookup table of known hulls, built once at startup.
#[derive(Debug, Clone)]
pub struct HullCatalog {
    by_id: HashMap<TypeId, HullInfo>,
    /// Table order, for stable listings.
    order: Vec<TypeId>,
}

impl Default for HullCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl HullCatalog {
    pub fn new() -> Self {
        let by_id = HULLS
            .iter()
            .map(|&(id, name, category)| (id, HullInfo { id, name, category }))
            .collect();
        let order = HULLS.iter().map(|&(id, _, _)| id).collect();
        Self { by_id, order }
    }

    pub fn get(&self, type_id: TypeId) -> Option<&HullInfo> {
        self.by_id.get(&type_id)
    }

    pub fn name(&self, type_id: TypeId) -> Option<&'static str> {
        self.get(type_id).map(|h| h.name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All hulls belonging to a class, in table order.
    pub fn by_class(&self, class: ShipClass) -> Vec<&HullInfo> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|h| h.category.class() == class)
            .collect()
    }

    pub fn type_ids(&self, class: ShipClass) -> Vec<TypeId> {
        self.by_class(class).into_iter().map(|h| h.id).collect()
    }
}

/// Parse a comma-separated list of hull type ids.
pub fn parse_hull_ids(input: &str) -> Result<Vec<TypeId>, ScanError> {
    let ids = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TypeId>()
                .map_err(|_| ScanError::MalformedInput(format!("invalid hull id: {s}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(ScanError::MalformedInput("no hull ids given".into()));
    }
    Ok(ids)
}
