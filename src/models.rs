//! Data models for feed ingredients, livestock and simulation results

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A feed commodity. Costs are per kg of dry matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub default_cost_per_kg: f64,
    pub dry_matter_fraction: f64, // 0..=1, informational only
}

/// One line of a diet: kg of dry matter per animal per day of one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationLine {
    pub ingredient_id: String,
    pub daily_dry_matter_kg: f64,
}

/// A named diet recipe ("Lab") for one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietFormulation {
    pub id: String,
    pub name: String,
    pub composition: Vec<FormulationLine>,
}

impl DietFormulation {
    /// Daily dry-matter intake of one animal on this diet (kg/day)
    pub fn daily_intake_kg(&self) -> f64 {
        self.composition.iter().map(|line| line.daily_dry_matter_kg).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: String,
    pub name: String,
    pub standard_weight_kg: f64,
    pub standard_cycle_days: u32,
    pub formulations: Vec<DietFormulation>,
}

impl Species {
    pub fn formulation(&self, formulation_id: &str) -> Option<&DietFormulation> {
        self.formulations.iter().find(|f| f.id == formulation_id)
    }
}

/// Farm scale. Only `Diversified` farms get financial projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Family,
    SmallCommercial,
    Diversified,
}

impl Tier {
    pub fn number(self) -> u8 {
        match self {
            Tier::Family => 1,
            Tier::SmallCommercial => 2,
            Tier::Diversified => 3,
        }
    }

    pub fn computes_financials(self) -> bool {
        self == Tier::Diversified
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Tier::Family),
            2 => Ok(Tier::SmallCommercial),
            3 => Ok(Tier::Diversified),
            other => Err(format!("tier must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.number()
    }
}

/// One cohort of animals in the farm inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationGroup {
    pub species_id: String,
    pub head_count: u32,
    pub selected_formulation_id: String,
    /// Overrides the species' standard cycle when set (and non-zero)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_in_system: Option<u32>,
}

/// Daily output of one animal (kg gained, liters of milk, ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionParam {
    pub daily_output_per_animal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub tier: Tier,
    pub available_area_ha: f64,
    pub system_productivity: f64, // kg DM / ha / year
    #[serde(default)]
    pub groups: Vec<SimulationGroup>,
    #[serde(default)]
    pub ingredient_cost_overrides: BTreeMap<String, f64>,
    #[serde(default)]
    pub production_params: BTreeMap<String, ProductionParam>,
}

/// Total dry matter of one ingredient needed by a group over its cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRequirement {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub total_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub feed_cost_per_animal_per_day: f64,
    pub feed_cost_total: f64,
    pub production_total: f64,
    pub cost_per_unit: f64,
}

/// Computed metrics for one processed group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub species_id: String,
    pub species_name: String,
    pub formulation_id: String,
    pub formulation_name: String,
    pub head_count: u32,
    pub cycle_days: u32,
    pub dmi_per_animal: f64,
    pub total_ms_per_animal: f64,
    pub area_ha_per_animal: f64,
    pub total_area_required_ha: f64,
    pub total_ms_required_kg: f64,
    pub feed_suggestions: Vec<FeedRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financials: Option<Financials>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FarmStatus {
    Ok,
    Overload,
}

impl fmt::Display for FarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarmStatus::Ok => write!(f, "OK"),
            FarmStatus::Overload => write!(f, "OVERLOAD"),
        }
    }
}

/// Farm-wide land usage.
///
/// Area fields are rounded to 2 decimals, but `status` and
/// `utilization_pct` come from the unrounded figures, so a farm can show
/// equal used and available area and still be `Overload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmTotals {
    pub total_area_used_ha: f64,
    pub available_area_ha: f64,
    pub utilization_pct: u32,
    pub status: FarmStatus,
    pub remaining_area_ha: f64,
}

/// Where a capacity estimate's per-animal area came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityBasis {
    CurrentInventory,
    CatalogBaseline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityEstimate {
    pub species_id: String,
    pub species_name: String,
    pub formulation_id: String,
    pub potential_additional_animals: u64,
    pub basis: CapacityBasis,
}

/// Input problems the engine tolerated instead of failing on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationWarning {
    UnknownSpecies {
        group_index: usize,
        species_id: String,
    },
    UnknownFormulation {
        group_index: usize,
        species_id: String,
        formulation_id: String,
    },
    NonPositiveProductivity {
        value: f64,
    },
    NegativeAvailableArea {
        value: f64,
    },
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationWarning::UnknownSpecies {
                group_index,
                species_id,
            } => write!(
                f,
                "group #{}: unknown species '{}', group skipped",
                group_index, species_id
            ),
            SimulationWarning::UnknownFormulation {
                group_index,
                species_id,
                formulation_id,
            } => write!(
                f,
                "group #{}: species '{}' has no formulation '{}', group skipped",
                group_index, species_id, formulation_id
            ),
            SimulationWarning::NonPositiveProductivity { value } => write!(
                f,
                "system productivity is {} kg/ha/yr; land requirements reported as 0",
                value
            ),
            SimulationWarning::NegativeAvailableArea { value } => {
                write!(f, "available area {} ha is negative; treated as 0", value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub tier: Tier,
    pub per_group_results: Vec<GroupResult>,
    pub farm_totals: FarmTotals,
    pub capacity_analysis: Vec<CapacityEstimate>,
    #[serde(default)]
    pub warnings: Vec<SimulationWarning>,
}
