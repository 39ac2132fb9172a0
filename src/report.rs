//! Aggregation and text rendering of simulation results

use std::collections::HashMap;
use std::fmt;

use crate::models::{CapacityBasis, SimulationResult};

impl SimulationResult {
    /// Farm-wide shopping list: per-group feed needs summed by ingredient
    /// name, sorted by name.
    pub fn feed_totals(&self) -> Vec<(String, f64)> {
        let mut totals: HashMap<String, f64> = HashMap::new();
        for group in &self.per_group_results {
            for feed in &group.feed_suggestions {
                *totals.entry(feed.ingredient_name.clone()).or_default() += feed.total_kg;
            }
        }

        let mut list: Vec<_> = totals.into_iter().collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    /// Sum of tier-3 feed costs over all groups, if any were computed
    pub fn total_feed_cost(&self) -> Option<f64> {
        let costs: Vec<f64> = self
            .per_group_results
            .iter()
            .filter_map(|g| g.financials.as_ref().map(|f| f.feed_cost_total))
            .collect();
        (!costs.is_empty()).then(|| costs.iter().sum())
    }
}

/// Detailed per-group breakdown, printed by `simulate --details`
pub fn format_group_details(result: &SimulationResult) -> String {
    let mut output = String::new();

    for group in &result.per_group_results {
        output.push_str(&format!(
            "{} x{} on {} ({} days)\n",
            group.species_name, group.head_count, group.formulation_name, group.cycle_days
        ));
        output.push_str(&format!(
            "  DMI {:.2} kg/day, {:.2} kg DM per animal per cycle\n",
            group.dmi_per_animal, group.total_ms_per_animal
        ));
        output.push_str(&format!(
            "  {:.4} ha per animal, {:.2} ha for the group\n",
            group.area_ha_per_animal, group.total_area_required_ha
        ));
        for feed in &group.feed_suggestions {
            output.push_str(&format!(
                "  needs {} @ {:.2} kg DM\n",
                feed.ingredient_name, feed.total_kg
            ));
        }
        if let Some(fin) = &group.financials {
            output.push_str(&format!(
                "  feed cost {:.2}/animal/day, {:.2} total; output {:.2}; {:.2} per unit\n",
                fin.feed_cost_per_animal_per_day,
                fin.feed_cost_total,
                fin.production_total,
                fin.cost_per_unit
            ));
        }
    }

    output
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let totals = &self.farm_totals;

        writeln!(f, "=== Farm Allocation (tier {}) ===", self.tier.number())?;
        writeln!(
            f,
            "Area: {:.2} ha used of {:.2} ha ({}%) [{}]",
            totals.total_area_used_ha, totals.available_area_ha, totals.utilization_pct, totals.status
        )?;
        writeln!(f, "Remaining: {:.2} ha", totals.remaining_area_ha)?;
        writeln!(f)?;

        writeln!(f, "Groups:")?;
        if self.per_group_results.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for group in &self.per_group_results {
            writeln!(
                f,
                "  {:<28} {:>6} head {:>10.2} ha {:>12.2} kg DM",
                group.species_name,
                group.head_count,
                group.total_area_required_ha,
                group.total_ms_required_kg
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Room for more:")?;
        for cap in &self.capacity_analysis {
            let note = match cap.basis {
                CapacityBasis::CurrentInventory => "",
                CapacityBasis::CatalogBaseline => " (baseline)",
            };
            writeln!(
                f,
                "  +{} {} on {}{}",
                cap.potential_additional_animals, cap.species_name, cap.formulation_id, note
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Feed required (total cycle):")?;
        for (name, kg) in self.feed_totals() {
            writeln!(f, "  {} @ {:.0} kg DM", name, kg)?;
        }

        if let Some(cost) = self.total_feed_cost() {
            writeln!(f)?;
            writeln!(f, "Feed cost: {:.2}", cost)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  {}", warning)?;
            }
        }

        Ok(())
    }
}
