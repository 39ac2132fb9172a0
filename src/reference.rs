//! Built-in reference data: common feeds and three livestock species

use crate::catalog::{CatalogError, ReferenceCatalog};
use crate::models::{DietFormulation, FormulationLine, Ingredient, Species};

fn ingredient(id: &str, name: &str, cost: f64, dry_matter: f64) -> Ingredient {
    Ingredient {
        id: id.to_string(),
        name: name.to_string(),
        default_cost_per_kg: cost,
        dry_matter_fraction: dry_matter,
    }
}

fn lab(id: &str, name: &str, lines: &[(&str, f64)]) -> DietFormulation {
    DietFormulation {
        id: id.to_string(),
        name: name.to_string(),
        composition: lines
            .iter()
            .map(|&(ingredient_id, kg)| FormulationLine {
                ingredient_id: ingredient_id.to_string(),
                daily_dry_matter_kg: kg,
            })
            .collect(),
    }
}

pub fn builtin_ingredients() -> Vec<Ingredient> {
    vec![
        ingredient("ing_corn", "Ground Corn (Milho)", 1.20, 0.88),
        ingredient("ing_silage", "Corn Silage (Silagem)", 0.30, 0.35),
        ingredient("ing_urea", "Livestock Urea", 4.50, 1.00),
        ingredient("ing_cotton", "Cottonseed (Caroço)", 1.50, 0.90),
        ingredient("ing_ddg", "DDG (Corn Distillers)", 1.80, 0.90),
        ingredient("ing_pulp", "Citrus Pulp", 0.90, 0.88),
        ingredient("ing_cane", "Sugarcane Bagasse", 0.15, 0.45),
        ingredient("ing_soy_mol", "Soy Molasses", 1.10, 0.75),
    ]
}

pub fn builtin_species() -> Vec<Species> {
    vec![
        Species {
            id: "caprino".to_string(),
            name: "Goat (Caprino Leiteiro)".to_string(),
            standard_weight_kg: 60.0,
            standard_cycle_days: 365,
            formulations: vec![
                lab(
                    "lab_c1",
                    "Lab C1 (Basic)",
                    &[("ing_corn", 0.5), ("ing_silage", 2.0)],
                ),
                lab(
                    "lab_c2",
                    "Lab C2 (Performance)",
                    &[("ing_corn", 1.2), ("ing_silage", 1.5)],
                ),
                lab(
                    "lab_c3",
                    "Lab C3 (Byproducts)",
                    &[
                        ("ing_cotton", 0.25),
                        ("ing_ddg", 0.70),
                        ("ing_pulp", 0.70),
                        ("ing_cane", 0.60),
                        ("ing_soy_mol", 0.25),
                    ],
                ),
            ],
        },
        Species {
            id: "nelore".to_string(),
            name: "Beef Cattle (Nelore)".to_string(),
            standard_weight_kg: 450.0,
            standard_cycle_days: 120,
            formulations: vec![
                lab(
                    "lab_n1",
                    "Lab N1 (Finishing)",
                    &[("ing_silage", 6.0), ("ing_corn", 5.0), ("ing_urea", 0.1)],
                ),
                lab(
                    "lab_n2",
                    "Lab N2 (Intensive)",
                    &[("ing_silage", 5.0), ("ing_corn", 6.5), ("ing_urea", 0.15)],
                ),
            ],
        },
        Species {
            id: "holstein".to_string(),
            name: "Dairy Cow (Holandesa)".to_string(),
            standard_weight_kg: 550.0,
            standard_cycle_days: 365,
            formulations: vec![
                lab(
                    "lab_h1",
                    "Lab H1 (Standard)",
                    &[("ing_silage", 10.0), ("ing_corn", 6.0), ("ing_soy_mol", 2.0)],
                ),
                lab(
                    "lab_h2",
                    "Lab H2 (High Yield)",
                    &[("ing_silage", 11.0), ("ing_corn", 7.5), ("ing_soy_mol", 2.5)],
                ),
            ],
        },
    ]
}

/// The built-in data set as a validated catalog
pub fn builtin_catalog() -> Result<ReferenceCatalog, CatalogError> {
    ReferenceCatalog::new(builtin_ingredients(), builtin_species())
}
