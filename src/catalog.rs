//! Validated reference catalog of feed ingredients and livestock species

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Ingredient, Species};

/// Reasons a catalog is refused at construction time.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate ingredient id '{0}'")]
    DuplicateIngredient(String),

    #[error("duplicate species id '{0}'")]
    DuplicateSpecies(String),

    #[error("species '{species}' defines formulation '{formulation}' more than once")]
    DuplicateFormulation { species: String, formulation: String },

    #[error("species '{0}' has no diet formulations")]
    NoFormulations(String),

    #[error("formulation '{formulation}' of species '{species}' has no ingredient lines")]
    EmptyFormulation { species: String, formulation: String },

    #[error("formulation '{formulation}' of species '{species}' references unknown ingredient '{ingredient}'")]
    UnknownIngredient {
        species: String,
        formulation: String,
        ingredient: String,
    },

    #[error("formulation '{formulation}' of species '{species}' has invalid amount {amount} for '{ingredient}'")]
    InvalidAmount {
        species: String,
        formulation: String,
        ingredient: String,
        amount: f64,
    },

    #[error("ingredient '{id}' has invalid {field}: {value}")]
    InvalidIngredient {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("species '{0}' has a zero-day standard cycle")]
    ZeroCycle(String),
}

/// Immutable ingredient and species registry.
///
/// Construction checks every Species -> Formulation -> Ingredient chain, so
/// lookups never have to deal with dangling references.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    ingredients: Vec<Ingredient>,
    species: Vec<Species>,
    ingredient_index: HashMap<String, usize>,
    species_index: HashMap<String, usize>,
}

impl ReferenceCatalog {
    pub fn new(ingredients: Vec<Ingredient>, species: Vec<Species>) -> Result<Self, CatalogError> {
        let mut ingredient_index = HashMap::with_capacity(ingredients.len());
        for (pos, ingredient) in ingredients.iter().enumerate() {
            validate_ingredient(ingredient)?;
            if ingredient_index.insert(ingredient.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateIngredient(ingredient.id.clone()));
            }
        }

        let mut species_index = HashMap::with_capacity(species.len());
        for (pos, s) in species.iter().enumerate() {
            validate_species(s, &ingredient_index)?;
            if species_index.insert(s.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateSpecies(s.id.clone()));
            }
        }

        debug!(
            ingredients = ingredients.len(),
            species = species.len(),
            "reference catalog validated"
        );

        Ok(Self {
            ingredients,
            species,
            ingredient_index,
            species_index,
        })
    }

    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredient_index.get(id).map(|&pos| &self.ingredients[pos])
    }

    pub fn species(&self, id: &str) -> Option<&Species> {
        self.species_index.get(id).map(|&pos| &self.species[pos])
    }

    /// Ingredients in catalog order
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    /// Species in catalog order
    pub fn all_species(&self) -> &[Species] {
        &self.species
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty() && self.ingredients.is_empty()
    }
}

fn validate_ingredient(ingredient: &Ingredient) -> Result<(), CatalogError> {
    let cost = ingredient.default_cost_per_kg;
    if !cost.is_finite() || cost < 0.0 {
        return Err(CatalogError::InvalidIngredient {
            id: ingredient.id.clone(),
            field: "default cost per kg",
            value: cost,
        });
    }
    if !(0.0..=1.0).contains(&ingredient.dry_matter_fraction) {
        return Err(CatalogError::InvalidIngredient {
            id: ingredient.id.clone(),
            field: "dry matter fraction",
            value: ingredient.dry_matter_fraction,
        });
    }
    Ok(())
}

fn validate_species(
    species: &Species,
    ingredient_index: &HashMap<String, usize>,
) -> Result<(), CatalogError> {
    if species.formulations.is_empty() {
        return Err(CatalogError::NoFormulations(species.id.clone()));
    }
    if species.standard_cycle_days == 0 {
        return Err(CatalogError::ZeroCycle(species.id.clone()));
    }

    for (pos, formulation) in species.formulations.iter().enumerate() {
        if species.formulations[..pos].iter().any(|f| f.id == formulation.id) {
            return Err(CatalogError::DuplicateFormulation {
                species: species.id.clone(),
                formulation: formulation.id.clone(),
            });
        }
        if formulation.composition.is_empty() {
            return Err(CatalogError::EmptyFormulation {
                species: species.id.clone(),
                formulation: formulation.id.clone(),
            });
        }
        for line in &formulation.composition {
            if !ingredient_index.contains_key(&line.ingredient_id) {
                return Err(CatalogError::UnknownIngredient {
                    species: species.id.clone(),
                    formulation: formulation.id.clone(),
                    ingredient: line.ingredient_id.clone(),
                });
            }
            if !line.daily_dry_matter_kg.is_finite() || line.daily_dry_matter_kg < 0.0 {
                return Err(CatalogError::InvalidAmount {
                    species: species.id.clone(),
                    formulation: formulation.id.clone(),
                    ingredient: line.ingredient_id.clone(),
                    amount: line.daily_dry_matter_kg,
                });
            }
        }
    }
    Ok(())
}
