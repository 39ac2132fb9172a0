//! SQLite store for the reference catalog
//!
//! Only reference data (ingredients, species, diet formulations) lives here.
//! Simulations are computed on demand and never written back.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::debug;

use crate::catalog::ReferenceCatalog;
use crate::models::{DietFormulation, FormulationLine, Ingredient, Species};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            default_cost_per_kg REAL NOT NULL,
            dry_matter_fraction REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS species (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            standard_weight_kg REAL NOT NULL,
            standard_cycle_days INTEGER NOT NULL,
            -- catalog order; the first species is listed first in baselines
            position INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS formulations (
            species_id TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (species_id, id)
        );

        CREATE TABLE IF NOT EXISTS formulation_lines (
            species_id TEXT NOT NULL,
            formulation_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            ingredient_id TEXT NOT NULL,
            daily_dry_matter_kg REAL NOT NULL,
            PRIMARY KEY (species_id, formulation_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_formulations_species ON formulations(species_id);
        CREATE INDEX IF NOT EXISTS idx_lines_formulation ON formulation_lines(species_id, formulation_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an ingredient. Pass a transaction to batch writes.
pub fn upsert_ingredient(conn: &Connection, ingredient: &Ingredient) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO ingredients (id, name, default_cost_per_kg, dry_matter_fraction)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &ingredient.id,
            &ingredient.name,
            ingredient.default_cost_per_kg,
            ingredient.dry_matter_fraction,
        ),
    )?;
    Ok(())
}

/// Insert or replace a species together with all of its formulations.
///
/// A re-imported species keeps its original catalog position.
pub fn upsert_species(conn: &mut Connection, species: &Species) -> Result<()> {
    let tx = conn.transaction()?;
    write_species(&tx, species)?;
    tx.commit()?;
    Ok(())
}

/// Write a species and its formulations through an open transaction
pub fn write_species(tx: &Transaction<'_>, species: &Species) -> Result<()> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT position FROM species WHERE id = ?1",
            [&species.id],
            |row| row.get(0),
        )
        .optional()?;
    let position = match existing {
        Some(pos) => pos,
        None => tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM species",
            [],
            |row| row.get(0),
        )?,
    };

    tx.execute(
        "INSERT OR REPLACE INTO species (id, name, standard_weight_kg, standard_cycle_days, position)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &species.id,
            &species.name,
            species.standard_weight_kg,
            species.standard_cycle_days,
            position,
        ),
    )?;

    tx.execute("DELETE FROM formulation_lines WHERE species_id = ?1", [&species.id])?;
    tx.execute("DELETE FROM formulations WHERE species_id = ?1", [&species.id])?;

    for (f_pos, formulation) in species.formulations.iter().enumerate() {
        tx.execute(
            "INSERT INTO formulations (species_id, id, name, position) VALUES (?1, ?2, ?3, ?4)",
            (&species.id, &formulation.id, &formulation.name, f_pos as i64),
        )?;
        for (l_pos, line) in formulation.composition.iter().enumerate() {
            tx.execute(
                "INSERT INTO formulation_lines
                    (species_id, formulation_id, position, ingredient_id, daily_dry_matter_kg)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &species.id,
                    &formulation.id,
                    l_pos as i64,
                    &line.ingredient_id,
                    line.daily_dry_matter_kg,
                ),
            )?;
        }
    }
    Ok(())
}

/// Clear all catalog data
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM formulation_lines;
        DELETE FROM formulations;
        DELETE FROM species;
        DELETE FROM ingredients;
        "#,
    )?;
    Ok(())
}

/// Replace the stored catalog with `catalog`
pub fn store_catalog(conn: &mut Connection, catalog: &ReferenceCatalog) -> Result<()> {
    let tx = conn.transaction()?;
    clear_catalog(&tx)?;
    for ingredient in catalog.ingredients() {
        tx.execute(
            "INSERT INTO ingredients (id, name, default_cost_per_kg, dry_matter_fraction)
             VALUES (?1, ?2, ?3, ?4)",
            (
                &ingredient.id,
                &ingredient.name,
                ingredient.default_cost_per_kg,
                ingredient.dry_matter_fraction,
            ),
        )?;
    }
    for species in catalog.all_species() {
        write_species(&tx, species)?;
    }
    tx.commit()?;
    Ok(())
}

/// List all ingredients, ordered by name
pub fn list_ingredients(conn: &Connection) -> Result<Vec<Ingredient>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, default_cost_per_kg, dry_matter_fraction FROM ingredients ORDER BY name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Ingredient {
            id: row.get(0)?,
            name: row.get(1)?,
            default_cost_per_kg: row.get(2)?,
            dry_matter_fraction: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all species with their formulations, in catalog order
pub fn list_species(conn: &Connection) -> Result<Vec<Species>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, standard_weight_kg, standard_cycle_days FROM species ORDER BY position",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Species {
            id: row.get(0)?,
            name: row.get(1)?,
            standard_weight_kg: row.get(2)?,
            standard_cycle_days: row.get(3)?,
            formulations: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut species = row?;
        species.formulations = get_formulations(conn, &species.id)?;
        results.push(species);
    }
    Ok(results)
}

/// Get all formulations of a species, lines included
pub fn get_formulations(conn: &Connection, species_id: &str) -> Result<Vec<DietFormulation>> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM formulations WHERE species_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([species_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut line_stmt = conn.prepare(
        "SELECT ingredient_id, daily_dry_matter_kg
         FROM formulation_lines
         WHERE species_id = ?1 AND formulation_id = ?2
         ORDER BY position",
    )?;

    let mut results = Vec::new();
    for row in rows {
        let (id, name) = row?;
        let lines = line_stmt.query_map([species_id, id.as_str()], |row| {
            Ok(FormulationLine {
                ingredient_id: row.get(0)?,
                daily_dry_matter_kg: row.get(1)?,
            })
        })?;
        let mut composition = Vec::new();
        for line in lines {
            composition.push(line?);
        }
        results.push(DietFormulation {
            id,
            name,
            composition,
        });
    }
    Ok(results)
}

/// Load and validate the stored catalog.
///
/// Ingredients come back in insertion order so the catalog matches what was
/// stored.
pub fn load_catalog(conn: &Connection) -> Result<ReferenceCatalog> {
    let mut stmt = conn.prepare(
        "SELECT id, name, default_cost_per_kg, dry_matter_fraction FROM ingredients ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Ingredient {
            id: row.get(0)?,
            name: row.get(1)?,
            default_cost_per_kg: row.get(2)?,
            dry_matter_fraction: row.get(3)?,
        })
    })?;
    let mut ingredients = Vec::new();
    for row in rows {
        ingredients.push(row?);
    }

    let species = list_species(conn)?;
    debug!(
        ingredients = ingredients.len(),
        species = species.len(),
        "loaded catalog rows"
    );

    ReferenceCatalog::new(ingredients, species).context("stored catalog is inconsistent")
}
