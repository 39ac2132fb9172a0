//! Import of catalog fragment files
//!
//! Walks a directory for `*.toml` files holding `[[ingredients]]` and
//! `[[species]]` tables and writes them into the catalog store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{Ingredient, Species};

/// Contents of one fragment file. Either table may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFragment {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub species: Vec<Species>,
}

/// Find all TOML files under `dir`, sorted so imports are reproducible
pub fn find_fragment_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Parse a single fragment file
pub fn parse_fragment(filepath: &Path) -> Result<CatalogFragment> {
    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read {}", filepath.display()))?;
    let fragment = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", filepath.display()))?;
    Ok(fragment)
}

/// Import every fragment under `dir` into the store.
///
/// Ingredients from all files are written before any species, so a species
/// may use ingredients declared in another file. Files that fail to parse
/// are counted and skipped.
///
/// All writes, including the optional clear, run in one transaction that
/// only commits if the resulting catalog validates. On error the previous
/// catalog is left untouched.
pub fn import_to_database(conn: &mut Connection, dir: &Path, clear: bool) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    info!(dir = %dir.display(), "scanning for catalog fragments");
    let files = find_fragment_files(dir)?;
    info!(count = files.len(), "found fragment files");

    let mut fragments = Vec::new();
    for filepath in &files {
        match parse_fragment(filepath) {
            Ok(fragment) if fragment.ingredients.is_empty() && fragment.species.is_empty() => {
                stats.skipped += 1;
            }
            Ok(fragment) => {
                info!(
                    file = %filepath.display(),
                    ingredients = fragment.ingredients.len(),
                    species = fragment.species.len(),
                    "parsed fragment"
                );
                fragments.push(fragment);
            }
            Err(e) => {
                warn!("{:#}", e);
                stats.errors += 1;
            }
        }
    }

    let tx = conn.transaction()?;
    if clear {
        info!("clearing existing catalog");
        db::clear_catalog(&tx)?;
    }

    for fragment in &fragments {
        for ingredient in &fragment.ingredients {
            db::upsert_ingredient(&tx, ingredient)?;
            stats.ingredients += 1;
        }
    }
    for fragment in &fragments {
        for species in &fragment.species {
            db::write_species(&tx, species)?;
            stats.species += 1;
            stats.formulations += species.formulations.len();
        }
    }

    // Dropping tx on error rolls everything back
    db::load_catalog(&tx).context("import would leave an inconsistent catalog")?;
    tx.commit()?;

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub ingredients: usize,
    pub species: usize,
    pub formulations: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} ingredients and {} species ({} formulations). Skipped: {}, Errors: {}",
            self.ingredients, self.species, self.formulations, self.skipped, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use std::process;

    use super::*;
    use crate::reference;

    const FEEDS: &str = r#"
[[ingredients]]
id = "ing_hay"
name = "Tifton Hay"
default_cost_per_kg = 0.6
dry_matter_fraction = 0.88
"#;

    const SHEEP: &str = r#"
[[species]]
id = "ovino"
name = "Sheep (Santa Ines)"
standard_weight_kg = 45.0
standard_cycle_days = 150

[[species.formulations]]
id = "lab_o1"
name = "Lab O1 (Pasture)"
composition = [
    { ingredient_id = "ing_hay", daily_dry_matter_kg = 1.4 },
]
"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ecofarm-import-{}-{}", name, process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("species")).unwrap();
        dir
    }

    #[test]
    fn fragment_parses_nested_formulations() {
        let fragment: CatalogFragment = toml::from_str(SHEEP).unwrap();
        assert!(fragment.ingredients.is_empty());
        let sheep = &fragment.species[0];
        assert_eq!(sheep.standard_cycle_days, 150);
        assert_eq!(sheep.formulations[0].composition[0].ingredient_id, "ing_hay");
    }

    #[test]
    fn imports_across_files_and_counts_failures() {
        let dir = scratch_dir("mixed");
        // species sorts before feeds on disk but still resolves
        fs::write(dir.join("species/sheep.toml"), SHEEP).unwrap();
        fs::write(dir.join("z_feeds.toml"), FEEDS).unwrap();
        fs::write(dir.join("broken.toml"), "[[species]]\nid = 3").unwrap();
        fs::write(dir.join("empty.toml"), "").unwrap();
        fs::write(dir.join("notes.txt"), "not a fragment").unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let stats = import_to_database(&mut conn, &dir, false).unwrap();

        assert_eq!(
            stats,
            ImportStats {
                ingredients: 1,
                species: 1,
                formulations: 1,
                skipped: 1,
                errors: 1,
            }
        );
        let catalog = db::load_catalog(&conn).unwrap();
        assert_eq!(catalog.species("ovino").unwrap().name, "Sheep (Santa Ines)");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn broken_import_keeps_previous_catalog() {
        let dir = scratch_dir("broken-ref");
        fs::write(
            dir.join("sheep.toml"),
            SHEEP.replace("\"ing_hay\"", "\"ing_typo\""),
        )
        .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::store_catalog(&mut conn, &reference::builtin_catalog().unwrap()).unwrap();

        for clear in [false, true] {
            let err = import_to_database(&mut conn, &dir, clear).unwrap_err();
            assert!(format!("{:#}", err).contains("unknown ingredient 'ing_typo'"));

            let catalog = db::load_catalog(&conn).unwrap();
            assert_eq!(catalog.all_species().len(), 3);
            assert!(catalog.species("ovino").is_none());
            assert_eq!(catalog.ingredients().len(), 8);
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn clear_replaces_catalog() {
        let dir = scratch_dir("clear");
        fs::write(dir.join("feeds.toml"), FEEDS).unwrap();
        fs::write(dir.join("species/sheep.toml"), SHEEP).unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::store_catalog(&mut conn, &reference::builtin_catalog().unwrap()).unwrap();

        import_to_database(&mut conn, &dir, true).unwrap();
        let catalog = db::load_catalog(&conn).unwrap();
        let ids: Vec<_> = catalog.all_species().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["ovino"]);
        assert_eq!(catalog.ingredients().len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_missing_directory() {
        let missing = std::env::temp_dir().join("ecofarm-import-does-not-exist");
        assert!(find_fragment_files(&missing).is_err());
    }
}
