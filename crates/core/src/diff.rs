//! Hierarchical diff engine
//!
//! Compares two fingerprint maps level by level: titles, then packages
//! within a title, then files within a package. Each level classifies its
//! entities as created, updated, or deleted; an entity present in both maps
//! is updated iff at least one path belonging to it changed. Localizations
//! diff separately, from metadata snapshots rather than fingerprints.
//!
//! All outputs are sorted, so fan-out order (and with it, log order) is
//! deterministic.

use std::collections::BTreeSet;

use ahash::AHashSet;

use crate::metadata::TitleMetadata;
use crate::paths;
use crate::state::FingerprintMap;

/// One level's classification of entities, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDiff {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl EntityDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Paths that differ between the two maps: added, removed, or refingerprinted.
pub fn changed_paths<'a>(old: &'a FingerprintMap, new: &'a FingerprintMap) -> AHashSet<&'a str> {
    let mut changed = AHashSet::new();
    for (path, fingerprint) in old {
        if new.get(path) != Some(fingerprint) {
            changed.insert(path.as_str());
        }
    }
    for path in new.keys() {
        if !old.contains_key(path) {
            changed.insert(path.as_str());
        }
    }
    changed
}

fn classify_entities<'a>(
    old: &'a FingerprintMap,
    new: &'a FingerprintMap,
    classify: impl Fn(&'a str) -> Option<&'a str>,
    force_update_survivors: bool,
) -> EntityDiff {
    let names_of = |map: &'a FingerprintMap| -> BTreeSet<&'a str> {
        map.keys().filter_map(|path| classify(path)).collect()
    };
    let old_names = names_of(old);
    let new_names = names_of(new);
    let changed = changed_paths(old, new);

    let mut diff = EntityDiff::default();
    for name in &new_names {
        if !old_names.contains(name) {
            diff.created.push((*name).to_owned());
        }
    }
    for name in &old_names {
        if !new_names.contains(name) {
            diff.deleted.push((*name).to_owned());
        }
    }
    for name in old_names.intersection(&new_names) {
        let touched = force_update_survivors
            || changed
                .iter()
                .any(|&path| classify(path) == Some(*name));
        if touched {
            diff.updated.push((*name).to_owned());
        }
    }
    diff
}

/// Diffs entire builds into per-title work items.
pub fn diff_titles(old: &FingerprintMap, new: &FingerprintMap) -> EntityDiff {
    classify_entities(old, new, paths::title_of, false)
}

/// Diffs one title's packages.
///
/// `metadata_changed` marks every surviving package as updated even when its
/// own files did not change, since the packed declaration and artifacts can
/// depend on title metadata.
pub fn diff_packages<'a>(
    old: &'a FingerprintMap,
    new: &'a FingerprintMap,
    title: &str,
    metadata_changed: bool,
) -> EntityDiff {
    let classify = |path: &'a str| {
        (paths::title_of(path) == Some(title))
            .then(|| paths::package_of(path))
            .flatten()
    };
    classify_entities(old, new, classify, metadata_changed)
}

/// Diffs one package's files (base and localized alike) by full source path.
/// A file never updates in place at this level; an updated path means its
/// fingerprint changed, which the driver realizes as delete-then-create.
pub fn diff_files(
    old: &FingerprintMap,
    new: &FingerprintMap,
    title: &str,
    package: &str,
) -> EntityDiff {
    let belongs = |path: &str| {
        paths::title_of(path) == Some(title) && paths::package_of(path) == Some(package)
    };

    let mut diff = EntityDiff::default();
    for (path, fingerprint) in new {
        if !belongs(path) {
            continue;
        }
        match old.get(path) {
            None => diff.created.push(path.clone()),
            Some(old_fingerprint) if old_fingerprint != fingerprint => {
                diff.updated.push(path.clone())
            }
            Some(_) => {}
        }
    }
    for path in old.keys() {
        if belongs(path) && !new.contains_key(path) {
            diff.deleted.push(path.clone());
        }
    }
    diff
}

/// Diffs a title's declared localizations between two metadata snapshots.
/// An updated localization is one whose display metadata changed.
pub fn diff_localizations(old: &TitleMetadata, new: &TitleMetadata) -> EntityDiff {
    let mut diff = EntityDiff::default();
    for (name, meta) in &new.localizations {
        match old.localizations.get(name) {
            None => diff.created.push(name.clone()),
            Some(old_meta) if old_meta != meta => diff.updated.push(name.clone()),
            Some(_) => {}
        }
    }
    for name in old.localizations.keys() {
        if !new.localizations.contains_key(name) {
            diff.deleted.push(name.clone());
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Developer, LocalizationMetadata};

    fn map(entries: &[(&str, u64)]) -> FingerprintMap {
        entries
            .iter()
            .map(|(path, fingerprint)| ((*path).to_owned(), *fingerprint))
            .collect()
    }

    fn meta(localizations: &[(&str, &str)]) -> TitleMetadata {
        TitleMetadata {
            name: "Pond".to_owned(),
            description: "d".to_owned(),
            developer: Developer {
                name: "n".to_owned(),
                url: "u".to_owned(),
            },
            width: 1,
            height: 1,
            localizations: localizations
                .iter()
                .map(|(loc, name)| {
                    (
                        (*loc).to_owned(),
                        LocalizationMetadata {
                            name: (*name).to_owned(),
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn identical_maps_diff_empty() {
        let fingerprints = map(&[
            ("src/games/pond/metadata.json", 1),
            ("src/games/pond/packages/art/fish.svg", 2),
        ]);
        assert!(diff_titles(&fingerprints, &fingerprints).is_empty());
        assert!(diff_packages(&fingerprints, &fingerprints, "pond", false).is_empty());
        assert!(diff_files(&fingerprints, &fingerprints, "pond", "art").is_empty());
    }

    #[test]
    fn title_created_updated_deleted() {
        let old = map(&[
            ("src/games/pond/metadata.json", 1),
            ("src/games/maze/metadata.json", 1),
            ("src/games/gone/metadata.json", 1),
        ]);
        let new = map(&[
            ("src/games/pond/metadata.json", 2),
            ("src/games/maze/metadata.json", 1),
            ("src/games/fresh/metadata.json", 1),
        ]);

        let diff = diff_titles(&old, &new);
        assert_eq!(diff.created, vec!["fresh"]);
        assert_eq!(diff.updated, vec!["pond"]);
        assert_eq!(diff.deleted, vec!["gone"]);
    }

    #[test]
    fn adding_a_file_updates_its_title() {
        let old = map(&[("src/games/pond/metadata.json", 1)]);
        let new = map(&[
            ("src/games/pond/metadata.json", 1),
            ("src/games/pond/packages/art/fish.svg", 5),
        ]);
        assert_eq!(diff_titles(&old, &new).updated, vec!["pond"]);
    }

    #[test]
    fn non_title_paths_are_ignored_by_the_title_diff() {
        let old = map(&[("src/engine/loader.js", 1)]);
        let new = map(&[("src/engine/loader.js", 2)]);
        assert!(diff_titles(&old, &new).is_empty());
    }

    #[test]
    fn package_diff_is_scoped_to_its_title() {
        let old = map(&[
            ("src/games/pond/packages/art/fish.svg", 1),
            ("src/games/maze/packages/art/wall.svg", 1),
        ]);
        let new = map(&[
            ("src/games/pond/packages/art/fish.svg", 1),
            ("src/games/maze/packages/art/wall.svg", 9),
        ]);
        assert!(diff_packages(&old, &new, "pond", false).is_empty());
        assert_eq!(diff_packages(&old, &new, "maze", false).updated, vec!["art"]);
    }

    #[test]
    fn metadata_change_forces_surviving_packages_to_update() {
        let old = map(&[
            ("src/games/pond/packages/art/fish.svg", 1),
            ("src/games/pond/packages/audio/intro.wav", 1),
        ]);
        let new = map(&[
            ("src/games/pond/packages/art/fish.svg", 1),
            ("src/games/pond/packages/music/theme.wav", 1),
        ]);

        let diff = diff_packages(&old, &new, "pond", true);
        assert_eq!(diff.created, vec!["music"]);
        assert_eq!(diff.updated, vec!["art"]);
        assert_eq!(diff.deleted, vec!["audio"]);
    }

    #[test]
    fn file_diff_reports_full_paths() {
        let old = map(&[
            ("src/games/pond/packages/art/fish.svg", 1),
            ("src/games/pond/packages/art/weed.svg", 1),
        ]);
        let new = map(&[
            ("src/games/pond/packages/art/fish.svg", 2),
            ("src/games/pond/packages/art/localizations/fr/sign.svg", 1),
        ]);

        let diff = diff_files(&old, &new, "pond", "art");
        assert_eq!(
            diff.created,
            vec!["src/games/pond/packages/art/localizations/fr/sign.svg"]
        );
        assert_eq!(diff.updated, vec!["src/games/pond/packages/art/fish.svg"]);
        assert_eq!(diff.deleted, vec!["src/games/pond/packages/art/weed.svg"]);
    }

    #[test]
    fn localization_diff_uses_metadata_snapshots() {
        let old = meta(&[("fr", "Étang"), ("de", "Teich")]);
        let new = meta(&[("fr", "L'étang"), ("es", "Estanque")]);

        let diff = diff_localizations(&old, &new);
        assert_eq!(diff.created, vec!["es"]);
        assert_eq!(diff.updated, vec!["fr"]);
        assert_eq!(diff.deleted, vec!["de"]);
    }

    #[test]
    fn changed_paths_covers_all_three_kinds() {
        let old = map(&[("a", 1), ("b", 1), ("c", 1)]);
        let new = map(&[("a", 1), ("b", 2), ("d", 1)]);
        let changed = changed_paths(&old, &new);
        assert!(!changed.contains("a"));
        assert!(changed.contains("b"));
        assert!(changed.contains("c"));
        assert!(changed.contains("d"));
    }
}
