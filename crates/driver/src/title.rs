//! Per-title build handlers
//!
//! A title is valid only if it carries `metadata.json` and `icon.svg`.
//! Updating a title diffs its packages and localizations, fans out package
//! work, and after the package barrier refreshes the HTML shell and icons
//! for every output directory whose own inputs changed.

use std::sync::Arc;

use pp_core::{diff, paths, BuildError, Profile, TitleMetadata, TitleState};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::build::{BuildContext, TitleOutcome};
use crate::fsops;
use crate::html;
use crate::package;
use crate::report::Failure;

fn entity(title: &str) -> String {
    format!("title \"{title}\"")
}

pub(crate) async fn created(ctx: Arc<BuildContext>, title: String) -> TitleOutcome {
    info!(title, "creating title");
    let profile = ctx.options.profile;
    for dir in [
        paths::temp_build_game(profile, &title),
        paths::dist_build_game(profile, &title, None),
    ] {
        if let Err(error) = fsops::create_dir_all(&ctx.abs(&dir)).await {
            return TitleOutcome::failed(entity(&title), error);
        }
    }
    updated(ctx, title).await
}

pub(crate) async fn updated(ctx: Arc<BuildContext>, title: String) -> TitleOutcome {
    info!(title, "updating title");
    let profile = ctx.options.profile;

    let metadata_path = paths::src_game_metadata(&title);
    let icon_path = paths::src_game_icon(&title);
    if !ctx.new_paths.contains_key(&metadata_path) {
        return TitleOutcome::failed(
            entity(&title),
            BuildError::config(&title, "does not appear to have a \"metadata.json\" file"),
        );
    }
    if !ctx.new_paths.contains_key(&icon_path) {
        return TitleOutcome::failed(
            entity(&title),
            BuildError::config(&title, "does not appear to have an \"icon.svg\" file"),
        );
    }

    let metadata_text = match fsops::read_to_string(&ctx.abs(&metadata_path)).await {
        Ok(text) => text,
        Err(error) => return TitleOutcome::failed(entity(&title), error),
    };
    let metadata = match TitleMetadata::parse(&metadata_text, &title) {
        Ok(metadata) => metadata,
        Err(error) => return TitleOutcome::failed(entity(&title), error),
    };

    let snapshot = ctx.old_state.games.get(&title);
    let metadata_changed = snapshot.is_none()
        || ctx.old_state.paths.get(&metadata_path) != ctx.new_paths.get(&metadata_path);
    let icon_changed = ctx.old_state.paths.get(&icon_path) != ctx.new_paths.get(&icon_path);

    // With no snapshot every declared localization counts as created.
    let old_metadata = snapshot.map(|snapshot| snapshot.metadata.clone()).unwrap_or_else(|| {
        let mut stub = metadata.clone();
        stub.localizations.clear();
        stub
    });
    let localization_diff = diff::diff_localizations(&old_metadata, &metadata);

    let package_diff =
        diff::diff_packages(&ctx.old_state.paths, &ctx.new_paths, &title, metadata_changed);
    info!(
        title,
        created = package_diff.created.len(),
        updated = package_diff.updated.len(),
        deleted = package_diff.deleted.len(),
        "package diff"
    );

    let mut tasks: JoinSet<package::PackageOutcome> = JoinSet::new();
    for name in package_diff.created {
        let ctx = Arc::clone(&ctx);
        let title = title.clone();
        let metadata = metadata.clone();
        tasks.spawn(async move { package::created(ctx, title, name, metadata).await });
    }
    for name in package_diff.updated {
        let ctx = Arc::clone(&ctx);
        let title = title.clone();
        let metadata = metadata.clone();
        tasks.spawn(async move { package::updated(ctx, title, name, metadata).await });
    }
    for name in package_diff.deleted {
        let ctx = Arc::clone(&ctx);
        let title = title.clone();
        let old_localizations: Vec<String> = old_metadata.localizations.keys().cloned().collect();
        tasks.spawn(async move { package::deleted(ctx, title, name, old_localizations).await });
    }

    let mut failures = Vec::new();
    let mut failed_packages = std::collections::BTreeSet::new();
    let mut fatal = false;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                if !outcome.failures.is_empty() {
                    failed_packages.insert(outcome.package.clone());
                    failures.extend(outcome.failures);
                }
            }
            Err(error) => {
                fatal = true;
                failures.push(Failure::new(
                    entity(&title),
                    BuildError::processor(&title, format!("a package task panicked: {error}")),
                ));
            }
        }
    }

    for name in &localization_diff.deleted {
        info!(title, localization = %name, "deleting localized output");
        let dir = ctx.abs(&paths::dist_build_game(profile, &title, Some(name)));
        if let Err(error) = fsops::remove_dir_all(&dir).await {
            failures.push(Failure::new(entity(&title), error));
            fatal = true;
        }
    }

    // HTML shells and icons refresh only when the title's own inputs moved.
    let display_name = match profile {
        Profile::Watch => format!("DEVELOPMENT BUILD - {}", metadata.name),
        Profile::OneOff => metadata.name.clone(),
    };
    if metadata_changed || icon_changed {
        if let Err(error) = html::emit(&ctx, &title, None, &display_name).await {
            failures.push(Failure::new(entity(&title), error));
            fatal = true;
        }
    }
    for (name, localized) in &metadata.localizations {
        let localized_icon_path = paths::src_game_localization_icon(&title, name);
        let localized_icon_changed = ctx.old_state.paths.get(&localized_icon_path)
            != ctx.new_paths.get(&localized_icon_path);
        let refreshed = localization_diff.created.contains(name)
            || localization_diff.updated.contains(name);
        if metadata_changed || icon_changed || localized_icon_changed || refreshed {
            let localized_name = match profile {
                Profile::Watch => format!("DEVELOPMENT BUILD - {}", localized.name),
                Profile::OneOff => localized.name.clone(),
            };
            if let Err(error) = html::emit(&ctx, &title, Some(name), &localized_name).await {
                failures.push(Failure::new(entity(&title), error));
                fatal = true;
            }
        }
    }

    let mut outcome = TitleOutcome {
        failures,
        ..TitleOutcome::default()
    };
    if fatal {
        warn!(title, "title failed; it will be rebuilt from scratch next run");
        return outcome;
    }
    for (path, fingerprint) in &ctx.new_paths {
        if paths::title_of(path) != Some(title.as_str()) {
            continue;
        }
        if let Some(package) = paths::package_of(path) {
            if failed_packages.contains(package) {
                continue;
            }
        }
        outcome.delta.paths.insert(path.clone(), *fingerprint);
    }
    outcome
        .delta
        .games
        .insert(title.clone(), TitleState { metadata });
    outcome
}

pub(crate) async fn deleted(ctx: Arc<BuildContext>, title: String) -> TitleOutcome {
    info!(title, "deleting title");
    let profile = ctx.options.profile;
    for dir in [
        paths::temp_build_game(profile, &title),
        paths::dist_build_game(profile, &title, None),
    ] {
        if let Err(error) = fsops::remove_dir_all(&ctx.abs(&dir)).await {
            return TitleOutcome::failed(entity(&title), error);
        }
    }
    TitleOutcome::default()
}
