//! Per-package build handlers
//!
//! A package fans out its changed files, waits for them, then packs: the
//! per-file caches are collected into a namespace and serialized once per
//! (localization, format) pair, plus one typed declaration. Any failure
//! inside a package aborts only that package; its file paths stay out of
//! the committed state so the next run retries it.

use std::collections::BTreeMap;
use std::sync::Arc;

use pp_core::paths::PackageFileParts;
use pp_core::{diff, paths, AudioFormat, BuildError, ContentItem, GeneratedItems, TitleMetadata};
use pp_pack::{serialize_code, serialize_payload, Namespace};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::build::BuildContext;
use crate::file;
use crate::fsops;
use crate::report::Failure;

#[derive(Debug)]
pub(crate) struct PackageOutcome {
    pub package: String,
    pub failures: Vec<Failure>,
}

impl PackageOutcome {
    fn ok(package: String) -> Self {
        Self {
            package,
            failures: Vec::new(),
        }
    }

    fn failed(package: String, entity: String, error: BuildError) -> Self {
        Self {
            package,
            failures: vec![Failure::new(entity, error)],
        }
    }
}

fn entity(title: &str, package: &str) -> String {
    format!("package \"{title}/{package}\"")
}

pub(crate) async fn created(
    ctx: Arc<BuildContext>,
    title: String,
    package: String,
    metadata: TitleMetadata,
) -> PackageOutcome {
    info!(title, package, "creating package");
    let dir = ctx.abs(&paths::temp_build_game_package(
        ctx.options.profile,
        &title,
        &package,
        None,
    ));
    if let Err(error) = fsops::create_dir_all(&dir).await {
        return PackageOutcome::failed(package.clone(), entity(&title, &package), error);
    }
    updated(ctx, title, package, metadata).await
}

pub(crate) async fn updated(
    ctx: Arc<BuildContext>,
    title: String,
    package: String,
    metadata: TitleMetadata,
) -> PackageOutcome {
    info!(title, package, "updating package");
    let entity = entity(&title, &package);

    let file_diff = diff::diff_files(&ctx.old_state.paths, &ctx.new_paths, &title, &package);
    let mut tasks: JoinSet<Result<(), Failure>> = JoinSet::new();
    for (changed, op) in [
        (&file_diff.created, file::Op::Created),
        (&file_diff.updated, file::Op::Updated),
        (&file_diff.deleted, file::Op::Deleted),
    ] {
        for path in changed {
            let parts = match PackageFileParts::parse(path) {
                Ok(parts) => parts,
                Err(error) => {
                    return PackageOutcome::failed(package.clone(), entity.clone(), error);
                }
            };
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move { file::apply(ctx, parts, op).await });
        }
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => failures.push(failure),
            Err(error) => failures.push(Failure::new(
                entity.clone(),
                BuildError::processor(&package, format!("a file task panicked: {error}")),
            )),
        }
    }
    if !failures.is_empty() {
        return PackageOutcome { package, failures };
    }

    pack(&ctx, &title, &package, &metadata).await.map_or_else(
        |error| PackageOutcome::failed(package.clone(), entity.clone(), error),
        |()| PackageOutcome::ok(package.clone()),
    )
}

/// Collects every surviving file's cache and serializes the package's
/// artifacts: one payload per (localization, format) pair and one typed
/// declaration.
async fn pack(
    ctx: &BuildContext,
    title: &str,
    package: &str,
    metadata: &TitleMetadata,
) -> Result<(), BuildError> {
    info!(title, package, "collecting files");
    let profile = ctx.options.profile;

    let mut base_items: BTreeMap<String, ContentItem> = BTreeMap::new();
    let mut localized_items: BTreeMap<String, BTreeMap<String, ContentItem>> = metadata
        .localizations
        .keys()
        .map(|name| (name.clone(), BTreeMap::new()))
        .collect();

    for path in ctx.new_paths.keys() {
        if paths::title_of(path) != Some(title) || paths::package_of(path) != Some(package) {
            continue;
        }
        let parts = PackageFileParts::parse(path)?;

        let scope = match &parts.localization {
            None => &mut base_items,
            Some(name) => match localized_items.get_mut(name) {
                Some(scope) => scope,
                None => {
                    warn!(
                        path = %path,
                        localization = %name,
                        "file is scoped to a localization the title does not declare; skipping"
                    );
                    continue;
                }
            },
        };

        let cache_path = ctx.abs(&paths::temp_build_game_package_file_cache(
            profile,
            &parts.title,
            &parts.package,
            parts.localization.as_deref(),
            &parts.stem,
            &parts.extension,
        ));
        let cache_text = fsops::read_to_string(&cache_path).await?;
        let items: GeneratedItems =
            serde_json::from_str(&cache_text).map_err(|source| BuildError::State {
                path: cache_path.display().to_string(),
                source,
            })?;

        for (key, item) in items {
            if scope.insert(key.clone(), item).is_some() {
                return Err(BuildError::NamingConflict {
                    package: package.to_owned(),
                    reason: format!(
                        "\"{key}\" is the name of two pieces of content in package \
                         \"{package}\""
                    ),
                });
            }
        }
    }

    // One payload scope per output directory: the base package plus, for
    // every declared localization, the base items overridden by that
    // localization's items.
    let mut scopes: Vec<(Option<String>, BTreeMap<String, ContentItem>)> =
        vec![(None, base_items.clone())];
    for (name, items) in &localized_items {
        let mut merged = base_items.clone();
        merged.extend(items.clone());
        scopes.push((Some(name.clone()), merged));
    }

    for (localization, items) in scopes {
        let namespace = build_namespace(package, items)?;
        for format in &ctx.options.audio_formats {
            let artifact = serialize_payload(&namespace, *format)?;
            let artifact_path = ctx.abs(&paths::dist_build_game_package(
                profile,
                title,
                localization.as_deref(),
                package,
                *format,
            ));
            info!(path = %artifact_path.display(), "writing package artifact");
            fsops::write(&artifact_path, artifact).await?;
        }
    }

    // The declaration is written once, from the base items plus the first
    // declared localization; localized items only override payloads, never
    // the shape.
    let mut declared = base_items;
    if let Some(items) = localized_items.values().next() {
        declared.extend(items.clone());
    }
    let namespace = build_namespace(package, declared)?;
    let code_path = ctx.abs(&paths::temp_build_game_package_code(profile, title, package));
    info!(path = %code_path.display(), "writing typed declaration");
    fsops::write(&code_path, serialize_code(&namespace)).await?;
    Ok(())
}

fn build_namespace(
    package: &str,
    items: BTreeMap<String, ContentItem>,
) -> Result<Namespace, BuildError> {
    let mut namespace = Namespace::new(package);
    for (key, item) in items {
        namespace.insert(&key, item)?;
    }
    Ok(namespace)
}

pub(crate) async fn deleted(
    ctx: Arc<BuildContext>,
    title: String,
    package: String,
    old_localizations: Vec<String>,
) -> PackageOutcome {
    info!(title, package, "deleting package");
    let profile = ctx.options.profile;

    let dir = ctx.abs(&paths::temp_build_game_package(profile, &title, &package, None));
    if let Err(error) = fsops::remove_dir_all(&dir).await {
        return PackageOutcome::failed(package.clone(), entity(&title, &package), error);
    }

    let mut localizations: Vec<Option<&str>> = vec![None];
    localizations.extend(old_localizations.iter().map(|name| Some(name.as_str())));
    for localization in localizations {
        for format in AudioFormat::ALL {
            let artifact = ctx.abs(&paths::dist_build_game_package(
                profile,
                &title,
                localization,
                &package,
                format,
            ));
            if let Err(error) = fsops::remove_file(&artifact).await {
                return PackageOutcome::failed(package.clone(), entity(&title, &package), error);
            }
        }
    }
    PackageOutcome::ok(package)
}
