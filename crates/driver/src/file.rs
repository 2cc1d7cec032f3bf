//! Per-file build handlers
//!
//! Creating a file runs its processor and writes the resulting items to
//! `cache.json` inside the file's working directory. An update is a
//! deletion followed by a creation; there is no in-place refresh. A file
//! with no processor logs a warning and caches an empty item map rather
//! than failing its package.

use std::sync::Arc;

use pp_core::paths::PackageFileParts;
use pp_core::{paths, BuildError, GeneratedItems};
use pp_process::{process, ProcessContext, ProcessorKind};
use tracing::{info, warn};

use crate::build::BuildContext;
use crate::fsops;
use crate::report::Failure;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Created,
    Updated,
    Deleted,
}

pub(crate) async fn apply(
    ctx: Arc<BuildContext>,
    parts: PackageFileParts,
    op: Op,
) -> Result<(), Failure> {
    let logical = parts.source_path();
    let entity = format!("file \"{logical}\"");
    let fail = |error: BuildError| Failure::new(entity.clone(), error);

    let _permit = ctx
        .file_permits
        .acquire()
        .await
        .map_err(|_| fail(BuildError::processor(&logical, "the build was shut down")))?;

    match op {
        Op::Created => create(&ctx, &parts, &logical).await.map_err(fail),
        Op::Updated => {
            delete(&ctx, &parts).await.map_err(&fail)?;
            create(&ctx, &parts, &logical).await.map_err(fail)
        }
        Op::Deleted => delete(&ctx, &parts).await.map_err(fail),
    }
}

async fn create(
    ctx: &BuildContext,
    parts: &PackageFileParts,
    logical: &str,
) -> Result<(), BuildError> {
    info!(path = %logical, "processing");
    let dir = ctx.abs(&paths::temp_build_game_package_file(
        ctx.options.profile,
        &parts.title,
        &parts.package,
        parts.localization.as_deref(),
        &parts.stem,
        &parts.extension,
    ));
    fsops::create_dir_all(&dir).await?;

    let items = match ProcessorKind::from_extension(&parts.extension) {
        Some(kind) => {
            let source_path = ctx.abs(logical);
            let context = ProcessContext {
                source_path: &source_path,
                logical_path: logical,
                stem: &parts.stem,
                audio_formats: &ctx.options.audio_formats,
            };
            process(kind, &context).await?
        }
        None => {
            warn!(
                path = %logical,
                extension = %parts.extension,
                "no processor for this extension; it contributes no content"
            );
            GeneratedItems::new()
        }
    };

    let cache = serde_json::to_string(&items)
        .map_err(|error| BuildError::processor(logical, format!("unserializable items: {error}")))?;
    fsops::write(&dir.join("cache.json"), cache).await
}

async fn delete(ctx: &BuildContext, parts: &PackageFileParts) -> Result<(), BuildError> {
    let dir = ctx.abs(&paths::temp_build_game_package_file(
        ctx.options.profile,
        &parts.title,
        &parts.package,
        parts.localization.as_deref(),
        &parts.stem,
        &parts.extension,
    ));
    info!(path = %dir.display(), "deleting file working directory");
    fsops::remove_dir_all(&dir).await
}
