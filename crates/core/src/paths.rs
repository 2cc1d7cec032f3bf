//! Path grammar
//!
//! Pure functions mapping between filesystem paths and the logical
//! identifiers (title, package, file, localization) they encode, plus
//! construction of working- and output-directory paths for every artifact
//! kind. All paths are forward-slash normalized strings. The fixed grammar
//! segments (`src`, `games`, `packages`, `localizations`) match
//! case-insensitively; title/package/localization names are case-sensitive.

use crate::content::AudioFormat;
use crate::error::BuildError;
use crate::profile::Profile;

pub const SRC: &str = "src";
pub const TEMP: &str = "temp";
pub const DIST: &str = "dist";

const GAMES: &str = "games";
const PACKAGES: &str = "packages";
const LOCALIZATIONS: &str = "localizations";

/// Joins path fragments into one normalized forward-slash path.
///
/// Fragments are split on both `/` and `\` and empty pieces are dropped, so
/// `join(&["a\\b//", "c"])` is `"a/b/c"`.
pub fn join(fragments: &[&str]) -> String {
    fragments
        .iter()
        .flat_map(|fragment| fragment.split(['/', '\\']))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|piece| !piece.is_empty()).collect()
}

fn is_fixed(segment: &str, fixed: &str) -> bool {
    segment.eq_ignore_ascii_case(fixed)
}

/// Returns the title a normalized source path belongs to, if any.
///
/// Matches `src/games/<title>/...` with at least one segment after the
/// title, the same shape the original catalogue layout uses.
pub fn title_of(path: &str) -> Option<&str> {
    let segs = segments(path);
    if segs.len() >= 4 && is_fixed(segs[0], SRC) && is_fixed(segs[1], GAMES) {
        Some(segs[2])
    } else {
        None
    }
}

/// Returns the package a normalized source path belongs to, if any.
///
/// Matches `src/games/<title>/packages/<package>/...` with at least one
/// segment after the package name.
pub fn package_of(path: &str) -> Option<&str> {
    let segs = segments(path);
    if segs.len() >= 6
        && is_fixed(segs[0], SRC)
        && is_fixed(segs[1], GAMES)
        && is_fixed(segs[3], PACKAGES)
    {
        Some(segs[4])
    } else {
        None
    }
}

/// Returns the `(title, localization)` of a title-level localized asset
/// path (`src/games/<title>/localizations/<loc>/...`), if any.
pub fn title_localization_of(path: &str) -> Option<(&str, &str)> {
    let segs = segments(path);
    if segs.len() >= 6
        && is_fixed(segs[0], SRC)
        && is_fixed(segs[1], GAMES)
        && is_fixed(segs[3], LOCALIZATIONS)
    {
        Some((segs[2], segs[4]))
    } else {
        None
    }
}

/// The decomposed identity of one package source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFileParts {
    pub title: String,
    pub package: String,
    pub localization: Option<String>,
    /// File name without extension; may itself contain `/`.
    pub stem: String,
    /// Extension after the final dot, lowercased for dispatch.
    pub extension: String,
}

impl PackageFileParts {
    /// Parses a normalized source path of the shape
    /// `src/games/<title>/packages/<package>[/localizations/<loc>]/<stem>.<ext>`.
    ///
    /// Callers feed paths already recognized by [`package_of`], so a failure
    /// here is a programming-error class, not user input to be tolerated.
    pub fn parse(path: &str) -> Result<Self, BuildError> {
        let malformed = |reason: &str| BuildError::MalformedPath {
            path: path.to_owned(),
            reason: reason.to_owned(),
        };

        let segs = segments(path);
        if segs.len() < 6
            || !is_fixed(segs[0], SRC)
            || !is_fixed(segs[1], GAMES)
            || !is_fixed(segs[3], PACKAGES)
        {
            return Err(malformed(
                "expected src/games/<title>/packages/<package>/<file>.<ext>",
            ));
        }

        let title = segs[2].to_owned();
        let package = segs[4].to_owned();

        let mut rest = &segs[5..];
        let mut localization = None;
        if rest.len() >= 3 && is_fixed(rest[0], LOCALIZATIONS) {
            localization = Some(rest[1].to_owned());
            rest = &rest[2..];
        }

        let file = rest.join("/");
        let after_slash = file.rfind('/').map_or(0, |slash| slash + 1);
        let dot = match file.rfind('.') {
            Some(dot) if dot > after_slash && dot + 1 < file.len() => dot,
            _ => return Err(malformed("file name has no extension")),
        };

        Ok(Self {
            title,
            package,
            localization,
            stem: file[..dot].to_owned(),
            extension: file[dot + 1..].to_ascii_lowercase(),
        })
    }

    /// Reconstructs the source path this was parsed from.
    pub fn source_path(&self) -> String {
        src_game_package_file(
            &self.title,
            &self.package,
            self.localization.as_deref(),
            &self.stem,
            &self.extension,
        )
    }
}

// Source tree.

pub fn src_game(title: &str) -> String {
    join(&[SRC, GAMES, title])
}

pub fn src_game_metadata(title: &str) -> String {
    join(&[&src_game(title), "metadata.json"])
}

pub fn src_game_icon(title: &str) -> String {
    join(&[&src_game(title), "icon.svg"])
}

pub fn src_game_localization_icon(title: &str, localization: &str) -> String {
    join(&[&src_game(title), LOCALIZATIONS, localization, "icon.svg"])
}

pub fn src_game_package_file(
    title: &str,
    package: &str,
    localization: Option<&str>,
    stem: &str,
    extension: &str,
) -> String {
    let file = format!("{stem}.{extension}");
    match localization {
        Some(loc) => join(&[&src_game(title), PACKAGES, package, LOCALIZATIONS, loc, &file]),
        None => join(&[&src_game(title), PACKAGES, package, &file]),
    }
}

// Working directory.

pub fn temp_build(profile: Profile) -> String {
    join(&[TEMP, profile.dir_name()])
}

pub fn temp_build_state(profile: Profile) -> String {
    join(&[&temp_build(profile), "state.json"])
}

pub fn temp_build_game(profile: Profile, title: &str) -> String {
    join(&[&temp_build(profile), GAMES, title])
}

pub fn temp_build_game_package(
    profile: Profile,
    title: &str,
    package: &str,
    localization: Option<&str>,
) -> String {
    let base = join(&[&temp_build_game(profile, title), PACKAGES, package]);
    match localization {
        Some(loc) => join(&[&base, LOCALIZATIONS, loc]),
        None => base,
    }
}

/// The generated typed declaration for a package, regenerated on every pack.
pub fn temp_build_game_package_code(profile: Profile, title: &str, package: &str) -> String {
    join(&[&temp_build_game_package(profile, title, package, None), "code.ts"])
}

/// Per-file working directory (holds the processor's cache).
pub fn temp_build_game_package_file(
    profile: Profile,
    title: &str,
    package: &str,
    localization: Option<&str>,
    stem: &str,
    extension: &str,
) -> String {
    join(&[
        &temp_build_game_package(profile, title, package, localization),
        "files",
        &format!("{stem}.{extension}"),
    ])
}

pub fn temp_build_game_package_file_cache(
    profile: Profile,
    title: &str,
    package: &str,
    localization: Option<&str>,
    stem: &str,
    extension: &str,
) -> String {
    join(&[
        &temp_build_game_package_file(profile, title, package, localization, stem, extension),
        "cache.json",
    ])
}

// Output directory.

pub fn dist_build(profile: Profile) -> String {
    join(&[DIST, profile.dir_name()])
}

pub fn dist_build_game(profile: Profile, title: &str, localization: Option<&str>) -> String {
    let base = join(&[&dist_build(profile), title]);
    match localization {
        Some(loc) => join(&[&base, loc]),
        None => base,
    }
}

pub fn dist_build_game_file(
    profile: Profile,
    title: &str,
    localization: Option<&str>,
    name: &str,
) -> String {
    join(&[&dist_build_game(profile, title, localization), name])
}

/// Packed payload artifact for one (package, localization, format) tuple.
pub fn dist_build_game_package(
    profile: Profile,
    title: &str,
    localization: Option<&str>,
    package: &str,
    format: AudioFormat,
) -> String {
    dist_build_game_file(
        profile,
        title,
        localization,
        &format!("{package}-{format}.txt"),
    )
}

pub fn dist_build_game_html(profile: Profile, title: &str, localization: Option<&str>) -> String {
    dist_build_game_file(profile, title, localization, "index.html")
}

pub fn dist_build_game_icon(profile: Profile, title: &str, localization: Option<&str>) -> String {
    dist_build_game_file(profile, title, localization, "icon.svg")
}
