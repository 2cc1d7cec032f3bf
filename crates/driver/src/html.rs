//! HTML shell and icon output
//!
//! Every output directory (the title's base directory and one per declared
//! localization) gets an `index.html` shell that loads the game script, and
//! a copy of the most specific icon available. One-off builds collapse the
//! template's inter-tag whitespace; watch builds keep it readable.

use pp_core::{paths, BuildError, Profile};
use tracing::info;

use crate::build::BuildContext;
use crate::fsops;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Renders the HTML shell for one output directory.
pub(crate) fn render(display_name: &str, minify: bool) -> String {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{name}</title>
<meta name="viewport" content="initial-scale=1, minimum-scale=1, maximum-scale=1, width=device-width, height=device-height, user-scalable=no">
<link rel="icon" type="image/svg+xml" href="icon.svg">
</head>
<body style="background: black; color: white;">
<div id="message" style="position: fixed; font-family: sans-serif; font-size: 0.5cm; top: 50%; line-height: 0.5cm; transform: translateY(-50%); left: 0; right: 0; text-align: center;">Loading; please ensure that JavaScript is enabled.</div>
<script src="index.js"></script>
</body>
</html>"#,
        name = escape(display_name)
    );
    if minify {
        html.lines().map(str::trim).collect()
    } else {
        html
    }
}

/// Writes the shell and icon for one output directory of a title.
pub(crate) async fn emit(
    ctx: &BuildContext,
    title: &str,
    localization: Option<&str>,
    display_name: &str,
) -> Result<(), BuildError> {
    let profile = ctx.options.profile;
    let html_path = ctx.abs(&paths::dist_build_game_html(profile, title, localization));
    info!(path = %html_path.display(), "writing HTML shell");
    let html = render(display_name, profile == Profile::OneOff);
    fsops::write(&html_path, html).await?;

    // The localization's own icon wins over the title icon when present.
    let icon_source = localization
        .map(|name| paths::src_game_localization_icon(title, name))
        .filter(|path| ctx.new_paths.contains_key(path))
        .unwrap_or_else(|| paths::src_game_icon(title));
    let icon_path = ctx.abs(&paths::dist_build_game_icon(profile, title, localization));
    fsops::copy(&ctx.abs(&icon_source), &icon_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_output_keeps_line_structure() {
        let html = render("Pond", false);
        assert!(html.starts_with("<!DOCTYPE html>\n<html>"));
        assert!(html.contains("<title>Pond</title>"));
        assert!(html.contains("index.js"));
        assert!(html.contains("Loading; please ensure that JavaScript is enabled."));
    }

    #[test]
    fn one_off_output_is_collapsed() {
        let html = render("Pond", true);
        assert!(!html.contains('\n'));
        assert!(html.starts_with("<!DOCTYPE html><html>"));
    }

    #[test]
    fn display_name_is_escaped() {
        let html = render("Fish & <Chips>", false);
        assert!(html.contains("<title>Fish &amp; &lt;Chips&gt;</title>"));
    }
}
