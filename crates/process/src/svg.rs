//! SVG processor
//!
//! Plain SVG files pass through as a single content item. Inkscape documents
//! with more than one layer are split into one item per layer: each layer's
//! document is the original source text with every other layer's byte range
//! excised and the layer's own `style` attribute dropped, which re-shows
//! layers hidden in the editor. Shared `<defs>` survive in every layer.

use std::ops::Range;

use pp_core::{paths, BuildError, ContentItem, GeneratedItems};
use tracing::debug;

use crate::ProcessContext;

const INKSCAPE_NS: &str = "http://www.inkscape.org/namespaces/inkscape";
const SODIPODI_NS: &str = "http://sodipodi.sourceforge.net/DTD/sodipodi-0.0.dtd";

pub(crate) async fn process(ctx: &ProcessContext<'_>) -> Result<GeneratedItems, BuildError> {
    let text = tokio::fs::read_to_string(ctx.source_path)
        .await
        .map_err(|error| BuildError::io(ctx.logical_path, error))?;

    let layers = split_layers(&text, ctx.stem)
        .map_err(|reason| BuildError::processor(ctx.logical_path, reason))?;

    let mut items = GeneratedItems::new();
    for (key, document) in layers {
        items.insert(
            key,
            ContentItem::NonAudio {
                code: "engineSvg".to_owned(),
                payload: document.into_bytes(),
            },
        );
    }
    Ok(items)
}

/// Builds the item key for one layer. A label that is or ends with a path
/// separator gets an escape suffix so the final key segment is the literal
/// separator rather than being swallowed by path normalization.
fn layer_key(stem: &str, label: &str) -> String {
    let mut key = paths::join(&[stem, label]);
    if label.ends_with('/') {
        key.push_str("//");
    } else if label.ends_with('\\') {
        key.push_str("/\\");
    }
    key
}

/// Splits an SVG document into `(key, document)` pairs.
///
/// An Inkscape document is one whose root children, ignoring `sodipodi:*`
/// and `metadata` elements, are only `<defs>` and layer `<g>` elements.
/// Anything else, or an Inkscape document with a single layer, stays whole.
pub(crate) fn split_layers(text: &str, stem: &str) -> Result<Vec<(String, String)>, String> {
    let document =
        roxmltree::Document::parse(text).map_err(|error| format!("invalid XML: {error}"))?;
    let root = document.root_element();
    if root.tag_name().name() != "svg" {
        return Err("the file contains no <svg> root element".to_owned());
    }

    let mut relevant = 0usize;
    let mut shared = 0usize;
    let mut layers = Vec::new();
    for child in root.children().filter(roxmltree::Node::is_element) {
        let name = child.tag_name();
        if name.namespace() == Some(SODIPODI_NS) || name.name() == "metadata" {
            continue;
        }
        relevant += 1;
        if name.name() == "defs" {
            shared += 1;
        } else if name.name() == "g"
            && child.attribute((INKSCAPE_NS, "groupmode")) == Some("layer")
        {
            layers.push(child);
        }
    }

    let is_inkscape = shared + layers.len() == relevant;
    if !is_inkscape || layers.len() < 2 {
        debug!(stem, is_inkscape, "not splitting");
        return Ok(vec![(stem.to_owned(), text.to_owned())]);
    }

    let mut results = Vec::with_capacity(layers.len());
    for layer in &layers {
        let label = layer.attribute((INKSCAPE_NS, "label")).unwrap_or("");
        let key = layer_key(stem, label);

        let mut spans: Vec<Range<usize>> = layers
            .iter()
            .filter(|other| other.id() != layer.id())
            .map(|other| other.range())
            .collect();
        if let Some(span) = style_attr_span(text, layer.range().start) {
            spans.push(span);
        }
        // Excise back-to-front so earlier spans stay valid.
        spans.sort_by(|a, b| b.start.cmp(&a.start));

        let mut layer_document = text.to_owned();
        for span in spans {
            layer_document.replace_range(span, "");
        }
        results.push((key, layer_document));
    }
    Ok(results)
}

/// Finds the end of the open tag starting at `open_start`, skipping `>`
/// characters inside quoted attribute values.
fn open_tag_end(text: &str, open_start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    for (offset, byte) in bytes[open_start..].iter().enumerate() {
        match quote {
            Some(q) if *byte == q => quote = None,
            Some(_) => {}
            None => match byte {
                b'"' | b'\'' => quote = Some(*byte),
                b'>' => return Some(open_start + offset),
                _ => {}
            },
        }
    }
    None
}

/// Locates the byte range of the unprefixed `style` attribute (including its
/// leading whitespace) inside the open tag beginning at `open_start`.
fn style_attr_span(text: &str, open_start: usize) -> Option<Range<usize>> {
    let open_end = open_tag_end(text, open_start)?;
    let tag = &text[open_start..open_end];
    let bytes = tag.as_bytes();

    let mut search = 0;
    while let Some(offset) = tag[search..].find("style") {
        let name_start = search + offset;
        search = name_start + "style".len();

        if name_start == 0 || !bytes[name_start - 1].is_ascii_whitespace() {
            continue;
        }
        let mut cursor = name_start + "style".len();
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || bytes[cursor] != b'=' {
            continue;
        }
        cursor += 1;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= bytes.len() || (bytes[cursor] != b'"' && bytes[cursor] != b'\'') {
            continue;
        }
        let quote = bytes[cursor];
        cursor += 1;
        while cursor < bytes.len() && bytes[cursor] != quote {
            cursor += 1;
        }
        if cursor >= bytes.len() {
            return None;
        }
        return Some(open_start + name_start - 1..open_start + cursor + 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const INKSCAPE_DOC: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.0.dtd">
<sodipodi:namedview id="base"/>
<metadata id="meta"/>
<defs><linearGradient id="shared"/></defs>
<g inkscape:groupmode="layer" inkscape:label="background" style="display:none"><rect id="bg"/></g>
<g inkscape:groupmode="layer" inkscape:label="fish"><circle id="fg"/></g>
</svg>"#;

    #[test]
    fn plain_svg_is_one_item() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;
        let layers = split_layers(text, "card").unwrap();
        assert_eq!(layers, vec![("card".to_owned(), text.to_owned())]);
    }

    #[test]
    fn single_layer_inkscape_document_is_not_split() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
<g inkscape:groupmode="layer" inkscape:label="only"><rect/></g>
</svg>"#;
        let layers = split_layers(text, "card").unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].0, "card");
        assert_eq!(layers[0].1, text);
    }

    #[test]
    fn foreign_root_children_disable_splitting() {
        let text = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
<rect/>
<g inkscape:groupmode="layer" inkscape:label="a"><rect/></g>
<g inkscape:groupmode="layer" inkscape:label="b"><rect/></g>
</svg>"#;
        assert_eq!(split_layers(text, "card").unwrap().len(), 1);
    }

    #[test]
    fn multi_layer_document_splits_per_layer() {
        let layers = split_layers(INKSCAPE_DOC, "card").unwrap();
        assert_eq!(layers.len(), 2);

        let (background_key, background) = &layers[0];
        assert_eq!(background_key, "card/background");
        assert!(background.contains("id=\"bg\""));
        assert!(!background.contains("id=\"fg\""));
        assert!(background.contains("id=\"shared\""));

        let (fish_key, fish) = &layers[1];
        assert_eq!(fish_key, "card/fish");
        assert!(fish.contains("id=\"fg\""));
        assert!(!fish.contains("id=\"bg\""));
        assert!(fish.contains("id=\"shared\""));
    }

    #[test]
    fn hidden_layers_are_reshown() {
        let layers = split_layers(INKSCAPE_DOC, "card").unwrap();
        let (_, background) = &layers[0];
        assert!(!background.contains("display:none"));
        assert!(background.contains("inkscape:label=\"background\""));
    }

    #[test]
    fn split_documents_stay_parseable() {
        for (_, document) in split_layers(INKSCAPE_DOC, "card").unwrap() {
            roxmltree::Document::parse(&document).unwrap();
        }
    }

    #[test]
    fn separator_labels_get_the_escape_suffix() {
        assert_eq!(layer_key("card", "glow"), "card/glow");
        assert_eq!(layer_key("card", "glow/"), "card/glow//");
        assert_eq!(layer_key("card", "/"), "card//");
        assert_eq!(layer_key("card", "glow\\"), "card/glow/\\");
        assert_eq!(layer_key("card", "a/b"), "card/a/b");
    }

    #[test]
    fn invalid_xml_is_an_error() {
        assert!(split_layers("<svg", "card").is_err());
    }

    #[test]
    fn non_svg_root_is_an_error() {
        assert!(split_layers("<html></html>", "card").is_err());
    }
}
