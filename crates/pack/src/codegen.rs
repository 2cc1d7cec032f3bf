//! Typed declaration generation
//!
//! Emits a TypeScript `type` alias describing the packed shape of a package:
//! directories become readonly object types (or tuple types when coerced to
//! arrays), and each leaf emits its processor-supplied `code` expression
//! verbatim. The declaration mirrors the payload index node for node.

use std::collections::BTreeMap;

use crate::namespace::{as_array, Namespace, Node};

fn code_of_node(node: &Node, indents: usize) -> String {
    match node {
        Node::Leaf(item) => item.code().to_owned(),
        Node::Directory(children) => code_of_directory(children, indents),
    }
}

fn code_of_directory(children: &BTreeMap<String, Node>, indents: usize) -> String {
    let inner = "\t".repeat(indents + 1);
    let outer = "\t".repeat(indents);

    if let Some(elements) = as_array(children) {
        let mut output = String::from("[");
        for (position, node) in elements.iter().enumerate() {
            if position > 0 {
                output.push(',');
            }
            output.push('\n');
            output.push_str(&inner);
            output.push_str(&code_of_node(node, indents + 1));
        }
        output.push('\n');
        output.push_str(&outer);
        output.push(']');
        output
    } else {
        let mut output = String::from("{");
        let mut first = true;
        for (key, node) in children {
            if first {
                first = false;
            } else {
                output.push(',');
            }
            output.push('\n');
            output.push_str(&inner);
            // JSON string quoting also covers keys needing escapes.
            output.push_str(&format!(
                "readonly {}: {}",
                serde_json::Value::String(key.clone()),
                code_of_node(node, indents + 1)
            ));
        }
        output.push('\n');
        output.push_str(&outer);
        output.push('}');
        output
    }
}

/// Renders the full declaration, `type <package> = <body>`.
pub fn serialize_code(namespace: &Namespace) -> String {
    format!(
        "type {} = {}",
        namespace.package(),
        code_of_directory(namespace.root(), 0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_core::ContentItem;

    fn item(code: &str) -> ContentItem {
        ContentItem::NonAudio {
            code: code.to_owned(),
            payload: Vec::new(),
        }
    }

    #[test]
    fn nested_objects_are_tab_indented() {
        let mut namespace = Namespace::new("sprites");
        namespace.insert("fish/big", item("engineSvg")).unwrap();
        namespace.insert("fish/small", item("engineSvg")).unwrap();
        namespace.insert("weed", item("engineSvg")).unwrap();

        assert_eq!(
            serialize_code(&namespace),
            "type sprites = {\n\
             \treadonly \"fish\": {\n\
             \t\treadonly \"big\": engineSvg,\n\
             \t\treadonly \"small\": engineSvg\n\
             \t},\n\
             \treadonly \"weed\": engineSvg\n\
             }"
        );
    }

    #[test]
    fn coerced_arrays_render_as_tuples() {
        let mut namespace = Namespace::new("frames");
        namespace.insert("walk/0", item("engineSvg")).unwrap();
        namespace.insert("walk/1", item("engineSvg")).unwrap();

        assert_eq!(
            serialize_code(&namespace),
            "type frames = {\n\
             \treadonly \"walk\": [\n\
             \t\tengineSvg,\n\
             \t\tengineSvg\n\
             \t]\n\
             }"
        );
    }

    #[test]
    fn empty_package_renders_as_an_empty_tuple() {
        assert_eq!(serialize_code(&Namespace::new("empty")), "type empty = [\n]");
    }

    #[test]
    fn escaped_keys_are_json_quoted() {
        let mut namespace = Namespace::new("sprites");
        namespace.insert("fish/layer/", item("engineSvg")).unwrap();
        namespace.insert("fish/tag\\", item("engineSvg")).unwrap();

        let code = serialize_code(&namespace);
        assert!(code.contains("readonly \"/\": engineSvg"));
        assert!(code.contains("readonly \"\\\\\": engineSvg"));
    }
}
