//! Payload artifact serialization
//!
//! One artifact per requested audio format. The artifact is a compact JSON
//! index (leaves become `[offset, length]` spans) followed by a newline and
//! the concatenated raw payload bytes the spans address.

use std::collections::BTreeMap;

use pp_core::{AudioFormat, BuildError, ContentItem};
use serde_json::{json, Value};

use crate::namespace::{as_array, Namespace, Node};

fn payload_of<'a>(
    item: &'a ContentItem,
    format: AudioFormat,
    package: &str,
) -> Result<&'a [u8], BuildError> {
    match item {
        ContentItem::NonAudio { payload, .. } => Ok(payload),
        ContentItem::Audio {
            payload_by_format, ..
        } => payload_by_format
            .get(&format)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                BuildError::NamingConflict {
                    package: package.to_owned(),
                    reason: format!("an audio item has no payload for format \"{format}\""),
                }
            }),
    }
}

fn index_of_node(
    node: &Node,
    format: AudioFormat,
    package: &str,
    buffer: &mut Vec<u8>,
) -> Result<Value, BuildError> {
    match node {
        Node::Leaf(item) => {
            let payload = payload_of(item, format, package)?;
            let offset = buffer.len();
            buffer.extend_from_slice(payload);
            Ok(json!([offset, payload.len()]))
        }
        Node::Directory(children) => index_of_directory(children, format, package, buffer),
    }
}

fn index_of_directory(
    children: &BTreeMap<String, Node>,
    format: AudioFormat,
    package: &str,
    buffer: &mut Vec<u8>,
) -> Result<Value, BuildError> {
    if let Some(elements) = as_array(children) {
        let mut index = Vec::with_capacity(elements.len());
        for node in elements {
            index.push(index_of_node(node, format, package, buffer)?);
        }
        Ok(Value::Array(index))
    } else {
        let mut index = serde_json::Map::new();
        for (key, node) in children {
            index.insert(key.clone(), index_of_node(node, format, package, buffer)?);
        }
        Ok(Value::Object(index))
    }
}

/// Serializes the packed payload artifact for one audio format.
///
/// Items that are not audio contribute the same payload to every format's
/// artifact; audio items contribute the payload encoded for `format`.
pub fn serialize_payload(
    namespace: &Namespace,
    format: AudioFormat,
) -> Result<Vec<u8>, BuildError> {
    let mut buffer = Vec::new();
    let index = index_of_directory(
        namespace.root(),
        format,
        namespace.package(),
        &mut buffer,
    )?;

    let mut artifact = serde_json::to_string(&index)
        .map_err(|error| BuildError::NamingConflict {
            package: namespace.package().to_owned(),
            reason: format!("the packed index could not be serialized: {error}"),
        })?
        .into_bytes();
    artifact.push(b'\n');
    artifact.extend_from_slice(&buffer);
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_audio(payload: &[u8]) -> ContentItem {
        ContentItem::NonAudio {
            code: "engineSvg".to_owned(),
            payload: payload.to_vec(),
        }
    }

    fn audio(formats: &[(AudioFormat, &[u8])]) -> ContentItem {
        ContentItem::Audio {
            code: "engineAudio".to_owned(),
            payload_by_format: formats
                .iter()
                .map(|(format, payload)| (*format, payload.to_vec()))
                .collect(),
        }
    }

    fn split(artifact: &[u8]) -> (Value, &[u8]) {
        let newline = artifact.iter().position(|byte| *byte == b'\n').unwrap();
        let index = serde_json::from_slice(&artifact[..newline]).unwrap();
        (index, &artifact[newline + 1..])
    }

    #[test]
    fn spans_address_the_concatenated_buffer() {
        let mut namespace = Namespace::new("sprites");
        namespace.insert("fish", non_audio(b"FISH")).unwrap();
        namespace.insert("weed", non_audio(b"WEED!")).unwrap();

        let artifact = serialize_payload(&namespace, AudioFormat::Wav).unwrap();
        let (index, data) = split(&artifact);
        assert_eq!(index, json!({ "fish": [0, 4], "weed": [4, 5] }));
        assert_eq!(data, b"FISHWEED!");
    }

    #[test]
    fn audio_items_pick_the_requested_format() {
        let mut namespace = Namespace::new("sounds");
        namespace
            .insert(
                "intro",
                audio(&[(AudioFormat::Wav, b"WAVDATA"), (AudioFormat::Mp3, b"MP3")]),
            )
            .unwrap();

        let wav = serialize_payload(&namespace, AudioFormat::Wav).unwrap();
        let (index, data) = split(&wav);
        assert_eq!(index, json!({ "intro": [0, 7] }));
        assert_eq!(data, b"WAVDATA");

        let mp3 = serialize_payload(&namespace, AudioFormat::Mp3).unwrap();
        let (index, data) = split(&mp3);
        assert_eq!(index, json!({ "intro": [0, 3] }));
        assert_eq!(data, b"MP3");
    }

    #[test]
    fn missing_audio_format_is_an_error() {
        let mut namespace = Namespace::new("sounds");
        namespace
            .insert("intro", audio(&[(AudioFormat::Wav, b"WAV")]))
            .unwrap();
        assert!(serialize_payload(&namespace, AudioFormat::Ogg).is_err());
    }

    #[test]
    fn contiguous_numeric_directory_serializes_as_an_array() {
        let mut namespace = Namespace::new("frames");
        namespace.insert("walk/0", non_audio(b"A")).unwrap();
        namespace.insert("walk/1", non_audio(b"BB")).unwrap();

        let artifact = serialize_payload(&namespace, AudioFormat::Wav).unwrap();
        let (index, data) = split(&artifact);
        assert_eq!(index, json!({ "walk": [[0, 1], [1, 2]] }));
        assert_eq!(data, b"ABB");
    }

    #[test]
    fn empty_namespace_is_an_empty_array() {
        let namespace = Namespace::new("empty");
        let artifact = serialize_payload(&namespace, AudioFormat::Wav).unwrap();
        assert_eq!(artifact, b"[]\n");
    }

    #[test]
    fn payload_bytes_may_contain_newlines() {
        let mut namespace = Namespace::new("sprites");
        namespace.insert("fish", non_audio(b"A\nB")).unwrap();

        let artifact = serialize_payload(&namespace, AudioFormat::Wav).unwrap();
        let (index, data) = split(&artifact);
        assert_eq!(index, json!({ "fish": [0, 3] }));
        assert_eq!(data, b"A\nB");
    }
}
