//! Content items produced by file processors
//!
//! A processor turns one source file into a mapping of slash-delimited
//! logical keys to content items. The driver persists that mapping as a JSON
//! cache (`cache.json`) so unchanged files never reprocess; payload bytes are
//! base64-encoded inside the cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Audio encoding targets supported by the runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Placeholder target producing empty payloads.
    None,
    Wav,
    Mp3,
    Ogg,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::None,
        AudioFormat::Wav,
        AudioFormat::Mp3,
        AudioFormat::Ogg,
    ];

    /// Stable lowercase name used in artifact file names.
    pub fn name(self) -> &'static str {
        match self {
            AudioFormat::None => "none",
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name() == name.to_ascii_lowercase())
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The opaque output of running one logical entry through its processor.
///
/// `code` is a source-level expression supplied by the processor and emitted
/// verbatim into the package's typed declaration; the payload is the raw
/// runtime data addressed through the packed index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentItem {
    #[serde(rename_all = "camelCase")]
    NonAudio {
        code: String,
        #[serde(with = "base64_bytes")]
        payload: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Audio {
        code: String,
        #[serde(with = "base64_map")]
        payload_by_format: BTreeMap<AudioFormat, Vec<u8>>,
    },
}

impl ContentItem {
    pub fn code(&self) -> &str {
        match self {
            ContentItem::NonAudio { code, .. } => code,
            ContentItem::Audio { code, .. } => code,
        }
    }
}

/// A processor's complete output for one source file: logical key -> item.
pub type GeneratedItems = BTreeMap<String, ContentItem>;

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(D::Error::custom)
    }
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::AudioFormat;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<AudioFormat, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<AudioFormat, String> = map
            .iter()
            .map(|(format, bytes)| (*format, STANDARD.encode(bytes)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<AudioFormat, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<AudioFormat, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(format, text)| {
                STANDARD
                    .decode(text)
                    .map(|bytes| (format, bytes))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_audio_cache_round_trip() {
        let mut items = GeneratedItems::new();
        items.insert(
            "fish".to_owned(),
            ContentItem::NonAudio {
                code: "engineSvg".to_owned(),
                payload: b"<svg/>".to_vec(),
            },
        );

        let json = serde_json::to_string(&items).unwrap();
        let parsed: GeneratedItems = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, items);
    }

    #[test]
    fn audio_cache_round_trip() {
        let mut payloads = BTreeMap::new();
        payloads.insert(AudioFormat::Wav, vec![0u8, 1, 2, 255]);
        payloads.insert(AudioFormat::None, Vec::new());

        let item = ContentItem::Audio {
            code: "engineAudio".to_owned(),
            payload_by_format: payloads,
        };
        let json = serde_json::to_string(&item).unwrap();
        let parsed: ContentItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn payload_is_base64_in_cache() {
        let item = ContentItem::NonAudio {
            code: "engineSvg".to_owned(),
            payload: vec![0xff, 0x00],
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"/wA=\""));
    }

    #[test]
    fn format_names_are_stable() {
        for format in AudioFormat::ALL {
            assert_eq!(AudioFormat::parse(format.name()), Some(format));
        }
        assert_eq!(AudioFormat::parse("flac"), None);
        assert_eq!(serde_json::to_string(&AudioFormat::Mp3).unwrap(), "\"mp3\"");
    }
}
