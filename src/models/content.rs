use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A reference to an image, carried by exactly one of three modes: a remote
/// URL, inline base64 data, or a provider-side file id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImageRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

/// The resolved reference mode of an [`ImageRef`], after precedence rules.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource<'a> {
    Url(&'a str),
    Base64 { data: &'a str, mime_type: &'a str },
    FileId(&'a str),
}

impl ImageRef {
    pub fn url<S: Into<String>>(url: S) -> Self {
        ImageRef {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn base64<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        ImageRef {
            data: Some(data.into()),
            mime_type: Some(mime_type.into()),
            ..Default::default()
        }
    }

    /// Encode raw bytes into an inline base64 reference.
    pub fn from_bytes<T: Into<String>>(bytes: &[u8], mime_type: T) -> Self {
        use base64::Engine as _;
        Self::base64(
            base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type,
        )
    }

    pub fn file_id<S: Into<String>>(id: S) -> Self {
        ImageRef {
            file_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Resolve which reference mode this image uses.
    ///
    /// A populated URL wins over the other modes, unless the URL is itself a
    /// base64 data-URI, in which case it is reclassified as inline base64
    /// (mime type taken from the URI). Returns None when no mode is populated.
    pub fn source(&self) -> Option<ImageSource<'_>> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            if let Some((mime_type, data)) = split_data_uri(url) {
                return Some(ImageSource::Base64 { data, mime_type });
            }
            return Some(ImageSource::Url(url));
        }
        if let Some(data) = self.data.as_deref().filter(|d| !d.is_empty()) {
            return Some(ImageSource::Base64 {
                data,
                mime_type: self.mime_type.as_deref().unwrap_or("image/png"),
            });
        }
        self.file_id
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(ImageSource::FileId)
    }
}

/// Split a `data:<mime>;base64,<payload>` URI into (mime, payload).
pub(crate) fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if mime.is_empty() || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

/// Encoded audio formats supported across providers. The lowercase name is
/// the wire name everywhere it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
    Pcm16,
}

/// A reference to an uploaded or inline file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl FileRef {
    pub fn base64<S: Into<String>, T: Into<String>>(data: S, name: T) -> Self {
        FileRef {
            data: Some(data.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn file_id<S: Into<String>>(id: S) -> Self {
        FileRef {
            file_id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// One discriminated unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image(ImageRef),
    Audio { data: String, format: AudioFormat },
    File(FileRef),
}

impl ContentPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(image: ImageRef) -> Self {
        ContentPart::Image(image)
    }

    pub fn audio<S: Into<String>>(data: S, format: AudioFormat) -> Self {
        ContentPart::Audio {
            data: data.into(),
            format,
        }
    }

    /// Encode raw audio bytes, e.g. a synthesized speech response being fed
    /// back into a conversation.
    pub fn audio_bytes(bytes: &[u8], format: AudioFormat) -> Self {
        use base64::Engine as _;
        ContentPart::Audio {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            format,
        }
    }

    pub fn file(file: FileRef) -> Self {
        ContentPart::File(file)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// The payload of a message: either a bare string or an ordered list of
/// parts. A single-Text parts list and a bare string are interchangeable;
/// multi-part order is significant and preserved exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(text.into())
    }

    pub fn parts<I: IntoIterator<Item = ContentPart>>(parts: I) -> Self {
        Content::Parts(parts.into_iter().collect())
    }

    /// The text of this content if it is a bare string or a single Text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Parts(parts) => match parts.as_slice() {
                [ContentPart::Text { text }] => Some(text),
                _ => None,
            },
        }
    }

    /// All text runs concatenated, ignoring media parts.
    pub fn all_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(text) => text.is_empty(),
            Content::Parts(parts) => parts.is_empty(),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<ContentPart>> for Content {
    fn from(parts: Vec<ContentPart>) -> Self {
        Content::Parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_precedence() {
        let image = ImageRef {
            url: Some("https://example.com/cat.png".into()),
            data: Some("aGk=".into()),
            mime_type: Some("image/png".into()),
            file_id: Some("file-123".into()),
        };
        assert_eq!(
            image.source(),
            Some(ImageSource::Url("https://example.com/cat.png"))
        );

        let image = ImageRef::base64("aGk=", "image/jpeg");
        assert_eq!(
            image.source(),
            Some(ImageSource::Base64 {
                data: "aGk=",
                mime_type: "image/jpeg"
            })
        );

        let image = ImageRef::file_id("file-123");
        assert_eq!(image.source(), Some(ImageSource::FileId("file-123")));

        assert_eq!(ImageRef::default().source(), None);
    }

    #[test]
    fn test_data_uri_reclassified_as_base64() {
        let image = ImageRef::url("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            image.source(),
            Some(ImageSource::Base64 {
                data: "iVBORw0KGgo=",
                mime_type: "image/png"
            })
        );

        // Reclassification applies to any mime type, not just png
        let image = ImageRef::url("data:image/webp;base64,UklGRg==");
        assert_eq!(
            image.source(),
            Some(ImageSource::Base64 {
                data: "UklGRg==",
                mime_type: "image/webp"
            })
        );
    }

    #[test]
    fn test_non_base64_data_uri_stays_url() {
        let image = ImageRef::url("data:text/plain,hello");
        assert_eq!(
            image.source(),
            Some(ImageSource::Url("data:text/plain,hello"))
        );
    }

    #[test]
    fn test_content_text_equivalence() {
        let bare = Content::text("hello");
        let single = Content::parts([ContentPart::text("hello")]);
        assert_eq!(bare.as_text(), single.as_text());
    }

    #[test]
    fn test_content_part_order_preserved() {
        let content = Content::parts([
            ContentPart::text("describe this"),
            ContentPart::image(ImageRef::url("https://x/y.png")),
        ]);
        if let Content::Parts(parts) = &content {
            assert!(matches!(parts[0], ContentPart::Text { .. }));
            assert!(matches!(parts[1], ContentPart::Image(_)));
        } else {
            panic!("Expected parts");
        }
    }

    #[test]
    fn test_bare_string_deserializes_to_text() {
        let content: Content = serde_json::from_value(serde_json::json!("hi")).unwrap();
        assert_eq!(content, Content::Text("hi".into()));
    }

    #[test]
    fn test_from_bytes_encodes_base64() {
        let image = ImageRef::from_bytes(b"hi", "image/png");
        assert_eq!(image.data.as_deref(), Some("aGk="));

        let part = ContentPart::audio_bytes(b"hi", AudioFormat::Wav);
        assert_eq!(
            part,
            ContentPart::Audio {
                data: "aGk=".into(),
                format: AudioFormat::Wav
            }
        );
    }

    #[test]
    fn test_audio_format_wire_names() {
        assert_eq!(AudioFormat::Mp3.to_string(), "mp3");
        assert_eq!(AudioFormat::Pcm16.to_string(), "pcm16");
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
    }
}
