//! Content extraction from provider events
//!
//! Providers never mix shapes within one stream, so each event is matched
//! against an ordered list of known shapes and the first one yielding
//! non-empty text wins.

use crate::protocol::ImagePayload;
use serde_json::Value;

/// Known text-carrying event shapes, in match priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    /// `choices[0].delta.content`
    DeltaContent,
    /// `choices[0].delta.text`
    DeltaText,
    /// `choices[0].message.content` as a string or a list of text parts
    MessageContent,
    /// `choices[0].text`
    ChoiceText,
    /// `candidates[0].content.parts[*].text`
    CandidateParts,
    /// top-level `content`
    BareContent,
    /// top-level `text`
    BareText,
    /// top-level `delta.text` (content block deltas)
    BareDelta,
}

impl EventShape {
    pub const PRIORITY: [EventShape; 8] = [
        EventShape::DeltaContent,
        EventShape::DeltaText,
        EventShape::MessageContent,
        EventShape::ChoiceText,
        EventShape::CandidateParts,
        EventShape::BareContent,
        EventShape::BareText,
        EventShape::BareDelta,
    ];

    /// Text this shape finds in `event`; empty text counts as no match
    pub fn extract(self, event: &Value) -> Option<String> {
        let choice = || event.get("choices").and_then(|c| c.get(0));

        match self {
            EventShape::DeltaContent => choice()
                .and_then(|c| c.pointer("/delta/content"))
                .and_then(non_empty_str),
            EventShape::DeltaText => choice()
                .and_then(|c| c.pointer("/delta/text"))
                .and_then(non_empty_str),
            EventShape::MessageContent => choice()
                .and_then(|c| c.pointer("/message/content"))
                .and_then(text_or_parts),
            EventShape::ChoiceText => choice().and_then(|c| c.get("text")).and_then(non_empty_str),
            EventShape::CandidateParts => event
                .pointer("/candidates/0/content/parts")
                .and_then(text_or_parts),
            EventShape::BareContent => event.get("content").and_then(non_empty_str),
            EventShape::BareText => event.get("text").and_then(non_empty_str),
            EventShape::BareDelta => event.pointer("/delta/text").and_then(non_empty_str),
        }
    }
}

/// Extract the text delta carried by one event
pub fn extract_delta(event: &Value) -> Option<String> {
    EventShape::PRIORITY
        .iter()
        .find_map(|shape| shape.extract(event))
}

/// The shape that matched `event`, if any
pub fn detect_shape(event: &Value) -> Option<EventShape> {
    EventShape::PRIORITY
        .iter()
        .copied()
        .find(|shape| shape.extract(event).is_some())
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A string, or the concatenated `text` fields of a part list
fn text_or_parts(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined: String = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            Some(joined).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

/// Known image-carrying response shapes, in match priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    /// `choices[0].message.images[*]` entries of type `image_url`
    MessageImages,
    /// content parts with `inline_data.data`
    InlineDataParts,
    /// content parts of type `image_url`
    ImageUrlParts,
}

impl ImageShape {
    pub const PRIORITY: [ImageShape; 3] = [
        ImageShape::MessageImages,
        ImageShape::InlineDataParts,
        ImageShape::ImageUrlParts,
    ];

    pub fn extract(self, response: &Value) -> Option<ImagePayload> {
        let message = response.pointer("/choices/0/message")?;

        match self {
            ImageShape::MessageImages => message
                .get("images")?
                .as_array()?
                .iter()
                .filter(|img| img.get("type").and_then(Value::as_str) == Some("image_url"))
                .find_map(|img| img.pointer("/image_url/url").and_then(Value::as_str))
                .and_then(image_from_url),
            ImageShape::InlineDataParts => message
                .get("content")?
                .as_array()?
                .iter()
                .find_map(|part| part.pointer("/inline_data/data").and_then(non_empty_str))
                .map(ImagePayload::Base64),
            ImageShape::ImageUrlParts => message
                .get("content")?
                .as_array()?
                .iter()
                .filter(|part| part.get("type").and_then(Value::as_str) == Some("image_url"))
                .find_map(|part| part.pointer("/image_url/url").and_then(Value::as_str))
                .and_then(image_from_url),
        }
    }
}

/// Extract the generated image from an image-model response
pub fn extract_image(response: &Value) -> Option<ImagePayload> {
    ImageShape::PRIORITY
        .iter()
        .find_map(|shape| shape.extract(response))
}

/// Inline `data:image/...;base64,` URLs become base64 payloads
fn image_from_url(url: &str) -> Option<ImagePayload> {
    if url.is_empty() {
        return None;
    }

    if url.starts_with("data:image") {
        if let Some((_, data)) = url.split_once(";base64,") {
            return Some(ImagePayload::Base64(data.to_string()));
        }
    }

    Some(ImagePayload::Url(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_each_shape() {
        let cases = [
            (json!({"choices": [{"delta": {"content": "a"}}]}), EventShape::DeltaContent),
            (json!({"choices": [{"delta": {"text": "b"}}]}), EventShape::DeltaText),
            (json!({"choices": [{"message": {"content": "c"}}]}), EventShape::MessageContent),
            (json!({"choices": [{"text": "d"}]}), EventShape::ChoiceText),
            (
                json!({"candidates": [{"content": {"parts": [{"text": "e"}, {"text": "f"}]}}]}),
                EventShape::CandidateParts,
            ),
            (json!({"content": "g"}), EventShape::BareContent),
            (json!({"text": "h"}), EventShape::BareText),
            (
                json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "i"}}),
                EventShape::BareDelta,
            ),
        ];

        for (event, shape) in cases {
            assert_eq!(detect_shape(&event), Some(shape), "event: {}", event);
        }

        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "e"}, {"text": "f"}]}}]});
        assert_eq!(extract_delta(&gemini).as_deref(), Some("ef"));
    }

    #[test]
    fn test_first_matching_shape_wins() {
        let event = json!({
            "choices": [{"delta": {"content": "delta"}, "text": "choice"}],
            "text": "bare"
        });
        assert_eq!(extract_delta(&event).as_deref(), Some("delta"));
    }

    #[test]
    fn test_empty_text_falls_through() {
        let event = json!({"choices": [{"delta": {"content": ""}, "text": "fallback"}]});
        assert_eq!(extract_delta(&event).as_deref(), Some("fallback"));
    }

    #[test]
    fn test_no_content() {
        assert_eq!(extract_delta(&json!({"choices": [{"delta": {"role": "assistant"}}]})), None);
        assert_eq!(extract_delta(&json!({"choices": [{"delta": {"content": null}}]})), None);
        assert_eq!(extract_delta(&json!({"usage": {"total_tokens": 10}})), None);
        assert_eq!(extract_delta(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_message_content_parts() {
        let event = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "one "},
            {"type": "image_url", "image_url": {"url": "x"}},
            {"type": "text", "text": "two"}
        ]}}]});
        assert_eq!(extract_delta(&event).as_deref(), Some("one two"));
    }

    #[test]
    fn test_image_from_message_images() {
        let response = json!({"choices": [{"message": {"images": [
            {"type": "image_url", "image_url": {"url": "data:image/png;base64,QUJD"}}
        ]}}]});
        assert_eq!(extract_image(&response), Some(ImagePayload::Base64("QUJD".into())));

        let remote = json!({"choices": [{"message": {"images": [
            {"type": "image_url", "image_url": {"url": "https://cdn.example/img.png"}}
        ]}}]});
        assert_eq!(
            extract_image(&remote),
            Some(ImagePayload::Url("https://cdn.example/img.png".into()))
        );
    }

    #[test]
    fn test_image_from_content_parts() {
        let inline = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "here"},
            {"inline_data": {"mime_type": "image/jpeg", "data": "REVG"}}
        ]}}]});
        assert_eq!(extract_image(&inline), Some(ImagePayload::Base64("REVG".into())));

        let url_part = json!({"choices": [{"message": {"content": [
            {"type": "image_url", "image_url": {"url": "https://cdn.example/a.jpg"}}
        ]}}]});
        assert_eq!(
            extract_image(&url_part),
            Some(ImagePayload::Url("https://cdn.example/a.jpg".into()))
        );
    }

    #[test]
    fn test_no_image() {
        let text_only = json!({"choices": [{"message": {"content": "sorry, I can't draw"}}]});
        assert_eq!(extract_image(&text_only), None);
    }
}
