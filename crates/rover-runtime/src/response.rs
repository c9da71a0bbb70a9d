//! Splitting an AI reply into ordered action and speech parts.
//!
//! The assistant is prompted to embed actions as bracketed lists inside its
//! prose, e.g. `Sure! ['sit', 'wag_tail'] Good boy.`  Bracketed segments
//! become [`ResponsePart::Action`]s, one per list element; the text between
//! them becomes [`ResponsePart::Content`].  Order is preserved.
//!
//! Parsing is lenient: quotes are optional (`[nod]` is one action), empty
//! elements are skipped, and an unterminated `[` is treated as plain text.

use rover_types::{ActionBatch, AudioHandle, BatchItem};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "lowercase")]
pub enum ResponsePart {
    Action(String),
    Content(String),
}

/// Parse `text` into ordered parts.
///
/// ```rust
/// use rover_runtime::response::{parse_response, ResponsePart};
///
/// let parts = parse_response("Hi there! ['sit', \"bark\"] Woof.");
/// assert_eq!(
///     parts,
///     vec![
///         ResponsePart::Content("Hi there!".into()),
///         ResponsePart::Action("sit".into()),
///         ResponsePart::Action("bark".into()),
///         ResponsePart::Content("Woof.".into()),
///     ]
/// );
/// ```
pub fn parse_response(text: &str) -> Vec<ResponsePart> {
    let mut parts = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|i| open + i) else {
            break;
        };
        push_content(&mut parts, &rest[..open]);
        parts.extend(
            split_list(&rest[open + 1..close]).map(|name| ResponsePart::Action(name.to_string())),
        );
        rest = &rest[close + 1..];
    }
    push_content(&mut parts, rest);
    parts
}

/// Turn parsed parts into a batch.  Content is handed to `synth` (the
/// text-to-speech layer); content it cannot voice is dropped.
pub fn into_batch<F>(parts: Vec<ResponsePart>, mut synth: F) -> ActionBatch
where
    F: FnMut(&str) -> Option<AudioHandle>,
{
    let items = parts
        .into_iter()
        .filter_map(|part| match part {
            ResponsePart::Action(name) => Some(BatchItem::action(name)),
            ResponsePart::Content(text) => {
                synth(&text).map(|audio| BatchItem::speech(audio.to_string()))
            }
        })
        .collect();
    ActionBatch::new(items)
}

fn push_content(parts: &mut Vec<ResponsePart>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        parts.push(ResponsePart::Content(text.to_string()));
    }
}

fn split_list(inner: &str) -> impl Iterator<Item = &str> {
    inner
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::ItemKind;

    fn action(s: &str) -> ResponsePart {
        ResponsePart::Action(s.to_string())
    }

    fn content(s: &str) -> ResponsePart {
        ResponsePart::Content(s.to_string())
    }

    #[test]
    fn plain_text_is_one_content_part() {
        assert_eq!(parse_response("  just talking  "), vec![content("just talking")]);
        assert!(parse_response("   ").is_empty());
    }

    #[test]
    fn multiple_lists_keep_order() {
        let parts = parse_response("['stand'] Let's go! ['forward', 'forward'] Done");
        assert_eq!(
            parts,
            vec![
                action("stand"),
                content("Let's go!"),
                action("forward"),
                action("forward"),
                content("Done"),
            ]
        );
    }

    #[test]
    fn bare_words_and_empty_lists() {
        assert_eq!(parse_response("[nod][]"), vec![action("nod")]);
        assert_eq!(parse_response("[ 'wag_tail', , ]"), vec![action("wag_tail")]);
    }

    #[test]
    fn unterminated_bracket_is_text() {
        assert_eq!(parse_response("oops [sit"), vec![content("oops [sit")]);
    }

    #[test]
    fn serialises_with_key_value_tags() {
        let json = serde_json::to_value(action("sit")).unwrap();
        assert_eq!(json, serde_json::json!({"key": "action", "value": "sit"}));
    }

    #[test]
    fn into_batch_voices_content_in_place() {
        let parts = parse_response("Hello ['bark'] unspeakable");
        let batch = into_batch(parts, |text| {
            (text == "Hello").then(|| AudioHandle::new("/tmp/hello.wav"))
        });

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.items[0].kind, ItemKind::Speech);
        assert_eq!(batch.items[0].value, "/tmp/hello.wav");
        assert_eq!(batch.items[1], BatchItem::action("bark"));
    }
}
