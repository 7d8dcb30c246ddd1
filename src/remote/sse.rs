//! Server-sent event decoding and path updates for the realtime stream.
//!
//! The stream announces changes as `put` (replace the value at `path`) and
//! `patch` (merge children into the value at `path`) events whose data is
//! `{"path": "/a/b", "data": ...}`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental decoder; feed it body chunks as they arrive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known not to start a block terminator.
    scanned: usize,
}

impl SseDecoder {
    /// Append a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut frames = Vec::new();
        loop {
            // Step back one byte: the terminator may straddle two chunks
            let start = self.scanned.saturating_sub(1);
            let Some(offset) = self.buffer[start..].windows(2).position(|w| w == b"\n\n") else {
                self.scanned = self.buffer.len();
                break;
            };
            let end = start + offset;
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            self.scanned = 0;
            if let Some(frame) = parse_block(&String::from_utf8_lossy(&block[..end])) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}

/// Payload of `put` and `patch` events.
#[derive(Debug, Clone, Deserialize)]
pub struct PathUpdate {
    pub path: String,
    pub data: Value,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Turn a node into an object, keeping array entries under their index.
fn into_object(node: Value) -> Map<String, Value> {
    match node {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        _ => Map::new(),
    }
}

fn put_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    let mut map = into_object(node.take());
    if rest.is_empty() {
        if data.is_null() {
            map.remove(*first);
        } else {
            map.insert(first.to_string(), data);
        }
    } else {
        let child = map.entry(first.to_string()).or_insert(Value::Null);
        put_at(child, rest, data);
    }
    *node = Value::Object(map);
}

/// Replace the value at `path`; `null` deletes it.
pub fn apply_put(root: &mut Value, path: &str, data: Value) {
    put_at(root, &segments(path), data);
}

/// Merge the children of `data` into the value at `path`.
pub fn apply_patch(root: &mut Value, path: &str, data: Value) {
    let Value::Object(children) = data else {
        apply_put(root, path, data);
        return;
    };
    let base = path.trim_end_matches('/');
    for (key, value) in children {
        apply_put(root, &format!("{}/{}", base, key), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: put\ndata: {\"path\":").is_empty());

        let frames = decoder.push(b"\"/\",\"data\":null}\r\n\r\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: "put".into(),
                    data: "{\"path\":\"/\",\"data\":null}".into()
                },
                SseFrame {
                    event: "keep-alive".into(),
                    data: "null".into()
                },
            ]
        );
    }

    #[test]
    fn test_decoder_byte_at_a_time() {
        let stream = b"event: put\r\ndata: {\"path\":\"/\",\"data\":1}\r\n\r\nevent: patch\ndata: 2\n\n";
        let mut decoder = SseDecoder::default();
        let mut frames = Vec::new();
        for byte in stream.iter() {
            frames.extend(decoder.push(std::slice::from_ref(byte)));
        }

        let events: Vec<&str> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(events, vec!["put", "patch"]);
        assert_eq!(frames[1].data, "2");
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn test_decoder_skips_comments() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": ping\n\n").is_empty());
    }

    #[test]
    fn test_put_at_root_and_nested() {
        let mut root = Value::Null;
        apply_put(&mut root, "/", json!({ "profile": { "name": "a" } }));
        apply_put(&mut root, "/profile/tagline", json!("t"));
        apply_put(&mut root, "/stats/followers", json!(3));

        assert_eq!(
            root,
            json!({ "profile": { "name": "a", "tagline": "t" }, "stats": { "followers": 3 } })
        );
    }

    #[test]
    fn test_put_null_deletes() {
        let mut root = json!({ "profile": { "name": "a" }, "gallery": [1] });
        apply_put(&mut root, "/gallery", Value::Null);
        assert_eq!(root, json!({ "profile": { "name": "a" } }));
    }

    #[test]
    fn test_put_into_array_keeps_entries() {
        let mut root = json!({ "rank": [{ "id": "r1" }, { "id": "r2" }] });
        apply_put(&mut root, "/rank/1/name", json!("b"));
        assert_eq!(
            root["rank"],
            json!({ "0": { "id": "r1" }, "1": { "id": "r2", "name": "b" } })
        );
    }

    #[test]
    fn test_patch_merges_children() {
        let mut root = json!({ "profile": { "name": "a" }, "stats": { "followers": 1 } });
        apply_patch(&mut root, "/", json!({ "stats": { "followers": 2 }, "_lastUpdated": 9 }));
        assert_eq!(
            root,
            json!({ "profile": { "name": "a" }, "stats": { "followers": 2 }, "_lastUpdated": 9 })
        );
    }
}
