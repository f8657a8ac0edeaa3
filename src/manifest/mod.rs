//! Kustomize manifest patching
//!
//! A patch pins one image in the top-level `images` list: the first entry
//! whose `name` matches gets its `newTag` (and optionally `newName`)
//! replaced, or a new entry is appended. The document is edited in place so
//! comments, key order and quoting elsewhere survive. When the `images`
//! value is too unusual to edit line by line (a flow sequence, say), only
//! that value is rewritten in block style.

mod layout;

use crate::error::{Error, Result};
use crate::types::{ImagePin, RemoteFile};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use layout::{EditRequest, ImagesShape, Target};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

/// Result of patching manifest text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedDocument {
    /// The patched YAML text
    pub text: String,
    /// False when the document already pinned the requested values
    pub changed: bool,
}

/// A patched remote manifest, ready to be written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    /// Repository-relative path
    pub path: String,
    /// New content, base64 encoded
    pub content: String,
    /// Hash of the content that was read
    pub sha: String,
    /// False when nothing needs to be written
    pub changed: bool,
}

/// Patch a file read from the remote repository
pub fn patch_file(file: &RemoteFile, pin: &ImagePin) -> Result<PatchResult> {
    let text = decode_content(&file.content)?;
    let patched = patch_document(&text, pin)
        .map_err(|e| match e {
            Error::MalformedDocument(msg) => {
                Error::MalformedDocument(format!("{}: {msg}", file.path))
            }
            other => other,
        })?;
    Ok(PatchResult {
        path: file.path.clone(),
        content: encode_content(&patched.text),
        sha: file.sha.clone(),
        changed: patched.changed,
    })
}

/// Patch base64 manifest content, returning the new base64 content
pub fn patch_manifest(raw_base64: &str, pin: &ImagePin) -> Result<String> {
    let text = decode_content(raw_base64)?;
    let patched = patch_document(&text, pin)?;
    Ok(encode_content(&patched.text))
}

/// Decode API content, tolerating the line breaks GitHub inserts
pub fn decode_content(raw_base64: &str) -> Result<String> {
    let compact: String = raw_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| Error::MalformedDocument(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::MalformedDocument(format!("content is not UTF-8: {e}")))
}

/// Encode text for the contents API
pub fn encode_content(text: &str) -> String {
    BASE64.encode(text.as_bytes())
}

/// Pin `pin` in a kustomization document
pub fn patch_document(text: &str, pin: &ImagePin) -> Result<PatchedDocument> {
    if let Some(rest) = text.strip_prefix(BOM) {
        let mut patched = patch_document(rest, pin)?;
        patched.text.insert(0, BOM);
        return Ok(patched);
    }

    let original = parse(text)?;
    let mut root = match original.clone() {
        Value::Null => Mapping::new(),
        Value::Mapping(map) => map,
        other => {
            return Err(Error::MalformedDocument(format!(
                "expected a mapping at the document root, found {}",
                describe(&other)
            )));
        }
    };

    let images_key = Value::from("images");
    let shape = match root.get(&images_key) {
        None => ImagesShape::Missing,
        Some(Value::Sequence(seq)) => ImagesShape::Sequence { len: seq.len() },
        Some(_) => ImagesShape::NotSequence,
    };
    if !matches!(shape, ImagesShape::Sequence { .. }) {
        root.insert(images_key.clone(), Value::Sequence(Vec::new()));
    }
    let Some(Value::Sequence(images)) = root.get_mut(&images_key) else {
        return Err(Error::Internal("images list vanished while patching".into()));
    };

    let mut wanted: Vec<(&'static str, &str)> = Vec::new();
    if let Some(new_name) = &pin.new_name {
        wanted.push(("newName", new_name.as_str()));
    }
    wanted.push(("newTag", pin.new_tag.as_str()));

    let name = Value::from(pin.name.as_str());
    let found = images.iter().position(|entry| entry.get("name") == Some(&name));
    let (target, fields) = match found {
        Some(index) => {
            let Some(entry) = images[index].as_mapping_mut() else {
                return Err(Error::Internal("matched image entry is not a mapping".into()));
            };
            let stale: Vec<(&'static str, &str)> = wanted
                .iter()
                .copied()
                .filter(|(key, value)| entry.get(*key) != Some(&Value::from(*value)))
                .collect();
            for (key, value) in &stale {
                entry.insert(Value::from(*key), Value::from(*value));
            }
            (Target::Update { index }, stale)
        }
        None => {
            let mut entry = Mapping::new();
            entry.insert(Value::from("name"), name.clone());
            for (key, value) in &wanted {
                entry.insert(Value::from(*key), Value::from(*value));
            }
            images.push(Value::Mapping(entry));
            let mut fields = vec![("name", pin.name.as_str())];
            fields.extend(wanted.iter().copied());
            (Target::Append, fields)
        }
    };

    let expected = Value::Mapping(root);
    if expected == original {
        debug!(image = %pin.name, "manifest already up to date");
        return Ok(PatchedDocument {
            text: text.to_string(),
            changed: false,
        });
    }

    let mut rendered = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        rendered.push((key, render_scalar(value)?));
    }
    let request = EditRequest {
        shape,
        target,
        fields: rendered,
    };

    let verified = |edited: &String| parse(edited).is_ok_and(|value| value == expected);

    if let Some(edited) = layout::edit(text, &request).filter(verified) {
        return Ok(PatchedDocument {
            text: edited,
            changed: true,
        });
    }

    let block = serde_yaml::to_string(&expected["images"])
        .map_err(|e| Error::Internal(format!("failed to serialize images: {e}")))?;
    let text = if let Some(edited) = layout::replace_images(text, &block).filter(verified) {
        debug!(image = %pin.name, "rewrote the images value in block style");
        edited
    } else {
        warn!(image = %pin.name, "unrecognised manifest layout, re-emitting the whole document");
        serde_yaml::to_string(&expected)
            .map_err(|e| Error::Internal(format!("failed to serialize manifest: {e}")))?
    };

    Ok(PatchedDocument {
        text,
        changed: true,
    })
}

const BOM: char = '\u{feff}';

fn parse(text: &str) -> Result<Value> {
    serde_yaml::from_str(text).map_err(|e| Error::MalformedDocument(e.to_string()))
}

/// Render a string as a YAML scalar that reads back as the same string
fn render_scalar(value: &str) -> Result<String> {
    let rendered = serde_yaml::to_string(value)
        .map_err(|e| Error::Internal(format!("failed to render {value:?}: {e}")))?;
    Ok(rendered.trim_end_matches('\n').to_string())
}

const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
