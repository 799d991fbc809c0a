//! Conversions between documents and Qdrant point payloads.

use crate::qdrant::types::{Document, DocumentMetadata};
use serde_json::{Map, Value, json};

/// Serialize a document into the point object accepted by the upsert endpoint.
pub(crate) fn build_point(document: &Document) -> Value {
    json!({
        "id": document.id,
        "vector": document.vector,
        "payload": build_payload(&document.metadata),
    })
}

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(metadata: &DocumentMetadata) -> Value {
    let mut payload = Map::new();
    payload.insert("text".into(), Value::String(metadata.text.clone()));
    payload.insert(
        "file_name".into(),
        Value::String(metadata.file_name.clone()),
    );
    payload.insert(
        "file_path".into(),
        Value::String(metadata.file_path.clone()),
    );
    payload.insert("chunk_index".into(), Value::from(metadata.chunk_index));
    Value::Object(payload)
}

/// Read chunk metadata back from a point payload.
///
/// Missing fields fall back to empty values; `chunk_index` is accepted as a number or a numeric
/// string.
pub(crate) fn parse_metadata(payload: Option<&Map<String, Value>>) -> DocumentMetadata {
    let Some(payload) = payload else {
        return DocumentMetadata::default();
    };

    let text_field = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let chunk_index = match payload.get("chunk_index") {
        Some(Value::Number(number)) => number.as_u64().unwrap_or_default() as usize,
        Some(Value::String(raw)) => raw.trim().parse().unwrap_or_default(),
        _ => 0,
    };

    DocumentMetadata {
        text: text_field("text"),
        file_name: text_field("file_name"),
        file_path: text_field("file_path"),
        chunk_index,
    }
}
