//! Message component JSON, including the Components V2 layout types.

use serde_json::{Value, json};

pub const ACCENT_COLOR: u32 = 0x9469c9;

pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
}

pub fn text(content: impl Into<String>) -> Value {
    json!({ "type": 10, "content": content.into() })
}

pub fn separator() -> Value {
    json!({ "type": 14 })
}

pub fn container(components: Vec<Value>) -> Value {
    json!({ "type": 17, "accent_color": ACCENT_COLOR, "components": components })
}

pub fn media_gallery(url: &str, description: &str) -> Value {
    json!({
        "type": 12,
        "items": [{ "media": { "url": url }, "description": description }]
    })
}

pub fn action_row(components: Vec<Value>) -> Value {
    json!({ "type": 1, "components": components })
}

pub fn button(style: ButtonStyle, label: &str, custom_id: &str, disabled: bool) -> Value {
    json!({
        "type": 2,
        "style": style as u8,
        "label": label,
        "custom_id": custom_id,
        "disabled": disabled,
    })
}

/// Text with a button accessory on the right.
pub fn section(content: impl Into<String>, accessory: Value) -> Value {
    json!({
        "type": 9,
        "components": [text(content)],
        "accessory": accessory,
    })
}

/// Every `custom_id` in a component tree, depth first.
#[cfg(test)]
pub fn custom_ids(components: &[Value]) -> Vec<String> {
    let mut out = Vec::new();
    for component in components {
        if let Some(id) = component.get("custom_id").and_then(Value::as_str) {
            out.push(id.to_string());
        }
        for key in ["components", "accessory"] {
            match component.get(key) {
                Some(Value::Array(children)) => out.extend(custom_ids(children)),
                Some(child @ Value::Object(_)) => out.extend(custom_ids(std::slice::from_ref(child))),
                _ => {}
            }
        }
    }
    out
}
