use serde_json::Value;

/// Whether a decoded result actually carries content.
///
/// An origin that answers 2xx with nothing in it does not win the resolution;
/// the next origin is tried instead.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for Value {
    /// Not `null`, not an empty array or object, and for `{"data": ...}`
    /// envelopes the `data` member is itself present.
    fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => match map.get("data") {
                Some(data) => data.is_present(),
                None => !map.is_empty(),
            },
            _ => true,
        }
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Presence> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(Presence::is_present)
    }
}
