//! Submitted form fields, from url-encoded or JSON bodies.

use super::Request;
use forum_core::exception::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered multi-map of submitted fields.
///
/// Repeated keys are kept, so multi-valued inputs such as a list of tags
/// survive parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
	pairs: Vec<(String, String)>,
}

impl FormData {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_pairs<K: Into<String>, V: Into<String>>(
		pairs: impl IntoIterator<Item = (K, V)>,
	) -> Self {
		Self {
			pairs: pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}

	/// First value submitted for `name`
	pub fn get(&self, name: &str) -> Option<&str> {
		self.pairs
			.iter()
			.find(|(k, _)| k == name)
			.map(|(_, v)| v.as_str())
	}

	/// Every value submitted for `name`, in submission order
	pub fn get_all(&self, name: &str) -> Vec<&str> {
		self.pairs
			.iter()
			.filter(|(k, _)| k == name)
			.map(|(_, v)| v.as_str())
			.collect()
	}

	pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.pairs.push((name.into(), value.into()));
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// JSON object of the input: single values as strings, repeated keys as arrays
	pub fn to_json(&self) -> Value {
		let mut object = Map::new();
		for (key, value) in &self.pairs {
			match object.get_mut(key) {
				None => {
					object.insert(key.clone(), Value::String(value.clone()));
				}
				Some(Value::Array(values)) => values.push(Value::String(value.clone())),
				Some(existing) => {
					let first = existing.take();
					*existing = Value::Array(vec![first, Value::String(value.clone())]);
				}
			}
		}
		Value::Object(object)
	}

	fn from_json_body(body: &[u8]) -> Result<Self> {
		let value: Value = serde_json::from_slice(body)
			.map_err(|e| Error::BadRequest(format!("invalid JSON body: {}", e)))?;
		let Value::Object(object) = value else {
			return Err(Error::BadRequest("JSON body must be an object".to_string()));
		};

		let mut form = FormData::new();
		for (key, value) in object {
			match value {
				Value::Array(items) => {
					for item in items {
						if let Some(text) = scalar_to_string(item) {
							form.push(key.clone(), text);
						}
					}
				}
				other => {
					if let Some(text) = scalar_to_string(other) {
						form.push(key, text);
					}
				}
			}
		}
		Ok(form)
	}
}

impl Serialize for FormData {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

fn scalar_to_string(value: Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s),
		Value::Bool(b) => Some(b.to_string()),
		Value::Number(n) => Some(n.to_string()),
		nested => Some(nested.to_string()),
	}
}

impl Request {
	/// Parse the body as submitted form fields.
	///
	/// `application/json` bodies must be objects; anything else is read as
	/// `application/x-www-form-urlencoded`. An empty body yields no fields.
	pub fn form_data(&self) -> Result<FormData> {
		if self.body.is_empty() {
			return Ok(FormData::new());
		}

		let is_json = self
			.content_type()
			.map(|ct| ct.trim_start().starts_with("application/json"))
			.unwrap_or(false);

		if is_json {
			FormData::from_json_body(&self.body)
		} else {
			let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.body)
				.map_err(|e| Error::BadRequest(format!("invalid form body: {}", e)))?;
			Ok(FormData { pairs })
		}
	}
}
