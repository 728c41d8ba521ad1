//! Local `$ref` resolution.
//!
//! Only same-document references (`#/...`) are inlined; external references
//! are left untouched. A chain of references that never reaches a concrete
//! value (`A -> B -> A`) is a [`ParseErrorKind::CircularReference`]. A
//! recursive structure (a schema containing itself) is legal: the inner
//! occurrence is left as its `$ref` object.

use serde_json::{Map, Value};

use api_harness_core::models::ParseErrorKind;

use super::ParseError;

pub struct Resolver<'a> {
    root: &'a Value,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Deep-copy `node` with local references inlined.
    pub fn resolve(&self, node: &Value) -> Result<Value, ParseError> {
        let mut stack = Vec::new();
        self.walk(node, &mut stack)
    }

    fn walk(&self, node: &Value, stack: &mut Vec<String>) -> Result<Value, ParseError> {
        match node {
            Value::Object(map) => {
                if let Some(reference) = local_ref(map) {
                    if stack.iter().any(|r| r == reference) {
                        return Ok(node.clone());
                    }
                    let target = self.follow(reference)?;
                    stack.push(reference.to_string());
                    let resolved = self.walk(target, stack);
                    stack.pop();
                    return resolved;
                }
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.walk(v, stack)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|v| self.walk(v, stack))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// Follow a reference through any pure alias chain to a concrete value.
    fn follow(&self, reference: &str) -> Result<&'a Value, ParseError> {
        let mut chain = vec![reference.to_string()];
        let mut target = self.lookup(reference)?;

        while let Some(next) = target.as_object().and_then(local_ref) {
            if chain.iter().any(|r| r == next) {
                chain.push(next.to_string());
                return Err(ParseError::new(
                    ParseErrorKind::CircularReference,
                    format!("circular $ref chain: {}", chain.join(" -> ")),
                ));
            }
            chain.push(next.to_string());
            target = self.lookup(next)?;
        }

        Ok(target)
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value, ParseError> {
        let pointer = &reference[1..];
        if pointer.is_empty() {
            return Ok(self.root);
        }
        self.root
            .pointer(pointer)
            .ok_or_else(|| ParseError::invalid(format!("unresolved $ref '{}'", reference)))
    }
}

fn local_ref(map: &Map<String, Value>) -> Option<&str> {
    map.get("$ref")
        .and_then(Value::as_str)
        .filter(|r| r.starts_with('#'))
}
