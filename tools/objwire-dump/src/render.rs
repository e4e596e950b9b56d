// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Text and JSON rendering of decoded object graphs.
//!
//! Objects are numbered in first-visit order. A repeated visit renders as a
//! reference (`-> #n` / `{"$ref": n}`) so shared and cyclic graphs print in
//! finite space.

use colored::*;
use objwire::{DynamicObject, Entity, ObjectRef, Type, Value};
use serde::Serialize;
use serde_json::{json, Map, Number};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

const INDENT: &str = "  ";

/// Schema summary for `--schemas`.
#[derive(Debug, Serialize)]
pub struct SchemaInfo {
    pub package: String,
    pub name: String,
    pub version: String,
    pub signature: String,
    pub fields: Vec<FieldInfo>,
}

#[derive(Debug, Serialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl From<&Arc<Entity>> for SchemaInfo {
    fn from(entity: &Arc<Entity>) -> Self {
        Self {
            package: entity.package().to_string(),
            name: entity.name().to_string(),
            version: entity.version().to_string(),
            signature: entity.signature().to_string(),
            fields: entity
                .fields()
                .iter()
                .map(|f| FieldInfo {
                    name: f.name.clone(),
                    ty: f.ty.to_string(),
                })
                .collect(),
        }
    }
}

/// Per-dump numbering of visited objects.
#[derive(Default)]
pub struct Renderer {
    seen: HashMap<usize, u32>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `obj`, and whether this is its first visit.
    fn visit(&mut self, obj: &ObjectRef) -> (u32, bool) {
        let next = self.seen.len() as u32 + 1;
        match self.seen.get(&obj.identity()) {
            Some(id) => (*id, false),
            None => {
                self.seen.insert(obj.identity(), next);
                (next, true)
            }
        }
    }

    // ------------------------------------------------------------------
    // Pretty text
    // ------------------------------------------------------------------

    pub fn pretty_root(&mut self, index: usize, obj: Option<&ObjectRef>) -> String {
        let mut out = String::new();
        let _ = write!(out, "{} ", format!("[root {}]", index).yellow());
        self.pretty_object(&mut out, obj, 0);
        out.push('\n');
        out
    }

    fn pretty_object(&mut self, out: &mut String, obj: Option<&ObjectRef>, depth: usize) {
        let Some(obj) = obj else {
            let _ = write!(out, "{}", "null".dimmed());
            return;
        };
        let (id, first) = self.visit(obj);
        if !first {
            let _ = write!(out, "{}", format!("-> #{}", id).magenta());
            return;
        }
        let guard = obj.read();
        match guard.as_any().downcast_ref::<DynamicObject>() {
            Some(dynamic) => {
                let _ = write!(
                    out,
                    "{} {}",
                    format!("#{}", id).green(),
                    dynamic.entity().qualified_name().cyan().bold()
                );
                self.pretty_fields(out, dynamic, depth + 1);
            }
            None => {
                let _ = write!(
                    out,
                    "{} {} {}",
                    format!("#{}", id).green(),
                    guard.entity().qualified_name().cyan().bold(),
                    "<opaque>".dimmed()
                );
            }
        }
    }

    fn pretty_fields(&mut self, out: &mut String, obj: &DynamicObject, depth: usize) {
        for (field, value) in obj.entity().fields().iter().zip(obj.values()) {
            out.push('\n');
            out.push_str(&INDENT.repeat(depth));
            let _ = write!(out, "{}: ", field.name.white());
            self.pretty_value(out, &field.ty, value, depth);
        }
    }

    fn pretty_value(&mut self, out: &mut String, ty: &Type, value: &Value, depth: usize) {
        match (ty, value) {
            (_, Value::Object(obj)) => self.pretty_object(out, obj.as_ref(), depth),
            (_, Value::Struct(inner)) => {
                let _ = write!(out, "{}", inner.entity().qualified_name().cyan());
                self.pretty_fields(out, inner, depth + 1);
            }
            (Type::List(element) | Type::Array(element, _), Value::List(items) | Value::Array(items)) => {
                let _ = write!(out, "{}", format!("[{} items]", items.len()).dimmed());
                for (i, item) in items.iter().enumerate() {
                    out.push('\n');
                    out.push_str(&INDENT.repeat(depth + 1));
                    let _ = write!(out, "[{}] ", i);
                    self.pretty_value(out, element, item, depth + 1);
                }
            }
            (Type::Map(key_type, value_type), Value::Map(pairs)) => {
                let _ = write!(out, "{}", format!("{{{} entries}}", pairs.len()).dimmed());
                for (k, v) in pairs {
                    out.push('\n');
                    out.push_str(&INDENT.repeat(depth + 1));
                    self.pretty_value(out, key_type, k, depth + 1);
                    out.push_str(" => ");
                    self.pretty_value(out, value_type, v, depth + 1);
                }
            }
            (Type::Enum(e), Value::Enum(v)) => match e.variant_by_value(*v) {
                Some(variant) => {
                    let _ = write!(out, "{} ({})", variant.name.blue(), v);
                }
                None => {
                    let _ = write!(out, "{}", v);
                }
            },
            (_, Value::String(s)) => {
                let _ = write!(out, "{:?}", s);
            }
            (_, scalar) => {
                let _ = write!(out, "{}", scalar_json(scalar));
            }
        }
    }

    // ------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------

    pub fn json_object(&mut self, obj: Option<&ObjectRef>) -> serde_json::Value {
        let Some(obj) = obj else {
            return serde_json::Value::Null;
        };
        let (id, first) = self.visit(obj);
        if !first {
            return json!({ "$ref": id });
        }
        let guard = obj.read();
        let mut map = Map::new();
        map.insert("$id".into(), json!(id));
        map.insert("$type".into(), json!(guard.entity().qualified_name()));
        if let Some(dynamic) = guard.as_any().downcast_ref::<DynamicObject>() {
            self.json_fields(&mut map, dynamic);
        }
        serde_json::Value::Object(map)
    }

    fn json_fields(&mut self, map: &mut Map<String, serde_json::Value>, obj: &DynamicObject) {
        for (field, value) in obj.entity().fields().iter().zip(obj.values()) {
            let rendered = self.json_value(&field.ty, value);
            map.insert(field.name.clone(), rendered);
        }
    }

    fn json_value(&mut self, ty: &Type, value: &Value) -> serde_json::Value {
        match (ty, value) {
            (_, Value::Object(obj)) => self.json_object(obj.as_ref()),
            (_, Value::Struct(inner)) => {
                let mut map = Map::new();
                map.insert("$type".into(), json!(inner.entity().qualified_name()));
                self.json_fields(&mut map, inner);
                serde_json::Value::Object(map)
            }
            (Type::List(element) | Type::Array(element, _), Value::List(items) | Value::Array(items)) => {
                serde_json::Value::Array(items.iter().map(|i| self.json_value(element, i)).collect())
            }
            // Keys may be any type, so maps render as [key, value] pairs.
            (Type::Map(key_type, value_type), Value::Map(pairs)) => serde_json::Value::Array(
                pairs
                    .iter()
                    .map(|(k, v)| json!([self.json_value(key_type, k), self.json_value(value_type, v)]))
                    .collect(),
            ),
            (Type::Enum(e), Value::Enum(v)) => match e.variant_by_value(*v) {
                Some(variant) => json!(variant.name),
                None => json!(v),
            },
            (_, scalar) => scalar_json(scalar),
        }
    }
}

fn scalar_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::I8(v) => json!(v),
        Value::I16(v) => json!(v),
        Value::I32(v) => json!(v),
        Value::I64(v) => json!(v),
        Value::U8(v) => json!(v),
        Value::U16(v) => json!(v),
        Value::U32(v) => json!(v),
        Value::U64(v) => json!(v),
        Value::F32(v) => float_json(f64::from(*v)),
        Value::F64(v) => float_json(*v),
        Value::String(v) => json!(v),
        Value::Enum(v) => json!(v),
        other => json!(other.kind_name()),
    }
}

fn float_json(v: f64) -> serde_json::Value {
    Number::from_f64(v).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
