//! Deterministic value generation from schema constraints.
//!
//! No randomness anywhere: ties always break the same way (first enum
//! member, lower numeric bound, shortest valid string, branch 0), so the
//! same (schema, mode) pair always yields the same value and test counts
//! stay reproducible across runs.

use crate::spec::{
    ArraySchema, CompositeMode, NumberSchema, SchemaArena, SchemaId, SchemaNode, StringSchema,
};
use crate::synth::WarningKind;
use serde_json::{json, Map, Value};

/// How rich the generated value should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Smallest value satisfying `required` + type constraints.
    Minimal,
    /// Exercises enum/format constraints and optional fields.
    Representative,
}

/// Which edge of a bound a boundary case probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundProbe {
    /// One below the minimum (expected client error).
    UnderMin,
    /// Exactly the minimum (expected success).
    AtMin,
    /// Exactly the maximum (expected success).
    AtMax,
    /// One above the maximum (expected client error).
    OverMax,
}

impl BoundProbe {
    /// Whether this probe lies outside the declared bounds.
    pub(crate) fn out_of_range(self) -> bool {
        matches!(self, Self::UnderMin | Self::OverMax)
    }
}

/// Schema-to-value generator with depth-capped recursion.
pub(crate) struct ValueGen<'a> {
    arena: &'a SchemaArena,
    depth_cap: usize,
    warnings: Vec<(WarningKind, String)>,
}

impl<'a> ValueGen<'a> {
    pub(crate) fn new(arena: &'a SchemaArena, depth_cap: usize) -> Self {
        Self {
            arena,
            depth_cap,
            warnings: Vec::new(),
        }
    }

    /// Warnings accumulated so far (truncations, skipped constructs).
    pub(crate) fn take_warnings(&mut self) -> Vec<(WarningKind, String)> {
        std::mem::take(&mut self.warnings)
    }

    /// Number of top-level cases the schema expands to: one per oneOf/anyOf
    /// branch, otherwise one.
    pub(crate) fn branch_count(&self, id: SchemaId) -> usize {
        match self.arena.get(id) {
            SchemaNode::Composite(c) if c.mode != CompositeMode::AllOf => c.branches.len().max(1),
            _ => 1,
        }
    }

    /// Generate a value, selecting `branch` when the top-level schema is a
    /// oneOf/anyOf composite. Nested composites always take branch 0.
    pub(crate) fn value_for_branch(
        &mut self,
        id: SchemaId,
        branch: usize,
        mode: Mode,
    ) -> Option<Value> {
        match self.arena.get(id) {
            SchemaNode::Composite(c) if c.mode != CompositeMode::AllOf => {
                let target = c.branches.get(branch).copied()?;
                self.generate(target, mode, 1)
            }
            _ => self.generate(id, mode, 0),
        }
    }

    /// Generate a value for the schema (branch 0 at the top level).
    pub(crate) fn value(&mut self, id: SchemaId, mode: Mode) -> Option<Value> {
        self.generate(id, mode, 0)
    }

    fn generate(&mut self, id: SchemaId, mode: Mode, depth: usize) -> Option<Value> {
        if depth >= self.depth_cap {
            self.warnings.push((
                WarningKind::RecursionCapReached,
                format!("schema #{} truncated at depth {}", id.index(), depth),
            ));
            return None;
        }
        // Clone the node up front: recursion below needs `&mut self` while
        // an arena borrow would still be live.
        match self.arena.get(id).clone() {
            SchemaNode::Boolean => Some(Value::Bool(mode == Mode::Representative)),
            SchemaNode::Null => Some(Value::Null),
            SchemaNode::String(s) => Some(string_value(&s, mode)),
            SchemaNode::Integer(n) => Some(number_value(&n, mode, true)),
            SchemaNode::Number(n) => Some(number_value(&n, mode, false)),
            SchemaNode::Object(obj) => {
                let mut map = Map::new();
                for (name, prop) in &obj.properties {
                    let include = mode == Mode::Representative || obj.is_required(name);
                    if !include {
                        continue;
                    }
                    // A truncated child is omitted; the warning is already
                    // recorded by the recursive call.
                    if let Some(value) = self.generate(*prop, mode, depth + 1) {
                        let _ = map.insert(name.clone(), value);
                    }
                }
                Some(Value::Object(map))
            }
            SchemaNode::Array(a) => self.array_value(&a, mode, depth),
            SchemaNode::Composite(c) => {
                match c.mode {
                    CompositeMode::OneOf | CompositeMode::AnyOf => {
                        let first = c.branches.first().copied()?;
                        self.generate(first, mode, depth + 1)
                    }
                    CompositeMode::AllOf => {
                        // Merge object branches; non-objects fall back to the
                        // first generated branch.
                        let mut merged = Map::new();
                        let mut fallback = None;
                        for branch in &c.branches {
                            match self.generate(*branch, mode, depth + 1) {
                                Some(Value::Object(map)) => merged.extend(map),
                                Some(other) if fallback.is_none() => fallback = Some(other),
                                _ => {}
                            }
                        }
                        if merged.is_empty() {
                            fallback
                        } else {
                            Some(Value::Object(merged))
                        }
                    }
                }
            }
            SchemaNode::Any => Some(match mode {
                Mode::Minimal => Value::Null,
                Mode::Representative => json!("sample"),
            }),
        }
    }

    fn array_value(&mut self, a: &ArraySchema, mode: Mode, depth: usize) -> Option<Value> {
        let min = a.min_items.unwrap_or(0) as usize;
        let count = match mode {
            Mode::Minimal => min,
            Mode::Representative => min.max(1).min(a.max_items.unwrap_or(u64::MAX) as usize),
        };
        if count == 0 {
            return Some(json!([]));
        }
        let item = match a.items {
            Some(items) => match self.generate(items, mode, depth + 1) {
                Some(value) => value,
                // Item truncated by the depth cap: an empty array is still
                // valid when minItems allows it, otherwise truncate the case.
                None if min == 0 => return Some(json!([])),
                None => return None,
            },
            None => Value::Null,
        };
        Some(Value::Array(vec![item; count]))
    }

    /// Boundary probes for a bounded schema. Empty for unbounded schemas.
    pub(crate) fn boundary_values(&mut self, id: SchemaId) -> Vec<(BoundProbe, Value)> {
        let mut probes = Vec::new();
        match self.arena.get(id).clone() {
            SchemaNode::Integer(n) | SchemaNode::Number(n) => {
                let integer = matches!(self.arena.get(id), SchemaNode::Integer(_));
                if let Some(min) = n.minimum {
                    probes.push((BoundProbe::UnderMin, num(min - 1.0, integer)));
                    probes.push((BoundProbe::AtMin, num(min, integer)));
                }
                if let Some(max) = n.maximum {
                    probes.push((BoundProbe::AtMax, num(max, integer)));
                    probes.push((BoundProbe::OverMax, num(max + 1.0, integer)));
                }
            }
            SchemaNode::String(s) => {
                if let Some(min) = s.min_length {
                    if min > 0 {
                        probes.push((BoundProbe::UnderMin, fill_string(min - 1)));
                    }
                    probes.push((BoundProbe::AtMin, fill_string(min)));
                }
                if let Some(max) = s.max_length {
                    probes.push((BoundProbe::AtMax, fill_string(max)));
                    probes.push((BoundProbe::OverMax, fill_string(max + 1)));
                }
            }
            SchemaNode::Array(a) => {
                let item = a
                    .items
                    .and_then(|items| self.generate(items, Mode::Minimal, 1))
                    .unwrap_or(Value::Null);
                if let Some(min) = a.min_items {
                    if min > 0 {
                        probes.push((BoundProbe::UnderMin, fill_array(&item, min - 1)));
                    }
                    probes.push((BoundProbe::AtMin, fill_array(&item, min)));
                }
                if let Some(max) = a.max_items {
                    probes.push((BoundProbe::AtMax, fill_array(&item, max)));
                    probes.push((BoundProbe::OverMax, fill_array(&item, max + 1)));
                }
            }
            _ => {}
        }
        probes
    }

    /// A value of a deliberately different primitive type, for the
    /// wrong-type strategy. `None` when the schema has no type to violate.
    pub(crate) fn wrong_type_value(&self, id: SchemaId) -> Option<Value> {
        match self.arena.get(id) {
            SchemaNode::String(_) => Some(json!(12345)),
            SchemaNode::Integer(_) | SchemaNode::Number(_) => Some(json!("not-a-number")),
            SchemaNode::Boolean => Some(json!("definitely")),
            SchemaNode::Array(_) => Some(json!("not-an-array")),
            SchemaNode::Object(_) => Some(json!([1, 2, 3])),
            SchemaNode::Composite(c) => {
                let first = c.branches.first().copied()?;
                self.wrong_type_value(first)
            }
            SchemaNode::Null | SchemaNode::Any => None,
        }
    }
}

fn string_value(s: &StringSchema, mode: Mode) -> Value {
    if let Some(first) = s.enum_values.first() {
        return first.clone();
    }
    let min = s.min_length.unwrap_or(0) as usize;
    match mode {
        Mode::Minimal => fill_string(min as u64),
        Mode::Representative => {
            let base = match s.format.as_deref() {
                Some("date-time") => "2024-01-01T00:00:00Z".to_string(),
                Some("date") => "2024-01-01".to_string(),
                Some("email") => "user@example.com".to_string(),
                Some("uuid") => "00000000-0000-4000-8000-000000000000".to_string(),
                Some("uri" | "url") => "https://example.com/resource".to_string(),
                _ => "sample".to_string(),
            };
            let mut value = base;
            if value.len() < min {
                value.push_str(&"a".repeat(min - value.len()));
            }
            if let Some(max) = s.max_length {
                value.truncate(max as usize);
            }
            Value::String(value)
        }
    }
}

fn number_value(n: &NumberSchema, mode: Mode, integer: bool) -> Value {
    if let Some(first) = n.enum_values.first() {
        return first.clone();
    }
    let preferred = match mode {
        Mode::Minimal => n.minimum.unwrap_or(0.0),
        Mode::Representative => {
            if integer {
                42.0
            } else {
                3.5
            }
        }
    };
    let clamped = clamp(preferred, n.minimum, n.maximum);
    num(clamped, integer)
}

fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut v = value;
    if let Some(min) = min {
        v = v.max(min);
    }
    if let Some(max) = max {
        v = v.min(max);
    }
    v
}

fn num(value: f64, integer: bool) -> Value {
    if integer {
        json!(value as i64)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn fill_string(len: u64) -> Value {
    Value::String("a".repeat(len as usize))
}

fn fill_array(item: &Value, count: u64) -> Value {
    Value::Array(vec![item.clone(); count as usize])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::spec::{ObjectSchema, SpecModel};

    fn arena_with(text: &str) -> SpecModel {
        SpecModel::from_str(text).unwrap()
    }

    fn gen_for(model: &SpecModel) -> ValueGen<'_> {
        ValueGen::new(model.arena(), 5)
    }

    fn body_schema(model: &SpecModel) -> SchemaId {
        model.endpoints()[0].request_body.as_ref().unwrap().schema
    }

    fn spec_with_body(schema: &str) -> String {
        format!(
            r#"{{"openapi":"3.0.0","info":{{"title":"t","version":"1"}},
                "paths":{{"/x":{{"post":{{
                    "requestBody":{{"content":{{"application/json":{{"schema":{schema}}}}}}},
                    "responses":{{}}}}}}}}}}"#
        )
    }

    #[test]
    fn test_minimal_object_has_required_only() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"object","properties":{
                "name":{"type":"string","minLength":2},
                "note":{"type":"string"}},
                "required":["name"]}"#,
        ));
        let mut gen = gen_for(&model);
        let value = gen.value(body_schema(&model), Mode::Minimal).unwrap();
        assert_eq!(value, json!({"name": "aa"}));
    }

    #[test]
    fn test_representative_object_has_all_properties() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"object","properties":{
                "name":{"type":"string"},
                "when":{"type":"string","format":"date"}},
                "required":["name"]}"#,
        ));
        let mut gen = gen_for(&model);
        let value = gen
            .value(body_schema(&model), Mode::Representative)
            .unwrap();
        assert_eq!(value, json!({"name": "sample", "when": "2024-01-01"}));
    }

    #[test]
    fn test_enum_always_picks_first() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"string","enum":["red","green","blue"]}"#,
        ));
        let mut gen = gen_for(&model);
        assert_eq!(
            gen.value(body_schema(&model), Mode::Minimal).unwrap(),
            json!("red")
        );
        assert_eq!(
            gen.value(body_schema(&model), Mode::Representative).unwrap(),
            json!("red")
        );
    }

    #[test]
    fn test_integer_respects_lower_bound() {
        let model = arena_with(&spec_with_body(r#"{"type":"integer","minimum":7}"#));
        let mut gen = gen_for(&model);
        assert_eq!(
            gen.value(body_schema(&model), Mode::Minimal).unwrap(),
            json!(7)
        );
    }

    #[test]
    fn test_representative_integer_clamped_to_max() {
        let model = arena_with(&spec_with_body(r#"{"type":"integer","maximum":10}"#));
        let mut gen = gen_for(&model);
        assert_eq!(
            gen.value(body_schema(&model), Mode::Representative).unwrap(),
            json!(10)
        );
    }

    #[test]
    fn test_minimal_array_is_empty_without_min_items() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"array","items":{"type":"string"}}"#,
        ));
        let mut gen = gen_for(&model);
        assert_eq!(
            gen.value(body_schema(&model), Mode::Minimal).unwrap(),
            json!([])
        );
    }

    #[test]
    fn test_array_honors_min_items() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"array","items":{"type":"integer"},"minItems":2}"#,
        ));
        let mut gen = gen_for(&model);
        assert_eq!(
            gen.value(body_schema(&model), Mode::Minimal).unwrap(),
            json!([0, 0])
        );
    }

    #[test]
    fn test_recursive_schema_truncates_with_warning() {
        let model = arena_with(
            r##"{"openapi":"3.0.0","info":{"title":"t","version":"1"},
                "paths":{"/n":{"post":{
                    "requestBody":{"content":{"application/json":{"schema":{"$ref":"#/components/schemas/Node"}}}},
                    "responses":{}}}},
                "components":{"schemas":{"Node":{
                    "type":"object",
                    "properties":{
                        "value":{"type":"string"},
                        "next":{"$ref":"#/components/schemas/Node"}},
                    "required":["value","next"]}}}}"##,
        );
        let mut gen = ValueGen::new(model.arena(), 3);
        let value = gen.value(body_schema(&model), Mode::Minimal).unwrap();
        // Terminates: children beyond the cap are omitted, not expanded.
        assert_eq!(
            value,
            json!({"value": "", "next": {"value": "", "next": {}}})
        );
        let warnings = gen.take_warnings();
        assert!(!warnings.is_empty());
        assert!(warnings
            .iter()
            .all(|(kind, _)| *kind == WarningKind::RecursionCapReached));
    }

    #[test]
    fn test_one_of_branch_selection() {
        let model = arena_with(&spec_with_body(
            r#"{"oneOf":[
                {"type":"object","properties":{"bark":{"type":"boolean"}},"required":["bark"]},
                {"type":"object","properties":{"meow":{"type":"boolean"}},"required":["meow"]}]}"#,
        ));
        let mut gen = gen_for(&model);
        let id = body_schema(&model);
        assert_eq!(gen.branch_count(id), 2);
        assert_eq!(
            gen.value_for_branch(id, 0, Mode::Minimal).unwrap(),
            json!({"bark": false})
        );
        assert_eq!(
            gen.value_for_branch(id, 1, Mode::Minimal).unwrap(),
            json!({"meow": false})
        );
    }

    #[test]
    fn test_all_of_merges_objects() {
        let model = arena_with(&spec_with_body(
            r#"{"allOf":[
                {"type":"object","properties":{"a":{"type":"integer"}},"required":["a"]},
                {"type":"object","properties":{"b":{"type":"boolean"}},"required":["b"]}]}"#,
        ));
        let mut gen = gen_for(&model);
        let id = body_schema(&model);
        assert_eq!(gen.branch_count(id), 1);
        assert_eq!(
            gen.value(id, Mode::Minimal).unwrap(),
            json!({"a": 0, "b": false})
        );
    }

    #[test]
    fn test_boundary_probes_for_bounded_integer() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"integer","minimum":1,"maximum":10}"#,
        ));
        let mut gen = gen_for(&model);
        let probes = gen.boundary_values(body_schema(&model));
        assert_eq!(
            probes,
            vec![
                (BoundProbe::UnderMin, json!(0)),
                (BoundProbe::AtMin, json!(1)),
                (BoundProbe::AtMax, json!(10)),
                (BoundProbe::OverMax, json!(11)),
            ]
        );
    }

    #[test]
    fn test_boundary_probes_for_bounded_string() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"string","minLength":2,"maxLength":4}"#,
        ));
        let mut gen = gen_for(&model);
        let probes = gen.boundary_values(body_schema(&model));
        assert_eq!(probes.len(), 4);
        assert_eq!(probes[0], (BoundProbe::UnderMin, json!("a")));
        assert_eq!(probes[3], (BoundProbe::OverMax, json!("aaaaa")));
    }

    #[test]
    fn test_unbounded_schema_has_no_probes() {
        let model = arena_with(&spec_with_body(r#"{"type":"boolean"}"#));
        let mut gen = gen_for(&model);
        assert!(gen.boundary_values(body_schema(&model)).is_empty());
    }

    #[test]
    fn test_wrong_type_values() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"object","properties":{
                "s":{"type":"string"},
                "i":{"type":"integer"},
                "b":{"type":"boolean"}},
                "required":["s","i","b"]}"#,
        ));
        let gen = gen_for(&model);
        let id = body_schema(&model);
        let SchemaNode::Object(ObjectSchema { properties, .. }) = model.resolve(id).clone() else {
            panic!("expected object");
        };
        let by_name: std::collections::HashMap<_, _> = properties.into_iter().collect();
        assert_eq!(gen.wrong_type_value(by_name["s"]), Some(json!(12345)));
        assert_eq!(gen.wrong_type_value(by_name["i"]), Some(json!("not-a-number")));
        assert_eq!(gen.wrong_type_value(by_name["b"]), Some(json!("definitely")));
    }

    #[test]
    fn test_determinism_same_value_twice() {
        let model = arena_with(&spec_with_body(
            r#"{"type":"object","properties":{
                "name":{"type":"string","format":"email"},
                "count":{"type":"integer","minimum":3}},
                "required":["name","count"]}"#,
        ));
        let mut g1 = gen_for(&model);
        let mut g2 = gen_for(&model);
        let id = body_schema(&model);
        assert_eq!(
            g1.value(id, Mode::Representative),
            g2.value(id, Mode::Representative)
        );
    }
}
