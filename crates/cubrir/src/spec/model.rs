//! Normalized endpoint model built from an OpenAPI/Swagger document.
//!
//! [`SpecModel::from_str`] is the sole ingestion point. It parses the
//! structural sections (paths, component schemas, security schemes),
//! resolves every internal `$ref` into the [`SchemaArena`], and exposes the
//! endpoints in declaration order so test numbering is reproducible across
//! runs. The model is immutable once built; a spec reload builds a fresh
//! model and replaces the old one atomically.

use super::schema::{
    ArraySchema, CompositeMode, CompositeSchema, NumberSchema, ObjectSchema, SchemaArena, SchemaId,
    SchemaNode, StringSchema,
};
use super::SpecParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// HTTP methods recognized in path items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// All methods, in the order OpenAPI path items are scanned.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
    ];

    /// Uppercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Lowercase key as it appears in a path item.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Path template segment
    Path,
    /// Query string
    Query,
    /// HTTP header
    Header,
    /// Cookie
    Cookie,
}

impl FromStr for ParamLocation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            _ => Err(()),
        }
    }
}

/// One declared operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter is carried.
    pub location: ParamLocation,
    /// Whether the parameter is required.
    pub required: bool,
    /// Constraint schema.
    pub schema: SchemaId,
}

/// Declared request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Body schema.
    pub schema: SchemaId,
    /// Whether the body is required.
    pub required: bool,
}

/// One declared response, keyed by status pattern (`200`, `4XX`, `default`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDecl {
    /// Status code pattern.
    pub status: String,
    /// Response body schema, if declared.
    pub schema: Option<SchemaId>,
}

impl ResponseDecl {
    /// Whether an observed status code matches this pattern.
    #[must_use]
    pub fn matches(&self, status: u16) -> bool {
        if self.status.eq_ignore_ascii_case("default") {
            return true;
        }
        if let Ok(exact) = self.status.parse::<u16>() {
            return exact == status;
        }
        // Wildcard pattern like "2XX"
        let pattern = self.status.to_ascii_uppercase();
        if pattern.len() == 3 && pattern.ends_with("XX") {
            if let Some(class) = pattern.chars().next().and_then(|c| c.to_digit(10)) {
                return u32::from(status / 100) == class;
            }
        }
        false
    }
}

/// Opaque endpoint identity; downstream components reference endpoints by ID
/// instead of owning them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub(crate) usize);

impl EndpointId {
    /// Raw index into the model's endpoint list.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One (HTTP method, path template) operation declared in the spec.
/// Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Identity in the owning model.
    pub id: EndpointId,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template, with the Swagger 2.0 `basePath` already applied.
    pub path: String,
    /// Declared `operationId`, if any.
    pub operation_id: Option<String>,
    /// Declared parameters (path-level merged with operation-level).
    pub parameters: Vec<Parameter>,
    /// Declared request body.
    pub request_body: Option<RequestBody>,
    /// Declared responses in declaration order.
    pub responses: Vec<ResponseDecl>,
    /// Names of security requirements that apply.
    pub security: Vec<String>,
}

impl Endpoint {
    /// Stable human-readable name: `operationId` or `method_path`.
    #[must_use]
    pub fn name(&self) -> String {
        self.operation_id.clone().unwrap_or_else(|| {
            format!(
                "{}_{}",
                self.method.key(),
                self.path.trim_matches('/').replace(['/', '{', '}'], "_")
            )
        })
    }

    /// `METHOD /path` label used in coverage output.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Spec flavor the document declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.x
    V3,
}

/// Basic document info (`info` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecInfo {
    /// API title.
    pub title: String,
    /// API version string.
    pub version: String,
    /// API description.
    pub description: String,
}

/// Normalized view of one API specification document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecModel {
    info: SpecInfo,
    spec_version: SpecVersion,
    endpoints: Vec<Endpoint>,
    arena: SchemaArena,
}

impl SpecModel {
    /// Parse a spec from JSON or YAML text.
    pub fn from_str(text: &str) -> Result<Self, SpecParseError> {
        let doc: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(json_err) => serde_yaml_ng::from_str(text)
                .map_err(|_| SpecParseError::malformed(format!("not valid JSON or YAML: {json_err}")))?,
        };
        Self::from_value(&doc)
    }

    /// Build a model from an already-parsed document.
    pub fn from_value(doc: &Value) -> Result<Self, SpecParseError> {
        Builder::new(doc)?.build()
    }

    /// Document info.
    #[must_use]
    pub fn info(&self) -> &SpecInfo {
        &self.info
    }

    /// Declared spec flavor.
    #[must_use]
    pub fn version(&self) -> SpecVersion {
        self.spec_version
    }

    /// Endpoints in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Look up an endpoint by ID.
    #[must_use]
    pub fn endpoint(&self, id: EndpointId) -> &Endpoint {
        &self.endpoints[id.0]
    }

    /// Resolve a schema ID.
    #[must_use]
    pub fn resolve(&self, id: SchemaId) -> &SchemaNode {
        self.arena.get(id)
    }

    /// The schema arena.
    #[must_use]
    pub fn arena(&self) -> &SchemaArena {
        &self.arena
    }
}

/// Single-use document builder.
struct Builder<'a> {
    doc: &'a Value,
    version: SpecVersion,
    arena: SchemaArena,
    /// Component/definition name → pre-allocated arena slot.
    components: HashMap<String, SchemaId>,
}

impl<'a> Builder<'a> {
    fn new(doc: &'a Value) -> Result<Self, SpecParseError> {
        if !doc.is_object() {
            return Err(SpecParseError::malformed("document root is not an object"));
        }
        let version = detect_version(doc)?;
        Ok(Self {
            doc,
            version,
            arena: SchemaArena::new(),
            components: HashMap::new(),
        })
    }

    fn build(mut self) -> Result<SpecModel, SpecParseError> {
        self.resolve_components()?;
        let endpoints = self.parse_paths()?;
        self.arena.mark_cycles();
        let cycles = self.arena.cyclic_ids().count();
        let info = parse_info(self.doc);
        info!(
            endpoints = endpoints.len(),
            schemas = self.arena.len(),
            cycles,
            title = %info.title,
            "parsed API specification"
        );
        Ok(SpecModel {
            info,
            spec_version: self.version,
            endpoints,
            arena: self.arena,
        })
    }

    /// Pre-allocate a slot per component so `$ref`s (including cyclic ones)
    /// resolve to stable IDs, then fill each slot.
    fn resolve_components(&mut self) -> Result<(), SpecParseError> {
        let section = match self.version {
            SpecVersion::V2 => self.doc.get("definitions"),
            SpecVersion::V3 => self.doc.get("components").and_then(|c| c.get("schemas")),
        };
        let Some(map) = section.and_then(Value::as_object) else {
            return Ok(());
        };
        for name in map.keys() {
            let slot = self.arena.reserve();
            self.components.insert(name.clone(), slot);
        }
        for (name, raw) in map {
            let node = self.build_node(raw)?;
            let slot = self.components[name];
            self.arena.fill(slot, node);
            debug!(component = %name, id = slot.index(), "resolved component schema");
        }
        Ok(())
    }

    /// Build a schema value into the arena, following `$ref`s.
    fn build_schema(&mut self, raw: &Value) -> Result<SchemaId, SpecParseError> {
        if let Some(reference) = raw.get("$ref").and_then(Value::as_str) {
            return self.resolve_ref(reference);
        }
        let node = self.build_node(raw)?;
        Ok(self.arena.insert(node))
    }

    fn resolve_ref(&self, reference: &str) -> Result<SchemaId, SpecParseError> {
        let name = reference
            .strip_prefix("#/components/schemas/")
            .or_else(|| reference.strip_prefix("#/definitions/"))
            .ok_or_else(|| SpecParseError::unresolved_reference(reference))?;
        self.components
            .get(name)
            .copied()
            .ok_or_else(|| SpecParseError::unresolved_reference(reference))
    }

    /// Build one schema object into a node (children recurse via
    /// [`Self::build_schema`]).
    fn build_node(&mut self, raw: &Value) -> Result<SchemaNode, SpecParseError> {
        let Some(obj) = raw.as_object() else {
            // `true` is the permissive JSON Schema; anything else is malformed.
            if raw == &Value::Bool(true) {
                return Ok(SchemaNode::Any);
            }
            return Err(SpecParseError::malformed(format!(
                "schema is not an object: {raw}"
            )));
        };

        for (key, mode) in [
            ("oneOf", CompositeMode::OneOf),
            ("anyOf", CompositeMode::AnyOf),
            ("allOf", CompositeMode::AllOf),
        ] {
            if let Some(branches) = obj.get(key).and_then(Value::as_array) {
                let branches = branches
                    .iter()
                    .map(|b| self.build_schema(b))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(SchemaNode::Composite(CompositeSchema { mode, branches }));
            }
        }

        let enum_values: Vec<Value> = obj
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let declared = obj.get("type").and_then(Value::as_str);
        let ty = declared.map_or_else(
            || infer_type(obj, &enum_values),
            std::string::ToString::to_string,
        );

        match ty.as_str() {
            "boolean" => Ok(SchemaNode::Boolean),
            "null" => Ok(SchemaNode::Null),
            "string" => Ok(SchemaNode::String(StringSchema {
                format: obj.get("format").and_then(Value::as_str).map(String::from),
                pattern: obj.get("pattern").and_then(Value::as_str).map(String::from),
                enum_values,
                min_length: obj.get("minLength").and_then(Value::as_u64),
                max_length: obj.get("maxLength").and_then(Value::as_u64),
            })),
            "integer" | "number" => {
                let schema = NumberSchema {
                    minimum: obj.get("minimum").and_then(Value::as_f64),
                    maximum: obj.get("maximum").and_then(Value::as_f64),
                    enum_values,
                };
                if ty == "integer" {
                    Ok(SchemaNode::Integer(schema))
                } else {
                    Ok(SchemaNode::Number(schema))
                }
            }
            "array" => {
                let items = match obj.get("items") {
                    Some(items) => Some(self.build_schema(items)?),
                    None => None,
                };
                Ok(SchemaNode::Array(ArraySchema {
                    items,
                    min_items: obj.get("minItems").and_then(Value::as_u64),
                    max_items: obj.get("maxItems").and_then(Value::as_u64),
                }))
            }
            "object" => {
                let mut properties = Vec::new();
                if let Some(props) = obj.get("properties").and_then(Value::as_object) {
                    for (name, prop) in props {
                        properties.push((name.clone(), self.build_schema(prop)?));
                    }
                }
                let required = obj
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|r| {
                        r.iter()
                            .filter_map(Value::as_str)
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(SchemaNode::Object(ObjectSchema {
                    properties,
                    required,
                }))
            }
            "any" => Ok(SchemaNode::Any),
            other => Err(SpecParseError::malformed(format!(
                "unknown schema type: {other}"
            ))),
        }
    }

    fn parse_paths(&mut self) -> Result<Vec<Endpoint>, SpecParseError> {
        let paths = self
            .doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| SpecParseError::malformed("missing paths section"))?;
        let base_path = match self.version {
            SpecVersion::V2 => self
                .doc
                .get("basePath")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim_end_matches('/')
                .to_string(),
            SpecVersion::V3 => String::new(),
        };
        let top_security = security_names(self.doc.get("security"));

        let mut endpoints = Vec::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared_params = item.get("parameters");
            for method in HttpMethod::ALL {
                let Some(operation) = item.get(method.key()) else {
                    continue;
                };
                let id = EndpointId(endpoints.len());
                let endpoint = self.parse_operation(
                    id,
                    method,
                    &format!("{base_path}{path}"),
                    operation,
                    shared_params,
                    &top_security,
                )?;
                endpoints.push(endpoint);
            }
        }
        Ok(endpoints)
    }

    fn parse_operation(
        &mut self,
        id: EndpointId,
        method: HttpMethod,
        path: &str,
        operation: &Value,
        shared_params: Option<&Value>,
        top_security: &[String],
    ) -> Result<Endpoint, SpecParseError> {
        let mut parameters = Vec::new();
        let mut request_body = None;

        let param_lists = shared_params
            .into_iter()
            .chain(operation.get("parameters"))
            .filter_map(Value::as_array)
            .flatten();
        for param in param_lists {
            let name = param
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let location = param.get("in").and_then(Value::as_str).unwrap_or_default();
            let required = param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == "path");
            if location == "body" {
                // Swagger 2.0 carries the body as a parameter.
                let schema = param.get("schema").unwrap_or(&Value::Null);
                request_body = Some(RequestBody {
                    schema: self.build_schema(schema)?,
                    required,
                });
                continue;
            }
            let Ok(location) = location.parse::<ParamLocation>() else {
                debug!(param = %name, location, "skipping parameter with unknown location");
                continue;
            };
            // OpenAPI 3.x nests constraints under `schema`; Swagger 2.0
            // keeps them on the parameter object itself.
            let schema = match param.get("schema") {
                Some(schema) => self.build_schema(schema)?,
                None => {
                    let node = self.build_node(param).unwrap_or(SchemaNode::Any);
                    self.arena.insert(node)
                }
            };
            parameters.push(Parameter {
                name,
                location,
                required,
                schema,
            });
        }

        if request_body.is_none() {
            if let Some(raw_body) = operation.get("requestBody") {
                request_body = self.parse_request_body(raw_body)?;
            }
        }

        let mut responses = Vec::new();
        if let Some(map) = operation.get("responses").and_then(Value::as_object) {
            for (status, decl) in map {
                let schema_raw = match self.version {
                    SpecVersion::V2 => decl.get("schema"),
                    SpecVersion::V3 => json_content_schema(decl.get("content")),
                };
                let schema = match schema_raw {
                    Some(raw) => Some(self.build_schema(raw)?),
                    None => None,
                };
                responses.push(ResponseDecl {
                    status: status.clone(),
                    schema,
                });
            }
        }

        let mut security = security_names(operation.get("security"));
        if security.is_empty() {
            security = top_security.to_vec();
        }

        Ok(Endpoint {
            id,
            method,
            path: path.to_string(),
            operation_id: operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(String::from),
            parameters,
            request_body,
            responses,
            security,
        })
    }

    fn parse_request_body(&mut self, raw: &Value) -> Result<Option<RequestBody>, SpecParseError> {
        let required = raw
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let Some(schema_raw) = json_content_schema(raw.get("content")) else {
            return Ok(None);
        };
        Ok(Some(RequestBody {
            schema: self.build_schema(schema_raw)?,
            required,
        }))
    }
}

fn detect_version(doc: &Value) -> Result<SpecVersion, SpecParseError> {
    if let Some(v) = doc.get("openapi").and_then(Value::as_str) {
        if v.starts_with("3.") {
            return Ok(SpecVersion::V3);
        }
        return Err(SpecParseError::unsupported_version(v));
    }
    if let Some(v) = doc.get("swagger").and_then(Value::as_str) {
        if v.starts_with("2.") {
            return Ok(SpecVersion::V2);
        }
        return Err(SpecParseError::unsupported_version(v));
    }
    Err(SpecParseError::unsupported_version(
        "missing openapi/swagger version field",
    ))
}

fn parse_info(doc: &Value) -> SpecInfo {
    let info = doc.get("info");
    let field = |name: &str| -> String {
        info.and_then(|i| i.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    SpecInfo {
        title: field("title"),
        version: field("version"),
        description: field("description"),
    }
}

/// Untyped schemas: infer from enum members or sibling keywords.
fn infer_type(obj: &serde_json::Map<String, Value>, enum_values: &[Value]) -> String {
    if let Some(first) = enum_values.first() {
        return match first {
            Value::String(_) => "string",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Null => "null",
        }
        .to_string();
    }
    if obj.contains_key("properties") || obj.contains_key("required") {
        return "object".to_string();
    }
    if obj.contains_key("items") {
        return "array".to_string();
    }
    "any".to_string()
}

/// Extract the JSON media-type schema from an OpenAPI 3.x `content` map.
fn json_content_schema(content: Option<&Value>) -> Option<&Value> {
    let map = content?.as_object()?;
    for preferred in ["application/json", "text/json", "*/*"] {
        if let Some(media) = map.get(preferred) {
            return media.get("schema");
        }
    }
    map.values().next()?.get("schema")
}

/// Names of the schemes in a security requirement list.
fn security_names(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(Value::as_array)
        .map(|reqs| {
            reqs.iter()
                .filter_map(Value::as_object)
                .flat_map(|m| m.keys().cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn items_spec() -> &'static str {
        r#"{
            "openapi": "3.0.0",
            "info": {"title": "Items", "version": "1.0.0"},
            "paths": {
                "/items": {
                    "get": {
                        "operationId": "listItems",
                        "responses": {"200": {"description": "ok"}}
                    },
                    "post": {
                        "operationId": "createItem",
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "name": {"type": "string"},
                                            "price": {"type": "number", "minimum": 0}
                                        },
                                        "required": ["name", "price"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {"description": "created"},
                            "400": {"description": "bad request"}
                        }
                    }
                },
                "/items/{id}": {
                    "get": {
                        "operationId": "getItem",
                        "parameters": [
                            {"name": "id", "in": "path", "required": true,
                             "schema": {"type": "integer", "minimum": 1}}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        }"#
    }

    #[test]
    fn test_parse_v3_declaration_order() {
        let model = SpecModel::from_str(items_spec()).unwrap();
        let labels: Vec<String> = model.endpoints().iter().map(Endpoint::label).collect();
        assert_eq!(
            labels,
            vec!["GET /items", "POST /items", "GET /items/{id}"]
        );
        assert_eq!(model.info().title, "Items");
        assert_eq!(model.version(), SpecVersion::V3);
    }

    #[test]
    fn test_request_body_required_fields() {
        let model = SpecModel::from_str(items_spec()).unwrap();
        let post = &model.endpoints()[1];
        let body = post.request_body.as_ref().unwrap();
        assert!(body.required);
        let SchemaNode::Object(obj) = model.resolve(body.schema) else {
            panic!("expected object body schema");
        };
        assert_eq!(obj.required, vec!["name", "price"]);
        assert_eq!(obj.properties.len(), 2);
    }

    #[test]
    fn test_path_parameter_required_by_default() {
        let model = SpecModel::from_str(items_spec()).unwrap();
        let get_item = &model.endpoints()[2];
        assert_eq!(get_item.parameters.len(), 1);
        let p = &get_item.parameters[0];
        assert_eq!(p.location, ParamLocation::Path);
        assert!(p.required);
        assert!(matches!(model.resolve(p.schema), SchemaNode::Integer(_)));
    }

    #[test]
    fn test_parse_swagger_v2_with_base_path() {
        let text = r##"{
            "swagger": "2.0",
            "info": {"title": "Legacy", "version": "2"},
            "basePath": "/v2",
            "paths": {
                "/pets": {
                    "post": {
                        "operationId": "addPet",
                        "parameters": [
                            {"name": "limit", "in": "query", "type": "integer", "maximum": 50},
                            {"name": "pet", "in": "body", "required": true,
                             "schema": {"$ref": "#/definitions/Pet"}}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            },
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }
            }
        }"##;
        let model = SpecModel::from_str(text).unwrap();
        assert_eq!(model.version(), SpecVersion::V2);
        let ep = &model.endpoints()[0];
        assert_eq!(ep.path, "/v2/pets");
        assert_eq!(ep.parameters.len(), 1);
        assert!(matches!(
            model.resolve(ep.parameters[0].schema),
            SchemaNode::Integer(_)
        ));
        let body = ep.request_body.as_ref().unwrap();
        assert!(matches!(model.resolve(body.schema), SchemaNode::Object(_)));
    }

    #[test]
    fn test_parse_yaml_document() {
        let text = "
openapi: '3.0.3'
info:
  title: Yaml API
  version: '1'
paths:
  /ping:
    get:
      responses:
        '200':
          description: pong
";
        let model = SpecModel::from_str(text).unwrap();
        assert_eq!(model.endpoints().len(), 1);
        assert_eq!(model.info().title, "Yaml API");
    }

    #[test]
    fn test_unresolved_reference_fails() {
        let text = r##"{
            "openapi": "3.0.0",
            "info": {"title": "x", "version": "1"},
            "paths": {
                "/a": {
                    "post": {
                        "requestBody": {
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Missing"}}}
                        },
                        "responses": {}
                    }
                }
            }
        }"##;
        let err = SpecModel::from_str(text).unwrap_err();
        assert!(matches!(err, SpecParseError::UnresolvedReference { .. }));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_unsupported_version_fails() {
        let err = SpecModel::from_str(r#"{"swagger": "1.2", "paths": {}}"#).unwrap_err();
        assert!(matches!(err, SpecParseError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_missing_version_fails() {
        let err = SpecModel::from_str(r#"{"paths": {}}"#).unwrap_err();
        assert!(matches!(err, SpecParseError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_malformed_document_fails() {
        let err = SpecModel::from_str("][ not a document").unwrap_err();
        assert!(matches!(err, SpecParseError::Malformed { .. }));
    }

    #[test]
    fn test_recursive_component_marked_cyclic() {
        let text = r##"{
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/nodes": {
                    "post": {
                        "requestBody": {
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Node"}}}
                        },
                        "responses": {"201": {"description": "created"}}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "string"},
                            "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                        },
                        "required": ["value"]
                    }
                }
            }
        }"##;
        let model = SpecModel::from_str(text).unwrap();
        let body = model.endpoints()[0].request_body.as_ref().unwrap();
        assert!(model.arena().is_cyclic(body.schema));
    }

    #[test]
    fn test_one_of_branches() {
        let text = r#"{
            "openapi": "3.1.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/pets": {
                    "post": {
                        "requestBody": {
                            "content": {"application/json": {"schema": {
                                "oneOf": [
                                    {"type": "object", "properties": {"bark": {"type": "boolean"}}},
                                    {"type": "object", "properties": {"meow": {"type": "boolean"}}}
                                ]
                            }}}
                        },
                        "responses": {}
                    }
                }
            }
        }"#;
        let model = SpecModel::from_str(text).unwrap();
        let body = model.endpoints()[0].request_body.as_ref().unwrap();
        let SchemaNode::Composite(c) = model.resolve(body.schema) else {
            panic!("expected composite");
        };
        assert_eq!(c.mode, CompositeMode::OneOf);
        assert_eq!(c.branches.len(), 2);
    }

    #[test]
    fn test_response_pattern_matching() {
        let exact = ResponseDecl {
            status: "200".to_string(),
            schema: None,
        };
        assert!(exact.matches(200));
        assert!(!exact.matches(201));

        let class = ResponseDecl {
            status: "4XX".to_string(),
            schema: None,
        };
        assert!(class.matches(404));
        assert!(class.matches(422));
        assert!(!class.matches(500));

        let default = ResponseDecl {
            status: "default".to_string(),
            schema: None,
        };
        assert!(default.matches(503));
    }

    #[test]
    fn test_endpoint_name_fallback() {
        let model = SpecModel::from_str(
            r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"},
                "paths":{"/a/{id}":{"delete":{"responses":{}}}}}"#,
        )
        .unwrap();
        assert_eq!(model.endpoints()[0].name(), "delete_a__id_");
    }

    #[test]
    fn test_security_inherited_from_top_level() {
        let text = r#"{
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "security": [{"bearerAuth": []}],
            "paths": {"/a": {"get": {"responses": {}}}}
        }"#;
        let model = SpecModel::from_str(text).unwrap();
        assert_eq!(model.endpoints()[0].security, vec!["bearerAuth"]);
    }
}
