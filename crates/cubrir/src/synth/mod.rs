//! Test case synthesis: schema constraints in, concrete request cases out.
//!
//! Strategies are independent and composable. Synthesis is deterministic for
//! a given (endpoint, strategy, schema) triple so test counts are
//! reproducible across runs, and recursion is depth-capped so even
//! self-referential schemas terminate.

mod value;

pub(crate) use value::{BoundProbe, Mode, ValueGen};

use crate::spec::{
    EndpointId, HttpMethod, ObjectSchema, ParamLocation, SchemaId, SchemaNode, SpecModel,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default recursion depth cap for schema expansion.
pub const DEFAULT_DEPTH_CAP: usize = 5;

/// Named rule for deriving concrete values from a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Smallest value satisfying required + type constraints.
    ValidMinimal,
    /// Exercises declared enum/format constraints, defaults per type.
    ValidRepresentative,
    /// min-1/max+1 (expected client error) and exact min/max (expected
    /// success) for bounded fields.
    Boundary,
    /// Omits each required field in turn.
    MissingRequired,
    /// Substitutes a differently-typed value for each field in turn.
    WrongType,
}

impl Strategy {
    /// All strategies, in canonical order.
    pub const ALL: [Self; 5] = [
        Self::ValidMinimal,
        Self::ValidRepresentative,
        Self::Boundary,
        Self::MissingRequired,
        Self::WrongType,
    ];

    /// Stable tag used in config and case IDs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidMinimal => "valid-minimal",
            Self::ValidRepresentative => "valid-representative",
            Self::Boundary => "boundary",
            Self::MissingRequired => "missing-required",
            Self::WrongType => "wrong-type",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Outcome class a synthesized case expects from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedOutcome {
    /// 2xx
    Success,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// No expectation; any observed outcome matches.
    Unspecified,
}

impl ExpectedOutcome {
    /// Whether an observed status (None = transport failure) matches this
    /// expectation.
    #[must_use]
    pub fn matches(self, status: Option<u16>) -> bool {
        match self {
            Self::Unspecified => true,
            Self::Success => status.is_some_and(|s| (200..300).contains(&s)),
            Self::ClientError => status.is_some_and(|s| (400..500).contains(&s)),
            Self::ServerError => status.is_some_and(|s| (500..600).contains(&s)),
        }
    }
}

/// One concrete, synthesized request scenario for an endpoint.
///
/// Created by the synthesizer, consumed once by an executor, then retained
/// only inside its `ExecutionResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Stable case ID: `{operation}::{strategy}::{n}`.
    pub id: String,
    /// Originating endpoint.
    pub endpoint: EndpointId,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template (parameters substituted at execution time).
    pub path: String,
    /// Strategy that produced the case.
    pub strategy: Strategy,
    /// Path parameter values.
    pub path_params: Vec<(String, Value)>,
    /// Query parameter values.
    pub query: Vec<(String, Value)>,
    /// Header values.
    pub headers: Vec<(String, Value)>,
    /// Cookie values.
    pub cookies: Vec<(String, Value)>,
    /// JSON request body.
    pub body: Option<Value>,
    /// Expected outcome class.
    pub expected: ExpectedOutcome,
}

/// Why synthesis degraded. Non-fatal: the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Recursion depth cap hit; nested cases truncated.
    RecursionCapReached,
    /// Schema construct not supported; field skipped.
    UnsupportedConstruct,
}

/// Non-fatal synthesis degradation, recorded rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisWarning {
    /// Endpoint being synthesized.
    pub endpoint: EndpointId,
    /// Degradation category.
    pub kind: WarningKind,
    /// Human-readable detail.
    pub detail: String,
}

/// Cases plus any warnings produced while synthesizing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthOutput {
    /// Generated test cases.
    pub cases: Vec<TestCase>,
    /// Warnings, deduplicated per endpoint.
    pub warnings: Vec<SynthesisWarning>,
}

/// Deterministic test case synthesizer over one spec model.
#[derive(Debug)]
pub struct Synthesizer<'a> {
    model: &'a SpecModel,
    depth_cap: usize,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer with the default depth cap.
    #[must_use]
    pub fn new(model: &'a SpecModel) -> Self {
        Self {
            model,
            depth_cap: DEFAULT_DEPTH_CAP,
        }
    }

    /// Override the recursion depth cap.
    #[must_use]
    pub fn with_depth_cap(mut self, depth_cap: usize) -> Self {
        self.depth_cap = depth_cap;
        self
    }

    /// Synthesize cases for every endpoint in the model.
    #[must_use]
    pub fn synthesize_all(&self, strategies: &[Strategy]) -> SynthOutput {
        let mut output = SynthOutput::default();
        for endpoint in self.model.endpoints() {
            let one = self.synthesize(endpoint.id, strategies);
            output.cases.extend(one.cases);
            output.warnings.extend(one.warnings);
        }
        debug!(
            cases = output.cases.len(),
            warnings = output.warnings.len(),
            "synthesis complete"
        );
        output
    }

    /// Synthesize cases for one endpoint with the requested strategies.
    #[must_use]
    pub fn synthesize(&self, endpoint: EndpointId, strategies: &[Strategy]) -> SynthOutput {
        let endpoint = self.model.endpoint(endpoint);
        let mut gen = ValueGen::new(self.model.arena(), self.depth_cap);
        let mut cases = Vec::new();

        for &strategy in strategies {
            match strategy {
                Strategy::ValidMinimal => {
                    self.valid_cases(endpoint, strategy, Mode::Minimal, &mut gen, &mut cases);
                }
                Strategy::ValidRepresentative => {
                    self.valid_cases(endpoint, strategy, Mode::Representative, &mut gen, &mut cases);
                }
                Strategy::Boundary => self.boundary_cases(endpoint, &mut gen, &mut cases),
                Strategy::MissingRequired => {
                    self.missing_required_cases(endpoint, &mut gen, &mut cases);
                }
                Strategy::WrongType => self.wrong_type_cases(endpoint, &mut gen, &mut cases),
            }
        }

        // Dedupe warnings per endpoint: the same truncated schema may be hit
        // once per strategy.
        let mut seen = BTreeSet::new();
        let warnings = gen
            .take_warnings()
            .into_iter()
            .filter(|(kind, detail)| seen.insert((*kind, detail.clone())))
            .map(|(kind, detail)| SynthesisWarning {
                endpoint: endpoint.id,
                kind,
                detail,
            })
            .collect();

        SynthOutput { cases, warnings }
    }

    /// One valid case per top-level body branch (or exactly one without a
    /// body).
    fn valid_cases(
        &self,
        endpoint: &crate::spec::Endpoint,
        strategy: Strategy,
        mode: Mode,
        gen: &mut ValueGen<'_>,
        cases: &mut Vec<TestCase>,
    ) {
        let branches = endpoint
            .request_body
            .as_ref()
            .map_or(1, |rb| gen.branch_count(rb.schema));
        for branch in 0..branches {
            let baseline = self.baseline(endpoint, mode, branch, gen);
            cases.push(make_case(
                endpoint,
                strategy,
                cases_for(cases, endpoint, strategy),
                baseline,
                ExpectedOutcome::Success,
            ));
        }
    }

    fn boundary_cases(
        &self,
        endpoint: &crate::spec::Endpoint,
        gen: &mut ValueGen<'_>,
        cases: &mut Vec<TestCase>,
    ) {
        // Probe parameters one at a time against a valid-minimal baseline.
        for param in &endpoint.parameters {
            for (probe, value) in gen.boundary_values(param.schema) {
                let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
                baseline.set_param(param.location, &param.name, value);
                let expected = if probe.out_of_range() {
                    ExpectedOutcome::ClientError
                } else {
                    ExpectedOutcome::Success
                };
                cases.push(make_case(
                    endpoint,
                    Strategy::Boundary,
                    cases_for(cases, endpoint, Strategy::Boundary),
                    baseline,
                    expected,
                ));
            }
        }
        // And top-level body object properties.
        if let Some(obj) = self.body_object(endpoint) {
            for (name, prop) in &obj.properties {
                for (probe, value) in gen.boundary_values(*prop) {
                    let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
                    baseline.set_body_field(name, value);
                    let expected = if probe.out_of_range() {
                        ExpectedOutcome::ClientError
                    } else {
                        ExpectedOutcome::Success
                    };
                    cases.push(make_case(
                        endpoint,
                        Strategy::Boundary,
                        cases_for(cases, endpoint, Strategy::Boundary),
                        baseline,
                        expected,
                    ));
                }
            }
        }
    }

    /// Exactly one case per required field: each required parameter, then
    /// each required top-level body property. A required body with nothing
    /// individually required yields a single omit-the-body case.
    fn missing_required_cases(
        &self,
        endpoint: &crate::spec::Endpoint,
        gen: &mut ValueGen<'_>,
        cases: &mut Vec<TestCase>,
    ) {
        for param in &endpoint.parameters {
            if !param.required {
                continue;
            }
            let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
            baseline.remove_param(param.location, &param.name);
            cases.push(make_case(
                endpoint,
                Strategy::MissingRequired,
                cases_for(cases, endpoint, Strategy::MissingRequired),
                baseline,
                ExpectedOutcome::ClientError,
            ));
        }
        let Some(rb) = &endpoint.request_body else {
            return;
        };
        let required_props: Vec<String> = self
            .body_object(endpoint)
            .map(|obj| obj.required.clone())
            .unwrap_or_default();
        if required_props.is_empty() {
            if rb.required {
                let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
                baseline.body = None;
                cases.push(make_case(
                    endpoint,
                    Strategy::MissingRequired,
                    cases_for(cases, endpoint, Strategy::MissingRequired),
                    baseline,
                    ExpectedOutcome::ClientError,
                ));
            }
            return;
        }
        for name in required_props {
            let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
            baseline.remove_body_field(&name);
            cases.push(make_case(
                endpoint,
                Strategy::MissingRequired,
                cases_for(cases, endpoint, Strategy::MissingRequired),
                baseline,
                ExpectedOutcome::ClientError,
            ));
        }
    }

    fn wrong_type_cases(
        &self,
        endpoint: &crate::spec::Endpoint,
        gen: &mut ValueGen<'_>,
        cases: &mut Vec<TestCase>,
    ) {
        for param in &endpoint.parameters {
            let Some(wrong) = gen.wrong_type_value(param.schema) else {
                continue;
            };
            let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
            baseline.set_param(param.location, &param.name, wrong);
            cases.push(make_case(
                endpoint,
                Strategy::WrongType,
                cases_for(cases, endpoint, Strategy::WrongType),
                baseline,
                ExpectedOutcome::ClientError,
            ));
        }
        if let Some(obj) = self.body_object(endpoint) {
            for (name, prop) in &obj.properties {
                let Some(wrong) = gen.wrong_type_value(*prop) else {
                    continue;
                };
                let mut baseline = self.baseline(endpoint, Mode::Minimal, 0, gen);
                baseline.set_body_field(name, wrong);
                cases.push(make_case(
                    endpoint,
                    Strategy::WrongType,
                    cases_for(cases, endpoint, Strategy::WrongType),
                    baseline,
                    ExpectedOutcome::ClientError,
                ));
            }
        }
    }

    /// Concrete values for the endpoint's parameters and body.
    fn baseline(
        &self,
        endpoint: &crate::spec::Endpoint,
        mode: Mode,
        branch: usize,
        gen: &mut ValueGen<'_>,
    ) -> Baseline {
        let mut baseline = Baseline::default();
        for param in &endpoint.parameters {
            // Minimal cases carry only what the endpoint requires.
            if mode == Mode::Minimal && !param.required {
                continue;
            }
            if let Some(value) = gen.value(param.schema, mode) {
                baseline.set_param(param.location, &param.name, value);
            }
        }
        if let Some(rb) = &endpoint.request_body {
            baseline.body = gen.value_for_branch(rb.schema, branch, mode);
        }
        baseline
    }

    /// The body schema as a top-level object, following composite branch 0.
    fn body_object(&self, endpoint: &crate::spec::Endpoint) -> Option<&ObjectSchema> {
        let rb = endpoint.request_body.as_ref()?;
        self.resolve_object(rb.schema, 0)
    }

    fn resolve_object(&self, id: SchemaId, depth: usize) -> Option<&ObjectSchema> {
        if depth > self.depth_cap {
            return None;
        }
        match self.model.resolve(id) {
            SchemaNode::Object(obj) => Some(obj),
            SchemaNode::Composite(c) => {
                let first = c.branches.first().copied()?;
                self.resolve_object(first, depth + 1)
            }
            _ => None,
        }
    }
}

/// Working set of concrete values for one case.
#[derive(Debug, Clone, Default)]
struct Baseline {
    path_params: Vec<(String, Value)>,
    query: Vec<(String, Value)>,
    headers: Vec<(String, Value)>,
    cookies: Vec<(String, Value)>,
    body: Option<Value>,
}

impl Baseline {
    fn bucket(&mut self, location: ParamLocation) -> &mut Vec<(String, Value)> {
        match location {
            ParamLocation::Path => &mut self.path_params,
            ParamLocation::Query => &mut self.query,
            ParamLocation::Header => &mut self.headers,
            ParamLocation::Cookie => &mut self.cookies,
        }
    }

    fn set_param(&mut self, location: ParamLocation, name: &str, value: Value) {
        let bucket = self.bucket(location);
        if let Some(slot) = bucket.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            bucket.push((name.to_string(), value));
        }
    }

    fn remove_param(&mut self, location: ParamLocation, name: &str) {
        self.bucket(location).retain(|(n, _)| n != name);
    }

    fn set_body_field(&mut self, name: &str, value: Value) {
        if let Some(Value::Object(map)) = &mut self.body {
            let _ = map.insert(name.to_string(), value);
        }
    }

    fn remove_body_field(&mut self, name: &str) {
        if let Some(Value::Object(map)) = &mut self.body {
            let _ = map.remove(name);
        }
    }
}

/// Sequence number of the next case for (endpoint, strategy).
fn cases_for(cases: &[TestCase], endpoint: &crate::spec::Endpoint, strategy: Strategy) -> usize {
    cases
        .iter()
        .filter(|c| c.endpoint == endpoint.id && c.strategy == strategy)
        .count()
}

fn make_case(
    endpoint: &crate::spec::Endpoint,
    strategy: Strategy,
    seq: usize,
    baseline: Baseline,
    expected: ExpectedOutcome,
) -> TestCase {
    TestCase {
        id: format!("{}::{}::{}", endpoint.name(), strategy, seq),
        endpoint: endpoint.id,
        method: endpoint.method,
        path: endpoint.path.clone(),
        strategy,
        path_params: baseline.path_params,
        query: baseline.query,
        headers: baseline.headers,
        cookies: baseline.cookies,
        body: baseline.body,
        expected,
    }
}
