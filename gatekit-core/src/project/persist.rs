//! Persistence
//!
//! Projects and definitions are stored as type-tagged records: every object
//! is wrapped as `{"/<TypeName>": payload}`. The records are plain serde
//! types, so the same tree is written as JSON or as MessagePack.
//!
//! Revival is all-or-nothing. A definition is registered only after every
//! gate, wire, and saved value in its record checked out, and a project
//! revives its definitions dependencies first.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Project;
use crate::definition::{Definition, Wire};
use crate::error::{GateError, PersistError};
use crate::gate::{
    self, CompoundGate, Constant, Datetime, Gate, GateData, GateDim, GateKind, GateUid, Nand,
    Reshaper, Sink, Source, StateEntry, StateMap,
};
use crate::graph::DirectedGraph;

#[derive(Debug, Serialize, Deserialize)]
enum ProjectRecord {
    #[serde(rename = "/Project")]
    Project(ProjectBody),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectBody {
    name: String,
    dependency_graph: DirectedGraph<String>,
    definitions: IndexMap<String, DefinitionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
enum DefinitionRecord {
    #[serde(rename = "/GateDefinition")]
    Definition(DefinitionBody),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionBody {
    name: String,
    input_dims: Vec<GateDim>,
    output_dims: Vec<GateDim>,
    input_labels: Vec<String>,
    output_labels: Vec<String>,
    source: GateUid,
    sink: GateUid,
    gates: IndexMap<GateUid, GateRecord>,
    connections: IndexMap<GateUid, IndexMap<GateUid, Vec<Wire>>>,
    state: StateRecord,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateRecord {
    inputs: GateData,
    outputs: GateData,
    instance: StateMap,
}

#[derive(Debug, Serialize, Deserialize)]
enum GateRecord {
    #[serde(rename = "/Source")]
    Source(Source),
    #[serde(rename = "/Sink")]
    Sink(Sink),
    #[serde(rename = "/NAND")]
    Nand(Nand),
    #[serde(rename = "/Constant")]
    Constant(Constant),
    #[serde(rename = "/Datetime")]
    Datetime(Datetime),
    #[serde(rename = "/Reshaper")]
    Reshaper(Reshaper),
    #[serde(rename = "/CompoundGate")]
    Compound(String),
}

impl From<&GateKind> for GateRecord {
    fn from(kind: &GateKind) -> Self {
        match kind {
            GateKind::Source(gate) => GateRecord::Source(gate.clone()),
            GateKind::Sink(gate) => GateRecord::Sink(gate.clone()),
            GateKind::Nand(gate) => GateRecord::Nand(*gate),
            GateKind::Constant(gate) => GateRecord::Constant(gate.clone()),
            GateKind::Datetime(gate) => GateRecord::Datetime(*gate),
            GateKind::Reshaper(gate) => GateRecord::Reshaper(gate.clone()),
            GateKind::Compound(gate) => GateRecord::Compound(gate.name().to_owned()),
        }
    }
}

impl GateRecord {
    /// Rebuild the gate. Compound gates take their port layout from the
    /// already revived definition they name.
    fn into_gate(self, uid: GateUid, project: &Project) -> Result<Gate, PersistError> {
        let kind = match self {
            GateRecord::Source(gate) => GateKind::Source(gate),
            GateRecord::Sink(gate) => GateKind::Sink(gate),
            GateRecord::Nand(gate) => GateKind::Nand(gate),
            GateRecord::Constant(gate) => GateKind::Constant(gate),
            GateRecord::Datetime(gate) => GateKind::Datetime(gate),
            GateRecord::Reshaper(gate) => GateKind::Reshaper(gate),
            GateRecord::Compound(name) => {
                let definition = project.definition(&name).ok_or_else(|| {
                    PersistError::syntax("GateDefinition", format!("gate {uid} has unknown type {name}"))
                })?;
                GateKind::Compound(CompoundGate::new(
                    name.clone(),
                    definition.input_dims().to_vec(),
                    definition.output_dims().to_vec(),
                    definition.input_labels().to_vec(),
                    definition.output_labels().to_vec(),
                ))
            }
        };
        Ok(Gate::new(uid, kind))
    }
}

fn definition_record(definition: &Definition) -> DefinitionRecord {
    let gates = definition
        .gates()
        .map(|gate| (gate.uid(), GateRecord::from(gate.kind())))
        .collect();
    let mut connections: IndexMap<GateUid, IndexMap<GateUid, Vec<Wire>>> = IndexMap::new();
    for ((from, to), wires) in definition.connections().iter() {
        connections.entry(from).or_default().insert(to, wires.to_vec());
    }
    let state = definition.state();

    DefinitionRecord::Definition(DefinitionBody {
        name: definition.name().to_owned(),
        input_dims: definition.input_dims().to_vec(),
        output_dims: definition.output_dims().to_vec(),
        input_labels: definition.input_labels().to_vec(),
        output_labels: definition.output_labels().to_vec(),
        source: definition.source(),
        sink: definition.sink(),
        gates,
        connections,
        state: StateRecord {
            inputs: state.inputs.clone(),
            outputs: state.outputs.clone(),
            instance: state.gates.clone(),
        },
    })
}

/// Check that the port gate stored under `uid` is the expected kind with the
/// expected widths.
fn check_port(body: &DefinitionBody, uid: GateUid, inputs: bool) -> Result<(), PersistError> {
    let matches = match (body.gates.get(&uid), inputs) {
        (Some(GateRecord::Source(source)), true) => {
            gate::Behavior::output_dims(source) == body.input_dims.as_slice()
        }
        (Some(GateRecord::Sink(sink)), false) => {
            gate::Behavior::input_dims(sink) == body.output_dims.as_slice()
        }
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        let role = if inputs { "source" } else { "sink" };
        Err(PersistError::syntax(
            "GateDefinition",
            format!("{}: {role} gate {uid} is missing or does not match the ports", body.name),
        ))
    }
}

/// Rebuild a definition from its record and register it with `project`.
///
/// On error the project may be partially modified; callers revive into a
/// scratch project.
fn revive_definition(project: &mut Project, mut body: DefinitionBody) -> Result<(), PersistError> {
    let name = body.name.clone();
    if project.contains(&name) {
        return Err(GateError::DefinitionExists(name).into());
    }
    if body.input_dims.iter().chain(&body.output_dims).any(|&dim| dim == 0) {
        return Err(GateError::InvalidDimension.into());
    }
    for (labels, dims) in [(&body.input_labels, &body.input_dims), (&body.output_labels, &body.output_dims)] {
        if labels.len() != dims.len() {
            return Err(GateError::LabelCount { expected: dims.len(), found: labels.len() }.into());
        }
    }
    if body.source == body.sink {
        return Err(PersistError::syntax("GateDefinition", format!("{name}: source and sink share a uid")));
    }
    check_port(&body, body.source, true)?;
    check_port(&body, body.sink, false)?;

    let mut definition = Definition::new(
        name.clone(),
        body.source,
        body.sink,
        body.input_dims.clone(),
        body.output_dims.clone(),
        body.input_labels.clone(),
        body.output_labels.clone(),
    );
    project.dependencies.add_vertex(name.clone());
    for port_type in ["Source", "Sink"] {
        project.dependencies.add_edge(name.clone(), port_type.to_owned());
    }

    for (uid, record) in std::mem::take(&mut body.gates) {
        if !project.uids.reserve(uid) {
            return Err(PersistError::syntax(
                "GateDefinition",
                format!("{name}: gate uid {uid} is out of range"),
            ));
        }
        if uid == body.source || uid == body.sink {
            continue;
        }
        let gate = record.into_gate(uid, project)?;
        let entry = match body.state.instance.shift_remove(&uid) {
            Some(entry) => entry,
            None => {
                let mut state = gate.init_state(project);
                let outputs = gate.call(project, &gate.init_inputs(), state.as_mut());
                StateEntry::new(state, Some(outputs))
            }
        };
        project.register_instance(&gate);
        definition.insert_gate(gate, entry, &mut project.dependencies)?;
    }
    if let Some(uid) = body.state.instance.keys().next() {
        return Err(PersistError::syntax(
            "GateDefinition",
            format!("{name}: state recorded for unknown gate {uid}"),
        ));
    }

    for (from, targets) in &body.connections {
        for (to, wires) in targets {
            for &(output, input) in wires {
                definition.connect((*from, output), (input, *to))?;
            }
        }
    }

    gate::validate(&body.state.inputs, &body.input_dims)?;
    gate::validate(&body.state.outputs, &body.output_dims)?;
    let state = definition.state_mut();
    state.inputs = body.state.inputs;
    state.outputs = body.state.outputs;

    project.definitions.insert(name.clone(), definition);
    debug!(project = %project.name, definition = %name, "revived definition");
    Ok(())
}

impl Project {
    fn record(&self) -> ProjectRecord {
        ProjectRecord::Project(ProjectBody {
            name: self.name.clone(),
            dependency_graph: self.dependencies.clone(),
            definitions: self
                .definitions
                .iter()
                .map(|(name, definition)| (name.clone(), definition_record(definition)))
                .collect(),
        })
    }

    fn revive(body: ProjectBody) -> Result<Project, PersistError> {
        let ProjectBody { name, dependency_graph, mut definitions } = body;
        let mut project = Project::new(name);

        // Components come out dependents first; revive dependencies first.
        for component in dependency_graph.strongly_connected_components().into_iter().rev() {
            let cyclic = component.len() > 1
                || component.iter().any(|v| dependency_graph.contains_edge(v, v));
            if cyclic {
                return Err(PersistError::syntax(
                    "Project",
                    format!("dependency graph has a cycle through {:?}", component),
                ));
            }
            for type_name in component {
                if gate::is_builtin(&type_name) {
                    continue;
                }
                let Some(DefinitionRecord::Definition(record)) = definitions.shift_remove(&type_name) else {
                    return Err(PersistError::syntax(
                        "Project",
                        format!("no definition recorded for {type_name}"),
                    ));
                };
                if record.name != type_name {
                    return Err(PersistError::syntax(
                        "Project",
                        format!("definition {} is stored under {type_name}", record.name),
                    ));
                }
                revive_definition(&mut project, record)?;
            }
        }

        if let Some(name) = definitions.keys().next() {
            return Err(PersistError::syntax(
                "Project",
                format!("definition {name} is missing from the dependency graph"),
            ));
        }
        Ok(project)
    }

    /// Serialize the whole project as JSON.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.record())?)
    }

    /// Revive a project written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Project, PersistError> {
        let ProjectRecord::Project(body) = serde_json::from_str(json)?;
        Self::revive(body)
    }

    /// Serialize the whole project as MessagePack.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, PersistError> {
        Ok(rmp_serde::to_vec_named(&self.record())?)
    }

    /// Revive a project written by [`to_msgpack`](Self::to_msgpack).
    pub fn from_msgpack(bytes: &[u8]) -> Result<Project, PersistError> {
        let ProjectRecord::Project(body) = rmp_serde::from_slice(bytes)?;
        Self::revive(body)
    }

    /// Serialize one definition as JSON.
    pub fn definition_to_json(&self, name: &str) -> Result<String, PersistError> {
        let definition = self.require(name)?;
        Ok(serde_json::to_string(&definition_record(definition))?)
    }

    /// Add a definition written by
    /// [`definition_to_json`](Self::definition_to_json). Every gate type it
    /// uses must already exist. Nothing changes if revival fails.
    pub fn import_definition(&mut self, json: &str) -> Result<(), PersistError> {
        let DefinitionRecord::Definition(body) = serde_json::from_str(json)?;
        let mut scratch = self.clone();
        revive_definition(&mut scratch, body)?;
        *self = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter(project: &mut Project) {
        let mut not = project.define("NOT", vec![1], vec![1], None, Some(vec!["out".into()])).unwrap();
        let nand = not.add_nand().unwrap();
        not.tie_input_to(0, (0, nand)).unwrap();
        not.tie_input_to(0, (1, nand)).unwrap();
        not.tie_output_to((nand, 0), 0).unwrap();
    }

    #[test]
    fn records_are_type_tagged() {
        let mut project = Project::new("p");
        inverter(&mut project);
        let value: serde_json::Value = serde_json::from_str(&project.to_json().unwrap()).unwrap();

        let body = &value["/Project"];
        assert_eq!(body["name"], "p");
        assert!(body["dependencyGraph"]["/DirectedGraph"].is_array());
        let not = &body["definitions"]["NOT"]["/GateDefinition"];
        assert_eq!(not["outputLabels"], serde_json::json!(["out"]));
        assert_eq!(not["gates"]["2"], serde_json::json!({"/NAND": null}));
        assert_eq!(not["gates"]["0"], serde_json::json!({"/Source": [1]}));
    }

    #[test]
    fn malformed_payloads_name_the_record() {
        let err = Project::from_json(r#"{"/Project": {"name": "p"}}"#).unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));

        let mut project = Project::new("p");
        inverter(&mut project);
        let mut value: serde_json::Value = serde_json::from_str(&project.to_json().unwrap()).unwrap();
        value["/Project"]["definitions"]["NOT"]["/GateDefinition"]["source"] = serde_json::json!(2);
        let err = Project::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PersistError::Syntax { type_name: "GateDefinition", .. }));
    }

    #[test]
    fn revived_gates_are_checked() {
        let mut project = Project::new("p");
        inverter(&mut project);
        let value: serde_json::Value = serde_json::from_str(&project.definition_to_json("NOT").unwrap()).unwrap();

        let mut huge = value.clone();
        huge["/GateDefinition"]["gates"][u64::MAX.to_string()] = serde_json::json!({"/NAND": null});
        let err = Project::new("q").import_definition(&huge.to_string()).unwrap_err();
        assert!(matches!(err, PersistError::Syntax { type_name: "GateDefinition", .. }));
        assert!(err.to_string().contains("out of range"));

        let mut extra = value;
        extra["/GateDefinition"]["gates"]["3"] = serde_json::json!({"/Source": [1]});
        let mut other = Project::new("q");
        let err = other.import_definition(&extra.to_string()).unwrap_err();
        assert!(matches!(err, PersistError::Gate(GateError::PortGate(..))));
        assert_eq!(other.names().count(), 0);
    }

    #[test]
    fn import_is_atomic() {
        let mut project = Project::new("p");
        inverter(&mut project);
        let json = project.definition_to_json("NOT").unwrap();

        let err = project.import_definition(&json).unwrap_err();
        assert!(matches!(err, PersistError::Gate(GateError::DefinitionExists(_))));
        assert_eq!(project.names().count(), 1);

        let mut other = Project::new("q");
        let mut broken: serde_json::Value = serde_json::from_str(&json).unwrap();
        broken["/GateDefinition"]["state"]["inputs"] = serde_json::json!([[1, 1]]);
        let err = other.import_definition(&broken.to_string()).unwrap_err();
        assert!(matches!(err, PersistError::Gate(GateError::InvalidGateData { .. })));
        assert_eq!(other.names().count(), 0);
        assert_eq!(other.dependencies().vertex_count(), gate::BUILTIN_TYPES.len());

        other.import_definition(&json).unwrap();
        assert_eq!(other.definition("NOT").unwrap().gates().count(), 3);
        assert!(other.nand().uid() > GateUid::from(2));
    }
}
