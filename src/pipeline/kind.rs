use super::model::{InputSocket, NodeCategory, NodeData, NodeId, OutputSocket, PipelineNode};
use crate::ast::Expression;
use crate::error::DefinitionError;
use crate::parser;
use crate::scope::Scope;
use serde::{Deserialize, Serialize};

/// Name under which socket expressions see the node's data map.
pub const DATA_BINDING: &str = "data";

/// Name under which output expressions see the narrowed type of input `index`.
pub fn input_binding(index: usize) -> String {
    format!("Input{}", index)
}

/// A registered node type: its category and the sockets every instance carries.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKind {
    name: String,
    category: NodeCategory,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
}

impl NodeKind {
    pub fn builder(name: impl Into<String>, category: NodeCategory) -> NodeKindBuilder {
        NodeKindBuilder {
            kind: NodeKind {
                name: name.into(),
                category,
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }

    pub(crate) fn instantiate(&self, id: NodeId, data: NodeData) -> PipelineNode {
        PipelineNode {
            id,
            kind: self.name.clone(),
            category: self.category,
            data,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// Checks every socket expression against `scope`. Inputs may reference
    /// `data`; outputs may also reference `Input0` … `InputN`.
    pub(crate) fn check_references(&self, scope: &Scope) -> Result<(), DefinitionError> {
        let input_names: Vec<String> = (0..self.inputs.len()).map(input_binding).collect();
        let mut output_bound: Vec<&str> = input_names.iter().map(String::as_str).collect();
        output_bound.push(DATA_BINDING);
        let input_bound: &[&str] = &[DATA_BINDING];

        let inputs = self
            .inputs
            .iter()
            .map(|s| (&s.label, &s.declared, input_bound));
        let outputs = self
            .outputs
            .iter()
            .map(|s| (&s.label, &s.declared, output_bound.as_slice()));

        for (label, declared, bound) in inputs.chain(outputs) {
            let Some(expression) = declared else {
                continue;
            };
            if let Some(missing) = scope.first_undefined(expression, bound) {
                return Err(DefinitionError::InvalidNodeKind {
                    kind: self.name.clone(),
                    message: format!("socket '{}' references undefined '{}'", label, missing),
                });
            }
        }
        Ok(())
    }
}

/// Builds a [`NodeKind`], parsing socket type expressions as they are added.
pub struct NodeKindBuilder {
    kind: NodeKind,
    error: Option<DefinitionError>,
}

impl NodeKindBuilder {
    pub fn input(self, label: &str, ty: &str) -> Self {
        self.push_input(label, Some(ty), None)
    }

    pub fn input_with_arity(self, label: &str, ty: &str, arity: usize) -> Self {
        self.push_input(label, Some(ty), Some(arity))
    }

    pub fn output(self, label: &str, ty: &str) -> Self {
        self.push_output(label, Some(ty))
    }

    pub fn build(self) -> Result<NodeKind, DefinitionError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.kind),
        }
    }

    fn push_input(mut self, label: &str, ty: Option<&str>, arity: Option<usize>) -> Self {
        let declared = self.parse(label, ty);
        self.kind.inputs.push(InputSocket {
            label: label.to_string(),
            declared,
            arity,
        });
        self
    }

    fn push_output(mut self, label: &str, ty: Option<&str>) -> Self {
        let declared = self.parse(label, ty);
        self.kind.outputs.push(OutputSocket {
            label: label.to_string(),
            declared,
        });
        self
    }

    fn parse(&mut self, label: &str, ty: Option<&str>) -> Option<Expression> {
        match parser::parse_expression(ty?) {
            Ok(expression) => Some(expression),
            Err(e) => {
                self.error.get_or_insert(DefinitionError::InvalidNodeKind {
                    kind: self.kind.name.clone(),
                    message: format!("socket '{}': {}", label, e),
                });
                None
            }
        }
    }
}

/// Serializable description of a node kind, as loaded from configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindDefinition {
    pub name: String,
    pub category: NodeCategory,
    #[serde(default)]
    pub inputs: Vec<InputSocketDefinition>,
    #[serde(default)]
    pub outputs: Vec<OutputSocketDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSocketDefinition {
    pub label: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub arity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSocketDefinition {
    pub label: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
}

impl TryFrom<KindDefinition> for NodeKind {
    type Error = DefinitionError;

    fn try_from(definition: KindDefinition) -> Result<Self, Self::Error> {
        let mut builder = NodeKind::builder(definition.name, definition.category);
        for input in &definition.inputs {
            builder = builder.push_input(&input.label, input.ty.as_deref(), input.arity);
        }
        for output in &definition.outputs {
            builder = builder.push_output(&output.label, output.ty.as_deref());
        }
        builder.build()
    }
}
