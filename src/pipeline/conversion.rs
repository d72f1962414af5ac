use super::definition::PipelineDefinition;
use crate::error::ConversionError;

/// A trait for custom data models that can be converted into a keiro `PipelineDefinition`.
///
/// This is the extension point for loading pipelines saved by other editors.
/// By implementing this trait on your own structs, you provide a translation
/// layer from your format to the graph's bulk `load`.
///
/// # Example
///
/// ```rust,no_run
/// use keiro::prelude::*;
/// use keiro::error::ConversionError;
///
/// struct Stage { name: String, operation: String, feeds: Option<String> }
/// struct Workflow { stages: Vec<Stage> }
///
/// impl IntoPipeline for Workflow {
///     fn into_pipeline(self) -> std::result::Result<PipelineDefinition, ConversionError> {
///         let mut definition = PipelineDefinition::default();
///         for stage in self.stages {
///             if stage.name.is_empty() {
///                 return Err(ConversionError::ValidationError("unnamed stage".into()));
///             }
///             if let Some(next) = stage.feeds {
///                 definition.edges.push(EdgeDefinition {
///                     source: NodeId::from(stage.name.as_str()),
///                     source_socket: 0,
///                     target: NodeId::from(next),
///                     target_socket: 0,
///                 });
///             }
///             definition.nodes.push(NodeDefinition {
///                 id: NodeId::from(stage.name),
///                 kind: stage.operation,
///                 data: NodeData::new(),
///             });
///         }
///         Ok(definition)
///     }
/// }
/// ```
pub trait IntoPipeline {
    /// Consumes the object and converts it into a keiro pipeline definition.
    fn into_pipeline(self) -> Result<PipelineDefinition, ConversionError>;
}

impl IntoPipeline for PipelineDefinition {
    fn into_pipeline(self) -> Result<PipelineDefinition, ConversionError> {
        Ok(self)
    }
}
