//! Tag vocabulary for the tagsift block parser.
//!
//! The vocabulary is the closed set of tool names the parser recognizes,
//! the valid parameter names per tool, and the optional "verbatim"
//! parameter whose value may itself contain tag-like text. It is built
//! once, validated up front, and never mutated during a turn. The parser
//! itself never fails; everything that can be rejected is rejected here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Definition of a single recognized tool tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTag {
    /// Tool name as it appears between angle brackets in the stream.
    pub name: String,

    /// Valid parameter names, in the order they are matched.
    #[serde(default)]
    pub parameters: Vec<String>,

    /// Parameter whose value may contain tag-like substrings. Extracted
    /// with first-open/last-close matching instead of first-close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbatim: Option<String>,
}

impl ToolTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            verbatim: None,
        }
    }
}

/// Wire shape of a vocabulary definitions document (YAML or JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularyFile {
    tools: Vec<ToolTag>,
}

/// Errors raised while constructing a vocabulary.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("tag name is empty")]
    EmptyName,

    #[error("tag name '{0}' cannot be expressed as a marker")]
    InvalidName(String),

    #[error("duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("duplicate parameter '{param}' on tool '{tool}'")]
    DuplicateParameter { tool: String, param: String },

    #[error("verbatim parameter '{param}' is not a parameter of tool '{tool}'")]
    UnknownVerbatim { tool: String, param: String },

    #[error("failed to parse vocabulary definitions: {0}")]
    Definition(String),
}

/// The closed set of tool tags the parser will recognize.
///
/// Iteration order is the definition order, which is also the documented
/// tie-break order when two names could match the same marker suffix.
#[derive(Debug, Clone, Default)]
pub struct TagVocabulary {
    tools: Vec<ToolTag>,
}

impl TagVocabulary {
    /// Build a vocabulary from tool definitions, validating every name.
    pub fn from_tools(tools: Vec<ToolTag>) -> Result<Self, VocabularyError> {
        for (index, tool) in tools.iter().enumerate() {
            validate_name(&tool.name)?;
            if tools[..index].iter().any(|t| t.name == tool.name) {
                return Err(VocabularyError::DuplicateTool(tool.name.clone()));
            }

            for (p_index, param) in tool.parameters.iter().enumerate() {
                validate_name(param)?;
                if tool.parameters[..p_index].contains(param) {
                    return Err(VocabularyError::DuplicateParameter {
                        tool: tool.name.clone(),
                        param: param.clone(),
                    });
                }
            }

            if let Some(verbatim) = &tool.verbatim {
                if !tool.parameters.contains(verbatim) {
                    return Err(VocabularyError::UnknownVerbatim {
                        tool: tool.name.clone(),
                        param: verbatim.clone(),
                    });
                }
            }
        }

        Ok(Self { tools })
    }

    /// Load a vocabulary from a YAML definitions document.
    pub fn from_yaml_str(text: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_yaml::from_str(text)
            .map_err(|e| VocabularyError::Definition(e.to_string()))?;
        Self::from_tools(file.tools)
    }

    /// Load a vocabulary from a JSON definitions document.
    pub fn from_json_str(text: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_json::from_str(text)
            .map_err(|e| VocabularyError::Definition(e.to_string()))?;
        Self::from_tools(file.tools)
    }

    pub fn builder() -> VocabularyBuilder {
        VocabularyBuilder::default()
    }

    /// Check whether a candidate string is a recognized tool name.
    pub fn is_tool_name(&self, candidate: &str) -> bool {
        self.tools.iter().any(|t| t.name == candidate)
    }

    /// Recognized tool names, in fixed definition order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    /// Valid parameter names for a tool, in fixed definition order.
    /// Unknown tools have no parameters.
    pub fn parameters_of(&self, tool: &str) -> &[String] {
        self.get(tool).map(|t| t.parameters.as_slice()).unwrap_or(&[])
    }

    /// Check whether a parameter of a tool is marked verbatim.
    pub fn is_verbatim(&self, tool: &str, param: &str) -> bool {
        self.verbatim_parameter(tool) == Some(param)
    }

    /// The verbatim parameter of a tool, if it has one.
    pub fn verbatim_parameter(&self, tool: &str) -> Option<&str> {
        self.get(tool).and_then(|t| t.verbatim.as_deref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, tool: &str) -> Option<&ToolTag> {
        self.tools.iter().find(|t| t.name == tool)
    }
}

/// Incremental construction of a vocabulary.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    tools: Vec<ToolTag>,
}

impl VocabularyBuilder {
    /// Add a tool with the given parameters, none of them verbatim.
    pub fn tool<I, S>(mut self, name: &str, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.push(ToolTag {
            name: name.to_string(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            verbatim: None,
        });
        self
    }

    /// Add a tool whose named parameter is verbatim.
    pub fn tool_with_verbatim<I, S>(mut self, name: &str, parameters: I, verbatim: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.push(ToolTag {
            name: name.to_string(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            verbatim: Some(verbatim.to_string()),
        });
        self
    }

    pub fn build(self) -> Result<TagVocabulary, VocabularyError> {
        TagVocabulary::from_tools(self.tools)
    }
}

/// A name must survive being wrapped in `<...>` and `</...>` unambiguously.
fn validate_name(name: &str) -> Result<(), VocabularyError> {
    if name.is_empty() {
        return Err(VocabularyError::EmptyName);
    }
    if name
        .chars()
        .any(|c| c == '<' || c == '>' || c == '/' || c.is_whitespace())
    {
        return Err(VocabularyError::InvalidName(name.to_string()));
    }
    Ok(())
}
