use serde::{Deserialize, Serialize};

/// A function definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema of the function signature
    pub input_schema: serde_json::Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, input_schema: serde_json::Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A function invocation requested by the model.
///
/// Arguments are carried as the raw string the provider sent. Their schema is
/// caller-defined and this layer never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Create a call with a generated id, for providers that do not assign one.
    pub fn generated<N, A>(name: N, arguments: A) -> Self
    where
        N: Into<String>,
        A: Into<String>,
    {
        Self::new(format!("call_{}", uuid::Uuid::new_v4().simple()), name, arguments)
    }
}
