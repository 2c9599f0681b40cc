use super::types::{ToolResult, ToolSpec};
use futures_util::future::BoxFuture;
use serde_json::Value;

/// A function an agent offers to the model, such as scheduling a prompt.
pub trait Tool: Send + Sync {
    /// Name the model uses in a tool call.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the call arguments.
    fn parameters_schema(&self) -> Value;

    /// Run one call. Bad arguments belong in a failed [`ToolResult`] so the
    /// model can see them; `Err` is reserved for infrastructure failures.
    fn execute(&self, args: Value) -> BoxFuture<'_, anyhow::Result<ToolResult>>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
