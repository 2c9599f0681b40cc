pub mod registry;
pub mod schedule;
pub mod traits;
pub mod types;

pub use registry::ToolRegistry;
pub use schedule::{DeferredPrompt, GetDateTool, SchedulePromptTool, ScheduleRelativeTimeTool};
pub use traits::Tool;
pub use types::{ToolResult, ToolSpec};
