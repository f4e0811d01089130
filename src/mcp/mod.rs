pub mod bridge;
pub mod client;
pub mod transport;
pub mod types;

pub use bridge::{describe_tools, to_function_schemas};
pub use client::{ClientInfo, ClientState, McpClient};
pub use transport::Transport;
pub use types::{Message, RequestId, Response, RpcError, ToolDescriptor};
