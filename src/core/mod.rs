pub mod cancel;
pub mod config;
pub mod event_bus;
pub mod http_client;
pub mod path;
pub mod runtime_context;
pub mod workflow_state;

pub use cancel::{CancelSignal, Canceled};
pub use config::EngineConfig;
pub use event_bus::{create_event_channel, EventReceiver, EventSender, RunEvent};
pub use http_client::{
    HttpMethod, HttpPoolConfig, HttpTransport, Transport, TransportRequest, TransportResponse,
};
pub use runtime_context::{FakeIdGenerator, IdGenerator, RealIdGenerator, RuntimeContext};
pub use workflow_state::{SharedState, WorkflowState};
