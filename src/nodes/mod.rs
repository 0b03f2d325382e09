pub mod executor;
pub mod params;
pub mod registry;

pub use executor::{classify_response, NodeExecutor};
pub use params::OutputMap;
pub use registry::{
    FieldSpec, HttpEndpoint, MethodRegistry, MethodSpec, ParamsShape, StaticMethodRegistry,
    TransportKind,
};
