pub mod payload;
pub mod resource;
pub mod target;

pub use payload::{
    ConfigData, HubData, InstallData, ResourceKind, ResourcePayload, SchemaError, TargetData,
    TextfileData,
};
pub use resource::{Lifetime, ResourceHandle, ResourceRecord};
pub use target::{TargetDescriptor, TargetLabels, render_target_file};
