mod component;
pub mod config;
mod error;
pub mod init;
pub mod join;
mod render;
pub mod scene;
pub mod simulation;
mod state;
pub mod surface;
mod types;
pub mod viewport;

pub use component::{GraphViewCanvas, GraphViewHandle};
pub use config::{ForceConfig, ViewConfig};
pub use error::GraphViewError;
pub use init::{InitState, RetryPolicy, ViewSlot};
pub use render::{CanvasSurface, DocumentHost};
pub use state::{GraphView, NodeClickHandler};
pub use surface::{HeadlessHost, HeadlessSurface, RenderSurface, SurfaceHost};
pub use types::{GraphLink, GraphNode, GraphSnapshot, VisibleSet};
pub use viewport::ViewTransform;
