#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod expansion;
pub mod graph;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod payload;
pub mod session;
pub mod source;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, MergeConfig, Viewport, load_config};
pub use expansion::{ExpandError, ExpansionController, ExpansionOutcome, ExpansionTicket};
pub use graph::{GraphModel, MergeReport};
pub use layout::{Layout, LayoutParams, calculate_node_positions, compute_layout, redistribute};
pub use model::{Cluster, Edge, ExpansionPayload, GraphPayload, Metadata, Node, NodeId};
pub use session::{GraphOrigin, Session, SessionError};
pub use source::{ExpansionRequest, FetchError, GraphSource, RecordedSource, SampleSource};
