pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod index;
pub mod indicator;
pub mod locator;
pub mod model;
pub mod scenario;
pub mod service;
pub mod session;
pub mod surfaces;
pub mod sync;

pub use bus::{SelectionBus, SubscriptionId};
pub use config::{Config, ConfigError};
pub use dispatcher::{CommandDispatcher, DispatchReport, SurfaceError, SurfaceHost};
pub use index::{IndexError, IndexStats, ProjectIndex, SymbolIndex};
pub use indicator::{Indicator, IndicatorView};
pub use locator::{LocateError, SourceLocator};
pub use model::{
    DeclarationId, EventPayload, NodeId, NodeRef, Provenance, SelectionEvent, SourceLocation, Surface,
    TestKind, TestNode, TestOutcome, TestTree, TextRange,
};
pub use scenario::{Scenario, ScenarioError, ScenarioReport, ScenarioRunner};
pub use service::{SyncHandle, SyncInput, SyncService};
pub use session::{LinkSession, SessionOutcome};
pub use sync::{Command, LinkState, LinkSynchronizer, SyncError, SyncOptions, SyncStatus, Target, Transition};
