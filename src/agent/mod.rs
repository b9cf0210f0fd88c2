pub mod bot;
pub mod engagement;
pub mod explorer;
pub mod selector;
pub mod target;
pub mod tracking;
pub mod zone_memory;

pub use bot::{BotLoop, BotParts, Tick};
pub use engagement::{AttackOutcome, EngagementController, EngagementState, ReleaseReason};
pub use explorer::Explorer;
pub use selector::{Rebind, TargetSelector};
pub use target::Target;
pub use tracking::PointerTracker;
pub use zone_memory::{ZoneKind, ZoneMemory};
