pub mod alert;
pub mod country;
pub mod item;
pub mod listing;

pub use alert::{AlertPayload, AlertStatus, NotificationType};
pub use country::{Block, Country};
pub use item::{ItemKind, ItemRef};
pub use listing::{Condition, NormalizedListing, Source};
