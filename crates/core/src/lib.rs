pub mod delivery;
pub mod error;
pub mod ids;
pub mod model;

pub use delivery::{
    DeliveryEvent, DeliveryKind, DeliveryRecord, Dismissal, InningsClosure, OutMethod, OverEnd,
};
pub use error::{CoreError, ValidationError};
pub use ids::*;
pub use model::*;
