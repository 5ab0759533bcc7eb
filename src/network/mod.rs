//! Network association
//!
//! The one blocking wait in the agent: nothing else can happen until the
//! device has an address that routes to the controller.

mod association;

pub use association::{associate_until_success, NetworkAssociator, RouteAssociator};
