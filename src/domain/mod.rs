//! Order domain: aggregates, value objects, events, pricing policies and
//! the overall-status reducer.
pub mod aggregates;
pub mod events;
pub mod policies;
pub mod status;
pub mod value_objects;

#[cfg(test)]
pub(crate) mod fixtures;
