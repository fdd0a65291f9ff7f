//! Controller layer: UI events and error modeling.

pub mod events;
