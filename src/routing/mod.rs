//! Agent routing for group, private and autonomous turns

pub mod strategies;

pub use strategies::{
    AlternatingStrategy, Alternation, BroadcastStrategy, RoutingDecision, RoutingStrategy,
};
