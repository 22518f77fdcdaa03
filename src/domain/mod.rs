// Domain layer - Trajectory data shapes and errors
pub mod deviation;
pub mod error;
pub mod signal;
pub mod task;
pub mod trajectory;
