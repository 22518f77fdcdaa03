// Application layer - Trajectory alignment core and use cases
pub mod consistency_checker;
pub mod deviation_assembler;
pub mod deviation_service;
pub mod gimbal_lock;
pub mod load_state;
pub mod metadata_service;
pub mod segment_resolver;
pub mod streaming_service;
pub mod task_poller;
pub mod time_normalizer;
pub mod trajectory_repository;
pub mod trajectory_service;
