pub mod capacity;
pub mod config;
pub mod dependency_order;
pub mod percentiles;
pub mod roadmap_yaml;
pub mod scheduler;
pub mod simulation;
pub mod simulation_types;
pub mod statistics;
pub mod triangular_sampler;
