pub mod broadcast;
pub mod phase_controller;
pub mod platform;
pub mod role_assigner;
pub mod session_registry;
pub mod win_evaluator;
