pub mod datasets_controller;
pub mod health_controller;
pub mod parse_controller;
