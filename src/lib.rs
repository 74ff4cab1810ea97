pub mod error;
pub mod gui;
pub mod host;
pub mod logging;
pub mod marquee;
pub mod settings;
