//! Utility helpers shared by the builder and the command line front end

pub mod logging;
