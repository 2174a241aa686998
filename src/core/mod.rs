pub mod engine;
pub mod error;
pub mod io;
pub mod layout;
pub mod model;
pub mod plot_model;
pub mod plots;
pub mod reducer;
pub mod settings;
pub mod stats;
