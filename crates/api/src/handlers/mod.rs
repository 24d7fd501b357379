pub mod generation;
pub mod ui;
