pub mod bar;
pub mod dataset;
pub mod event;
pub mod moving_average;
pub mod record;
