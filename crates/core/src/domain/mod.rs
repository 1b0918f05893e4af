pub mod contract;
pub mod instrument;
pub mod series;
pub mod strategy;
