//! SEIR simulation and Rt estimation on true, delayed and back-shifted
//! infection series.

pub mod config;
pub mod delay;
pub mod error;
pub mod estimator;
pub mod imputation;
pub mod observation;
pub mod output;
pub mod parameters;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod schedule;
pub mod seir;
pub mod serial_interval;
pub mod series;
