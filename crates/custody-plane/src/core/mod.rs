//! Core authorization logic for the custody plane

pub mod lifecycle;
