//! Common test utilities for fcover.
//!
//! Fixture builders for raster archives and zone catalogs, plus grid
//! assertions that understand NaN.

#![allow(dead_code)]

pub mod assertions;
pub mod test_data;
