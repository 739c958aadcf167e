//! Support code for Cucumber scenarios


pub use world::TestWorld;
