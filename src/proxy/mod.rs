pub mod transform;
pub mod upstream;
