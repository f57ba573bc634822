// Read-side queries over the index

pub mod engine;
