pub mod element;
pub mod normalizer;
