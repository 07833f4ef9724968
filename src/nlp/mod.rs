pub mod attention;
pub mod embeddings;
pub mod ffn;
pub mod inference;
pub mod models;
pub mod transformer;
