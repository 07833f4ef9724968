pub mod activation;
pub mod embedding;
pub mod layer;
pub mod layer_norm;
pub mod linear;
