use candle_core::safetensors::MmapedSafetensors;
use candle_core::Result as CandleResult;
use candle_core::{Device, Tensor};

use crate::layers::layer::Layer;
use crate::layers::linear::LinearLayer;

pub struct SelfAttentionLayer {
    q_lin: LinearLayer,
    k_lin: LinearLayer,
    v_lin: LinearLayer,
    out_lin: LinearLayer,
    n_heads: usize,
    dim: usize,
    device: Device,
}

impl SelfAttentionLayer {
    pub fn new(
        weights: &MmapedSafetensors,
        prefix: &str,
        n_heads: usize,
        dim: usize,
        device: Device,
    ) -> CandleResult<Self> {
        let q_lin = LinearLayer::new(weights, &format!("{}.q_lin", prefix), device.clone())?;
        let k_lin = LinearLayer::new(weights, &format!("{}.k_lin", prefix), device.clone())?;
        let v_lin = LinearLayer::new(weights, &format!("{}.v_lin", prefix), device.clone())?;
        let out_lin = LinearLayer::new(weights, &format!("{}.out_lin", prefix), device.clone())?;

        Ok(Self {
            q_lin,
            k_lin,
            v_lin,
            out_lin,
            n_heads,
            dim,
            device,
        })
    }

    /// Bidirectional multi-head attention; `additive_mask` is 0.0 for real
    /// tokens and a large negative value for padding, shaped (batch, 1, 1, seq).
    pub fn forward(&self, input: &Tensor, additive_mask: &Tensor) -> CandleResult<Tensor> {
        let input = input.to_device(&self.device)?;
        let q = self.q_lin.forward(&input)?;
        let k = self.k_lin.forward(&input)?;
        let v = self.v_lin.forward(&input)?;

        let head_dim = self.dim / self.n_heads;

        let (b_sz, seq_len, _) = input.shape().dims3()?;

        // Reshape and transpose for multi-head attention
        let q = q
            .reshape((b_sz, seq_len, self.n_heads, head_dim))?
            .transpose(1, 2)?; // (b_sz, n_heads, seq_len, head_dim)
        let k = k
            .reshape((b_sz, seq_len, self.n_heads, head_dim))?
            .transpose(1, 2)?;
        let v = v
            .reshape((b_sz, seq_len, self.n_heads, head_dim))?
            .transpose(1, 2)?;

        // Scaled dot-product attention
        let scaling = 1.0 / (head_dim as f64).sqrt();
        let attn_scores = q.matmul(&k.transpose(2, 3)?)?.affine(scaling, 0.0)?;
        let attn_scores = attn_scores.broadcast_add(additive_mask)?;

        let attn_probs = candle_nn::ops::softmax(&attn_scores, candle_core::D::Minus1)?;

        let context = attn_probs.matmul(&v)?;
        let context = context
            .transpose(1, 2)? // (b_sz, seq_len, n_heads, head_dim)
            .reshape(&[b_sz, seq_len, self.dim])?;

        self.out_lin.forward(&context)
    }
}
