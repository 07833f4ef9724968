use candle_core::Result as CandleResult;
use candle_core::Tensor;

pub trait Layer {
    fn forward(&self, input: &Tensor) -> CandleResult<Tensor>;
}
