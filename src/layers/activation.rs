use candle_core::Result as CandleResult;

#[derive(Debug, Clone)]
pub enum Activation {
    Gelu,
    Relu,
}

impl Activation {
    pub fn parse(name: &str) -> CandleResult<Self> {
        match name {
            "gelu" => Ok(Activation::Gelu),
            "relu" => Ok(Activation::Relu),
            _ => Err(candle_core::Error::msg(format!(
                "unsupported activation function: {}",
                name
            ))),
        }
    }

    pub fn apply(&self, input: &candle_core::Tensor) -> CandleResult<candle_core::Tensor> {
        match self {
            Activation::Gelu => input.gelu(),
            Activation::Relu => input.relu(),
        }
    }
}
