//! Dual-stream recurrent network fusing price and sentiment sequences.
//!
//! ```text
//! price (b, t, 1) ──► LSTM x2 ──► h_T (b, H/2) ─┐
//!                                               ├─ concat (b, 1, H) ─► self-attention ─► MLP ─► (b,)
//! sentiment (b, t, 3) ► LSTM x2 ► h_T (b, H/2) ─┘
//! ```

use candle_core::{D, IndexOp, Module, Result, Tensor};
use candle_nn::{Dropout, LSTM, LSTMConfig, Linear, RNN, VarBuilder, linear, lstm};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub price_features: usize,
    pub sentiment_features: usize,
    /// Width of the fused representation; each encoder gets half
    pub hidden_size: usize,
    pub encoder_layers: usize,
    pub attention_heads: usize,
    pub dropout: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            price_features: 1,
            sentiment_features: 3,
            hidden_size: 64,
            encoder_layers: 2,
            attention_heads: 8,
            dropout: 0.3,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.hidden_size < 4 || self.hidden_size % 4 != 0 {
            return Err(format!(
                "hidden size must be a positive multiple of 4, got {}",
                self.hidden_size
            ));
        }
        if self.attention_heads == 0 || self.hidden_size % self.attention_heads != 0 {
            return Err(format!(
                "hidden size {} is not divisible by {} attention heads",
                self.hidden_size, self.attention_heads
            ));
        }
        if self.encoder_layers == 0 {
            return Err("at least one encoder layer is required".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        Ok(())
    }
}

/// Stacked LSTM reducing a sequence to the last hidden state of its top layer.
struct SequenceEncoder {
    layers: Vec<LSTM>,
    dropout: Dropout,
}

impl SequenceEncoder {
    fn new(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(num_layers);
        let mut in_dim = input_size;
        for layer in 0..num_layers {
            layers.push(lstm(
                in_dim,
                hidden_size,
                LSTMConfig::default(),
                vb.pp(format!("layer_{layer}")),
            )?);
            in_dim = hidden_size;
        }

        Ok(Self {
            layers,
            dropout: Dropout::new(dropout),
        })
    }

    /// (batch, seq, features) -> (batch, hidden)
    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        let mut input = xs.clone();
        let mut last_hidden = None;

        for (idx, layer) in self.layers.iter().enumerate() {
            let mut state = layer.zero_state(batch)?;
            let mut hiddens = Vec::with_capacity(seq_len);
            for t in 0..seq_len {
                let x_t = input.i((.., t, ..))?.contiguous()?;
                state = layer.step(&x_t, &state)?;
                hiddens.push(state.h().clone());
            }
            last_hidden = Some(state.h().clone());

            // inter-layer dropout, none after the top layer
            if idx + 1 < self.layers.len() {
                let stacked = Tensor::stack(&hiddens, 1)?;
                input = self.dropout.forward(&stacked, train)?;
            }
        }

        last_hidden.ok_or_else(|| candle_core::Error::Msg("encoder has no layers".to_string()))
    }
}

/// Multi-head self-attention over a (batch, tokens, dim) input.
struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    n_heads: usize,
    head_dim: usize,
    dropout: Dropout,
}

impl SelfAttention {
    fn new(dim: usize, n_heads: usize, dropout: f32, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            query: linear(dim, dim, vb.pp("query"))?,
            key: linear(dim, dim, vb.pp("key"))?,
            value: linear(dim, dim, vb.pp("value"))?,
            output: linear(dim, dim, vb.pp("output"))?,
            n_heads,
            head_dim: dim / n_heads,
            dropout: Dropout::new(dropout),
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, tokens: usize) -> Result<Tensor> {
        xs.reshape((batch, tokens, self.n_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (batch, tokens, dim) = xs.dims3()?;

        let q = self.split_heads(&self.query.forward(xs)?, batch, tokens)?;
        let k = self.split_heads(&self.key.forward(xs)?, batch, tokens)?;
        let v = self.split_heads(&self.value.forward(xs)?, batch, tokens)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let weights = self.dropout.forward(&weights, train)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, tokens, dim))?;

        self.output.forward(&context)
    }
}

/// Price + sentiment forecaster producing one scaled next-step price per sample.
pub struct DualStreamNetwork {
    price_encoder: SequenceEncoder,
    sentiment_encoder: SequenceEncoder,
    attention: SelfAttention,
    fusion_in: Linear,
    fusion_out: Linear,
    head_hidden: Linear,
    head_out: Linear,
    dropout: Dropout,
}

impl DualStreamNetwork {
    pub fn new(config: &NetworkConfig, vb: VarBuilder) -> Result<Self> {
        config.validate().map_err(candle_core::Error::Msg)?;

        let hidden = config.hidden_size;
        let encoder_hidden = hidden / 2;

        Ok(Self {
            price_encoder: SequenceEncoder::new(
                config.price_features,
                encoder_hidden,
                config.encoder_layers,
                config.dropout,
                vb.pp("price_lstm"),
            )?,
            sentiment_encoder: SequenceEncoder::new(
                config.sentiment_features,
                encoder_hidden,
                config.encoder_layers,
                config.dropout,
                vb.pp("sentiment_lstm"),
            )?,
            attention: SelfAttention::new(
                hidden,
                config.attention_heads,
                config.dropout,
                vb.pp("attention"),
            )?,
            fusion_in: linear(hidden, hidden, vb.pp("fusion_in"))?,
            fusion_out: linear(hidden, hidden / 2, vb.pp("fusion_out"))?,
            head_hidden: linear(hidden / 2, hidden / 4, vb.pp("head_hidden"))?,
            head_out: linear(hidden / 4, 1, vb.pp("head_out"))?,
            dropout: Dropout::new(config.dropout),
        })
    }

    /// `prices`: (batch, seq, 1), `sentiment`: (batch, seq, 3) -> (batch,)
    pub fn forward(&self, prices: &Tensor, sentiment: &Tensor, train: bool) -> Result<Tensor> {
        let price_state = self.price_encoder.forward(prices, train)?;
        let sentiment_state = self.sentiment_encoder.forward(sentiment, train)?;

        // the fused vector is a single attention token
        let fused = Tensor::cat(&[&price_state, &sentiment_state], 1)?.unsqueeze(1)?;
        let attended = self.attention.forward(&fused, train)?.squeeze(1)?;

        let xs = self.dense(&self.fusion_in, &attended, train)?;
        let xs = self.dense(&self.fusion_out, &xs, train)?;
        let xs = self.dense(&self.head_hidden, &xs, train)?;

        self.head_out.forward(&xs)?.squeeze(1)
    }

    fn dense(&self, layer: &Linear, xs: &Tensor, train: bool) -> Result<Tensor> {
        let xs = layer.forward(xs)?.relu()?;
        self.dropout.forward(&xs, train)
    }
}
