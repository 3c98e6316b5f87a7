use burn::tensor::{backend::Backend, Int, Tensor};

/// A padded batch of windows. Encoder steps are left-padded to the longest
/// encoder in the batch, decoder steps right-padded to the longest decoder.
#[derive(Clone, Debug)]
pub struct BatchItem<B: Backend> {
    pub past_target: Tensor<B, 3>,                    // [N, T, D_t], normalized
    pub past_observed_values: Tensor<B, 2>,           // [N, T]
    pub future_target: Tensor<B, 3>,                  // [N, H, D_t]
    pub future_observed_values: Tensor<B, 2>,         // [N, H]
    pub target_scale: Tensor<B, 3>,                   // [N, D_t, 2]
    pub feat_static_real: Option<Tensor<B, 2>>,       // [N, D_sr]
    pub feat_static_cat: Option<Tensor<B, 2, Int>>,   // [N, D_sc]
    pub feat_dynamic_real: Option<Tensor<B, 3>>,      // [N, T + H, D_dr]
    pub past_feat_dynamic_real: Option<Tensor<B, 3>>, // [N, T, D_pr]
    pub encoder_lengths: Tensor<B, 1, Int>,           // [N]
    pub decoder_lengths: Tensor<B, 1, Int>,           // [N]
}
