use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use burn::tensor::{Data, Int, Shape, Tensor};

use crate::data::batchitem::BatchItem;
use crate::data::dataset::WindowItem;

/// Collates [`WindowItem`]s into padded tensors on `device`.
pub struct WindowBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn float<const D: usize>(&self, values: Vec<f32>, dims: [usize; D]) -> Tensor<B, D> {
        let data = Data::new(values, Shape::new(dims));
        Tensor::<B, D>::from_data(data.convert(), &self.device)
    }

    fn int<const D: usize>(&self, values: Vec<i64>, dims: [usize; D]) -> Tensor<B, D, Int> {
        let data = Data::new(values, Shape::new(dims));
        Tensor::<B, D, Int>::from_data(data.convert(), &self.device)
    }
}

/// Rows of `steps` placed into `len` slots of `width` values each, either at
/// the end (left padding) or at the start (right padding).
fn pad(steps: &[Vec<f32>], len: usize, width: usize, left: bool) -> Vec<f32> {
    let mut out = vec![0.0; len * width];
    let offset = if left { len - steps.len() } else { 0 };
    for (i, row) in steps.iter().enumerate() {
        let at = (offset + i) * width;
        out[at..at + row.len()].copy_from_slice(row);
    }
    out
}

fn mask(observed: usize, len: usize, left: bool) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let inside = if left { i >= len - observed } else { i < observed };
            if inside {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

impl<B: Backend> Batcher<WindowItem, BatchItem<B>> for WindowBatcher<B> {
    fn batch(&self, items: Vec<WindowItem>) -> BatchItem<B> {
        let n = items.len();
        let t = items.iter().map(|i| i.encoder_length).max().unwrap_or(0);
        let h = items.iter().map(|i| i.decoder_length).max().unwrap_or(0);
        let first = items.first();
        let width = |f: fn(&WindowItem) -> usize| first.map_or(0, f);

        let d_t = width(|i| i.target_scale.len());
        let d_sr = width(|i| i.static_reals.len());
        let d_sc = width(|i| i.static_categoricals.len());
        let d_dr = width(|i| i.known_reals.first().map_or(0, Vec::len));
        let d_ur = width(|i| i.unknown_reals.first().map_or(0, Vec::len));

        let mut past_target = Vec::with_capacity(n * t * d_t);
        let mut past_observed = Vec::with_capacity(n * t);
        let mut future_target = Vec::with_capacity(n * h * d_t);
        let mut future_observed = Vec::with_capacity(n * h);
        let mut target_scale = Vec::with_capacity(n * d_t * 2);
        let mut static_reals = Vec::with_capacity(n * d_sr);
        let mut static_cats = Vec::with_capacity(n * d_sc);
        let mut known = Vec::with_capacity(n * (t + h) * d_dr);
        let mut unknown = Vec::with_capacity(n * t * d_ur);

        for item in &items {
            let encoder = item.encoder_length;
            past_target.extend(pad(&item.encoder_target, t, d_t, true));
            past_observed.extend(mask(encoder, t, true));
            future_target.extend(pad(&item.decoder_target, h, d_t, false));
            future_observed.extend(mask(item.decoder_length, h, false));
            target_scale.extend(item.target_scale.iter().flatten());
            static_reals.extend(&item.static_reals);
            static_cats.extend(&item.static_categoricals);

            known.extend(pad(&item.known_reals[..encoder], t, d_dr, true));
            known.extend(pad(&item.known_reals[encoder..], h, d_dr, false));
            unknown.extend(pad(&item.unknown_reals, t, d_ur, true));
        }

        let lengths = |f: fn(&WindowItem) -> usize| -> Vec<i64> {
            items.iter().map(|i| f(i) as i64).collect()
        };

        BatchItem {
            past_target: self.float(past_target, [n, t, d_t]),
            past_observed_values: self.float(past_observed, [n, t]),
            future_target: self.float(future_target, [n, h, d_t]),
            future_observed_values: self.float(future_observed, [n, h]),
            target_scale: self.float(target_scale, [n, d_t, 2]),
            feat_static_real: (d_sr > 0).then(|| self.float(static_reals, [n, d_sr])),
            feat_static_cat: (d_sc > 0).then(|| self.int(static_cats, [n, d_sc])),
            feat_dynamic_real: (d_dr > 0).then(|| self.float(known, [n, t + h, d_dr])),
            past_feat_dynamic_real: (d_ur > 0).then(|| self.float(unknown, [n, t, d_ur])),
            encoder_lengths: self.int(lengths(|i| i.encoder_length), [n]),
            decoder_lengths: self.int(lengths(|i| i.decoder_length), [n]),
        }
    }
}
