// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/model/preprocess.rs - 输入预处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::imageops::{self, FilterType};
use ndarray::Array4;
use tracing::debug;

use crate::frame::Bitmap;

const RGB_CHANNELS: usize = 3;
const MEAN: [f32; RGB_CHANNELS] = [0.0, 0.0, 0.0];
const NORM: [f32; RGB_CHANNELS] = [1.0 / 255.0, 1.0 / 255.0, 1.0 / 255.0];

/// 将 RGBA 位图拉伸缩放到 `input_size` x `input_size`，去掉 alpha，
/// 按 `(v - mean) * norm` 归一化到 [0, 1]，输出 NCHW 张量
pub fn to_input_tensor(bitmap: &Bitmap, input_size: u32) -> Array4<f32> {
  let resized = imageops::resize(
    bitmap.as_rgba(),
    input_size,
    input_size,
    FilterType::Triangle,
  );
  debug!(
    "预处理: {}x{} -> {}x{}",
    bitmap.width(),
    bitmap.height(),
    input_size,
    input_size
  );

  let side = input_size as usize;
  Array4::from_shape_fn((1, RGB_CHANNELS, side, side), |(_, c, y, x)| {
    let value = resized.get_pixel(x as u32, y as u32)[c] as f32;
    (value - MEAN[c]) * NORM[c]
  })
}
