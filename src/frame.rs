// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/frame.rs - RGBA 位图帧定义
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

use image::{DynamicImage, RgbImage, RgbaImage};
use thiserror::Error;

const RGBA_CHANNELS: usize = 4;

/// 原始帧尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
  pub width: u32,
  pub height: u32,
}

impl FrameSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("帧尺寸无效: {0}x{1}")]
  EmptyFrame(u32, u32),
}

/// 内存中的 RGBA8 位图，与相机/位图帧一一对应
#[derive(Debug, Clone)]
pub struct Bitmap {
  image: RgbaImage,
}

impl Bitmap {
  /// 由紧密排列的 RGBA 字节构造位图
  pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyFrame(width, height));
    }
    let expected = RGBA_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    let image = RgbaImage::from_raw(width, height, data).ok_or(FrameError::LengthMismatch {
      expected,
      actual: 0,
    })?;
    Ok(Self { image })
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn size(&self) -> FrameSize {
    FrameSize::new(self.width(), self.height())
  }

  pub fn channels(&self) -> usize {
    RGBA_CHANNELS
  }

  pub fn as_rgba(&self) -> &RgbaImage {
    &self.image
  }

  /// 丢弃 alpha 通道，得到 RGB 图像
  pub fn to_rgb_image(&self) -> RgbImage {
    DynamicImage::ImageRgba8(self.image.clone()).into_rgb8()
  }
}

impl From<RgbaImage> for Bitmap {
  fn from(image: RgbaImage) -> Self {
    Self { image }
  }
}

impl From<RgbImage> for Bitmap {
  fn from(image: RgbImage) -> Self {
    Self {
      image: DynamicImage::ImageRgb8(image).into_rgba8(),
    }
  }
}

impl From<DynamicImage> for Bitmap {
  fn from(image: DynamicImage) -> Self {
    Self {
      image: image.into_rgba8(),
    }
  }
}
