// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::info;

use crate::{
  frame::Bitmap,
  model::{BoxInfo, labels::label_text},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const PALETTE: [[u8; 3]; 6] = [
  [0, 0, 255],
  [255, 0, 0],
  [0, 200, 0],
  [255, 160, 0],
  [160, 0, 255],
  [0, 200, 200],
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效")]
  InvalidFont,
}

/// 在图像上绘制检测框；加载字体后额外绘制 `类别 置信度` 标签
pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: None,
    }
  }
}

fn label_color(label: i32) -> [u8; 3] {
  PALETTE[label.rem_euclid(PALETTE.len() as i32) as usize]
}

impl Draw {
  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontVec::try_from_vec(data).map_err(|_| DrawError::InvalidFont)?;
    info!("加载标签字体: {}", path.as_ref().display());
    Ok(Self {
      font: Some(font),
      ..Self::default()
    })
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 在原图上绘制所有检测结果，返回新的 RGB 图像
  pub fn draw_detection(&self, frame: &Bitmap, boxes: &[BoxInfo]) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_detections_on_image(&mut image, boxes);
    image
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, boxes: &[BoxInfo]) {
    for info in boxes {
      self.draw_bbox_with_label(image, info);
    }
  }

  // 坐标为原图像素单位 (x, y, w, h)
  fn draw_bbox_with_label(&self, image: &mut RgbImage, info: &BoxInfo) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (info.x.floor() as i32).clamp(0, w - 1);
    let y_min = (info.y.floor() as i32).clamp(0, h - 1);
    let x_max = (info.x2().ceil() as i32).clamp(0, w - 1);
    let y_max = (info.y2().ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(label_color(info.label));

    // 边框加粗
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", label_text(info.label), info.score);
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;

    // 标签放在边框上方，不超出图像边界
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(w - label_x);
    if label_width <= 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(label_width as u32, self.label_text_height as u32);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      Rgb([255u8, 255u8, 255u8]),
      label_x,
      label_y + self.label_text_vertical_padding,
      PxScale::from(self.font_size),
      font,
      &label,
    );
  }
}
