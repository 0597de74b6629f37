// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Bitmap,
  model::BoxInfo,
  output::{
    Render,
    draw::{Draw, DrawError},
  },
  query_param, url_file_path,
};

/// 把标注后的单帧保存为图像文件，格式由扩展名决定
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: 期望 image, 实际 {0}")]
  SchemeMismatch(String),
  #[error("无法解码的路径: {0}")]
  PathDecodeError(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(
        uri.scheme().to_string(),
      ));
    }

    let path = url_file_path(uri)
      .ok_or_else(|| SaveImageFileError::PathDecodeError(uri.path().to_string()))?;
    let draw = match query_param::<String>(uri, "font") {
      Some(font) => Draw::with_font_file(font)?,
      None => Draw::default(),
    };

    Ok(SaveImageFileOutput {
      path,
      draw,
    })
  }
}

impl SaveImageFileOutput {
  fn ensure_parent(&self) -> Result<(), SaveImageFileError> {
    match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => {
        std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)
      }
      _ => Ok(()),
    }
  }
}

impl Render<Bitmap, Vec<BoxInfo>> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &Bitmap, result: &Vec<BoxInfo>) -> Result<(), Self::Error> {
    self.ensure_parent()?;
    let annotated = self.draw.draw_detection(frame, result);
    annotated
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;
    info!("{} 个检测框已绘制并保存: {}", result.len(), self.path.display());
    Ok(())
  }
}
