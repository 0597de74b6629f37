// 该文件是 Qianliyan （千里眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Bitmap, url_file_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("无法解码的路径: {0}")]
  PathDecodeError(String),
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 单张图像文件，迭代时只产生一帧
pub struct ImageFileInput {
  image: Option<Bitmap>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_file_path(url)
      .ok_or_else(|| ImageFileInputError::PathDecodeError(url.path().to_string()))?;
    let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
    info!("读取图像 {}: {}x{}", path.display(), image.width(), image.height());

    Ok(ImageFileInput {
      image: Some(Bitmap::from(image)),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = Bitmap;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage, Rgba};

  #[test]
  fn yields_single_rgba_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.png");
    RgbImage::from_pixel(5, 2, Rgb([1, 2, 3])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next().unwrap();
    assert_eq!((frame.width(), frame.height()), (5, 2));
    assert_eq!(*frame.as_rgba().get_pixel(0, 0), Rgba([1, 2, 3, 255]));
    assert!(input.next().is_none());
  }

  #[test]
  fn path_with_spaces_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("my frame 画面.png");
    RgbImage::from_pixel(3, 4, Rgb([7, 8, 9])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let frame = ImageFileInput::from_url(&url).unwrap().next().unwrap();
    assert_eq!((frame.width(), frame.height()), (3, 4));
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
