use crate::device::*;
use crate::error::TextureError;
use std::path::Path;

/// A 2D RGBA8 texture owned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

impl GlTexture {
    pub fn destroy<D: GlDevice>(self, dev: &mut D) {
        dev.delete_texture(self.id);
    }
}

/// 16-texel checkerboard used as the placeholder surface image
pub fn checker_pixels(w: u32, h: u32) -> Vec<u8> {
    let mut data = Vec::<u8>::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let c = if ((x / 16) + (y / 16)) % 2 == 0 { 220 } else { 40 };
            data.extend_from_slice(&[c, c, 255, 255]);
        }
    }
    data
}

pub fn make_checker_texture<D: GlDevice>(dev: &mut D, w: u32, h: u32) -> Result<GlTexture, TextureError> {
    upload_rgba8(dev, w, h, &checker_pixels(w, h), false)
}

/// Create a texture from tightly packed RGBA8 pixels
pub fn upload_rgba8<D: GlDevice>(
    dev: &mut D,
    w: u32,
    h: u32,
    data: &[u8],
    mipmaps: bool,
) -> Result<GlTexture, TextureError> {
    let expected = (w as usize) * (h as usize) * 4;
    if data.len() != expected {
        return Err(TextureError::PixelSize {
            width: w,
            height: h,
            expected,
            actual: data.len(),
        });
    }

    let target = TextureTarget::Texture2D;
    let id = dev.create_texture()?;
    dev.bind_texture(target, Some(id));
    dev.tex_image_2d_rgba8(w as i32, h as i32, data);
    if mipmaps {
        dev.generate_mipmap(target);
        dev.set_texture_filter(target, TextureFilter::LinearMipmapLinear, TextureFilter::Linear);
    } else {
        dev.set_texture_filter(target, TextureFilter::Linear, TextureFilter::Linear);
    }
    dev.set_texture_wrap(target, TextureWrap::ClampToEdge, TextureWrap::ClampToEdge);
    dev.bind_texture(target, None);

    Ok(GlTexture { id, width: w, height: h })
}

/// Decode an encoded image (PNG) and upload it with mipmaps
pub fn load_texture_bytes<D: GlDevice>(dev: &mut D, bytes: &[u8]) -> Result<GlTexture, TextureError> {
    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    upload_rgba8(dev, w, h, &rgba, true)
}

pub fn load_texture_path<D: GlDevice>(dev: &mut D, path: &Path) -> Result<GlTexture, TextureError> {
    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    tracing::info!(path = %path.display(), w, h, "loaded texture");
    upload_rgba8(dev, w, h, &rgba, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;

    #[test]
    fn test_checker_alternates_every_16_texels() {
        let data = checker_pixels(32, 32);
        let texel = |x: usize, y: usize| data[(y * 32 + x) * 4];
        assert_eq!(texel(0, 0), 220);
        assert_eq!(texel(16, 0), 40);
        assert_eq!(texel(16, 16), 220);
        assert_eq!(texel(15, 17), 40);
    }

    #[test]
    fn test_upload_rejects_short_buffer() {
        let mut dev = RecordingDevice::default();
        let err = upload_rgba8(&mut dev, 4, 4, &[0; 10], false).err();
        assert!(matches!(err, Some(TextureError::PixelSize { expected: 64, actual: 10, .. })));
        assert_eq!(dev.live_textures(), 0);
    }

    #[test]
    fn test_load_png_bytes() {
        let mut img = image::RgbaImage::new(3, 2);
        img.put_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).expect("encode");

        let mut dev = RecordingDevice::default();
        let tex = load_texture_bytes(&mut dev, png.get_ref()).expect("texture");
        assert_eq!((tex.width, tex.height), (3, 2));
        assert_eq!(dev.texture_uploads(), 1);
        tex.destroy(&mut dev);
        assert_eq!(dev.live_objects(), 0);
    }

    #[test]
    fn test_garbage_bytes_are_an_image_error() {
        let mut dev = RecordingDevice::default();
        let err = load_texture_bytes(&mut dev, b"not an image").err();
        assert!(matches!(err, Some(TextureError::Image(_))));
    }
}
