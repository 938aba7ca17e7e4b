//! Capability flags read from the GL extension string

use crate::device::GlDevice;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuCaps {
    /// `GL_OVR_multiview2`
    pub multiview: bool,
    /// `GL_OVR_multiview_multisampled_render_to_texture`
    pub multiview_multisampled_render_to_texture: bool,
    /// `GL_EXT_multisampled_render_to_texture`
    pub multisampled_render_to_texture: bool,
    /// `GL_EXT_texture_border_clamp` or the OES variant
    pub texture_border_clamp: bool,
    /// `GL_OES_EGL_image_external_essl3`
    pub image_external_essl3: bool,
}

impl GpuCaps {
    pub fn from_extensions<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Self {
        let mut caps = GpuCaps::default();
        for ext in extensions {
            match ext {
                "GL_OVR_multiview2" => caps.multiview = true,
                "GL_OVR_multiview_multisampled_render_to_texture" => {
                    caps.multiview_multisampled_render_to_texture = true
                }
                "GL_EXT_multisampled_render_to_texture" => caps.multisampled_render_to_texture = true,
                "GL_EXT_texture_border_clamp" | "GL_OES_texture_border_clamp" => {
                    caps.texture_border_clamp = true
                }
                "GL_OES_EGL_image_external_essl3" => caps.image_external_essl3 = true,
                _ => {}
            }
        }
        caps
    }

    pub fn query<D: GlDevice>(dev: &mut D) -> Self {
        let extensions = dev.extension_string();
        let caps = Self::from_extensions(extensions.split_whitespace());
        tracing::info!(
            multiview = caps.multiview,
            multiview_msaa = caps.multiview_multisampled_render_to_texture,
            msaa_render_to_texture = caps.multisampled_render_to_texture,
            border_clamp = caps.texture_border_clamp,
            "GPU capabilities"
        );
        caps
    }
}
