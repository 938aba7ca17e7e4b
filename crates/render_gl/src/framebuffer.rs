//! Swap-chain render targets
//!
//! A [`Framebuffer`] owns one render FBO per swap-chain image, the depth
//! buffers behind them and, for the explicit-blit MSAA path, a resolve FBO
//! per image plus the single multisample color renderbuffer they all render
//! into. Per-index resources live in one arena (`slots`) and are created and
//! released together.
//!
//! Frame usage: `bind()`, draw, `resolve()`, `advance()`.

use crate::caps::GpuCaps;
use crate::device::*;
use crate::error::FramebufferError;

/// Images requested from the compositor per swap chain
pub const REQUESTED_SWAP_CHAIN_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultisampleStrategy {
    Off,
    /// `EXT_multisampled_render_to_texture` / `OVR_multiview_multisampled_render_to_texture`
    RenderToTexture,
    /// ES 3.0 multisample renderbuffer resolved with `glBlitFramebuffer`
    Blit,
}

impl MultisampleStrategy {
    /// Pick the MSAA path for a render target
    ///
    /// # Panics
    /// When multisampled multiview rendering is possible and a depth resolve
    /// is requested; that combination has no valid attachment layout.
    pub fn select(caps: &GpuCaps, multisamples: i32, resolve_depth: bool, use_multiview: bool) -> Self {
        if use_multiview {
            if multisamples > 1 && caps.multiview_multisampled_render_to_texture {
                assert!(
                    !resolve_depth,
                    "depth resolve is not supported with multisampled multiview render targets"
                );
                MultisampleStrategy::RenderToTexture
            } else {
                MultisampleStrategy::Off
            }
        } else if multisamples > 1 {
            if caps.multisampled_render_to_texture && !resolve_depth {
                MultisampleStrategy::RenderToTexture
            } else {
                MultisampleStrategy::Blit
            }
        } else {
            MultisampleStrategy::Off
        }
    }
}

/// How many depth buffers back the swap chain
///
/// Some drivers corrupt a depth buffer shared between several FBOs, so the
/// default allocates one per swap-chain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthBufferPolicy {
    #[default]
    SeparatePerIndex,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramebufferDesc {
    pub color_format: u32,
    pub depth_format: u32,
    pub width: i32,
    pub height: i32,
    pub multisamples: i32,
    pub resolve_depth: bool,
    pub use_multiview: bool,
    pub depth_policy: DepthBufferPolicy,
}

impl Default for FramebufferDesc {
    fn default() -> Self {
        Self {
            color_format: format::RGBA8,
            depth_format: format::DEPTH_COMPONENT24,
            width: 1024,
            height: 1024,
            multisamples: 4,
            resolve_depth: false,
            use_multiview: false,
            depth_policy: DepthBufferPolicy::SeparatePerIndex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepthBuffer {
    /// Two-layer array texture used by multiview targets
    Texture(TextureId),
    Renderbuffer(RenderbufferId),
}

#[derive(Debug, Clone, Copy)]
struct SwapChainSlot {
    render: FramebufferId,
    resolve: Option<FramebufferId>,
}

#[derive(Debug)]
pub struct Framebuffer {
    desc: FramebufferDesc,
    strategy: MultisampleStrategy,
    width: i32,
    height: i32,
    length: usize,
    index: usize,
    color_chain: Option<SwapChainId>,
    depth_chain: Option<SwapChainId>,
    /// Multisample color target shared by every render FBO in blit mode
    color_buffer: Option<RenderbufferId>,
    depth_buffers: Vec<DepthBuffer>,
    slots: Vec<SwapChainSlot>,
}

#[cfg(debug_assertions)]
const INITIAL_CLEAR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
#[cfg(not(debug_assertions))]
const INITIAL_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

const TRANSPARENT_BORDER: [f32; 4] = [0.0; 4];

impl Framebuffer {
    pub fn new<D: GlDevice>(dev: &mut D, caps: &GpuCaps, mut desc: FramebufferDesc) -> Result<Self, FramebufferError> {
        if desc.use_multiview && !caps.multiview {
            tracing::warn!("multiview requested without OVR_multiview2; using conventional targets");
            desc.use_multiview = false;
        }
        let strategy = MultisampleStrategy::select(caps, desc.multisamples, desc.resolve_depth, desc.use_multiview);
        tracing::info!(?strategy, resolve_depth = desc.resolve_depth, multiview = desc.use_multiview, "multisample mode");

        let mut fb = Framebuffer {
            desc,
            strategy,
            width: desc.width,
            height: desc.height,
            length: 0,
            index: 0,
            color_chain: None,
            depth_chain: None,
            color_buffer: None,
            depth_buffers: Vec::new(),
            slots: Vec::new(),
        };

        let built = if desc.use_multiview {
            fb.create_multiview(dev, caps)
        } else {
            fb.create_conventional(dev, caps)
        };
        if let Err(err) = built {
            tracing::error!("framebuffer creation failed: {err}");
            fb.destroy(dev);
            return Err(err);
        }

        tracing::info!(
            width = fb.width,
            height = fb.height,
            length = fb.length,
            depth_buffers = fb.depth_buffers.len(),
            "framebuffer created"
        );
        Ok(fb)
    }

    fn depth_buffer_count(&self) -> usize {
        match self.desc.depth_policy {
            DepthBufferPolicy::SeparatePerIndex => self.length,
            DepthBufferPolicy::Shared => 1,
        }
    }

    fn depth_buffer_for(&self, index: usize) -> Option<DepthBuffer> {
        let slot = match self.desc.depth_policy {
            DepthBufferPolicy::SeparatePerIndex => index,
            DepthBufferPolicy::Shared => 0,
        };
        self.depth_buffers.get(slot).copied()
    }

    fn depth_renderbuffer_for(&self, index: usize) -> Option<RenderbufferId> {
        match self.depth_buffer_for(index) {
            Some(DepthBuffer::Renderbuffer(rb)) => Some(rb),
            _ => None,
        }
    }

    fn depth_array_texture_for(&self, index: usize) -> Option<TextureId> {
        match self.depth_buffer_for(index) {
            Some(DepthBuffer::Texture(tex)) => Some(tex),
            _ => None,
        }
    }

    fn chain_image<D: GlDevice>(dev: &D, chain: SwapChainId, index: usize) -> Result<TextureId, FramebufferError> {
        dev.swap_chain_texture(chain, index).ok_or(FramebufferError::MissingImage(index))
    }

    fn create_color_chain<D: GlDevice>(&mut self, dev: &mut D, target: TextureTarget) -> Result<SwapChainId, FramebufferError> {
        let chain = dev.create_texture_swap_chain(
            target,
            self.desc.color_format,
            self.width,
            self.height,
            1,
            REQUESTED_SWAP_CHAIN_LENGTH,
        )?;
        self.color_chain = Some(chain);
        self.length = dev.swap_chain_length(chain);
        self.index = 0;
        if self.length == 0 {
            return Err(FramebufferError::EmptySwapChain);
        }
        Ok(chain)
    }

    fn apply_border_clamp<D: GlDevice>(dev: &mut D, target: TextureTarget, texture: TextureId) {
        dev.bind_texture(target, Some(texture));
        dev.set_texture_wrap(target, TextureWrap::ClampToBorder, TextureWrap::ClampToBorder);
        dev.set_texture_border_color(target, TRANSPARENT_BORDER);
        dev.bind_texture(target, None);
    }

    fn check_complete<D: GlDevice>(
        dev: &mut D,
        target: FramebufferTarget,
        kind: &'static str,
        index: usize,
    ) -> Result<(), FramebufferError> {
        match dev.check_framebuffer_status(target) {
            FramebufferStatus::Complete => Ok(()),
            FramebufferStatus::Incomplete(status) => {
                dev.bind_framebuffer(target, None);
                Err(FramebufferError::Incomplete { kind, index, status })
            }
        }
    }

    fn log_samples<D: GlDevice>(&self, dev: &mut D) {
        let actual = dev.current_samples();
        if actual < self.desc.multisamples {
            tracing::info!(requested = self.desc.multisamples, actual, "multisample level reduced by driver");
        } else {
            tracing::info!(requested = self.desc.multisamples, actual, "multisamples");
        }
    }

    fn clear_once<D: GlDevice>(&self, dev: &mut D, target: FramebufferTarget, fbo: FramebufferId) {
        dev.bind_framebuffer(target, Some(fbo));
        dev.scissor(0, 0, self.width, self.height);
        dev.viewport(0, 0, self.width, self.height);
        dev.clear_color(INITIAL_CLEAR);
        dev.clear(BufferMask::COLOR);
        dev.bind_framebuffer(target, None);
    }

    fn create_multiview<D: GlDevice>(&mut self, dev: &mut D, caps: &GpuCaps) -> Result<(), FramebufferError> {
        let array = TextureTarget::Texture2DArray;
        let chain = self.create_color_chain(dev, array)?;

        for _ in 0..self.depth_buffer_count() {
            let texture = dev.create_texture()?;
            self.depth_buffers.push(DepthBuffer::Texture(texture));
            dev.bind_texture(array, Some(texture));
            dev.tex_storage_3d(array, 1, self.desc.depth_format, self.width, self.height, 2);
            dev.set_texture_wrap(array, TextureWrap::ClampToEdge, TextureWrap::ClampToEdge);
            dev.set_texture_filter(array, TextureFilter::Nearest, TextureFilter::Nearest);
            dev.bind_texture(array, None);
        }

        let samples = (self.strategy == MultisampleStrategy::RenderToTexture).then_some(self.desc.multisamples);
        let draw = FramebufferTarget::Draw;
        for i in 0..self.length {
            let color = Self::chain_image(dev, chain, i)?;
            let depth = self.depth_array_texture_for(i);
            if caps.texture_border_clamp {
                Self::apply_border_clamp(dev, array, color);
            }

            let render = dev.create_framebuffer()?;
            self.slots.push(SwapChainSlot { render, resolve: None });
            dev.bind_framebuffer(draw, Some(render));
            dev.framebuffer_texture_multiview(draw, Attachment::Color0, Some(color), samples, 0, 2);
            dev.framebuffer_texture_multiview(draw, Attachment::Depth, depth, samples, 0, 2);
            Self::check_complete(dev, draw, "render", i)?;
            if samples.is_some() {
                self.log_samples(dev);
            }
            dev.bind_framebuffer(draw, None);

            self.clear_once(dev, draw, render);
        }
        Ok(())
    }

    fn create_conventional<D: GlDevice>(&mut self, dev: &mut D, caps: &GpuCaps) -> Result<(), FramebufferError> {
        let tex2d = TextureTarget::Texture2D;
        let fbt = FramebufferTarget::Framebuffer;
        let ms = self.desc.multisamples;
        let chain = self.create_color_chain(dev, tex2d)?;

        if self.strategy == MultisampleStrategy::Blit {
            let rb = dev.create_renderbuffer()?;
            self.color_buffer = Some(rb);
            dev.bind_renderbuffer(Some(rb));
            dev.renderbuffer_storage(RenderbufferSamples::Multisample(ms), self.desc.color_format, self.width, self.height);
            self.log_samples(dev);
            dev.bind_renderbuffer(None);
        }

        if self.desc.resolve_depth {
            let depth_chain = dev.create_texture_swap_chain(
                tex2d,
                self.desc.depth_format,
                self.width,
                self.height,
                1,
                REQUESTED_SWAP_CHAIN_LENGTH,
            )?;
            self.depth_chain = Some(depth_chain);
            let depth_len = dev.swap_chain_length(depth_chain);
            if depth_len != self.length {
                return Err(FramebufferError::DepthChainLength {
                    color: self.length,
                    depth: depth_len,
                });
            }
        }

        if !self.desc.resolve_depth || self.strategy == MultisampleStrategy::Blit {
            let storage = match self.strategy {
                MultisampleStrategy::RenderToTexture => RenderbufferSamples::RenderToTexture(ms),
                MultisampleStrategy::Blit => RenderbufferSamples::Multisample(ms),
                MultisampleStrategy::Off => RenderbufferSamples::Single,
            };
            for _ in 0..self.depth_buffer_count() {
                let rb = dev.create_renderbuffer()?;
                self.depth_buffers.push(DepthBuffer::Renderbuffer(rb));
                dev.bind_renderbuffer(Some(rb));
                dev.renderbuffer_storage(storage, self.desc.depth_format, self.width, self.height);
                dev.bind_renderbuffer(None);
            }
        }

        for i in 0..self.length {
            let color = Self::chain_image(dev, chain, i)?;
            let depth_texture = match self.depth_chain {
                Some(depth_chain) => Some(Self::chain_image(dev, depth_chain, i)?),
                None => None,
            };
            if caps.texture_border_clamp {
                Self::apply_border_clamp(dev, tex2d, color);
            }

            let render = dev.create_framebuffer()?;
            self.slots.push(SwapChainSlot { render, resolve: None });
            dev.bind_framebuffer(fbt, Some(render));

            match self.strategy {
                MultisampleStrategy::RenderToTexture => {
                    dev.framebuffer_texture_2d(fbt, Attachment::Color0, Some(color), Some(ms));
                    dev.framebuffer_renderbuffer(fbt, Attachment::Depth, self.depth_renderbuffer_for(i));
                    Self::check_complete(dev, fbt, "render", i)?;
                    self.log_samples(dev);
                    dev.bind_framebuffer(fbt, None);
                }
                MultisampleStrategy::Blit => {
                    dev.framebuffer_renderbuffer(fbt, Attachment::Color0, self.color_buffer);
                    dev.framebuffer_renderbuffer(fbt, Attachment::Depth, self.depth_renderbuffer_for(i));
                    Self::check_complete(dev, fbt, "render", i)?;
                    dev.bind_framebuffer(fbt, None);

                    let resolve = dev.create_framebuffer()?;
                    if let Some(slot) = self.slots.last_mut() {
                        slot.resolve = Some(resolve);
                    }
                    dev.bind_framebuffer(fbt, Some(resolve));
                    dev.framebuffer_texture_2d(fbt, Attachment::Color0, Some(color), None);
                    if self.desc.resolve_depth {
                        dev.framebuffer_texture_2d(fbt, Attachment::Depth, depth_texture, None);
                    }
                    Self::check_complete(dev, fbt, "resolve", i)?;
                    dev.bind_framebuffer(fbt, None);
                }
                MultisampleStrategy::Off => {
                    dev.framebuffer_texture_2d(fbt, Attachment::Color0, Some(color), None);
                    if self.desc.resolve_depth {
                        dev.framebuffer_texture_2d(fbt, Attachment::Depth, depth_texture, None);
                    } else {
                        dev.framebuffer_renderbuffer(fbt, Attachment::Depth, self.depth_renderbuffer_for(i));
                    }
                    Self::check_complete(dev, fbt, "render", i)?;
                    dev.bind_framebuffer(fbt, None);
                }
            }

            self.clear_once(dev, fbt, render);
        }
        Ok(())
    }

    fn bind_target(&self) -> FramebufferTarget {
        if self.desc.use_multiview {
            FramebufferTarget::Draw
        } else {
            FramebufferTarget::Framebuffer
        }
    }

    /// Bind the render FBO of the current swap-chain image
    pub fn bind<D: GlDevice>(&self, dev: &mut D) {
        if let Some(slot) = self.slots.get(self.index) {
            dev.bind_framebuffer(self.bind_target(), Some(slot.render));
        }
    }

    /// Finish rendering into the current image and unbind
    pub fn resolve<D: GlDevice>(&self, dev: &mut D) {
        let Some(slot) = self.slots.get(self.index) else {
            return;
        };
        let target = self.bind_target();
        let resolve_depth = self.depth_chain.is_some();

        // depth is never read back unless it is resolved into its own chain
        if !resolve_depth {
            dev.invalidate_framebuffer(target, &[Attachment::Depth]);
        }

        if let Some(resolve) = slot.resolve {
            dev.bind_framebuffer(FramebufferTarget::Read, Some(slot.render));
            dev.bind_framebuffer(FramebufferTarget::Draw, Some(resolve));
            let mut mask = BufferMask::COLOR;
            if resolve_depth {
                mask |= BufferMask::DEPTH;
            }
            dev.blit_framebuffer(self.width, self.height, mask, TextureFilter::Nearest);
            if resolve_depth {
                dev.invalidate_framebuffer(FramebufferTarget::Read, &[Attachment::Color0, Attachment::Depth]);
            } else {
                dev.invalidate_framebuffer(FramebufferTarget::Read, &[Attachment::Color0]);
            }
        }

        dev.bind_framebuffer(target, None);
    }

    /// Move to the next swap-chain image
    pub fn advance(&mut self) {
        if self.length > 0 {
            self.index = (self.index + 1) % self.length;
        }
    }

    /// Release every GPU object; safe to call more than once
    pub fn destroy<D: GlDevice>(&mut self, dev: &mut D) {
        for slot in self.slots.drain(..) {
            dev.delete_framebuffer(slot.render);
            if let Some(resolve) = slot.resolve {
                dev.delete_framebuffer(resolve);
            }
        }
        if let Some(chain) = self.color_chain.take() {
            dev.destroy_texture_swap_chain(chain);
        }
        if let Some(chain) = self.depth_chain.take() {
            dev.destroy_texture_swap_chain(chain);
        }
        for depth in self.depth_buffers.drain(..) {
            match depth {
                DepthBuffer::Texture(texture) => dev.delete_texture(texture),
                DepthBuffer::Renderbuffer(rb) => dev.delete_renderbuffer(rb),
            }
        }
        if let Some(rb) = self.color_buffer.take() {
            dev.delete_renderbuffer(rb);
        }
        self.width = 0;
        self.height = 0;
        self.length = 0;
        self.index = 0;
    }

    /// Recreate every per-image resource at a new size
    pub fn resize<D: GlDevice>(&mut self, dev: &mut D, caps: &GpuCaps, width: i32, height: i32) -> Result<(), FramebufferError> {
        self.destroy(dev);
        let desc = FramebufferDesc {
            width,
            height,
            ..self.desc
        };
        *self = Framebuffer::new(dev, caps, desc)?;
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.slots.is_empty()
            && self.color_chain.is_none()
            && self.depth_chain.is_none()
            && self.depth_buffers.is_empty()
            && self.color_buffer.is_none()
    }

    pub fn desc(&self) -> &FramebufferDesc {
        &self.desc
    }

    pub fn strategy(&self) -> MultisampleStrategy {
        self.strategy
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn swap_chain_length(&self) -> usize {
        self.length
    }

    pub fn swap_chain_index(&self) -> usize {
        self.index
    }

    pub fn color_swap_chain(&self) -> Option<SwapChainId> {
        self.color_chain
    }

    pub fn depth_swap_chain(&self) -> Option<SwapChainId> {
        self.depth_chain
    }

    /// Color image rendered into at `index`
    pub fn color_texture<D: GlDevice>(&self, dev: &D, index: usize) -> Option<TextureId> {
        self.color_chain.and_then(|chain| dev.swap_chain_texture(chain, index))
    }

    /// Depth texture at `index`: the resolved depth chain image, or the
    /// layered depth texture of a multiview target
    pub fn depth_texture<D: GlDevice>(&self, dev: &D, index: usize) -> Option<TextureId> {
        match self.depth_chain {
            Some(chain) => dev.swap_chain_texture(chain, index),
            None => self.depth_array_texture_for(index),
        }
    }

    pub fn depth_buffer_len(&self) -> usize {
        self.depth_buffers.len()
    }

    pub fn render_framebuffer(&self, index: usize) -> Option<FramebufferId> {
        self.slots.get(index).map(|slot| slot.render)
    }

    pub fn resolve_framebuffer(&self, index: usize) -> Option<FramebufferId> {
        self.slots.get(index).and_then(|slot| slot.resolve)
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !self.is_destroyed() {
            tracing::error!(
                length = self.length,
                "framebuffer dropped without destroy(); GL objects leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GlCall, RecordingDevice};

    fn caps(ext: &str) -> GpuCaps {
        GpuCaps::from_extensions(ext.split_whitespace())
    }

    fn desc(multisamples: i32) -> FramebufferDesc {
        FramebufferDesc {
            width: 64,
            height: 32,
            multisamples,
            ..FramebufferDesc::default()
        }
    }

    #[test]
    fn test_strategy_selection() {
        let none = GpuCaps::default();
        let rtt = caps("GL_EXT_multisampled_render_to_texture");
        let mv = caps("GL_OVR_multiview2 GL_OVR_multiview_multisampled_render_to_texture");

        assert_eq!(MultisampleStrategy::select(&none, 1, false, false), MultisampleStrategy::Off);
        assert_eq!(MultisampleStrategy::select(&none, 4, false, false), MultisampleStrategy::Blit);
        assert_eq!(MultisampleStrategy::select(&rtt, 4, false, false), MultisampleStrategy::RenderToTexture);
        assert_eq!(MultisampleStrategy::select(&rtt, 4, true, false), MultisampleStrategy::Blit);
        assert_eq!(MultisampleStrategy::select(&mv, 4, false, true), MultisampleStrategy::RenderToTexture);
        assert_eq!(MultisampleStrategy::select(&none, 4, true, true), MultisampleStrategy::Off);
    }

    #[test]
    #[should_panic(expected = "depth resolve")]
    fn test_multiview_msaa_with_depth_resolve_panics() {
        let mut dev = RecordingDevice::default();
        let mv = caps("GL_OVR_multiview2 GL_OVR_multiview_multisampled_render_to_texture");
        let _ = Framebuffer::new(
            &mut dev,
            &mv,
            FramebufferDesc {
                use_multiview: true,
                resolve_depth: true,
                ..desc(4)
            },
        );
    }

    #[test]
    fn test_advance_wraps() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).expect("framebuffer");
        let len = fb.swap_chain_length();
        assert_eq!(len, REQUESTED_SWAP_CHAIN_LENGTH);
        for n in 1..=10 {
            fb.advance();
            assert_eq!(fb.swap_chain_index(), n % len);
        }
        fb.destroy(&mut dev);
    }

    #[test]
    fn test_advance_on_destroyed_set_is_noop() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).expect("framebuffer");
        fb.destroy(&mut dev);
        fb.advance();
        assert_eq!(fb.swap_chain_index(), 0);
        assert_eq!(fb.swap_chain_length(), 0);
    }

    #[test]
    fn test_destroy_releases_everything_and_is_idempotent() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(4)).expect("framebuffer");
        assert_eq!(fb.strategy(), MultisampleStrategy::Blit);
        // color renderbuffer + one depth renderbuffer per image
        assert_eq!(dev.live_renderbuffers(), 1 + REQUESTED_SWAP_CHAIN_LENGTH);
        // render + resolve FBO per image
        assert_eq!(dev.live_framebuffers(), 2 * REQUESTED_SWAP_CHAIN_LENGTH);

        fb.destroy(&mut dev);
        fb.destroy(&mut dev);
        assert_eq!(dev.live_objects(), 0);
        assert!(fb.is_destroyed());
        assert_eq!((fb.width(), fb.height()), (0, 0));
        assert_eq!(fb.render_framebuffer(0), None);
    }

    #[test]
    fn test_shared_depth_policy() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(
            &mut dev,
            &GpuCaps::default(),
            FramebufferDesc {
                depth_policy: DepthBufferPolicy::Shared,
                ..desc(1)
            },
        )
        .expect("framebuffer");
        assert_eq!(fb.depth_buffer_len(), 1);
        fb.destroy(&mut dev);

        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).expect("framebuffer");
        assert_eq!(fb.depth_buffer_len(), REQUESTED_SWAP_CHAIN_LENGTH);
        fb.destroy(&mut dev);
    }

    #[test]
    fn test_multiview_depth_uses_textures() {
        let mut dev = RecordingDevice::default();
        let mv = caps("GL_OVR_multiview2");
        let mut fb = Framebuffer::new(
            &mut dev,
            &mv,
            FramebufferDesc {
                use_multiview: true,
                ..desc(4)
            },
        )
        .expect("framebuffer");
        assert_eq!(fb.strategy(), MultisampleStrategy::Off);
        assert_eq!(dev.live_textures(), REQUESTED_SWAP_CHAIN_LENGTH);
        assert_eq!(dev.live_renderbuffers(), 0);
        assert!(fb.color_texture(&dev, 2).is_some());
        assert!(fb.color_texture(&dev, 3).is_none());
        assert_ne!(fb.depth_texture(&dev, 0), fb.depth_texture(&dev, 1));

        dev.take_calls();
        fb.bind(&mut dev);
        fb.resolve(&mut dev);
        let calls = dev.take_calls();
        assert_eq!(calls.first(), Some(&GlCall::BindFramebuffer(FramebufferTarget::Draw, fb.render_framebuffer(0))));
        assert_eq!(calls.last(), Some(&GlCall::BindFramebuffer(FramebufferTarget::Draw, None)));

        fb.destroy(&mut dev);
        assert_eq!(dev.live_objects(), 0);
    }

    #[test]
    fn test_blit_resolve_order() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(4)).expect("framebuffer");
        fb.advance();
        dev.take_calls();

        fb.bind(&mut dev);
        fb.resolve(&mut dev);
        let render = fb.render_framebuffer(1);
        let resolve = fb.resolve_framebuffer(1);
        assert_eq!(
            dev.take_calls(),
            vec![
                GlCall::BindFramebuffer(FramebufferTarget::Framebuffer, render),
                GlCall::Invalidate(FramebufferTarget::Framebuffer, vec![Attachment::Depth]),
                GlCall::BindFramebuffer(FramebufferTarget::Read, render),
                GlCall::BindFramebuffer(FramebufferTarget::Draw, resolve),
                GlCall::Blit {
                    width: 64,
                    height: 32,
                    mask: BufferMask::COLOR
                },
                GlCall::Invalidate(FramebufferTarget::Read, vec![Attachment::Color0]),
                GlCall::BindFramebuffer(FramebufferTarget::Framebuffer, None),
            ]
        );
        fb.destroy(&mut dev);
    }

    #[test]
    fn test_resolve_depth_blits_depth() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(
            &mut dev,
            &GpuCaps::default(),
            FramebufferDesc {
                resolve_depth: true,
                ..desc(4)
            },
        )
        .expect("framebuffer");
        assert!(fb.depth_swap_chain().is_some());
        dev.take_calls();

        fb.resolve(&mut dev);
        let calls = dev.take_calls();
        assert!(!calls.contains(&GlCall::Invalidate(FramebufferTarget::Framebuffer, vec![Attachment::Depth])));
        assert!(calls.contains(&GlCall::Blit {
            width: 64,
            height: 32,
            mask: BufferMask::COLOR | BufferMask::DEPTH
        }));
        fb.destroy(&mut dev);
        assert_eq!(dev.live_swap_chains(), 0);
    }

    #[test]
    fn test_render_to_texture_attaches_multisampled_color() {
        let mut dev = RecordingDevice::default();
        let rtt = caps("GL_EXT_multisampled_render_to_texture GL_EXT_texture_border_clamp");
        let mut fb = Framebuffer::new(&mut dev, &rtt, desc(4)).expect("framebuffer");
        assert_eq!(fb.strategy(), MultisampleStrategy::RenderToTexture);
        assert_eq!(fb.resolve_framebuffer(0), None);

        let calls = dev.take_calls();
        let msaa_attachments = calls
            .iter()
            .filter(|c| matches!(c, GlCall::FramebufferTexture { samples: Some(4), .. }))
            .count();
        assert_eq!(msaa_attachments, REQUESTED_SWAP_CHAIN_LENGTH);
        assert!(calls.contains(&GlCall::RenderbufferStorage(
            RenderbufferSamples::RenderToTexture(4),
            format::DEPTH_COMPONENT24
        )));
        let clamps = calls.iter().filter(|c| matches!(c, GlCall::TextureBorderColor(_))).count();
        assert_eq!(clamps, REQUESTED_SWAP_CHAIN_LENGTH);
        fb.destroy(&mut dev);
    }

    #[test]
    fn test_each_fbo_cleared_once() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).expect("framebuffer");
        let clears = dev.calls.iter().filter(|c| matches!(c, GlCall::Clear(_))).count();
        assert_eq!(clears, fb.swap_chain_length());
        assert!(dev.calls.contains(&GlCall::ClearColor(INITIAL_CLEAR)));
        fb.destroy(&mut dev);
    }

    #[test]
    fn test_incomplete_fbo_releases_partial_state() {
        let mut dev = RecordingDevice::default();
        dev.fail_status_check = Some(1);
        let err = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(4)).err();
        assert!(matches!(err, Some(FramebufferError::Incomplete { kind: "resolve", index: 0, .. })));
        assert_eq!(dev.live_objects(), 0);
    }

    #[test]
    fn test_resize_recreates_at_new_size() {
        let mut dev = RecordingDevice::default();
        let mut fb = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).expect("framebuffer");
        fb.advance();
        fb.resize(&mut dev, &GpuCaps::default(), 128, 128).expect("resize");
        assert_eq!((fb.width(), fb.height()), (128, 128));
        assert_eq!(fb.swap_chain_index(), 0);
        assert_eq!(fb.depth_buffer_len(), REQUESTED_SWAP_CHAIN_LENGTH);
        fb.destroy(&mut dev);
        assert_eq!(dev.live_objects(), 0);
    }

    #[test]
    fn test_zero_length_chain_is_rejected() {
        let mut dev = RecordingDevice::default();
        dev.swap_chain_length = Some(0);
        let err = Framebuffer::new(&mut dev, &GpuCaps::default(), desc(1)).err();
        assert!(matches!(err, Some(FramebufferError::EmptySwapChain)));
        assert_eq!(dev.live_objects(), 0);
    }
}
